use anyhow::{Context, Result, bail};
use clap::Parser;
use std::path::PathBuf;
use transform_client::{
    ApiResponse, ClientConfig, ENV_ACCESS_TOKEN, ENV_EMAIL, ENV_SERVER_ENDPOINT, Language,
    TransformClient,
};

use crate::input::{TestSuite, read_code, read_suite};

/// Environment variable CI runners set to the commit being built.
const ENV_COMMIT_SHA: &str = "GITHUB_SHA";

#[derive(Debug, Clone, Parser)]
pub struct ConnectionOpts {
    /// Base API URL [env: TRANSFORM_SERVER_ENDPOINT] (default: https://api.rudderstack.com)
    #[arg(long, value_name = "URL", global = true)]
    server_endpoint: Option<String>,

    /// Account email used as the basic-auth username [env: TRANSFORM_EMAIL]
    #[arg(long, value_name = "EMAIL", global = true)]
    email: Option<String>,

    /// Access token used as the basic-auth password [env: TRANSFORM_ACCESS_TOKEN]
    #[arg(long, value_name = "TOKEN", global = true)]
    access_token: Option<String>,
}

#[derive(Debug, Parser)]
pub struct CodeArgs {
    /// Free-form description
    #[arg(long, default_value = "")]
    description: String,

    /// Runtime language (javascript|python)
    #[arg(long, default_value = "javascript")]
    language: Language,

    /// File holding the source code ('-' reads stdin)
    #[arg(long, value_name = "FILE")]
    code_file: PathBuf,

    /// Publish the new version immediately
    #[arg(long)]
    publish: bool,
}

#[derive(Debug, Parser)]
pub struct CreateArgs {
    /// Display name
    #[arg(long)]
    name: String,

    #[command(flatten)]
    code: CodeArgs,
}

#[derive(Debug, Parser)]
pub struct UpdateTransformationArgs {
    /// Transformation id
    #[arg(long)]
    id: String,

    /// Display name (logged only; the server keeps the name given at creation)
    #[arg(long, default_value = "")]
    name: String,

    #[command(flatten)]
    code: CodeArgs,
}

#[derive(Debug, Parser)]
pub struct UpdateLibraryArgs {
    /// Library id
    #[arg(long)]
    id: String,

    #[command(flatten)]
    code: CodeArgs,
}

#[derive(Debug, Parser)]
pub struct TestArgs {
    /// JSON file: {"transformations": [...], "libraries": [...]}
    #[arg(long, value_name = "FILE")]
    input: PathBuf,
}

#[derive(Debug, Parser)]
pub struct PublishArgs {
    /// JSON file: {"transformations": [...], "libraries": [...]}
    #[arg(long, value_name = "FILE")]
    input: PathBuf,

    /// Source revision being published [env: GITHUB_SHA]
    #[arg(long, value_name = "SHA")]
    commit_id: Option<String>,
}

#[derive(Debug, Parser)]
pub struct DeleteArgs {
    /// Server-assigned id
    #[arg(long)]
    pub id: String,
}

pub fn client_from_opts(opts: &ConnectionOpts) -> Result<TransformClient> {
    // Flags shadow the primary variable of each setting, which already wins
    // over the step-input fallbacks.
    let flag = |key: &str| -> Option<String> {
        if key == ENV_SERVER_ENDPOINT[0] {
            opts.server_endpoint.clone()
        } else if key == ENV_EMAIL[0] {
            opts.email.clone()
        } else if key == ENV_ACCESS_TOKEN[0] {
            opts.access_token.clone()
        } else {
            None
        }
    };
    let config = ClientConfig::from_lookup(|key| flag(key).or_else(|| std::env::var(key).ok()))
        .context("failed to load connection settings")?;
    tracing::debug!(endpoint = %config.server_endpoint, "using server endpoint");

    TransformClient::new(config).context("failed to create API client")
}

pub async fn create_transformation(
    client: &TransformClient,
    args: CreateArgs,
) -> Result<ApiResponse> {
    let code = read_code(&args.code.code_file)?;
    client
        .create_transformation(
            &args.name,
            &args.code.description,
            &code,
            args.code.language,
            args.code.publish,
        )
        .await
        .with_context(|| format!("failed to create transformation '{}'", args.name))
}

pub async fn update_transformation(
    client: &TransformClient,
    args: UpdateTransformationArgs,
) -> Result<ApiResponse> {
    let code = read_code(&args.code.code_file)?;
    client
        .update_transformation(
            &args.id,
            &args.name,
            &args.code.description,
            &code,
            args.code.language,
            args.code.publish,
        )
        .await
        .with_context(|| format!("failed to update transformation {}", args.id))
}

pub async fn create_library(client: &TransformClient, args: CreateArgs) -> Result<ApiResponse> {
    let code = read_code(&args.code.code_file)?;
    client
        .create_library(
            &args.name,
            &args.code.description,
            &code,
            args.code.language,
            args.code.publish,
        )
        .await
        .with_context(|| format!("failed to create library '{}'", args.name))
}

pub async fn update_library(
    client: &TransformClient,
    args: UpdateLibraryArgs,
) -> Result<ApiResponse> {
    let code = read_code(&args.code.code_file)?;
    client
        .update_library(
            &args.id,
            &args.code.description,
            &code,
            args.code.language,
            args.code.publish,
        )
        .await
        .with_context(|| format!("failed to update library {}", args.id))
}

pub async fn test(client: &TransformClient, args: TestArgs) -> Result<ApiResponse> {
    let TestSuite {
        transformations,
        libraries,
    } = read_suite(&args.input)?;
    client
        .test_transformation_and_library(&transformations, &libraries)
        .await
        .context("test run failed")
}

pub async fn publish(client: &TransformClient, args: PublishArgs) -> Result<ApiResponse> {
    let commit_id = resolve_commit_id(args.commit_id, std::env::var(ENV_COMMIT_SHA).ok())?;
    let TestSuite {
        transformations,
        libraries,
    } = read_suite(&args.input)?;
    client
        .publish(&transformations, &libraries, &commit_id)
        .await
        .with_context(|| format!("failed to publish commit {commit_id}"))
}

fn resolve_commit_id(flag: Option<String>, env: Option<String>) -> Result<String> {
    match flag.or(env).map(|s| s.trim().to_string()) {
        Some(id) if !id.is_empty() => Ok(id),
        _ => bail!("missing --commit-id (or set {ENV_COMMIT_SHA})"),
    }
}
