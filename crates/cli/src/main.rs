mod commands;
mod input;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, fmt};

use crate::commands::{
    CreateArgs, DeleteArgs, PublishArgs, TestArgs, UpdateLibraryArgs, UpdateTransformationArgs,
};

#[derive(Parser)]
#[command(name = "transformctl")]
#[command(
    version,
    about = "Sync transformations and libraries with the transformation API",
    long_about = None
)]
struct Cli {
    #[command(flatten)]
    connection: commands::ConnectionOpts,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List all transformations in the workspace
    ListTransformations,

    /// List all libraries in the workspace
    ListLibraries,

    /// Create a transformation
    CreateTransformation(CreateArgs),

    /// Update a transformation's description, code and language
    UpdateTransformation(UpdateTransformationArgs),

    /// Create a library
    CreateLibrary(CreateArgs),

    /// Update a library's description, code and language
    UpdateLibrary(UpdateLibraryArgs),

    /// Run transformation versions against test events
    Test(TestArgs),

    /// Publish transformation and library versions for a commit
    Publish(PublishArgs),

    /// Delete a transformation
    DeleteTransformation(DeleteArgs),

    /// Delete a library
    DeleteLibrary(DeleteArgs),
}

fn main() -> Result<()> {
    match dotenvy::dotenv() {
        Ok(_) => {}
        Err(dotenvy::Error::Io(err)) if err.kind() == std::io::ErrorKind::NotFound => {}
        Err(err) => return Err(err).context("failed to load .env"),
    }
    init_tracing();
    let cli = Cli::parse();

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(run(cli))
}

async fn run(cli: Cli) -> Result<()> {
    let client = commands::client_from_opts(&cli.connection)?;

    let resp = match cli.command {
        Commands::ListTransformations => client.list_transformations().await?,
        Commands::ListLibraries => client.list_libraries().await?,
        Commands::CreateTransformation(args) => {
            commands::create_transformation(&client, args).await?
        }
        Commands::UpdateTransformation(args) => {
            commands::update_transformation(&client, args).await?
        }
        Commands::CreateLibrary(args) => commands::create_library(&client, args).await?,
        Commands::UpdateLibrary(args) => commands::update_library(&client, args).await?,
        Commands::Test(args) => commands::test(&client, args).await?,
        Commands::Publish(args) => commands::publish(&client, args).await?,
        Commands::DeleteTransformation(args) => client.delete_transformation(&args.id).await?,
        Commands::DeleteLibrary(args) => client.delete_library(&args.id).await?,
    };

    println!("{}", serde_json::to_string_pretty(&resp.body)?);
    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}
