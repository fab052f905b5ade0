//! Client for the transformation/library management API.
//!
//! Every operation maps to exactly one HTTP request, authenticated with HTTP
//! basic auth (account email + access token) and tagged with a fixed
//! `user-agent`. There are no retries, no caching and no pagination: responses
//! and failures are handed back to the caller as they arrive.
//!
//! The only translation the client performs is on delete: a `400` from
//! `DELETE /transformations/{id}` or `DELETE /libraries/{id}` becomes
//! [`ClientError::Conflict`], because the server rejects deletes of artifacts
//! that are still connected to a destination.
//!
//! # Example (env-configured)
//!
//! ```no_run
//! use transform_client::{ClientConfig, Language, TransformClient};
//!
//! # async fn run() -> Result<(), transform_client::ClientError> {
//! let client = TransformClient::new(ClientConfig::from_env()?)?;
//!
//! let created = client
//!     .create_transformation(
//!         "dedupe",
//!         "drop duplicate events",
//!         "export function transformEvent(event) { return event; }",
//!         Language::JavaScript,
//!         false,
//!     )
//!     .await?;
//! let transformation = created.transformation()?;
//! println!("created {}", transformation.id);
//!
//! client.delete_transformation(&transformation.id).await?;
//! # Ok(()) }
//! ```

mod client;
mod config;
mod error;
mod models;
mod transport;

pub use client::*;
pub use config::{
    ClientConfig, DEFAULT_SERVER_ENDPOINT, ENV_ACCESS_TOKEN, ENV_EMAIL, ENV_SERVER_ENDPOINT,
    ServerEndpoint,
};
pub use error::{ArtifactKind, ClientError, Result};
pub use models::*;
pub use transport::{HttpTransport, RawResponse, Transport};
