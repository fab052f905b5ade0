use crate::error::{ClientError, Result};
use std::fmt;
use url::Url;

/// Public API host used when no server endpoint is configured.
pub const DEFAULT_SERVER_ENDPOINT: &str = "https://api.rudderstack.com";

pub const ENV_SERVER_ENDPOINT: [&str; 2] = ["TRANSFORM_SERVER_ENDPOINT", "INPUT_SERVERENDPOINT"];
pub const ENV_EMAIL: [&str; 2] = ["TRANSFORM_EMAIL", "INPUT_EMAIL"];
pub const ENV_ACCESS_TOKEN: [&str; 2] = ["TRANSFORM_ACCESS_TOKEN", "INPUT_ACCESSTOKEN"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerEndpoint {
    /// Base URL with scheme, e.g. `https://api.example.com`. May carry a path
    /// prefix; endpoint paths are appended after it.
    base_url: Url,
}

impl ServerEndpoint {
    pub fn parse(base_url: &str) -> Result<Self> {
        let trimmed = base_url.trim();
        let url = Url::parse(trimmed).map_err(|source| ClientError::InvalidEndpoint {
            url: trimmed.to_string(),
            source: Some(source),
        })?;

        if !matches!(url.scheme(), "http" | "https") || url.cannot_be_a_base() {
            return Err(ClientError::InvalidEndpoint {
                url: trimmed.to_string(),
                source: None,
            });
        }

        Ok(Self {
            base_url: strip_trailing_slash(url),
        })
    }

    pub fn as_url(&self) -> &Url {
        &self.base_url
    }

    /// Build `<base>/<segment>/<segment>...`.
    ///
    /// Each segment is percent-encoded on its own, so an id containing `/` or
    /// `?` stays a single path segment.
    pub fn join(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        // `cannot_be_a_base` was rejected in `parse`, so this always succeeds.
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }
}

impl Default for ServerEndpoint {
    fn default() -> Self {
        Self {
            base_url: Url::parse(DEFAULT_SERVER_ENDPOINT)
                .expect("default endpoint is a valid URL"),
        }
    }
}

impl fmt::Display for ServerEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.base_url.as_str().trim_end_matches('/'))
    }
}

fn strip_trailing_slash(mut url: Url) -> Url {
    let path = url.path().trim_end_matches('/').to_string();
    url.set_path(&path);
    url
}

/// Connection settings for [`TransformClient`](crate::TransformClient).
#[derive(Clone)]
pub struct ClientConfig {
    pub server_endpoint: ServerEndpoint,
    /// Account email, sent as the basic-auth username.
    pub email: String,
    /// Access token, sent as the basic-auth password.
    pub access_token: String,
}

impl ClientConfig {
    pub fn new(
        server_endpoint: ServerEndpoint,
        email: impl Into<String>,
        access_token: impl Into<String>,
    ) -> Self {
        Self {
            server_endpoint,
            email: email.into(),
            access_token: access_token.into(),
        }
    }

    /// Read the configuration from the process environment.
    ///
    /// `TRANSFORM_*` variables take precedence over the `INPUT_*` variables a
    /// CI runner exports for step inputs (`serverEndpoint`, `email`,
    /// `accessToken`). The endpoint falls back to [`DEFAULT_SERVER_ENDPOINT`].
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let first = |keys: &[&str]| {
            keys.iter()
                .filter_map(|&k| lookup(k))
                .map(|v| v.trim().to_string())
                .find(|v| !v.is_empty())
        };

        let server_endpoint = match first(&ENV_SERVER_ENDPOINT[..]) {
            Some(url) => ServerEndpoint::parse(&url)?,
            None => ServerEndpoint::default(),
        };
        let email = first(&ENV_EMAIL[..]).ok_or(ClientError::MissingCredentials(ENV_EMAIL[0]))?;
        let access_token = first(&ENV_ACCESS_TOKEN[..])
            .ok_or(ClientError::MissingCredentials(ENV_ACCESS_TOKEN[0]))?;

        Ok(Self {
            server_endpoint,
            email,
            access_token,
        })
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("server_endpoint", &self.server_endpoint.to_string())
            .field("email", &self.email)
            .field("access_token", &"<redacted>")
            .finish()
    }
}
