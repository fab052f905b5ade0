use crate::error::{ClientError, Result};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// Runtime a transformation or library is written for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Language {
    #[serde(rename = "javascript")]
    JavaScript,
    #[serde(rename = "pythonfaas")]
    Python,
}

impl Language {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::JavaScript => "javascript",
            Self::Python => "pythonfaas",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "javascript" | "js" => Ok(Self::JavaScript),
            "python" | "pythonfaas" => Ok(Self::Python),
            other => Err(format!(
                "unsupported language '{other}' (expected javascript or python)"
            )),
        }
    }
}

/// Body of create/update requests.
///
/// `name` is skipped when `None`: update calls never transmit a name.
#[derive(Debug, Serialize)]
pub(crate) struct CodeBody<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<&'a str>,
    pub description: &'a str,
    pub code: &'a str,
    pub language: Language,
}

/// Body of `POST /transformations/libraries/test`.
#[derive(Debug, Serialize)]
pub struct TestRequest<'a, T, L> {
    pub transformations: &'a [T],
    pub libraries: &'a [L],
}

/// Body of `POST /transformations/libraries/publish`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishRequest<'a, T, L> {
    pub transformations: &'a [T],
    pub libraries: &'a [L],
    pub commit_id: &'a str,
}

/// A transformation version to run against sample events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransformationTest {
    pub version_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test_input: Option<Vec<Value>>,
}

/// Reference to a specific version of a transformation or library.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionRef {
    pub version_id: String,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Transformation {
    pub id: String,
    #[serde(default)]
    pub version_id: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub language: Option<Language>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Library {
    pub id: String,
    #[serde(default)]
    pub version_id: Option<String>,
    #[serde(default)]
    pub name: String,
    /// Module name transformations use to import the library.
    #[serde(default)]
    pub import_name: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub language: Option<Language>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct TransformationList {
    #[serde(default)]
    pub transformations: Vec<Transformation>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct LibraryList {
    #[serde(default)]
    pub libraries: Vec<Library>,
}

/// A successful server response, passed through as received.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: StatusCode,
    /// Decoded JSON body, with object keys in server order and numbers at
    /// full precision. An empty body is `null`; a body that is not JSON is
    /// kept verbatim as a JSON string.
    pub body: Value,
    /// Body text exactly as received.
    pub text: String,
}

impl ApiResponse {
    pub(crate) fn from_text(status: StatusCode, text: &str) -> Self {
        let body = if text.trim().is_empty() {
            Value::Null
        } else {
            serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string()))
        };
        Self {
            status,
            body,
            text: text.to_string(),
        }
    }

    /// Decode the body into a typed view.
    pub fn parse<T: DeserializeOwned>(&self, what: &'static str) -> Result<T> {
        T::deserialize(&self.body).map_err(|source| ClientError::Decode { what, source })
    }

    pub fn transformation(&self) -> Result<Transformation> {
        self.parse("transformation")
    }

    pub fn library(&self) -> Result<Library> {
        self.parse("library")
    }

    pub fn transformations(&self) -> Result<Vec<Transformation>> {
        self.parse::<TransformationList>("transformation list")
            .map(|l| l.transformations)
    }

    pub fn libraries(&self) -> Result<Vec<Library>> {
        self.parse::<LibraryList>("library list").map(|l| l.libraries)
    }
}
