use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::Value;
use std::fs;
use std::io::Read;
use std::path::Path;

/// Versions to test or publish, as read from a JSON file.
///
/// Entries are forwarded to the server untouched, so any field the API
/// understands (`versionId`, `testInput`, ...) can be used. Validation is left
/// to the server.
#[derive(Debug, Default, Deserialize)]
pub struct TestSuite {
    #[serde(default)]
    pub transformations: Vec<Value>,
    #[serde(default)]
    pub libraries: Vec<Value>,
}

/// Read source code from `path`, or from stdin when `path` is `-`.
pub fn read_code(path: &Path) -> Result<String> {
    if path.as_os_str() == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("failed to read code from stdin")?;
        Ok(buf)
    } else {
        fs::read_to_string(path)
            .with_context(|| format!("failed to read code file: {}", path.display()))
    }
}

pub fn read_suite(path: &Path) -> Result<TestSuite> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    parse_suite(&contents).with_context(|| format!("failed to parse {}", path.display()))
}

fn parse_suite(contents: &str) -> Result<TestSuite> {
    Ok(serde_json::from_str(contents)?)
}
