use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::debug;
use serde::Deserialize;
use serde_json::{Map, Value};
use tokio::{fs::File, io::AsyncReadExt};

/// Partner API settings read from the JSON config file
///
/// Every key is optional. A missing key leaves an empty string, which is then
/// substituted into the request body as-is. Keys match regardless of case, so
/// `url` and `userId` fill `URL` and `UserID`.
#[derive(Debug, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    #[serde(rename = "URL")]
    pub url: String,

    #[serde(rename = "UserID")]
    pub user_id: String,

    #[serde(rename = "ProcessorSessionID")]
    pub processor_session_id: String,

    #[serde(rename = "SecurityToken")]
    pub security_token: String,

    /// Where to save the report when no output path is given on the command
    /// line
    #[serde(rename = "OutputFilePath")]
    pub output_file_path: Option<PathBuf>,
}

impl Config {
    pub async fn load_from_path(path: &Path) -> Result<Self> {
        debug!("Loading config from {}", path.display());

        let mut file = File::open(path).await.context("open config file")?;
        Self::load_from_file(&mut file).await
    }

    async fn load_from_file(file: &mut File) -> Result<Self> {
        let mut dest = Vec::new();
        file.read_to_end(&mut dest).await.context("read config file")?;

        let fields: Map<String, Value> =
            serde_json::from_slice(&dest).context("parse config file")?;

        serde_json::from_value(Value::Object(canonical_keys(fields))).context("parse config file")
    }

    /// Returns the configured output path, if one is set and non-empty
    pub fn output_file_path(&self) -> Option<&Path> {
        self.output_file_path
            .as_deref()
            .filter(|path| !path.as_os_str().is_empty())
    }
}

const KEYS: &[&str] = &[
    "URL",
    "UserID",
    "ProcessorSessionID",
    "SecurityToken",
    "OutputFilePath",
];

/// Renames keys that match a config key case-insensitively to its canonical
/// spelling and drops null values
///
/// An exact match wins over a differently cased one.
fn canonical_keys(fields: Map<String, Value>) -> Map<String, Value> {
    let (exact, folded): (Vec<_>, Vec<_>) = fields
        .into_iter()
        .filter(|(_, value)| !value.is_null())
        .partition(|(key, _)| KEYS.contains(&key.as_str()));

    let mut canonical = Map::new();

    for (key, value) in folded.into_iter().chain(exact) {
        let key = KEYS
            .iter()
            .find(|name| name.eq_ignore_ascii_case(&key))
            .map_or(key, |name| name.to_string());
        canonical.insert(key, value);
    }

    canonical
}
