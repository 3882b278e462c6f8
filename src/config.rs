//! Settings shared by both tools, loadable from a YAML file and overridden by CLI flags.
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("parse {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("invalid setting: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestSettings {
    /// Records per bulk-add call.
    pub batch_size: usize,
    /// Splits key from payload at its first occurrence.
    pub separator: char,
    pub key_field: String,
    pub payload_field: String,
    /// Issue one commit after every file has been loaded.
    pub commit: bool,
}

impl Default for IngestSettings {
    fn default() -> Self {
        Self {
            batch_size: 300,
            separator: ' ',
            key_field: "track_id".into(),
            payload_field: "fp".into(),
            commit: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuerySettings {
    pub fields: String,
    /// A worker logs its running average every this many queries.
    pub log_every: u64,
}

impl Default for QuerySettings {
    fn default() -> Self {
        Self {
            fields: "*,score".into(),
            log_every: 200,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BenchConfig {
    pub engine: String,
    /// Extra `key=value` connect options, e.g. `timeout_ms=5000`.
    pub connect: Vec<String>,
    pub ingest: IngestSettings,
    pub query: QuerySettings,
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self {
            engine: "solr".into(),
            connect: Vec::new(),
            ingest: IngestSettings::default(),
            query: QuerySettings::default(),
        }
    }
}

impl BenchConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let cfg = Self::from_yaml(&text).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_yaml(text: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(text)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.ingest.batch_size == 0 {
            return Err(ConfigError::Invalid("ingest.batch_size must be at least 1".into()));
        }
        if self.query.log_every == 0 {
            return Err(ConfigError::Invalid("query.log_every must be at least 1".into()));
        }
        Ok(())
    }
}
