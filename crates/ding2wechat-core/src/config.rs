//! Receiver/target configuration loaded from YAML

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;
use url::Url;

/// Errors raised while loading the configuration. All of them are fatal at startup.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_yml::Error),

    #[error("duplicate receiver: {0}")]
    DuplicateReceiver(String),
}

/// On-disk shape of the config document
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    #[serde(default)]
    receivers: Vec<Receiver>,
}

/// Validated configuration. Immutable once built; share it behind an `Arc`.
#[derive(Debug, Clone)]
pub struct Config {
    receivers: Vec<Receiver>,
}

/// A named fanout group addressed by `?name=` on the receiver endpoint
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Receiver {
    pub name: String,
    #[serde(default)]
    pub targets: Vec<Target>,
}

/// One destination webhook and the mentions injected into text messages sent to it
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Target {
    pub url: String,
    #[serde(default)]
    pub mentioned_list: Vec<String>,
    #[serde(default)]
    pub mentioned_mobile_list: Vec<String>,
}

impl std::fmt::Debug for Target {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Target")
            .field("url", &self.redacted_url())
            .field("mentioned_list", &self.mentioned_list)
            .field("mentioned_mobile_list", &self.mentioned_mobile_list)
            .finish()
    }
}

impl Target {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            mentioned_list: Vec::new(),
            mentioned_mobile_list: Vec::new(),
        }
    }

    /// The target URL with the webhook `key` query value masked.
    ///
    /// WeCom robot URLs carry their credential in `?key=`, so this is the form
    /// that goes into logs. Unparseable URLs are returned unchanged.
    pub fn redacted_url(&self) -> String {
        let Ok(mut parsed) = Url::parse(&self.url) else {
            return self.url.clone();
        };
        if !parsed.query_pairs().any(|(k, _)| k == "key") {
            return self.url.clone();
        }

        let pairs: Vec<(String, String)> = parsed
            .query_pairs()
            .map(|(k, v)| {
                let v = if k == "key" {
                    mask_secret(&v)
                } else {
                    v.into_owned()
                };
                (k.into_owned(), v)
            })
            .collect();
        parsed.query_pairs_mut().clear().extend_pairs(pairs);
        parsed.to_string()
    }
}

impl Config {
    /// Build a configuration, rejecting the first receiver name that repeats.
    pub fn new(receivers: Vec<Receiver>) -> Result<Self, LoadError> {
        let mut seen = HashSet::new();
        for receiver in &receivers {
            if !seen.insert(receiver.name.as_str()) {
                return Err(LoadError::DuplicateReceiver(receiver.name.clone()));
            }
        }
        Ok(Self { receivers })
    }

    /// Parse a YAML document. Unknown keys are rejected.
    pub fn from_yaml(content: &str) -> Result<Self, LoadError> {
        let file: ConfigFile = serde_yml::from_str(content)?;
        Self::new(file.receivers)
    }

    pub fn load_file(path: impl AsRef<Path>) -> Result<Self, LoadError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| LoadError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&content)
    }

    pub fn receivers(&self) -> &[Receiver] {
        &self.receivers
    }

    pub fn receiver(&self, name: &str) -> Option<&Receiver> {
        self.receivers.iter().find(|r| r.name == name)
    }
}

/// Mask a secret for log output: first 3 and last 4 chars for values longer
/// than 7 chars, otherwise "***". Slices on char boundaries.
fn mask_secret(s: &str) -> String {
    if s.is_empty() {
        return "(empty)".to_string();
    }
    let chars: Vec<char> = s.chars().collect();
    if chars.len() > 7 {
        let prefix: String = chars[..3].iter().collect();
        let suffix: String = chars[chars.len() - 4..].iter().collect();
        format!("{}...{}", prefix, suffix)
    } else {
        "***".to_string()
    }
}
