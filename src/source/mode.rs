// Deployment mode: which tiers the resolver may use
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::errors::RagError;

/// Data-acquisition strategy, resolved once at startup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeploymentMode {
    /// Bundled snapshot only
    Embedded,
    /// Filesystem, then dev HTTP server
    Local,
    /// Production HTTP only
    Remote,
}

impl fmt::Display for DeploymentMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Embedded => "embedded",
            Self::Local => "local",
            Self::Remote => "remote",
        };
        f.write_str(name)
    }
}

impl FromStr for DeploymentMode {
    type Err = RagError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "embedded" => Ok(Self::Embedded),
            "local" => Ok(Self::Local),
            "remote" => Ok(Self::Remote),
            other => Err(RagError::ConfigError(format!(
                "unknown deployment mode '{}' (expected embedded, local or remote)",
                other
            ))),
        }
    }
}

/// Observed runtime signals used by `auto` detection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EnvironmentSignals {
    pub serverless: bool,
    pub dev_marker: bool,
    pub local_corpus: bool,
}

impl EnvironmentSignals {
    /// Read signals from the process environment
    pub fn collect(local_corpus: bool) -> Self {
        let serverless = ["RAG_SERVERLESS", "AWS_LAMBDA_FUNCTION_NAME", "K_SERVICE"]
            .iter()
            .any(|key| std::env::var_os(key).is_some());
        let dev_marker = std::env::var("RAG_DEV")
            .map(|v| matches!(v.trim().to_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);

        Self {
            serverless,
            dev_marker,
            local_corpus,
        }
    }

    /// Conservative choice: only unambiguous development signals select
    /// `Local`; conflicting or absent signals select `Embedded`.
    pub fn detect(&self) -> DeploymentMode {
        let dev = self.dev_marker || self.local_corpus;
        if dev && !self.serverless {
            DeploymentMode::Local
        } else {
            DeploymentMode::Embedded
        }
    }
}
