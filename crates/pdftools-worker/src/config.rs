//! Configuration for the worker layer
//!
//! Loaded from an optional TOML file, then overridden from the environment:
//!
//! ```toml
//! [interpreter]
//! binary = "gs"
//! timeout_ms = 120000
//!
//! [harvest]
//! max_numbered_outputs = 10000
//! ```

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use pdftools_core::harvest::{HarvestLimits, DEFAULT_MAX_NUMBERED_OUTPUTS};

pub const ENV_BINARY: &str = "PDFTOOLS_GS_BINARY";
pub const ENV_TIMEOUT_MS: &str = "PDFTOOLS_TIMEOUT_MS";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkerConfig {
    #[serde(default)]
    pub interpreter: InterpreterConfig,
    #[serde(default)]
    pub harvest: HarvestConfig,
}

impl WorkerConfig {
    /// Load configuration from a TOML file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or the TOML is malformed
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML string
    pub fn from_toml_str(s: &str) -> anyhow::Result<Self> {
        toml::from_str(s).context("Failed to parse TOML configuration")
    }

    /// Apply `PDFTOOLS_GS_BINARY` / `PDFTOOLS_TIMEOUT_MS` from the process environment
    pub fn with_env_overrides(self) -> anyhow::Result<Self> {
        self.with_overrides_from(|key| std::env::var(key).ok())
    }

    pub fn with_overrides_from<F>(mut self, lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(binary) = lookup(ENV_BINARY).filter(|v| !v.is_empty()) {
            self.interpreter.binary = PathBuf::from(binary);
        }
        if let Some(timeout) = lookup(ENV_TIMEOUT_MS).filter(|v| !v.is_empty()) {
            let ms = timeout
                .parse::<u64>()
                .with_context(|| format!("{} must be an integer, got {:?}", ENV_TIMEOUT_MS, timeout))?;
            self.interpreter.timeout_ms = Some(ms);
        }
        Ok(self)
    }

    pub fn harvest_limits(&self) -> HarvestLimits {
        HarvestLimits {
            max_numbered_outputs: self.harvest.max_numbered_outputs,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterpreterConfig {
    /// Ghostscript executable (default: `gs` on PATH)
    #[serde(default = "default_binary")]
    pub binary: PathBuf,
    /// Kill an invocation that runs longer than this
    #[serde(default)]
    pub timeout_ms: Option<u64>,
}

impl InterpreterConfig {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }
}

impl Default for InterpreterConfig {
    fn default() -> Self {
        Self {
            binary: default_binary(),
            timeout_ms: None,
        }
    }
}

fn default_binary() -> PathBuf {
    PathBuf::from("gs")
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HarvestConfig {
    #[serde(default = "default_max_numbered_outputs")]
    pub max_numbered_outputs: usize,
}

impl Default for HarvestConfig {
    fn default() -> Self {
        Self {
            max_numbered_outputs: default_max_numbered_outputs(),
        }
    }
}

fn default_max_numbered_outputs() -> usize {
    DEFAULT_MAX_NUMBERED_OUTPUTS
}
