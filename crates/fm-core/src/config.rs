//! Application configuration types.
//!
//! The top-level [`Config`] struct is deserialized from JSON and carries the
//! sub-configs for tool paths and matrix building. Every section defaults
//! sensibly so a completely empty `{}` file is valid.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::Error;

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub tools: ToolsConfig,
    pub matrix: MatrixConfig,
}

impl Config {
    /// Deserialize a `Config` from a JSON string.
    pub fn from_json(json_str: &str) -> Result<Self> {
        serde_json::from_str(json_str)
            .map_err(|e| Error::Validation(format!("config parse error: {e}")))
    }

    /// Load configuration from a file path, falling back to defaults if the
    /// path is `None` or the file does not exist.
    pub fn load_or_default(path: Option<&Path>) -> Self {
        let Some(path) = path else {
            return Self::default();
        };

        match std::fs::read_to_string(path) {
            Ok(contents) => Self::from_json(&contents).unwrap_or_else(|e| {
                tracing::warn!("Failed to parse config file {}: {e}", path.display());
                Self::default()
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!("No config file at {}; using defaults", path.display());
                Self::default()
            }
            Err(e) => {
                tracing::warn!("Failed to read config file {}: {e}", path.display());
                Self::default()
            }
        }
    }

    /// Return a list of validation warnings (non-fatal issues).
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        if self.matrix.probe_workers == 0 {
            warnings.push("matrix.probe_workers is 0; probing would never make progress".into());
        }
        if self.matrix.probe_workers > 512 {
            warnings.push(format!(
                "matrix.probe_workers is {}; spawning that many encoder processes is unlikely to help",
                self.matrix.probe_workers
            ));
        }
        if self.matrix.probe_timeout_secs == 0 {
            warnings.push("matrix.probe_timeout_secs is 0; every probe would time out".into());
        }

        if let Some(ref p) = self.tools.ffmpeg_path {
            if !p.exists() {
                warnings.push(format!("tools.ffmpeg_path {} does not exist", p.display()));
            }
        }
        if let Some(ref p) = self.tools.ffprobe_path {
            if !p.exists() {
                warnings.push(format!("tools.ffprobe_path {} does not exist", p.display()));
            }
        }

        warnings
    }
}

/// Paths to external CLI tools.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    pub ffmpeg_path: Option<PathBuf>,
    pub ffprobe_path: Option<PathBuf>,
}

/// Compatibility-matrix build settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MatrixConfig {
    /// Where the persisted matrix file lives.
    pub path: PathBuf,
    /// Number of concurrent encode probes per container.
    #[serde(default = "default_probe_workers")]
    pub probe_workers: usize,
    /// Maximum seconds a single encode probe may run before it is killed
    /// and counted as incompatible.
    #[serde(default = "default_probe_timeout")]
    pub probe_timeout_secs: u64,
}

fn default_probe_workers() -> usize {
    100
}

fn default_probe_timeout() -> u64 {
    30
}

impl Default for MatrixConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("./compatibility-matrix.json"),
            probe_workers: default_probe_workers(),
            probe_timeout_secs: default_probe_timeout(),
        }
    }
}
