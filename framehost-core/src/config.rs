//! Host configuration.
//!
//! Every field has a default, so an empty JSON object is a valid config file.

use crate::memory::MemoryConfig;
use crate::state::OutOfBoundsPolicy;
use crate::vfs::DEFAULT_ROOT;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostConfig {
    /// Virtual directory created and entered during bootstrap.
    pub root: String,

    /// Host directory copied into `root` during bootstrap.
    pub asset_dir: Option<PathBuf>,

    /// Bounds for host-provided linear memory. Also caps growth of guest-owned memory.
    pub memory: MemoryConfig,

    /// Extra attempts after a failed guest fetch.
    pub fetch_retries: u32,

    pub out_of_bounds: OutOfBoundsPolicy,

    /// Target ticks per second for the frame loop.
    pub frame_rate: u32,

    /// Screen size passed to the guest's `init` by the binary.
    pub width: i32,
    pub height: i32,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            root: DEFAULT_ROOT.to_string(),
            asset_dir: None,
            memory: MemoryConfig::default(),
            fetch_retries: 0,
            out_of_bounds: OutOfBoundsPolicy::default(),
            frame_rate: 30,
            width: 160,
            height: 120,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read config {path:?}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid config {path:?}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
}

impl HostConfig {
    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}
