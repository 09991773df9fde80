//! Host configuration, read from a RON file.
//!
//! ```ron
//! (
//!     data_dir: "/home/me/.local/share/scrollmark",
//!     log_destination: Both,
//!     browser: Some("Fennec"),
//! )
//! ```

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use scrollmark_core::Browser;
use scrollmark_logging::LogDestination;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Environment variable naming the configuration file.
pub const CONFIG_ENV: &str = "SCROLLMARK_HOST_CONFIG";
/// Configuration file looked up in the working directory.
pub const CONFIG_FILENAME: &str = "scrollmark_host.ron";

const SETTINGS_FILENAME: &str = "settings.json";
const IMAGES_DIRNAME: &str = "images";
const LOG_FILENAME: &str = "scrollmark_host.log";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path:?}: {source}")]
    Read { path: PathBuf, source: io::Error },
    #[error("failed to parse {path:?}: {source}")]
    Parse {
        path: PathBuf,
        source: ron::error::SpannedError,
    },
}

/// Where log lines go. Stdout is reserved for protocol frames, so the
/// terminal target means stderr.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LogTarget {
    #[default]
    File,
    Terminal,
    Both,
}

impl From<LogTarget> for LogDestination {
    fn from(target: LogTarget) -> Self {
        match target {
            LogTarget::File => LogDestination::File,
            LogTarget::Terminal => LogDestination::Terminal,
            LogTarget::Both => LogDestination::Both,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostConfig {
    /// Holds `settings.json`, the `images/` directory and the log file.
    pub data_dir: PathBuf,
    pub log_destination: LogTarget,
    /// Browser name as reported by the extension; `None` means Chrome.
    pub browser: Option<String>,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("scrollmark_data"),
            log_destination: LogTarget::default(),
            browser: None,
        }
    }
}

impl HostConfig {
    /// Loads the file named by `SCROLLMARK_HOST_CONFIG`, falling back to
    /// `scrollmark_host.ron` in the working directory.
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var_os(CONFIG_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(CONFIG_FILENAME));
        Self::load_from(&path)
    }

    /// A missing file yields the defaults; an unreadable or malformed one is
    /// an error.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        ron::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn browser(&self) -> Browser {
        Browser::detect(self.browser.as_deref())
    }

    pub fn settings_path(&self) -> PathBuf {
        self.data_dir.join(SETTINGS_FILENAME)
    }

    pub fn images_dir(&self) -> PathBuf {
        self.data_dir.join(IMAGES_DIRNAME)
    }

    pub fn log_path(&self) -> PathBuf {
        self.data_dir.join(LOG_FILENAME)
    }
}
