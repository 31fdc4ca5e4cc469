use std::path::{
    Path,
    PathBuf,
};

use directories::ProjectDirs;
use ltc::{
    DecoderConfig,
    DisplayMode,
    FrameRate,
    ParityPolicy,
};
use serde::{
    Deserialize,
    Serialize,
};

use crate::Error;

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub display: DisplayMode,
    pub decoder: DecoderSection,
}

impl Config {
    /// Loads `path`, or the default config file if there is one.
    pub fn load(path: Option<&Path>) -> Result<Self, Error> {
        if let Some(path) = path {
            Self::from_path(path)
        }
        else if let Some(path) = default_path().filter(|path| path.exists()) {
            Self::from_path(path)
        }
        else {
            tracing::debug!("No config file, using defaults");
            Ok(Self::default())
        }
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, Error> {
        tracing::debug!(path = %path.as_ref().display(), "Loading config from file");
        let text = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&text)?)
    }
}

fn default_path() -> Option<PathBuf> {
    let project_dirs = ProjectDirs::from("", "ltc", "ltc-cli")?;
    Some(project_dirs.config_dir().join("config.toml"))
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct DecoderSection {
    pub settle_ticks: u32,
    pub rate_lock_frames: u64,
    pub parity: ParityPolicy,
    pub rate: Option<FrameRate>,
}

impl Default for DecoderSection {
    fn default() -> Self {
        DecoderConfig::default().into()
    }
}

impl From<DecoderConfig> for DecoderSection {
    fn from(value: DecoderConfig) -> Self {
        Self {
            settle_ticks: value.settle_ticks,
            rate_lock_frames: value.rate_lock_frames,
            parity: value.parity,
            rate: value.rate,
        }
    }
}

impl From<DecoderSection> for DecoderConfig {
    fn from(value: DecoderSection) -> Self {
        Self {
            settle_ticks: value.settle_ticks,
            rate_lock_frames: value.rate_lock_frames,
            parity: value.parity,
            rate: value.rate,
        }
    }
}
