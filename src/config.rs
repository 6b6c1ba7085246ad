use serde::Deserialize;
use std::path::{Path, PathBuf};
use crate::error::{Result, FfconvError};

/// Configuration file looked up in the current directory when `--config` is absent
pub const DEFAULT_CONFIG_FILE: &str = "ffconv.toml";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub tools: ToolsConfig,
    #[serde(default)]
    pub conversion: ConversionConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    /// Path to ffmpeg binary
    pub ffmpeg: String,
    /// Path to ffprobe binary
    pub ffprobe: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ConversionConfig {
    /// Output container extension used when `--extension` is not given
    pub extension: String,
    /// Output directory used when `--output` is not given
    pub output: PathBuf,
    /// Directory holding `video.json`, `audio.json` and `audio-copy.json`.
    /// Files present here replace the built-in default presets.
    pub preset_dir: PathBuf,
    /// Value passed to ffmpeg's `-loglevel`
    pub loglevel: String,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            ffmpeg: "ffmpeg".to_string(),
            ffprobe: "ffprobe".to_string(),
        }
    }
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            extension: "mp4".to_string(),
            output: PathBuf::from("output"),
            preset_dir: PathBuf::from("preset"),
            loglevel: "error".to_string(),
        }
    }
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| FfconvError::Config(format!("Failed to read config file: {}", e)))?;

        toml::from_str(&content)
            .map_err(|e| FfconvError::Config(format!("Failed to parse config file: {}", e)))
    }

    /// Load `path` if given, else `ffconv.toml` from the working directory, else defaults
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => Self::from_file(DEFAULT_CONFIG_FILE),
            None => Ok(Self::default()),
        }
    }
}
