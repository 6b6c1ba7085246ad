use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FfconvError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Input resolution error: {0}")]
    InputResolution(String),

    #[error("Preset not found: {}", .0.display())]
    PresetNotFound(PathBuf),

    #[error("Preset {} is not valid JSON: {source}", .path.display())]
    PresetParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Preset {} has an invalid layout: {reason}", .path.display())]
    PresetSchema { path: PathBuf, reason: String },

    #[error("Probe error: {0}")]
    Probe(String),

    #[error("Cannot build command: {0}")]
    CommandBuilder(String),

    #[error("{tool} failed{}: {stderr}", .status.map(|c| format!(" with exit code {c}")).unwrap_or_default())]
    ExternalTool {
        tool: String,
        status: Option<i32>,
        stderr: String,
    },
}

pub type Result<T> = std::result::Result<T, FfconvError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_external_tool_message_carries_stderr() {
        let err = FfconvError::ExternalTool {
            tool: "ffmpeg".to_string(),
            status: Some(1),
            stderr: "Invalid data found when processing input".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "ffmpeg failed with exit code 1: Invalid data found when processing input"
        );

        let killed = FfconvError::ExternalTool {
            tool: "ffmpeg".to_string(),
            status: None,
            stderr: String::new(),
        };
        assert_eq!(killed.to_string(), "ffmpeg failed: ");
    }
}
