//! Stream inspection through `ffprobe -show_streams`.

use async_trait::async_trait;
use serde::Deserialize;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

use crate::error::{FfconvError, Result};
use super::{MediaCommandBuilder, ToolRunner};

/// Stream layout of an input file, as far as conversion cares
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamSummary {
    audio_codecs: Vec<String>,
    subtitle_streams: usize,
}

impl StreamSummary {
    pub fn new(audio_codecs: Vec<String>, subtitle_streams: usize) -> Self {
        Self {
            audio_codecs,
            subtitle_streams,
        }
    }

    /// Codec of the first audio stream
    pub fn primary_audio_codec(&self) -> Option<&str> {
        self.audio_codecs.first().map(String::as_str)
    }

    pub fn subtitle_streams(&self) -> usize {
        self.subtitle_streams
    }

    /// Subtitle index (`si`) of the first subtitle stream
    pub fn first_subtitle_track(&self) -> Option<u32> {
        (self.subtitle_streams > 0).then_some(0)
    }
}

/// Reports the streams contained in a media file
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MediaProbe: Send + Sync {
    async fn probe(&self, path: &Path) -> Result<StreamSummary>;
}

pub struct FfprobeProbe {
    command_builder: MediaCommandBuilder,
    runner: Arc<dyn ToolRunner>,
}

impl FfprobeProbe {
    pub fn new(command_builder: MediaCommandBuilder, runner: Arc<dyn ToolRunner>) -> Self {
        Self {
            command_builder,
            runner,
        }
    }
}

#[async_trait]
impl MediaProbe for FfprobeProbe {
    async fn probe(&self, path: &Path) -> Result<StreamSummary> {
        let command = self.command_builder.probe_streams(path);
        let output = self
            .runner
            .run(&command)
            .await
            .map_err(|e| FfconvError::Probe(format!("{}: {}", path.display(), e)))?;

        let summary = parse_streams(&output.stdout)?;
        debug!(
            "Probed {}: audio {:?}, {} subtitle stream(s)",
            path.display(),
            summary.audio_codecs,
            summary.subtitle_streams
        );
        Ok(summary)
    }
}

#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    #[serde(default)]
    streams: Vec<FfprobeStream>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    codec_type: Option<String>,
    codec_name: Option<String>,
}

/// Parse `ffprobe -print_format json -show_streams` output
pub fn parse_streams(json: &str) -> Result<StreamSummary> {
    let output: FfprobeOutput = serde_json::from_str(json)
        .map_err(|e| FfconvError::Probe(format!("ffprobe JSON parse error: {}", e)))?;

    let mut summary = StreamSummary::default();
    for stream in output.streams {
        match stream.codec_type.as_deref() {
            Some("audio") => {
                if let Some(codec) = stream.codec_name {
                    summary.audio_codecs.push(codec);
                }
            }
            Some("subtitle") => summary.subtitle_streams += 1,
            _ => {}
        }
    }
    Ok(summary)
}
