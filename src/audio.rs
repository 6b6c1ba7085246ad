use std::path::Path;
use tracing::debug;

use crate::error::{FfconvError, Result};
use crate::media::StreamSummary;
use crate::preset::{Preset, PresetKind};

/// Chooses between re-encoding and copying the audio stream of each input.
///
/// Inputs whose primary audio codec already equals the codec produced by the
/// re-encode preset are stream copied.
#[derive(Debug, Clone)]
pub struct AutoAudioPolicy {
    reencode: Preset,
    copy: Preset,
}

impl AutoAudioPolicy {
    pub fn new(reencode: Preset, copy: Preset) -> Self {
        Self { reencode, copy }
    }

    /// Policy built from the default audio presets
    pub fn from_preset_dir(preset_dir: &Path) -> Result<Self> {
        Ok(Self::new(
            Preset::default_for(PresetKind::Audio, preset_dir)?,
            Preset::default_audio_copy(preset_dir)?,
        ))
    }

    /// Codec the re-encode preset outputs
    pub fn target_codec(&self) -> Option<&str> {
        self.reencode.codec()
    }

    pub fn select(&self, codec: &str) -> &Preset {
        let copy = self
            .target_codec()
            .is_some_and(|target| target.eq_ignore_ascii_case(codec));
        debug!(
            "Detected audio codec `{}`, {}",
            codec,
            if copy { "copying stream" } else { "re-encoding" }
        );
        if copy { &self.copy } else { &self.reencode }
    }

    /// Select a preset from probe results; fails when no audio codec was found
    pub fn select_for(&self, streams: &StreamSummary) -> Result<&Preset> {
        let codec = streams
            .primary_audio_codec()
            .ok_or_else(|| FfconvError::Probe("no audio stream found".to_string()))?;
        Ok(self.select(codec))
    }
}
