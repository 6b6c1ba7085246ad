//! Video, audio and filter presets.
//!
//! A preset file is a JSON object mapping ffmpeg flags to values, e.g.
//! `{"-c:v": "libx264", "-crf": "18", "-tune": ""}`. Keys are kept in file
//! order and an empty value removes the flag from the command line. Filter
//! presets instead hold the filter chain segments placed `before` and `after`
//! the subtitle burn-in.

use serde::Deserialize;
use serde_json::Value;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::{FfconvError, Result};

/// File name of the stream-copy audio preset inside the preset directory
pub const AUDIO_COPY_FILE: &str = "audio-copy.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresetKind {
    Video,
    Audio,
}

impl PresetKind {
    /// Flag every preset of this kind must declare
    pub fn codec_flag(self) -> &'static str {
        match self {
            PresetKind::Video => "-c:v",
            PresetKind::Audio => "-c:a",
        }
    }

    /// File name of the default preset of this kind inside the preset directory
    pub fn default_file_name(self) -> &'static str {
        match self {
            PresetKind::Video => "video.json",
            PresetKind::Audio => "audio.json",
        }
    }
}

impl fmt::Display for PresetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PresetKind::Video => write!(f, "video"),
            PresetKind::Audio => write!(f, "audio"),
        }
    }
}

/// Ordered flag to value mapping for one stream type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Preset {
    kind: PresetKind,
    entries: Vec<(String, String)>,
}

impl Preset {
    pub fn from_entries<I, K, V>(kind: PresetKind, entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            kind,
            entries: entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Built-in H.264 video preset
    pub fn builtin_video() -> Self {
        Self::from_entries(
            PresetKind::Video,
            [
                ("-c:v", "libx264"),
                ("-pix_fmt", "yuv420p"),
                ("-crf", "18"),
                ("-preset", "slow"),
                ("-profile:v", "high"),
                ("-level:v", "4.0"),
            ],
        )
    }

    /// Built-in stereo AAC re-encode preset
    pub fn builtin_audio() -> Self {
        Self::from_entries(
            PresetKind::Audio,
            [("-c:a", "aac"), ("-strict", "2"), ("-ab", "192k"), ("-ac", "2")],
        )
    }

    /// Built-in audio stream copy preset
    pub fn builtin_audio_copy() -> Self {
        Self::from_entries(PresetKind::Audio, [("-c:a", "copy")])
    }

    /// Default preset of `kind`: `<preset_dir>/<kind>.json` when present, else built-in
    pub fn default_for(kind: PresetKind, preset_dir: &Path) -> Result<Self> {
        let path = preset_dir.join(kind.default_file_name());
        if path.is_file() {
            return Self::load(kind, &path);
        }
        Ok(match kind {
            PresetKind::Video => Self::builtin_video(),
            PresetKind::Audio => Self::builtin_audio(),
        })
    }

    /// Stream copy audio preset: `<preset_dir>/audio-copy.json` when present, else built-in
    pub fn default_audio_copy(preset_dir: &Path) -> Result<Self> {
        let path = preset_dir.join(AUDIO_COPY_FILE);
        if path.is_file() {
            return Self::load(PresetKind::Audio, &path);
        }
        Ok(Self::builtin_audio_copy())
    }

    pub fn load(kind: PresetKind, path: &Path) -> Result<Self> {
        let value = read_json(path)?;
        Self::from_value(kind, path, value)
    }

    fn from_value(kind: PresetKind, path: &Path, value: Value) -> Result<Self> {
        let Value::Object(map) = value else {
            return Err(schema_error(path, format!("{kind} preset must be a JSON object")));
        };

        let mut entries = Vec::with_capacity(map.len());
        for (flag, value) in map {
            if !flag.starts_with('-') {
                return Err(schema_error(path, format!("key `{flag}` is not a command line flag")));
            }
            let Value::String(value) = value else {
                return Err(schema_error(path, format!("value of `{flag}` must be a string")));
            };
            entries.push((flag, value));
        }

        let preset = Self { kind, entries };
        if preset.get(kind.codec_flag()).is_none() {
            return Err(schema_error(
                path,
                format!("{kind} preset must declare `{}`", kind.codec_flag()),
            ));
        }
        Ok(preset)
    }

    pub fn entries(&self) -> &[(String, String)] {
        &self.entries
    }

    pub fn get(&self, flag: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == flag)
            .map(|(_, v)| v.as_str())
    }

    /// Codec selected by this preset, if it sets one
    pub fn codec(&self) -> Option<&str> {
        self.get(self.kind.codec_flag()).filter(|v| !v.is_empty())
    }

    /// Flags that end up on the command line, in declaration order
    pub fn active_flags(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .filter(|(_, v)| !v.is_empty())
            .map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct FilterPresetFile {
    before: Option<String>,
    after: Option<String>,
}

/// Filter chain segments wrapped around the subtitle burn-in
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterPreset {
    before: String,
    after: String,
}

impl FilterPreset {
    /// Surrounding whitespace and dangling joining commas are dropped
    pub fn new(before: &str, after: &str) -> Self {
        Self {
            before: before.trim().trim_end_matches(',').trim_end().to_string(),
            after: after.trim().trim_start_matches(',').trim_start().to_string(),
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let value = read_json(path)?;
        let file: FilterPresetFile = serde_json::from_value(value)
            .map_err(|e| schema_error(path, e.to_string()))?;

        if file.before.is_none() && file.after.is_none() {
            return Err(schema_error(path, "filter preset needs `before` or `after`".to_string()));
        }

        Ok(Self::new(
            file.before.as_deref().unwrap_or_default(),
            file.after.as_deref().unwrap_or_default(),
        ))
    }

    pub fn before(&self) -> &str {
        &self.before
    }

    pub fn after(&self) -> &str {
        &self.after
    }
}

fn read_json(path: &Path) -> Result<Value> {
    if !path.is_file() {
        return Err(FfconvError::PresetNotFound(path.to_path_buf()));
    }
    let content = std::fs::read_to_string(path)?;
    serde_json::from_str(&content).map_err(|source| FfconvError::PresetParse {
        path: path.to_path_buf(),
        source,
    })
}

fn schema_error(path: &Path, reason: String) -> FfconvError {
    FfconvError::PresetSchema {
        path: PathBuf::from(path),
        reason,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_fs::prelude::*;
    use assert_fs::TempDir;

    #[test]
    fn test_load_keeps_file_order() {
        let dir = TempDir::new().unwrap();
        let file = dir.child("video.json");
        file.write_str(r#"{"-preset": "fast", "-c:v": "libx265", "-crf": "22", "-x265-params": ""}"#)
            .unwrap();

        let preset = Preset::load(PresetKind::Video, file.path()).unwrap();
        let keys: Vec<_> = preset.entries().iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["-preset", "-c:v", "-crf", "-x265-params"]);

        let active: Vec<_> = preset.active_flags().collect();
        assert_eq!(
            active,
            vec![("-preset", "fast"), ("-c:v", "libx265"), ("-crf", "22")]
        );
        assert_eq!(preset.codec(), Some("libx265"));
    }

    #[test]
    fn test_missing_file_is_not_found() {
        let err = Preset::load(PresetKind::Audio, Path::new("/nonexistent/audio.json")).unwrap_err();
        assert!(matches!(err, FfconvError::PresetNotFound(_)));
    }

    #[test]
    fn test_invalid_json_is_parse_error() {
        let dir = TempDir::new().unwrap();
        let file = dir.child("audio.json");
        file.write_str(r#"{"-c:a": "aac","#).unwrap();

        let err = Preset::load(PresetKind::Audio, file.path()).unwrap_err();
        assert!(matches!(err, FfconvError::PresetParse { .. }));
    }

    #[test]
    fn test_schema_violations() {
        let dir = TempDir::new().unwrap();
        let cases = [
            ("array.json", r#"["-c:a", "aac"]"#),
            ("number.json", r#"{"-c:a": "aac", "-ac": 2}"#),
            ("not_a_flag.json", r#"{"-c:a": "aac", "bitrate": "192k"}"#),
            ("no_codec.json", r#"{"-ab": "192k"}"#),
        ];

        for (name, content) in cases {
            let file = dir.child(name);
            file.write_str(content).unwrap();
            let err = Preset::load(PresetKind::Audio, file.path()).unwrap_err();
            assert!(
                matches!(err, FfconvError::PresetSchema { .. }),
                "{name} should be a schema error, got {err}"
            );
        }
    }

    #[test]
    fn test_default_falls_back_to_builtin() {
        let dir = TempDir::new().unwrap();
        assert_eq!(
            Preset::default_for(PresetKind::Video, dir.path()).unwrap(),
            Preset::builtin_video()
        );
        assert_eq!(
            Preset::default_for(PresetKind::Audio, dir.path()).unwrap(),
            Preset::builtin_audio()
        );
        assert_eq!(
            Preset::default_audio_copy(dir.path()).unwrap(),
            Preset::builtin_audio_copy()
        );
    }

    #[test]
    fn test_default_prefers_preset_dir() {
        let dir = TempDir::new().unwrap();
        dir.child("audio.json")
            .write_str(r#"{"-c:a": "libopus", "-b:a": "128k"}"#)
            .unwrap();

        let preset = Preset::default_for(PresetKind::Audio, dir.path()).unwrap();
        assert_eq!(preset.codec(), Some("libopus"));
        assert_eq!(preset.get("-b:a"), Some("128k"));
    }

    #[test]
    fn test_filter_preset_trims_segments() {
        let dir = TempDir::new().unwrap();
        let file = dir.child("filter.json");
        file.write_str(r#"{"before": " scale=in_color_matrix=bt709:out_color_matrix=bt709, ", "after": ",format=yuv420p"}"#)
            .unwrap();

        let filter = FilterPreset::load(file.path()).unwrap();
        assert_eq!(filter.before(), "scale=in_color_matrix=bt709:out_color_matrix=bt709");
        assert_eq!(filter.after(), "format=yuv420p");
    }

    #[test]
    fn test_filter_preset_schema() {
        let dir = TempDir::new().unwrap();

        let empty = dir.child("empty.json");
        empty.write_str("{}").unwrap();
        assert!(matches!(
            FilterPreset::load(empty.path()).unwrap_err(),
            FfconvError::PresetSchema { .. }
        ));

        let unknown = dir.child("unknown.json");
        unknown.write_str(r#"{"before": "", "middle": "x"}"#).unwrap();
        assert!(matches!(
            FilterPreset::load(unknown.path()).unwrap_err(),
            FfconvError::PresetSchema { .. }
        ));

        let after_only = dir.child("after.json");
        after_only.write_str(r#"{"after": "eq=gamma=1.1"}"#).unwrap();
        let filter = FilterPreset::load(after_only.path()).unwrap();
        assert_eq!(filter.before(), "");
        assert_eq!(filter.after(), "eq=gamma=1.1");
    }
}
