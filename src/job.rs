//! Conversion planning: positional option assignment and job values.
//!
//! Repeatable options (`--output`, presets, subtitle tracks) are given either
//! once, applying to every input path, or once per input path in the same
//! order. Any other count is rejected before the batch starts.

use std::path::{Path, PathBuf};
use tracing::warn;

use crate::audio::AutoAudioPolicy;
use crate::config::Config;
use crate::error::{FfconvError, Result};
use crate::input::{resolve_inputs, ResolvedInput};
use crate::preset::{FilterPreset, Preset, PresetKind};

/// Output containers accepted by `--extension`
pub const SUPPORTED_EXTENSIONS: &[&str] = &["mp4", "mkv", "webm", "avi", "mov", "m4v"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Positional<T> {
    Empty,
    Shared(T),
    PerInput(Vec<T>),
}

impl<T> Positional<T> {
    /// Assign `values` to `inputs` input paths
    pub fn assign(mut values: Vec<T>, inputs: usize, option: &str) -> Result<Self> {
        let count = values.len();
        if count > 1 && count != inputs {
            return Err(FfconvError::Config(format!(
                "The amount of input values ({}) does not equal the amount of {} values ({})",
                inputs, option, count
            )));
        }

        Ok(match values.pop() {
            None => Positional::Empty,
            Some(value) if values.is_empty() => Positional::Shared(value),
            Some(value) => {
                values.push(value);
                Positional::PerInput(values)
            }
        })
    }

    pub fn get(&self, slot: usize) -> Option<&T> {
        match self {
            Positional::Empty => None,
            Positional::Shared(value) => Some(value),
            Positional::PerInput(values) => values.get(slot),
        }
    }
}

/// A preset used for every input, or preset files loaded per input path
#[derive(Debug, Clone)]
pub enum PresetChoice<T> {
    Fixed(T),
    PerInput(Vec<PathBuf>),
}

impl<T: Clone> PresetChoice<T> {
    /// Shared preset files are loaded here so a broken one stops the whole batch
    fn from_paths<F>(paths: Vec<PathBuf>, inputs: usize, option: &str, load: F) -> Result<Option<Self>>
    where
        F: Fn(&Path) -> Result<T>,
    {
        Ok(match Positional::assign(paths, inputs, option)? {
            Positional::Empty => None,
            Positional::Shared(path) => Some(PresetChoice::Fixed(load(&path)?)),
            Positional::PerInput(paths) => Some(PresetChoice::PerInput(paths)),
        })
    }

    fn resolve<F>(&self, slot: usize, load: F) -> Result<T>
    where
        F: Fn(&Path) -> Result<T>,
    {
        match self {
            PresetChoice::Fixed(preset) => Ok(preset.clone()),
            PresetChoice::PerInput(paths) => {
                let path = paths.get(slot).ok_or_else(|| {
                    FfconvError::Config(format!("no preset for input {}", slot + 1))
                })?;
                load(path)
            }
        }
    }
}

#[derive(Debug, Clone)]
pub enum AudioChoice {
    /// Picked per file from its probed audio codec
    Auto(AutoAudioPolicy),
    Explicit(PresetChoice<Preset>),
}

/// User choices a plan is built from
#[derive(Debug, Clone, Default)]
pub struct PlanOptions {
    pub inputs: Vec<PathBuf>,
    pub outputs: Vec<PathBuf>,
    pub extension: Option<String>,
    pub video_presets: Vec<PathBuf>,
    pub audio_presets: Vec<PathBuf>,
    pub filter_presets: Vec<PathBuf>,
    pub subtitle_tracks: Vec<u32>,
    pub auto_audio_preset: bool,
}

/// Validated batch: resolved inputs plus everything needed to build their jobs
#[derive(Debug, Clone)]
pub struct ConversionPlan {
    inputs: Vec<ResolvedInput>,
    extension: String,
    video: PresetChoice<Preset>,
    audio: AudioChoice,
    filter: Option<PresetChoice<FilterPreset>>,
    subtitle_tracks: Positional<u32>,
}

impl ConversionPlan {
    pub fn build(options: PlanOptions, config: &Config) -> Result<Self> {
        let slots = options.inputs.len();
        let preset_dir = config.conversion.preset_dir.as_path();

        let extension = normalize_extension(
            options
                .extension
                .as_deref()
                .unwrap_or(&config.conversion.extension),
        )?;

        let video = match PresetChoice::from_paths(options.video_presets, slots, "video preset", load_video)? {
            Some(choice) => choice,
            None => PresetChoice::Fixed(Preset::default_for(PresetKind::Video, preset_dir)?),
        };

        let audio = if options.auto_audio_preset {
            if !options.audio_presets.is_empty() {
                warn!("--audio-preset is ignored because --auto-audio-preset is set");
            }
            AudioChoice::Auto(AutoAudioPolicy::from_preset_dir(preset_dir)?)
        } else {
            match PresetChoice::from_paths(options.audio_presets, slots, "audio preset", load_audio)? {
                Some(choice) => AudioChoice::Explicit(choice),
                None => AudioChoice::Explicit(PresetChoice::Fixed(Preset::default_for(
                    PresetKind::Audio,
                    preset_dir,
                )?)),
            }
        };

        let filter = PresetChoice::from_paths(options.filter_presets, slots, "filter preset", FilterPreset::load)?;
        let subtitle_tracks = Positional::assign(options.subtitle_tracks, slots, "subtitle track")?;

        let outputs = if options.outputs.is_empty() {
            vec![config.conversion.output.clone()]
        } else {
            options.outputs
        };
        let inputs = resolve_inputs(&options.inputs, &outputs)?;

        Ok(Self {
            inputs,
            extension,
            video,
            audio,
            filter,
            subtitle_tracks,
        })
    }

    pub fn inputs(&self) -> &[ResolvedInput] {
        &self.inputs
    }

    pub fn extension(&self) -> &str {
        &self.extension
    }

    pub fn output_path(&self, input: &ResolvedInput) -> PathBuf {
        input.output.output_file(&input.input, &self.extension)
    }

    pub fn video_preset(&self, slot: usize) -> Result<Preset> {
        self.video.resolve(slot, load_video)
    }

    /// Policy for automatic audio selection, when enabled
    pub fn auto_audio_policy(&self) -> Option<&AutoAudioPolicy> {
        match &self.audio {
            AudioChoice::Auto(policy) => Some(policy),
            AudioChoice::Explicit(_) => None,
        }
    }

    /// Audio preset for this input path; `None` under automatic selection
    pub fn audio_preset(&self, slot: usize) -> Result<Option<Preset>> {
        match &self.audio {
            AudioChoice::Auto(_) => Ok(None),
            AudioChoice::Explicit(choice) => choice.resolve(slot, load_audio).map(Some),
        }
    }

    pub fn filter_preset(&self, slot: usize) -> Result<Option<FilterPreset>> {
        self.filter
            .as_ref()
            .map(|choice| choice.resolve(slot, FilterPreset::load))
            .transpose()
    }

    /// Subtitle index given on the command line for this input path
    pub fn subtitle_track(&self, slot: usize) -> Option<u32> {
        self.subtitle_tracks.get(slot).copied()
    }
}

fn load_video(path: &Path) -> Result<Preset> {
    Preset::load(PresetKind::Video, path)
}

fn load_audio(path: &Path) -> Result<Preset> {
    Preset::load(PresetKind::Audio, path)
}

/// Lowercase extension without leading dot, if supported
pub fn normalize_extension(extension: &str) -> Result<String> {
    let extension = extension.trim().trim_start_matches('.').to_ascii_lowercase();
    if SUPPORTED_EXTENSIONS.contains(&extension.as_str()) {
        Ok(extension)
    } else {
        Err(FfconvError::Config(format!(
            "unsupported output extension `{}` (expected one of: {})",
            extension,
            SUPPORTED_EXTENSIONS.join(", ")
        )))
    }
}

/// One fully resolved conversion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionJob {
    input: PathBuf,
    output: PathBuf,
    video: Preset,
    audio: Option<Preset>,
    filter: Option<FilterPreset>,
    subtitle_track: u32,
}

impl ConversionJob {
    pub fn new(
        input: PathBuf,
        output: PathBuf,
        video: Preset,
        audio: Option<Preset>,
        filter: Option<FilterPreset>,
        subtitle_track: u32,
    ) -> Self {
        Self {
            input,
            output,
            video,
            audio,
            filter,
            subtitle_track,
        }
    }

    pub fn input(&self) -> &Path {
        &self.input
    }

    pub fn output(&self) -> &Path {
        &self.output
    }

    pub fn video(&self) -> &Preset {
        &self.video
    }

    /// `None` when automatic selection could not detect an audio codec
    pub fn audio(&self) -> Option<&Preset> {
        self.audio.as_ref()
    }

    pub fn filter(&self) -> Option<&FilterPreset> {
        self.filter.as_ref()
    }

    pub fn subtitle_track(&self) -> u32 {
        self.subtitle_track
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_fs::prelude::*;
    use assert_fs::TempDir;

    struct Fixture {
        dir: TempDir,
        config: Config,
    }

    impl Fixture {
        fn new() -> Self {
            let dir = TempDir::new().unwrap();
            let mut config = Config::default();
            config.conversion.preset_dir = dir.path().join("preset");
            config.conversion.output = dir.path().join("output");
            Self { dir, config }
        }

        fn file(&self, name: &str, content: &str) -> PathBuf {
            let child = self.dir.child(name);
            child.write_str(content).unwrap();
            child.path().to_path_buf()
        }

        fn inputs(&self, count: usize) -> Vec<PathBuf> {
            (1..=count)
                .map(|n| self.file(&format!("in/{n}.mkv"), ""))
                .collect()
        }
    }

    #[test]
    fn test_positional_assignment() {
        assert_eq!(Positional::<u32>::assign(vec![], 3, "x").unwrap(), Positional::Empty);
        assert_eq!(Positional::assign(vec![7], 3, "x").unwrap(), Positional::Shared(7));
        assert_eq!(
            Positional::assign(vec![1, 2, 3], 3, "x").unwrap(),
            Positional::PerInput(vec![1, 2, 3])
        );
        assert!(matches!(
            Positional::assign(vec![1, 2], 3, "x"),
            Err(FfconvError::Config(_))
        ));

        let shared = Positional::Shared("a");
        assert_eq!(shared.get(5), Some(&"a"));
        let per_input = Positional::PerInput(vec!["a", "b"]);
        assert_eq!(per_input.get(1), Some(&"b"));
        assert_eq!(Positional::<&str>::Empty.get(0), None);
    }

    #[test]
    fn test_defaults_without_presets() {
        let fixture = Fixture::new();
        let options = PlanOptions {
            inputs: fixture.inputs(1),
            ..Default::default()
        };
        let plan = ConversionPlan::build(options, &fixture.config).unwrap();

        assert_eq!(plan.extension(), "mp4");
        assert_eq!(plan.video_preset(0).unwrap(), Preset::builtin_video());
        assert!(plan.auto_audio_policy().is_none());
        assert_eq!(plan.audio_preset(0).unwrap(), Some(Preset::builtin_audio()));
        assert_eq!(plan.filter_preset(0).unwrap(), None);
        assert_eq!(plan.subtitle_track(0), None);

        let input = &plan.inputs()[0];
        assert_eq!(
            plan.output_path(input),
            fixture.dir.path().join("output").join("1.mp4")
        );
    }

    #[test]
    fn test_video_presets_pair_with_inputs() {
        let fixture = Fixture::new();
        let presets: Vec<_> = ["libx264", "libx265", "libsvtav1"]
            .iter()
            .map(|codec| fixture.file(&format!("{codec}.json"), &format!(r#"{{"-c:v": "{codec}"}}"#)))
            .collect();

        let options = PlanOptions {
            inputs: fixture.inputs(3),
            video_presets: presets,
            ..Default::default()
        };
        let plan = ConversionPlan::build(options, &fixture.config).unwrap();

        let codecs: Vec<_> = plan
            .inputs()
            .iter()
            .map(|input| plan.video_preset(input.slot).unwrap().codec().unwrap().to_string())
            .collect();
        assert_eq!(codecs, vec!["libx264", "libx265", "libsvtav1"]);
    }

    #[test]
    fn test_mismatched_preset_count_is_fatal() {
        let fixture = Fixture::new();
        let preset = fixture.file("v.json", r#"{"-c:v": "libx264"}"#);
        let options = PlanOptions {
            inputs: fixture.inputs(3),
            video_presets: vec![preset.clone(), preset],
            ..Default::default()
        };

        let err = ConversionPlan::build(options, &fixture.config).unwrap_err();
        assert!(matches!(err, FfconvError::Config(ref msg) if msg.contains("video preset")));
    }

    #[test]
    fn test_broken_shared_preset_is_fatal() {
        let fixture = Fixture::new();
        let options = PlanOptions {
            inputs: fixture.inputs(2),
            audio_presets: vec![fixture.dir.path().join("missing.json")],
            ..Default::default()
        };

        let err = ConversionPlan::build(options, &fixture.config).unwrap_err();
        assert!(matches!(err, FfconvError::PresetNotFound(_)));
    }

    #[test]
    fn test_broken_per_input_preset_only_affects_its_input() {
        let fixture = Fixture::new();
        let good = fixture.file("good.json", r#"{"-c:v": "libx264"}"#);
        let bad = fixture.file("bad.json", r#"{"-c:v": 264}"#);
        let options = PlanOptions {
            inputs: fixture.inputs(2),
            video_presets: vec![good, bad],
            ..Default::default()
        };

        let plan = ConversionPlan::build(options, &fixture.config).unwrap();
        assert!(plan.video_preset(0).is_ok());
        assert!(matches!(plan.video_preset(1), Err(FfconvError::PresetSchema { .. })));
    }

    #[test]
    fn test_auto_audio_overrides_explicit_presets() {
        let fixture = Fixture::new();
        let options = PlanOptions {
            inputs: fixture.inputs(1),
            audio_presets: vec![fixture.file("a.json", r#"{"-c:a": "libopus"}"#)],
            auto_audio_preset: true,
            ..Default::default()
        };

        let plan = ConversionPlan::build(options, &fixture.config).unwrap();
        let policy = plan.auto_audio_policy().expect("automatic audio selection");
        assert_eq!(policy.target_codec(), Some("aac"));
        assert_eq!(plan.audio_preset(0).unwrap(), None);
    }

    #[test]
    fn test_filter_and_subtitle_tracks() {
        let fixture = Fixture::new();
        let filter = fixture.file("filter.json", r#"{"before": "", "after": "format=yuv420p"}"#);
        let options = PlanOptions {
            inputs: fixture.inputs(2),
            filter_presets: vec![filter],
            subtitle_tracks: vec![1, 3],
            extension: Some(".MKV".to_string()),
            ..Default::default()
        };

        let plan = ConversionPlan::build(options, &fixture.config).unwrap();
        assert_eq!(plan.extension(), "mkv");
        assert_eq!(
            plan.filter_preset(1).unwrap(),
            Some(FilterPreset::new("", "format=yuv420p"))
        );
        assert_eq!(plan.subtitle_track(0), Some(1));
        assert_eq!(plan.subtitle_track(1), Some(3));
    }

    #[test]
    fn test_extension_validation() {
        assert_eq!(normalize_extension("mp4").unwrap(), "mp4");
        assert_eq!(normalize_extension(".WebM").unwrap(), "webm");
        assert!(matches!(normalize_extension("srt"), Err(FfconvError::Config(_))));
        assert!(matches!(normalize_extension(""), Err(FfconvError::Config(_))));
    }
}
