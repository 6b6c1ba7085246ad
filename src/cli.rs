use clap::Parser;
use std::ffi::OsString;
use std::path::PathBuf;

use crate::job::PlanOptions;

/// Hardcode subtitles into video files using ffmpeg presets
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Configuration file path
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Path to input file or directory (repeatable)
    #[arg(short, long = "input", required = true)]
    pub input: Vec<PathBuf>,

    /// Path to output file or directory; once, or once per input
    #[arg(short, long = "output")]
    pub output: Vec<PathBuf>,

    /// Output container extension [default: from configuration, mp4]
    #[arg(short, long)]
    pub extension: Option<String>,

    /// JSON file with video preset options (-vp); once, or once per input
    #[arg(long = "video-preset")]
    pub video_preset: Vec<PathBuf>,

    /// JSON file with audio preset options (-ap); once, or once per input
    #[arg(long = "audio-preset")]
    pub audio_preset: Vec<PathBuf>,

    /// JSON file with filter complex options (-fp); once, or once per input
    #[arg(long = "filter-preset")]
    pub filter_preset: Vec<PathBuf>,

    /// Subtitle stream index to burn in [default: first subtitle stream]
    #[arg(short, long = "subtitle-track")]
    pub subtitle_track: Vec<u32>,

    /// Copy AAC audio streams and re-encode anything else; overrides --audio-preset
    #[arg(long)]
    pub auto_audio_preset: bool,

    /// Print the ffmpeg commands without running them
    #[arg(long)]
    pub dry_run: bool,
}

impl Args {
    /// Parse process arguments, accepting the `-vp`, `-ap` and `-fp` spellings
    pub fn parse_normalized() -> Self {
        Self::parse_from(normalize_args(std::env::args_os()))
    }

    pub fn plan_options(&self) -> PlanOptions {
        PlanOptions {
            inputs: self.input.clone(),
            outputs: self.output.clone(),
            extension: self.extension.clone(),
            video_presets: self.video_preset.clone(),
            audio_presets: self.audio_preset.clone(),
            filter_presets: self.filter_preset.clone(),
            subtitle_tracks: self.subtitle_track.clone(),
            auto_audio_preset: self.auto_audio_preset,
        }
    }
}

/// Rewrite the two-letter short flags clap cannot express into their long forms
pub fn normalize_args<I, T>(args: I) -> Vec<OsString>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString>,
{
    args.into_iter()
        .map(Into::into)
        .map(|arg| match arg.to_str() {
            Some("-vp") => OsString::from("--video-preset"),
            Some("-ap") => OsString::from("--audio-preset"),
            Some("-fp") => OsString::from("--filter-preset"),
            _ => arg,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Args {
        Args::try_parse_from(normalize_args(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_short_preset_flags() {
        let args = parse(&[
            "ffconv", "-i", "a.mkv", "-i", "b.mkv", "-vp", "v1.json", "-vp", "v2.json",
            "-ap", "audio.json", "-fp", "filter.json", "-o", "out", "-e", "webm",
        ]);

        assert_eq!(args.input, vec![PathBuf::from("a.mkv"), PathBuf::from("b.mkv")]);
        assert_eq!(args.video_preset, vec![PathBuf::from("v1.json"), PathBuf::from("v2.json")]);
        assert_eq!(args.audio_preset, vec![PathBuf::from("audio.json")]);
        assert_eq!(args.filter_preset, vec![PathBuf::from("filter.json")]);
        assert_eq!(args.output, vec![PathBuf::from("out")]);
        assert_eq!(args.extension.as_deref(), Some("webm"));
        assert!(!args.auto_audio_preset);
    }

    #[test]
    fn test_plan_options_mirror_arguments() {
        let args = parse(&[
            "ffconv", "--input", "dir", "--auto-audio-preset", "-s", "2", "--dry-run",
        ]);
        assert!(args.dry_run);

        let options = args.plan_options();
        assert_eq!(options.inputs, vec![PathBuf::from("dir")]);
        assert!(options.outputs.is_empty());
        assert!(options.auto_audio_preset);
        assert_eq!(options.subtitle_tracks, vec![2]);
        assert_eq!(options.extension, None);
    }

    #[test]
    fn test_input_is_required() {
        assert!(Args::try_parse_from(["ffconv", "-o", "out"]).is_err());
    }

    #[test]
    fn test_only_exact_flags_are_rewritten() {
        let normalized = normalize_args(["ffconv", "-i", "-vp.mkv", "-ap", "--fp"]);
        assert_eq!(
            normalized,
            vec![
                OsString::from("ffconv"),
                OsString::from("-i"),
                OsString::from("-vp.mkv"),
                OsString::from("--audio-preset"),
                OsString::from("--fp"),
            ]
        );
    }
}
