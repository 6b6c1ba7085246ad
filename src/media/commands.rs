use std::fmt;
use std::path::Path;

use crate::config::Config;
use crate::job::ConversionJob;
use crate::preset::{FilterPreset, Preset};

/// External tool invocation: program plus ordered arguments
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaCommand {
    pub binary_path: String,
    pub args: Vec<String>,
    pub description: String,
}

impl MediaCommand {
    /// Create a new media processing command
    pub fn new<S1: Into<String>, S2: Into<String>>(binary_path: S1, description: S2) -> Self {
        Self {
            binary_path: binary_path.into(),
            args: Vec::new(),
            description: description.into(),
        }
    }

    /// Add an argument
    pub fn arg<S: Into<String>>(mut self, arg: S) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Add multiple arguments
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(|s| s.into()));
        self
    }

    /// Add input file
    pub fn input<P: AsRef<Path>>(self, path: P) -> Self {
        self.arg("-i").arg(path.as_ref().to_string_lossy().to_string())
    }

    /// Add output file
    pub fn output<P: AsRef<Path>>(self, path: P) -> Self {
        self.arg(path.as_ref().to_string_lossy().to_string())
    }

    /// Force overwrite output
    pub fn overwrite(self) -> Self {
        self.arg("-y")
    }

    /// Set the filter graph
    pub fn filter_complex<S: Into<String>>(self, graph: S) -> Self {
        self.arg("-filter_complex").arg(graph)
    }

    /// Append the preset's non-empty flags in declaration order
    pub fn preset(mut self, preset: &Preset) -> Self {
        for (flag, value) in preset.active_flags() {
            self = self.arg(flag).arg(value);
        }
        self
    }

    /// Program name used in error reports
    pub fn tool_name(&self) -> String {
        Path::new(&self.binary_path)
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| self.binary_path.clone())
    }
}

impl fmt::Display for MediaCommand {
    /// Shell-like rendering for logs and dry runs
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", shell_quote(&self.binary_path))?;
        for arg in &self.args {
            write!(f, " {}", shell_quote(arg))?;
        }
        Ok(())
    }
}

fn shell_quote(arg: &str) -> String {
    let plain = !arg.is_empty()
        && arg
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./:=,+@%".contains(c));
    if plain {
        arg.to_string()
    } else {
        format!("'{}'", arg.replace('\'', r"'\''"))
    }
}

/// Escape a path for the single-quoted `subtitles` option of a filter graph.
///
/// ffmpeg unescapes twice: the graph parser handles the quoting, then the
/// option parser handles backslash escapes. `\`, `:` and `'` get a backslash
/// for the option parser, and each `'` then closes and reopens the quoted
/// section for the graph parser.
pub fn escape_filter_path(path: &Path) -> String {
    let mut option_value = String::new();
    for c in path.to_string_lossy().chars() {
        if matches!(c, '\\' | ':' | '\'') {
            option_value.push('\\');
        }
        option_value.push(c);
    }
    option_value.replace('\'', r"'\''")
}

/// Subtitle burn-in filter graph, wrapped by the filter preset segments when given
pub fn subtitle_filter(input: &Path, subtitle_track: u32, filter: Option<&FilterPreset>) -> String {
    let subtitles = format!("subtitles='{}':si={}", escape_filter_path(input), subtitle_track);

    let Some(filter) = filter else {
        return subtitles;
    };

    [filter.before(), subtitles.as_str(), filter.after()]
        .into_iter()
        .filter(|segment| !segment.is_empty())
        .collect::<Vec<_>>()
        .join(",")
}

/// Builder for the ffmpeg and ffprobe invocations
#[derive(Debug, Clone)]
pub struct MediaCommandBuilder {
    ffmpeg: String,
    ffprobe: String,
    loglevel: String,
}

impl MediaCommandBuilder {
    pub fn new<S1, S2, S3>(ffmpeg: S1, ffprobe: S2, loglevel: S3) -> Self
    where
        S1: Into<String>,
        S2: Into<String>,
        S3: Into<String>,
    {
        Self {
            ffmpeg: ffmpeg.into(),
            ffprobe: ffprobe.into(),
            loglevel: loglevel.into(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            &config.tools.ffmpeg,
            &config.tools.ffprobe,
            &config.conversion.loglevel,
        )
    }

    /// Build the subtitle hardcoding command for a resolved job
    pub fn convert(&self, job: &ConversionJob) -> MediaCommand {
        let mut cmd = MediaCommand::new(&self.ffmpeg, "FFmpeg convert")
            .arg("-hide_banner")
            .arg("-loglevel")
            .arg(&self.loglevel)
            .overwrite()
            .input(job.input())
            .filter_complex(subtitle_filter(job.input(), job.subtitle_track(), job.filter()))
            .preset(job.video());

        if let Some(audio) = job.audio() {
            cmd = cmd.preset(audio);
        }

        cmd.output(job.output())
    }

    /// Build the stream listing command
    pub fn probe_streams<P: AsRef<Path>>(&self, path: P) -> MediaCommand {
        MediaCommand::new(&self.ffprobe, "FFprobe streams")
            .args(["-v", "error", "-print_format", "json", "-show_streams"])
            .arg(path.as_ref().to_string_lossy().to_string())
    }

    pub fn ffmpeg_version(&self) -> MediaCommand {
        MediaCommand::new(&self.ffmpeg, "Version check").arg("-version")
    }

    pub fn ffprobe_version(&self) -> MediaCommand {
        MediaCommand::new(&self.ffprobe, "Version check").arg("-version")
    }
}
