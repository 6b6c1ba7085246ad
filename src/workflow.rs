use chrono::{DateTime, Duration, Local};
use indicatif::{ProgressBar, ProgressStyle};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::error::{FfconvError, Result};
use crate::input::ResolvedInput;
use crate::job::{ConversionJob, ConversionPlan};
use crate::media::{
    check_availability, MediaCommandBuilder, MediaProbe, MediaToolsFactory, StreamSummary,
    ToolRunner,
};

/// Runs the jobs of a plan one after another
pub struct Converter {
    command_builder: MediaCommandBuilder,
    probe: Box<dyn MediaProbe>,
    runner: Arc<dyn ToolRunner>,
    dry_run: bool,
    show_progress: bool,
}

impl Converter {
    pub fn new(config: &Config) -> Self {
        let runner = MediaToolsFactory::create_runner();
        let probe = MediaToolsFactory::create_probe(config, runner.clone());
        Self::with_tools(config, probe, runner)
    }

    pub fn with_tools(config: &Config, probe: Box<dyn MediaProbe>, runner: Arc<dyn ToolRunner>) -> Self {
        Self {
            command_builder: MediaCommandBuilder::from_config(config),
            probe,
            runner,
            dry_run: false,
            show_progress: false,
        }
    }

    /// Print commands instead of running ffmpeg
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn show_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    /// Check the external tools this run needs
    pub async fn check_availability(&self) -> Result<()> {
        check_availability(self.runner.as_ref(), &self.command_builder.ffprobe_version()).await?;
        if !self.dry_run {
            check_availability(self.runner.as_ref(), &self.command_builder.ffmpeg_version()).await?;
        }
        Ok(())
    }

    /// Convert every input of the plan. Failures are recorded, never fatal.
    pub async fn run(&self, plan: &ConversionPlan) -> BatchReport {
        let mut report = BatchReport::new();
        let progress = self.progress_bar(plan.inputs().len() as u64);

        info!("Converting {} file(s)", plan.inputs().len());

        for input in plan.inputs() {
            progress.set_message(
                input
                    .input
                    .file_name()
                    .map(|n| n.to_string_lossy().to_string())
                    .unwrap_or_default(),
            );

            let started = Local::now();
            let result = self.convert(plan, input).await;
            let elapsed = Local::now() - started;

            match &result {
                Ok(output) => info!("Converted {} -> {}", input.input.display(), output.display()),
                Err(e) => error!("Failed to convert {}: {}", input.input.display(), e),
            }

            report.push(JobOutcome {
                input: input.input.clone(),
                result: result.map_err(|e| e.to_string()),
                elapsed,
            });
            progress.inc(1);
        }

        progress.finish_and_clear();
        report
    }

    async fn convert(&self, plan: &ConversionPlan, input: &ResolvedInput) -> Result<PathBuf> {
        let job = self.prepare_job(plan, input).await?;
        let command = self.command_builder.convert(&job);

        if self.dry_run {
            println!("{}", command);
            return Ok(job.output().to_path_buf());
        }

        debug!("FFmpeg command: {}", command);
        if let Some(parent) = job.output().parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        self.runner.run(&command).await?;
        Ok(job.output().to_path_buf())
    }

    /// Resolve presets and the subtitle track of one input into a job
    pub async fn prepare_job(&self, plan: &ConversionPlan, input: &ResolvedInput) -> Result<ConversionJob> {
        let path = input.input.as_path();
        let video = plan.video_preset(input.slot)?;
        let filter = plan.filter_preset(input.slot)?;
        let explicit_track = plan.subtitle_track(input.slot);

        let probed = if plan.auto_audio_policy().is_some() || explicit_track.is_none() {
            Some(self.probe.probe(path).await)
        } else {
            None
        };

        let audio = match plan.auto_audio_policy() {
            Some(policy) => {
                let selection = match &probed {
                    Some(Ok(streams)) => policy.select_for(streams).cloned().map_err(|e| e.to_string()),
                    Some(Err(e)) => Err(e.to_string()),
                    None => Err("input was not probed".to_string()),
                };
                match selection {
                    Ok(preset) => Some(preset),
                    Err(reason) => {
                        warn!("{}: {}; audio flags omitted", path.display(), reason);
                        None
                    }
                }
            }
            None => plan.audio_preset(input.slot)?,
        };

        let subtitle_track = match (explicit_track, &probed) {
            (Some(track), _) => track,
            (None, Some(Ok(streams))) => first_subtitle_track(path, streams)?,
            (None, Some(Err(e))) => {
                return Err(FfconvError::CommandBuilder(format!(
                    "cannot determine subtitle track of {}: {}",
                    path.display(),
                    e
                )));
            }
            (None, None) => {
                return Err(FfconvError::CommandBuilder(format!(
                    "no subtitle track given for {}",
                    path.display()
                )));
            }
        };

        Ok(ConversionJob::new(
            input.input.clone(),
            plan.output_path(input),
            video,
            audio,
            filter,
            subtitle_track,
        ))
    }

    fn progress_bar(&self, len: u64) -> ProgressBar {
        if !self.show_progress || self.dry_run {
            return ProgressBar::hidden();
        }
        let pb = ProgressBar::new(len);
        let style = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .map(|style| style.progress_chars("#>-"))
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        pb.set_style(style);
        pb
    }
}

fn first_subtitle_track(path: &Path, streams: &StreamSummary) -> Result<u32> {
    streams.first_subtitle_track().ok_or_else(|| {
        FfconvError::CommandBuilder(format!("no subtitle stream found in {}", path.display()))
    })
}

/// Result of one input of the batch
#[derive(Debug, Clone)]
pub struct JobOutcome {
    pub input: PathBuf,
    /// Output path on success, error text on failure
    pub result: std::result::Result<PathBuf, String>,
    pub elapsed: Duration,
}

#[derive(Debug, Clone)]
pub struct BatchReport {
    started_at: DateTime<Local>,
    outcomes: Vec<JobOutcome>,
}

impl BatchReport {
    pub fn new() -> Self {
        Self {
            started_at: Local::now(),
            outcomes: Vec::new(),
        }
    }

    pub fn push(&mut self, outcome: JobOutcome) {
        self.outcomes.push(outcome);
    }

    pub fn outcomes(&self) -> &[JobOutcome] {
        &self.outcomes
    }

    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.result.is_ok()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.succeeded()
    }

    pub fn all_succeeded(&self) -> bool {
        self.failed() == 0
    }
}

impl Default for BatchReport {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for BatchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Batch started {}: {} succeeded, {} failed",
            self.started_at.format("%Y-%m-%d %H:%M:%S"),
            self.succeeded(),
            self.failed()
        )?;
        for outcome in &self.outcomes {
            let seconds = outcome.elapsed.num_milliseconds() as f64 / 1000.0;
            match &outcome.result {
                Ok(output) => writeln!(
                    f,
                    "  {:<7} {} -> {} ({:.1}s)",
                    "OK",
                    outcome.input.display(),
                    output.display(),
                    seconds
                )?,
                Err(reason) => writeln!(
                    f,
                    "  {:<7} {}: {} ({:.1}s)",
                    "FAILED",
                    outcome.input.display(),
                    reason,
                    seconds
                )?,
            }
        }
        Ok(())
    }
}
