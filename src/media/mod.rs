// External media tool plumbing
//
// - Commands: ffmpeg/ffprobe command construction
// - Processor: process execution behind the ToolRunner trait
// - Probe: stream inspection behind the MediaProbe trait

pub mod commands;
pub mod probe;
pub mod processor;

use std::sync::Arc;

pub use commands::*;
pub use probe::*;
pub use processor::*;

use crate::config::Config;

/// Factory for the process-backed media tools
pub struct MediaToolsFactory;

impl MediaToolsFactory {
    /// Runner that spawns real processes
    pub fn create_runner() -> Arc<dyn ToolRunner> {
        Arc::new(ProcessRunner::new())
    }

    /// ffprobe-backed probe sharing `runner`
    pub fn create_probe(config: &Config, runner: Arc<dyn ToolRunner>) -> Box<dyn MediaProbe> {
        Box::new(FfprobeProbe::new(MediaCommandBuilder::from_config(config), runner))
    }
}
