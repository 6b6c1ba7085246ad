//! ffconv - Subtitle Hardcoding Batch Converter
//!
//! Builds and runs ffmpeg command lines that burn a subtitle stream into
//! video files, driven by JSON presets for the video, audio and filter
//! options of each input.

pub mod cli;
pub mod config;
pub mod error;
pub mod preset;
pub mod audio;
pub mod input;
pub mod job;
pub mod media;
pub mod workflow;
