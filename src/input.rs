use std::path::{Path, PathBuf};
use tracing::{debug, info};
use walkdir::{DirEntry, WalkDir};

use crate::error::{FfconvError, Result};
use crate::job::Positional;

/// Where the converted file of an input goes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputTarget {
    /// Output named after the input stem inside this directory
    Directory(PathBuf),
    /// Exact output file; its extension is replaced by the chosen one
    File(PathBuf),
}

impl OutputTarget {
    /// Paths with an extension name a file, anything else a directory
    pub fn from_path(path: &Path) -> Self {
        if path.extension().is_some() {
            OutputTarget::File(path.to_path_buf())
        } else {
            OutputTarget::Directory(path.to_path_buf())
        }
    }

    pub fn output_file(&self, input: &Path, extension: &str) -> PathBuf {
        match self {
            OutputTarget::Directory(dir) => {
                let stem = input.file_stem().unwrap_or(input.as_os_str());
                let mut name = stem.to_os_string();
                name.push(".");
                name.push(extension);
                dir.join(name)
            }
            OutputTarget::File(file) => file.with_extension(extension),
        }
    }
}

/// One input file paired with its output target
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedInput {
    /// Position of the `--input` argument this file came from
    pub slot: usize,
    pub input: PathBuf,
    pub output: OutputTarget,
}

/// Expand input paths into files and pair them with outputs.
///
/// `outputs` holds either one path shared by every input or one path per input.
pub fn resolve_inputs(inputs: &[PathBuf], outputs: &[PathBuf]) -> Result<Vec<ResolvedInput>> {
    if inputs.is_empty() {
        return Err(FfconvError::InputResolution("no input path given".to_string()));
    }

    let outputs = Positional::assign(outputs.to_vec(), inputs.len(), "output")?;
    let mut resolved = Vec::new();

    for (slot, given) in inputs.iter().enumerate() {
        let output = outputs.get(slot).ok_or_else(|| {
            FfconvError::Config(format!("no output path for input `{}`", given.display()))
        })?;
        let target = OutputTarget::from_path(output);

        if given.is_file() {
            resolved.push(ResolvedInput {
                slot,
                input: given.clone(),
                output: target,
            });
            continue;
        }

        if !given.is_dir() {
            return Err(FfconvError::InputResolution(format!(
                "input path `{}` does not exist",
                given.display()
            )));
        }

        let files = files_in_dir(given)?;
        if files.is_empty() {
            return Err(FfconvError::InputResolution(format!(
                "no files found in directory `{}`",
                given.display()
            )));
        }
        if files.len() > 1 && matches!(target, OutputTarget::File(_)) {
            return Err(FfconvError::InputResolution(format!(
                "directory `{}` contains {} files but output `{}` is a single file",
                given.display(),
                files.len(),
                output.display()
            )));
        }

        info!("Found {} file(s) in {}", files.len(), given.display());
        for file in files {
            let output = match &target {
                OutputTarget::Directory(dir) => OutputTarget::Directory(mirrored_dir(dir, given, &file)),
                OutputTarget::File(_) => target.clone(),
            };
            resolved.push(ResolvedInput {
                slot,
                input: file,
                output,
            });
        }
    }

    debug!("Resolved {} input file(s)", resolved.len());
    Ok(resolved)
}

/// Regular files below `dir`, recursively, sorted by path. Hidden entries are skipped.
fn files_in_dir(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    let walker = WalkDir::new(dir)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| !is_hidden(entry));
    for entry in walker {
        let entry = entry.map_err(|e| FfconvError::InputResolution(e.to_string()))?;
        if entry.file_type().is_file() {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

// The walk root itself may be `.` or a dot-directory the user named
fn is_hidden(entry: &DirEntry) -> bool {
    entry.depth() > 0
        && entry
            .file_name()
            .to_str()
            .is_some_and(|name| name.starts_with('.'))
}

/// `output_dir` extended with the sub-directory `file` sits in below `input_dir`
fn mirrored_dir(output_dir: &Path, input_dir: &Path, file: &Path) -> PathBuf {
    file.parent()
        .and_then(|parent| pathdiff::diff_paths(parent, input_dir))
        .filter(|relative| !relative.as_os_str().is_empty())
        .map(|relative| output_dir.join(relative))
        .unwrap_or_else(|| output_dir.to_path_buf())
}
