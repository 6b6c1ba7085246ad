use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, info};

use crate::error::{FfconvError, Result};
use super::MediaCommand;

/// Captured output of a successful tool run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolOutput {
    pub stdout: String,
    pub stderr: String,
}

/// Executes external tool commands
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ToolRunner: Send + Sync {
    /// Run the command to completion. A non-zero exit status is an error
    /// carrying the captured standard error.
    async fn run(&self, command: &MediaCommand) -> Result<ToolOutput>;
}

/// Runs commands as child processes and waits for them to exit
#[derive(Debug, Clone, Default)]
pub struct ProcessRunner;

impl ProcessRunner {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ToolRunner for ProcessRunner {
    async fn run(&self, command: &MediaCommand) -> Result<ToolOutput> {
        debug!("Executing {}: {}", command.description, command);

        let output = Command::new(&command.binary_path)
            .args(&command.args)
            .output()
            .await
            .map_err(|e| FfconvError::ExternalTool {
                tool: command.tool_name(),
                status: None,
                stderr: format!("failed to start {}: {}", command.binary_path, e),
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).trim_end().to_string();

        if !output.status.success() {
            return Err(FfconvError::ExternalTool {
                tool: command.tool_name(),
                status: output.status.code(),
                stderr,
            });
        }

        Ok(ToolOutput { stdout, stderr })
    }
}

/// Check that a tool answers its version query
pub async fn check_availability(runner: &dyn ToolRunner, command: &MediaCommand) -> Result<()> {
    let output = runner.run(command).await?;
    let version = output.stdout.lines().next().unwrap_or("unknown version");
    info!("{} is available: {}", command.tool_name(), version);
    Ok(())
}
