//! Shell command execution

use async_trait::async_trait;
use std::path::PathBuf;
use std::process::{Output, Stdio};
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, warn};

use super::{truncate_output, Tool, ERROR_MARKER};
use crate::blocks::Block;

/// Largest result handed back to the model
pub(crate) const MAX_OUTPUT: usize = 10_000;

const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Command fragments refused while safety mode is on
const DANGEROUS_PATTERNS: &[&str] = &[
    "rm -rf /",
    "rm -rf ~",
    "mkfs",
    "dd if=",
    ":(){",
    "shutdown",
    "reboot",
    "> /dev/sd",
    "chmod -R 777 /",
];

/// Run a prepared command with a timeout and render its output.
///
/// A non-zero exit status, a spawn failure and a timeout all produce an
/// error-marked string.
pub(crate) async fn run_process(mut cmd: Command, timeout_secs: u64) -> String {
    cmd.stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    match tokio::time::timeout(Duration::from_secs(timeout_secs), cmd.output()).await {
        Ok(Ok(output)) => render_output(output),
        Ok(Err(e)) => format!("{}: failed to start process: {}", ERROR_MARKER, e),
        Err(_) => format!("{}: timed out after {} seconds", ERROR_MARKER, timeout_secs),
    }
}

fn render_output(output: Output) -> String {
    let mut parts = Vec::new();
    if !output.stdout.is_empty() {
        parts.push(String::from_utf8_lossy(&output.stdout).trim_end().to_string());
    }
    if !output.stderr.is_empty() {
        parts.push(format!(
            "STDERR:\n{}",
            String::from_utf8_lossy(&output.stderr).trim_end()
        ));
    }
    let body = parts.join("\n");

    let result = if output.status.success() {
        if body.is_empty() {
            "(no output)".to_string()
        } else {
            body
        }
    } else {
        let code = output
            .status
            .code()
            .map(|c| c.to_string())
            .unwrap_or_else(|| "signal".to_string());
        format!("{}: exit code {}\n{}", ERROR_MARKER, code, body)
    };
    truncate_output(result, MAX_OUTPUT)
}

/// `bash` blocks, run with `sh -c` inside the work directory
pub struct BashInterpreter {
    work_dir: PathBuf,
    timeout_secs: u64,
}

impl BashInterpreter {
    pub fn new(work_dir: PathBuf) -> Self {
        Self {
            work_dir,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }

    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    fn dangerous_pattern(command: &str) -> Option<&'static str> {
        DANGEROUS_PATTERNS
            .iter()
            .copied()
            .find(|pattern| command.contains(pattern))
    }
}

#[async_trait]
impl Tool for BashInterpreter {
    fn tag(&self) -> &str {
        "bash"
    }

    fn name(&self) -> &str {
        "Bash Interpreter"
    }

    fn description(&self) -> &str {
        "Run shell commands in the work directory."
    }

    fn usage(&self) -> String {
        "```bash\nls -la\n```".to_string()
    }

    async fn execute(&self, blocks: &[Block], safety: bool) -> String {
        let mut outputs = Vec::new();
        for block in blocks {
            let command = block.body.trim();
            if command.is_empty() {
                continue;
            }
            if safety {
                if let Some(pattern) = Self::dangerous_pattern(command) {
                    warn!("◆ refused command containing '{}'", pattern);
                    return format!(
                        "{}: command refused in safety mode (contains '{}')",
                        ERROR_MARKER, pattern
                    );
                }
            }

            debug!("◆ executing: {}", command);
            let mut cmd = Command::new("sh");
            cmd.arg("-c").arg(command).current_dir(&self.work_dir);
            let output = run_process(cmd, self.timeout_secs).await;
            if self.execution_failure_check(&output) {
                return output;
            }
            outputs.push(output);
        }

        if outputs.is_empty() {
            "(no output)".to_string()
        } else {
            outputs.join("\n")
        }
    }
}
