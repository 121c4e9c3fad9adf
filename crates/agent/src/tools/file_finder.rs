//! Locate files in the work directory

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

use super::{truncate_output, Tool, ToolError, ERROR_MARKER};
use crate::blocks::Block;
use crate::tools::shell::MAX_OUTPUT;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    Info,
    Read,
}

impl Action {
    fn parse(value: Option<&str>) -> Result<Self, ToolError> {
        match value.map(str::to_ascii_lowercase).as_deref() {
            None | Some("info") => Ok(Action::Info),
            Some("read") => Ok(Action::Read),
            Some(other) => Err(ToolError::InvalidParam(format!(
                "unknown action '{}', expected info or read",
                other
            ))),
        }
    }
}

/// `file_finder` blocks: `name=<file>` with optional `action=info|read`
pub struct FileFinder {
    work_dir: PathBuf,
}

impl FileFinder {
    pub fn new(work_dir: PathBuf) -> Self {
        Self { work_dir }
    }

    /// First file under the work directory whose name matches, shallowest first
    pub fn find(&self, name: &str) -> Option<PathBuf> {
        WalkDir::new(&self.work_dir)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_file())
            .filter(|entry| entry.file_name().to_str() == Some(name))
            .min_by_key(|entry| entry.depth())
            .map(|entry| entry.into_path())
    }

    fn describe(&self, path: &Path) -> Result<String, ToolError> {
        let metadata = std::fs::metadata(path)?;
        let relative = path.strip_prefix(&self.work_dir).unwrap_or(path);
        Ok(format!(
            "File: {}\nPath: {}\nSize: {} bytes",
            relative.display(),
            path.display(),
            metadata.len()
        ))
    }

    async fn run_block(&self, block: &Block) -> Result<String, ToolError> {
        let name = match block.param("name") {
            Some(name) => name.to_string(),
            None => {
                let mut lines = block.lines();
                match (lines.next(), lines.next()) {
                    (Some(line), None) if !line.contains('=') => line.to_string(),
                    _ => return Err(ToolError::MissingParams(vec!["name".to_string()])),
                }
            }
        };
        let action = Action::parse(block.param("action"))?;

        let path = match self.find(&name) {
            Some(path) => path,
            None => return Ok(format!("{}: file {} not found", ERROR_MARKER, name)),
        };
        debug!("◆ found {} at {}", name, path.display());

        let info = self.describe(&path)?;
        match action {
            Action::Info => Ok(info),
            Action::Read => {
                let bytes = tokio::fs::read(&path).await?;
                let content = String::from_utf8_lossy(&bytes).into_owned();
                Ok(format!("{}\nContent:\n{}", info, content))
            }
        }
    }
}

#[async_trait]
impl Tool for FileFinder {
    fn tag(&self) -> &str {
        "file_finder"
    }

    fn name(&self) -> &str {
        "File Finder"
    }

    fn description(&self) -> &str {
        "Find a file by name in the work directory and show its location or content."
    }

    fn usage(&self) -> String {
        "```file_finder\nname=notes.txt\naction=read\n```".to_string()
    }

    async fn execute(&self, blocks: &[Block], _safety: bool) -> String {
        let mut outputs = Vec::new();
        for block in blocks {
            let output = match self.run_block(block).await {
                Ok(output) => output,
                Err(e) => e.render(),
            };
            if self.execution_failure_check(&output) {
                return output;
            }
            outputs.push(output);
        }
        truncate_output(outputs.join("\n\n"), MAX_OUTPUT)
    }
}
