//! Compile files from the work directory into one report

use async_trait::async_trait;
use std::path::PathBuf;
use tracing::info;

use super::{resolve_in_work_dir, Tool, ToolError, ERROR_MARKER};
use crate::blocks::Block;

/// Leads every compiled report so file contents never read as a failure
pub const REPORT_HEADER: &str = "Report:\n";

/// `report` blocks: one relative path per line
pub struct ReportGenerator {
    work_dir: PathBuf,
}

impl ReportGenerator {
    pub fn new(work_dir: PathBuf) -> Self {
        Self { work_dir }
    }

    async fn compile(&self, blocks: &[Block]) -> Result<String, ToolError> {
        let mut sections = Vec::new();
        for line in blocks.iter().flat_map(|b| b.lines()) {
            let path = resolve_in_work_dir(&self.work_dir, line)?;
            if !path.is_file() {
                return Ok(format!("{}: {} not found", ERROR_MARKER, line));
            }
            let bytes = tokio::fs::read(&path).await?;
            sections.push(String::from_utf8_lossy(&bytes).into_owned());
        }
        if sections.is_empty() {
            return Err(ToolError::InvalidParam(
                "report needs at least one file path".to_string(),
            ));
        }
        Ok(format!("{}{}", REPORT_HEADER, sections.join("\n\n")))
    }
}

#[async_trait]
impl Tool for ReportGenerator {
    fn tag(&self) -> &str {
        "report"
    }

    fn name(&self) -> &str {
        "Report Generator"
    }

    fn description(&self) -> &str {
        "Concatenate files from the work directory into a single report. One path per line."
    }

    fn usage(&self) -> String {
        "```report\nsummary.txt\ndata/results.txt\n```".to_string()
    }

    async fn execute(&self, blocks: &[Block], _safety: bool) -> String {
        match self.compile(blocks).await {
            Ok(report) => {
                if !self.execution_failure_check(&report) {
                    info!("◆ report compiled: {} characters", body_len(&report));
                }
                report
            }
            Err(e) => e.render(),
        }
    }

    fn interpreter_feedback(&self, output: &str) -> String {
        if self.execution_failure_check(output) {
            output.to_string()
        } else {
            format!(
                "Report generated with length {} characters",
                body_len(output)
            )
        }
    }
}

/// Characters of the compiled contents, header excluded
fn body_len(report: &str) -> usize {
    report
        .strip_prefix(REPORT_HEADER)
        .unwrap_or(report)
        .chars()
        .count()
}
