//! Source interpreters for python, go and c blocks

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::debug;
use uuid::Uuid;

use super::shell::run_process;
use super::{Tool, ERROR_MARKER};
use crate::blocks::Block;

const DEFAULT_TIMEOUT_SECS: u64 = 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Language {
    Python,
    Go,
    C,
}

impl Language {
    fn tag(self) -> &'static str {
        match self {
            Language::Python => "python",
            Language::Go => "go",
            Language::C => "c",
        }
    }

    fn extension(self) -> &'static str {
        match self {
            Language::Python => "py",
            Language::Go => "go",
            Language::C => "c",
        }
    }
}

/// Writes each block to a scratch file in the work directory and runs it
pub struct CodeInterpreter {
    language: Language,
    work_dir: PathBuf,
    timeout_secs: u64,
}

impl CodeInterpreter {
    fn new(language: Language, work_dir: PathBuf) -> Self {
        Self {
            language,
            work_dir,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }

    pub fn python(work_dir: PathBuf) -> Self {
        Self::new(Language::Python, work_dir)
    }

    pub fn go(work_dir: PathBuf) -> Self {
        Self::new(Language::Go, work_dir)
    }

    pub fn c(work_dir: PathBuf) -> Self {
        Self::new(Language::C, work_dir)
    }

    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    async fn run_source(&self, source: &str) -> String {
        let stem = format!("agentseek_{}", Uuid::new_v4().simple());
        let source_path = self
            .work_dir
            .join(format!("{}.{}", stem, self.language.extension()));

        if let Err(e) = tokio::fs::write(&source_path, source).await {
            return format!("{}: failed to write source: {}", ERROR_MARKER, e);
        }

        let output = match self.language {
            Language::Python => {
                let mut cmd = Command::new("python3");
                cmd.arg(&source_path).current_dir(&self.work_dir);
                run_process(cmd, self.timeout_secs).await
            }
            Language::Go => {
                let mut cmd = Command::new("go");
                cmd.arg("run").arg(&source_path).current_dir(&self.work_dir);
                run_process(cmd, self.timeout_secs).await
            }
            Language::C => {
                let binary = self.work_dir.join(&stem);
                let output = self.compile_and_run_c(&source_path, &binary).await;
                remove_quietly(&binary).await;
                output
            }
        };

        remove_quietly(&source_path).await;
        output
    }

    async fn compile_and_run_c(&self, source: &Path, binary: &Path) -> String {
        let mut compile = Command::new("cc");
        compile
            .arg(source)
            .arg("-o")
            .arg(binary)
            .current_dir(&self.work_dir);
        let compiled = run_process(compile, self.timeout_secs).await;
        if self.execution_failure_check(&compiled) {
            return format!("{}: compilation failed\n{}", ERROR_MARKER, compiled);
        }

        let mut run = Command::new(binary);
        run.current_dir(&self.work_dir);
        run_process(run, self.timeout_secs).await
    }
}

async fn remove_quietly(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        debug!("◆ could not remove {}: {}", path.display(), e);
    }
}

#[async_trait]
impl Tool for CodeInterpreter {
    fn tag(&self) -> &str {
        self.language.tag()
    }

    fn name(&self) -> &str {
        match self.language {
            Language::Python => "Python Interpreter",
            Language::Go => "Go Interpreter",
            Language::C => "C Interpreter",
        }
    }

    fn description(&self) -> &str {
        match self.language {
            Language::Python => "Run a python3 script. Print results to stdout.",
            Language::Go => "Run a complete go program with a main package.",
            Language::C => "Compile and run a complete C program with a main function.",
        }
    }

    fn usage(&self) -> String {
        match self.language {
            Language::Python => "```python\nprint('hello')\n```".to_string(),
            Language::Go => {
                "```go\npackage main\n\nimport \"fmt\"\n\nfunc main() {\n\tfmt.Println(\"hello\")\n}\n```"
                    .to_string()
            }
            Language::C => {
                "```c\n#include <stdio.h>\n\nint main(void) {\n\tprintf(\"hello\\n\");\n\treturn 0;\n}\n```"
                    .to_string()
            }
        }
    }

    async fn execute(&self, blocks: &[Block], _safety: bool) -> String {
        let mut outputs = Vec::new();
        for block in blocks {
            if block.body.trim().is_empty() {
                continue;
            }
            debug!("◆ running {} block", self.language.tag());
            let output = self.run_source(&block.body).await;
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
