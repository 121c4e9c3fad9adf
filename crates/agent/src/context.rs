//! System prompt assembly for agents

use chrono::Local;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::agent::AgentRole;
use crate::tools::ToolRegistry;

/// Builds the system prompt an agent's memory starts with
pub struct ContextBuilder {
    work_dir: PathBuf,
    prompt_dir: Option<PathBuf>,
}

impl ContextBuilder {
    pub fn new(work_dir: impl AsRef<Path>) -> Self {
        Self {
            work_dir: work_dir.as_ref().to_path_buf(),
            prompt_dir: None,
        }
    }

    /// Directory holding `<role>.md` files that replace the built-in role
    /// instructions
    pub fn with_prompt_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.prompt_dir = Some(dir.as_ref().to_path_buf());
        self
    }

    pub fn build_system_prompt(&self, name: &str, role: AgentRole, tools: &ToolRegistry) -> String {
        let mut parts = vec![self.identity(name, role)];

        if !tools.is_empty() {
            parts.push(Self::tools_section(tools));
        }

        parts.join("\n\n---\n\n")
    }

    fn identity(&self, name: &str, role: AgentRole) -> String {
        let now = Local::now().format("%Y-%m-%d %H:%M (%A)");
        let instructions = self
            .load_role_prompt(role)
            .unwrap_or_else(|| role_instructions(role).to_string());

        format!(
            "# {name}\n\nYou are {name}, the {role} agent.\n\n{instructions}\n\n## Current Time\n{now}\n\n## Work Directory\n{dir}",
            name = name,
            role = role,
            instructions = instructions,
            now = now,
            dir = self.work_dir.display()
        )
    }

    fn tools_section(tools: &ToolRegistry) -> String {
        let mut section = String::from(
            "# Tools\n\nInvoke a tool by writing a fenced block whose info string is the tool tag:\n\n```<tag>\n<body>\n```\n\nParameters are `key=value` lines in the body. Blocks run in order; every result is sent back to you. Stop writing blocks once the task is done and answer in plain text.",
        );
        for tool in tools.iter() {
            section.push_str(&format!(
                "\n\n## {} (`{}`)\n{}\n\n{}",
                tool.name(),
                tool.tag(),
                tool.description(),
                tool.usage()
            ));
        }
        section
    }

    fn load_role_prompt(&self, role: AgentRole) -> Option<String> {
        let path = self.prompt_dir.as_ref()?.join(format!("{}.md", role));
        match std::fs::read_to_string(&path) {
            Ok(content) if !content.trim().is_empty() => Some(content.trim().to_string()),
            Ok(_) => None,
            Err(e) => {
                debug!("No prompt override at {}: {}", path.display(), e);
                None
            }
        }
    }
}

fn role_instructions(role: AgentRole) -> &'static str {
    match role {
        AgentRole::Casual => {
            "Talk with the user naturally. Use the bash tool only when a quick command answers the question better than words."
        }
        AgentRole::Coder => {
            "Write and run code to solve the task. Prefer small programs that print their results. When a run fails, read the error, fix the code and run it again."
        }
        AgentRole::File => {
            "Find, inspect and organize files in the work directory. Use file_finder to locate files and bash for anything else."
        }
        AgentRole::Web => {
            "Research the question on the web. Search, compare sources and answer with the links you relied on."
        }
        AgentRole::Finance => {
            "Handle money carefully. State exactly what an order or payment will do before issuing it. Never repeat an order that was cancelled."
        }
        AgentRole::Trading => {
            "Report prices and moving-average signals for exchange symbols."
        }
        AgentRole::Planner => {
            "Split the request into steps for the available agents. Answer with a single json block:\n\n```json\n{\"plan\": [{\"agent\": \"coder\", \"task\": \"...\", \"need\": []}]}\n```\n\nAgents: casual, coder, file, web, finance, trading (takes `test SYMBOL`, `trade SYMBOL QTY` or `SYMBOL` as its task). A task may contain {{previous}} to receive the previous step's answer; list the previous step in need to receive it at the end instead."
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::BashInterpreter;

    #[test]
    fn test_prompt_lists_tools() {
        let mut tools = ToolRegistry::new();
        tools
            .register(BashInterpreter::new(PathBuf::from("/work")))
            .unwrap();
        let prompt = ContextBuilder::new("/work").build_system_prompt("Friday", AgentRole::Coder, &tools);

        assert!(prompt.starts_with("# Friday"));
        assert!(prompt.contains("coder agent"));
        assert!(prompt.contains("(`bash`)"));
        assert!(prompt.contains("/work"));
    }

    #[test]
    fn test_prompt_override() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("casual.md"), "Be brief.\n").unwrap();
        let prompt = ContextBuilder::new("/work")
            .with_prompt_dir(dir.path())
            .build_system_prompt("Friday", AgentRole::Casual, &ToolRegistry::new());

        assert!(prompt.contains("Be brief."));
        assert!(!prompt.contains("# Tools"));
    }
}
