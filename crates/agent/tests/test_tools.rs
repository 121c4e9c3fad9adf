//! Registry and local tool tests

mod common;

use std::path::PathBuf;

use agentseek_agent::tools::{BashInterpreter, CodeInterpreter, FileFinder, FlightSearch, WebSearch};
use agentseek_agent::{AgentError, Block, Tool, ToolRegistry};
use common::ProbeTool;

#[test]
fn test_registry_rejects_duplicate_tags() {
    let mut registry = ToolRegistry::new();
    registry.register(ProbeTool).unwrap();

    let err = registry.register(ProbeTool).unwrap_err();
    assert!(matches!(err, AgentError::DuplicateTool(tag) if tag == "probe"));
    assert_eq!(registry.len(), 1);
}

#[test]
fn test_registry_tags_sorted() {
    let dir = PathBuf::from("/tmp");
    let mut registry = ToolRegistry::new();
    registry.register(CodeInterpreter::python(dir.clone())).unwrap();
    registry.register(BashInterpreter::new(dir.clone())).unwrap();
    registry.register(FileFinder::new(dir)).unwrap();
    registry.register(WebSearch::new(None)).unwrap();
    registry.register(FlightSearch::new(None)).unwrap();

    assert_eq!(
        registry.tags(),
        vec!["bash", "file_finder", "flight_search", "python", "web_search"]
    );
    assert!(registry.has("bash"));
    assert!(registry.get("c").is_none());
}

#[tokio::test]
async fn test_bash_runs_in_work_dir() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("marker.txt"), "here").unwrap();
    let bash = BashInterpreter::new(dir.path().to_path_buf());

    let output = bash.execute(&[Block::new("bash", "cat marker.txt")], true).await;
    assert_eq!(output, "here");
}

#[tokio::test]
async fn test_bash_stops_at_first_failure() {
    let dir = tempfile::tempdir().unwrap();
    let bash = BashInterpreter::new(dir.path().to_path_buf());

    let blocks = [
        Block::new("bash", "false"),
        Block::new("bash", "touch created.txt"),
    ];
    let output = bash.execute(&blocks, true).await;

    assert!(output.starts_with("Error: exit code 1"));
    assert!(!dir.path().join("created.txt").exists());
}

#[tokio::test]
async fn test_bash_refuses_dangerous_command_in_safety_mode() {
    let dir = tempfile::tempdir().unwrap();
    let bash = BashInterpreter::new(dir.path().to_path_buf());

    let output = bash.execute(&[Block::new("bash", "rm -rf / --dry")], true).await;
    assert!(output.starts_with("Error: command refused in safety mode"));
}

#[tokio::test]
async fn test_bash_timeout() {
    let dir = tempfile::tempdir().unwrap();
    let bash = BashInterpreter::new(dir.path().to_path_buf()).with_timeout(1);

    let output = bash.execute(&[Block::new("bash", "sleep 5")], true).await;
    assert_eq!(output, "Error: timed out after 1 seconds");
}

#[tokio::test]
async fn test_bash_stderr_section() {
    let dir = tempfile::tempdir().unwrap();
    let bash = BashInterpreter::new(dir.path().to_path_buf());

    let output = bash
        .execute(&[Block::new("bash", "echo out; echo err >&2")], true)
        .await;
    assert_eq!(output, "out\nSTDERR:\nerr");
}

#[tokio::test]
async fn test_file_finder_read() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(dir.path().join("docs")).unwrap();
    std::fs::write(dir.path().join("docs/plan.md"), "step one").unwrap();
    let finder = FileFinder::new(dir.path().to_path_buf());

    let output = finder
        .execute(&[Block::new("file_finder", "name=plan.md\naction=read")], true)
        .await;
    assert!(output.starts_with("File: docs/plan.md"));
    assert!(output.ends_with("Content:\nstep one"));

    let info = finder
        .execute(&[Block::new("file_finder", "plan.md")], true)
        .await;
    assert!(info.contains("Size: 8 bytes"));
}

#[tokio::test]
async fn test_file_finder_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let finder = FileFinder::new(dir.path().to_path_buf());

    let output = finder
        .execute(&[Block::new("file_finder", "name=ghost.txt")], true)
        .await;
    assert_eq!(output, "Error: file ghost.txt not found");

    let missing = finder
        .execute(&[Block::new("file_finder", "action=read")], true)
        .await;
    assert_eq!(missing, "Error: name parameter(s) required.");
}
