//! Operator confirmation for irreversible actions

use std::io::{BufRead, Write};
use tracing::info;

/// Yes/no gate consulted before money moves when safety mode is on.
///
/// Implementations block until the operator answers.
pub trait Confirmer: Send + Sync {
    fn confirm(&self, question: &str) -> bool;
}

/// Treat only an explicit `y` / `yes` as consent
pub fn is_affirmative(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

/// Asks on stdout and reads the answer from stdin
#[derive(Debug, Default, Clone, Copy)]
pub struct StdinConfirmer;

impl Confirmer for StdinConfirmer {
    fn confirm(&self, question: &str) -> bool {
        let mut stdout = std::io::stdout();
        let _ = write!(stdout, "{} y/n ", question);
        let _ = stdout.flush();

        let mut answer = String::new();
        if std::io::stdin().lock().read_line(&mut answer).is_err() {
            return false;
        }
        let accepted = is_affirmative(&answer);
        info!("◆ confirmation '{}': {}", question, accepted);
        accepted
    }
}

/// Approves everything; for unattended runs with safety disabled upstream
#[derive(Debug, Default, Clone, Copy)]
pub struct AutoConfirm;

impl Confirmer for AutoConfirm {
    fn confirm(&self, _question: &str) -> bool {
        true
    }
}

/// Refuses everything
#[derive(Debug, Default, Clone, Copy)]
pub struct AutoDeny;

impl Confirmer for AutoDeny {
    fn confirm(&self, _question: &str) -> bool {
        false
    }
}
