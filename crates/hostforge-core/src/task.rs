//! Task units and outcome evaluation

use std::path::PathBuf;

/// One auxiliary configuration file a descriptor references by absolute path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuxFile {
    /// Absolute path the descriptor expects the file at
    pub path: PathBuf,
    /// File contents
    pub contents: String,
}

/// A rendered, not-yet-executed unit of work
///
/// Lifecycle: rendered, executed, evaluated, reported; artifacts are
/// discarded after execution. Carries no identity beyond one execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskSpec {
    /// Task name, used in events and log lines
    pub name: String,
    /// Descriptor text consumed by the runner
    pub playbook: String,
    /// Config files the descriptor copies onto the target
    pub aux_files: Vec<AuxFile>,
    /// Literal substring in runner output that marks success
    pub sentinel: String,
}

/// Outcome of one task execution, produced exactly once
#[derive(Debug, Clone)]
pub struct TaskOutcome {
    /// Task name
    pub task: String,
    /// Whether the success sentinel was found
    pub succeeded: bool,
    /// Verbatim runner output (or the fault text on infrastructure errors)
    pub raw_output: String,
}

impl TaskOutcome {
    /// Deploy-log label for this outcome
    #[must_use]
    pub fn label(&self) -> &'static str {
        if self.succeeded { "completed" } else { "failed" }
    }
}

/// Decide task success from runner output.
///
/// Literal substring containment, kept for compatibility with the existing
/// descriptors' `ok=N` recap lines. Isolated here so a structured result
/// backend can replace it without touching the orchestrator.
#[must_use]
pub fn sentinel_matches(sentinel: &str, output: &str) -> bool {
    output.contains(sentinel)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentinel_is_substring_containment() {
        let output = "PLAY RECAP\n192.0.2.7 : ok=2 changed=1 unreachable=0 failed=0";
        assert!(sentinel_matches("ok=2", output));
        assert!(!sentinel_matches("ok=3", output));
    }

    #[test]
    fn empty_output_never_matches() {
        assert!(!sentinel_matches("ok=1", ""));
    }
}
