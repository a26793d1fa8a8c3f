//! Step logs for multi-request mutations that have no server-side transaction.
//!
//! Each flow records the steps it finished. When a later step fails the log
//! shows exactly what was applied, so the caller can detect the partial state
//! and replay the remaining idempotent steps.

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepState {
    Completed,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    pub name: &'static str,
    pub state: StepState,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepLog {
    flow: &'static str,
    steps: Vec<Step>,
}

impl StepLog {
    pub fn new(flow: &'static str) -> Self {
        Self {
            flow,
            steps: Vec::new(),
        }
    }

    pub fn complete(&mut self, name: &'static str) {
        self.steps.push(Step {
            name,
            state: StepState::Completed,
        });
    }

    pub fn fail(&mut self, name: &'static str, reason: impl Into<String>) {
        self.steps.push(Step {
            name,
            state: StepState::Failed(reason.into()),
        });
    }

    pub fn is_completed(&self, name: &str) -> bool {
        self.steps
            .iter()
            .any(|s| s.name == name && s.state == StepState::Completed)
    }

    pub fn failed_step(&self) -> Option<&Step> {
        self.steps
            .iter()
            .rev()
            .find(|s| matches!(s.state, StepState::Failed(_)))
    }

    /// Some steps were applied and a later one failed.
    pub fn is_partial(&self) -> bool {
        self.failed_step().is_some()
            && self.steps.iter().any(|s| s.state == StepState::Completed)
    }
}

impl fmt::Display for StepLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:", self.flow)?;
        for step in &self.steps {
            match &step.state {
                StepState::Completed => write!(f, " {} ok;", step.name)?,
                StepState::Failed(reason) => write!(f, " {} failed ({});", step.name, reason)?,
            }
        }
        Ok(())
    }
}
