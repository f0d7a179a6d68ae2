use tribunal_core::Phase;

use crate::error::{OrchestratorError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Workflow {
    Debate,
    CodeReview,
}

/// Tracks the current phase of one run and rejects out-of-order transitions.
#[derive(Debug, Clone)]
pub struct PhaseStateMachine {
    workflow: Workflow,
    current: Option<Phase>,
}

impl PhaseStateMachine {
    pub fn new(workflow: Workflow) -> Self {
        Self {
            workflow,
            current: None,
        }
    }

    pub fn current(&self) -> Option<Phase> {
        self.current
    }

    pub fn enter(&mut self, to: Phase) -> Result<()> {
        Self::validate_transition(self.workflow, self.current, to)?;
        self.current = Some(to);
        Ok(())
    }

    pub fn validate_transition(workflow: Workflow, from: Option<Phase>, to: Phase) -> Result<()> {
        if Self::allowed_transitions(workflow, from).contains(&to) {
            Ok(())
        } else {
            Err(OrchestratorError::InvalidTransition {
                from: from.map_or("start", |p| p.as_str()).to_string(),
                to: to.as_str().to_string(),
            })
        }
    }

    pub fn can_transition(workflow: Workflow, from: Option<Phase>, to: Phase) -> bool {
        Self::validate_transition(workflow, from, to).is_ok()
    }

    fn allowed_transitions(workflow: Workflow, from: Option<Phase>) -> Vec<Phase> {
        match workflow {
            Workflow::Debate => match from {
                None => vec![Phase::Opening],
                Some(Phase::Opening) => vec![Phase::Round, Phase::Final],
                Some(Phase::Round) => vec![Phase::Round, Phase::Final],
                _ => vec![],
            },
            Workflow::CodeReview => match from {
                None => vec![Phase::BuildCheck, Phase::Analysis],
                Some(Phase::BuildCheck) => vec![Phase::Analysis],
                Some(Phase::Analysis) => vec![Phase::Defense],
                Some(Phase::Defense) => vec![Phase::Verdict],
                Some(Phase::Verdict) => vec![Phase::ParallelFix],
                _ => vec![],
            },
        }
    }
}
