//! Sequential execution of dependent write steps.
//!
//! # Responsibility
//! - Run a [`WriteSequence`] one step at a time through the [`QueryBridge`].
//! - Feed identifiers generated by earlier steps into later steps.
//! - Stop at the first failing step and report which one failed.
//!
//! # Invariants
//! - Step `i + 1` is submitted only after step `i` has resolved successfully.
//! - A step may only reference identifiers of steps before it; sequences that
//!   break this are rejected before any statement is issued.
//! - Step labels are unique within a sequence.
//! - Rows written before a failing step are left in place. There is no
//!   transaction around the sequence, and the failure lists what was applied.

mod sequence;

pub use sequence::{StepOutcome, StepParam, WriteSequence, WriteStep, WriteSummary};

use crate::bridge::{BridgeError, QueryBridge};
use log::{info, warn};
use rusqlite::types::Value;
use std::collections::HashMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Instant;
use uuid::Uuid;

pub type WriteResult<T> = Result<T, WriteError>;

/// Structural problem found before anything ran.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SequenceError {
    Empty,
    ForwardReference {
        step: usize,
        label: String,
        references: usize,
    },
    /// Summaries are keyed by label, so labels must be unique.
    DuplicateLabel {
        step: usize,
        label: String,
        first: usize,
    },
}

impl Display for SequenceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Empty => write!(f, "write sequence has no steps"),
            Self::ForwardReference {
                step,
                label,
                references,
            } => write!(
                f,
                "step {step} (`{label}`) references the identifier of step {references}, which has not run before it"
            ),
            Self::DuplicateLabel { step, label, first } => write!(
                f,
                "step {step} reuses label `{label}` already taken by step {first}"
            ),
        }
    }
}

impl Error for SequenceError {}

/// Why a single step failed.
#[derive(Debug)]
pub enum StepError {
    Execution(BridgeError),
    /// The referenced earlier step succeeded but generated no identifier.
    MissingIdentifier { references: usize },
}

impl Display for StepError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Execution(err) => write!(f, "{err}"),
            Self::MissingIdentifier { references } => {
                write!(f, "step {references} produced no generated identifier")
            }
        }
    }
}

impl Error for StepError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Execution(err) => Some(err),
            Self::MissingIdentifier { .. } => None,
        }
    }
}

/// A sequence aborted at `index`; `completed` holds the steps that were
/// applied before it and remain applied.
#[derive(Debug)]
pub struct StepFailure {
    pub index: usize,
    pub label: String,
    pub error: StepError,
    pub completed: Vec<StepOutcome>,
}

impl Display for StepFailure {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "write step {} (`{}`) failed after {} applied step(s): {}",
            self.index,
            self.label,
            self.completed.len(),
            self.error
        )
    }
}

impl Error for StepFailure {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        Some(&self.error)
    }
}

/// Terminal failure of [`SequentialWriteCoordinator::execute`].
#[derive(Debug)]
pub enum WriteError {
    Invalid(SequenceError),
    Step(StepFailure),
}

impl WriteError {
    /// Index and label of the step that failed, if any step ran.
    pub fn failed_step(&self) -> Option<(usize, &str)> {
        match self {
            Self::Step(failure) => Some((failure.index, failure.label.as_str())),
            Self::Invalid(_) => None,
        }
    }

    /// Steps that were applied and not rolled back.
    pub fn completed_steps(&self) -> &[StepOutcome] {
        match self {
            Self::Step(failure) => &failure.completed,
            Self::Invalid(_) => &[],
        }
    }
}

impl Display for WriteError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Invalid(err) => write!(f, "{err}"),
            Self::Step(err) => write!(f, "{err}"),
        }
    }
}

impl Error for WriteError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Invalid(err) => Some(err),
            Self::Step(err) => Some(err),
        }
    }
}

impl From<SequenceError> for WriteError {
    fn from(value: SequenceError) -> Self {
        Self::Invalid(value)
    }
}

/// Runs write sequences against a bridge. Holds no per-call state.
#[derive(Clone)]
pub struct SequentialWriteCoordinator {
    bridge: QueryBridge,
}

impl SequentialWriteCoordinator {
    pub fn new(bridge: QueryBridge) -> Self {
        Self { bridge }
    }

    pub fn bridge(&self) -> &QueryBridge {
        &self.bridge
    }

    /// Executes every step in order, stopping at the first failure.
    ///
    /// # Errors
    /// - `WriteError::Invalid` when the sequence is empty or a step references
    ///   a step that does not precede it; no statement is issued.
    /// - `WriteError::Step` naming the first failing step. Earlier steps stay
    ///   applied and are listed in `completed`; later steps never run.
    pub fn execute(&self, sequence: WriteSequence) -> WriteResult<WriteSummary> {
        validate(&sequence)?;

        let sequence_id = Uuid::new_v4();
        let started_at = Instant::now();
        let step_count = sequence.len();
        info!(
            "event=write_sequence module=coordinator status=start sequence_id={} steps={}",
            sequence_id, step_count
        );

        let mut completed: Vec<StepOutcome> = Vec::with_capacity(step_count);
        for (index, step) in sequence.into_steps().into_iter().enumerate() {
            let (label, statement, params) = step.into_parts();

            let resolved = match resolve_params(params, &completed) {
                Ok(values) => values,
                Err(error) => return Err(abort(sequence_id, index, label, error, completed)),
            };

            match self.bridge.execute(&label, &statement, resolved) {
                Ok(output) => completed.push(StepOutcome {
                    index,
                    label,
                    generated_id: output.insert_id,
                    affected_rows: output.affected_rows,
                }),
                Err(err) => {
                    return Err(abort(
                        sequence_id,
                        index,
                        label,
                        StepError::Execution(err),
                        completed,
                    ))
                }
            }
        }

        info!(
            "event=write_sequence module=coordinator status=ok sequence_id={} steps={} duration_ms={}",
            sequence_id,
            step_count,
            started_at.elapsed().as_millis()
        );
        Ok(WriteSummary::new(completed))
    }
}

fn validate(sequence: &WriteSequence) -> Result<(), SequenceError> {
    if sequence.is_empty() {
        return Err(SequenceError::Empty);
    }

    let mut seen_labels = HashMap::new();
    for (index, step) in sequence.steps().iter().enumerate() {
        if let Some(first) = seen_labels.insert(step.label(), index) {
            return Err(SequenceError::DuplicateLabel {
                step: index,
                label: step.label().to_string(),
                first,
            });
        }
        if let Some(references) = step.dependencies().find(|dep| *dep >= index) {
            return Err(SequenceError::ForwardReference {
                step: index,
                label: step.label().to_string(),
                references,
            });
        }
    }

    Ok(())
}

fn resolve_params(
    params: Vec<StepParam>,
    completed: &[StepOutcome],
) -> Result<Vec<Value>, StepError> {
    params
        .into_iter()
        .map(|param| match param {
            StepParam::Literal(value) => Ok(value),
            StepParam::GeneratedId(references) => completed
                .get(references)
                .and_then(|outcome| outcome.generated_id)
                .map(Value::Integer)
                .ok_or(StepError::MissingIdentifier { references }),
        })
        .collect()
}

fn abort(
    sequence_id: Uuid,
    index: usize,
    label: String,
    error: StepError,
    completed: Vec<StepOutcome>,
) -> WriteError {
    warn!(
        "event=write_sequence module=coordinator status=error sequence_id={} failed_step={} label={} applied_steps={} error={}",
        sequence_id,
        index,
        label,
        completed.len(),
        error
    );
    WriteError::Step(StepFailure {
        index,
        label,
        error,
        completed,
    })
}
