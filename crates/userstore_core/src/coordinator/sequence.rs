//! Write-step descriptors and their results.

use rusqlite::types::Value;
use serde::Serialize;

/// One bound parameter of a [`WriteStep`].
#[derive(Debug, Clone, PartialEq)]
pub enum StepParam {
    /// Value captured from the request when the step was built.
    Literal(Value),
    /// Identifier generated by the step at this (zero-based) index.
    GeneratedId(usize),
}

impl From<Value> for StepParam {
    fn from(value: Value) -> Self {
        Self::Literal(value)
    }
}

impl From<&str> for StepParam {
    fn from(value: &str) -> Self {
        Self::Literal(Value::Text(value.to_string()))
    }
}

impl From<String> for StepParam {
    fn from(value: String) -> Self {
        Self::Literal(Value::Text(value))
    }
}

impl From<Option<String>> for StepParam {
    fn from(value: Option<String>) -> Self {
        Self::Literal(value.map_or(Value::Null, Value::Text))
    }
}

impl From<i64> for StepParam {
    fn from(value: i64) -> Self {
        Self::Literal(Value::Integer(value))
    }
}

/// A labelled statement plus its positional parameters.
///
/// Built with [`WriteStep::new`] and the `bind*` methods; once pushed into a
/// [`WriteSequence`] it is read-only.
#[derive(Debug, Clone, PartialEq)]
pub struct WriteStep {
    label: String,
    statement: String,
    params: Vec<StepParam>,
}

impl WriteStep {
    pub fn new(label: impl Into<String>, statement: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            statement: statement.into(),
            params: Vec::new(),
        }
    }

    /// Appends the next positional parameter.
    pub fn bind(mut self, param: impl Into<StepParam>) -> Self {
        self.params.push(param.into());
        self
    }

    /// Appends the identifier generated by an earlier step.
    pub fn bind_generated_id(self, step_index: usize) -> Self {
        self.bind(StepParam::GeneratedId(step_index))
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn statement(&self) -> &str {
        &self.statement
    }

    pub fn params(&self) -> &[StepParam] {
        &self.params
    }

    pub(crate) fn dependencies(&self) -> impl Iterator<Item = usize> + '_ {
        self.params.iter().filter_map(|param| match param {
            StepParam::GeneratedId(index) => Some(*index),
            StepParam::Literal(_) => None,
        })
    }

    pub(crate) fn into_parts(self) -> (String, String, Vec<StepParam>) {
        (self.label, self.statement, self.params)
    }
}

/// Ordered steps run by [`super::SequentialWriteCoordinator`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WriteSequence {
    steps: Vec<WriteStep>,
}

impl WriteSequence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a step; returns the sequence for chaining.
    pub fn then(mut self, step: WriteStep) -> Self {
        self.steps.push(step);
        self
    }

    pub fn steps(&self) -> &[WriteStep] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub(crate) fn into_steps(self) -> Vec<WriteStep> {
        self.steps
    }
}

/// Result of one step that ran successfully.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepOutcome {
    pub index: usize,
    pub label: String,
    pub generated_id: Option<i64>,
    pub affected_rows: usize,
}

/// Aggregate result of a fully applied sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WriteSummary {
    steps: Vec<StepOutcome>,
}

impl WriteSummary {
    pub(crate) fn new(steps: Vec<StepOutcome>) -> Self {
        Self { steps }
    }

    /// Step outcomes in execution order.
    pub fn steps(&self) -> &[StepOutcome] {
        &self.steps
    }

    pub fn get(&self, label: &str) -> Option<&StepOutcome> {
        self.steps.iter().find(|step| step.label == label)
    }

    pub fn generated_id(&self, label: &str) -> Option<i64> {
        self.get(label).and_then(|step| step.generated_id)
    }

    /// Identifier produced by the first step, if it produced one.
    pub fn root_id(&self) -> Option<i64> {
        self.steps.first().and_then(|step| step.generated_id)
    }

    pub fn total_affected_rows(&self) -> usize {
        self.steps.iter().map(|step| step.affected_rows).sum()
    }

    pub fn into_steps(self) -> Vec<StepOutcome> {
        self.steps
    }
}
