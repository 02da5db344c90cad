//! Single-resolution handle for one submitted statement.

use super::primitive::{Completion, PrimitiveError, QueryOutput};
use super::BridgeError;
use log::{debug, error};
use std::sync::mpsc::{self, Receiver};
use std::time::Instant;

/// A statement that has been submitted but not yet waited on.
///
/// Consumed by [`PendingQuery::wait`], so it resolves exactly once.
#[must_use = "a pending query does nothing useful unless waited on"]
pub struct PendingQuery {
    label: String,
    started_at: Instant,
    receiver: Receiver<Result<QueryOutput, PrimitiveError>>,
}

impl PendingQuery {
    /// Creates the handle plus the completion to hand to the primitive.
    pub(crate) fn channel(label: &str) -> (Self, Completion) {
        let (sender, receiver) = mpsc::sync_channel(1);
        let completion: Completion = Box::new(move |result| {
            // Receiver gone means the caller stopped caring.
            let _ = sender.send(result);
        });
        let pending = Self {
            label: label.to_string(),
            started_at: Instant::now(),
            receiver,
        };
        (pending, completion)
    }

    /// Blocks until the primitive reports, with no timeout of its own.
    pub fn wait(self) -> Result<QueryOutput, BridgeError> {
        let result = self
            .receiver
            .recv()
            .unwrap_or(Err(PrimitiveError::CompletionDropped));
        let duration_ms = self.started_at.elapsed().as_millis();

        match result {
            Ok(output) => {
                debug!(
                    "event=query_run module=bridge status=ok label={} duration_ms={} rows={} affected_rows={}",
                    self.label,
                    duration_ms,
                    output.rows.len(),
                    output.affected_rows
                );
                Ok(output)
            }
            Err(source) => {
                error!(
                    "event=query_run module=bridge status=error label={} duration_ms={} error={}",
                    self.label, duration_ms, source
                );
                Err(BridgeError {
                    label: self.label,
                    source,
                })
            }
        }
    }
}
