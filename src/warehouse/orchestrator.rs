//! Load orchestration: submit warehouse statements and drive their
//! asynchronous execution to a terminal state.
//!
//! Waiting happens in exactly two places, both here:
//!
//! - throttled submissions retry with exponential backoff, 500 ms base
//!   doubled per attempt, capped at 60 s, at most 5 attempts;
//! - accepted jobs are polled every 2 s until terminal, with no client-side
//!   timeout. The wait is cancellable through a watch channel; cancellation
//!   stops observation without rolling back the job, whose fate is then
//!   unknown.

use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, warn};

use crate::schema::Schema;

use super::{Client, JobState, JobStatus, SubmitOutcome, sql};

const POLL_INTERVAL: Duration = Duration::from_secs(2);
const SUBMIT_BACKOFF_BASE: Duration = Duration::from_millis(500);
const SUBMIT_BACKOFF_CAP: Duration = Duration::from_secs(60);
const SUBMIT_MAX_ATTEMPTS: u32 = 5;

/// Cancellation signal; flips to `true` once, e.g. from a ctrl-c handler.
pub type CancelSignal = watch::Receiver<bool>;

#[derive(Debug, thiserror::Error)]
pub enum LoadError<E> {
    #[error("table {table} already exists")]
    TableConflict { table: String },
    #[error("submission still throttled after {attempts} attempts")]
    Throttled { attempts: u32 },
    #[error("submission failed: {0}")]
    Submit(E),
    #[error("status query failed: {0}")]
    Describe(E),
    /// Warehouse-reported failure, detail verbatim.
    #[error("{detail}")]
    Failed { detail: String },
    #[error("cancelled while awaiting warehouse job; its outcome is unknown")]
    Cancelled,
}

pub struct LoadOrchestrator<C> {
    client: C,
    poll_interval: Duration,
    backoff_base: Duration,
}

impl<C: Client> LoadOrchestrator<C> {
    pub fn new(client: C) -> Self {
        Self::with_timing(client, POLL_INTERVAL, SUBMIT_BACKOFF_BASE)
    }

    /// Override the waiting constants. Tests shrink them to keep scripted
    /// runs fast; production uses [`new`](Self::new).
    pub fn with_timing(client: C, poll_interval: Duration, backoff_base: Duration) -> Self {
        Self {
            client,
            poll_interval,
            backoff_base,
        }
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    /// Fail before anything is staged if the target table already exists.
    ///
    /// The collaborator only offers submit/describe, so existence is probed
    /// with a statement that succeeds iff the table is there and reads no
    /// rows: a FINISHED probe means conflict, a FAILED probe means absent.
    pub async fn ensure_table_absent(
        &self,
        table: &str,
        cancel: &mut CancelSignal,
    ) -> Result<(), LoadError<C::Error>> {
        debug!(table, "probing for an existing table");
        match self.execute(&sql::probe(table), cancel).await {
            Ok(()) => Err(LoadError::TableConflict {
                table: table.to_owned(),
            }),
            Err(LoadError::Failed { .. }) => Ok(()),
            Err(other) => Err(other),
        }
    }

    /// Create the target table from the inferred schema.
    pub async fn create_table(
        &self,
        table: &str,
        schema: &Schema,
        cancel: &mut CancelSignal,
    ) -> Result<(), LoadError<C::Error>> {
        self.execute(&sql::create_table(table, schema), cancel)
            .await
            .map_err(|error| match error {
                // Lost a race with a concurrent creator after the probe.
                LoadError::Failed { detail } if detail.contains("already exists") => {
                    LoadError::TableConflict {
                        table: table.to_owned(),
                    }
                }
                other => other,
            })
    }

    /// COPY the staged object into the table.
    pub async fn copy_into(
        &self,
        table: &str,
        location: &str,
        iam_role: &str,
        cancel: &mut CancelSignal,
    ) -> Result<(), LoadError<C::Error>> {
        self.execute(&sql::copy_from(table, location, iam_role), cancel)
            .await
    }

    async fn execute(
        &self,
        statement: &str,
        cancel: &mut CancelSignal,
    ) -> Result<(), LoadError<C::Error>> {
        let job_id = self.submit_with_retry(statement).await?;
        let status = self.await_terminal(&job_id, cancel).await?;
        match status.state {
            JobState::Finished => Ok(()),
            _ => Err(LoadError::Failed {
                detail: status
                    .error
                    .unwrap_or_else(|| "aborted with no error detail".to_owned()),
            }),
        }
    }

    async fn submit_with_retry(&self, statement: &str) -> Result<String, LoadError<C::Error>> {
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            match self
                .client
                .submit(statement)
                .await
                .map_err(LoadError::Submit)?
            {
                SubmitOutcome::Accepted(job_id) => {
                    debug!(job_id, attempt, "statement submitted");
                    return Ok(job_id);
                }
                SubmitOutcome::Throttled if attempt < SUBMIT_MAX_ATTEMPTS => {
                    let delay = backoff(self.backoff_base, attempt);
                    warn!(
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        "submission throttled, backing off"
                    );
                    tokio::time::sleep(delay).await;
                }
                SubmitOutcome::Throttled => {
                    return Err(LoadError::Throttled { attempts: attempt });
                }
            }
        }
    }

    async fn await_terminal(
        &self,
        job_id: &str,
        cancel: &mut CancelSignal,
    ) -> Result<JobStatus, LoadError<C::Error>> {
        loop {
            if *cancel.borrow() {
                return Err(LoadError::Cancelled);
            }
            let status = self
                .client
                .describe(job_id)
                .await
                .map_err(LoadError::Describe)?;
            debug!(job_id, state = ?status.state, "observed job state");
            if status.state.is_terminal() {
                return Ok(status);
            }
            tokio::select! {
                _ = tokio::time::sleep(self.poll_interval) => {}
                changed = cancel.changed() => match changed {
                    Ok(()) if *cancel.borrow() => return Err(LoadError::Cancelled),
                    Ok(()) => {}
                    // Sender gone; nobody can cancel any more.
                    Err(_) => tokio::time::sleep(self.poll_interval).await,
                },
            }
        }
    }
}

fn backoff(base: Duration, attempt: u32) -> Duration {
    let millis = (base.as_millis() as u64)
        .saturating_mul(2u64.saturating_pow(attempt.saturating_sub(1)));
    Duration::from_millis(millis.min(SUBMIT_BACKOFF_CAP.as_millis() as u64))
}
