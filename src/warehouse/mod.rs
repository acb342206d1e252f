//! Warehouse job collaborator.
//!
//! The warehouse executes SQL asynchronously: a submission yields an opaque
//! job id, and the job advances through `SUBMITTED → {PICKED, STARTED}*`
//! until one of the terminal states `FINISHED`, `FAILED` or `ABORTED`.
//! Transitions are observed by polling, never caused by the client.

pub mod orchestrator;
pub mod redshift;
pub mod sql;

pub use orchestrator::LoadOrchestrator;

/// Observable state of an asynchronous warehouse statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Submitted,
    Picked,
    Started,
    Finished,
    Failed,
    Aborted,
}

impl JobState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Finished | Self::Failed | Self::Aborted)
    }
}

/// One `describe` observation.
#[derive(Debug, Clone)]
pub struct JobStatus {
    pub state: JobState,
    /// Warehouse-provided failure detail, surfaced verbatim.
    pub error: Option<String>,
}

impl JobStatus {
    pub fn new(state: JobState) -> Self {
        Self { state, error: None }
    }
}

/// Result of a statement submission.
#[derive(Debug, Clone)]
pub enum SubmitOutcome {
    /// Accepted; the contained job id can be described.
    Accepted(String),
    /// The warehouse asked us to back off. Retryable.
    Throttled,
}

pub trait Client {
    type Error: std::error::Error + Send + Sync + 'static;

    fn submit(
        &self,
        statement: &str,
    ) -> impl Future<Output = Result<SubmitOutcome, Self::Error>> + Send;

    fn describe(
        &self,
        job_id: &str,
    ) -> impl Future<Output = Result<JobStatus, Self::Error>> + Send;
}
