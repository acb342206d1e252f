//! Scripted warehouse collaborator for driving the orchestrator and the
//! pipeline without a network.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::warehouse::{Client, JobState, JobStatus, SubmitOutcome};

/// The script ran out of responses: the code under test made a call the
/// scenario did not allow for.
#[derive(Debug, thiserror::Error)]
#[error("scripted warehouse exhausted: unexpected {0} call")]
pub struct Exhausted(pub &'static str);

#[derive(Default)]
pub struct ScriptedWarehouse {
    submits: Mutex<VecDeque<SubmitOutcome>>,
    describes: Mutex<VecDeque<JobStatus>>,
    in_flight_forever: bool,
    submit_count: AtomicUsize,
    describe_count: AtomicUsize,
    statements: Mutex<Vec<String>>,
}

impl ScriptedWarehouse {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue the outcome of the next submit call.
    pub fn on_submit(self, outcome: SubmitOutcome) -> Self {
        self.submits.lock().unwrap().push_back(outcome);
        self
    }

    /// Queue the next describe observation.
    pub fn on_describe(self, status: JobStatus) -> Self {
        self.describes.lock().unwrap().push_back(status);
        self
    }

    /// Once the describe script is exhausted, report `SUBMITTED` forever
    /// instead of erroring. For cancellation scenarios.
    pub fn in_flight_forever(mut self) -> Self {
        self.in_flight_forever = true;
        self
    }

    pub fn submit_calls(&self) -> usize {
        self.submit_count.load(Ordering::SeqCst)
    }

    pub fn describe_calls(&self) -> usize {
        self.describe_count.load(Ordering::SeqCst)
    }

    /// Every statement submitted so far, in order.
    pub fn statements(&self) -> Vec<String> {
        self.statements.lock().unwrap().clone()
    }
}

impl Client for ScriptedWarehouse {
    type Error = Exhausted;

    async fn submit(&self, statement: &str) -> Result<SubmitOutcome, Self::Error> {
        self.submit_count.fetch_add(1, Ordering::SeqCst);
        self.statements.lock().unwrap().push(statement.to_owned());
        self.submits
            .lock()
            .unwrap()
            .pop_front()
            .ok_or(Exhausted("submit"))
    }

    async fn describe(&self, _job_id: &str) -> Result<JobStatus, Self::Error> {
        self.describe_count.fetch_add(1, Ordering::SeqCst);
        match self.describes.lock().unwrap().pop_front() {
            Some(status) => Ok(status),
            None if self.in_flight_forever => Ok(JobStatus::new(JobState::Submitted)),
            None => Err(Exhausted("describe")),
        }
    }
}
