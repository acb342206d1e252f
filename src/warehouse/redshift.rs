//! Redshift Data API implementation of the warehouse collaborator.

use aws_sdk_redshiftdata::types::StatusString;
use tracing::warn;

use crate::config::ImportConfig;

use super::{JobState, JobStatus, SubmitOutcome};

pub struct Client {
    client: aws_sdk_redshiftdata::Client,
    cluster_identifier: String,
    database: String,
    secret_arn: String,
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to submit statement: {0}")]
    Submit(String),
    #[error("failed to describe statement: {0}")]
    Describe(String),
    #[error("submission accepted but returned no statement id")]
    MissingId,
}

impl Client {
    pub async fn new(config: &ImportConfig) -> Self {
        Self {
            client: aws_sdk_redshiftdata::Client::new(&config.sdk_config().await),
            cluster_identifier: config.cluster_identifier.clone(),
            database: config.database.clone(),
            secret_arn: config.secret_arn.clone(),
        }
    }
}

impl super::Client for Client {
    type Error = Error;

    async fn submit(&self, statement: &str) -> Result<SubmitOutcome, Self::Error> {
        match self
            .client
            .execute_statement()
            .cluster_identifier(&self.cluster_identifier)
            .database(&self.database)
            .secret_arn(&self.secret_arn)
            .sql(statement)
            .send()
            .await
        {
            Ok(output) => {
                let job_id = output.id().ok_or(Error::MissingId)?.to_owned();
                Ok(SubmitOutcome::Accepted(job_id))
            }
            Err(error) => {
                let error = error.into_service_error();
                if error.is_active_statements_exceeded_exception() {
                    Ok(SubmitOutcome::Throttled)
                } else {
                    Err(Error::Submit(error.to_string()))
                }
            }
        }
    }

    async fn describe(&self, job_id: &str) -> Result<JobStatus, Self::Error> {
        let output = self
            .client
            .describe_statement()
            .id(job_id)
            .send()
            .await
            .map_err(|error| Error::Describe(error.into_service_error().to_string()))?;
        let state = match output.status() {
            Some(StatusString::Submitted) | None => JobState::Submitted,
            Some(StatusString::Picked) => JobState::Picked,
            Some(StatusString::Started) => JobState::Started,
            Some(StatusString::Finished) => JobState::Finished,
            Some(StatusString::Failed) => JobState::Failed,
            Some(StatusString::Aborted) => JobState::Aborted,
            Some(other) => {
                // Undocumented status; keep polling rather than invent a verdict.
                warn!(status = ?other, "unrecognized statement status, treating as in flight");
                JobState::Submitted
            }
        };
        Ok(JobStatus {
            state,
            error: output.error().map(str::to_owned),
        })
    }
}
