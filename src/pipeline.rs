//! Pipeline controller: source → staging → object storage → warehouse.
//!
//! Stages run strictly forward and the first failure aborts everything
//! after it. The staging artifact is local scratch; it is deleted on success
//! and failure alike, so the only durable effects of a run are the staged
//! object and, on success, the loaded table.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use aws_sdk_s3::primitives::ByteStream;
use tracing::{error, info, warn};

use crate::{
    config::ImportConfig,
    encode,
    progress::{Phase, ProgressReporter},
    schema::{self, Schema},
    source::geojson::{self, GeoJsonSource},
    staging, transfer,
    warehouse::{
        self,
        orchestrator::{CancelSignal, LoadError, LoadOrchestrator},
    },
};

/// Import failure, tagged with the stage it happened in.
///
/// Mirrors the failure taxonomy one-to-one; `TE`/`WE` are the transfer and
/// warehouse collaborator error types.
#[derive(Debug, thiserror::Error)]
pub enum Error<TE, WE> {
    /// Reserved: schema inference is total today.
    #[error("schema: {0}")]
    Schema(schema::Error),
    #[error("source: {0}")]
    Source(geojson::Error),
    #[error("encode: {0}")]
    Encoding(encode::Error),
    #[error("staging io: {0}")]
    Io(Box<dyn std::error::Error + Send + Sync>),
    #[error("transfer: {0}")]
    Transfer(TE),
    #[error("table {table} already exists")]
    TableConflict { table: String },
    #[error("submission: {0}")]
    Submission(SubmissionError<WE>),
    #[error("load failed: {detail}")]
    LoadFailed { detail: String },
    #[error("cancelled; the warehouse job's outcome is unknown")]
    Cancelled,
}

#[derive(Debug, thiserror::Error)]
pub enum SubmissionError<E> {
    #[error("still throttled after {attempts} attempts")]
    Throttled { attempts: u32 },
    #[error("{0}")]
    Submit(E),
    #[error("status query failed: {0}")]
    Describe(E),
}

impl<TE, WE> Error<TE, WE> {
    /// Stage tag for the terminal message and exit path.
    pub fn stage(&self) -> &'static str {
        match self {
            Self::Schema(_) => "schema",
            Self::Source(_) => "source",
            Self::Encoding(_) => "encode",
            Self::Io(_) => "staging",
            Self::Transfer(_) => "transfer",
            Self::TableConflict { .. } => "table-conflict",
            Self::Submission(_) => "submit",
            Self::LoadFailed { .. } => "load",
            Self::Cancelled => "cancelled",
        }
    }

    fn from_load(error: LoadError<WE>) -> Self {
        match error {
            LoadError::TableConflict { table } => Self::TableConflict { table },
            LoadError::Throttled { attempts } => {
                Self::Submission(SubmissionError::Throttled { attempts })
            }
            LoadError::Submit(error) => Self::Submission(SubmissionError::Submit(error)),
            LoadError::Describe(error) => Self::Submission(SubmissionError::Describe(error)),
            LoadError::Failed { detail } => Self::LoadFailed { detail },
            LoadError::Cancelled => Self::Cancelled,
        }
    }

    fn from_staging(error: staging::Error<geojson::Error>) -> Self {
        match error {
            staging::Error::Source(error) => Self::Source(error),
            staging::Error::Encode(error) => Self::Encoding(error),
            staging::Error::Write(error) => Self::Io(Box::new(error)),
        }
    }
}

/// Successful import summary.
#[derive(Debug)]
pub struct Outcome {
    pub rows: usize,
    pub table: String,
    /// `s3://` location the warehouse loaded from.
    pub location: String,
}

/// Removes the sealed staging artifact once the pipeline is done with it.
struct StagingGuard(PathBuf);

impl Drop for StagingGuard {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.0);
    }
}

fn staging_path(input: &Path) -> PathBuf {
    let mut name = input.as_os_str().to_owned();
    name.push(".staging.csv");
    PathBuf::from(name)
}

pub struct Pipeline<T, W> {
    pub transfer: T,
    pub warehouse: LoadOrchestrator<W>,
    pub reporter: Arc<dyn ProgressReporter>,
}

impl<T: transfer::Client, W: warehouse::Client> Pipeline<T, W> {
    /// Run one import. Exactly one invocation owns the staging artifact and
    /// the load job at a time; concurrent runs against the same table or key
    /// are out of scope.
    pub async fn run(
        &self,
        config: &ImportConfig,
        input: &Path,
        cancel: &mut CancelSignal,
    ) -> Result<Outcome, Error<T::Error, W::Error>> {
        self.reporter.set_phase(Phase::InferringSchema);
        let source = GeoJsonSource::open(input)
            .map_err(Error::Source)
            .inspect_err(|error| error!(%error, "failed to open source dataset"))?;
        if source
            .fields()
            .iter()
            .any(|field| field.name == config.geometry_column)
        {
            warn!(
                column = %config.geometry_column,
                "an attribute shares the geometry column's name; table creation will fail"
            );
        }
        let schema = Schema::infer(source.fields(), config.geometry_column.clone());
        let srid = config.srid.or_else(|| source.srid());

        self.reporter.set_phase(Phase::CheckingTarget);
        self.warehouse
            .ensure_table_absent(&config.table, cancel)
            .await
            .map_err(Error::from_load)
            .inspect_err(|error| error!(%error, "target table check failed"))?;

        self.reporter.set_phase(Phase::Transforming);
        let artifact = staging_path(input);
        let rows = {
            let artifact = artifact.clone();
            let schema = schema.clone();
            tokio::task::spawn_blocking(move || {
                let records = source.records().map_err(staging::Error::Source)?;
                staging::stage_dataset(&artifact, &schema, srid, records)
            })
            .await
            .expect("transform task panicked")
            .map_err(Error::from_staging)
            .inspect_err(|error| error!(%error, "failed to write staging artifact"))?
        };
        let guard = StagingGuard(artifact.clone());
        info!(rows, artifact = %artifact.display(), "staging artifact written");

        self.reporter.set_phase(Phase::Uploading);
        let key = transfer::staging_key(&config.table, input);
        let body = ByteStream::from_path(&artifact)
            .await
            .map_err(|error| Error::Io(Box::new(error)))?;
        self.transfer
            .put(
                config.bucket.clone(),
                key.clone(),
                "text/csv".to_owned(),
                body,
            )
            .await
            .map_err(Error::Transfer)
            .inspect_err(|error| error!(%error, "failed to upload staging artifact"))?;
        drop(guard);

        self.reporter.set_phase(Phase::CreatingTable);
        self.warehouse
            .create_table(&config.table, &schema, cancel)
            .await
            .map_err(Error::from_load)
            .inspect_err(|error| error!(%error, "failed to create table"))?;

        self.reporter.set_phase(Phase::Loading);
        let location = transfer::object_url(&config.bucket, &key);
        self.warehouse
            .copy_into(&config.table, &location, &config.iam_role_arn, cancel)
            .await
            .map_err(Error::from_load)
            .inspect_err(|error| error!(%error, "load failed"))?;

        self.reporter.set_phase(Phase::Completed);
        info!(rows, table = %config.table, "import complete");
        Ok(Outcome {
            rows,
            table: config.table.clone(),
            location,
        })
    }
}
