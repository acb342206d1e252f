//! End-to-end pipeline tests over in-memory collaborators.

pub(crate) mod support;

use std::io::Write as _;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::{
    config::ImportConfig,
    pipeline::{Error, Pipeline},
    progress::NullReporter,
    transfer::memory,
    warehouse::{JobState, JobStatus, LoadOrchestrator, SubmitOutcome},
};
use self::support::ScriptedWarehouse;

const DATASET: &str = r#"{
    "type": "FeatureCollection",
    "features": [
        {
            "type": "Feature",
            "geometry": {"type": "Point", "coordinates": [2.2945, 48.8584]},
            "properties": {"id": 1, "name": "north gate"}
        },
        {
            "type": "Feature",
            "geometry": {"type": "Point", "coordinates": [2.3522, 48.8566]},
            "properties": {"id": 2, "name": "city, central"}
        },
        {
            "type": "Feature",
            "geometry": null,
            "properties": {"id": 3, "name": "south gate"}
        }
    ]
}"#;

fn write_input(dir: &tempfile::TempDir) -> PathBuf {
    let path = dir.path().join("poi.geojson");
    let mut file = std::fs::File::create(&path).unwrap();
    file.write_all(DATASET.as_bytes()).unwrap();
    path
}

fn config() -> ImportConfig {
    ImportConfig {
        bucket: "lake".into(),
        cluster_identifier: "analytics".into(),
        database: "dev".into(),
        secret_arn: "arn:aws:secretsmanager:eu-west-1:123456789012:secret:rs".into(),
        iam_role_arn: "arn:aws:iam::123456789012:role/redshift-copy".into(),
        table: "places".into(),
        geometry_column: "geom".into(),
        srid: None,
        region: None,
    }
}

fn pipeline(warehouse: ScriptedWarehouse) -> Pipeline<memory::Client, ScriptedWarehouse> {
    Pipeline {
        transfer: memory::Client::new(),
        warehouse: LoadOrchestrator::with_timing(
            warehouse,
            Duration::from_millis(5),
            Duration::from_millis(5),
        ),
        reporter: Arc::new(NullReporter),
    }
}

fn absent_probe(warehouse: ScriptedWarehouse) -> ScriptedWarehouse {
    warehouse
        .on_submit(SubmitOutcome::Accepted("probe-1".into()))
        .on_describe(JobStatus {
            state: JobState::Failed,
            error: Some("relation \"places\" does not exist".into()),
        })
}

#[tokio::test]
async fn imports_three_records_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_input(&dir);
    let warehouse = absent_probe(ScriptedWarehouse::new())
        .on_submit(SubmitOutcome::Accepted("ddl-1".into()))
        .on_describe(JobStatus::new(JobState::Finished))
        .on_submit(SubmitOutcome::Accepted("copy-1".into()))
        .on_describe(JobStatus::new(JobState::Started))
        .on_describe(JobStatus::new(JobState::Finished));
    let pipeline = pipeline(warehouse);
    let (_tx, mut cancel) = tokio::sync::watch::channel(false);

    let outcome = pipeline
        .run(&config(), &input, &mut cancel)
        .await
        .unwrap();
    assert_eq!(outcome.rows, 3);
    assert_eq!(outcome.table, "places");
    assert_eq!(outcome.location, "s3://lake/places/poi.geojson.csv");

    // Staging scratch is gone; the staged object is what remains.
    assert!(!dir.path().join("poi.geojson.staging.csv").exists());
    let staged = pipeline
        .transfer
        .object("lake", "places/poi.geojson.csv")
        .await
        .expect("staged object");
    let text = std::str::from_utf8(&staged).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 4);
    assert_eq!(lines[0], "id,name,geom");
    // Delimiter-bearing attribute is quoted; null geometry is an empty token.
    assert!(lines[2].starts_with("2,\"city, central\","));
    assert_eq!(lines[3], "3,south gate,");
    // GeoJSON data is WGS84: SRID-tagged little-endian EWKB point.
    assert!(lines[1].starts_with("1,north gate,0101000020e6100000"));

    let statements = pipeline.warehouse.client().statements();
    assert_eq!(statements.len(), 3);
    assert_eq!(statements[0], "SELECT 1 FROM places WHERE 1 = 0");
    assert_eq!(
        statements[1],
        "CREATE TABLE places (id BIGINT, name VARCHAR(MAX), geom GEOMETRY)"
    );
    assert!(statements[2].starts_with("COPY places FROM 's3://lake/places/poi.geojson.csv'"));
}

#[tokio::test]
async fn existing_table_fails_before_any_upload() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_input(&dir);
    let warehouse = ScriptedWarehouse::new()
        .on_submit(SubmitOutcome::Accepted("probe-1".into()))
        .on_describe(JobStatus::new(JobState::Finished));
    let pipeline = pipeline(warehouse);
    let (_tx, mut cancel) = tokio::sync::watch::channel(false);

    let err = pipeline
        .run(&config(), &input, &mut cancel)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::TableConflict { ref table } if table == "places"));
    assert_eq!(err.stage(), "table-conflict");
    assert_eq!(pipeline.transfer.object_count().await, 0);
    assert!(!dir.path().join("poi.geojson.staging.csv").exists());
}

#[tokio::test]
async fn warehouse_failure_is_surfaced_verbatim() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_input(&dir);
    let warehouse = absent_probe(ScriptedWarehouse::new())
        .on_submit(SubmitOutcome::Accepted("ddl-1".into()))
        .on_describe(JobStatus::new(JobState::Finished))
        .on_submit(SubmitOutcome::Accepted("copy-1".into()))
        .on_describe(JobStatus::new(JobState::Submitted))
        .on_describe(JobStatus::new(JobState::Started))
        .on_describe(JobStatus {
            state: JobState::Failed,
            error: Some("syntax error".into()),
        });
    let pipeline = pipeline(warehouse);
    let (_tx, mut cancel) = tokio::sync::watch::channel(false);

    let err = pipeline
        .run(&config(), &input, &mut cancel)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::LoadFailed { ref detail } if detail == "syntax error"));
    assert_eq!(err.stage(), "load");
    // The upload had already happened; the local scratch is still cleaned up.
    assert_eq!(pipeline.transfer.object_count().await, 1);
    assert!(!dir.path().join("poi.geojson.staging.csv").exists());
}

#[tokio::test]
async fn unsupported_source_data_aborts_without_upload() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bad.geojson");
    std::fs::write(&path, "{ not geojson").unwrap();
    let pipeline = pipeline(ScriptedWarehouse::new());
    let (_tx, mut cancel) = tokio::sync::watch::channel(false);

    let err = pipeline
        .run(&config(), &path, &mut cancel)
        .await
        .unwrap_err();
    assert_eq!(err.stage(), "source");
    assert_eq!(pipeline.transfer.object_count().await, 0);
}
