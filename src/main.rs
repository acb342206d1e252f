use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing::error;

use geoload::{
    config::ImportConfig,
    pipeline::{Error, Pipeline},
    progress::{self, NullReporter, Phase, ProgressReporter},
    transfer,
    warehouse::{self, LoadOrchestrator},
};

#[derive(Parser)]
#[clap(about = "Import a GeoJSON dataset into a new Redshift table")]
struct Opts {
    /// Input GeoJSON file.
    input_file: PathBuf,
    /// S3 bucket the staging file is uploaded to.
    bucket: String,
    /// Redshift cluster identifier.
    cluster_identifier: String,
    /// Database where the data will be imported.
    database: String,
    /// ARN of the secret that provides access to the database.
    secret_arn: String,
    /// ARN of the Redshift role with read access to the bucket.
    iam_role_arn: String,
    /// Target table. The import errors out if the table already exists.
    table_name: String,
    /// Name of the geometry column.
    #[clap(long, default_value = "geom")]
    geometry_column: String,
    /// Override the SRID embedded in the geometry encoding.
    #[clap(long)]
    srid: Option<i32>,
    #[clap(long, env = "AWS_REGION")]
    region: Option<String>,
    /// Disable the progress display.
    #[clap(short, long)]
    quiet: bool,
}

async fn run(opts: Opts) -> ExitCode {
    let config = ImportConfig {
        bucket: opts.bucket,
        cluster_identifier: opts.cluster_identifier,
        database: opts.database,
        secret_arn: opts.secret_arn,
        iam_role_arn: opts.iam_role_arn,
        table: opts.table_name,
        geometry_column: opts.geometry_column,
        srid: opts.srid,
        region: opts.region,
    };

    let (cancel_tx, mut cancel) = tokio::sync::watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let _ = cancel_tx.send(true);
        }
    });

    let reporter: Arc<dyn ProgressReporter> = if opts.quiet {
        Arc::new(NullReporter)
    } else {
        progress::create_reporter()
    };
    let pipeline = Pipeline {
        transfer: transfer::s3::Client::new(&config).await,
        warehouse: LoadOrchestrator::new(warehouse::redshift::Client::new(&config).await),
        reporter: reporter.clone(),
    };

    match pipeline.run(&config, &opts.input_file, &mut cancel).await {
        Ok(outcome) => {
            reporter.finish();
            println!(
                "Imported {} rows into {} (staged at {})",
                outcome.rows, outcome.table, outcome.location
            );
            ExitCode::SUCCESS
        }
        Err(failure) => {
            reporter.set_phase(Phase::Failed(failure.to_string()));
            reporter.finish();
            error!(stage = failure.stage(), %failure, "import failed");
            eprintln!("error[{}]: {failure}", failure.stage());
            if matches!(failure, Error::Cancelled) {
                // Conventional exit status for interrupt-driven termination.
                ExitCode::from(130)
            } else {
                ExitCode::FAILURE
            }
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let opts = Opts::parse();
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();
    run(opts).await
}
