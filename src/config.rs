/// Import parameters resolved by the CLI layer.
///
/// Threaded explicitly into the transfer and warehouse constructors; the
/// core never reads ambient process state. AWS credentials come from the
/// SDK's default provider chain, with `region` as the only override.
#[derive(Debug, Clone)]
pub struct ImportConfig {
    /// Bucket receiving the staging artifact.
    pub bucket: String,
    /// Redshift cluster identifier.
    pub cluster_identifier: String,
    /// Database the table is created in.
    pub database: String,
    /// Secrets Manager ARN granting database access.
    pub secret_arn: String,
    /// Redshift role ARN with read access to the bucket.
    pub iam_role_arn: String,
    /// Target table; the import refuses to touch an existing table.
    pub table: String,
    /// Name of the geometry column appended to the schema.
    pub geometry_column: String,
    /// Spatial reference override; defaults to what the source declares.
    pub srid: Option<i32>,
    /// AWS region override.
    pub region: Option<String>,
}

impl ImportConfig {
    pub(crate) async fn sdk_config(&self) -> aws_config::SdkConfig {
        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest());
        if let Some(region) = &self.region {
            loader = loader.region(aws_config::Region::new(region.clone()));
        }
        loader.load().await
    }
}
