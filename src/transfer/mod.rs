//! Object storage collaborator.
//!
//! The pipeline only needs one primitive: store bytes under a key. The trait
//! keeps the orchestration testable against [`memory::Client`] while
//! [`s3::Client`] talks to the real store.

use std::path::Path;

use aws_sdk_s3::primitives::ByteStream;

pub mod memory;
pub mod s3;

pub trait Client {
    type Error: std::error::Error + Send + Sync + 'static;

    fn put(
        &self,
        bucket: String,
        key: String,
        content_type: String,
        body: ByteStream,
    ) -> impl Future<Output = Result<(), Self::Error>> + Send;
}

/// Object key for a staging artifact.
///
/// Deterministic in the table name and input file name so repeat runs are
/// predictable; deliberately not re-randomized, so a concurrent second run
/// with the same inputs overwrites the first's staged object.
pub fn staging_key(table: &str, input: &Path) -> String {
    let file_name = input
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "dataset".to_owned());
    format!("{table}/{file_name}.csv")
}

/// `s3://` URL the COPY statement reads from.
pub fn object_url(bucket: &str, key: &str) -> String {
    format!("s3://{bucket}/{key}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn staging_key_is_deterministic() {
        let key = staging_key("buildings", Path::new("/data/paris.geojson"));
        assert_eq!(key, "buildings/paris.geojson.csv");
        assert_eq!(
            key,
            staging_key("buildings", Path::new("/data/paris.geojson"))
        );
        assert_eq!(object_url("lake", &key), "s3://lake/buildings/paris.geojson.csv");
    }
}
