//! In-memory object store for exercising the pipeline without a network.

use std::collections::HashMap;

use aws_sdk_s3::primitives::ByteStreamError;

use crate::transfer;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to aggregate body: {0}")]
    AggregateBody(ByteStreamError),
}

#[derive(Default)]
pub struct Client {
    map: tokio::sync::Mutex<HashMap<String, HashMap<String, (bytes::Bytes, String)>>>,
}

impl Client {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stored object body, if present.
    pub async fn object(&self, bucket: &str, key: &str) -> Option<bytes::Bytes> {
        self.map
            .lock()
            .await
            .get(bucket)?
            .get(key)
            .map(|(body, _)| body.clone())
    }

    /// Number of objects stored across all buckets.
    pub async fn object_count(&self) -> usize {
        self.map.lock().await.values().map(HashMap::len).sum()
    }
}

impl transfer::Client for Client {
    type Error = Error;

    async fn put(
        &self,
        bucket: String,
        key: String,
        content_type: String,
        body: aws_sdk_s3::primitives::ByteStream,
    ) -> Result<(), Self::Error> {
        let body = body
            .collect()
            .await
            .map_err(Error::AggregateBody)?
            .into_bytes();
        self.map
            .lock()
            .await
            .entry(bucket)
            .or_default()
            .insert(key, (body, content_type));
        Ok(())
    }
}
