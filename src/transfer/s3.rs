use crate::{config::ImportConfig, transfer};

pub struct Client {
    client: aws_sdk_s3::Client,
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to put object: {0}")]
    Put(String),
}

impl Client {
    pub async fn new(config: &ImportConfig) -> Self {
        Self {
            client: aws_sdk_s3::Client::new(&config.sdk_config().await),
        }
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
        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .content_type(content_type)
            .body(body)
            .send()
            .await
            .map_err(|error| Error::Put(error.to_string()))?;
        Ok(())
    }
}
