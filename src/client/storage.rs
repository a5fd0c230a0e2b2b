use std::time::Duration;

use anyhow::Context;

use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;

use url::Url;

/// Object-storage client for pass artifacts
#[derive(Debug, Clone)]
pub struct CardStorage {
    client: Client,
    bucket: String,
}

impl CardStorage {
    pub fn new(client: Client, bucket: String) -> Self {
        Self { client, bucket }
    }

    /// Build a client from ambient credentials and region configuration
    pub async fn from_env(bucket: String) -> Self {
        let config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;

        Self::new(Client::new(&config), bucket)
    }

    #[tracing::instrument(name = "Upload pass artifact", skip(self, bytes))]
    pub async fn upload(
        &self,
        remote_path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> anyhow::Result<()> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(remote_path)
            .content_type(content_type)
            .body(ByteStream::from(bytes))
            .send()
            .await
            .context("Failed to upload pass artifact")?;

        Ok(())
    }

    /// Time-limited download URL for a stored artifact
    #[tracing::instrument(name = "Presign artifact URL", skip(self))]
    pub async fn presigned_url(&self, remote_path: &str, ttl: Duration) -> anyhow::Result<Url> {
        let config = PresigningConfig::expires_in(ttl).context("Invalid presigned URL TTL")?;

        let presigned = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(remote_path)
            .presigned(config)
            .await
            .context("Failed to presign artifact URL")?;

        Url::parse(&presigned.uri().to_string()).context("Failed to parse presigned URL")
    }
}
