//! Construction of bucket handles.

use std::sync::Arc;

use object_store::aws::AmazonS3Builder;
use tracing::info;
use url::Url;

use crate::{
    bucket::{Bucket, ObjectStoreBucket},
    config::OssConfig,
    credentials::{resolve_credentials, CredentialsProvider, ObjectStoreCredentials},
    Error,
    Result,
};

/// Builds the handle for a bucket. Building is local and does no network
/// I/O; requests start with the first bucket operation.
pub trait BucketFactory: Send + Sync {
    fn build(&self, bucket: &str) -> Result<Arc<dyn Bucket>>;
}

impl<F> BucketFactory for F
where
    F: Fn(&str) -> Result<Arc<dyn Bucket>> + Send + Sync,
{
    fn build(&self, bucket: &str) -> Result<Arc<dyn Bucket>> {
        self(bucket)
    }
}

/// Talks to OSS through its S3-compatible API.
#[derive(Debug, Clone)]
pub struct OssBucketFactory {
    endpoint: Url,
    region: String,
    allow_http: bool,
    credentials: Arc<dyn CredentialsProvider>,
}

impl OssBucketFactory {
    pub fn new(
        endpoint: Url,
        region: &str,
        allow_http: bool,
        credentials: Arc<dyn CredentialsProvider>,
    ) -> Self {
        Self {
            endpoint,
            region: region.to_string(),
            allow_http,
            credentials,
        }
    }

    /// Resolve endpoint, region and credentials from `config`.
    pub fn from_config(config: &OssConfig) -> Result<Self> {
        let endpoint = config.endpoint()?;
        let region = config.region()?;
        let credentials = resolve_credentials(config)?;
        let allow_http = config.allow_http || endpoint.scheme() == "http";
        Ok(Self::new(endpoint, &region, allow_http, credentials))
    }

    /// OSS only serves virtual-hosted requests, so the bucket becomes the
    /// first label of the endpoint host.
    pub fn bucket_endpoint(&self, bucket: &str) -> Result<String> {
        let host = self.endpoint.host_str().ok_or_else(|| Error::InvalidUri {
            uri: self.endpoint.to_string(),
            source: url::ParseError::EmptyHost,
        })?;
        let port = self
            .endpoint
            .port()
            .map(|p| format!(":{p}"))
            .unwrap_or_default();
        Ok(format!(
            "{}://{}.{}{}",
            self.endpoint.scheme(),
            bucket,
            host,
            port
        ))
    }
}

impl BucketFactory for OssBucketFactory {
    fn build(&self, bucket: &str) -> Result<Arc<dyn Bucket>> {
        let endpoint = self.bucket_endpoint(bucket)?;
        let store = AmazonS3Builder::new()
            .with_bucket_name(bucket)
            .with_region(&self.region)
            .with_endpoint(&endpoint)
            .with_virtual_hosted_style_request(true)
            .with_allow_http(self.allow_http)
            .with_credentials(Arc::new(ObjectStoreCredentials::new(
                self.credentials.clone(),
            )))
            .build()?;
        info!(%bucket, %endpoint, region = %self.region, "created OSS bucket handle");
        Ok(Arc::new(ObjectStoreBucket::new(bucket, Arc::new(store))))
    }
}
