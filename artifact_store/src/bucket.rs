//! Object storage collaborator used by the artifact repository.

use std::{fmt, path::Path as LocalPath, sync::Arc};

use async_trait::async_trait;
use futures::StreamExt;
use object_store::{path::Path, ObjectStore, PutPayload};
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::{Error, Result};

/// Delimiter used to simulate directories in the flat key namespace.
pub const DELIMITER: &str = "/";

/// An object returned by a listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListedObject {
    pub key: String,
    pub size: u64,
}

/// A single listing response: the objects directly under the prefix and the
/// common prefixes (with a trailing delimiter) one level below it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObjectListing {
    pub objects: Vec<ListedObject>,
    pub prefixes: Vec<String>,
}

/// Authenticated binding to one bucket.
#[async_trait]
pub trait Bucket: Send + Sync {
    /// Upload the local file at `local_file` to `key`, overwriting any
    /// existing object. The upload is a single request.
    async fn put_object_from_file(&self, key: &str, local_file: &LocalPath) -> Result<()>;

    /// Download `key` into `local_file`.
    ///
    /// Returns a not-found storage error if the object doesn't exist.
    async fn get_object_to_file(&self, key: &str, local_file: &LocalPath) -> Result<()>;

    /// List objects and common prefixes under `prefix`.
    ///
    /// This is one listing request; callers don't page through results.
    async fn list_objects(&self, prefix: &str, delimiter: &str) -> Result<ObjectListing>;
}

/// [`Bucket`] backed by an [`ObjectStore`] client.
#[derive(Clone)]
pub struct ObjectStoreBucket {
    name: String,
    store: Arc<dyn ObjectStore>,
}

impl fmt::Debug for ObjectStoreBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectStoreBucket")
            .field("name", &self.name)
            .field("store", &self.store.to_string())
            .finish()
    }
}

impl ObjectStoreBucket {
    pub fn new(name: &str, store: Arc<dyn ObjectStore>) -> Self {
        Self {
            name: name.to_string(),
            store,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn object_store(&self) -> Arc<dyn ObjectStore> {
        self.store.clone()
    }
}

#[async_trait]
impl Bucket for ObjectStoreBucket {
    async fn put_object_from_file(&self, key: &str, local_file: &LocalPath) -> Result<()> {
        let location = Path::parse(key)?;
        // Whole file is buffered: uploads are a single PUT, never multipart.
        let data = tokio::fs::read(local_file).await?;
        let size = data.len();
        self.store.put(&location, PutPayload::from(data)).await?;
        debug!(bucket = %self.name, %key, size, "uploaded object");
        Ok(())
    }

    async fn get_object_to_file(&self, key: &str, local_file: &LocalPath) -> Result<()> {
        let location = Path::parse(key)?;
        let result = self.store.get(&location).await?;
        let mut stream = result.into_stream();
        let mut file = tokio::fs::File::create(local_file).await?;
        while let Some(chunk) = stream.next().await {
            file.write_all(&chunk?).await?;
        }
        file.flush().await?;
        debug!(bucket = %self.name, %key, path = %local_file.display(), "downloaded object");
        Ok(())
    }

    async fn list_objects(&self, prefix: &str, delimiter: &str) -> Result<ObjectListing> {
        if delimiter != DELIMITER {
            return Err(Error::UnsupportedDelimiter {
                delimiter: delimiter.to_string(),
            });
        }
        let prefix = prefix.trim_end_matches(DELIMITER);
        let location = if prefix.is_empty() {
            None
        } else {
            Some(Path::parse(prefix)?)
        };
        let result = self.store.list_with_delimiter(location.as_ref()).await?;
        let listing = ObjectListing {
            objects: result
                .objects
                .into_iter()
                .map(|meta| ListedObject {
                    key: meta.location.to_string(),
                    size: meta.size,
                })
                .collect(),
            prefixes: result
                .common_prefixes
                .into_iter()
                .map(|p| format!("{p}{DELIMITER}"))
                .collect(),
        };
        debug!(
            bucket = %self.name,
            %prefix,
            objects = listing.objects.len(),
            prefixes = listing.prefixes.len(),
            "listed objects"
        );
        Ok(listing)
    }
}
