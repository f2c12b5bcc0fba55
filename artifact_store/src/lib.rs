//! Aliyun OSS artifact repository.
//!
//! Stores run and experiment artifacts in an OSS bucket addressed by
//! `oss://bucket/key-prefix` URIs. Object storage has a flat key namespace;
//! directories are simulated with `/`-delimited keys and common prefixes.
//!
//! # Architecture
//!
//! [`OssArtifactRepository`] implements the [`ArtifactRepository`]
//! operations (upload a file, upload a directory tree, list, download,
//! delete). Each operation parses the repository URI with
//! [`uri::parse_oss_uri`] and talks to a [`Bucket`]. The bucket handle is
//! built once per repository by a [`BucketFactory`]; [`OssBucketFactory`]
//! uses the OSS S3-compatible API through `object_store`.
//!
//! # Usage
//!
//! ```rust,no_run
//! use std::path::Path;
//!
//! use artifact_store::{ArtifactRepository, OssArtifactRepository, OssConfig};
//!
//! # async fn example() -> Result<(), artifact_store::Error> {
//! let config = OssConfig::from_env()?;
//! let repo = OssArtifactRepository::from_config("oss://my-bucket/experiments/1/run", &config)?;
//!
//! repo.log_artifact(Path::new("model.pkl"), Some("models")).await?;
//! for info in repo.list_artifacts(Some("models")).await? {
//!     println!("{} {:?}", info.path, info.file_size);
//! }
//! # Ok(())
//! # }
//! ```

pub mod bucket;
pub mod config;
pub mod credentials;
mod error;
pub mod factory;
pub mod path;
mod repository;
pub mod uri;

pub use bucket::{Bucket, ListedObject, ObjectListing, ObjectStoreBucket};
pub use config::OssConfig;
pub use credentials::{
    resolve_credentials,
    Credentials,
    CredentialsProvider,
    EcsRamRoleCredentials,
    StaticCredentials,
};
pub use error::{Error, Result};
pub use factory::{BucketFactory, OssBucketFactory};
pub use repository::{ArtifactRepository, FileInfo, OssArtifactRepository};
pub use uri::parse_oss_uri;
