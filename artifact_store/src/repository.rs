//! Artifact repository backed by Aliyun OSS.
//!
//! A repository is created once per run or experiment with an
//! `oss://bucket/key-prefix` URI. Every operation resolves the URI again and
//! derives object keys under the prefix; only the bucket handle is kept
//! between calls.

use std::{
    path::{Path, PathBuf},
    sync::{Arc, OnceLock},
};

use async_trait::async_trait;
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::{
    bucket::{Bucket, DELIMITER},
    config::OssConfig,
    factory::{BucketFactory, OssBucketFactory},
    path::{basename, join, join_opt, relative_to, to_artifact_path},
    uri::parse_oss_uri,
    Error,
    Result,
};

/// An entry returned by [`ArtifactRepository::list_artifacts`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileInfo {
    /// Path relative to the repository root, `/`-separated.
    pub path: String,
    pub is_dir: bool,
    /// Size in bytes; `None` for directories.
    pub file_size: Option<u64>,
}

impl FileInfo {
    pub fn file(path: String, size: u64) -> Self {
        Self {
            path,
            is_dir: false,
            file_size: Some(size),
        }
    }

    pub fn dir(path: String) -> Self {
        Self {
            path,
            is_dir: true,
            file_size: None,
        }
    }
}

/// Operations the tracking framework performs against an artifact store.
#[async_trait]
pub trait ArtifactRepository: Send + Sync {
    /// Upload a single local file into the repository, optionally under
    /// `artifact_path`.
    async fn log_artifact(&self, local_file: &Path, artifact_path: Option<&str>) -> Result<()>;

    /// Upload every file below `local_dir`, keeping its directory layout.
    async fn log_artifacts(&self, local_dir: &Path, artifact_path: Option<&str>) -> Result<()>;

    /// List files and directories directly under `path`, sorted by path.
    async fn list_artifacts(&self, path: Option<&str>) -> Result<Vec<FileInfo>>;

    /// Download the artifact at `remote_path` into `local_path`.
    async fn download_file(&self, remote_path: &str, local_path: &Path) -> Result<()>;

    async fn delete_artifacts(&self, artifact_path: Option<&str>) -> Result<()>;

    /// Download a file or a whole directory of artifacts below `dst_dir`,
    /// returning the local path that mirrors `artifact_path`.
    async fn download_artifacts(&self, artifact_path: &str, dst_dir: &Path) -> Result<PathBuf> {
        let artifact_path = artifact_path.trim_matches('/');
        let local_path = local_destination(dst_dir, artifact_path);
        let entries = self.list_artifacts(Some(artifact_path)).await?;
        if entries.is_empty() {
            if let Some(parent) = local_path.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
            self.download_file(artifact_path, &local_path).await?;
            return Ok(local_path);
        }

        tokio::fs::create_dir_all(&local_path).await?;
        let mut pending = entries;
        while let Some(entry) = pending.pop() {
            let target = local_destination(dst_dir, &entry.path);
            if entry.is_dir {
                tokio::fs::create_dir_all(&target).await?;
                pending.extend(self.list_artifacts(Some(&entry.path)).await?);
            } else {
                if let Some(parent) = target.parent() {
                    tokio::fs::create_dir_all(parent).await?;
                }
                self.download_file(&entry.path, &target).await?;
            }
        }
        Ok(local_path)
    }
}

fn local_destination(dst_dir: &Path, artifact_path: &str) -> PathBuf {
    artifact_path
        .split('/')
        .filter(|part| !part.is_empty() && *part != ".")
        .fold(dst_dir.to_path_buf(), |path, part| path.join(part))
}

/// Stores artifacts in an OSS bucket under the key prefix of its URI.
pub struct OssArtifactRepository {
    artifact_uri: String,
    experiment_id: Option<String>,
    run_id: Option<String>,
    factory: Option<Arc<dyn BucketFactory>>,
    bucket: OnceLock<Arc<dyn Bucket>>,
}

impl std::fmt::Debug for OssArtifactRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OssArtifactRepository")
            .field("artifact_uri", &self.artifact_uri)
            .field("experiment_id", &self.experiment_id)
            .field("run_id", &self.run_id)
            .field("bucket_initialized", &self.bucket.get().is_some())
            .finish()
    }
}

impl OssArtifactRepository {
    pub fn new(artifact_uri: &str, factory: Arc<dyn BucketFactory>) -> Self {
        Self::with_parts(artifact_uri, Some(factory), OnceLock::new())
    }

    fn with_parts(
        artifact_uri: &str,
        factory: Option<Arc<dyn BucketFactory>>,
        bucket: OnceLock<Arc<dyn Bucket>>,
    ) -> Self {
        Self {
            artifact_uri: artifact_uri.to_string(),
            experiment_id: None,
            run_id: None,
            factory,
            bucket,
        }
    }

    /// Resolve endpoint and credentials from `config`.
    ///
    /// Fails with [`Error::MissingEndpoint`] or [`Error::MissingCredentials`]
    /// when nothing usable is configured.
    pub fn from_config(artifact_uri: &str, config: &OssConfig) -> Result<Self> {
        let factory = OssBucketFactory::from_config(config)?;
        Ok(Self::new(artifact_uri, Arc::new(factory)))
    }

    /// Use an already constructed bucket handle.
    pub fn with_bucket(artifact_uri: &str, bucket: Arc<dyn Bucket>) -> Self {
        Self::with_parts(artifact_uri, None, OnceLock::from(bucket))
    }

    pub fn with_ids(mut self, experiment_id: Option<String>, run_id: Option<String>) -> Self {
        self.experiment_id = experiment_id;
        self.run_id = run_id;
        self
    }

    pub fn artifact_uri(&self) -> &str {
        &self.artifact_uri
    }

    pub fn experiment_id(&self) -> Option<&str> {
        self.experiment_id.as_deref()
    }

    pub fn run_id(&self) -> Option<&str> {
        self.run_id.as_deref()
    }

    /// Returns the bucket handle, building it on first use.
    ///
    /// The handle is kept for the lifetime of the repository: `bucket_name`
    /// is ignored once a handle exists.
    pub fn get_bucket(&self, bucket_name: &str) -> Result<Arc<dyn Bucket>> {
        if let Some(bucket) = self.bucket.get() {
            return Ok(bucket.clone());
        }
        let factory = self.factory.as_ref().ok_or(Error::MissingCredentials)?;
        let bucket = factory.build(bucket_name)?;
        Ok(self.bucket.get_or_init(|| bucket).clone())
    }

    fn resolve(&self) -> Result<(Arc<dyn Bucket>, String)> {
        let (bucket_name, key_prefix) = parse_oss_uri(&self.artifact_uri)?;
        let bucket = self.get_bucket(&bucket_name)?;
        Ok((bucket, key_prefix))
    }
}

fn verify_listed_object_contains_artifact_path_prefix(
    listed_object_path: &str,
    artifact_path: &str,
) -> Result<()> {
    if !listed_object_path.starts_with(artifact_path) {
        return Err(Error::ObjectPathMismatch {
            artifact_path: artifact_path.to_string(),
            object_path: listed_object_path.to_string(),
        });
    }
    Ok(())
}

#[async_trait]
impl ArtifactRepository for OssArtifactRepository {
    async fn log_artifact(&self, local_file: &Path, artifact_path: Option<&str>) -> Result<()> {
        let (bucket, key_prefix) = self.resolve()?;
        let dest = join_opt(&key_prefix, artifact_path);
        let key = join(&dest, &basename(local_file));
        bucket.put_object_from_file(&key, local_file).await
    }

    async fn log_artifacts(&self, local_dir: &Path, artifact_path: Option<&str>) -> Result<()> {
        let (bucket, key_prefix) = self.resolve()?;
        let dest = join_opt(&key_prefix, artifact_path);
        let local_dir = std::path::absolute(local_dir)?;
        let mut uploaded = 0usize;
        for entry in WalkDir::new(&local_dir) {
            let entry = entry?;
            // Symlinked files are uploaded through the link; linked
            // directories are not descended into.
            let is_file = entry.file_type().is_file()
                || (entry.path_is_symlink() && entry.path().is_file());
            if !is_file {
                continue;
            }
            let rel_dir = entry
                .path()
                .parent()
                .and_then(|parent| parent.strip_prefix(&local_dir).ok())
                .map(to_artifact_path)
                .unwrap_or_default();
            let upload_path = if rel_dir.is_empty() {
                dest.clone()
            } else {
                join(&dest, &rel_dir)
            };
            let key = join(&upload_path, &entry.file_name().to_string_lossy());
            bucket.put_object_from_file(&key, entry.path()).await?;
            uploaded += 1;
        }
        info!(
            local_dir = %local_dir.display(),
            dest = %dest,
            uploaded,
            "uploaded artifact directory"
        );
        Ok(())
    }

    async fn list_artifacts(&self, path: Option<&str>) -> Result<Vec<FileInfo>> {
        let (bucket, artifact_path) = self.resolve()?;
        let dest = join_opt(&artifact_path, path);
        let prefix = if dest.is_empty() {
            String::new()
        } else {
            format!("{dest}{DELIMITER}")
        };
        let listing = bucket.list_objects(&prefix, DELIMITER).await?;

        let mut infos = Vec::with_capacity(listing.objects.len() + listing.prefixes.len());
        for object in listing.objects {
            verify_listed_object_contains_artifact_path_prefix(&object.key, &artifact_path)?;
            infos.push(FileInfo::file(
                relative_to(&object.key, &artifact_path),
                object.size,
            ));
        }
        for subdir in listing.prefixes {
            verify_listed_object_contains_artifact_path_prefix(&subdir, &artifact_path)?;
            infos.push(FileInfo::dir(relative_to(&subdir, &artifact_path)));
        }
        infos.sort_by(|a, b| a.path.cmp(&b.path));
        debug!(%prefix, entries = infos.len(), "listed artifacts");
        Ok(infos)
    }

    async fn download_file(&self, remote_path: &str, local_path: &Path) -> Result<()> {
        let (bucket, key_prefix) = self.resolve()?;
        let key = join(&key_prefix, remote_path);
        bucket.get_object_to_file(&key, local_path).await
    }

    /// Deleting artifacts from OSS is not supported; always fails with
    /// [`Error::NotImplemented`].
    async fn delete_artifacts(&self, _artifact_path: Option<&str>) -> Result<()> {
        Err(Error::NotImplemented("Delete artifacts"))
    }
}

#[cfg(test)]
mod tests {
    use std::{
        collections::BTreeSet,
        sync::{
            atomic::{AtomicUsize, Ordering},
            Mutex,
        },
    };

    use object_store::memory::InMemory;

    use super::*;
    use crate::bucket::{ListedObject, ObjectListing, ObjectStoreBucket};

    /// Records uploads and serves a canned listing.
    #[derive(Default)]
    struct RecordingBucket {
        puts: Mutex<Vec<(String, PathBuf)>>,
        gets: Mutex<Vec<(String, PathBuf)>>,
        list_calls: Mutex<Vec<(String, String)>>,
        listing: ObjectListing,
        attempts: AtomicUsize,
        fail_after: Option<usize>,
    }

    impl RecordingBucket {
        fn with_listing(keys: &[(&str, u64)], prefixes: &[&str]) -> Self {
            Self {
                listing: ObjectListing {
                    objects: keys
                        .iter()
                        .map(|(key, size)| ListedObject {
                            key: key.to_string(),
                            size: *size,
                        })
                        .collect(),
                    prefixes: prefixes.iter().map(|p| p.to_string()).collect(),
                },
                ..Default::default()
            }
        }

        fn put_keys(&self) -> Vec<String> {
            self.puts
                .lock()
                .unwrap()
                .iter()
                .map(|(key, _)| key.clone())
                .collect()
        }
    }

    #[async_trait]
    impl Bucket for RecordingBucket {
        async fn put_object_from_file(&self, key: &str, local_file: &Path) -> Result<()> {
            let attempt = self.attempts.fetch_add(1, Ordering::SeqCst);
            if self.fail_after.is_some_and(|limit| attempt >= limit) {
                return Err(Error::Storage(object_store::Error::Generic {
                    store: "test",
                    source: "injected failure".into(),
                }));
            }
            self.puts
                .lock()
                .unwrap()
                .push((key.to_string(), local_file.to_path_buf()));
            Ok(())
        }

        async fn get_object_to_file(&self, key: &str, local_file: &Path) -> Result<()> {
            self.gets
                .lock()
                .unwrap()
                .push((key.to_string(), local_file.to_path_buf()));
            Ok(())
        }

        async fn list_objects(&self, prefix: &str, delimiter: &str) -> Result<ObjectListing> {
            self.list_calls
                .lock()
                .unwrap()
                .push((prefix.to_string(), delimiter.to_string()));
            Ok(self.listing.clone())
        }
    }

    fn recording_repo(uri: &str, bucket: RecordingBucket) -> (OssArtifactRepository, Arc<RecordingBucket>) {
        let bucket = Arc::new(bucket);
        let repo = OssArtifactRepository::with_bucket(uri, bucket.clone());
        (repo, bucket)
    }

    fn memory_repo(uri: &str) -> OssArtifactRepository {
        let store = Arc::new(InMemory::new());
        OssArtifactRepository::with_bucket(uri, Arc::new(ObjectStoreBucket::new("mybucket", store)))
    }

    #[tokio::test]
    async fn test_log_artifact_keys() -> Result<()> {
        let temp_dir = tempfile::tempdir()?;
        let file = temp_dir.path().join("model.pkl");
        std::fs::write(&file, b"weights")?;

        let (repo, bucket) = recording_repo("oss://mybucket/exp/run", RecordingBucket::default());
        repo.log_artifact(&file, None).await?;
        repo.log_artifact(&file, Some("")).await?;
        repo.log_artifact(&file, Some("models/v1")).await?;

        assert_eq!(
            bucket.put_keys(),
            vec![
                "exp/run/model.pkl",
                "exp/run/model.pkl",
                "exp/run/models/v1/model.pkl",
            ]
        );
        assert_eq!(bucket.puts.lock().unwrap()[0].1, file);
        Ok(())
    }

    #[tokio::test]
    async fn test_log_artifact_bucket_root() -> Result<()> {
        let temp_dir = tempfile::tempdir()?;
        let file = temp_dir.path().join("a.txt");
        std::fs::write(&file, b"a")?;

        let (repo, bucket) = recording_repo("oss://mybucket", RecordingBucket::default());
        repo.log_artifact(&file, None).await?;

        assert_eq!(bucket.put_keys(), vec!["a.txt"]);
        Ok(())
    }

    #[tokio::test]
    async fn test_log_artifacts_tree() -> Result<()> {
        let temp_dir = tempfile::tempdir()?;
        let root = temp_dir.path().join("root");
        std::fs::create_dir_all(root.join("sub").join("deeper"))?;
        std::fs::write(root.join("f1.txt"), b"1")?;
        std::fs::write(root.join("sub").join("f2.txt"), b"2")?;
        std::fs::write(root.join("sub").join("deeper").join("f3.txt"), b"3")?;

        let (repo, bucket) = recording_repo("oss://mybucket/run", RecordingBucket::default());
        repo.log_artifacts(&root, None).await?;

        let keys: BTreeSet<String> = bucket.put_keys().into_iter().collect();
        let expected: BTreeSet<String> = ["run/f1.txt", "run/sub/f2.txt", "run/sub/deeper/f3.txt"]
            .into_iter()
            .map(String::from)
            .collect();
        assert_eq!(keys, expected);
        Ok(())
    }

    #[tokio::test]
    async fn test_log_artifacts_with_artifact_path() -> Result<()> {
        let temp_dir = tempfile::tempdir()?;
        std::fs::create_dir_all(temp_dir.path().join("sub"))?;
        std::fs::write(temp_dir.path().join("f1.txt"), b"1")?;
        std::fs::write(temp_dir.path().join("sub").join("f2.txt"), b"2")?;

        let (repo, bucket) = recording_repo("oss://mybucket/run", RecordingBucket::default());
        repo.log_artifacts(temp_dir.path(), Some("outputs")).await?;

        let keys: BTreeSet<String> = bucket.put_keys().into_iter().collect();
        assert!(keys.contains("run/outputs/f1.txt"));
        assert!(keys.contains("run/outputs/sub/f2.txt"));
        assert_eq!(keys.len(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn test_log_artifacts_stops_at_first_failure() -> Result<()> {
        let temp_dir = tempfile::tempdir()?;
        std::fs::create_dir_all(temp_dir.path().join("sub"))?;
        for name in ["a.txt", "b.txt", "c.txt", "sub/d.txt"] {
            std::fs::write(temp_dir.path().join(name), name.as_bytes())?;
        }

        let bucket = RecordingBucket {
            fail_after: Some(1),
            ..Default::default()
        };
        let (repo, bucket) = recording_repo("oss://mybucket/run", bucket);
        let err = repo.log_artifacts(temp_dir.path(), None).await.unwrap_err();

        assert!(matches!(err, Error::Storage(_)));
        // One upload succeeded, the second failed and nothing was tried after it.
        assert_eq!(bucket.put_keys().len(), 1);
        assert_eq!(bucket.attempts.load(Ordering::SeqCst), 2);
        Ok(())
    }

    #[tokio::test]
    async fn test_log_artifacts_first_put_failure_uploads_nothing() -> Result<()> {
        let temp_dir = tempfile::tempdir()?;
        for name in ["a.txt", "b.txt", "c.txt"] {
            std::fs::write(temp_dir.path().join(name), name.as_bytes())?;
        }

        let bucket = RecordingBucket {
            fail_after: Some(0),
            ..Default::default()
        };
        let (repo, bucket) = recording_repo("oss://mybucket/run", bucket);
        assert!(repo.log_artifacts(temp_dir.path(), None).await.is_err());

        assert!(bucket.put_keys().is_empty());
        assert_eq!(bucket.attempts.load(Ordering::SeqCst), 1);
        Ok(())
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_log_artifacts_uploads_symlinked_files() -> Result<()> {
        let blobs = tempfile::tempdir()?;
        std::fs::write(blobs.path().join("weights"), b"w")?;
        std::fs::create_dir_all(blobs.path().join("linked_dir"))?;
        std::fs::write(blobs.path().join("linked_dir").join("inner.txt"), b"i")?;

        let root = tempfile::tempdir()?;
        std::fs::write(root.path().join("config.json"), b"{}")?;
        std::os::unix::fs::symlink(blobs.path().join("weights"), root.path().join("model.bin"))?;
        std::os::unix::fs::symlink(blobs.path().join("linked_dir"), root.path().join("dir_link"))?;

        let (repo, bucket) = recording_repo("oss://mybucket/run", RecordingBucket::default());
        repo.log_artifacts(root.path(), None).await?;

        let keys: BTreeSet<String> = bucket.put_keys().into_iter().collect();
        let expected: BTreeSet<String> = ["run/config.json", "run/model.bin"]
            .into_iter()
            .map(String::from)
            .collect();
        assert_eq!(keys, expected);
        Ok(())
    }

    #[tokio::test]
    async fn test_list_artifacts() -> Result<()> {
        let (repo, bucket) = recording_repo(
            "oss://mybucket/run",
            RecordingBucket::with_listing(&[("run/b.txt", 2), ("run/a.txt", 1)], &["run/sub/"]),
        );

        let infos = repo.list_artifacts(None).await?;

        assert_eq!(
            infos,
            vec![
                FileInfo::file("a.txt".to_string(), 1),
                FileInfo::file("b.txt".to_string(), 2),
                FileInfo::dir("sub".to_string()),
            ]
        );
        assert_eq!(
            *bucket.list_calls.lock().unwrap(),
            vec![("run/".to_string(), "/".to_string())]
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_list_artifacts_sub_path_is_relative_to_root() -> Result<()> {
        let (repo, bucket) = recording_repo(
            "oss://mybucket/run",
            RecordingBucket::with_listing(&[("run/sub/c.txt", 3)], &["run/sub/nested/"]),
        );

        let infos = repo.list_artifacts(Some("sub")).await?;

        assert_eq!(
            infos,
            vec![
                FileInfo::file("sub/c.txt".to_string(), 3),
                FileInfo::dir("sub/nested".to_string()),
            ]
        );
        assert_eq!(bucket.list_calls.lock().unwrap()[0].0, "run/sub/");
        Ok(())
    }

    #[tokio::test]
    async fn test_list_artifacts_bucket_root_uses_empty_prefix() -> Result<()> {
        let (repo, bucket) = recording_repo(
            "oss://mybucket",
            RecordingBucket::with_listing(&[("top.txt", 5)], &["run/"]),
        );

        let infos = repo.list_artifacts(None).await?;

        assert_eq!(
            infos,
            vec![
                FileInfo::dir("run".to_string()),
                FileInfo::file("top.txt".to_string(), 5),
            ]
        );
        assert_eq!(bucket.list_calls.lock().unwrap()[0].0, "");
        Ok(())
    }

    #[tokio::test]
    async fn test_list_artifacts_object_path_mismatch() {
        let (repo, _) = recording_repo(
            "oss://mybucket/run",
            RecordingBucket::with_listing(&[("other/a.txt", 1)], &[]),
        );
        let err = repo.list_artifacts(None).await.unwrap_err();
        assert!(matches!(err, Error::ObjectPathMismatch { .. }));

        let (repo, _) = recording_repo(
            "oss://mybucket/run",
            RecordingBucket::with_listing(&[], &["other/sub/"]),
        );
        let err = repo.list_artifacts(None).await.unwrap_err();
        assert!(matches!(err, Error::ObjectPathMismatch { .. }));
    }

    #[tokio::test]
    async fn test_list_artifacts_keeps_overlapping_entries() -> Result<()> {
        let (repo, _) = recording_repo(
            "oss://mybucket/run",
            RecordingBucket::with_listing(&[("run/x", 1)], &["run/x/"]),
        );
        let infos = repo.list_artifacts(None).await?;
        assert_eq!(infos.len(), 2);
        assert!(infos.iter().all(|info| info.path == "x"));
        Ok(())
    }

    #[tokio::test]
    async fn test_download_file_key() -> Result<()> {
        let (repo, bucket) = recording_repo("oss://mybucket/run", RecordingBucket::default());
        let dst = PathBuf::from("/tmp/out.txt");
        repo.download_file("sub/a.txt", &dst).await?;
        assert_eq!(
            *bucket.gets.lock().unwrap(),
            vec![("run/sub/a.txt".to_string(), dst)]
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_download_missing_file() -> Result<()> {
        let temp_dir = tempfile::tempdir()?;
        let repo = memory_repo("oss://mybucket/run");
        let err = repo
            .download_file("missing.txt", &temp_dir.path().join("missing.txt"))
            .await
            .unwrap_err();
        assert!(err.is_not_found());
        Ok(())
    }

    #[tokio::test]
    async fn test_delete_artifacts_not_implemented() {
        let (repo, _) = recording_repo("oss://mybucket/run", RecordingBucket::default());
        for path in [None, Some(""), Some("sub")] {
            let err = repo.delete_artifacts(path).await.unwrap_err();
            assert!(matches!(err, Error::NotImplemented(_)));
        }
    }

    #[test]
    fn test_get_bucket_is_memoized() -> Result<()> {
        let builds = Arc::new(AtomicUsize::new(0));
        let counter = builds.clone();
        let factory = move |name: &str| {
            counter.fetch_add(1, Ordering::SeqCst);
            let store = Arc::new(InMemory::new());
            Ok::<Arc<dyn Bucket>, Error>(Arc::new(ObjectStoreBucket::new(name, store)))
        };
        let repo = OssArtifactRepository::new("oss://mybucket/run", Arc::new(factory));

        let first = repo.get_bucket("mybucket")?;
        let second = repo.get_bucket("another-bucket")?;

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(builds.load(Ordering::SeqCst), 1);
        Ok(())
    }

    #[test]
    fn test_with_bucket_returns_preset_handle() -> Result<()> {
        let preset: Arc<dyn Bucket> = Arc::new(RecordingBucket::default());
        let repo = OssArtifactRepository::with_bucket("oss://mybucket/run", preset.clone());

        assert!(Arc::ptr_eq(&repo.get_bucket("mybucket")?, &preset));
        assert!(Arc::ptr_eq(&repo.get_bucket("other")?, &preset));
        Ok(())
    }

    #[tokio::test]
    async fn test_invalid_scheme_fails_every_operation() {
        let (repo, _) = recording_repo("s3://mybucket/run", RecordingBucket::default());
        let err = repo.list_artifacts(None).await.unwrap_err();
        assert!(matches!(err, Error::InvalidUriScheme { .. }));
        let err = repo
            .download_file("a.txt", Path::new("/tmp/a.txt"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidUriScheme { .. }));
    }

    #[test]
    fn test_from_config_missing_credentials() {
        let config = OssConfig {
            endpoint_url: Some("https://oss-cn-hangzhou.aliyuncs.com".to_string()),
            ..Default::default()
        };
        let err = OssArtifactRepository::from_config("oss://mybucket/run", &config).unwrap_err();
        assert!(matches!(err, Error::MissingCredentials));
    }

    #[test]
    fn test_with_ids() {
        let (repo, _) = recording_repo("oss://mybucket/run", RecordingBucket::default());
        let repo = repo.with_ids(Some("1".to_string()), Some("abc".to_string()));
        assert_eq!(repo.experiment_id(), Some("1"));
        assert_eq!(repo.run_id(), Some("abc"));
        assert_eq!(repo.artifact_uri(), "oss://mybucket/run");
    }

    #[tokio::test]
    async fn test_upload_list_download_round_trip() -> Result<()> {
        let src = tempfile::tempdir()?;
        std::fs::create_dir_all(src.path().join("sub"))?;
        std::fs::write(src.path().join("f1.txt"), b"one")?;
        std::fs::write(src.path().join("sub").join("f2.txt"), b"two!")?;

        let repo = memory_repo("oss://mybucket/exp/run");
        repo.log_artifacts(src.path(), None).await?;

        let infos = repo.list_artifacts(None).await?;
        assert_eq!(
            infos,
            vec![
                FileInfo::file("f1.txt".to_string(), 3),
                FileInfo::dir("sub".to_string()),
            ]
        );
        let nested = repo.list_artifacts(Some("sub")).await?;
        assert_eq!(nested, vec![FileInfo::file("sub/f2.txt".to_string(), 4)]);

        let dst = tempfile::tempdir()?;
        let local = repo.download_artifacts("sub", dst.path()).await?;
        assert_eq!(local, dst.path().join("sub"));
        assert_eq!(std::fs::read(dst.path().join("sub").join("f2.txt"))?, b"two!");

        let local = repo.download_artifacts("f1.txt", dst.path()).await?;
        assert_eq!(std::fs::read(local)?, b"one");
        Ok(())
    }

    #[tokio::test]
    async fn test_download_artifacts_whole_root() -> Result<()> {
        let src = tempfile::tempdir()?;
        std::fs::create_dir_all(src.path().join("a").join("b"))?;
        std::fs::write(src.path().join("top.txt"), b"t")?;
        std::fs::write(src.path().join("a").join("b").join("leaf.txt"), b"l")?;

        let repo = memory_repo("oss://mybucket/run");
        repo.log_artifacts(src.path(), None).await?;

        let dst = tempfile::tempdir()?;
        let local = repo.download_artifacts("", dst.path()).await?;
        assert_eq!(local, dst.path());
        assert_eq!(std::fs::read(dst.path().join("top.txt"))?, b"t");
        assert_eq!(
            std::fs::read(dst.path().join("a").join("b").join("leaf.txt"))?,
            b"l"
        );
        Ok(())
    }
}
