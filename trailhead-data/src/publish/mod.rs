//! Packaging and publishing of finished snapshots.
//!
//! A snapshot is gzip-compressed next to itself, read back and uploaded to
//! durable storage under a key namespaced by schema version and tenant. Both
//! local files are removed only after the upload succeeds; on failure they
//! stay behind for a retry.

mod compress;
mod s3;

use std::sync::Arc;

use async_trait::async_trait;
use camino::{Utf8Path, Utf8PathBuf};
use log::{info, warn};
use thiserror::Error;
use trailhead_core::SCHEMA_VERSION;

pub use compress::{compressed_path, gzip_file, read_file};
pub use s3::{DEFAULT_REGION, S3ArtifactStore, S3StoreConfig};

/// Content type of uploaded snapshots.
pub const CONTENT_TYPE: &str = "application/octet-stream";

/// Content encoding of uploaded snapshots.
pub const CONTENT_ENCODING: &str = "gzip";

/// Local file name of a tenant's uncompressed snapshot.
#[must_use]
pub fn snapshot_file_name(tenant_id: i64) -> String {
    format!("tenant_{tenant_id}_features.db")
}

/// Storage key of a tenant's compressed snapshot.
///
/// # Examples
///
/// ```
/// use trailhead_data::publish::artifact_key;
///
/// assert_eq!(artifact_key(7), "exports/1.0.3/tenant_7_features.db.gz");
/// ```
#[must_use]
pub fn artifact_key(tenant_id: i64) -> String {
    format!("exports/{SCHEMA_VERSION}/{}.gz", snapshot_file_name(tenant_id))
}

/// One object to upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    /// Object key, see [`artifact_key`].
    pub key: String,
    /// Gzip-compressed snapshot bytes.
    pub body: Vec<u8>,
    /// MIME type recorded on the object.
    pub content_type: &'static str,
    /// Content encoding recorded on the object.
    pub content_encoding: &'static str,
}

/// Errors raised by an [`ArtifactStore`].
#[derive(Debug, Error)]
pub enum StoreError {
    /// The storage backend rejected or failed the request.
    #[error("{operation} failed: {message}")]
    Backend {
        operation: &'static str,
        message: String,
    },
}

/// Durable destination for compressed snapshots.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Store `artifact`, replacing any object at the same key.
    async fn put(&self, artifact: Artifact) -> Result<(), StoreError>;
}

/// Errors raised while packaging or uploading a snapshot.
#[derive(Debug, Error)]
pub enum PublishError {
    /// Compressing the snapshot failed.
    #[error("failed to compress {path}")]
    Compress {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// Reading the compressed artefact back failed.
    #[error("failed to read {path}")]
    Read {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// The upload failed; local files were kept.
    #[error("failed to upload {key}")]
    Upload {
        key: String,
        #[source]
        source: StoreError,
    },
    /// The blocking compression task did not complete.
    #[error("compression task failed")]
    Task {
        #[source]
        source: tokio::task::JoinError,
    },
}

/// Result of a successful publish.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishedArtifact {
    /// Storage key written.
    pub key: String,
    /// Uncompressed snapshot size.
    pub snapshot_bytes: u64,
    /// Uploaded size.
    pub compressed_bytes: usize,
}

/// Compresses, uploads and cleans up snapshots.
#[derive(Clone)]
pub struct Publisher {
    store: Arc<dyn ArtifactStore>,
}

impl std::fmt::Debug for Publisher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Publisher")
            .field("store", &"<dyn ArtifactStore>")
            .finish()
    }
}

impl Publisher {
    /// Publish through `store`.
    #[must_use]
    pub fn new(store: Arc<dyn ArtifactStore>) -> Self {
        Self { store }
    }

    /// Publish the finished snapshot at `snapshot` for `tenant_id`.
    ///
    /// # Errors
    ///
    /// Returns [`PublishError`] when compression, reading or the upload fails.
    /// Local files are left in place in every error case.
    pub async fn publish(
        &self,
        tenant_id: i64,
        snapshot: &Utf8Path,
    ) -> Result<PublishedArtifact, PublishError> {
        let compressed = compressed_path(snapshot);
        info!("{tenant_id}: compressing snapshot");
        let (snapshot_bytes, body) = {
            let source = snapshot.to_path_buf();
            let target = compressed.clone();
            tokio::task::spawn_blocking(move || package(&source, &target))
                .await
                .map_err(|source| PublishError::Task { source })??
        };

        let key = artifact_key(tenant_id);
        let compressed_bytes = body.len();
        info!("{tenant_id}: uploading {compressed_bytes} bytes to {key}");
        self.store
            .put(Artifact {
                key: key.clone(),
                body,
                content_type: CONTENT_TYPE,
                content_encoding: CONTENT_ENCODING,
            })
            .await
            .map_err(|source| PublishError::Upload {
                key: key.clone(),
                source,
            })?;
        info!("{tenant_id}: upload completed");

        for path in [snapshot, compressed.as_path()] {
            if let Err(err) = trailhead_fs::remove_file_if_exists(path) {
                warn!("{tenant_id}: failed to remove {path}: {err}");
            }
        }

        Ok(PublishedArtifact {
            key,
            snapshot_bytes,
            compressed_bytes,
        })
    }
}

/// Compress `source` into `target`, then read `target` back.
fn package(source: &Utf8Path, target: &Utf8Path) -> Result<(u64, Vec<u8>), PublishError> {
    let copied = gzip_file(source, target).map_err(|err| PublishError::Compress {
        path: source.to_path_buf(),
        source: err,
    })?;
    let body = read_file(target).map_err(|err| PublishError::Read {
        path: target.to_path_buf(),
        source: err,
    })?;
    Ok((copied, body))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::MemoryArtifactStore;
    use rstest::{fixture, rstest};
    use std::io::Write;
    use tempfile::TempDir;

    #[fixture]
    fn snapshot() -> (TempDir, Utf8PathBuf) {
        let dir = TempDir::new().expect("create temp dir");
        let path = Utf8PathBuf::from_path_buf(dir.path().join(snapshot_file_name(3)))
            .expect("utf-8 path");
        trailhead_fs::create_utf8_file(&path)
            .and_then(|mut file| file.write_all(b"SQLite format 3\0"))
            .expect("write snapshot");
        (dir, path)
    }

    #[rstest]
    fn key_is_namespaced_by_version_and_tenant() {
        assert_eq!(
            artifact_key(12),
            format!("exports/{SCHEMA_VERSION}/tenant_12_features.db.gz")
        );
    }

    #[rstest]
    fn key_has_no_format_segment_before_the_version() {
        assert_eq!(artifact_key(7), "exports/1.0.3/tenant_7_features.db.gz");
        assert!(!artifact_key(7).contains("sqlite"));
    }

    #[rstest]
    #[tokio::test]
    async fn successful_upload_removes_local_files(snapshot: (TempDir, Utf8PathBuf)) {
        let (_guard, path) = snapshot;
        let store = Arc::new(MemoryArtifactStore::default());
        let publisher = Publisher::new(Arc::clone(&store) as Arc<dyn ArtifactStore>);

        let published = publisher.publish(3, &path).await.expect("publish");

        assert_eq!(published.key, artifact_key(3));
        assert_eq!(published.snapshot_bytes, 16);
        assert!(!path.exists());
        assert!(!compressed_path(&path).exists());
        let uploads = store.uploads();
        assert_eq!(uploads.len(), 1);
        assert_eq!(uploads[0].content_type, "application/octet-stream");
        assert_eq!(uploads[0].content_encoding, "gzip");
        assert_eq!(uploads[0].body.len(), published.compressed_bytes);
    }

    #[rstest]
    #[tokio::test]
    async fn failed_upload_keeps_local_files(snapshot: (TempDir, Utf8PathBuf)) {
        let (_guard, path) = snapshot;
        let store = Arc::new(MemoryArtifactStore::failing());
        let publisher = Publisher::new(Arc::clone(&store) as Arc<dyn ArtifactStore>);

        let err = publisher.publish(3, &path).await.expect_err("upload fails");

        assert!(matches!(err, PublishError::Upload { .. }));
        assert!(path.exists());
        assert!(compressed_path(&path).exists());
        assert!(store.uploads().is_empty());
    }

    #[rstest]
    #[tokio::test]
    async fn missing_snapshot_fails_before_upload() {
        let dir = TempDir::new().expect("create temp dir");
        let path = Utf8PathBuf::from_path_buf(dir.path().join("absent.db")).expect("utf-8 path");
        let store = Arc::new(MemoryArtifactStore::default());
        let publisher = Publisher::new(Arc::clone(&store) as Arc<dyn ArtifactStore>);

        let err = publisher.publish(3, &path).await.expect_err("nothing to compress");

        assert!(matches!(err, PublishError::Compress { .. }));
        assert!(store.uploads().is_empty());
    }
}
