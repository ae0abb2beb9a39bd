//! Profile-scoped cache file
//!
//! One JSON document per profile under the cache directory. Saves go through
//! a temp file and a rename so readers never see a torn write.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use sha2::{Digest, Sha256};
use thiserror::Error;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, error, info, warn};

use super::builder::{build_document, BuildReport, BuildRequest, BuildError};
use super::mirror::DocumentMirror;
use super::models::{BuildStatus, CacheDocument};
use super::source::InventorySource;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cache serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// File name of a profile's cache
///
/// Names that needed sanitizing carry a digest of the raw name, so `a.b`
/// and `a_b` never share a file.
pub fn cache_file_name(profile: &str) -> String {
    let safe: String = profile
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    if safe == profile {
        return format!("opsi_cache_{}.json", safe);
    }
    let digest = Sha256::digest(profile.as_bytes());
    let tag: String = digest[..4].iter().map(|b| format!("{:02x}", b)).collect();
    format!("opsi_cache_{}_{}.json", safe, tag)
}

/// Read a document; `None` when the file is absent or unparseable
pub async fn read_document(path: &Path, profile: &str) -> Option<CacheDocument> {
    let bytes = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Failed to read cache file");
            return None;
        }
    };

    match serde_json::from_slice::<CacheDocument>(&bytes) {
        Ok(doc) => Some(doc),
        Err(e) => {
            warn!(path = %path.display(), profile, error = %e, "Cache file is not a valid document");
            None
        }
    }
}

fn io_err(path: &Path) -> impl FnOnce(std::io::Error) -> CacheError {
    let path = path.to_path_buf();
    move |source| CacheError::Io { path, source }
}

/// In-memory view of one profile's cache file
pub struct InventoryCache {
    profile: String,
    path: PathBuf,
    document: RwLock<Arc<CacheDocument>>,
    build_lock: Mutex<()>,
    mirror: Option<Arc<dyn DocumentMirror>>,
}

impl InventoryCache {
    /// Open the cache for `profile`, loading whatever is on disk
    pub async fn open(profile: &str, directory: &Path, mirror: Option<Arc<dyn DocumentMirror>>) -> Self {
        let cache = Self {
            profile: profile.to_string(),
            path: directory.join(cache_file_name(profile)),
            document: RwLock::new(Arc::new(CacheDocument::empty(profile))),
            build_lock: Mutex::new(()),
            mirror,
        };
        cache.load().await;
        cache
    }

    pub fn profile(&self) -> &str {
        &self.profile
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Re-read the document from disk (or the mirror) and make it current
    pub async fn load(&self) -> Arc<CacheDocument> {
        let mut doc = read_document(&self.path, &self.profile).await;

        if doc.is_none() && !self.path.exists() {
            if let Some(mirror) = &self.mirror {
                match mirror.fetch(&self.profile).await {
                    Ok(Some(payload)) => match serde_json::from_str::<CacheDocument>(&payload) {
                        Ok(mirrored) => {
                            info!(profile = %self.profile, "Loaded cache document from Redis mirror");
                            doc = Some(mirrored);
                        }
                        Err(e) => warn!(profile = %self.profile, error = %e, "Mirrored cache document is invalid"),
                    },
                    Ok(None) => {}
                    Err(e) => warn!(profile = %self.profile, error = %e, "Failed to read cache mirror"),
                }
            }
        }

        let doc = Arc::new(doc.unwrap_or_else(|| CacheDocument::empty(&self.profile)));
        debug!(
            profile = %self.profile,
            databases = doc.databases.len(),
            hosts = doc.hosts.len(),
            "Cache loaded"
        );
        *self.document.write().await = doc.clone();
        doc
    }

    /// Current snapshot
    pub async fn snapshot(&self) -> Arc<CacheDocument> {
        self.document.read().await.clone()
    }

    /// True when the current document is younger than `max_age_hours`
    pub async fn is_valid(&self, max_age_hours: u64) -> bool {
        self.snapshot().await.is_fresh_at(max_age_hours, Utc::now())
    }

    /// Persist `doc` atomically
    pub async fn try_save(&self, doc: &CacheDocument) -> Result<(), CacheError> {
        let payload = serde_json::to_string_pretty(doc)?;

        if let Some(dir) = self.path.parent() {
            tokio::fs::create_dir_all(dir).await.map_err(io_err(dir))?;
        }

        let tmp = self.path.with_extension(format!("json.{}.tmp", uuid::Uuid::new_v4().simple()));
        tokio::fs::write(&tmp, payload.as_bytes()).await.map_err(io_err(&tmp))?;
        if let Err(e) = tokio::fs::rename(&tmp, &self.path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(CacheError::Io {
                path: self.path.clone(),
                source: e,
            });
        }

        if let Some(mirror) = &self.mirror {
            if let Err(e) = mirror.publish(&self.profile, &payload).await {
                warn!(profile = %self.profile, error = %e, "Failed to publish cache to Redis mirror");
            }
        }

        debug!(path = %self.path.display(), bytes = payload.len(), "Cache saved");
        Ok(())
    }

    /// Persist `doc` and make it current. Failures are logged, not raised.
    pub async fn save(&self, doc: CacheDocument) -> bool {
        match self.try_save(&doc).await {
            Ok(()) => {
                *self.document.write().await = Arc::new(doc);
                true
            }
            Err(e) => {
                error!(profile = %self.profile, error = %e, "Failed to save cache");
                false
            }
        }
    }

    /// Rebuild from `source`. Concurrent rebuilds of this profile queue up.
    ///
    /// A failed build leaves the previous document in place.
    pub async fn rebuild(
        &self,
        source: &dyn InventorySource,
        request: &BuildRequest,
        max_concurrency: usize,
    ) -> BuildReport {
        let _guard = self.build_lock.lock().await;

        let (doc, mut report) = build_document(source, &self.profile, request, max_concurrency).await;

        if report.status == BuildStatus::Failed {
            warn!(profile = %self.profile, "Inventory build failed, keeping previous cache");
        } else if let Err(e) = self.try_save(&doc).await {
            report.errors.push(BuildError {
                step: "save".to_string(),
                scope: self.path.display().to_string(),
                message: e.to_string(),
            });
            report.status = BuildStatus::Partial;
            *self.document.write().await = Arc::new(doc);
        } else {
            report.saved = true;
            *self.document.write().await = Arc::new(doc);
        }

        crate::metrics::record_cache_build(
            &self.profile,
            report.status.as_str(),
            Duration::from_secs_f64(report.duration_seconds),
            report.databases,
            report.hosts,
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::builder::fake::FakeSource;
    use crate::cache::models::fixtures::abc_document;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_cache_file_name() {
        assert_eq!(cache_file_name("DEFAULT"), "opsi_cache_DEFAULT.json");
        assert_eq!(cache_file_name("prod_eu-1"), "opsi_cache_prod_eu-1.json");

        let evil = cache_file_name("../evil");
        assert!(evil.starts_with("opsi_cache____evil_"));
        assert!(evil.ends_with(".json"));
        assert!(!evil.contains('/'));
    }

    #[test]
    fn test_sanitized_names_do_not_collide() {
        assert_eq!(cache_file_name("a_b"), "opsi_cache_a_b.json");
        assert_ne!(cache_file_name("a.b"), cache_file_name("a_b"));
        assert_ne!(cache_file_name("a.b"), cache_file_name("a b"));
        assert_eq!(cache_file_name("a.b"), cache_file_name("a.b"));
    }

    /// In-memory stand-in for the Redis mirror
    #[derive(Default)]
    struct MemoryMirror {
        documents: std::sync::Mutex<std::collections::HashMap<String, String>>,
        fail: bool,
    }

    #[async_trait::async_trait]
    impl DocumentMirror for MemoryMirror {
        async fn publish(&self, profile: &str, payload: &str) -> anyhow::Result<()> {
            if self.fail {
                anyhow::bail!("mirror offline");
            }
            self.documents.lock().unwrap().insert(profile.to_string(), payload.to_string());
            Ok(())
        }

        async fn fetch(&self, profile: &str) -> anyhow::Result<Option<String>> {
            if self.fail {
                anyhow::bail!("mirror offline");
            }
            Ok(self.documents.lock().unwrap().get(profile).cloned())
        }
    }

    #[tokio::test]
    async fn test_missing_file_falls_back_to_mirror() {
        let mirror = Arc::new(MemoryMirror::default());
        let doc = abc_document();
        mirror
            .documents
            .lock()
            .unwrap()
            .insert("DEFAULT".to_string(), serde_json::to_string(&doc).unwrap());

        let dir = tempfile::tempdir().unwrap();
        let cache = InventoryCache::open("DEFAULT", dir.path(), Some(mirror.clone() as Arc<dyn DocumentMirror>)).await;
        assert_eq!(*cache.snapshot().await, doc);

        // Another profile has nothing mirrored
        let other = InventoryCache::open("prod", dir.path(), Some(mirror as Arc<dyn DocumentMirror>)).await;
        assert!(other.snapshot().await.is_empty());
    }

    #[tokio::test]
    async fn test_file_wins_over_mirror_and_saves_publish() {
        let mirror = Arc::new(MemoryMirror::default());
        mirror
            .documents
            .lock()
            .unwrap()
            .insert("DEFAULT".to_string(), serde_json::to_string(&CacheDocument::empty("DEFAULT")).unwrap());

        let dir = tempfile::tempdir().unwrap();
        let writer = InventoryCache::open("DEFAULT", dir.path(), Some(mirror.clone() as Arc<dyn DocumentMirror>)).await;
        let doc = abc_document();
        assert!(writer.save(doc.clone()).await);

        let published = mirror.documents.lock().unwrap().get("DEFAULT").cloned().unwrap();
        assert_eq!(serde_json::from_str::<CacheDocument>(&published).unwrap(), doc);

        mirror
            .documents
            .lock()
            .unwrap()
            .insert("DEFAULT".to_string(), serde_json::to_string(&CacheDocument::empty("DEFAULT")).unwrap());
        let reader = InventoryCache::open("DEFAULT", dir.path(), Some(mirror as Arc<dyn DocumentMirror>)).await;
        assert_eq!(*reader.snapshot().await, doc);
    }

    #[tokio::test]
    async fn test_unreachable_mirror_loads_empty_and_still_saves() {
        let mirror = Arc::new(MemoryMirror { fail: true, ..MemoryMirror::default() });
        let dir = tempfile::tempdir().unwrap();

        let cache = InventoryCache::open("DEFAULT", dir.path(), Some(mirror as Arc<dyn DocumentMirror>)).await;
        assert!(cache.snapshot().await.is_empty());
        assert!(cache.save(abc_document()).await);
        assert!(cache.path().exists());
    }

    #[tokio::test]
    async fn test_missing_file_loads_empty_document() {
        let dir = tempfile::tempdir().unwrap();
        let cache = InventoryCache::open("DEFAULT", dir.path(), None).await;

        let doc = cache.snapshot().await;
        assert!(doc.is_empty());
        assert_eq!(doc.metadata.profile, "DEFAULT");
        assert!(!cache.is_valid(24).await);
    }

    #[tokio::test]
    async fn test_corrupt_file_loads_empty_document() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(cache_file_name("DEFAULT")), b"{not json").unwrap();

        let cache = InventoryCache::open("DEFAULT", dir.path(), None).await;
        assert!(cache.snapshot().await.is_empty());
    }

    #[tokio::test]
    async fn test_save_then_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let cache = InventoryCache::open("DEFAULT", dir.path(), None).await;

        let mut doc = abc_document();
        doc.metadata.last_updated = Some(Utc::now().to_rfc3339());
        assert!(cache.save(doc.clone()).await);

        let reopened = InventoryCache::open("DEFAULT", dir.path(), None).await;
        assert_eq!(*reopened.snapshot().await, doc);
        assert!(reopened.is_valid(24).await);

        // No temp files left behind
        let entries: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[tokio::test]
    async fn test_stale_document_is_invalid() {
        let dir = tempfile::tempdir().unwrap();
        let cache = InventoryCache::open("DEFAULT", dir.path(), None).await;

        let mut doc = abc_document();
        doc.metadata.last_updated = Some((Utc::now() - chrono::Duration::hours(30)).to_rfc3339());
        assert!(cache.save(doc).await);

        assert!(!cache.is_valid(24).await);
        assert!(cache.is_valid(48).await);
    }

    #[tokio::test]
    async fn test_save_failure_reports_false() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("not-a-dir");
        std::fs::write(&blocker, b"x").unwrap();

        let cache = InventoryCache::open("DEFAULT", &blocker, None).await;
        assert!(!cache.save(abc_document()).await);
    }

    #[tokio::test]
    async fn test_rebuild_persists_document() {
        let dir = tempfile::tempdir().unwrap();
        let cache = InventoryCache::open("DEFAULT", dir.path(), None).await;

        let report = cache.rebuild(&FakeSource::abc(), &BuildRequest::default(), 4).await;
        assert_eq!(report.status, BuildStatus::Success);
        assert!(report.saved);
        assert!(cache.is_valid(24).await);

        let on_disk = read_document(cache.path(), "DEFAULT").await.unwrap();
        assert_eq!(on_disk.databases.len(), 1);
        assert_eq!(on_disk.statistics.total_hosts, 1);
    }

    #[tokio::test]
    async fn test_failed_rebuild_keeps_previous_document() {
        let dir = tempfile::tempdir().unwrap();
        let cache = InventoryCache::open("DEFAULT", dir.path(), None).await;
        cache.rebuild(&FakeSource::abc(), &BuildRequest::default(), 4).await;

        let mut broken = FakeSource::abc();
        for id in ["A", "B", "C"] {
            broken.failing_compartments.insert(id.to_string());
        }
        let report = cache.rebuild(&broken, &BuildRequest::default(), 4).await;

        assert_eq!(report.status, BuildStatus::Failed);
        assert!(!report.saved);
        assert_eq!(cache.snapshot().await.databases.len(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_rebuilds_serialize() {
        let dir = tempfile::tempdir().unwrap();
        let cache = Arc::new(InventoryCache::open("DEFAULT", dir.path(), None).await);
        let source = Arc::new(FakeSource::abc());

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let cache = cache.clone();
                let source = source.clone();
                tokio::spawn(async move { cache.rebuild(source.as_ref(), &BuildRequest::default(), 2).await })
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.await.unwrap().status, BuildStatus::Success);
        }
        assert!(read_document(cache.path(), "DEFAULT").await.is_some());
    }
}
