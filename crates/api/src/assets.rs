//! Image storage for catalog records.
//!
//! The [`AssetStore`] trait is the whole contract the catalog relies on:
//! store an upload under a fresh name, delete by name. Names are flat (no
//! directories) and double as the path segment under `/uploads`.

use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use axum::body::Bytes;
use axum::http::HeaderMap;
use thiserror::Error;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use url::Url;

use marketstall_core::ValidationError;

/// Largest accepted upload.
pub const MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;

/// Path prefix uploaded files are served under.
pub const UPLOADS_PATH: &str = "/uploads";

/// Errors from the asset backend.
#[derive(Debug, Error)]
pub enum AssetError {
    #[error("asset io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("could not find a free name for {0}")]
    NameExhausted(String),
}

/// An accepted image upload.
#[derive(Debug, Clone)]
pub struct Upload {
    file_name: String,
    content_type: String,
    bytes: Bytes,
}

impl Upload {
    /// Accept an uploaded file.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` unless the content type is `image/*` and the
    /// body is at most [`MAX_UPLOAD_BYTES`].
    pub fn new(
        file_name: impl Into<String>,
        content_type: impl Into<String>,
        bytes: Bytes,
    ) -> Result<Self, ValidationError> {
        let content_type = content_type.into();
        if !content_type.to_ascii_lowercase().starts_with("image/") {
            return Err(ValidationError::Other(
                "Only image uploads are allowed".to_string(),
            ));
        }
        if bytes.len() > MAX_UPLOAD_BYTES {
            return Err(ValidationError::Other(
                "Image must be at most 5 MB".to_string(),
            ));
        }

        Ok(Self {
            file_name: file_name.into(),
            content_type,
            bytes,
        })
    }

    #[must_use]
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    #[must_use]
    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    #[must_use]
    pub const fn bytes(&self) -> &Bytes {
        &self.bytes
    }
}

/// Where catalog images live.
#[async_trait]
pub trait AssetStore: Send + Sync {
    /// Persist `upload` and return its stored name.
    async fn store(&self, upload: &Upload) -> Result<String, AssetError>;

    /// Remove a stored asset. Deleting a missing name succeeds.
    async fn delete(&self, name: &str) -> Result<(), AssetError>;
}

/// Best-effort delete: failures are logged and swallowed.
pub async fn discard(store: &dyn AssetStore, name: &str) {
    if let Err(error) = store.delete(name).await {
        tracing::warn!(%error, asset = %name, "Failed to delete asset");
    }
}

/// Reduce an uploaded file name to one flat, URL-friendly segment.
///
/// Only the last path component is kept and whitespace runs become `_`.
#[must_use]
pub fn sanitize_file_name(original: &str) -> String {
    let last = original
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .trim();

    let mut out = String::with_capacity(last.len());
    let mut in_space = false;
    for ch in last.chars().filter(|c| !c.is_control()) {
        if ch.is_whitespace() {
            if !in_space {
                out.push('_');
            }
            in_space = true;
        } else {
            out.push(ch);
            in_space = false;
        }
    }

    let out = out.trim_start_matches('.').to_string();
    if out.is_empty() { "upload".to_string() } else { out }
}

/// `<unix-millis>_<sanitized name>`.
#[must_use]
pub fn stored_name(original: &str, millis: u128) -> String {
    format!("{millis}_{}", sanitize_file_name(original))
}

fn unix_millis() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default()
}

/// Scheme and host the client used, from `X-Forwarded-Proto` and
/// `X-Forwarded-Host`/`Host`, else `fallback`.
#[must_use]
pub fn request_origin(headers: &HeaderMap, fallback: &Url) -> Url {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.split(',').next())
            .map(str::trim)
            .filter(|value| !value.is_empty())
    };

    let Some(host) = header("x-forwarded-host").or_else(|| header("host")) else {
        return fallback.clone();
    };
    let scheme = header("x-forwarded-proto").unwrap_or_else(|| fallback.scheme());

    Url::parse(&format!("{scheme}://{host}")).unwrap_or_else(|_| fallback.clone())
}

/// Public URL of a stored asset.
#[must_use]
pub fn public_url(origin: &Url, name: &str) -> String {
    let mut url = origin.clone();
    url.set_query(None);
    url.set_fragment(None);
    url.set_path(&format!("{UPLOADS_PATH}/{name}"));
    url.to_string()
}

/// Assets written to one flat directory.
#[derive(Debug, Clone)]
pub struct DiskAssetStore {
    dir: PathBuf,
}

impl DiskAssetStore {
    /// Use `dir`, creating it if needed.
    ///
    /// # Errors
    ///
    /// Returns `AssetError::Io` if the directory cannot be created.
    pub async fn open(dir: impl Into<PathBuf>) -> Result<Self, AssetError> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir).await?;
        Ok(Self { dir })
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[async_trait]
impl AssetStore for DiskAssetStore {
    async fn store(&self, upload: &Upload) -> Result<String, AssetError> {
        let millis = unix_millis();
        let base = stored_name(upload.file_name(), millis);

        // Two uploads of one name within a millisecond get a counter.
        for attempt in 0..16u32 {
            let name = if attempt == 0 {
                base.clone()
            } else {
                format!("{millis}_{attempt}_{}", sanitize_file_name(upload.file_name()))
            };

            let file = tokio::fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(self.dir.join(&name))
                .await;
            match file {
                Ok(file) => {
                    fill_new_file(&self.dir.join(&name), file, upload.bytes()).await?;
                    tracing::debug!(asset = %name, size = upload.bytes().len(), "Stored asset");
                    return Ok(name);
                }
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {}
                Err(e) => return Err(e.into()),
            }
        }

        Err(AssetError::NameExhausted(base))
    }

    async fn delete(&self, name: &str) -> Result<(), AssetError> {
        let flat = sanitize_file_name(name);
        match tokio::fs::remove_file(self.dir.join(flat)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Write `bytes` into the just-created file at `path`. A partly written file
/// is removed before the error is returned.
async fn fill_new_file<W>(path: &Path, mut file: W, bytes: &[u8]) -> Result<(), AssetError>
where
    W: AsyncWrite + Unpin,
{
    let written = async {
        file.write_all(bytes).await?;
        file.flush().await
    }
    .await;

    if let Err(e) = written {
        drop(file);
        if let Err(cleanup) = tokio::fs::remove_file(path).await {
            tracing::warn!(path = %path.display(), error = %cleanup, "Failed to remove partial asset");
        }
        return Err(e.into());
    }
    Ok(())
}

/// Assets kept in memory, for tests.
#[cfg(any(test, feature = "test-util"))]
#[derive(Debug, Default)]
pub struct MemoryAssetStore {
    files: tokio::sync::RwLock<std::collections::BTreeMap<String, Bytes>>,
    counter: std::sync::atomic::AtomicU64,
}

#[cfg(any(test, feature = "test-util"))]
impl MemoryAssetStore {
    /// Names currently stored, sorted.
    pub async fn names(&self) -> Vec<String> {
        self.files.read().await.keys().cloned().collect()
    }

    pub async fn contains(&self, name: &str) -> bool {
        self.files.read().await.contains_key(name)
    }
}

#[cfg(any(test, feature = "test-util"))]
#[async_trait]
impl AssetStore for MemoryAssetStore {
    async fn store(&self, upload: &Upload) -> Result<String, AssetError> {
        let n = self
            .counter
            .fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        let name = stored_name(upload.file_name(), u128::from(n));
        self.files
            .write()
            .await
            .insert(name.clone(), upload.bytes().clone());
        Ok(name)
    }

    async fn delete(&self, name: &str) -> Result<(), AssetError> {
        self.files.write().await.remove(name);
        Ok(())
    }
}
