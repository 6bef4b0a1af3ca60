//! Output destinations (local filesystem, S3)

use crate::error::{Error, Result, ResultExt};
use object_store::aws::AmazonS3Builder;
use object_store::buffered::BufWriter;
use object_store::path::Path as ObjectPath;
use object_store::ObjectStore;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::{Arc, Mutex, PoisonError};
use std::task::{Context, Poll};
use tokio::io::AsyncWrite;

/// Scheme prefix selecting the S3 backend
pub const S3_SCHEME: &str = "s3://";

/// Explicit local scheme, stripped on parse
pub const FILE_SCHEME: &str = "file://";

/// Bucket and object key of an S3 destination
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct S3Location {
    /// Bucket name
    pub bucket: String,
    /// Object key inside the bucket
    pub key: String,
}

impl S3Location {
    /// Split `s3://bucket/key/parts` (or `bucket/key/parts`) into bucket and key
    pub fn parse(url: &str) -> Result<Self> {
        let without_scheme = url.strip_prefix(S3_SCHEME).unwrap_or(url);

        let (bucket, key) = match without_scheme.find('/') {
            Some(idx) => (&without_scheme[..idx], &without_scheme[idx + 1..]),
            None => (without_scheme, ""),
        };

        if bucket.is_empty() {
            return Err(Error::config(format!("Missing bucket in S3 URL: {url}")));
        }
        if key.is_empty() || key.ends_with('/') {
            return Err(Error::config(format!("Missing object key in S3 URL: {url}")));
        }

        Ok(Self {
            bucket: bucket.to_string(),
            key: key.to_string(),
        })
    }

    /// Object path of the key
    pub fn object_path(&self) -> ObjectPath {
        ObjectPath::from(self.key.as_str())
    }
}

impl fmt::Display for S3Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{S3_SCHEME}{}/{}", self.bucket, self.key)
    }
}

/// Where the Parquet file is written, resolved once from the user string
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Destination {
    /// Path on the local filesystem
    Local(PathBuf),
    /// Object in an S3 bucket
    Remote(S3Location),
}

impl Destination {
    /// Parse a destination string
    ///
    /// Supported formats:
    /// - `s3://bucket/path/file.parquet` - AWS S3 (credentials from environment)
    /// - `file:///local/path.parquet` or any other string - local filesystem
    pub fn parse(url: &str) -> Result<Self> {
        if url.is_empty() {
            return Err(Error::config("Destination cannot be empty"));
        }

        if url.starts_with(S3_SCHEME) {
            return S3Location::parse(url).map(Destination::Remote);
        }

        let path = url.strip_prefix(FILE_SCHEME).unwrap_or(url);
        if path.is_empty() {
            return Err(Error::config(format!("Missing path in destination: {url}")));
        }
        Ok(Destination::Local(PathBuf::from(path)))
    }

    /// Check if this is a remote destination
    pub fn is_remote(&self) -> bool {
        matches!(self, Destination::Remote(_))
    }

    /// Open the single sink used for the whole write
    ///
    /// `upload_buffer_size` only applies to remote destinations.
    pub async fn open(&self, upload_buffer_size: usize) -> Result<OutputSink> {
        match self {
            Destination::Local(path) => OutputSink::local(path).await,
            Destination::Remote(location) => {
                let store = AmazonS3Builder::from_env()
                    .with_bucket_name(&location.bucket)
                    .build()
                    .map_err(|e| Error::config(format!("Failed to create s3 client: {e}")))?;
                Ok(OutputSink::object_store_with_capacity(
                    Arc::new(store),
                    location.object_path(),
                    upload_buffer_size,
                ))
            }
        }
    }
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Destination::Local(path) => write!(f, "{}", path.display()),
            Destination::Remote(location) => fmt::Display::fmt(location, f),
        }
    }
}

/// Upload buffer used when none is configured; larger outputs switch to a
/// multipart upload with parts of this size
pub const DEFAULT_UPLOAD_BUFFER_SIZE: usize = 10 * 1024 * 1024;

type DynWrite = dyn AsyncWrite + Unpin + Send;

enum SinkTarget {
    File { file: tokio::fs::File, path: PathBuf },
    Upload(BufWriter),
}

impl SinkTarget {
    fn writer(&mut self) -> Pin<&mut DynWrite> {
        match self {
            SinkTarget::File { file, .. } => Pin::new(file as &mut DynWrite),
            SinkTarget::Upload(upload) => Pin::new(upload as &mut DynWrite),
        }
    }
}

/// Byte sink behind the Parquet writer
///
/// Local files are created (or truncated) on open. Object stores get one
/// multipart upload that is completed when the writer shuts the sink down.
/// An [`SinkAbort`] taken before the sink is handed to the writer discards
/// the partial output if the write fails.
pub struct OutputSink {
    target: Arc<Mutex<Option<SinkTarget>>>,
}

impl OutputSink {
    fn new(target: SinkTarget) -> Self {
        Self {
            target: Arc::new(Mutex::new(Some(target))),
        }
    }

    /// Create or truncate a local file, creating parent directories
    pub async fn local(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }

        let file = tokio::fs::File::create(path)
            .await
            .with_context(|| format!("Failed to create file {}", path.display()))?;

        Ok(Self::new(SinkTarget::File {
            file,
            path: path.to_path_buf(),
        }))
    }

    /// Stream into `path` of `store` through a single buffered upload
    pub fn object_store(store: Arc<dyn ObjectStore>, path: ObjectPath) -> Self {
        Self::object_store_with_capacity(store, path, DEFAULT_UPLOAD_BUFFER_SIZE)
    }

    /// Like [`object_store`](Self::object_store), buffering `capacity` bytes
    /// before the multipart upload starts
    pub fn object_store_with_capacity(
        store: Arc<dyn ObjectStore>,
        path: ObjectPath,
        capacity: usize,
    ) -> Self {
        Self::new(SinkTarget::Upload(BufWriter::with_capacity(store, path, capacity)))
    }

    /// Handle discarding this sink's output
    pub fn abort_handle(&self) -> SinkAbort {
        SinkAbort {
            target: Arc::clone(&self.target),
        }
    }

    fn poll_target<R>(
        &self,
        f: impl FnOnce(Pin<&mut DynWrite>) -> Poll<io::Result<R>>,
    ) -> Poll<io::Result<R>> {
        let mut guard = self.target.lock().unwrap_or_else(PoisonError::into_inner);
        match guard.as_mut() {
            Some(target) => f(target.writer()),
            None => Poll::Ready(Err(io::Error::other("output sink was aborted"))),
        }
    }
}

impl AsyncWrite for OutputSink {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        self.poll_target(|w| w.poll_write(cx, buf))
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        self.poll_target(|w| w.poll_flush(cx))
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        self.poll_target(|w| w.poll_shutdown(cx))
    }
}

/// Discards the output of an [`OutputSink`] after a failed write
///
/// Local files are removed; a started multipart upload is aborted so no
/// parts are left behind. The sink rejects further writes afterwards.
pub struct SinkAbort {
    target: Arc<Mutex<Option<SinkTarget>>>,
}

impl SinkAbort {
    /// Discard everything written so far
    pub async fn abort(self) -> Result<()> {
        let target = self
            .target
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        match target {
            Some(SinkTarget::File { file, path }) => {
                drop(file);
                tokio::fs::remove_file(&path)
                    .await
                    .with_context(|| format!("Failed to remove partial file {}", path.display()))
            }
            Some(SinkTarget::Upload(mut upload)) => upload.abort().await.map_err(Into::into),
            None => Ok(()),
        }
    }
}
