//! Scoped object handles over Cloud Storage, a local directory tree, or memory.
//!
//! Readers and writers release their underlying resource when dropped. A
//! writer publishes nothing until [`ObjectWriter::commit`] succeeds, so a
//! failed step never leaves a half-written object behind.

pub mod gcs;
pub mod local;
pub mod memory;

pub use gcs::{GcsStore, TokenSource};
pub use local::LocalStore;
pub use memory::MemoryStore;

use crate::core::error::AppError;
use crate::core::types::ErrorCategory;
use async_trait::async_trait;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("object {bucket}/{key} not found")]
    NotFound { bucket: String, key: String },
    #[error("object key '{0}' escapes the store root")]
    InvalidKey(String),
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("server error {status}: {message}")]
    Server { status: u16, message: String },
    #[error("authentication failed: {0}")]
    Auth(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("object {0} is not valid UTF-8")]
    Encoding(String),
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        let (category, code) = match &err {
            StoreError::NotFound { .. } => (ErrorCategory::NotFoundError, "STORE-404"),
            StoreError::InvalidKey(_) => (ErrorCategory::ValidationError, "STORE-KEY-001"),
            StoreError::Io(_) => (ErrorCategory::IoError, "STORE-IO-001"),
            _ => (ErrorCategory::StorageError, "STORE-IO-002"),
        };
        AppError::new(category, err.to_string()).with_code(code)
    }
}

#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Open an existing object for reading. Missing objects fail with
    /// [`StoreError::NotFound`].
    async fn open_read(&self, bucket: &str, key: &str)
        -> Result<Box<dyn ObjectReader>, StoreError>;

    /// Open an object for writing. Nothing is visible until commit.
    async fn open_write(
        &self,
        bucket: &str,
        key: &str,
        content_type: &str,
    ) -> Result<Box<dyn ObjectWriter>, StoreError>;
}

#[async_trait]
pub trait ObjectReader: Send {
    fn key(&self) -> &str;

    /// Read the remaining content as UTF-8.
    async fn read_to_string(&mut self) -> Result<String, StoreError>;
}

#[async_trait]
pub trait ObjectWriter: Send {
    fn key(&self) -> &str;

    async fn write_str(&mut self, data: &str) -> Result<(), StoreError>;

    /// Publish the object and release the handle. Returns bytes written.
    async fn commit(self: Box<Self>) -> Result<u64, StoreError>;
}

/// Object key for `name` under `prefix`. The prefix is used verbatim, so it
/// normally ends with `/`.
pub fn object_key(prefix: &str, name: &str) -> String {
    format!("{}{}", prefix, name)
}

pub(crate) fn decode_utf8(key: &str, bytes: Vec<u8>) -> Result<String, StoreError> {
    String::from_utf8(bytes).map_err(|_| StoreError::Encoding(key.to_string()))
}
