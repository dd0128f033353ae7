use super::{decode_utf8, ObjectReader, ObjectStore, ObjectWriter, StoreError};
use async_trait::async_trait;
use std::path::{Component, Path, PathBuf};
use tokio::fs::{self, File};
use tokio::io::{AsyncReadExt, AsyncWriteExt};

/// Objects laid out as `<root>/<bucket>/<key>` on the local filesystem.
///
/// Useful for bundling docs straight out of a `dbt docs generate` run or a
/// gcsfuse mount.
pub struct LocalStore {
    root: PathBuf,
}

impl LocalStore {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, bucket: &str, key: &str) -> Result<PathBuf, StoreError> {
        let relative = Path::new(bucket).join(key);
        let escapes = relative.components().any(|component| {
            !matches!(component, Component::Normal(_) | Component::CurDir)
        });
        if escapes {
            return Err(StoreError::InvalidKey(format!("{}/{}", bucket, key)));
        }
        Ok(self.root.join(relative))
    }
}

struct LocalReader {
    key: String,
    file: File,
}

struct LocalWriter {
    key: String,
    target: PathBuf,
    partial: PathBuf,
    file: Option<File>,
    written: u64,
    committed: bool,
}

fn partial_path(target: &Path) -> PathBuf {
    let mut name = target.file_name().unwrap_or_default().to_os_string();
    name.push(".partial");
    target.with_file_name(name)
}

#[async_trait]
impl ObjectStore for LocalStore {
    async fn open_read(
        &self,
        bucket: &str,
        key: &str,
    ) -> Result<Box<dyn ObjectReader>, StoreError> {
        let path = self.resolve(bucket, key)?;
        let file = File::open(&path).await.map_err(|err| {
            if err.kind() == std::io::ErrorKind::NotFound {
                StoreError::NotFound {
                    bucket: bucket.to_string(),
                    key: key.to_string(),
                }
            } else {
                StoreError::Io(err)
            }
        })?;
        Ok(Box::new(LocalReader {
            key: key.to_string(),
            file,
        }))
    }

    async fn open_write(
        &self,
        bucket: &str,
        key: &str,
        content_type: &str,
    ) -> Result<Box<dyn ObjectWriter>, StoreError> {
        let target = self.resolve(bucket, key)?;
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).await?;
        }
        let partial = partial_path(&target);
        let file = File::create(&partial).await?;
        tracing::trace!(path = %target.display(), content_type, "opened local object for writing");
        Ok(Box::new(LocalWriter {
            key: key.to_string(),
            target,
            partial,
            file: Some(file),
            written: 0,
            committed: false,
        }))
    }
}

#[async_trait]
impl ObjectReader for LocalReader {
    fn key(&self) -> &str {
        &self.key
    }

    async fn read_to_string(&mut self) -> Result<String, StoreError> {
        let mut bytes = Vec::new();
        self.file.read_to_end(&mut bytes).await?;
        decode_utf8(&self.key, bytes)
    }
}

#[async_trait]
impl ObjectWriter for LocalWriter {
    fn key(&self) -> &str {
        &self.key
    }

    async fn write_str(&mut self, data: &str) -> Result<(), StoreError> {
        let file = self.file.as_mut().ok_or_else(|| {
            StoreError::Io(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "writer already closed",
            ))
        })?;
        file.write_all(data.as_bytes()).await?;
        self.written += data.len() as u64;
        Ok(())
    }

    async fn commit(mut self: Box<Self>) -> Result<u64, StoreError> {
        if let Some(mut file) = self.file.take() {
            file.flush().await?;
            file.sync_all().await?;
        }
        fs::rename(&self.partial, &self.target).await?;
        self.committed = true;
        Ok(self.written)
    }
}

impl Drop for LocalWriter {
    fn drop(&mut self) {
        self.file.take();
        if !self.committed {
            let _ = std::fs::remove_file(&self.partial);
        }
    }
}
