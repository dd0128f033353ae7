use super::{decode_utf8, ObjectReader, ObjectStore, ObjectWriter, StoreError};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

/// Committed object content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub data: Vec<u8>,
    pub content_type: String,
}

#[derive(Default)]
struct Inner {
    objects: HashMap<(String, String), StoredObject>,
    open_handles: usize,
    failing_reads: HashSet<(String, String)>,
}

/// In-process store that tracks how many handles are open.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // A poisoned lock only means a test panicked mid-operation; the map is still usable.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn put(&self, bucket: &str, key: &str, data: impl Into<Vec<u8>>, content_type: &str) {
        self.lock().objects.insert(
            (bucket.to_string(), key.to_string()),
            StoredObject {
                data: data.into(),
                content_type: content_type.to_string(),
            },
        );
    }

    pub fn get(&self, bucket: &str, key: &str) -> Option<StoredObject> {
        self.lock()
            .objects
            .get(&(bucket.to_string(), key.to_string()))
            .cloned()
    }

    pub fn contains(&self, bucket: &str, key: &str) -> bool {
        self.get(bucket, key).is_some()
    }

    /// Number of readers and writers not yet dropped or committed.
    pub fn open_handles(&self) -> usize {
        self.lock().open_handles
    }

    /// Make reads of this object fail after it has been opened.
    pub fn fail_reads_of(&self, bucket: &str, key: &str) {
        self.lock()
            .failing_reads
            .insert((bucket.to_string(), key.to_string()));
    }

    fn acquire(&self) -> HandleGuard {
        self.lock().open_handles += 1;
        HandleGuard {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct HandleGuard {
    inner: Arc<Mutex<Inner>>,
}

impl Drop for HandleGuard {
    fn drop(&mut self) {
        let mut inner = self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        inner.open_handles = inner.open_handles.saturating_sub(1);
    }
}

struct MemoryReader {
    key: String,
    data: Option<Vec<u8>>,
    fail: bool,
    _guard: HandleGuard,
}

struct MemoryWriter {
    bucket: String,
    key: String,
    content_type: String,
    buffer: String,
    store: MemoryStore,
    _guard: HandleGuard,
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn open_read(
        &self,
        bucket: &str,
        key: &str,
    ) -> Result<Box<dyn ObjectReader>, StoreError> {
        let id = (bucket.to_string(), key.to_string());
        let (data, fail) = {
            let inner = self.lock();
            let object = inner.objects.get(&id).ok_or_else(|| StoreError::NotFound {
                bucket: bucket.to_string(),
                key: key.to_string(),
            })?;
            (object.data.clone(), inner.failing_reads.contains(&id))
        };
        Ok(Box::new(MemoryReader {
            key: key.to_string(),
            data: Some(data),
            fail,
            _guard: self.acquire(),
        }))
    }

    async fn open_write(
        &self,
        bucket: &str,
        key: &str,
        content_type: &str,
    ) -> Result<Box<dyn ObjectWriter>, StoreError> {
        Ok(Box::new(MemoryWriter {
            bucket: bucket.to_string(),
            key: key.to_string(),
            content_type: content_type.to_string(),
            buffer: String::new(),
            store: self.clone(),
            _guard: self.acquire(),
        }))
    }
}

#[async_trait]
impl ObjectReader for MemoryReader {
    fn key(&self) -> &str {
        &self.key
    }

    async fn read_to_string(&mut self) -> Result<String, StoreError> {
        if self.fail {
            return Err(StoreError::Io(std::io::Error::new(
                std::io::ErrorKind::ConnectionReset,
                format!("read of {} interrupted", self.key),
            )));
        }
        decode_utf8(&self.key, self.data.take().unwrap_or_default())
    }
}

#[async_trait]
impl ObjectWriter for MemoryWriter {
    fn key(&self) -> &str {
        &self.key
    }

    async fn write_str(&mut self, data: &str) -> Result<(), StoreError> {
        self.buffer.push_str(data);
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<u64, StoreError> {
        let size = self.buffer.len() as u64;
        self.store.put(
            &self.bucket,
            &self.key,
            self.buffer.as_bytes(),
            &self.content_type,
        );
        Ok(size)
    }
}
