use super::{decode_utf8, ObjectReader, ObjectStore, ObjectWriter, StoreError};
use crate::core::config::StorageConfig;
use async_trait::async_trait;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use reqwest::StatusCode;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::OnceCell;

/// Characters left unescaped in object names (RFC 3986 unreserved).
const OBJECT_NAME: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

const TOKEN_PATH: &str = "/computeMetadata/v1/instance/service-accounts/default/token";

/// Where bearer tokens for Cloud Storage come from.
#[derive(Debug, Clone)]
pub enum TokenSource {
    /// Fixed token, e.g. from `gcloud auth print-access-token`.
    Static(String),
    /// GCE/GKE metadata server (workload identity inside Composer pods).
    MetadataServer { endpoint: String },
    /// No Authorization header; for emulators and public buckets.
    Anonymous,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

/// Cloud Storage JSON API client.
#[derive(Clone)]
pub struct GcsStore {
    client: reqwest::Client,
    endpoint: String,
    token_source: TokenSource,
    token: Arc<OnceCell<Option<String>>>,
}

impl GcsStore {
    pub fn new(
        endpoint: &str,
        token_source: TokenSource,
        timeout: Duration,
    ) -> Result<Self, StoreError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            token_source,
            token: Arc::new(OnceCell::new()),
        })
    }

    /// Token from `GCS_ACCESS_TOKEN` when set, otherwise the metadata server.
    pub fn from_config(config: &StorageConfig) -> Result<Self, StoreError> {
        let token_source = match std::env::var("GCS_ACCESS_TOKEN") {
            Ok(token) if !token.trim().is_empty() => TokenSource::Static(token),
            _ => TokenSource::MetadataServer {
                endpoint: config.metadata_endpoint.clone(),
            },
        };
        let timeout = config
            .request_timeout()
            .unwrap_or_else(|| Duration::from_secs(30));
        Self::new(&config.gcs_endpoint, token_source, timeout)
    }

    fn download_url(&self, bucket: &str, key: &str) -> String {
        format!(
            "{}/storage/v1/b/{}/o/{}?alt=media",
            self.endpoint,
            utf8_percent_encode(bucket, OBJECT_NAME),
            utf8_percent_encode(key, OBJECT_NAME)
        )
    }

    fn upload_url(&self, bucket: &str, key: &str) -> String {
        format!(
            "{}/upload/storage/v1/b/{}/o?uploadType=media&name={}",
            self.endpoint,
            utf8_percent_encode(bucket, OBJECT_NAME),
            utf8_percent_encode(key, OBJECT_NAME)
        )
    }

    async fn bearer(&self) -> Result<Option<String>, StoreError> {
        let token = self
            .token
            .get_or_try_init(|| async {
                match &self.token_source {
                    TokenSource::Static(token) => Ok(Some(token.clone())),
                    TokenSource::Anonymous => Ok(None),
                    TokenSource::MetadataServer { endpoint } => {
                        self.fetch_metadata_token(endpoint).await.map(Some)
                    }
                }
            })
            .await?;
        Ok(token.clone())
    }

    async fn fetch_metadata_token(&self, endpoint: &str) -> Result<String, StoreError> {
        let url = format!("{}{}", endpoint.trim_end_matches('/'), TOKEN_PATH);
        let response = self
            .client
            .get(&url)
            .header("Metadata-Flavor", "Google")
            .send()
            .await
            .map_err(|err| StoreError::Auth(format!("metadata server unreachable: {}", err)))?;
        if !response.status().is_success() {
            return Err(StoreError::Auth(format!(
                "metadata server returned {}",
                response.status()
            )));
        }
        let token: TokenResponse = response
            .json()
            .await
            .map_err(|err| StoreError::Auth(format!("invalid token response: {}", err)))?;
        Ok(token.access_token)
    }

    fn authorize(
        &self,
        request: reqwest::RequestBuilder,
        token: Option<String>,
    ) -> reqwest::RequestBuilder {
        match token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }
}

async fn server_error(response: reqwest::Response) -> StoreError {
    let status = response.status().as_u16();
    let message = response.text().await.unwrap_or_default();
    StoreError::Server { status, message }
}

struct GcsReader {
    key: String,
    body: Option<Vec<u8>>,
}

struct GcsWriter {
    store: GcsStore,
    bucket: String,
    key: String,
    content_type: String,
    buffer: String,
}

#[async_trait]
impl ObjectStore for GcsStore {
    async fn open_read(
        &self,
        bucket: &str,
        key: &str,
    ) -> Result<Box<dyn ObjectReader>, StoreError> {
        let token = self.bearer().await?;
        let request = self.authorize(self.client.get(self.download_url(bucket, key)), token);
        let response = request.send().await?;
        match response.status() {
            StatusCode::NOT_FOUND => Err(StoreError::NotFound {
                bucket: bucket.to_string(),
                key: key.to_string(),
            }),
            status if status.is_success() => {
                let body = response.bytes().await?.to_vec();
                tracing::debug!(bucket, key, bytes = body.len(), "downloaded object");
                Ok(Box::new(GcsReader {
                    key: key.to_string(),
                    body: Some(body),
                }))
            }
            _ => Err(server_error(response).await),
        }
    }

    async fn open_write(
        &self,
        bucket: &str,
        key: &str,
        content_type: &str,
    ) -> Result<Box<dyn ObjectWriter>, StoreError> {
        Ok(Box::new(GcsWriter {
            store: self.clone(),
            bucket: bucket.to_string(),
            key: key.to_string(),
            content_type: content_type.to_string(),
            buffer: String::new(),
        }))
    }
}

#[async_trait]
impl ObjectReader for GcsReader {
    fn key(&self) -> &str {
        &self.key
    }

    async fn read_to_string(&mut self) -> Result<String, StoreError> {
        decode_utf8(&self.key, self.body.take().unwrap_or_default())
    }
}

#[async_trait]
impl ObjectWriter for GcsWriter {
    fn key(&self) -> &str {
        &self.key
    }

    async fn write_str(&mut self, data: &str) -> Result<(), StoreError> {
        self.buffer.push_str(data);
        Ok(())
    }

    async fn commit(mut self: Box<Self>) -> Result<u64, StoreError> {
        let body = std::mem::take(&mut self.buffer);
        let size = body.len() as u64;
        let token = self.store.bearer().await?;
        let request = self
            .store
            .client
            .post(self.store.upload_url(&self.bucket, &self.key))
            .header(reqwest::header::CONTENT_TYPE, self.content_type.as_str())
            .body(body);
        let response = self.store.authorize(request, token).send().await?;
        if !response.status().is_success() {
            return Err(server_error(response).await);
        }
        tracing::debug!(bucket = %self.bucket, key = %self.key, bytes = size, "uploaded object");
        Ok(size)
    }
}
