#![allow(clippy::result_large_err)] // Bundler returns AppError so the CLI can report category and code.

//! Static dbt documentation bundling.
//!
//! dbt's `index.html` loads `manifest.json` and `catalog.json` with fetch
//! calls, which fails when the page is opened straight from a bucket. The
//! bundler writes `static_index.html` with both documents inlined.

pub mod substitution;

pub use substitution::{inline_documents, FETCH_EXPRESSION};

use crate::core::error::AppError;
use crate::core::storage::{object_key, ObjectReader, ObjectStore, ObjectWriter};
use serde::Serialize;
use std::sync::Arc;

pub const MANIFEST_FILE: &str = "manifest.json";
pub const CATALOG_FILE: &str = "catalog.json";
pub const INDEX_FILE: &str = "index.html";
pub const STATIC_INDEX_FILE: &str = "static_index.html";
pub const STATIC_INDEX_CONTENT_TYPE: &str = "text/html; charset=utf-8";

/// Outcome of one bundling run.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct BundleReport {
    pub bucket: String,
    pub output_key: String,
    pub manifest_bytes: u64,
    pub catalog_bytes: u64,
    pub index_bytes: u64,
    pub output_bytes: u64,
}

/// The four handles of one run. Dropping this releases all of them, so every
/// early return below closes every stream.
struct BundleHandles {
    manifest: Box<dyn ObjectReader>,
    catalog: Box<dyn ObjectReader>,
    index: Box<dyn ObjectReader>,
    output: Box<dyn ObjectWriter>,
}

pub struct DocsBundler {
    store: Arc<dyn ObjectStore>,
}

impl DocsBundler {
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self { store }
    }

    async fn open(&self, bucket: &str, prefix: &str) -> Result<BundleHandles, AppError> {
        let manifest = self
            .store
            .open_read(bucket, &object_key(prefix, MANIFEST_FILE))
            .await?;
        let catalog = self
            .store
            .open_read(bucket, &object_key(prefix, CATALOG_FILE))
            .await?;
        let index = self
            .store
            .open_read(bucket, &object_key(prefix, INDEX_FILE))
            .await?;
        let output = self
            .store
            .open_write(
                bucket,
                &object_key(prefix, STATIC_INDEX_FILE),
                STATIC_INDEX_CONTENT_TYPE,
            )
            .await?;
        Ok(BundleHandles {
            manifest,
            catalog,
            index,
            output,
        })
    }

    /// Combine `{prefix}manifest.json`, `{prefix}catalog.json` and
    /// `{prefix}index.html` into `{prefix}static_index.html`.
    pub async fn bundle(&self, bucket: &str, prefix: &str) -> Result<BundleReport, AppError> {
        tracing::info!(bucket, prefix, "bundling static dbt docs");

        let mut handles = self.open(bucket, prefix).await.map_err(|err| {
            err.with_context("bucket", bucket)
                .with_context("prefix", prefix)
        })?;

        let manifest = handles.manifest.read_to_string().await?;
        let catalog = handles.catalog.read_to_string().await?;
        let index = handles.index.read_to_string().await?;

        let bundled = inline_documents(&index, &manifest, &catalog)
            .map_err(|err| err.with_context("object", handles.index.key().to_string()))?;

        let BundleHandles {
            manifest: manifest_handle,
            catalog: catalog_handle,
            index: index_handle,
            mut output,
        } = handles;
        drop((manifest_handle, catalog_handle, index_handle));

        let output_key = output.key().to_string();
        output.write_str(&bundled).await?;
        let output_bytes = output.commit().await?;

        let report = BundleReport {
            bucket: bucket.to_string(),
            output_key,
            manifest_bytes: manifest.len() as u64,
            catalog_bytes: catalog.len() as u64,
            index_bytes: index.len() as u64,
            output_bytes,
        };
        tracing::info!(
            bucket,
            output = %report.output_key,
            bytes = report.output_bytes,
            "wrote static docs"
        );
        Ok(report)
    }
}
