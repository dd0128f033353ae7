use composer_dbt::core::docs::{FETCH_EXPRESSION, STATIC_INDEX_CONTENT_TYPE};
use composer_dbt::core::types::ErrorCategory;
use composer_dbt::core::{DocsBundler, LocalStore, MemoryStore};
use std::sync::Arc;
use tempfile::TempDir;

const BUCKET: &str = "analytics-docs";
const PREFIX: &str = "daily/dbt_run/2024-01-01T00:00:00+00:00/dbt/target/";

fn seeded_store(index: &str) -> MemoryStore {
    let store = MemoryStore::new();
    store.put(
        BUCKET,
        &format!("{}manifest.json", PREFIX),
        r#"{"a":1}"#,
        "application/json",
    );
    store.put(
        BUCKET,
        &format!("{}catalog.json", PREFIX),
        r#"{"b":2}"#,
        "application/json",
    );
    store.put(BUCKET, &format!("{}index.html", PREFIX), index, "text/html");
    store
}

#[tokio::test]
async fn test_bundle_inlines_manifest_and_catalog() {
    let index = format!("<html><script>{};render(o)</script></html>", FETCH_EXPRESSION);
    let store = seeded_store(&index);
    let bundler = DocsBundler::new(Arc::new(store.clone()));

    let report = bundler.bundle(BUCKET, PREFIX).await.unwrap();

    let output = store
        .get(BUCKET, &format!("{}static_index.html", PREFIX))
        .unwrap();
    assert_eq!(
        String::from_utf8(output.data).unwrap(),
        r#"<html><script>o=[{label: 'manifest', data: {"a":1}},{label: 'catalog', data: {"b":2}}];render(o)</script></html>"#
    );
    assert_eq!(output.content_type, STATIC_INDEX_CONTENT_TYPE);
    assert_eq!(report.output_key, format!("{}static_index.html", PREFIX));
    assert_eq!(report.manifest_bytes, 7);
    assert_eq!(report.catalog_bytes, 7);
    assert_eq!(store.open_handles(), 0);
}

#[tokio::test]
async fn test_missing_pattern_writes_nothing() {
    let store = seeded_store("<html>dbt changed its loader</html>");
    let bundler = DocsBundler::new(Arc::new(store.clone()));

    let err = bundler.bundle(BUCKET, PREFIX).await.unwrap_err();

    assert_eq!(err.category, ErrorCategory::ContentMismatchError);
    assert_eq!(err.code, "DOCS-PAT-001");
    assert!(!store.contains(BUCKET, &format!("{}static_index.html", PREFIX)));
    assert_eq!(store.open_handles(), 0);
}

#[tokio::test]
async fn test_missing_input_is_not_found() {
    let store = MemoryStore::new();
    store.put(BUCKET, &format!("{}manifest.json", PREFIX), "{}", "application/json");
    let bundler = DocsBundler::new(Arc::new(store.clone()));

    let err = bundler.bundle(BUCKET, PREFIX).await.unwrap_err();

    assert_eq!(err.category, ErrorCategory::NotFoundError);
    assert_eq!(err.code, "STORE-404");
    assert_eq!(err.context.get("bucket").map(String::as_str), Some(BUCKET));
    assert_eq!(err.context.get("prefix").map(String::as_str), Some(PREFIX));
    assert_eq!(store.open_handles(), 0);
}

#[tokio::test]
async fn test_failed_read_releases_every_handle() {
    let index = FETCH_EXPRESSION.to_string();
    let store = seeded_store(&index);
    store.fail_reads_of(BUCKET, &format!("{}catalog.json", PREFIX));
    let bundler = DocsBundler::new(Arc::new(store.clone()));

    let err = bundler.bundle(BUCKET, PREFIX).await.unwrap_err();

    assert_eq!(err.category, ErrorCategory::IoError);
    assert!(!store.contains(BUCKET, &format!("{}static_index.html", PREFIX)));
    assert_eq!(store.open_handles(), 0);
}

#[tokio::test]
async fn test_prefix_is_concatenated_verbatim() {
    let store = MemoryStore::new();
    for (name, body) in [
        ("runmanifest.json", "{}"),
        ("runcatalog.json", "{}"),
        ("runindex.html", FETCH_EXPRESSION),
    ] {
        store.put(BUCKET, name, body, "text/plain");
    }
    let bundler = DocsBundler::new(Arc::new(store.clone()));

    let report = bundler.bundle(BUCKET, "run").await.unwrap();

    assert_eq!(report.output_key, "runstatic_index.html");
    assert!(store.contains(BUCKET, "runstatic_index.html"));
}

#[tokio::test]
async fn test_bundle_against_local_tree() {
    let temp = TempDir::new().unwrap();
    let target = temp.path().join(BUCKET).join("target");
    std::fs::create_dir_all(&target).unwrap();
    std::fs::write(target.join("manifest.json"), r#"{"a":1}"#).unwrap();
    std::fs::write(target.join("catalog.json"), r#"{"b":2}"#).unwrap();
    std::fs::write(target.join("index.html"), FETCH_EXPRESSION).unwrap();

    let bundler = DocsBundler::new(Arc::new(LocalStore::new(temp.path())));
    let report = bundler.bundle(BUCKET, "target/").await.unwrap();

    let written = std::fs::read_to_string(target.join("static_index.html")).unwrap();
    assert_eq!(
        written,
        r#"o=[{label: 'manifest', data: {"a":1}},{label: 'catalog', data: {"b":2}}]"#
    );
    assert_eq!(report.output_bytes, written.len() as u64);
}

#[tokio::test]
async fn test_failed_commit_leaves_no_partial_output() {
    let temp = TempDir::new().unwrap();
    let root = temp.path().join(BUCKET);
    std::fs::create_dir_all(root.join("static_index.html")).unwrap();
    std::fs::write(root.join("manifest.json"), "{}").unwrap();
    std::fs::write(root.join("catalog.json"), "{}").unwrap();
    std::fs::write(root.join("index.html"), FETCH_EXPRESSION).unwrap();

    let bundler = DocsBundler::new(Arc::new(LocalStore::new(temp.path())));
    let err = bundler.bundle(BUCKET, "").await.unwrap_err();

    assert_eq!(err.category, ErrorCategory::IoError);
    assert_eq!(err.code, "STORE-IO-001");
    assert!(!root.join("static_index.html.partial").exists());
}
