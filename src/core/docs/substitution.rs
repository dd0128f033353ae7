#![allow(clippy::result_large_err)]

use crate::core::error::AppError;
use crate::core::types::ErrorCategory;

/// Expression in dbt's generated `index.html` that fetches both documents
/// at page load.
pub const FETCH_EXPRESSION: &str =
    r#"o=[i("manifest","manifest.json"+t),i("catalog","catalog.json"+t)]"#;

/// Rewrite `index` so the manifest and catalog are embedded as literals.
///
/// Every occurrence of [`FETCH_EXPRESSION`] is replaced. The documents are
/// inserted verbatim; they are not parsed or re-encoded.
pub fn inline_documents(index: &str, manifest: &str, catalog: &str) -> Result<String, AppError> {
    if !index.contains(FETCH_EXPRESSION) {
        return Err(AppError::new(
            ErrorCategory::ContentMismatchError,
            "index.html does not contain the manifest/catalog fetch expression",
        )
        .with_code("DOCS-PAT-001")
        .with_suggestion(
            "The dbt docs template changed; regenerate with `dbt docs generate --static` instead",
        ));
    }

    let inline = format!(
        "o=[{{label: 'manifest', data: {}}},{{label: 'catalog', data: {}}}]",
        manifest, catalog
    );
    Ok(index.replace(FETCH_EXPRESSION, &inline))
}
