use composer_dbt::core::error::{AppError, DefaultErrorReporter, ErrorReporter};
use composer_dbt::core::storage::StoreError;
use composer_dbt::core::types::{ErrorCategory, ErrorSeverity};

#[test]
fn test_error_creation_all_categories() {
    let categories = vec![
        ErrorCategory::ConfigurationError,
        ErrorCategory::NotFoundError,
        ErrorCategory::ContentMismatchError,
        ErrorCategory::ValidationError,
        ErrorCategory::SerializationError,
        ErrorCategory::StorageError,
        ErrorCategory::IoError,
        ErrorCategory::InternalError,
    ];

    for category in categories {
        let error = AppError::new(category, "test message");
        assert_eq!(error.category, category);
        assert_eq!(error.message, "test message");
        assert_eq!(error.severity(), ErrorSeverity::Error);
        assert!(error.code.starts_with("ERR-"));
        assert_eq!(error.context.len(), 0);
        assert_eq!(error.recovery_suggestions.len(), 0);
        assert!(error.occurred_at <= chrono::Utc::now());
        assert!(error.source.is_none());
    }
}

#[test]
fn test_error_add_context() {
    let mut error = AppError::new(ErrorCategory::NotFoundError, "object missing");

    error.add_context("bucket", "analytics-docs");
    error.add_context("key", "run/manifest.json");

    assert_eq!(
        error.context.get("bucket"),
        Some(&"analytics-docs".to_string())
    );
    assert_eq!(error.context.len(), 2);
}

#[test]
fn test_error_display() {
    let error = AppError::new(ErrorCategory::ContentMismatchError, "pattern not found")
        .with_code("DOCS-PAT-001")
        .with_context("object", "run/index.html");

    let display = format!("{}", error);
    assert!(display.starts_with("[DOCS-PAT-001] ContentMismatchError: pattern not found"));
    assert!(display.contains("run/index.html"));
}

#[test]
fn test_error_with_source_is_displayed() {
    let io = std::io::Error::new(std::io::ErrorKind::Other, "disk gone");
    let error = AppError::with_source(ErrorCategory::IoError, "write failed", Box::new(io));

    assert!(error.source.is_some());
    assert!(format!("{}", error).contains("Caused by: disk gone"));
}

#[test]
fn test_store_errors_map_to_categories() {
    let cases: Vec<(StoreError, ErrorCategory, &str)> = vec![
        (
            StoreError::NotFound {
                bucket: "b".to_string(),
                key: "k".to_string(),
            },
            ErrorCategory::NotFoundError,
            "STORE-404",
        ),
        (
            StoreError::InvalidKey("../k".to_string()),
            ErrorCategory::ValidationError,
            "STORE-KEY-001",
        ),
        (
            StoreError::Io(std::io::Error::new(std::io::ErrorKind::Other, "x")),
            ErrorCategory::IoError,
            "STORE-IO-001",
        ),
        (
            StoreError::Server {
                status: 503,
                message: "unavailable".to_string(),
            },
            ErrorCategory::StorageError,
            "STORE-IO-002",
        ),
        (
            StoreError::Auth("no token".to_string()),
            ErrorCategory::StorageError,
            "STORE-IO-002",
        ),
    ];

    for (store_error, category, code) in cases {
        let error = AppError::from(store_error);
        assert_eq!(error.category, category);
        assert_eq!(error.code, code);
    }
}

#[test]
fn test_from_io_and_anyhow() {
    let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
    let error = AppError::from(io);
    assert_eq!(error.category, ErrorCategory::IoError);
    assert!(!error.recovery_suggestions.is_empty());

    let error = AppError::from(anyhow::anyhow!("boom"));
    assert_eq!(error.category, ErrorCategory::InternalError);
    assert_eq!(error.message, "boom");
}

#[test]
fn test_app_error_survives_anyhow_roundtrip() {
    let original = AppError::new(ErrorCategory::NotFoundError, "missing").with_code("STORE-404");
    let wrapped: anyhow::Error = original.into();

    let recovered = wrapped.downcast_ref::<AppError>().unwrap();
    assert!(recovered.is(ErrorCategory::NotFoundError));
    assert_eq!(recovered.code, "STORE-404");
}

#[test]
fn test_reporter_does_not_panic_without_subscriber() {
    let reporter = DefaultErrorReporter::new();
    let error = AppError::new(ErrorCategory::StorageError, "upload failed")
        .with_suggestion("Check bucket permissions");

    reporter.report_error(&error);
    reporter.report_warning("slow upload", Some("bucket=b".to_string()));
    reporter.report_warning("slow upload", None);
}

#[test]
fn test_warning_severity_is_reported() {
    let reporter = DefaultErrorReporter::new();
    let warning = AppError::new(ErrorCategory::ConfigurationError, "no docs bucket")
        .with_code("POD-CFG-003")
        .with_severity(ErrorSeverity::Warning);

    assert_eq!(warning.severity(), ErrorSeverity::Warning);
    assert_eq!(warning.code, "POD-CFG-003");
    reporter.report_error(&warning);
}
