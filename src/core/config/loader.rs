#![allow(clippy::result_large_err)]

use super::ComposerConfig;
use crate::core::config::ConfigValidator;
use crate::core::error::AppError;
use crate::core::types::ErrorCategory;
use std::env;
use std::path::{Path, PathBuf};

/// File name looked up in the working directory when no explicit path is given.
pub const CONFIG_FILE_NAME: &str = "composer.toml";

pub struct ConfigLoader;

impl ConfigLoader {
    /// Resolve the process configuration: defaults, then the config file,
    /// then environment variables. The result is validated before returning.
    pub fn load(explicit_path: Option<&Path>) -> Result<ComposerConfig, AppError> {
        let path = match explicit_path {
            Some(path) => {
                if !path.exists() {
                    return Err(AppError::new(
                        ErrorCategory::IoError,
                        format!("Config file {} does not exist", path.display()),
                    )
                    .with_code("CFG-IO-001"));
                }
                path.to_path_buf()
            }
            None => Self::default_path(),
        };

        let mut config = Self::load_from_file(&path)?.unwrap_or_default();
        Self::apply_env_overrides(&mut config);
        ConfigValidator::validate(&config)?;

        tracing::debug!(
            path = %path.display(),
            project_id = config.environment.project_id.as_deref().unwrap_or("-"),
            docs_bucket = config.environment.gcs_docs_bucket.as_deref().unwrap_or("-"),
            "configuration resolved"
        );
        Ok(config)
    }

    pub fn default_path() -> PathBuf {
        env::current_dir()
            .map(|cwd| cwd.join(CONFIG_FILE_NAME))
            .unwrap_or_else(|_| PathBuf::from(CONFIG_FILE_NAME))
    }

    /// Load config from specific file path
    /// Returns Ok(None) if file doesn't exist
    pub fn load_from_file(path: &Path) -> Result<Option<ComposerConfig>, AppError> {
        if !path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(path).map_err(|e| {
            AppError::new(
                ErrorCategory::IoError,
                format!("Failed to read config file {}: {}", path.display(), e),
            )
        })?;

        let config: ComposerConfig = toml::from_str(&content).map_err(|e| {
            AppError::new(
                ErrorCategory::ValidationError,
                format!("Failed to parse config file {}: {}", path.display(), e),
            )
            .with_code("CFG-VAL-000")
        })?;

        Ok(Some(config))
    }

    /// Environment variables take precedence over config file values.
    /// Empty values are treated as unset, matching how Composer exports
    /// variables that were declared but never filled in.
    fn apply_env_overrides(config: &mut ComposerConfig) {
        let environment = &mut config.environment;
        override_opt(&mut environment.project_id, "AIRFLOW_VAR_PROJECT_ID");
        override_opt(&mut environment.region, "AIRFLOW_VAR_REGION");
        override_opt(&mut environment.bq_location, "AIRFLOW_VAR_BQ_LOCATION");
        override_opt(
            &mut environment.gcs_docs_bucket,
            "AIRFLOW_VAR_GCS_DOCS_BUCKET",
        );
        override_opt(
            &mut environment.airflow_base_url,
            "AIRFLOW__WEBSERVER__BASE_URL",
        );
        override_opt(&mut environment.repo, "AIRFLOW_VAR_REPO");

        if let Some(namespace) = non_empty_var("COMPOSER_DBT_NAMESPACE") {
            config.pod.namespace = namespace;
        }

        if let Some(endpoint) = non_empty_var("COMPOSER_DBT_GCS_ENDPOINT") {
            config.storage.gcs_endpoint = endpoint;
        }

        if let Some(timeout) = non_empty_var("COMPOSER_DBT_REQUEST_TIMEOUT") {
            config.storage.request_timeout = timeout;
        }
    }

    /// Get documentation for supported environment variables
    pub fn env_var_documentation() -> &'static [&'static str] {
        &[
            "AIRFLOW_VAR_PROJECT_ID - Google Cloud project of the Composer environment",
            "AIRFLOW_VAR_REGION - Region of the Composer environment",
            "AIRFLOW_VAR_BQ_LOCATION - BigQuery location dbt builds into",
            "AIRFLOW_VAR_GCS_DOCS_BUCKET - Bucket receiving captured document directories",
            "AIRFLOW_VAR_REPO - Container registry hosting job images",
            "AIRFLOW__WEBSERVER__BASE_URL - Airflow webserver URL embedded in dbt run metadata",
            "COMPOSER_DBT_NAMESPACE - Override pod namespace (default: composer-user-workloads)",
            "COMPOSER_DBT_GCS_ENDPOINT - Override Cloud Storage API endpoint (default: https://storage.googleapis.com)",
            "COMPOSER_DBT_REQUEST_TIMEOUT - Override storage request timeout (default: 30s)",
            "COMPOSER_DBT_LOG_LEVEL - Override default log level (default: info)",
            "COMPOSER_DBT_LOG_DIR - Write logs to this directory in addition to the console",
            "COMPOSER_DBT_LOG_FORMAT - Log line format, text or json (default: text)",
            "GCS_ACCESS_TOKEN - Bearer token for Cloud Storage; metadata server is used when unset",
        ]
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|value| !value.trim().is_empty())
}

fn override_opt(slot: &mut Option<String>, name: &str) {
    if let Some(value) = non_empty_var(name) {
        *slot = Some(value);
    }
}
