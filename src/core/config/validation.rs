#![allow(clippy::result_large_err)]

use super::ComposerConfig;
use crate::core::error::AppError;
use crate::core::types::ErrorCategory;
use url::Url;

pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate configuration rules
    pub fn validate(config: &ComposerConfig) -> Result<(), AppError> {
        let pod = &config.pod;
        for (field, value) in [
            ("pod.namespace", &pod.namespace),
            ("pod.config_file", &pod.config_file),
            ("pod.kubernetes_conn_id", &pod.kubernetes_conn_id),
            ("pod.image_pull_policy", &pod.image_pull_policy),
            ("pod.volume_name", &pod.volume_name),
            ("pod.csi_driver", &pod.csi_driver),
        ] {
            if value.trim().is_empty() {
                return Err(invalid("CFG-VAL-001", format!("{} cannot be empty", field)));
            }
        }

        for (field, dir) in [
            ("docs.build_output_dir", &config.docs.build_output_dir),
            ("docs.log_dir", &config.docs.log_dir),
        ] {
            if !dir.starts_with('/') {
                return Err(invalid(
                    "CFG-VAL-002",
                    format!("{} must be an absolute container path, got '{}'", field, dir),
                ));
            }
        }

        if let Some(base_url) = &config.environment.airflow_base_url {
            Url::parse(base_url).map_err(|err| {
                invalid(
                    "CFG-VAL-003",
                    format!("environment.airflow_base_url is not a valid URL: {}", err),
                )
            })?;
        }

        Url::parse(&config.storage.gcs_endpoint).map_err(|err| {
            invalid(
                "CFG-VAL-003",
                format!("storage.gcs_endpoint is not a valid URL: {}", err),
            )
        })?;

        if config.storage.request_timeout().is_none() {
            return Err(invalid(
                "CFG-VAL-004",
                format!(
                    "storage.request_timeout '{}' is not a valid duration",
                    config.storage.request_timeout
                ),
            ));
        }

        Ok(())
    }
}

fn invalid(code: &str, message: String) -> AppError {
    AppError::new(ErrorCategory::ValidationError, message).with_code(code)
}
