#![allow(clippy::result_large_err)]

use super::{tokens, JobSpec, PodConfigBuilder, RunnableStepConfig};
use crate::core::config::ComposerConfig;
use crate::core::error::{AppError, DefaultErrorReporter, ErrorReporter};
use crate::core::types::{ErrorCategory, ErrorSeverity};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const DBT_VARS: &str = "DBT_VARS";
pub const DBT_USE_COLORS: &str = "DBT_USE_COLORS";
pub const DBT_SEND_ANONYMOUS_USAGE_STATS: &str = "DBT_SEND_ANONYMOUS_USAGE_STATS";
pub const DBT_LOG_FORMAT: &str = "DBT_LOG_FORMAT";

pub const CUSTOM_ENV_PROJECT_ID: &str = "DBT_ENV_CUSTOM_ENV_PROJECT_ID";
pub const CUSTOM_ENV_REGION: &str = "DBT_ENV_CUSTOM_ENV_REGION";
pub const CUSTOM_ENV_BQ_LOCATION: &str = "DBT_ENV_CUSTOM_ENV_BQ_LOCATION";
pub const CUSTOM_ENV_GCS_DOCS_BUCKET: &str = "DBT_ENV_CUSTOM_ENV_GCS_DOCS_BUCKET";
pub const CUSTOM_ENV_AIRFLOW_BASE_URL: &str = "DBT_ENV_CUSTOM_ENV_AIRFLOW_BASE_URL";
pub const CUSTOM_ENV_AIRFLOW_CTX_TASK_ID: &str = "DBT_ENV_CUSTOM_ENV_AIRFLOW_CTX_TASK_ID";
pub const CUSTOM_ENV_AIRFLOW_CTX_DAG_ID: &str = "DBT_ENV_CUSTOM_ENV_AIRFLOW_CTX_DAG_ID";
pub const CUSTOM_ENV_AIRFLOW_CTX_EXECUTION_DATE: &str =
    "DBT_ENV_CUSTOM_ENV_AIRFLOW_CTX_EXECUTION_DATE";

/// A dbt job: the generic job plus dbt-specific switches.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DbtJobSpec {
    #[serde(flatten)]
    pub job: JobSpec,

    /// Passed to dbt as `--vars` through the DBT_VARS variable
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dbt_vars: Option<Value>,

    /// Mount dbt's target and log directories on the docs bucket
    #[serde(default = "default_capture_docs")]
    pub capture_docs: bool,

    /// Ask dbt for JSON structured logs
    #[serde(default)]
    pub json_logs: bool,
}

fn default_capture_docs() -> bool {
    true
}

impl DbtJobSpec {
    pub fn new(job: JobSpec) -> Self {
        DbtJobSpec {
            job,
            dbt_vars: None,
            capture_docs: default_capture_docs(),
            json_logs: false,
        }
    }
}

/// Layers the dbt environment and document directories over
/// [`PodConfigBuilder`].
pub struct DbtPodConfig<'a> {
    config: &'a ComposerConfig,
    base: PodConfigBuilder<'a>,
}

impl<'a> DbtPodConfig<'a> {
    pub fn new(config: &'a ComposerConfig) -> Self {
        Self {
            config,
            base: PodConfigBuilder::new(config),
        }
    }

    pub fn build(&self, spec: DbtJobSpec) -> Result<RunnableStepConfig, AppError> {
        let encoded = match &spec.dbt_vars {
            Some(vars) => encode_vars(vars)?,
            None => None,
        };
        Ok(self.assemble(spec, encoded))
    }

    /// Same as [`build`](Self::build) but takes the vars payload from any
    /// serializable value, overriding `spec.dbt_vars`.
    pub fn build_with_vars<V: Serialize + ?Sized>(
        &self,
        spec: DbtJobSpec,
        vars: &V,
    ) -> Result<RunnableStepConfig, AppError> {
        let encoded = encode_vars(vars)?;
        Ok(self.assemble(spec, encoded))
    }

    fn assemble(&self, spec: DbtJobSpec, encoded_vars: Option<String>) -> RunnableStepConfig {
        let DbtJobSpec {
            mut job,
            capture_docs,
            json_logs,
            ..
        } = spec;

        let env = &mut job.env_vars;
        if let Some(vars) = encoded_vars {
            env.insert(DBT_VARS.to_string(), vars);
        }

        // Airflow does not render ANSI colours
        set_default(env, DBT_USE_COLORS, "false");
        set_default(env, DBT_SEND_ANONYMOUS_USAGE_STATS, "false");
        if json_logs {
            set_default(env, DBT_LOG_FORMAT, "json");
        }

        // dbt embeds DBT_ENV_CUSTOM_ENV_* into run_results.json and its logs.
        let environment = &self.config.environment;
        for (key, configured, variable) in [
            (CUSTOM_ENV_PROJECT_ID, &environment.project_id, "PROJECT_ID"),
            (CUSTOM_ENV_REGION, &environment.region, "REGION"),
            (CUSTOM_ENV_BQ_LOCATION, &environment.bq_location, "BQ_LOCATION"),
            (
                CUSTOM_ENV_GCS_DOCS_BUCKET,
                &environment.gcs_docs_bucket,
                "GCS_DOCS_BUCKET",
            ),
        ] {
            let value = configured
                .clone()
                .unwrap_or_else(|| tokens::variable(variable));
            env.insert(key.to_string(), value);
        }

        env.insert(
            CUSTOM_ENV_AIRFLOW_BASE_URL.to_string(),
            environment.airflow_base_url.clone().unwrap_or_default(),
        );
        env.insert(
            CUSTOM_ENV_AIRFLOW_CTX_TASK_ID.to_string(),
            job.task_ref.clone(),
        );
        env.insert(
            CUSTOM_ENV_AIRFLOW_CTX_DAG_ID.to_string(),
            job.workflow_id.clone(),
        );
        env.insert(
            CUSTOM_ENV_AIRFLOW_CTX_EXECUTION_DATE.to_string(),
            job.execution_ts.clone(),
        );

        if capture_docs {
            let docs = &self.config.docs;
            for dir in [&docs.build_output_dir, &docs.log_dir] {
                if job.doc_dirs.contains(dir) {
                    // Kept as-is: the pod will carry two mounts on the same path.
                    DefaultErrorReporter::new().report_error(
                        &AppError::new(
                            ErrorCategory::ConfigurationError,
                            "document directory already requested by caller; mounting it twice",
                        )
                        .with_code("POD-CFG-002")
                        .with_severity(ErrorSeverity::Warning)
                        .with_context("task_id", job.task_id.clone())
                        .with_context("doc_dir", dir.clone()),
                    );
                }
                job.doc_dirs.push(dir.clone());
            }
        }

        self.base.build(job)
    }
}

fn set_default(env: &mut super::EnvVars, key: &str, value: &str) {
    env.entry(key.to_string())
        .or_insert_with(|| value.to_string());
}

/// Empty payloads are skipped so dbt falls back to its project vars.
fn encode_vars<V: Serialize + ?Sized>(vars: &V) -> Result<Option<String>, AppError> {
    let value = serde_json::to_value(vars).map_err(|err| {
        AppError::with_source(
            ErrorCategory::ConfigurationError,
            format!("dbt_vars cannot be encoded as JSON: {}", err),
            Box::new(err),
        )
        .with_code("POD-CFG-001")
    })?;

    let empty = match &value {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::String(text) => text.is_empty(),
        _ => false,
    };
    if empty {
        return Ok(None);
    }
    Ok(Some(value.to_string()))
}
