//! Pod step configuration for jobs launched by the Composer pod operator.
//!
//! [`PodConfigBuilder`] produces the generic configuration every step gets,
//! including the docs-bucket mounts. [`DbtPodConfig`] wraps it with the dbt
//! environment and document directories.

pub mod builder;
pub mod dbt;
pub mod manifest;
pub mod tokens;

pub use builder::PodConfigBuilder;
pub use dbt::{DbtJobSpec, DbtPodConfig};

use indexmap::IndexMap;
use k8s_openapi::api::core::v1::{Volume, VolumeMount};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Ordered environment record. Insertion order is kept so rendered
/// manifests list caller variables first.
pub type EnvVars = IndexMap<String, String>;

/// A unit of scheduled work as handed over by the DAG definition.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JobSpec {
    /// Pod name
    pub name: String,

    /// Airflow task id
    pub task_id: String,

    /// Image reference, may contain Airflow params templates
    pub image: String,

    #[serde(default)]
    pub cmds: Vec<String>,

    #[serde(default)]
    pub arguments: Vec<String>,

    /// Absolute container paths whose contents are kept in the docs bucket
    #[serde(default)]
    pub doc_dirs: Vec<String>,

    #[serde(default)]
    pub env_vars: EnvVars,

    #[serde(default)]
    pub annotations: BTreeMap<String, String>,

    #[serde(default)]
    pub volumes: Vec<Volume>,

    #[serde(default)]
    pub volume_mounts: Vec<VolumeMount>,

    /// Workflow identifier used in the bucket sub-path
    #[serde(default = "tokens::workflow_id")]
    pub workflow_id: String,

    /// Task identifier used in the bucket sub-path and run metadata
    #[serde(default = "tokens::task_id")]
    pub task_ref: String,

    /// Logical execution timestamp used in the bucket sub-path
    #[serde(default = "tokens::execution_ts")]
    pub execution_ts: String,
}

impl JobSpec {
    pub fn new<N: Into<String>, I: Into<String>>(task_id: N, image: I) -> Self {
        let task_id = task_id.into();
        JobSpec {
            name: task_id.clone(),
            task_id,
            image: image.into(),
            cmds: Vec::new(),
            arguments: Vec::new(),
            doc_dirs: Vec::new(),
            env_vars: EnvVars::new(),
            annotations: BTreeMap::new(),
            volumes: Vec::new(),
            volume_mounts: Vec::new(),
            workflow_id: tokens::workflow_id(),
            task_ref: tokens::task_id(),
            execution_ts: tokens::execution_ts(),
        }
    }

    pub fn with_cmds<I, S>(mut self, cmds: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.cmds = cmds.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_doc_dir<S: Into<String>>(mut self, dir: S) -> Self {
        self.doc_dirs.push(dir.into());
        self
    }

    pub fn with_env<K: Into<String>, V: Into<String>>(mut self, key: K, value: V) -> Self {
        self.env_vars.insert(key.into(), value.into());
        self
    }

    /// Command list running each step in sequence under `bash -x`, stopping
    /// at the first failure.
    pub fn dbt_shell(steps: &[&str]) -> Vec<String> {
        vec![
            "/bin/bash".to_string(),
            "-xc".to_string(),
            steps.join("&&"),
        ]
    }
}

/// Everything the scheduler's generic pod launcher needs to run one step.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunnableStepConfig {
    pub name: String,
    pub task_id: String,
    pub image: String,
    pub cmds: Vec<String>,
    pub arguments: Vec<String>,
    pub env_vars: EnvVars,
    pub volumes: Vec<Volume>,
    pub volume_mounts: Vec<VolumeMount>,
    pub annotations: BTreeMap<String, String>,
    pub namespace: String,
    pub config_file: String,
    pub kubernetes_conn_id: String,
    pub image_pull_policy: String,
    pub get_logs: bool,
    pub log_events_on_failure: bool,
    pub is_delete_operator_pod: bool,
}
