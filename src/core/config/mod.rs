use serde::{Deserialize, Serialize};

/// Process-wide configuration loaded from composer.toml.
///
/// Resolved once at start and treated as immutable afterwards; components
/// receive it by shared reference.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct ComposerConfig {
    /// Values the scheduler environment exposes as Airflow variables
    #[serde(default)]
    pub environment: EnvironmentConfig,

    /// Fixed pod launcher settings
    #[serde(default)]
    pub pod: PodDefaults,

    /// dbt document capture settings
    #[serde(default)]
    pub docs: DocsConfig,

    /// Object storage client settings
    #[serde(default)]
    pub storage: StorageConfig,
}

/// Identifiers describing the Composer environment.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct EnvironmentConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,

    /// BigQuery dataset location
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bq_location: Option<String>,

    /// Bucket that receives captured document directories
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gcs_docs_bucket: Option<String>,

    /// Public URL of the Airflow webserver
    #[serde(skip_serializing_if = "Option::is_none")]
    pub airflow_base_url: Option<String>,

    /// Container registry hosting job images
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repo: Option<String>,
}

/// Settings every pod step receives regardless of the job.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PodDefaults {
    #[serde(default = "default_namespace")]
    pub namespace: String,

    /// Kube config used by the Composer pod launcher
    #[serde(default = "default_config_file")]
    pub config_file: String,

    #[serde(default = "default_kubernetes_conn_id")]
    pub kubernetes_conn_id: String,

    #[serde(default = "default_image_pull_policy")]
    pub image_pull_policy: String,

    /// Name of the bucket-backed volume shared by all document mounts
    #[serde(default = "default_volume_name")]
    pub volume_name: String,

    #[serde(default = "default_csi_driver")]
    pub csi_driver: String,

    /// gcsfuse mount options, joined with commas on the volume
    #[serde(default = "default_mount_options")]
    pub mount_options: Vec<String>,
}

/// Directories dbt writes its artifacts and logs to.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DocsConfig {
    #[serde(default = "default_build_output_dir")]
    pub build_output_dir: String,

    #[serde(default = "default_log_dir")]
    pub log_dir: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StorageConfig {
    /// Base URL of the Cloud Storage JSON API
    #[serde(default = "default_gcs_endpoint")]
    pub gcs_endpoint: String,

    /// Base URL of the GCE metadata server used for access tokens
    #[serde(default = "default_metadata_endpoint")]
    pub metadata_endpoint: String,

    /// Per-request timeout, humantime format (e.g. "30s")
    #[serde(default = "default_request_timeout")]
    pub request_timeout: String,
}

fn default_namespace() -> String {
    "composer-user-workloads".to_string()
}

fn default_config_file() -> String {
    "/home/airflow/composer_kube_config".to_string()
}

fn default_kubernetes_conn_id() -> String {
    "kubernetes_default".to_string()
}

fn default_image_pull_policy() -> String {
    "Always".to_string()
}

fn default_volume_name() -> String {
    "docs-bucket".to_string()
}

fn default_csi_driver() -> String {
    "gcsfuse.csi.storage.gke.io".to_string()
}

fn default_mount_options() -> Vec<String> {
    vec![
        "implicit-dirs".to_string(),
        "file-mode=0666".to_string(),
        "dir-mode=0777".to_string(),
    ]
}

fn default_build_output_dir() -> String {
    "/dbt/target".to_string()
}

fn default_log_dir() -> String {
    "/dbt/logs".to_string()
}

fn default_gcs_endpoint() -> String {
    "https://storage.googleapis.com".to_string()
}

fn default_metadata_endpoint() -> String {
    "http://metadata.google.internal".to_string()
}

fn default_request_timeout() -> String {
    "30s".to_string()
}

impl Default for PodDefaults {
    fn default() -> Self {
        PodDefaults {
            namespace: default_namespace(),
            config_file: default_config_file(),
            kubernetes_conn_id: default_kubernetes_conn_id(),
            image_pull_policy: default_image_pull_policy(),
            volume_name: default_volume_name(),
            csi_driver: default_csi_driver(),
            mount_options: default_mount_options(),
        }
    }
}

impl Default for DocsConfig {
    fn default() -> Self {
        DocsConfig {
            build_output_dir: default_build_output_dir(),
            log_dir: default_log_dir(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        StorageConfig {
            gcs_endpoint: default_gcs_endpoint(),
            metadata_endpoint: default_metadata_endpoint(),
            request_timeout: default_request_timeout(),
        }
    }
}

impl StorageConfig {
    /// Parsed request timeout; validation guarantees this succeeds for loaded configs.
    pub fn request_timeout(&self) -> Option<std::time::Duration> {
        humantime::parse_duration(&self.request_timeout).ok()
    }
}


pub mod loader;
pub mod validation;

pub use loader::ConfigLoader;
pub use validation::ConfigValidator;
