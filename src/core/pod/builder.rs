use super::{JobSpec, RunnableStepConfig};
use crate::core::config::ComposerConfig;
use crate::core::error::{AppError, DefaultErrorReporter, ErrorReporter};
use crate::core::types::{ErrorCategory, ErrorSeverity};
use k8s_openapi::api::core::v1::{CSIVolumeSource, Volume, VolumeMount};
use std::collections::BTreeMap;

/// Annotation that turns on the GKE gcsfuse sidecar for the pod.
pub const GCSFUSE_ANNOTATION: &str = "gke-gcsfuse/volumes";

/// Builds the generic pod step configuration.
///
/// The docs-bucket mount (gcsfuse) only starts releasing the pod about 30
/// seconds after the main container exits; newer gcs-fuse-csi-driver releases
/// drop the delay but Composer/Autopilot may still ship the older one.
pub struct PodConfigBuilder<'a> {
    config: &'a ComposerConfig,
}

impl<'a> PodConfigBuilder<'a> {
    pub fn new(config: &'a ComposerConfig) -> Self {
        Self { config }
    }

    /// Bucket-relative directory shared by every mount of this invocation.
    pub fn sub_path_prefix(spec: &JobSpec) -> String {
        format!(
            "{}/{}/{}",
            spec.workflow_id, spec.task_ref, spec.execution_ts
        )
    }

    pub fn build(&self, spec: JobSpec) -> RunnableStepConfig {
        let prefix = Self::sub_path_prefix(&spec);
        let JobSpec {
            name,
            task_id,
            image,
            cmds,
            arguments,
            doc_dirs,
            env_vars,
            mut annotations,
            mut volumes,
            mut volume_mounts,
            ..
        } = spec;

        if !doc_dirs.is_empty() {
            annotations.insert(GCSFUSE_ANNOTATION.to_string(), "true".to_string());
            volumes.push(self.docs_volume());

            for doc_dir in &doc_dirs {
                volume_mounts.push(VolumeMount {
                    name: self.config.pod.volume_name.clone(),
                    mount_path: doc_dir.clone(),
                    sub_path: Some(format!("{}{}", prefix, doc_dir)),
                    read_only: Some(false),
                    ..Default::default()
                });
            }

            tracing::debug!(
                task_id = %task_id,
                mounts = doc_dirs.len(),
                sub_path = %prefix,
                "mounted document directories on docs bucket"
            );
        }

        let pod = &self.config.pod;
        RunnableStepConfig {
            name,
            task_id,
            image,
            cmds,
            arguments,
            env_vars,
            volumes,
            volume_mounts,
            annotations,
            namespace: pod.namespace.clone(),
            config_file: pod.config_file.clone(),
            kubernetes_conn_id: pod.kubernetes_conn_id.clone(),
            image_pull_policy: pod.image_pull_policy.clone(),
            get_logs: true,
            log_events_on_failure: true,
            is_delete_operator_pod: true,
        }
    }

    fn docs_volume(&self) -> Volume {
        let bucket = match &self.config.environment.gcs_docs_bucket {
            Some(bucket) => bucket.clone(),
            None => {
                DefaultErrorReporter::new().report_error(
                    &AppError::new(
                        ErrorCategory::ConfigurationError,
                        "no docs bucket configured; volume will be rejected at pod creation",
                    )
                    .with_code("POD-CFG-003")
                    .with_severity(ErrorSeverity::Warning)
                    .with_suggestion("Set AIRFLOW_VAR_GCS_DOCS_BUCKET or environment.gcs_docs_bucket"),
                );
                String::new()
            }
        };

        let mut attributes = BTreeMap::new();
        attributes.insert("bucketName".to_string(), bucket);
        attributes.insert(
            "mountOptions".to_string(),
            self.config.pod.mount_options.join(","),
        );

        Volume {
            name: self.config.pod.volume_name.clone(),
            csi: Some(CSIVolumeSource {
                driver: self.config.pod.csi_driver.clone(),
                read_only: Some(false),
                volume_attributes: Some(attributes),
                ..Default::default()
            }),
            ..Default::default()
        }
    }
}
