use super::RunnableStepConfig;
use k8s_openapi::api::core::v1::{Container, EnvVar, Pod, PodSpec};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use std::collections::BTreeMap;

/// Name of the main container, as the Airflow pod launcher names it.
pub const BASE_CONTAINER_NAME: &str = "base";

impl RunnableStepConfig {
    /// Render the step as the Pod the launcher would create, for review and
    /// dry runs. Airflow templates stay unrendered.
    pub fn to_pod(&self) -> Pod {
        let env: Vec<EnvVar> = self
            .env_vars
            .iter()
            .map(|(name, value)| EnvVar {
                name: name.clone(),
                value: Some(value.clone()),
                ..Default::default()
            })
            .collect();

        let container = Container {
            name: BASE_CONTAINER_NAME.to_string(),
            image: Some(self.image.clone()),
            image_pull_policy: Some(self.image_pull_policy.clone()),
            command: non_empty(self.cmds.clone()),
            args: non_empty(self.arguments.clone()),
            env: non_empty(env),
            volume_mounts: non_empty(self.volume_mounts.clone()),
            ..Default::default()
        };

        let mut labels = BTreeMap::new();
        labels.insert("task_id".to_string(), pod_name(&self.task_id));

        Pod {
            metadata: ObjectMeta {
                name: Some(pod_name(&self.name)),
                namespace: Some(self.namespace.clone()),
                labels: Some(labels),
                annotations: if self.annotations.is_empty() {
                    None
                } else {
                    Some(self.annotations.clone())
                },
                ..Default::default()
            },
            spec: Some(PodSpec {
                containers: vec![container],
                volumes: non_empty(self.volumes.clone()),
                restart_policy: Some("Never".to_string()),
                ..Default::default()
            }),
            status: None,
        }
    }
}

fn non_empty<T>(items: Vec<T>) -> Option<Vec<T>> {
    if items.is_empty() {
        None
    } else {
        Some(items)
    }
}

/// DNS-1123 label form of a task or pod name.
pub fn pod_name(raw: &str) -> String {
    let mut name: String = raw
        .to_lowercase()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '-' })
        .collect();
    name.truncate(63);
    let name = name.trim_matches('-');
    if name.is_empty() {
        "pod".to_string()
    } else {
        name.to_string()
    }
}
