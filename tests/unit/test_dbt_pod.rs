use composer_dbt::core::config::ComposerConfig;
use composer_dbt::core::pod::dbt::*;
use composer_dbt::core::pod::tokens;
use composer_dbt::core::types::ErrorCategory;
use composer_dbt::core::{DbtJobSpec, DbtPodConfig, JobSpec};
use serde_json::json;
use std::collections::HashMap;

fn configured() -> ComposerConfig {
    let mut config = ComposerConfig::default();
    config.environment.project_id = Some("analytics-prod".to_string());
    config.environment.region = Some("europe-west1".to_string());
    config.environment.bq_location = Some("EU".to_string());
    config.environment.gcs_docs_bucket = Some("analytics-docs".to_string());
    config.environment.airflow_base_url = Some("https://airflow.example.com".to_string());
    config
}

fn dbt_job() -> DbtJobSpec {
    DbtJobSpec::new(
        JobSpec::new("dbt_run", "europe-docker.pkg.dev/proj/repo/dbt:1.7")
            .with_cmds(JobSpec::dbt_shell(&["dbt run", "dbt docs generate --static"])),
    )
}

fn env(step: &composer_dbt::core::RunnableStepConfig, key: &str) -> Option<String> {
    step.env_vars.get(key).cloned()
}

#[test]
fn test_caller_values_win_for_dbt_defaults() {
    let config = configured();
    let mut spec = dbt_job();
    spec.job.env_vars.insert(DBT_USE_COLORS.to_string(), "true".to_string());

    let step = DbtPodConfig::new(&config).build(spec).unwrap();

    assert_eq!(env(&step, DBT_USE_COLORS).as_deref(), Some("true"));
    assert_eq!(
        env(&step, DBT_SEND_ANONYMOUS_USAGE_STATS).as_deref(),
        Some("false")
    );
    assert!(env(&step, DBT_LOG_FORMAT).is_none());
}

#[test]
fn test_metadata_overwrites_caller_values() {
    let config = configured();
    let mut spec = dbt_job();
    spec.job
        .env_vars
        .insert(CUSTOM_ENV_PROJECT_ID.to_string(), "spoofed".to_string());
    spec.job
        .env_vars
        .insert(CUSTOM_ENV_AIRFLOW_CTX_DAG_ID.to_string(), "spoofed".to_string());

    let step = DbtPodConfig::new(&config).build(spec).unwrap();

    assert_eq!(env(&step, CUSTOM_ENV_PROJECT_ID).as_deref(), Some("analytics-prod"));
    assert_eq!(env(&step, CUSTOM_ENV_REGION).as_deref(), Some("europe-west1"));
    assert_eq!(env(&step, CUSTOM_ENV_BQ_LOCATION).as_deref(), Some("EU"));
    assert_eq!(env(&step, CUSTOM_ENV_GCS_DOCS_BUCKET).as_deref(), Some("analytics-docs"));
    assert_eq!(
        env(&step, CUSTOM_ENV_AIRFLOW_BASE_URL).as_deref(),
        Some("https://airflow.example.com")
    );
    assert_eq!(
        env(&step, CUSTOM_ENV_AIRFLOW_CTX_DAG_ID).as_deref(),
        Some(tokens::WORKFLOW_ID)
    );
    assert_eq!(
        env(&step, CUSTOM_ENV_AIRFLOW_CTX_TASK_ID).as_deref(),
        Some(tokens::TASK_ID)
    );
    assert_eq!(
        env(&step, CUSTOM_ENV_AIRFLOW_CTX_EXECUTION_DATE).as_deref(),
        Some(tokens::EXECUTION_TS)
    );
}

#[test]
fn test_unconfigured_environment_falls_back_to_airflow_variables() {
    let config = ComposerConfig::default();

    let step = DbtPodConfig::new(&config).build(dbt_job()).unwrap();

    assert_eq!(
        env(&step, CUSTOM_ENV_PROJECT_ID).as_deref(),
        Some("{{ var.value.PROJECT_ID }}")
    );
    assert_eq!(
        env(&step, CUSTOM_ENV_GCS_DOCS_BUCKET).as_deref(),
        Some("{{ var.value.GCS_DOCS_BUCKET }}")
    );
    assert_eq!(env(&step, CUSTOM_ENV_AIRFLOW_BASE_URL).as_deref(), Some(""));
}

#[test]
fn test_dbt_vars_keep_key_order() {
    let config = configured();
    let mut spec = dbt_job();
    spec.dbt_vars = Some(json!({"zeta": 1, "alpha": "x"}));

    let step = DbtPodConfig::new(&config).build(spec).unwrap();

    assert_eq!(env(&step, DBT_VARS).as_deref(), Some(r#"{"zeta":1,"alpha":"x"}"#));
}

#[test]
fn test_empty_dbt_vars_are_skipped() {
    let config = configured();
    let mut spec = dbt_job();
    spec.dbt_vars = Some(json!({}));

    let step = DbtPodConfig::new(&config).build(spec).unwrap();

    assert!(env(&step, DBT_VARS).is_none());
}

#[test]
fn test_dbt_vars_keep_non_ascii_text() {
    let config = configured();
    let mut spec = dbt_job();
    spec.dbt_vars = Some(json!({"city": "Zürich"}));

    let step = DbtPodConfig::new(&config).build(spec).unwrap();

    assert_eq!(env(&step, DBT_VARS).as_deref(), Some(r#"{"city":"Zürich"}"#));
}

#[test]
fn test_zero_and_false_dbt_vars_are_emitted() {
    let config = configured();

    let mut spec = dbt_job();
    spec.dbt_vars = Some(json!(0));
    let step = DbtPodConfig::new(&config).build(spec).unwrap();
    assert_eq!(env(&step, DBT_VARS).as_deref(), Some("0"));

    let mut spec = dbt_job();
    spec.dbt_vars = Some(json!(false));
    let step = DbtPodConfig::new(&config).build(spec).unwrap();
    assert_eq!(env(&step, DBT_VARS).as_deref(), Some("false"));
}

#[test]
fn test_unserializable_vars_are_a_configuration_error() {
    let config = configured();
    let mut vars: HashMap<(u8, u8), &str> = HashMap::new();
    vars.insert((1, 2), "pair");

    let err = DbtPodConfig::new(&config)
        .build_with_vars(dbt_job(), &vars)
        .unwrap_err();

    assert_eq!(err.category, ErrorCategory::ConfigurationError);
    assert_eq!(err.code, "POD-CFG-001");
}

#[test]
fn test_capture_docs_mounts_target_and_logs() {
    let config = configured();

    let step = DbtPodConfig::new(&config).build(dbt_job()).unwrap();

    let paths: Vec<&str> = step
        .volume_mounts
        .iter()
        .map(|mount| mount.mount_path.as_str())
        .collect();
    assert_eq!(paths, vec!["/dbt/target", "/dbt/logs"]);
    assert_eq!(step.volumes.len(), 1);
}

#[test]
fn test_caller_dirs_come_before_dbt_dirs() {
    let config = configured();
    let mut spec = dbt_job();
    spec.job.doc_dirs.push("/dbt/seeds_out".to_string());

    let step = DbtPodConfig::new(&config).build(spec).unwrap();

    let paths: Vec<&str> = step
        .volume_mounts
        .iter()
        .map(|mount| mount.mount_path.as_str())
        .collect();
    assert_eq!(paths, vec!["/dbt/seeds_out", "/dbt/target", "/dbt/logs"]);
}

#[test]
fn test_duplicate_dirs_are_mounted_twice() {
    let config = configured();
    let mut spec = dbt_job();
    spec.job.doc_dirs.push("/dbt/target".to_string());

    let step = DbtPodConfig::new(&config).build(spec).unwrap();

    let target_mounts = step
        .volume_mounts
        .iter()
        .filter(|mount| mount.mount_path == "/dbt/target")
        .count();
    assert_eq!(target_mounts, 2);
    assert_eq!(step.volume_mounts.len(), 3);
}

#[test]
fn test_no_capture_docs_and_no_dirs_means_no_volume() {
    let config = configured();
    let mut spec = dbt_job();
    spec.capture_docs = false;

    let step = DbtPodConfig::new(&config).build(spec).unwrap();

    assert!(step.volumes.is_empty());
    assert!(step.volume_mounts.is_empty());
    assert!(step.annotations.is_empty());
    assert_eq!(env(&step, DBT_USE_COLORS).as_deref(), Some("false"));
}

#[test]
fn test_json_logs_is_a_default_only() {
    let config = configured();
    let mut spec = dbt_job();
    spec.json_logs = true;
    let step = DbtPodConfig::new(&config).build(spec).unwrap();
    assert_eq!(env(&step, DBT_LOG_FORMAT).as_deref(), Some("json"));

    let mut spec = dbt_job();
    spec.json_logs = true;
    spec.job
        .env_vars
        .insert(DBT_LOG_FORMAT.to_string(), "text".to_string());
    let step = DbtPodConfig::new(&config).build(spec).unwrap();
    assert_eq!(env(&step, DBT_LOG_FORMAT).as_deref(), Some("text"));
}

#[test]
fn test_spec_parses_from_yaml() {
    let yaml = r#"
name: dbt-daily
task_id: dbt_daily
image: "{{ var.value.REPO }}/dbt:latest"
cmds: ["/bin/bash", "-xc", "dbt run"]
dbt_vars:
  start_date: "2024-01-01"
json_logs: true
"#;
    let spec: DbtJobSpec = serde_yaml::from_str(yaml).unwrap();

    assert_eq!(spec.job.name, "dbt-daily");
    assert!(spec.capture_docs);
    assert!(spec.json_logs);
    assert_eq!(spec.job.workflow_id, tokens::WORKFLOW_ID);
    assert_eq!(spec.dbt_vars, Some(json!({"start_date": "2024-01-01"})));
}
