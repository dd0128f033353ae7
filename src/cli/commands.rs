use crate::{
    cli::args::{BundleDocsArgs, DbtPodArgs, PodArgs, RenderFormat, StoreKind},
    core::{
        AppError, ConfigLoader, DbtJobSpec, DbtPodConfig, DocsBundler, ErrorCategory, GcsStore,
        JobSpec, LocalStore, ObjectStore, PodConfigBuilder, RunnableStepConfig,
    },
    utils::serialization::{FileSerializer, FileUtils, JsonSerializer, Serializer, YamlSerializer},
    Result,
};
use anyhow::{anyhow, Context};
use serde::Serialize;
use serde_json::{Map, Value};
use std::io::Write;
use std::path::Path;
use std::sync::Arc;

pub async fn pod(args: PodArgs, config_path: Option<&Path>) -> Result<()> {
    let config = ConfigLoader::load(config_path)?;
    let spec: JobSpec = FileUtils
        .load_from_file(&args.spec, &YamlSerializer)
        .context("failed to load job spec")?;
    tracing::info!(task_id = %spec.task_id, doc_dirs = spec.doc_dirs.len(), "building pod step");

    let step = PodConfigBuilder::new(&config).build(spec);
    emit_step(&step, &args)
}

pub async fn dbt_pod(args: DbtPodArgs, config_path: Option<&Path>) -> Result<()> {
    let config = ConfigLoader::load(config_path)?;
    let mut spec: DbtJobSpec = FileUtils
        .load_from_file(&args.pod.spec, &YamlSerializer)
        .context("failed to load dbt job spec")?;

    if args.no_capture_docs {
        spec.capture_docs = false;
    }
    if args.json_logs {
        spec.json_logs = true;
    }
    if !args.vars.is_empty() {
        spec.dbt_vars = Some(merge_vars(spec.dbt_vars.take(), &args.vars)?);
    }
    tracing::info!(
        task_id = %spec.job.task_id,
        capture_docs = spec.capture_docs,
        "building dbt pod step"
    );

    let step = DbtPodConfig::new(&config).build(spec)?;
    emit_step(&step, &args.pod)
}

pub async fn bundle_docs(args: BundleDocsArgs, config_path: Option<&Path>) -> Result<()> {
    let config = ConfigLoader::load(config_path)?;
    let bucket = args
        .bucket
        .or_else(|| config.environment.gcs_docs_bucket.clone())
        .ok_or_else(|| {
            AppError::new(ErrorCategory::ConfigurationError, "no docs bucket configured")
                .with_code("CFG-VAL-005")
                .with_suggestion("Pass --bucket or set AIRFLOW_VAR_GCS_DOCS_BUCKET")
        })?;

    let store: Arc<dyn ObjectStore> = match args.store {
        StoreKind::Gcs => Arc::new(GcsStore::from_config(&config.storage).map_err(AppError::from)?),
        StoreKind::Local => Arc::new(LocalStore::new(args.root)),
    };

    let report = DocsBundler::new(store).bundle(&bucket, &args.prefix).await?;
    write_stdout(&JsonSerializer.serialize(&report)?)
}

pub async fn env() -> Result<()> {
    println!("Supported environment variables:");
    for line in ConfigLoader::env_var_documentation() {
        println!("  {}", line);
    }
    Ok(())
}

/// Combine `--var` pairs into the job's vars mapping; command-line values win.
fn merge_vars(existing: Option<Value>, pairs: &[(String, String)]) -> Result<Value> {
    let mut vars = match existing {
        None | Some(Value::Null) => Map::new(),
        Some(Value::Object(map)) => map,
        Some(_) => return Err(anyhow!("dbt_vars must be a mapping to combine with --var")),
    };
    for (key, raw) in pairs {
        let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.clone()));
        vars.insert(key.clone(), value);
    }
    Ok(Value::Object(vars))
}

fn emit_step(step: &RunnableStepConfig, args: &PodArgs) -> Result<()> {
    if args.manifest {
        render(&step.to_pod(), args)
    } else {
        render(step, args)
    }
}

fn render<T: Serialize>(value: &T, args: &PodArgs) -> Result<()> {
    match (args.format, &args.output) {
        (RenderFormat::Yaml, Some(path)) => FileUtils.save_to_file(path, value, &YamlSerializer),
        (RenderFormat::Json, Some(path)) => FileUtils.save_to_file(path, value, &JsonSerializer),
        (RenderFormat::Yaml, None) => write_stdout(&YamlSerializer.serialize(value)?),
        (RenderFormat::Json, None) => write_stdout(&JsonSerializer.serialize(value)?),
    }
}

fn write_stdout(bytes: &[u8]) -> Result<()> {
    let mut stdout = std::io::stdout().lock();
    stdout.write_all(bytes)?;
    stdout.flush()?;
    Ok(())
}
