use clap::{Args, ValueEnum};
use std::path::PathBuf;

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum RenderFormat {
    #[default]
    Yaml,
    Json,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum StoreKind {
    /// Cloud Storage JSON API
    #[default]
    Gcs,
    /// Directory tree laid out as <root>/<bucket>/<key>
    Local,
}

#[derive(Args, Debug)]
pub struct PodArgs {
    /// Job spec file (YAML or JSON)
    #[arg(value_name = "SPEC")]
    pub spec: PathBuf,

    /// Output format
    #[arg(long, value_enum, default_value_t = RenderFormat::Yaml)]
    pub format: RenderFormat,

    /// Emit a Kubernetes Pod manifest instead of the operator configuration
    #[arg(long)]
    pub manifest: bool,

    /// Write to this file instead of stdout
    #[arg(long, short, value_name = "FILE")]
    pub output: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct DbtPodArgs {
    #[command(flatten)]
    pub pod: PodArgs,

    /// dbt variable, repeatable; VALUE is parsed as JSON when possible
    #[arg(long = "var", value_name = "KEY=VALUE", value_parser = parse_var)]
    pub vars: Vec<(String, String)>,

    /// Do not mount dbt's target and log directories on the docs bucket
    #[arg(long)]
    pub no_capture_docs: bool,

    /// Ask dbt for JSON structured logs
    #[arg(long)]
    pub json_logs: bool,
}

#[derive(Args, Debug)]
pub struct BundleDocsArgs {
    /// Bucket holding the docs (default: environment.gcs_docs_bucket)
    #[arg(long)]
    pub bucket: Option<String>,

    /// Object prefix, concatenated verbatim with each file name
    #[arg(long, default_value = "")]
    pub prefix: String,

    /// Storage backend
    #[arg(long, value_enum, default_value_t = StoreKind::Gcs)]
    pub store: StoreKind,

    /// Root directory for --store local
    #[arg(long, value_name = "DIR", default_value = ".")]
    pub root: PathBuf,
}

fn parse_var(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("expected KEY=VALUE, got '{}'", raw)),
    }
}
