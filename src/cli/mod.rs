pub mod args;
pub mod commands;

pub use args::{BundleDocsArgs, DbtPodArgs, PodArgs, RenderFormat, StoreKind};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

const HELP_TEMPLATE: &str = "\
{name} {version}\n\
{about-with-newline}\n\
USAGE:\n    {usage}\n\
\nOPTIONS:\n{options}\n\
STEP COMMANDS:\n{subcommands}\n";

#[derive(Parser)]
#[command(name = "composer-dbt")]
#[command(version = crate::VERSION)]
#[command(about = "Pod step configuration and static dbt docs for Cloud Composer")]
#[command(help_template = HELP_TEMPLATE)]
#[command(
    after_long_help = "Typical flow: render a dbt-pod step for the DAG, let it run `dbt docs generate`, then bundle-docs into a single static page."
)]
pub struct Args {
    /// Configuration file (default: ./composer.toml when present)
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    #[command(
        about = "Render the runnable-step configuration for a job",
        long_about = "Pod reads a job spec (YAML or JSON) and prints the configuration handed to the pod operator, mounting every document directory on the docs bucket.",
        after_help = "Example:\n    composer-dbt pod job.yaml --format json"
    )]
    Pod(PodArgs),
    #[command(
        about = "Render a dbt step configuration",
        long_about = "Dbt-pod adds the dbt environment (vars, colours, run metadata) and mounts dbt's target and log directories on the docs bucket.",
        after_help = "Example:\n    composer-dbt dbt-pod dbt_job.yaml --var start_date=2024-01-01"
    )]
    DbtPod(DbtPodArgs),
    #[command(
        about = "Inline manifest and catalog into a static docs page",
        long_about = "Bundle-docs reads manifest.json, catalog.json and index.html under a prefix and writes static_index.html next to them.",
        after_help = "Example:\n    composer-dbt bundle-docs --bucket my-docs --prefix 'dag/task/2024-01-01T00:00:00+00:00/dbt/target/'"
    )]
    BundleDocs(BundleDocsArgs),
    #[command(about = "List supported environment variables")]
    Env,
}

impl Command {
    /// Whether the command prints its result on stdout.
    pub fn writes_document_to_stdout(&self) -> bool {
        match self {
            Command::Pod(args) => args.output.is_none(),
            Command::DbtPod(args) => args.pod.output.is_none(),
            Command::BundleDocs(_) | Command::Env => true,
        }
    }
}

pub async fn run(args: Args) -> crate::Result<()> {
    let config_path = args.config;
    match args.command {
        Command::Pod(pod_args) => commands::pod(pod_args, config_path.as_deref()).await,
        Command::DbtPod(dbt_args) => commands::dbt_pod(dbt_args, config_path.as_deref()).await,
        Command::BundleDocs(bundle_args) => {
            commands::bundle_docs(bundle_args, config_path.as_deref()).await
        }
        Command::Env => commands::env().await,
    }
}
