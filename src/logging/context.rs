use crate::cli::Command;
use std::env;

/// Execution contexts that influence how logging is routed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExecutionContext {
    /// Running as a step inside a scheduler-launched pod; the scheduler
    /// captures container stdout.
    ScheduledPod,
    /// Interactive use from a developer terminal.
    Terminal,
}

/// Derive the active execution context from a parsed CLI command plus the
/// environment the process was started in.
pub fn detect_context(command: &Command) -> ExecutionContext {
    if let Command::Env = command {
        return ExecutionContext::Terminal;
    }

    if running_in_pod() {
        ExecutionContext::ScheduledPod
    } else {
        ExecutionContext::Terminal
    }
}

fn running_in_pod() -> bool {
    let forced = env::var("COMPOSER_DBT_SCHEDULED")
        .map(|value| value.trim() == "1")
        .unwrap_or(false);
    forced || env::var_os("KUBERNETES_SERVICE_HOST").is_some()
}
