//! Late-bound scheduler expressions.
//!
//! These are rendered by Airflow when the task instance runs. This crate only
//! emits them as opaque strings and never evaluates them.

/// Workflow (DAG) identifier of the current run.
pub const WORKFLOW_ID: &str = "{{ dag_run.dag_id }}";

/// Task identifier of the current task instance.
pub const TASK_ID: &str = "{{ task.task_id }}";

/// Logical execution timestamp, ISO-8601 formatted.
pub const EXECUTION_TS: &str = "{{ execution_date | ts }}";

/// Reference to an Airflow variable, e.g. `{{ var.value.PROJECT_ID }}`.
pub fn variable(name: &str) -> String {
    format!("{{{{ var.value.{} }}}}", name)
}

pub(crate) fn workflow_id() -> String {
    WORKFLOW_ID.to_string()
}

pub(crate) fn task_id() -> String {
    TASK_ID.to_string()
}

pub(crate) fn execution_ts() -> String {
    EXECUTION_TS.to_string()
}
