pub mod config;
pub mod docs;
pub mod error;
pub mod pod;
pub mod storage;
pub mod types;

pub use config::{ComposerConfig, ConfigLoader, ConfigValidator};
pub use docs::{BundleReport, DocsBundler};
pub use error::{AppError, DefaultErrorReporter, ErrorReporter};
pub use pod::{DbtJobSpec, DbtPodConfig, JobSpec, PodConfigBuilder, RunnableStepConfig};
pub use storage::{GcsStore, LocalStore, MemoryStore, ObjectStore, StoreError};
pub use types::{ErrorCategory, ErrorSeverity};
