use clap::Parser;
use composer_dbt::cli::{self, Args};
use composer_dbt::core::{AppError, DefaultErrorReporter, ErrorReporter};
use composer_dbt::logging;
use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    let _logging = match logging::init(&args) {
        Ok(guard) => Some(guard),
        Err(err) => {
            eprintln!("warning: logging disabled: {:#}", err);
            None
        }
    };

    match cli::run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            if let Some(app_error) = err.downcast_ref::<AppError>() {
                DefaultErrorReporter::new().report_error(app_error);
            }
            eprintln!("Error: {:#}", err);
            ExitCode::FAILURE
        }
    }
}
