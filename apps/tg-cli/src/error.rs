//! Error type for the command line front-end.

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("Document error: {0}")]
    Project(#[from] tg_project::ProjectError),

    #[error("Execution error: {0}")]
    Engine(#[from] tg_engine::EngineError),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

pub type CliResult<T> = Result<T, CliError>;
