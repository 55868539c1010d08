use thiserror::Error;

/// Errors surfaced by a backend before or instead of a [`super::TransferResult`].
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("{program} not found in PATH (install it with your package manager)")]
    ToolNotFound { program: String },

    #[error("destination host is required")]
    MissingHost,

    #[error("destination path is required")]
    MissingPath,

    #[error("at least one source is required")]
    NoSources,

    #[error("source path cannot be empty")]
    EmptySourcePath,

    #[error("transfer cancelled")]
    Cancelled,
}
