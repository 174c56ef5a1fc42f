use std::process::{ExitCode, Termination};

/// Errors of the knockout index operations.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum RgaError {
    #[error("Missing RGA indexes for study '{0}'")]
    MissingIndex(String),
    #[error("No results found")]
    NoResults,
    #[error("Cannot paginate further than {0} individuals. Please, narrow down your query.")]
    PaginationLimit(usize),
    #[error("Too many variants requested: {0} exceeds the maximum of {1}")]
    TooManyVariants(usize, usize),
}

impl Termination for RgaError {
    fn report(self) -> ExitCode {
        match self {
            RgaError::MissingIndex(_) => ExitCode::from(2),
            RgaError::NoResults => ExitCode::from(0),
            RgaError::PaginationLimit(_) | RgaError::TooManyVariants(_, _) => ExitCode::from(1),
        }
    }
}
