use thiserror::Error;

/// Failure of a single outbound lookup.
///
/// Both variants are recoverable: callers move on to the next strategy.
#[derive(Debug, Error)]
pub enum LookupError {
    #[error("no result for '{0}'")]
    NotFound(String),

    #[error(transparent)]
    Upstream(#[from] anyhow::Error),
}

pub type LookupResult<T> = Result<T, LookupError>;
