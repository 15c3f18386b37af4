use thiserror::Error;

/// Failures that leave a run without any meaningful calendar to produce.
///
/// Everything recoverable (an unreadable option label, a malformed week
/// token, a row without a weekday) is filtered out where it is found and
/// never surfaces here.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// Required page context is missing or invalid, e.g. no semester chosen.
    #[error("{0}")]
    Configuration(String),

    /// Decoding produced zero events.
    #[error("No sessions found.")]
    EmptyResult,
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
