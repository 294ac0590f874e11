//! Error taxonomy for the traffic monitoring core.
//!
//! Query operations that match nothing return empty collections; only
//! malformed requests and store outages surface as errors.

use thiserror::Error;

/// Errors raised by store, query and ingest operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TmbError {
    /// Caller supplied a key of the wrong type or shape (e.g. a string MMSI)
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// A referenced port, tile or vessel does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// The underlying store could not serve the request
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    /// The underlying store did not answer within its busy timeout
    #[error("Store timed out: {0}")]
    Timeout(String),

    /// Ingestion payload could not be parsed into the expected shape
    #[error("Malformed input: {0}")]
    MalformedInput(String),
}

pub type TmbResult<T> = Result<T, TmbError>;

/// Outcome of a single-record insert.
///
/// Bulk pipelines inspect this and move on to the next record.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum InsertError {
    /// The record failed parsing or validation and was not written
    #[error("Record rejected: {0}")]
    Rejected(String),

    /// The record was valid but the store refused it
    #[error("Store failure: {0}")]
    Store(TmbError),
}

impl From<rusqlite::Error> for TmbError {
    fn from(err: rusqlite::Error) -> Self {
        use rusqlite::ErrorCode;

        match err.sqlite_error_code() {
            Some(ErrorCode::DatabaseBusy) | Some(ErrorCode::DatabaseLocked) => {
                TmbError::Timeout(err.to_string())
            }
            _ => TmbError::StoreUnavailable(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for TmbError {
    fn from(err: serde_json::Error) -> Self {
        TmbError::MalformedInput(err.to_string())
    }
}
