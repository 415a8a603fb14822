//! Error taxonomy exposed to callers of the catalog subsystem.

use thiserror::Error;

use crate::musicbrainz::RemoteError;

/// Errors surfaced by the resolver and the rating aggregator.
///
/// The boundary layer maps these onto user-facing statuses; nothing in this
/// subsystem retries on its own.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// User-correctable input problem (bad rating value, unknown entity type).
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Entity absent both locally and remotely.
    #[error("not found")]
    NotFound,

    /// Timeout, network failure, non-2xx or unparseable payload from an
    /// external service.
    #[error("remote metadata service unavailable: {0}")]
    RemoteUnavailable(String),

    /// Store errors other than the benign duplicate-insert race.
    #[error("catalog store failure: {0}")]
    StoreFailure(#[from] anyhow::Error),

    /// The store could not provide the isolation the rating recompute
    /// requires. Not produced with the SQLite store, whose single guarded
    /// write connection serializes submissions.
    #[error("conflicting concurrent aggregation")]
    AggregationConflict,
}

impl From<RemoteError> for CatalogError {
    fn from(err: RemoteError) -> Self {
        match err {
            RemoteError::NotFound => CatalogError::NotFound,
            RemoteError::Unavailable(msg) => CatalogError::RemoteUnavailable(msg),
        }
    }
}

pub type CatalogResult<T> = Result<T, CatalogError>;
