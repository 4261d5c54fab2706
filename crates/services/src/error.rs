//! Shared error types for the services crate.

use thiserror::Error;

use practice_core::SequencerError;
use practice_core::model::LivesError;
use storage::repository::StorageError;

/// Errors raised while applying a store result to a practice session.
///
/// These never leave the session as `Err`; they are logged and turned into
/// learner-facing feedback.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SessionError {
    #[error(transparent)]
    Domain(#[from] practice_core::Error),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl From<LivesError> for SessionError {
    fn from(err: LivesError) -> Self {
        Self::Domain(err.into())
    }
}

impl From<SequencerError> for SessionError {
    fn from(err: SequencerError) -> Self {
        Self::Domain(err.into())
    }
}

/// Errors emitted by `SubjectOverview`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum OverviewError {
    #[error("Completa el Nivel {required_level} para desbloquear este contenido.")]
    Locked { level: u32, required_level: u32 },
}

/// Errors emitted by `AuthoringService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AuthoringError {
    #[error("no valid exercise lines to import")]
    NoValidLines,
    #[error("exercise row is incomplete or has an invalid answer letter")]
    InvalidRow,
    #[error(transparent)]
    Storage(#[from] StorageError),
}
