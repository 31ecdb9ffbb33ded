//! Shared error types for the services crate.

use thiserror::Error;

use quiz_core::model::{AnswerError, IdentityError, Location, QuestionId};
use storage::StorageError;

use crate::sessions::SessionPhase;

/// Errors emitted by the quiz session controller.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SessionError {
    #[error("a quiz must have at least one question")]
    Empty,
    #[error("quiz already submitted")]
    Submitted,
    #[error("cannot {action} while {phase:?}")]
    InvalidTransition {
        phase: SessionPhase,
        action: &'static str,
    },
    #[error("question {0} is not part of this quiz")]
    QuestionNotFound(QuestionId),
    #[error(transparent)]
    Answer(#[from] AnswerError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl SessionError {
    /// Whether the error is a validation refusal of the participant's input.
    #[must_use]
    pub fn is_rejection(&self) -> bool {
        matches!(self, SessionError::Answer(_))
    }
}

/// Errors emitted while registering or resuming a participant.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum RegistrationError {
    #[error(transparent)]
    Identity(#[from] IdentityError),
    #[error("Quiz is currently closed for {location}. Please contact admin.")]
    QuizClosed { location: Location },
    #[error("{message}")]
    Rejected { message: String },
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error(transparent)]
    Storage(StorageError),
}

impl From<StorageError> for RegistrationError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::Rejected(message) => RegistrationError::Rejected { message },
            other => RegistrationError::Storage(other),
        }
    }
}
