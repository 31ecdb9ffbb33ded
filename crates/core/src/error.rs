use thiserror::Error;

use crate::model::{AnswerError, IdentityError, ParseIdError, QuestionError};

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Identity(#[from] IdentityError),
    #[error(transparent)]
    Question(#[from] QuestionError),
    #[error(transparent)]
    Answer(#[from] AnswerError),
    #[error(transparent)]
    ParseId(#[from] ParseIdError),
}
