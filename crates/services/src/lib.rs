#![forbid(unsafe_code)]

pub mod error;
pub mod sessions;

pub use quiz_core::Clock;
pub use sessions as session;

pub use error::{RegistrationError, SessionError};
pub use sessions::{
    AnswerChange, AnswerPersister, Navigation, QuestionNavItem, QuizSession, QuizSessionService,
    RecordOutcome, Registration, Screen, SessionPhase, SessionView, SubmitReview,
};
