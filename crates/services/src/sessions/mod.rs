mod persist;
mod progress;
mod service;
mod view;
mod workflow;

// Public API of the session subsystem.
pub use crate::error::{RegistrationError, SessionError};
pub use persist::AnswerPersister;
pub use progress::SubmitReview;
pub use service::{AnswerChange, QuizSession, SessionPhase};
pub use view::{QuestionNavItem, Screen, SessionView};
pub use workflow::{Navigation, QuizSessionService, RecordOutcome, Registration};
