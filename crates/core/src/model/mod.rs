mod answer;
mod ids;
mod participant;
mod question;
mod session;

pub use answer::{Answer, AnswerError, AnswerInput, RawAnswer};
pub use ids::{ParseIdError, QuestionId};
pub use participant::{
    IdentityError, Location, Participant, ParticipantDraft, RegistrationPolicy, Sso,
};
pub use question::{Question, QuestionError, QuestionKind, TRUE_FALSE_OPTIONS};
pub use session::QuizResult;
