use async_trait::async_trait;
use quiz_core::model::{
    Answer, Location, Participant, Question, QuestionId, RawAnswer, Sso,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;

/// Errors surfaced by answer store adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    /// The server understood the request and refused it.
    #[error("{0}")]
    Rejected(String),

    #[error("unexpected http status {0}")]
    HttpStatus(u16),

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("invalid store configuration: {0}")]
    InvalidConfig(String),
}

/// Server reply to a registration.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RegistrationOutcome {
    /// Set when the server already holds an unfinished attempt for this person.
    pub resume_location: Option<Location>,
    pub message: Option<String>,
}

impl RegistrationOutcome {
    #[must_use]
    pub fn can_resume(&self) -> bool {
        self.resume_location.is_some()
    }
}

/// Questions for a location plus whatever the participant already answered.
///
/// Existing answers are raw: they are matched against their questions when a
/// session starts.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct QuizContent {
    pub questions: Vec<Question>,
    pub existing_answers: HashMap<QuestionId, RawAnswer>,
}

/// One answer write. `answer: None` clears the stored value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerRecord {
    pub sso: Sso,
    pub location: Location,
    pub question_id: QuestionId,
    pub answer: Option<Answer>,
}

impl AnswerRecord {
    #[must_use]
    pub fn new(participant: &Participant, question_id: QuestionId, answer: Option<Answer>) -> Self {
        Self {
            sso: participant.sso().clone(),
            location: participant.location().clone(),
            question_id,
            answer,
        }
    }
}

/// Remote quiz API contract consumed by the session controller.
///
/// Implementations must apply `save_answer` last-write-wins per question id:
/// saves are fired without ordering guarantees.
#[async_trait]
pub trait AnswerStore: Send + Sync {
    /// Whether the quiz for `location` currently accepts participants.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the status cannot be fetched.
    async fn quiz_status(&self, location: &Location) -> Result<bool, StorageError>;

    /// Register a participant, or find their unfinished attempt.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Rejected` with a user-facing message when refused.
    async fn register(&self, participant: &Participant)
    -> Result<RegistrationOutcome, StorageError>;

    /// Load the ordered questions for a location and the participant's saved answers.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Rejected` if the participant may not take this quiz.
    async fn load_quiz(&self, location: &Location, sso: &Sso) -> Result<QuizContent, StorageError>;

    /// Persist one answer.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the write fails.
    async fn save_answer(&self, record: &AnswerRecord) -> Result<(), StorageError>;

    /// Finalize the attempt and return the score.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the submission is refused or fails.
    async fn submit(&self, sso: &Sso, location: &Location) -> Result<u32, StorageError>;
}

//
// ─── IN-MEMORY STORE ───────────────────────────────────────────────────────────
//

#[derive(Debug, Clone)]
struct ParticipantRow {
    participant: Participant,
    answers: HashMap<QuestionId, Answer>,
    submitted: bool,
    score: u32,
}

#[derive(Debug, Default)]
struct InMemoryState {
    open: HashMap<Location, bool>,
    questions: HashMap<Location, Vec<Question>>,
    answer_key: HashMap<(Location, QuestionId), Answer>,
    participants: HashMap<Sso, ParticipantRow>,
    save_log: Vec<AnswerRecord>,
    fail_saves: bool,
}

/// In-process stand-in for the quiz server, for tests and offline demos.
///
/// Mirrors the server's registration rules and stores answers last-write-wins.
/// Scoring is a plain exact match against an answer key.
#[derive(Clone, Default)]
pub struct InMemoryAnswerStore {
    state: Arc<Mutex<InMemoryState>>,
}

impl InMemoryAnswerStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> Result<MutexGuard<'_, InMemoryState>, StorageError> {
        self.state
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))
    }

    /// Open or close the quiz for a location.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Connection` if the state lock is poisoned.
    pub fn set_quiz_open(&self, location: &Location, open: bool) -> Result<(), StorageError> {
        self.state()?.open.insert(location.clone(), open);
        Ok(())
    }

    /// Replace the question set for a location.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Connection` if the state lock is poisoned.
    pub fn set_questions(
        &self,
        location: &Location,
        questions: Vec<Question>,
    ) -> Result<(), StorageError> {
        self.state()?.questions.insert(location.clone(), questions);
        Ok(())
    }

    /// Register the answer that earns a question's points.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Connection` if the state lock is poisoned.
    pub fn set_correct_answer(
        &self,
        location: &Location,
        question_id: QuestionId,
        answer: Answer,
    ) -> Result<(), StorageError> {
        self.state()?
            .answer_key
            .insert((location.clone(), question_id), answer);
        Ok(())
    }

    /// Make every subsequent `save_answer` fail with a connection error.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Connection` if the state lock is poisoned.
    pub fn set_fail_saves(&self, fail: bool) -> Result<(), StorageError> {
        self.state()?.fail_saves = fail;
        Ok(())
    }

    /// Every accepted save, in arrival order.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Connection` if the state lock is poisoned.
    pub fn saved_answers(&self) -> Result<Vec<AnswerRecord>, StorageError> {
        Ok(self.state()?.save_log.clone())
    }

    /// Answers currently held for a participant.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` for an unknown participant.
    pub fn stored_answers(&self, sso: &Sso) -> Result<HashMap<QuestionId, Answer>, StorageError> {
        self.state()?
            .participants
            .get(sso)
            .map(|row| row.answers.clone())
            .ok_or(StorageError::NotFound)
    }

    /// Whether the participant has a submitted attempt, and its score.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` for an unknown participant.
    pub fn submitted_score(&self, sso: &Sso) -> Result<Option<u32>, StorageError> {
        self.state()?
            .participants
            .get(sso)
            .map(|row| row.submitted.then_some(row.score))
            .ok_or(StorageError::NotFound)
    }
}

fn registered_row<'a>(
    state: &'a mut InMemoryState,
    sso: &Sso,
    location: &Location,
) -> Result<&'a mut ParticipantRow, StorageError> {
    state
        .participants
        .get_mut(sso)
        .filter(|row| row.participant.location() == location)
        .ok_or_else(|| StorageError::Rejected("Not registered".into()))
}

#[async_trait]
impl AnswerStore for InMemoryAnswerStore {
    async fn quiz_status(&self, location: &Location) -> Result<bool, StorageError> {
        Ok(self.state()?.open.get(location).copied().unwrap_or(false))
    }

    async fn register(
        &self,
        participant: &Participant,
    ) -> Result<RegistrationOutcome, StorageError> {
        let mut state = self.state()?;

        if let Some(row) = state.participants.get(participant.sso()) {
            let known = &row.participant;
            if known.email() != participant.email() || known.name() != participant.name() {
                return Err(StorageError::Rejected(
                    "This SSO is already registered with different details. SSO, Email, and Name must match your previous registration.".into(),
                ));
            }
            if row.submitted {
                return Err(StorageError::Rejected(format!(
                    "You have already completed the quiz for {}. You cannot take another quiz.",
                    known.location()
                )));
            }
            let location = known.location().clone();
            return Ok(RegistrationOutcome {
                message: Some(format!("Welcome back! Resuming your quiz for {location}...")),
                resume_location: Some(location),
            });
        }

        let email_taken = state
            .participants
            .values()
            .any(|row| row.participant.email() == participant.email());
        if email_taken {
            return Err(StorageError::Rejected(
                "This Email is already registered with different details. SSO, Email, and Name must match your previous registration.".into(),
            ));
        }

        state.participants.insert(
            participant.sso().clone(),
            ParticipantRow {
                participant: participant.clone(),
                answers: HashMap::new(),
                submitted: false,
                score: 0,
            },
        );
        Ok(RegistrationOutcome::default())
    }

    async fn load_quiz(&self, location: &Location, sso: &Sso) -> Result<QuizContent, StorageError> {
        let mut state = self.state()?;
        let row = registered_row(&mut state, sso, location)?;
        if row.submitted {
            return Err(StorageError::Rejected("Quiz already submitted".into()));
        }
        let existing_answers = row
            .answers
            .iter()
            .map(|(id, answer)| (*id, answer.to_raw()))
            .collect();
        let questions = state.questions.get(location).cloned().unwrap_or_default();
        Ok(QuizContent {
            questions,
            existing_answers,
        })
    }

    async fn save_answer(&self, record: &AnswerRecord) -> Result<(), StorageError> {
        let mut state = self.state()?;
        if state.fail_saves {
            return Err(StorageError::Connection("save-answer unavailable".into()));
        }
        let row = registered_row(&mut state, &record.sso, &record.location)?;
        match &record.answer {
            Some(answer) => {
                row.answers.insert(record.question_id, answer.clone());
            }
            None => {
                row.answers.remove(&record.question_id);
            }
        }
        state.save_log.push(record.clone());
        Ok(())
    }

    async fn submit(&self, sso: &Sso, location: &Location) -> Result<u32, StorageError> {
        let mut state = self.state()?;
        let answers = registered_row(&mut state, sso, location)?.answers.clone();

        let score: u32 = state
            .questions
            .get(location)
            .into_iter()
            .flatten()
            .filter(|q| {
                let key = state.answer_key.get(&(location.clone(), q.id()));
                key.is_some() && key == answers.get(&q.id())
            })
            .map(Question::points)
            .sum();

        let row = registered_row(&mut state, sso, location)?;
        row.submitted = true;
        row.score = score;
        Ok(score)
    }
}

/// Aggregates the answer store behind a trait object for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub answers: Arc<dyn AnswerStore>,
}
