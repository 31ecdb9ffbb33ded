use chrono::{DateTime, Utc};
use log::warn;
use std::collections::HashMap;
use std::fmt;

use quiz_core::model::{
    Answer, AnswerInput, Participant, Question, QuestionId, QuizResult, RawAnswer,
};

use super::progress::SubmitReview;
use crate::error::SessionError;

//
// ─── PHASE ─────────────────────────────────────────────────────────────────────
//

/// Where a live session is in its lifecycle.
///
/// Registration happens before a `QuizSession` exists, so it has no phase here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// Answering and navigating.
    InProgress,
    /// Submit confirmation is shown; answers are frozen.
    Reviewing,
    /// Terminal. The server has scored the attempt.
    Submitted,
}

/// Effect of recording an answer on the local answer map.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnswerChange {
    Stored(Answer),
    Cleared,
    Unchanged,
}

impl AnswerChange {
    /// Whether the server needs to hear about this change.
    #[must_use]
    pub fn needs_persist(&self) -> bool {
        !matches!(self, AnswerChange::Unchanged)
    }

    /// Value to send to the server: `None` clears it.
    #[must_use]
    pub fn persisted_value(&self) -> Option<Option<Answer>> {
        match self {
            AnswerChange::Stored(answer) => Some(Some(answer.clone())),
            AnswerChange::Cleared => Some(None),
            AnswerChange::Unchanged => None,
        }
    }
}

//
// ─── SESSION ───────────────────────────────────────────────────────────────────
//

/// One participant's attempt at a location's quiz.
///
/// Owned by the presentation layer and mutated only through these methods.
/// Invariants: `current < questions.len()`, every answer key is a question id,
/// and every stored answer passed its question's validation.
pub struct QuizSession {
    participant: Participant,
    questions: Vec<Question>,
    answers: HashMap<QuestionId, Answer>,
    current: usize,
    phase: SessionPhase,
    started_at: DateTime<Utc>,
    result: Option<QuizResult>,
}

impl QuizSession {
    /// Start (or resume) a session at the first question.
    ///
    /// `existing_answers` are the answers the server already holds. Entries that
    /// are empty, point at unknown questions, or no longer validate are dropped.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Empty` if no questions are provided.
    pub fn start(
        participant: Participant,
        questions: Vec<Question>,
        existing_answers: HashMap<QuestionId, RawAnswer>,
        started_at: DateTime<Utc>,
    ) -> Result<Self, SessionError> {
        if questions.is_empty() {
            return Err(SessionError::Empty);
        }

        let mut answers = HashMap::with_capacity(existing_answers.len());
        for (id, raw) in existing_answers {
            if raw.is_empty() {
                continue;
            }
            let Some(question) = questions.iter().find(|q| q.id() == id) else {
                warn!("dropping saved answer for unknown question {id}");
                continue;
            };
            match question.validate_answer(question.interpret(raw)) {
                Ok(Some(answer)) => {
                    answers.insert(id, answer);
                }
                Ok(None) => {}
                Err(e) => warn!("dropping saved answer for question {id}: {e}"),
            }
        }

        Ok(Self {
            participant,
            questions,
            answers,
            current: 0,
            phase: SessionPhase::InProgress,
            started_at,
            result: None,
        })
    }

    #[must_use]
    pub fn participant(&self) -> &Participant {
        &self.participant
    }

    #[must_use]
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    #[must_use]
    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    #[must_use]
    pub fn result(&self) -> Option<&QuizResult> {
        self.result.as_ref()
    }

    #[must_use]
    pub fn current_index(&self) -> usize {
        self.current
    }

    #[must_use]
    pub fn current_question(&self) -> &Question {
        &self.questions[self.current]
    }

    #[must_use]
    pub fn total_questions(&self) -> usize {
        self.questions.len()
    }

    /// The committed answer set, as the server should hold it.
    #[must_use]
    pub fn answers(&self) -> &HashMap<QuestionId, Answer> {
        &self.answers
    }

    #[must_use]
    pub fn answer_for(&self, id: QuestionId) -> Option<&Answer> {
        self.answers.get(&id)
    }

    #[must_use]
    pub fn is_answered(&self, id: QuestionId) -> bool {
        self.answers.contains_key(&id)
    }

    /// Number of questions with a stored answer.
    #[must_use]
    pub fn answered_count(&self) -> usize {
        self.answers.len()
    }

    fn ensure_in_progress(&self, action: &'static str) -> Result<(), SessionError> {
        match self.phase {
            SessionPhase::InProgress => Ok(()),
            SessionPhase::Submitted => Err(SessionError::Submitted),
            phase => Err(SessionError::InvalidTransition { phase, action }),
        }
    }

    /// Validate `input` for question `id` and apply it to the answer map.
    ///
    /// A cleared input removes the entry. Refused input leaves the map untouched.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Answer` for out-of-contract input,
    /// `SessionError::QuestionNotFound` for an unknown id, and a phase error
    /// unless the session is in progress.
    pub fn record_answer(
        &mut self,
        id: QuestionId,
        input: AnswerInput,
    ) -> Result<AnswerChange, SessionError> {
        self.ensure_in_progress("record an answer")?;
        let question = self
            .questions
            .iter()
            .find(|q| q.id() == id)
            .ok_or(SessionError::QuestionNotFound(id))?;

        let change = match question.validate_answer(input)? {
            Some(answer) => {
                if self.answers.get(&id) == Some(&answer) {
                    AnswerChange::Unchanged
                } else {
                    self.answers.insert(id, answer.clone());
                    AnswerChange::Stored(answer)
                }
            }
            None => {
                if self.answers.remove(&id).is_some() {
                    AnswerChange::Cleared
                } else {
                    AnswerChange::Unchanged
                }
            }
        };
        Ok(change)
    }

    /// Move to `index`, clamped to the question range. Returns the new index.
    ///
    /// # Errors
    ///
    /// Returns a phase error unless the session is in progress.
    pub fn navigate_to(&mut self, index: usize) -> Result<usize, SessionError> {
        self.ensure_in_progress("navigate")?;
        self.current = index.min(self.questions.len() - 1);
        Ok(self.current)
    }

    /// Freeze answers and show the submit confirmation.
    ///
    /// # Errors
    ///
    /// Returns a phase error unless the session is in progress.
    pub fn begin_review(&mut self) -> Result<SubmitReview, SessionError> {
        self.ensure_in_progress("review for submission")?;
        self.phase = SessionPhase::Reviewing;
        Ok(SubmitReview {
            answered: self.answered_count(),
            total: self.total_questions(),
        })
    }

    /// Leave the submit confirmation and go back to answering.
    ///
    /// # Errors
    ///
    /// Returns a phase error unless the session is reviewing.
    pub fn cancel_review(&mut self) -> Result<(), SessionError> {
        self.ensure_reviewing("cancel submission")?;
        self.phase = SessionPhase::InProgress;
        Ok(())
    }

    pub(crate) fn ensure_reviewing(&self, action: &'static str) -> Result<(), SessionError> {
        match self.phase {
            SessionPhase::Reviewing => Ok(()),
            SessionPhase::Submitted => Err(SessionError::Submitted),
            phase => Err(SessionError::InvalidTransition { phase, action }),
        }
    }

    pub(crate) fn mark_submitted(&mut self, result: QuizResult) -> Result<(), SessionError> {
        self.ensure_reviewing("submit")?;
        self.phase = SessionPhase::Submitted;
        self.result = Some(result);
        Ok(())
    }
}

impl fmt::Debug for QuizSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QuizSession")
            .field("sso", self.participant.sso())
            .field("location", self.participant.location())
            .field("questions_len", &self.questions.len())
            .field("answered", &self.answers.len())
            .field("current", &self.current)
            .field("phase", &self.phase)
            .field("started_at", &self.started_at)
            .finish_non_exhaustive()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
