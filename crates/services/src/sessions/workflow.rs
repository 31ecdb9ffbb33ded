use log::info;
use std::sync::Arc;

use quiz_core::model::{
    AnswerInput, Location, Participant, ParticipantDraft, QuestionId, QuizResult,
    RegistrationPolicy,
};
use storage::{AnswerRecord, AnswerStore, Storage};

use super::persist::AnswerPersister;
use super::progress::SubmitReview;
use super::service::{AnswerChange, QuizSession};
use crate::Clock;
use crate::error::{RegistrationError, SessionError};

/// Result of a successful registration.
#[derive(Debug)]
pub struct Registration {
    pub session: QuizSession,
    /// The server already held an unfinished attempt for this participant.
    pub resumed: bool,
    pub message: Option<String>,
}

/// Result of recording one answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordOutcome {
    pub change: AnswerChange,
    /// A background save was started for the change.
    pub save_started: bool,
}

/// Result of moving to another question.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Navigation {
    pub index: usize,
    /// A background save was started for the committed pending answer.
    pub save_started: bool,
}

/// Orchestrates registration, answer autosave and submission.
///
/// This service owns:
/// - the time source (`Clock`)
/// - the answer store
/// - registration rules
///
/// The `QuizSession` itself stays with the caller.
#[derive(Clone)]
pub struct QuizSessionService {
    clock: Clock,
    store: Arc<dyn AnswerStore>,
    policy: RegistrationPolicy,
    persister: AnswerPersister,
}

impl QuizSessionService {
    #[must_use]
    pub fn new(clock: Clock, store: Arc<dyn AnswerStore>) -> Self {
        let persister = AnswerPersister::new(Arc::clone(&store));
        Self {
            clock,
            store,
            policy: RegistrationPolicy::open(),
            persister,
        }
    }

    #[must_use]
    pub fn from_storage(clock: Clock, storage: &Storage) -> Self {
        Self::new(clock, Arc::clone(&storage.answers))
    }

    #[must_use]
    pub fn with_policy(mut self, policy: RegistrationPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Whether the quiz is currently open for `location`.
    ///
    /// # Errors
    ///
    /// Returns `RegistrationError::Storage` if the store cannot be reached.
    pub async fn quiz_status(&self, location: &Location) -> Result<bool, RegistrationError> {
        Ok(self.store.quiz_status(location).await?)
    }

    /// Validate the form, register with the server and start the session.
    ///
    /// When the server reports an unfinished attempt the session resumes at the
    /// server's location with the answers it already holds.
    ///
    /// # Errors
    ///
    /// Returns `RegistrationError::Identity` for invalid input,
    /// `RegistrationError::QuizClosed` when the location is closed,
    /// `RegistrationError::Rejected` when the server refuses, and
    /// `RegistrationError::Session` when the quiz has no questions.
    pub async fn register(&self, draft: ParticipantDraft) -> Result<Registration, RegistrationError> {
        let participant = draft.validate(&self.policy)?;
        let location = participant.location().clone();

        if !self.store.quiz_status(&location).await? {
            info!("quiz closed for {location}; registration refused");
            return Err(RegistrationError::QuizClosed { location });
        }

        let outcome = self.store.register(&participant).await?;
        let resumed = outcome.can_resume();
        let participant = match outcome.resume_location {
            Some(known) if known != location => {
                info!("{} resumes at {known} instead of {location}", participant.sso());
                participant.relocated(known)
            }
            _ => participant,
        };

        let session = self.resume(participant).await?;
        info!(
            "{} {} quiz at {} ({} of {} answered)",
            session.participant().sso(),
            if resumed { "resumed" } else { "started" },
            session.participant().location(),
            session.answered_count(),
            session.total_questions()
        );

        Ok(Registration {
            session,
            resumed,
            message: outcome.message,
        })
    }

    /// Reload questions and saved answers for an already registered participant.
    ///
    /// # Errors
    ///
    /// Returns `RegistrationError::Rejected` when the server refuses (not
    /// registered, already submitted) and `RegistrationError::Session` when
    /// the quiz has no questions.
    pub async fn resume(&self, participant: Participant) -> Result<QuizSession, RegistrationError> {
        let content = self
            .store
            .load_quiz(participant.location(), participant.sso())
            .await?;
        let session = QuizSession::start(
            participant,
            content.questions,
            content.existing_answers,
            self.clock.now(),
        )?;
        Ok(session)
    }

    fn schedule_save(
        &self,
        session: &QuizSession,
        id: QuestionId,
        change: &AnswerChange,
    ) -> bool {
        let Some(answer) = change.persisted_value() else {
            return false;
        };
        let record = AnswerRecord::new(session.participant(), id, answer);
        self.persister.persist(record)
    }

    /// Wait for every answer save started so far.
    ///
    /// Call before shutting down so in-flight saves are not cancelled.
    pub async fn flush_saves(&self) {
        self.persister.flush().await;
    }

    /// Record an answer and autosave it when it changed.
    ///
    /// # Errors
    ///
    /// Returns the session's rejection unchanged; nothing is saved in that case.
    pub fn record_answer(
        &self,
        session: &mut QuizSession,
        id: QuestionId,
        input: AnswerInput,
    ) -> Result<RecordOutcome, SessionError> {
        let change = session.record_answer(id, input)?;
        let save_started = self.schedule_save(session, id, &change);
        Ok(RecordOutcome {
            change,
            save_started,
        })
    }

    fn commit_pending(
        &self,
        session: &mut QuizSession,
        pending: Option<AnswerInput>,
    ) -> Result<bool, SessionError> {
        let Some(input) = pending else {
            return Ok(false);
        };
        let id = session.current_question().id();
        Ok(self.record_answer(session, id, input)?.save_started)
    }

    /// Commit the value being edited on the current question, then move.
    ///
    /// # Errors
    ///
    /// A rejected pending value aborts the move and is returned.
    pub fn navigate_to(
        &self,
        session: &mut QuizSession,
        pending: Option<AnswerInput>,
        index: usize,
    ) -> Result<Navigation, SessionError> {
        let save_started = self.commit_pending(session, pending)?;
        let index = session.navigate_to(index)?;
        Ok(Navigation {
            index,
            save_started,
        })
    }

    /// Commit the pending value and open the submit confirmation.
    ///
    /// Waits for every outstanding answer save so the server scores the
    /// answers shown in the review.
    ///
    /// # Errors
    ///
    /// Returns a rejection of the pending value, or a phase error.
    pub async fn request_submit(
        &self,
        session: &mut QuizSession,
        pending: Option<AnswerInput>,
    ) -> Result<SubmitReview, SessionError> {
        self.commit_pending(session, pending)?;
        let review = session.begin_review()?;
        self.persister.flush().await;
        Ok(review)
    }

    /// Go back to answering from the submit confirmation.
    ///
    /// # Errors
    ///
    /// Returns a phase error unless the session is reviewing.
    pub fn cancel_submit(&self, session: &mut QuizSession) -> Result<(), SessionError> {
        session.cancel_review()
    }

    /// Submit the attempt for scoring. Only identity and location are sent.
    ///
    /// On failure the session stays in review so the participant can retry.
    ///
    /// # Errors
    ///
    /// Returns a phase error unless the session is reviewing, and
    /// `SessionError::Storage` when the server refuses or is unreachable.
    pub async fn confirm_submit(&self, session: &mut QuizSession) -> Result<QuizResult, SessionError> {
        session.ensure_reviewing("submit")?;
        self.persister.flush().await;
        let participant = session.participant();
        let score = self
            .store
            .submit(participant.sso(), participant.location())
            .await?;

        let result = QuizResult::new(score, self.clock.now());
        session.mark_submitted(result)?;
        let elapsed = result.submitted_at() - session.started_at();
        info!(
            "{} submitted quiz at {} with score {score} after {}s",
            session.participant().sso(),
            session.participant().location(),
            elapsed.num_seconds()
        );
        Ok(result)
    }
}
