use quiz_core::model::{Answer, Question, QuestionId};

use super::service::{QuizSession, SessionPhase};

/// Which screen the presentation layer should show.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Registering,
    InProgress,
    Reviewing,
    Submitted,
}

impl Screen {
    /// `None` means nobody has registered yet.
    #[must_use]
    pub fn for_session(session: Option<&QuizSession>) -> Self {
        match session.map(QuizSession::phase) {
            None => Screen::Registering,
            Some(SessionPhase::InProgress) => Screen::InProgress,
            Some(SessionPhase::Reviewing) => Screen::Reviewing,
            Some(SessionPhase::Submitted) => Screen::Submitted,
        }
    }
}

/// One entry of the question navigation strip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuestionNavItem {
    pub index: usize,
    pub question_id: QuestionId,
    pub answered: bool,
    pub active: bool,
}

/// Presentation-agnostic snapshot of a session.
///
/// This is intentionally **not** a UI view-model:
/// - no pre-formatted strings
/// - no localization assumptions
///
/// Renderers decide how to word "Question i of N" or selection hints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionView {
    pub screen: Screen,
    pub current_index: usize,
    pub total: usize,
    pub answered: usize,
    pub current: Question,
    pub current_answer: Option<Answer>,
    pub nav: Vec<QuestionNavItem>,
}

impl SessionView {
    #[must_use]
    pub fn from_session(session: &QuizSession) -> Self {
        let current = session.current_question().clone();
        let current_answer = session.answer_for(current.id()).cloned();
        let nav = session
            .questions()
            .iter()
            .enumerate()
            .map(|(index, question)| QuestionNavItem {
                index,
                question_id: question.id(),
                answered: session.is_answered(question.id()),
                active: index == session.current_index(),
            })
            .collect();

        Self {
            screen: Screen::for_session(Some(session)),
            current_index: session.current_index(),
            total: session.total_questions(),
            answered: session.answered_count(),
            current,
            current_answer,
            nav,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sessions::service::tests::{participant, three_questions};
    use quiz_core::model::AnswerInput;
    use quiz_core::time::fixed_now;
    use std::collections::HashMap;

    #[test]
    fn no_session_means_registering() {
        assert_eq!(Screen::for_session(None), Screen::Registering);
    }

    #[test]
    fn snapshot_marks_answered_and_active_questions() {
        let mut session =
            QuizSession::start(participant(), three_questions(), HashMap::new(), fixed_now())
                .unwrap();
        session
            .record_answer(QuestionId::new(3), AnswerInput::Text("hello".into()))
            .unwrap();
        session.navigate_to(2).unwrap();

        let view = SessionView::from_session(&session);
        assert_eq!(view.screen, Screen::InProgress);
        assert_eq!(view.current_index, 2);
        assert_eq!(view.total, 3);
        assert_eq!(view.answered, 1);
        assert_eq!(view.current.id(), QuestionId::new(3));
        assert_eq!(view.current_answer, Some(Answer::Text("hello".into())));

        let answered: Vec<bool> = view.nav.iter().map(|item| item.answered).collect();
        assert_eq!(answered, vec![false, false, true]);
        let active: Vec<bool> = view.nav.iter().map(|item| item.active).collect();
        assert_eq!(active, vec![false, false, true]);
    }

    #[test]
    fn screen_follows_review_phase() {
        let mut session =
            QuizSession::start(participant(), three_questions(), HashMap::new(), fixed_now())
                .unwrap();
        session.begin_review().unwrap();
        assert_eq!(Screen::for_session(Some(&session)), Screen::Reviewing);
    }
}
