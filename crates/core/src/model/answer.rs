use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::question::QuestionKind;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

/// Why an answer was refused. Refusals never change session state.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum AnswerError {
    #[error("\"{value}\" is not one of the question's options")]
    OptionNotFound { value: String },

    #[error("at most {max} option(s) may be selected, got {selected}")]
    SelectionLimitExceeded { max: u32, selected: usize },

    #[error("text answer cannot be blank")]
    EmptyTextAnswer,

    #[error("answer shape does not fit a {expected:?} question")]
    KindMismatch { expected: QuestionKind },
}

//
// ─── ANSWER ────────────────────────────────────────────────────────────────────
//

/// A validated, non-empty answer.
///
/// Serializes the way the server stores it: a string, or an array of strings for
/// multiple-choice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Answer {
    /// Chosen option of a single-choice or true/false question.
    Choice(String),
    /// Chosen options of a multiple-choice question.
    Selections(BTreeSet<String>),
    /// Trimmed free text.
    Text(String),
}

impl Answer {
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Answer::Choice(value) | Answer::Text(value) => Some(value.as_str()),
            Answer::Selections(_) => None,
        }
    }

    #[must_use]
    pub fn selections(&self) -> Option<&BTreeSet<String>> {
        match self {
            Answer::Selections(values) => Some(values),
            _ => None,
        }
    }

    /// Whether `option` is part of this answer.
    #[must_use]
    pub fn includes(&self, option: &str) -> bool {
        match self {
            Answer::Choice(value) | Answer::Text(value) => value == option,
            Answer::Selections(values) => values.contains(option),
        }
    }

    #[must_use]
    pub fn to_raw(&self) -> RawAnswer {
        match self {
            Answer::Choice(value) | Answer::Text(value) => RawAnswer::One(value.clone()),
            Answer::Selections(values) => RawAnswer::Many(values.iter().cloned().collect()),
        }
    }
}

/// Input as supplied by the presentation layer at a commit point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnswerInput {
    Choice(String),
    Selections(Vec<String>),
    Text(String),
    Cleared,
}

/// Answer value as stored server-side, before it is matched to a question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawAnswer {
    One(String),
    Many(Vec<String>),
}

impl RawAnswer {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            RawAnswer::One(value) => value.trim().is_empty(),
            RawAnswer::Many(values) => values.is_empty(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn answers_serialize_like_the_server_stores_them() {
        let choice = Answer::Choice("B".into());
        assert_eq!(serde_json::to_string(&choice).unwrap(), "\"B\"");

        let many = Answer::Selections(["Y".to_owned(), "X".to_owned()].into_iter().collect());
        assert_eq!(serde_json::to_string(&many).unwrap(), "[\"X\",\"Y\"]");
    }

    #[test]
    fn raw_answers_accept_strings_and_arrays() {
        let one: RawAnswer = serde_json::from_str("\"A\"").unwrap();
        assert_eq!(one, RawAnswer::One("A".into()));
        let many: RawAnswer = serde_json::from_str("[\"X\",\"Y\"]").unwrap();
        assert_eq!(many, RawAnswer::Many(vec!["X".into(), "Y".into()]));
        assert!(RawAnswer::Many(Vec::new()).is_empty());
        assert!(RawAnswer::One("  ".into()).is_empty());
    }

    #[test]
    fn includes_checks_membership() {
        let many = Answer::Selections(["X".to_owned()].into_iter().collect());
        assert!(many.includes("X"));
        assert!(!many.includes("Y"));
        assert_eq!(many.to_raw(), RawAnswer::Many(vec!["X".into()]));
    }
}
