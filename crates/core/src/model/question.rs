use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::answer::{Answer, AnswerError, AnswerInput, RawAnswer};
use crate::model::ids::QuestionId;

/// Fixed option set offered by true/false questions.
pub const TRUE_FALSE_OPTIONS: [&str; 2] = ["True", "False"];

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuestionError {
    #[error("question {id} has no prompt text")]
    EmptyPrompt { id: QuestionId },

    #[error("choice question {id} has no options")]
    MissingOptions { id: QuestionId },

    #[error("question {id} allows {max} selections but has {options} options")]
    InvalidMaxSelections {
        id: QuestionId,
        max: u32,
        options: usize,
    },
}

//
// ─── KIND ──────────────────────────────────────────────────────────────────────
//

/// How a question is answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuestionKind {
    /// Exactly one option.
    Single,
    /// Between one and `max_selections` options.
    Multiple,
    /// One of `True` / `False`.
    #[serde(rename = "truefalse")]
    TrueFalse,
    /// Free text.
    Text,
}

//
// ─── QUESTION ──────────────────────────────────────────────────────────────────
//

/// A quiz question as served by the question bank.
///
/// Questions are immutable; a session holds them in the order the server sent them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    id: QuestionId,
    prompt: String,
    kind: QuestionKind,
    options: Vec<String>,
    points: u32,
    max_selections: u32,
}

impl Question {
    /// Build a question, normalizing options for the kind.
    ///
    /// `max_selections` only matters for multiple-choice and defaults to 1.
    ///
    /// # Errors
    ///
    /// Returns `QuestionError` when the prompt is blank, a choice question has no
    /// options, or the selection bound does not fit the option list.
    pub fn new(
        id: QuestionId,
        prompt: impl Into<String>,
        kind: QuestionKind,
        options: Vec<String>,
        points: u32,
        max_selections: Option<u32>,
    ) -> Result<Self, QuestionError> {
        let prompt = prompt.into();
        if prompt.trim().is_empty() {
            return Err(QuestionError::EmptyPrompt { id });
        }

        let options = match kind {
            QuestionKind::TrueFalse => TRUE_FALSE_OPTIONS.iter().map(|o| (*o).to_owned()).collect(),
            QuestionKind::Text => Vec::new(),
            QuestionKind::Single | QuestionKind::Multiple => {
                if options.is_empty() {
                    return Err(QuestionError::MissingOptions { id });
                }
                options
            }
        };

        let max_selections = match kind {
            QuestionKind::Multiple => {
                let max = max_selections.unwrap_or(1);
                if max == 0 || usize::try_from(max).map_or(true, |m| m > options.len()) {
                    return Err(QuestionError::InvalidMaxSelections {
                        id,
                        max,
                        options: options.len(),
                    });
                }
                max
            }
            _ => 1,
        };

        Ok(Self {
            id,
            prompt,
            kind,
            options,
            points,
            max_selections,
        })
    }

    #[must_use]
    pub fn id(&self) -> QuestionId {
        self.id
    }

    #[must_use]
    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    #[must_use]
    pub fn kind(&self) -> QuestionKind {
        self.kind
    }

    #[must_use]
    pub fn options(&self) -> &[String] {
        &self.options
    }

    #[must_use]
    pub fn points(&self) -> u32 {
        self.points
    }

    #[must_use]
    pub fn max_selections(&self) -> u32 {
        self.max_selections
    }

    #[must_use]
    pub fn has_option(&self, value: &str) -> bool {
        self.options.iter().any(|o| o == value)
    }

    /// Check raw input against this question's answer contract.
    ///
    /// `Ok(None)` means the input clears the answer.
    ///
    /// # Errors
    ///
    /// Returns `AnswerError` describing why the input is out of contract.
    pub fn validate_answer(&self, input: AnswerInput) -> Result<Option<Answer>, AnswerError> {
        match (self.kind, input) {
            (_, AnswerInput::Cleared) => Ok(None),

            (QuestionKind::Single | QuestionKind::TrueFalse, AnswerInput::Choice(value)) => {
                if value.is_empty() {
                    return Ok(None);
                }
                if !self.has_option(&value) {
                    return Err(AnswerError::OptionNotFound { value });
                }
                Ok(Some(Answer::Choice(value)))
            }

            (QuestionKind::Multiple, AnswerInput::Choice(value)) => {
                self.validate_selections(if value.is_empty() { Vec::new() } else { vec![value] })
            }
            (QuestionKind::Multiple, AnswerInput::Selections(values)) => {
                self.validate_selections(values)
            }

            (QuestionKind::Text, AnswerInput::Text(value)) => {
                if value.is_empty() {
                    return Ok(None);
                }
                let trimmed = value.trim();
                if trimmed.is_empty() {
                    return Err(AnswerError::EmptyTextAnswer);
                }
                Ok(Some(Answer::Text(trimmed.to_owned())))
            }

            (kind, _) => Err(AnswerError::KindMismatch { expected: kind }),
        }
    }

    fn validate_selections(&self, values: Vec<String>) -> Result<Option<Answer>, AnswerError> {
        if values.is_empty() {
            return Ok(None);
        }
        let selected: std::collections::BTreeSet<String> = values.into_iter().collect();
        let max = usize::try_from(self.max_selections).unwrap_or(usize::MAX);
        if selected.len() > max {
            return Err(AnswerError::SelectionLimitExceeded {
                max: self.max_selections,
                selected: selected.len(),
            });
        }
        if let Some(unknown) = selected.iter().find(|v| !self.has_option(v)) {
            return Err(AnswerError::OptionNotFound {
                value: unknown.clone(),
            });
        }
        Ok(Some(Answer::Selections(selected)))
    }

    /// Interpret an answer value loaded from the server as input for this question.
    #[must_use]
    pub fn interpret(&self, raw: RawAnswer) -> AnswerInput {
        match (self.kind, raw) {
            (QuestionKind::Multiple, RawAnswer::One(value)) => AnswerInput::Selections(vec![value]),
            (_, RawAnswer::Many(values)) => AnswerInput::Selections(values),
            (QuestionKind::Text, RawAnswer::One(value)) => AnswerInput::Text(value),
            (_, RawAnswer::One(value)) => AnswerInput::Choice(value),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| (*v).to_owned()).collect()
    }

    fn multiple(max: u32) -> Question {
        Question::new(
            QuestionId::new(2),
            "Pick",
            QuestionKind::Multiple,
            options(&["W", "X", "Y", "Z"]),
            1,
            Some(max),
        )
        .unwrap()
    }

    #[test]
    fn true_false_always_offers_fixed_options() {
        let q = Question::new(
            QuestionId::new(1),
            "Rust is memory safe",
            QuestionKind::TrueFalse,
            options(&["yes"]),
            1,
            None,
        )
        .unwrap();
        assert_eq!(q.options(), ["True", "False"]);
        assert_eq!(
            q.validate_answer(AnswerInput::Choice("True".into())),
            Ok(Some(Answer::Choice("True".into())))
        );
        assert_eq!(
            q.validate_answer(AnswerInput::Choice("yes".into())),
            Err(AnswerError::OptionNotFound { value: "yes".into() })
        );
    }

    #[test]
    fn construction_rejects_bad_shapes() {
        assert_eq!(
            Question::new(QuestionId::new(1), " ", QuestionKind::Text, vec![], 1, None),
            Err(QuestionError::EmptyPrompt { id: QuestionId::new(1) })
        );
        assert_eq!(
            Question::new(QuestionId::new(1), "Q", QuestionKind::Single, vec![], 1, None),
            Err(QuestionError::MissingOptions { id: QuestionId::new(1) })
        );
        assert_eq!(
            Question::new(
                QuestionId::new(1),
                "Q",
                QuestionKind::Multiple,
                options(&["A", "B"]),
                1,
                Some(3)
            ),
            Err(QuestionError::InvalidMaxSelections {
                id: QuestionId::new(1),
                max: 3,
                options: 2
            })
        );
    }

    #[test]
    fn multiple_choice_defaults_to_one_selection() {
        let q = Question::new(
            QuestionId::new(1),
            "Q",
            QuestionKind::Multiple,
            options(&["A", "B"]),
            1,
            None,
        )
        .unwrap();
        assert_eq!(q.max_selections(), 1);
    }

    #[test]
    fn selection_limit_is_checked_before_membership() {
        let q = multiple(2);
        let err = q
            .validate_answer(AnswerInput::Selections(options(&["X", "Y", "nope"])))
            .unwrap_err();
        assert_eq!(err, AnswerError::SelectionLimitExceeded { max: 2, selected: 3 });
    }

    #[test]
    fn duplicate_selections_collapse() {
        let q = multiple(2);
        let answer = q
            .validate_answer(AnswerInput::Selections(options(&["X", "X", "Y"])))
            .unwrap()
            .unwrap();
        assert_eq!(answer.selections().map(|s| s.len()), Some(2));
    }

    #[test]
    fn text_answers_are_trimmed_and_blank_is_rejected() {
        let q = Question::new(QuestionId::new(3), "Say", QuestionKind::Text, vec![], 1, None).unwrap();
        assert_eq!(
            q.validate_answer(AnswerInput::Text("  hello ".into())),
            Ok(Some(Answer::Text("hello".into())))
        );
        assert_eq!(q.validate_answer(AnswerInput::Text(String::new())), Ok(None));
        assert_eq!(
            q.validate_answer(AnswerInput::Text("   ".into())),
            Err(AnswerError::EmptyTextAnswer)
        );
        assert_eq!(
            q.validate_answer(AnswerInput::Choice("hello".into())),
            Err(AnswerError::KindMismatch {
                expected: QuestionKind::Text
            })
        );
    }

    #[test]
    fn interprets_server_values_by_kind() {
        let q = multiple(2);
        assert_eq!(
            q.interpret(RawAnswer::One("X".into())),
            AnswerInput::Selections(vec!["X".into()])
        );
        let text = Question::new(QuestionId::new(3), "Say", QuestionKind::Text, vec![], 1, None).unwrap();
        assert_eq!(
            text.interpret(RawAnswer::One("hi".into())),
            AnswerInput::Text("hi".into())
        );
    }

    #[test]
    fn kind_uses_wire_names() {
        let kind: QuestionKind = serde_json::from_str("\"truefalse\"").unwrap();
        assert_eq!(kind, QuestionKind::TrueFalse);
        assert_eq!(serde_json::to_string(&QuestionKind::Multiple).unwrap(), "\"multiple\"");
    }
}
