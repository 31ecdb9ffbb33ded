use std::collections::HashMap;

use log::warn;
use quiz_core::model::{
    Answer, Location, Question, QuestionId, QuestionKind, RawAnswer, Sso,
};
use serde::{Deserialize, Serialize};

use crate::repository::{QuizContent, RegistrationOutcome, StorageError};

fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

//
// ─── REQUESTS ──────────────────────────────────────────────────────────────────
//

#[derive(Debug, Serialize)]
pub(crate) struct RegisterRequest<'a> {
    pub sso: &'a Sso,
    pub name: &'a str,
    pub email: &'a str,
    pub location: &'a Location,
}

#[derive(Debug, Serialize)]
pub(crate) struct SaveAnswerRequest<'a> {
    pub sso: &'a Sso,
    pub location: &'a Location,
    pub question_id: QuestionId,
    /// `null` clears the stored answer.
    pub answer: Option<&'a Answer>,
}

#[derive(Debug, Serialize)]
pub(crate) struct SubmitRequest<'a> {
    pub sso: &'a Sso,
    pub location: &'a Location,
}

//
// ─── RESPONSES ─────────────────────────────────────────────────────────────────
//

/// Body of a refused request; the server uses either field.
#[derive(Debug, Deserialize)]
pub(crate) struct Refusal {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

impl Refusal {
    pub(crate) fn into_message(self) -> Option<String> {
        self.message.or(self.error).filter(|m| !m.trim().is_empty())
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct StatusResponse {
    pub is_open: bool,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RegisterResponse {
    success: bool,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    can_resume: bool,
    #[serde(default)]
    location: Option<String>,
}

impl RegisterResponse {
    pub(crate) fn into_outcome(self) -> Result<RegistrationOutcome, StorageError> {
        if !self.success {
            return Err(StorageError::Rejected(
                self.message.unwrap_or_else(|| "Registration failed".into()),
            ));
        }
        let resume_location = if self.can_resume {
            let raw = self
                .location
                .ok_or_else(|| ser("resumable registration without a location"))?;
            Some(Location::parse(raw).map_err(ser)?)
        } else {
            None
        };
        Ok(RegistrationOutcome {
            resume_location,
            message: self.message,
        })
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct QuestionDto {
    id: u64,
    question: String,
    #[serde(rename = "type")]
    kind: QuestionKind,
    #[serde(default)]
    options: Option<Vec<String>>,
    #[serde(default)]
    points: Option<u32>,
    #[serde(default)]
    max_selections: Option<u32>,
}

impl QuestionDto {
    pub(crate) fn into_question(self) -> Result<Question, StorageError> {
        Question::new(
            QuestionId::new(self.id),
            self.question,
            self.kind,
            self.options.unwrap_or_default(),
            self.points.unwrap_or(1),
            self.max_selections,
        )
        .map_err(ser)
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct QuestionsResponse {
    questions: Vec<QuestionDto>,
    #[serde(default)]
    existing_answers: Option<HashMap<String, Option<RawAnswer>>>,
}

impl QuestionsResponse {
    /// Malformed questions and answer keys are logged and left out.
    pub(crate) fn into_content(self) -> QuizContent {
        let questions = self
            .questions
            .into_iter()
            .filter_map(|dto| {
                let id = dto.id;
                dto.into_question()
                    .inspect_err(|e| warn!("skipping question {id}: {e}"))
                    .ok()
            })
            .collect();

        let mut existing_answers = HashMap::new();
        for (key, value) in self.existing_answers.unwrap_or_default() {
            let id = match key.parse::<QuestionId>() {
                Ok(id) => id,
                Err(e) => {
                    warn!("ignoring saved answer with bad key: {e}");
                    continue;
                }
            };
            if let Some(answer) = value {
                existing_answers.insert(id, answer);
            }
        }

        QuizContent {
            questions,
            existing_answers,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct SubmitResponse {
    success: bool,
    #[serde(default)]
    score: Option<u32>,
    #[serde(default)]
    message: Option<String>,
}

impl SubmitResponse {
    pub(crate) fn into_score(self) -> Result<u32, StorageError> {
        if !self.success {
            return Err(StorageError::Rejected(
                self.message.unwrap_or_else(|| "Submission failed".into()),
            ));
        }
        self.score.ok_or_else(|| ser("submission accepted without a score"))
    }
}
