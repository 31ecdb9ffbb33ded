use async_trait::async_trait;
use log::debug;
use quiz_core::model::{Location, Participant, Sso};
use reqwest::{Response, StatusCode};
use serde::de::DeserializeOwned;

use super::HttpAnswerStore;
use super::mapping::{
    QuestionsResponse, Refusal, RegisterRequest, RegisterResponse, SaveAnswerRequest,
    StatusResponse, SubmitRequest, SubmitResponse,
};
use crate::repository::{AnswerRecord, AnswerStore, QuizContent, RegistrationOutcome, StorageError};

fn connection(e: reqwest::Error) -> StorageError {
    StorageError::Connection(e.to_string())
}

/// Turn a non-success response into `Rejected` when the server explained itself.
async fn ensure_success(response: Response) -> Result<Response, StorageError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.bytes().await.map_err(connection)?;
    if let Some(message) = serde_json::from_slice::<Refusal>(&body)
        .ok()
        .and_then(Refusal::into_message)
    {
        return Err(StorageError::Rejected(message));
    }
    if status == StatusCode::NOT_FOUND {
        return Err(StorageError::NotFound);
    }
    Err(StorageError::HttpStatus(status.as_u16()))
}

async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, StorageError> {
    let response = ensure_success(response).await?;
    let body = response.bytes().await.map_err(connection)?;
    serde_json::from_slice(&body).map_err(|e| StorageError::Serialization(e.to_string()))
}

#[async_trait]
impl AnswerStore for HttpAnswerStore {
    async fn quiz_status(&self, location: &Location) -> Result<bool, StorageError> {
        let url = self.endpoint(&["quiz-status", location.as_str()])?;
        debug!("GET {url}");
        let response = self.client.get(url).send().await.map_err(connection)?;
        let body: StatusResponse = read_json(response).await?;
        Ok(body.is_open)
    }

    async fn register(
        &self,
        participant: &Participant,
    ) -> Result<RegistrationOutcome, StorageError> {
        let url = self.endpoint(&["register"])?;
        debug!("POST {url} sso={}", participant.sso());
        let payload = RegisterRequest {
            sso: participant.sso(),
            name: participant.name(),
            email: participant.email(),
            location: participant.location(),
        };
        let response = self
            .client
            .post(url)
            .json(&payload)
            .send()
            .await
            .map_err(connection)?;
        let body: RegisterResponse = read_json(response).await?;
        body.into_outcome()
    }

    async fn load_quiz(&self, location: &Location, sso: &Sso) -> Result<QuizContent, StorageError> {
        let mut url = self.endpoint(&["questions", location.as_str()])?;
        url.query_pairs_mut().append_pair("sso", sso.as_str());
        debug!("GET {url}");
        let response = self.client.get(url).send().await.map_err(connection)?;
        let body: QuestionsResponse = read_json(response).await?;
        Ok(body.into_content())
    }

    async fn save_answer(&self, record: &AnswerRecord) -> Result<(), StorageError> {
        let url = self.endpoint(&["save-answer"])?;
        debug!("POST {url} question={}", record.question_id);
        let payload = SaveAnswerRequest {
            sso: &record.sso,
            location: &record.location,
            question_id: record.question_id,
            answer: record.answer.as_ref(),
        };
        let response = self
            .client
            .post(url)
            .json(&payload)
            .send()
            .await
            .map_err(connection)?;
        ensure_success(response).await?;
        Ok(())
    }

    async fn submit(&self, sso: &Sso, location: &Location) -> Result<u32, StorageError> {
        let url = self.endpoint(&["submit"])?;
        debug!("POST {url} sso={sso}");
        let response = self
            .client
            .post(url)
            .json(&SubmitRequest { sso, location })
            .send()
            .await
            .map_err(connection)?;
        let body: SubmitResponse = read_json(response).await?;
        body.into_score()
    }
}
