use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use quiz_core::model::{
    Answer, Location, ParticipantDraft, QuestionId, QuestionKind, RawAnswer, RegistrationPolicy,
};
use serde_json::{Value, json};
use storage::{AnswerRecord, AnswerStore, HttpAnswerStore, HttpStoreConfig, StorageError};
use tokio::net::TcpListener;

#[derive(Clone, Default)]
struct FakeApi {
    saves: Arc<Mutex<Vec<Value>>>,
}

async fn quiz_status(Path(location): Path<String>) -> Json<Value> {
    Json(json!({ "is_open": location == "New Delhi" }))
}

async fn register(Json(body): Json<Value>) -> Response {
    match body["sso"].as_str() {
        Some("111111111") => (
            StatusCode::BAD_REQUEST,
            Json(json!({
                "success": false,
                "message": "You have already completed the quiz for Pune. You cannot take another quiz."
            })),
        )
            .into_response(),
        Some("222222222") => Json(json!({
            "success": true,
            "can_resume": true,
            "location": "Pune",
            "message": "Welcome back! Resuming your quiz for Pune..."
        }))
        .into_response(),
        _ => Json(json!({ "success": true, "can_resume": false })).into_response(),
    }
}

async fn questions(
    Path(location): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    match params.get("sso").map(String::as_str) {
        None => (StatusCode::BAD_REQUEST, Json(json!({ "error": "SSO required" }))).into_response(),
        Some("999999999") => (
            StatusCode::FORBIDDEN,
            Json(json!({ "error": "Quiz already submitted" })),
        )
            .into_response(),
        Some(_) => Json(json!({
            "questions": [
                { "id": 1, "question": format!("Capital near {location}?"), "type": "single", "options": ["A", "B", "C"], "points": 2 },
                { "id": 2, "question": "Pick two", "type": "multiple", "options": ["X", "Y", "Z"], "points": 1, "max_selections": 2 },
                { "id": 3, "question": "Say hello", "type": "text", "options": null, "points": 1 }
            ],
            "existing_answers": { "1": "B", "2": ["X", "Y"] }
        }))
        .into_response(),
    }
}

async fn save_answer(State(api): State<FakeApi>, Json(body): Json<Value>) -> Json<Value> {
    api.saves.lock().unwrap().push(body);
    Json(json!({ "success": true }))
}

async fn submit(Json(body): Json<Value>) -> Response {
    if body["location"] == "Pune" {
        Json(json!({ "success": true, "score": 7 })).into_response()
    } else {
        (
            StatusCode::FORBIDDEN,
            Json(json!({ "success": false, "message": "Not registered" })),
        )
            .into_response()
    }
}

async fn start_fake_api() -> (HttpAnswerStore, FakeApi) {
    let api = FakeApi::default();
    let app = Router::new()
        .route("/api/quiz-status/{location}", get(quiz_status))
        .route("/api/register", post(register))
        .route("/api/questions/{location}", get(questions))
        .route("/api/save-answer", post(save_answer))
        .route("/api/submit", post(submit))
        .with_state(api.clone());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let config = HttpStoreConfig::new(format!("http://127.0.0.1:{port}/api"));
    (HttpAnswerStore::connect(&config).unwrap(), api)
}

fn participant(sso: &str) -> quiz_core::model::Participant {
    ParticipantDraft {
        sso: sso.into(),
        name: "Ada".into(),
        email: "ada@example.com".into(),
        location: "New Delhi".into(),
    }
    .validate(&RegistrationPolicy::open())
    .unwrap()
}

#[tokio::test]
async fn quiz_status_uses_encoded_location() {
    let (store, _) = start_fake_api().await;
    assert!(store.quiz_status(&Location::parse("New Delhi").unwrap()).await.unwrap());
    assert!(!store.quiz_status(&Location::parse("Pune").unwrap()).await.unwrap());
}

#[tokio::test]
async fn register_maps_new_resumed_and_refused() {
    let (store, _) = start_fake_api().await;

    let fresh = store.register(&participant("123456789")).await.unwrap();
    assert!(!fresh.can_resume());

    let resumed = store.register(&participant("222222222")).await.unwrap();
    assert_eq!(resumed.resume_location.unwrap().as_str(), "Pune");

    let err = store.register(&participant("111111111")).await.unwrap_err();
    assert!(matches!(err, StorageError::Rejected(msg) if msg.contains("already completed")));
}

#[tokio::test]
async fn load_quiz_decodes_questions_and_saved_answers() {
    let (store, _) = start_fake_api().await;
    let ada = participant("123456789");

    let content = store.load_quiz(ada.location(), ada.sso()).await.unwrap();
    assert_eq!(content.questions.len(), 3);
    assert_eq!(content.questions[0].prompt(), "Capital near New Delhi?");
    assert_eq!(content.questions[1].kind(), QuestionKind::Multiple);
    assert_eq!(
        content.existing_answers.get(&QuestionId::new(1)),
        Some(&RawAnswer::One("B".into()))
    );

    let submitted = participant("999999999");
    let err = store
        .load_quiz(submitted.location(), submitted.sso())
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::Rejected(msg) if msg == "Quiz already submitted"));
}

#[tokio::test]
async fn save_answer_posts_value_and_null_for_clear() {
    let (store, api) = start_fake_api().await;
    let ada = participant("123456789");

    let selections = Answer::Selections(["Y".to_owned(), "X".to_owned()].into_iter().collect());
    store
        .save_answer(&AnswerRecord::new(&ada, QuestionId::new(2), Some(selections)))
        .await
        .unwrap();
    store
        .save_answer(&AnswerRecord::new(&ada, QuestionId::new(3), None))
        .await
        .unwrap();

    let saves = api.saves.lock().unwrap().clone();
    assert_eq!(
        saves,
        vec![
            json!({ "sso": "123456789", "location": "New Delhi", "question_id": 2, "answer": ["X", "Y"] }),
            json!({ "sso": "123456789", "location": "New Delhi", "question_id": 3, "answer": null }),
        ]
    );
}

#[tokio::test]
async fn submit_returns_score_or_refusal() {
    let (store, _) = start_fake_api().await;
    let ada = participant("123456789");

    let score = store
        .submit(ada.sso(), &Location::parse("Pune").unwrap())
        .await
        .unwrap();
    assert_eq!(score, 7);

    let err = store.submit(ada.sso(), ada.location()).await.unwrap_err();
    assert!(matches!(err, StorageError::Rejected(msg) if msg == "Not registered"));
}
