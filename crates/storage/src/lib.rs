#![forbid(unsafe_code)]

pub mod http;
pub mod repository;

pub use http::{HttpAnswerStore, HttpStoreConfig};
pub use repository::{
    AnswerRecord, AnswerStore, InMemoryAnswerStore, QuizContent, RegistrationOutcome, Storage,
    StorageError,
};
