use quiz_core::model::{Answer, Location, Question, QuestionId, QuestionKind};
use storage::InMemoryAnswerStore;

pub const DEMO_LOCATION: &str = "Demo";

fn options(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| (*v).to_owned()).collect()
}

fn demo_quiz() -> Result<(Location, Vec<Question>), quiz_core::Error> {
    let location = Location::parse(DEMO_LOCATION)?;
    let questions = vec![
        Question::new(
            QuestionId::new(1),
            "Which keyword introduces an immutable binding?",
            QuestionKind::Single,
            options(&["let", "mut", "var"]),
            1,
            None,
        )?,
        Question::new(
            QuestionId::new(2),
            "Which of these are integer types?",
            QuestionKind::Multiple,
            options(&["u8", "f64", "i128", "char"]),
            2,
            Some(2),
        )?,
        Question::new(
            QuestionId::new(3),
            "The borrow checker runs at compile time.",
            QuestionKind::TrueFalse,
            Vec::new(),
            1,
            None,
        )?,
        Question::new(
            QuestionId::new(4),
            "Name the tool that builds Rust packages.",
            QuestionKind::Text,
            Vec::new(),
            1,
            None,
        )?,
    ];
    Ok((location, questions))
}

/// An offline store with one open quiz, for trying the terminal flow without a server.
///
/// # Errors
///
/// Returns an error if the sample quiz cannot be built or installed.
pub fn demo_store() -> Result<InMemoryAnswerStore, Box<dyn std::error::Error>> {
    let (location, questions) = demo_quiz()?;
    let store = InMemoryAnswerStore::new();
    store.set_quiz_open(&location, true)?;
    store.set_questions(&location, questions)?;
    store.set_correct_answer(&location, QuestionId::new(1), Answer::Choice("let".into()))?;
    store.set_correct_answer(
        &location,
        QuestionId::new(2),
        Answer::Selections(["u8".to_owned(), "i128".to_owned()].into_iter().collect()),
    )?;
    store.set_correct_answer(&location, QuestionId::new(3), Answer::Choice("True".into()))?;
    store.set_correct_answer(&location, QuestionId::new(4), Answer::Text("cargo".into()))?;
    Ok(store)
}
