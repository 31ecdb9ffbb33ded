use std::fmt;
use std::io::Write;

use log::error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines, Stdin};

use quiz_core::model::{Answer, AnswerInput, ParticipantDraft, Question, QuestionKind};
use services::{QuizSession, QuizSessionService, RegistrationError, Screen, SessionView};

//
// ─── COMMANDS ──────────────────────────────────────────────────────────────────
//

/// One line typed while a quiz is in progress.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Command {
    Answer(String),
    Clear,
    Next,
    Prev,
    Goto(usize),
    Submit,
    Help,
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum CommandError {
    Empty,
    MissingValue,
    InvalidIndex(String),
    Unknown(String),
}

impl fmt::Display for CommandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandError::Empty => write!(f, "type a command, or `h` for help"),
            CommandError::MissingValue => write!(f, "`a` needs a value, e.g. `a 2` or `a 1,3`"),
            CommandError::InvalidIndex(raw) => write!(f, "not a question number: {raw}"),
            CommandError::Unknown(cmd) => write!(f, "unknown command: {cmd}"),
        }
    }
}

impl Command {
    /// Question numbers are 1-based on screen and 0-based in `Goto`.
    fn parse(line: &str) -> Result<Self, CommandError> {
        let line = line.trim();
        let (head, rest) = line
            .split_once(char::is_whitespace)
            .map_or((line, ""), |(head, rest)| (head, rest.trim()));

        match head {
            "" => Err(CommandError::Empty),
            "a" => {
                if rest.is_empty() {
                    Err(CommandError::MissingValue)
                } else {
                    Ok(Command::Answer(rest.to_owned()))
                }
            }
            "c" => Ok(Command::Clear),
            "n" => Ok(Command::Next),
            "p" => Ok(Command::Prev),
            "g" => rest
                .parse::<usize>()
                .ok()
                .and_then(|n| n.checked_sub(1))
                .map(Command::Goto)
                .ok_or_else(|| CommandError::InvalidIndex(rest.to_owned())),
            "s" => Ok(Command::Submit),
            "h" | "?" => Ok(Command::Help),
            "q" => Ok(Command::Quit),
            other => Err(CommandError::Unknown(other.to_owned())),
        }
    }
}

/// Resolve a typed token to an option label: a 1-based number or the label itself.
fn option_label(question: &Question, token: &str) -> String {
    token
        .parse::<usize>()
        .ok()
        .and_then(|n| n.checked_sub(1))
        .and_then(|i| question.options().get(i))
        .cloned()
        .unwrap_or_else(|| token.to_owned())
}

/// Turn the text after `a` into input for the shown question.
fn answer_input(question: &Question, raw: &str) -> AnswerInput {
    match question.kind() {
        QuestionKind::Text => AnswerInput::Text(raw.to_owned()),
        QuestionKind::Multiple => AnswerInput::Selections(
            raw.split(',')
                .map(str::trim)
                .filter(|token| !token.is_empty())
                .map(|token| option_label(question, token))
                .collect(),
        ),
        QuestionKind::Single | QuestionKind::TrueFalse => {
            AnswerInput::Choice(option_label(question, raw.trim()))
        }
    }
}

//
// ─── RENDERING ─────────────────────────────────────────────────────────────────
//

fn print_help() {
    println!("Commands:");
    println!("  a <value>   answer (option number or text; `a 1,3` for several)");
    println!("  c           clear the answer");
    println!("  n / p       next / previous question");
    println!("  g <n>       go to question n");
    println!("  s           submit");
    println!("  q           quit (answers already saved are kept)");
}

fn render_question(view: &SessionView) {
    let question = &view.current;
    println!();
    println!(
        "Question {} of {}  ({} {})",
        view.current_index + 1,
        view.total,
        question.points(),
        if question.points() == 1 { "point" } else { "points" }
    );
    println!("{}", question.prompt());

    let answer = view.current_answer.as_ref();
    match question.kind() {
        QuestionKind::Text => {
            let text = answer.and_then(Answer::as_text).unwrap_or("");
            println!("  Your answer: {text}");
        }
        kind => {
            for (i, option) in question.options().iter().enumerate() {
                let mark = if answer.is_some_and(|a| a.includes(option)) { "x" } else { " " };
                println!("  [{mark}] {}. {option}", i + 1);
            }
            if kind == QuestionKind::Multiple {
                println!("  Select up to {}", question.max_selections());
            }
        }
    }

    let strip: Vec<String> = view
        .nav
        .iter()
        .map(|item| {
            let n = item.index + 1;
            match (item.active, item.answered) {
                (true, true) => format!("<{n}*>"),
                (true, false) => format!("<{n}>"),
                (false, true) => format!("{n}*"),
                (false, false) => format!("{n}"),
            }
        })
        .collect();
    println!("{}   ({} of {} answered)", strip.join(" "), view.answered, view.total);
}

//
// ─── INPUT ─────────────────────────────────────────────────────────────────────
//

/// Line-oriented prompt, stdin outside of tests.
pub struct Prompt<R> {
    lines: Lines<R>,
}

impl Prompt<BufReader<Stdin>> {
    pub fn stdin() -> Self {
        Self::new(BufReader::new(tokio::io::stdin()))
    }
}

impl<R: AsyncBufRead + Unpin> Prompt<R> {
    pub fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
        }
    }

    /// `Ok(None)` on end of input.
    async fn ask(&mut self, label: &str) -> std::io::Result<Option<String>> {
        print!("{label}");
        std::io::stdout().flush()?;
        self.lines.next_line().await
    }
}

//
// ─── LOOP ──────────────────────────────────────────────────────────────────────
//

async fn register<R: AsyncBufRead + Unpin>(
    service: &QuizSessionService,
    prompt: &mut Prompt<R>,
) -> std::io::Result<Option<QuizSession>> {
    loop {
        println!();
        println!("Register for the quiz");
        let Some(sso) = prompt.ask("SSO (9 digits): ").await? else {
            return Ok(None);
        };
        let Some(name) = prompt.ask("Name: ").await? else {
            return Ok(None);
        };
        let Some(email) = prompt.ask("Email: ").await? else {
            return Ok(None);
        };
        let Some(location) = prompt.ask("Location: ").await? else {
            return Ok(None);
        };
        let draft = ParticipantDraft {
            sso,
            name,
            email,
            location,
        };

        match service.register(draft).await {
            Ok(registration) => {
                if let Some(message) = &registration.message {
                    println!("{message}");
                }
                return Ok(Some(registration.session));
            }
            Err(RegistrationError::Storage(e)) => {
                error!("registration failed: {e}");
                println!("Could not reach the quiz server. Please try again.");
            }
            Err(e) => println!("{e}"),
        }
    }
}

/// Ask for confirmation. Returns `true` once the quiz is submitted.
async fn submit<R: AsyncBufRead + Unpin>(
    service: &QuizSessionService,
    session: &mut QuizSession,
    prompt: &mut Prompt<R>,
) -> std::io::Result<bool> {
    let review = match service.request_submit(session, None).await {
        Ok(review) => review,
        Err(e) => {
            println!("{e}");
            return Ok(false);
        }
    };

    println!();
    println!(
        "You have answered {} out of {} questions.",
        review.answered, review.total
    );
    if !review.all_answered() {
        println!("{} question(s) are still unanswered.", review.unanswered());
    }

    loop {
        let Some(reply) = prompt.ask("Submit now? [y/n] ").await? else {
            return Ok(false);
        };
        match reply.trim() {
            "y" | "Y" => match service.confirm_submit(session).await {
                Ok(result) => {
                    println!();
                    println!("Quiz submitted. Your score: {}", result.score());
                    return Ok(true);
                }
                Err(e) => {
                    error!("submission failed: {e}");
                    println!("Submission failed: {e}. Answer `y` to retry or `n` to go back.");
                }
            },
            "n" | "N" => {
                if let Err(e) = service.cancel_submit(session) {
                    println!("{e}");
                }
                return Ok(false);
            }
            _ => println!("Please answer y or n."),
        }
    }
}

/// Drive one participant from registration to submission.
///
/// # Errors
///
/// Returns I/O errors from the terminal.
pub async fn run<R: AsyncBufRead + Unpin>(
    service: &QuizSessionService,
    prompt: &mut Prompt<R>,
) -> std::io::Result<()> {
    let outcome = drive(service, prompt).await;
    // Saves may still be in flight on every exit path.
    service.flush_saves().await;
    outcome
}

async fn drive<R: AsyncBufRead + Unpin>(
    service: &QuizSessionService,
    prompt: &mut Prompt<R>,
) -> std::io::Result<()> {
    let Some(mut session) = register(service, prompt).await? else {
        return Ok(());
    };
    print_help();

    while Screen::for_session(Some(&session)) == Screen::InProgress {
        render_question(&SessionView::from_session(&session));
        let Some(line) = prompt.ask("> ").await? else {
            break;
        };

        let command = match Command::parse(&line) {
            Ok(command) => command,
            Err(e) => {
                println!("{e}");
                continue;
            }
        };

        let current = session.current_index();
        let outcome = match command {
            Command::Answer(raw) => {
                let question = session.current_question();
                let id = question.id();
                let input = answer_input(question, &raw);
                service.record_answer(&mut session, id, input).map(drop)
            }
            Command::Clear => {
                let id = session.current_question().id();
                service
                    .record_answer(&mut session, id, AnswerInput::Cleared)
                    .map(drop)
            }
            Command::Next => service
                .navigate_to(&mut session, None, current + 1)
                .map(drop),
            Command::Prev => service
                .navigate_to(&mut session, None, current.saturating_sub(1))
                .map(drop),
            Command::Goto(index) => service.navigate_to(&mut session, None, index).map(drop),
            Command::Submit => {
                if submit(service, &mut session, prompt).await? {
                    break;
                }
                Ok(())
            }
            Command::Help => {
                print_help();
                Ok(())
            }
            Command::Quit => break,
        };

        if let Err(e) = outcome {
            println!("{e}");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use quiz_core::model::{QuestionId, Sso};
    use quiz_core::time::Clock;
    use storage::AnswerStore;

    use crate::demo;

    fn question(kind: QuestionKind, options: &[&str]) -> Question {
        Question::new(
            QuestionId::new(1),
            "Pick",
            kind,
            options.iter().map(|o| (*o).to_owned()).collect(),
            1,
            (kind == QuestionKind::Multiple).then_some(2),
        )
        .unwrap()
    }

    #[test]
    fn parses_commands() {
        assert_eq!(Command::parse("a 1,3"), Ok(Command::Answer("1,3".into())));
        assert_eq!(Command::parse("  n "), Ok(Command::Next));
        assert_eq!(Command::parse("g 3"), Ok(Command::Goto(2)));
        assert_eq!(Command::parse("g 0"), Err(CommandError::InvalidIndex("0".into())));
        assert_eq!(Command::parse("a"), Err(CommandError::MissingValue));
        assert_eq!(Command::parse("x"), Err(CommandError::Unknown("x".into())));
        assert_eq!(Command::parse(""), Err(CommandError::Empty));
    }

    #[test]
    fn numbers_resolve_to_option_labels() {
        let single = question(QuestionKind::Single, &["A", "B", "C"]);
        assert_eq!(answer_input(&single, "2"), AnswerInput::Choice("B".into()));
        assert_eq!(answer_input(&single, "C"), AnswerInput::Choice("C".into()));
        assert_eq!(answer_input(&single, "9"), AnswerInput::Choice("9".into()));

        let multiple = question(QuestionKind::Multiple, &["X", "Y", "Z"]);
        assert_eq!(
            answer_input(&multiple, "1, 3"),
            AnswerInput::Selections(vec!["X".into(), "Z".into()])
        );

        let text = question(QuestionKind::Text, &[]);
        assert_eq!(answer_input(&text, "hello world"), AnswerInput::Text("hello world".into()));
    }

    #[tokio::test]
    async fn quitting_keeps_the_answer_just_given() {
        let store = demo::demo_store().unwrap();
        let answers: Arc<dyn AnswerStore> = Arc::new(store.clone());
        let service = QuizSessionService::new(Clock::default_clock(), answers);
        let script = b"123456789\nAda Lovelace\nada@example.com\nDemo\na 1\nq\n";
        let mut prompt = Prompt::new(BufReader::new(&script[..]));

        run(&service, &mut prompt).await.unwrap();

        let held = store.stored_answers(&Sso::parse("123456789").unwrap()).unwrap();
        assert_eq!(held.get(&QuestionId::new(1)), Some(&Answer::Choice("let".into())));
    }

    #[tokio::test]
    async fn end_of_input_during_the_quiz_still_saves() {
        let store = demo::demo_store().unwrap();
        let answers: Arc<dyn AnswerStore> = Arc::new(store.clone());
        let service = QuizSessionService::new(Clock::default_clock(), answers);
        let script = b"123456789\nAda Lovelace\nada@example.com\nDemo\nn\na 1,3\n";
        let mut prompt = Prompt::new(BufReader::new(&script[..]));

        run(&service, &mut prompt).await.unwrap();

        let held = store.stored_answers(&Sso::parse("123456789").unwrap()).unwrap();
        assert_eq!(
            held.get(&QuestionId::new(2)),
            Some(&Answer::Selections(["u8".to_owned(), "i128".to_owned()].into_iter().collect()))
        );
    }
}
