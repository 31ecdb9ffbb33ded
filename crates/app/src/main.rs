use std::fmt;
use std::sync::Arc;

use log::{debug, info};
use quiz_core::model::RegistrationPolicy;
use services::{Clock, QuizSessionService};
use storage::{AnswerStore, HttpStoreConfig, Storage};

mod demo;
mod terminal;

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidApiUrl { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidApiUrl { raw } => write!(f, "invalid --api value: {raw}"),
        }
    }
}

impl std::error::Error for ArgsError {}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p app -- take [--api <base_url>] [--email-domain <domain>]");
    eprintln!("  cargo run -p app -- demo [--email-domain <domain>]  # offline sample quiz");
    eprintln!();
    eprintln!("Defaults for take:");
    eprintln!("  --api {}", storage::http::DEFAULT_BASE_URL);
    eprintln!();
    eprintln!("Environment (a .env file is read first):");
    eprintln!("  QUIZ_API_BASE_URL, QUIZ_API_TIMEOUT_SECS, QUIZ_EMAIL_DOMAIN, RUST_LOG");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Take,
    Demo,
}

impl Command {
    fn from_arg(arg: &str) -> Option<Self> {
        match arg {
            "take" => Some(Self::Take),
            "demo" => Some(Self::Demo),
            _ => None,
        }
    }
}

struct Args {
    store: HttpStoreConfig,
    policy: RegistrationPolicy,
}

impl Args {
    fn parse(args: &mut impl Iterator<Item = String>) -> Result<Self, ArgsError> {
        let mut store = HttpStoreConfig::from_env();
        let mut policy = RegistrationPolicy::from_env();

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--api" => {
                    let value = require_value(args, "--api")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidApiUrl { raw: value });
                    }
                    store.base_url = value;
                }
                "--email-domain" => {
                    let value = require_value(args, "--email-domain")?;
                    policy = RegistrationPolicy::open().with_email_domain(value);
                }
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        Ok(Self { store, policy })
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let mut argv: Vec<String> = std::env::args().skip(1).collect();

    // Default behavior: take the quiz against the configured API.
    let cmd = match argv.first().map(String::as_str) {
        None => Command::Take,
        Some("--help" | "-h") => {
            print_usage();
            return Ok(());
        }
        Some(first) if first.starts_with("--") => Command::Take,
        Some(first) => Command::from_arg(first).ok_or_else(|| {
            eprintln!("unknown subcommand: {first}");
            print_usage();
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "unknown subcommand")
        })?,
    };

    if !argv.is_empty() && !argv[0].starts_with("--") {
        argv.remove(0);
    }

    let mut iter = argv.into_iter();
    let parsed = Args::parse(&mut iter).map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    let storage = match cmd {
        Command::Take => {
            info!("using quiz API at {}", parsed.store.base_url);
            Storage::http(&parsed.store)?
        }
        Command::Demo => {
            let answers: Arc<dyn AnswerStore> = Arc::new(demo::demo_store()?);
            println!("Offline demo: register with location \"{}\".", demo::DEMO_LOCATION);
            Storage { answers }
        }
    };

    if let Some(domain) = parsed.policy.email_domain() {
        debug!("registration limited to @{domain} addresses");
    }
    let service = QuizSessionService::from_storage(Clock::default_clock(), &storage)
        .with_policy(parsed.policy);

    let mut prompt = terminal::Prompt::stdin();
    terminal::run(&service, &mut prompt).await?;
    Ok(())
}

#[tokio::main]
async fn main() {
    // Load .env before the logger so RUST_LOG can live there too.
    let dotenv = dotenvy::dotenv();
    env_logger::init();
    match dotenv {
        Ok(path) => debug!("loaded environment from {}", path.display()),
        Err(e) => debug!("no .env loaded: {e}"),
    }

    if let Err(err) = run().await {
        // At this layer (binary glue), printing once is fine.
        log::error!("{err}");
        eprintln!("{err}");
        std::process::exit(2);
    }
}
