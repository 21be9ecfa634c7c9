use std::fmt;
use std::time::Duration;

use quiz_core::model::{AttemptId, QuestionBank, QuizSettings, UserId};
use services::{
    AppServices, AttemptSummary, Clock, QuestionTimer, QuizAnswerResult, QuizSession,
    SessionError, TimerEvent,
};
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tracing_subscriber::EnvFilter;

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidDbUrl { raw: String },
    InvalidTimePerQuestion { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::InvalidTimePerQuestion { raw } => {
                write!(f, "invalid --time-per-question value: {raw}")
            }
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
    eprintln!("  cargo run -p app -- [--db <sqlite_url>] [--time-per-question <secs>] [--in-memory]");
    eprintln!();
    eprintln!("Defaults:");
    eprintln!("  --db sqlite://quiz.sqlite3");
    eprintln!("  --time-per-question 30");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  QUIZ_DB_URL, QUIZ_TIME_PER_QUESTION, RUST_LOG");
}

struct Args {
    db_url: String,
    time_per_question: Duration,
    in_memory: bool,
}

impl Args {
    fn parse(args: &mut impl Iterator<Item = String>) -> Result<Self, ArgsError> {
        let mut db_url = std::env::var("QUIZ_DB_URL")
            .ok()
            .map_or_else(|| normalize_sqlite_url("quiz.sqlite3".into()), normalize_sqlite_url);
        let mut time_per_question = std::env::var("QUIZ_TIME_PER_QUESTION")
            .ok()
            .and_then(|value| value.parse::<u64>().ok())
            .filter(|secs| *secs > 0)
            .map_or_else(
                || Duration::from_secs(QuizSettings::DEFAULT_TIME_PER_QUESTION_SECS),
                Duration::from_secs,
            );
        let mut in_memory = false;

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = normalize_sqlite_url(value);
                }
                "--time-per-question" => {
                    let value = require_value(args, "--time-per-question")?;
                    let secs: u64 = value
                        .parse()
                        .ok()
                        .filter(|secs| *secs > 0)
                        .ok_or_else(|| ArgsError::InvalidTimePerQuestion { raw: value.clone() })?;
                    time_per_question = Duration::from_secs(secs);
                }
                "--in-memory" => in_memory = true,
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        Ok(Self {
            db_url,
            time_per_question,
            in_memory,
        })
    }
}

fn normalize_sqlite_url(raw: String) -> String {
    if raw == "sqlite::memory:" || raw.starts_with("sqlite://") {
        return raw;
    }

    let trimmed = raw.trim().to_string();
    let path_str = trimmed
        .strip_prefix("sqlite:")
        .unwrap_or(trimmed.as_str())
        .to_string();
    let path = std::path::Path::new(&path_str);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| std::path::PathBuf::from("."))
            .join(path)
    };
    format!("sqlite://{}", absolute.display())
}

fn prepare_sqlite_file(db_url: &str) -> Result<(), Box<dyn std::error::Error>> {
    if db_url == "sqlite::memory:" {
        return Ok(());
    }

    let path = db_url
        .strip_prefix("sqlite://")
        .ok_or_else(|| ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        })?;
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() {
        return Err(ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        }
        .into());
    }

    let path = std::path::Path::new(path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    if !path.exists() {
        std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path)?;
    }

    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("app=info,services=info,storage=warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

type Input = Lines<BufReader<Stdin>>;

/// What the player asked for while a question was on screen.
enum Turn {
    Answered(QuizAnswerResult),
    NewAttempt,
    Quit,
}

async fn play_question(
    services: &AppServices,
    session: &mut QuizSession,
    timer: &mut QuestionTimer,
    input: &mut Input,
) -> Result<Turn, Box<dyn std::error::Error>> {
    let quiz = services.quiz_loop();
    let Some(question) = session.current_question().cloned() else {
        return Ok(Turn::Quit);
    };
    let progress = session.progress();

    println!();
    println!(
        "Question {}/{}: {}",
        progress.answered + 1,
        progress.total,
        question.text()
    );
    for option in question.options() {
        println!("  [{}] {}", option.id, option.text);
    }
    println!(
        "({}s; type an option id, 'n' for a new attempt, 'q' to quit)",
        services.settings().time_per_question().as_secs()
    );

    let mut events = timer.start(session.current_index(), services.settings().time_per_question());
    let turn = loop {
        tokio::select! {
            line = input.next_line() => {
                let Some(line) = line? else {
                    break Turn::Quit;
                };
                match line.trim() {
                    "" => {}
                    "q" => break Turn::Quit,
                    "n" => break Turn::NewAttempt,
                    choice => match quiz.answer_current(session, choice).await {
                        Ok(result) => break Turn::Answered(result),
                        Err(SessionError::UnknownOption { .. }) => {
                            println!("No option '{choice}'.");
                        }
                        Err(err) => return Err(err.into()),
                    },
                }
            }
            Some(event) = events.recv() => match event {
                TimerEvent::Tick { remaining_secs, .. } if remaining_secs <= 5 => {
                    println!("  {remaining_secs}s left");
                }
                TimerEvent::Tick { .. } => {}
                TimerEvent::Expired { question_index } => {
                    println!("Time's up!");
                    if let Some(result) = quiz.time_out(session, question_index).await? {
                        break Turn::Answered(result);
                    }
                }
            },
        }
    };
    timer.cancel();
    Ok(turn)
}

fn print_feedback(result: &QuizAnswerResult) {
    if result.answer.is_correct {
        println!("Correct!");
    } else {
        println!("Wrong. The answer was: {}", result.answer.correct_answer);
    }
    if !result.persisted {
        println!("(progress could not be saved; continuing without saving)");
    }
}

fn print_summary(summary: &AttemptSummary) {
    println!();
    println!(
        "Finished: {}/{} correct ({}%)",
        summary.score, summary.total_questions, summary.percent
    );
    for (i, answer) in summary.answers.iter().enumerate() {
        let mark = if answer.is_correct { "+" } else { "-" };
        let given = if answer.user_answer.is_empty() {
            "(no answer)"
        } else {
            answer.user_answer.as_str()
        };
        println!("  {mark} {}. {} -> {given}", i + 1, answer.question);
    }
}

async fn print_history(services: &AppServices) {
    let total = services.quiz_loop().questions().len();
    match services.history().list(services.user_id(), total).await {
        Ok(items) if items.is_empty() => println!("No previous attempts."),
        Ok(items) => {
            println!("Previous attempts:");
            for item in items {
                let status = if item.is_complete {
                    "complete"
                } else {
                    "in progress"
                };
                println!(
                    "  #{} {} score {}/{} ({}/{} answered, {status})",
                    item.id,
                    item.timestamp.format("%Y-%m-%d %H:%M"),
                    item.score,
                    item.total_questions,
                    item.answered,
                    item.total_questions,
                );
            }
        }
        Err(err) => tracing::warn!(error = %err, "failed to load attempt history"),
    }
}

/// Choice made on the history screen.
#[derive(Debug, PartialEq, Eq)]
enum MenuChoice {
    Continue,
    New,
    Open(AttemptId),
    Quit,
}

fn parse_menu_choice(line: &str) -> Option<MenuChoice> {
    match line.trim() {
        "" => Some(MenuChoice::Continue),
        "n" => Some(MenuChoice::New),
        "q" => Some(MenuChoice::Quit),
        other => {
            let raw = other.strip_prefix('#').unwrap_or(other);
            raw.parse().ok().map(MenuChoice::Open)
        }
    }
}

/// Show the history and let the player pick what to play next.
///
/// Complete attempts opened here are reviewed in place; `None` means quit.
async fn choose_session(
    services: &AppServices,
    user_id: &UserId,
    input: &mut Input,
) -> Result<Option<QuizSession>, Box<dyn std::error::Error>> {
    let quiz = services.quiz_loop();
    loop {
        print_history(services).await;
        println!("(Enter to continue, '#<id>' to open an attempt, 'n' for a new attempt, 'q' to quit)");
        let Some(line) = input.next_line().await? else {
            return Ok(None);
        };
        match parse_menu_choice(&line) {
            Some(MenuChoice::Continue) => {
                let start = quiz.start_or_resume(user_id).await;
                if start.resumed {
                    println!(
                        "Resuming your last attempt at question {}.",
                        start.session.current_index() + 1
                    );
                }
                return Ok(Some(start.session));
            }
            Some(MenuChoice::New) => {
                println!("Starting a new attempt.");
                return Ok(Some(quiz.start_new(user_id)));
            }
            Some(MenuChoice::Quit) => return Ok(None),
            Some(MenuChoice::Open(id)) => match quiz.open_attempt(user_id, id).await {
                Ok(session) if session.is_complete() => {
                    print_summary(&AttemptSummary::from_attempt(
                        session.attempt(),
                        session.total_questions(),
                    ));
                }
                Ok(session) => {
                    println!(
                        "Continuing attempt #{id} at question {}.",
                        session.current_index() + 1
                    );
                    return Ok(Some(session));
                }
                Err(err) => println!("Cannot open attempt #{id}: {err}"),
            },
            None => println!("Unrecognized choice '{}'.", line.trim()),
        }
    }
}

fn quit_message(degraded: bool, last_persisted: bool) -> &'static str {
    if degraded {
        "Progress was not saved this session."
    } else if !last_persisted {
        "Your latest answers could not be saved; run again to resume from the last saved question."
    } else {
        "Your progress is saved; run again to resume."
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let mut argv = std::env::args().skip(1);
    let parsed = Args::parse(&mut argv).map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    let clock = Clock::default_clock();
    let questions = QuestionBank::sample();
    let settings = QuizSettings::new(
        parsed.time_per_question,
        QuizSettings::default().feedback_delay(),
    )?;

    // Open + migrate SQLite at startup. Keep this in the binary glue so core/services stay pure.
    let services = if parsed.in_memory {
        AppServices::in_memory(clock, questions, settings).await?
    } else {
        if let Err(err) = prepare_sqlite_file(&parsed.db_url) {
            tracing::warn!(error = %err, db = %parsed.db_url, "cannot prepare database file");
        }
        AppServices::bootstrap(&parsed.db_url, clock, questions, settings).await?
    };
    if let Some(reason) = services.degraded_reason() {
        println!("Progress will not be saved this session ({reason}).");
    }

    let quiz = services.quiz_loop();
    let user_id = services.user_id().clone();
    let mut timer = QuestionTimer::new();
    let mut input = BufReader::new(tokio::io::stdin()).lines();
    let mut last_persisted = true;

    while let Some(mut session) = choose_session(&services, &user_id, &mut input).await? {
        while !session.is_complete() {
            match play_question(&services, &mut session, &mut timer, &mut input).await? {
                Turn::Answered(result) => {
                    last_persisted = result.persisted;
                    print_feedback(&result);
                    tokio::time::sleep(services.settings().feedback_delay()).await;
                }
                Turn::NewAttempt => {
                    println!("Starting a new attempt.");
                    session = quiz.start_new(&user_id);
                }
                Turn::Quit => {
                    println!("{}", quit_message(services.is_degraded(), last_persisted));
                    return Ok(());
                }
            }
        }

        print_summary(&AttemptSummary::from_attempt(
            session.attempt(),
            session.total_questions(),
        ));
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    init_tracing();
    if let Err(err) = run().await {
        // At this layer (binary glue), printing once is fine.
        eprintln!("{err}");
        std::process::exit(2);
    }
}
