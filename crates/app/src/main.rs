use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use quiz_core::model::{Catalog, UserId};
use quiz_core::{DEFAULT_PASS_THRESHOLD, DEFAULT_QUESTION_COUNT};
use services::config::DEFAULT_QUIZ_NAME;
use services::{AppServices, Clock, Identity, NotifierConfig, QuizConfig};

mod report;
mod terminal;

use report::Reveal;

const BUILTIN_QUESTIONS: &str = include_str!("../data/questions.json");

#[derive(Parser)]
#[command(name = "quiz", version, about = "Timed multiple-choice quiz")]
struct Cli {
    /// SQLite database holding local attempt state and saved results
    #[arg(long = "db", env = "QUIZ_DB_URL", default_value = "sqlite://quiz.sqlite3", global = true)]
    db_url: String,

    /// Question catalog (JSON array); the built-in catalog when omitted
    #[arg(long, env = "QUIZ_QUESTIONS", global = true)]
    questions: Option<PathBuf>,

    /// Signed-in participant; results are only saved when set
    #[arg(long, env = "QUIZ_USER_ID", global = true)]
    user_id: Option<String>,

    /// Address the result notification goes to
    #[arg(long, env = "QUIZ_USER_EMAIL", global = true)]
    email: Option<String>,

    /// Questions per attempt
    #[arg(long, default_value_t = DEFAULT_QUESTION_COUNT, global = true)]
    count: usize,

    /// Time limit for the whole attempt, in minutes
    #[arg(long, default_value_t = 30, global = true)]
    minutes: u64,

    /// Show the correct answer next to each wrong one in result views
    #[arg(long, global = true)]
    reveal_answers: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Take or resume the attempt stored on this device
    Take,
    /// Show a saved result from a review link or result id, or this device's result
    Review {
        /// Review link, URL or bare result id
        reference: Option<String>,
    },
    /// Discard the current attempt and start over on the next `take`
    Retake,
}

fn load_catalog(path: Option<&Path>) -> anyhow::Result<Catalog> {
    let catalog = match path {
        Some(path) => {
            let json = std::fs::read_to_string(path)
                .with_context(|| format!("reading questions from {}", path.display()))?;
            Catalog::from_json(&json)
                .with_context(|| format!("parsing questions in {}", path.display()))?
        }
        None => Catalog::from_json(BUILTIN_QUESTIONS).context("parsing built-in questions")?,
    };
    if catalog.is_empty() {
        bail!("the question catalog is empty");
    }
    Ok(catalog)
}

fn identity(cli: &Cli) -> anyhow::Result<Option<Identity>> {
    let Some(raw) = cli.user_id.as_deref().map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(None);
    };
    let user_id = UserId::new(raw).context("invalid --user-id")?;
    Ok(Some(Identity::new(user_id, cli.email.clone())))
}

/// Make relative `SQLite` paths absolute against the working directory.
fn normalize_sqlite_url(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed == "sqlite::memory:" || trimmed.starts_with("sqlite://") {
        return trimmed.to_owned();
    }

    let path_str = trimmed.strip_prefix("sqlite:").unwrap_or(trimmed);
    let path = Path::new(path_str);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(path)
    };
    format!("sqlite://{}", absolute.display())
}

/// Create the database file and its parent directories if missing.
fn prepare_sqlite_file(db_url: &str) -> anyhow::Result<()> {
    if db_url == "sqlite::memory:" {
        return Ok(());
    }

    let Some(path) = db_url.strip_prefix("sqlite://") else {
        bail!("invalid --db value: {db_url}");
    };
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() {
        bail!("invalid --db value: {db_url}");
    }

    let path = Path::new(path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating {}", parent.display()))?;
    }
    if !path.exists() {
        std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path)
            .with_context(|| format!("creating {}", path.display()))?;
    }
    Ok(())
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = QuizConfig::new(
        cli.count,
        Duration::from_secs(cli.minutes.saturating_mul(60)),
        DEFAULT_QUIZ_NAME,
        DEFAULT_PASS_THRESHOLD,
    )?;
    let catalog = load_catalog(cli.questions.as_deref())?;
    let identity = identity(&cli)?;
    let reveal = if cli.reveal_answers {
        Reveal::CorrectAnswers
    } else {
        Reveal::Hidden
    };

    // Open + migrate SQLite at startup; core and services stay storage-agnostic.
    let db_url = normalize_sqlite_url(&cli.db_url);
    prepare_sqlite_file(&db_url)?;
    let services = AppServices::new_sqlite(
        &db_url,
        Clock::default_clock(),
        config,
        catalog,
        NotifierConfig::from_env(),
    )
    .await?;
    info!(db = %db_url, questions = services.catalog().len(), "quiz ready");

    match cli.command {
        Command::Take => {
            let mut rng = rand::rng();
            let session = services.quiz().start(identity, &mut rng).await?;
            terminal::take(&services, session, reveal).await
        }
        Command::Review { reference } => {
            report::review(&services, reference.as_deref(), identity, reveal).await
        }
        Command::Retake => {
            services.quiz().local_state().clear_attempt().await?;
            println!("Attempt cleared. Run `take` to start a new one.");
            Ok(())
        }
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(err) = run(Cli::parse()).await {
        // At this layer (binary glue), printing once is fine.
        eprintln!("{err:#}");
        std::process::exit(2);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sqlite_urls_are_made_absolute() {
        assert_eq!(normalize_sqlite_url("sqlite::memory:"), "sqlite::memory:");
        assert_eq!(
            normalize_sqlite_url("sqlite:///tmp/quiz.sqlite3"),
            "sqlite:///tmp/quiz.sqlite3"
        );
        assert_eq!(normalize_sqlite_url("/tmp/q.db"), "sqlite:///tmp/q.db");
        let relative = normalize_sqlite_url("sqlite:data/q.db");
        assert!(relative.starts_with("sqlite:///"));
        assert!(relative.ends_with("data/q.db"));
    }

    #[test]
    fn prepare_rejects_non_file_urls() {
        assert!(prepare_sqlite_file("sqlite::memory:").is_ok());
        assert!(prepare_sqlite_file("postgres://x").is_err());
        assert!(prepare_sqlite_file("sqlite://?mode=rwc").is_err());
    }

    #[test]
    fn builtin_catalog_covers_a_full_attempt() {
        let catalog = load_catalog(None).unwrap();
        assert!(catalog.len() >= DEFAULT_QUESTION_COUNT);
    }

    #[test]
    fn cli_parses_subcommands_and_defaults() {
        let cli = Cli::try_parse_from(["quiz", "review", "abc"]).unwrap();
        assert_eq!(cli.count, DEFAULT_QUESTION_COUNT);
        assert_eq!(cli.minutes, 30);
        assert!(!cli.reveal_answers);
        assert!(matches!(cli.command, Command::Review { reference: Some(ref r) } if r == "abc"));

        let cli = Cli::try_parse_from(["quiz", "take", "--count", "5", "--user-id", " "]).unwrap();
        assert_eq!(cli.count, 5);
        assert!(identity(&cli).unwrap().is_none());
    }
}
