mod seed;
mod terminal;

use std::fmt;

use exam_core::model::{ExamConfig, ExamMode, SubjectProfile};
use services::{Clock, ExamServices, ServicesConfig, SupplyKind};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidNumber { flag: &'static str, raw: String },
    InvalidMode { raw: String },
    InvalidDbUrl { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidNumber { flag, raw } => write!(f, "invalid {flag} value: {raw}"),
            ArgsError::InvalidMode { raw } => write!(f, "invalid --mode value: {raw}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
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

fn require_number(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<u32, ArgsError> {
    let value = require_value(args, flag)?;
    value
        .trim()
        .parse()
        .map_err(|_| ArgsError::InvalidNumber { flag, raw: value })
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  concurso exam    [--mode practica|simulacro|rapido] [--count <n>] [profile] [--db <sqlite_url>]");
    eprintln!("  concurso history [--days <n>] [--limit <n>] [profile] [--db <sqlite_url>]");
    eprintln!("  concurso seed    [profile] [--db <sqlite_url>]");
    eprintln!();
    eprintln!("Profile flags:");
    eprintln!("  --role <cargo> --area <área> [--competency <competencia>]");
    eprintln!();
    eprintln!("Defaults:");
    eprintln!("  --mode practica, --days 30, --limit 20");
    eprintln!("  --role \"Docente de aula\" --area \"Primaria\"");
    eprintln!();
    eprintln!("Environment (.env is read if present):");
    eprintln!("  CONCURSO_DB_URL, CONCURSO_ROLE, CONCURSO_AREA");
    eprintln!("  CONCURSO_AI_API_KEY, CONCURSO_AI_BASE_URL, CONCURSO_AI_MODEL");
    eprintln!("  RUST_LOG (default: info)");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Exam,
    History,
    Seed,
}

impl Command {
    fn from_arg(arg: &str) -> Option<Self> {
        match arg {
            "exam" | "examen" => Some(Self::Exam),
            "history" | "historial" => Some(Self::History),
            "seed" => Some(Self::Seed),
            _ => None,
        }
    }
}

struct Args {
    db_url: Option<String>,
    mode: ExamMode,
    count: Option<u32>,
    role: String,
    area: String,
    competency: Option<String>,
    days: u32,
    limit: u32,
}

impl Args {
    fn parse(args: &mut impl Iterator<Item = String>) -> Result<Self, ArgsError> {
        let mut parsed = Self {
            db_url: None,
            mode: ExamMode::Practice,
            count: None,
            role: std::env::var("CONCURSO_ROLE").unwrap_or_else(|_| "Docente de aula".into()),
            area: std::env::var("CONCURSO_AREA").unwrap_or_else(|_| "Primaria".into()),
            competency: None,
            days: 30,
            limit: 20,
        };

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    parsed.db_url = Some(normalize_sqlite_url(value));
                }
                "--mode" => {
                    let value = require_value(args, "--mode")?;
                    parsed.mode = value
                        .parse()
                        .map_err(|_| ArgsError::InvalidMode { raw: value.clone() })?;
                }
                "--count" => parsed.count = Some(require_number(args, "--count")?),
                "--days" => parsed.days = require_number(args, "--days")?,
                "--limit" => parsed.limit = require_number(args, "--limit")?,
                "--role" => parsed.role = require_value(args, "--role")?,
                "--area" => parsed.area = require_value(args, "--area")?,
                "--competency" => parsed.competency = Some(require_value(args, "--competency")?),
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        Ok(parsed)
    }

    fn profile(&self) -> Result<SubjectProfile, Box<dyn std::error::Error>> {
        Ok(SubjectProfile::new(self.role.clone(), self.area.clone())?
            .with_competency(self.competency.clone()))
    }

    fn exam_config(&self) -> Result<ExamConfig, Box<dyn std::error::Error>> {
        let config = ExamConfig::for_mode(self.mode);
        Ok(match self.count {
            Some(count) => config.with_target_count(count)?,
            None => config,
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

/// Logs go to stderr so the exam owns stdout.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .init();
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let mut argv: Vec<String> = std::env::args().skip(1).collect();

    let cmd = match argv.first().map(String::as_str) {
        None => Command::Exam,
        Some("--help" | "-h") => {
            print_usage();
            return Ok(());
        }
        Some(first) if first.starts_with("--") => Command::Exam,
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

    let mut config = ServicesConfig::from_env();
    config.db_url = normalize_sqlite_url(parsed.db_url.clone().unwrap_or(config.db_url));
    if cmd == Command::Seed {
        // seeding never calls the AI endpoint
        config.ai = None;
    }

    // Open + migrate SQLite at startup. Keep this in the binary glue so core/services stay pure.
    prepare_sqlite_file(&config.db_url)?;
    let services = ExamServices::new_sqlite(&config, Clock::default_clock()).await?;
    let profile = parsed.profile()?;

    match cmd {
        Command::Exam => {
            if services.supply_kind() == SupplyKind::Bank
                && services.bank().count_questions(&profile).await? == 0
            {
                eprintln!(
                    "No questions for {} / {}. Run `concurso seed` or set CONCURSO_AI_API_KEY.",
                    profile.role(),
                    profile.area()
                );
                return Ok(());
            }
            tracing::info!(supply = ?services.supply_kind(), db = %config.db_url, "starting exam");
            terminal::run_exam(&services, parsed.exam_config()?, profile).await
        }
        Command::History => {
            terminal::print_history(&services, &profile, parsed.days, parsed.limit).await
        }
        Command::Seed => {
            let questions = seed::sample_questions()?;
            let stored = services.bank().upsert_questions(&profile, &questions).await?;
            let total = services.bank().count_questions(&profile).await?;
            eprintln!(
                "seeded {stored} questions for {} / {} ({total} in bank, db={})",
                profile.role(),
                profile.area(),
                config.db_url
            );
            Ok(())
        }
    }
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
