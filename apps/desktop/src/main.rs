use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use client_core::{
    workflow::{DEFAULT_NUM_QUESTIONS, DEFAULT_OBJECTIVE, DEFAULT_PAPER_LIMIT},
    Notification, NotificationLevel, ReviewBackend, ReviewClient, ReviewSession, Step,
};
use shared::{
    domain::{PaperSource, DEFAULT_MODEL, KNOWN_MODELS},
    protocol::DOCUMENT_FILENAME,
};
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "litreview", about = "Drive a systematic literature review against a review server")]
struct Cli {
    #[arg(long, env = "LITREVIEW_SERVER_URL", default_value = "http://127.0.0.1:5000")]
    server_url: String,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run every step and write the LaTeX summary.
    Run(RunArgs),
    /// List the models the server can route to.
    Models,
    /// Check that the server is reachable.
    Health,
}

#[derive(Args, Debug)]
struct RunArgs {
    #[arg(long, default_value = DEFAULT_OBJECTIVE)]
    objective: String,
    #[arg(long, default_value_t = DEFAULT_NUM_QUESTIONS, value_parser = clap::value_parser!(u32).range(1..))]
    num_questions: u32,
    #[arg(long, default_value = DEFAULT_MODEL)]
    model: String,
    #[arg(long, value_enum, default_value_t = SourceArg::Scopus)]
    source: SourceArg,
    /// Defaults to the previous calendar year.
    #[arg(long)]
    start_year: Option<i32>,
    #[arg(long, default_value_t = DEFAULT_PAPER_LIMIT)]
    limit: u32,
    /// Keep every fetched paper instead of asking the model to filter.
    #[arg(long)]
    skip_filter: bool,
    /// Where to write the document; defaults to the server-provided filename.
    #[arg(long, short)]
    output: Option<PathBuf>,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum SourceArg {
    Scopus,
    Semanticscholar,
}

impl From<SourceArg> for PaperSource {
    fn from(value: SourceArg) -> Self {
        match value {
            SourceArg::Scopus => PaperSource::Scopus,
            SourceArg::Semanticscholar => PaperSource::SemanticScholar,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter("warn")
        .with_writer(std::io::stderr)
        .init();
    let cli = Cli::parse();

    match cli.command {
        Command::Models => {
            for model in KNOWN_MODELS {
                println!("{:<22} {}", model.value, model.label);
            }
        }
        Command::Health => {
            let client = ReviewClient::new(&cli.server_url)?;
            client
                .health()
                .await
                .with_context(|| format!("server at {} is not healthy", cli.server_url))?;
            println!("ok");
        }
        Command::Run(args) => {
            let client = ReviewClient::new(&cli.server_url)?;
            run(&client, args).await?;
        }
    }

    Ok(())
}

fn session_from(args: &RunArgs) -> ReviewSession {
    let mut session = ReviewSession::new();
    session.objective = args.objective.clone();
    session.num_questions = args.num_questions;
    session.model = args.model.clone();
    if let Some(year) = args.start_year {
        session.start_year = year;
    }
    session.paper_limit = args.limit;
    session
}

fn plan(args: &RunArgs) -> Vec<Step> {
    let mut steps = vec![
        Step::GenerateQuestions,
        Step::GenerateSearchString,
        Step::SearchPapers(args.source.into()),
    ];
    if !args.skip_filter {
        steps.push(Step::FilterPapers);
    }
    steps.extend([
        Step::AnswerQuestions,
        Step::GenerateAbstract,
        Step::GenerateIntroduction,
        Step::GenerateConclusion,
        Step::ComposeDocument,
    ]);
    steps
}

async fn run(backend: &dyn ReviewBackend, args: RunArgs) -> Result<()> {
    let mut session = session_from(&args);

    for step in plan(&args) {
        info!(step = step.label(), "running");
        println!("==> {}", step.label());
        session.run(step, backend).await?;
        let failed = report(&session.drain_notifications());

        if failed {
            bail!("{} failed", step.label());
        }
        match step {
            Step::GenerateQuestions if session.questions().is_empty() => {
                bail!("the server returned no research questions")
            }
            Step::SearchPapers(_) if session.papers().is_empty() => {
                bail!("no papers matched the search string")
            }
            Step::SearchPapers(_) if args.skip_filter => session.select_all_papers(),
            Step::FilterPapers if session.selected_papers().is_empty() => {
                bail!("no paper was judged relevant")
            }
            _ => {}
        }
        print_progress(&session, step);
    }

    let document = session
        .document()
        .context("the server did not return a document")?;
    let path = output_path(args.output, &document.filename);
    std::fs::write(&path, &document.bytes)
        .with_context(|| format!("failed to write {}", path.display()))?;
    println!("wrote {}", path.display());
    Ok(())
}

/// The explicit `--output`, else the server-provided name in the current
/// directory. Only the final component of that name is used.
fn output_path(output: Option<PathBuf>, filename: &str) -> PathBuf {
    output.unwrap_or_else(|| {
        Path::new(filename)
            .file_name()
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DOCUMENT_FILENAME))
    })
}

/// Prints each notification; returns whether any was an error.
fn report(notifications: &[Notification]) -> bool {
    let mut failed = false;
    for notification in notifications {
        let tag = match notification.level {
            NotificationLevel::Info => "info",
            NotificationLevel::Success => "ok",
            NotificationLevel::Warning => "warn",
            NotificationLevel::Error => {
                failed = true;
                "error"
            }
        };
        match &notification.detail {
            Some(detail) => println!("[{tag}] {}: {detail}", notification.title),
            None => println!("[{tag}] {}", notification.title),
        }
    }
    failed
}

fn print_progress(session: &ReviewSession, step: Step) {
    match step {
        Step::GenerateQuestions => {
            for (question, n) in session.questions().iter().zip(1..) {
                println!("  Q{n}: {}", question.question);
                println!("      {}", question.purpose);
            }
        }
        Step::GenerateSearchString => println!("  {}", session.search_string()),
        Step::SearchPapers(_) => {
            for paper in session.papers() {
                println!("  - {} ({}, {})", paper.title, paper.creator, paper.year);
            }
        }
        Step::FilterPapers => {
            for paper in session.selected_papers() {
                println!("  + {}", paper.title);
            }
        }
        Step::AnswerQuestions => {
            for answer in session.answers() {
                println!("  {}\n    {}", answer.question, answer.answer);
            }
        }
        Step::GenerateAbstract => println!("{}", session.abstract_summary()),
        Step::GenerateIntroduction => println!("{}", session.introduction()),
        Step::GenerateConclusion => println!("{}", session.conclusion()),
        Step::ComposeDocument => {}
    }
}

#[cfg(test)]
#[path = "tests/main_tests.rs"]
mod tests;
