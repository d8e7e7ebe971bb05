//! # Lectern CLI
//!
//! The `lectern` binary answers questions over a corpus of structured
//! course documents. The corpus is parsed, chunked, and indexed at
//! startup (the index lives in memory; nothing persists across runs),
//! then queried through a tool-using conversational model.
//!
//! ## Usage
//!
//! ```bash
//! lectern --config ./lectern.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `lectern ingest` | Parse, chunk, and index the corpus; print counters |
//! | `lectern courses` | List indexed course titles |
//! | `lectern ask "<q>"` | Answer one question (optionally within a session) |
//! | `lectern chat` | Multi-turn REPL; `/clear` resets the session |

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use lectern::config::{load_config, Config};
use lectern::coordinator::QueryCoordinator;
use lectern::embedding;
use lectern::index::InMemoryIndex;
use lectern::model::OpenAiCompatibleModel;
use lectern::orchestrator::ConversationOrchestrator;
use lectern::session::InMemorySessionStore;
use lectern::store::SemanticStore;
use lectern::tools::{OutlineTool, SearchTool, ToolRegistry};

/// Lectern — question answering over structured course materials.
#[derive(Parser)]
#[command(
    name = "lectern",
    about = "Question answering over structured course materials",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./lectern.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse, chunk, and index the document corpus, then print counters.
    ///
    /// Useful for validating a corpus: malformed documents are skipped
    /// and counted, the rest are indexed.
    Ingest {
        /// Corpus directory; defaults to `documents.dir` from the config.
        #[arg(long)]
        dir: Option<PathBuf>,
    },

    /// List indexed course titles.
    Courses,

    /// Ask a single question.
    Ask {
        /// The question to answer.
        query: String,

        /// Session id to continue; a fresh session is created if omitted.
        #[arg(long)]
        session: Option<String>,
    },

    /// Interactive multi-turn session. `/clear` resets the session
    /// history, `exit` leaves.
    Chat,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "lectern=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli.config)?;

    match cli.command {
        Commands::Ingest { dir } => {
            let coordinator = build_coordinator(&config)?;
            let dir = dir.unwrap_or_else(|| config.documents.dir.clone());
            let report = coordinator.ingest_directory(&dir).await?;
            println!("ingest {}", dir.display());
            println!("  courses added: {}", report.courses_added);
            println!("  chunks added: {}", report.chunks_added);
            println!("  already indexed: {}", report.skipped_existing);
            println!("  failed: {}", report.failed);
            println!("ok");
        }

        Commands::Courses => {
            let coordinator = build_coordinator(&config)?;
            coordinator.ingest_directory(&config.documents.dir).await?;
            let analytics = coordinator.course_analytics().await?;
            println!("{} courses", analytics.total_courses);
            for title in analytics.course_titles {
                println!("  {}", title);
            }
        }

        Commands::Ask { query, session } => {
            let coordinator = build_coordinator(&config)?;
            coordinator.ingest_directory(&config.documents.dir).await?;

            let answer = coordinator.answer(&query, session).await?;
            println!("{}", answer.answer);
            if !answer.sources.is_empty() {
                println!("\nSources:");
                for source in &answer.sources {
                    let lesson = source
                        .lesson
                        .map(|n| format!(" - Lesson {}", n))
                        .unwrap_or_default();
                    match &source.link {
                        Some(link) => println!("  {}{} ({})", source.course, lesson, link),
                        None => println!("  {}{}", source.course, lesson),
                    }
                }
            }
            println!("\nsession: {}", answer.session_id);
        }

        Commands::Chat => {
            let coordinator = build_coordinator(&config)?;
            let report = coordinator.ingest_directory(&config.documents.dir).await?;
            println!(
                "{} courses indexed. Ask away — /clear resets, exit leaves.",
                report.courses_added
            );

            let mut session_id: Option<String> = None;
            let stdin = std::io::stdin();
            loop {
                print!("> ");
                std::io::stdout().flush()?;

                let mut line = String::new();
                if stdin.read_line(&mut line)? == 0 {
                    break;
                }
                let line = line.trim();

                match line {
                    "" => continue,
                    "exit" | "quit" => break,
                    "/clear" => {
                        if let Some(id) = &session_id {
                            coordinator.clear_session(id);
                            println!("session cleared");
                        }
                        continue;
                    }
                    query => {
                        let answer = coordinator.answer(query, session_id.clone()).await?;
                        session_id = Some(answer.session_id.clone());
                        println!("{}", answer.answer);
                        for source in &answer.sources {
                            let lesson = source
                                .lesson
                                .map(|n| format!(" - Lesson {}", n))
                                .unwrap_or_default();
                            println!("  [{}{}]", source.course, lesson);
                        }
                    }
                }
            }
        }
    }

    Ok(())
}

/// Wire the full pipeline from configuration.
///
/// The embedding engine is required: a disabled provider is fatal here,
/// before any ingestion or serving starts.
fn build_coordinator(config: &Config) -> Result<QueryCoordinator> {
    let embedder = embedding::create_client(&config.embedding)?;
    let index = Arc::new(InMemoryIndex::new());
    let store = Arc::new(SemanticStore::new(index, embedder));

    let mut registry = ToolRegistry::new();
    registry.register(Box::new(SearchTool::new(
        store.clone(),
        config.retrieval.max_results,
    )));
    registry.register(Box::new(OutlineTool::new(store.clone())));

    let model = Arc::new(OpenAiCompatibleModel::new(&config.model)?);
    let orchestrator = ConversationOrchestrator::new(model);
    let sessions = Arc::new(InMemorySessionStore::new(config.session.max_history));

    Ok(QueryCoordinator::new(
        store,
        registry,
        orchestrator,
        sessions,
        config.chunking.clone(),
    ))
}
