//! Ingest and answer composition.
//!
//! [`QueryCoordinator`] owns the full pipeline: it walks the document
//! corpus through parse → chunk → upsert during the one-shot ingestion
//! pass, and composes sessions, the tool registry, and the orchestrator
//! into the `answer` operation. Constructed once at startup and passed
//! by reference — no globals.

use anyhow::{Context, Result};
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};
use walkdir::WalkDir;

use crate::chunk::chunk_course;
use crate::config::ChunkingConfig;
use crate::models::{Answer, CourseAnalytics, IngestReport};
use crate::orchestrator::ConversationOrchestrator;
use crate::parser::parse_document;
use crate::session::SessionStore;
use crate::store::{SemanticStore, UpsertOutcome};
use crate::tools::ToolRegistry;

pub struct QueryCoordinator {
    store: Arc<SemanticStore>,
    registry: ToolRegistry,
    orchestrator: ConversationOrchestrator,
    sessions: Arc<dyn SessionStore>,
    chunking: ChunkingConfig,
}

impl QueryCoordinator {
    pub fn new(
        store: Arc<SemanticStore>,
        registry: ToolRegistry,
        orchestrator: ConversationOrchestrator,
        sessions: Arc<dyn SessionStore>,
        chunking: ChunkingConfig,
    ) -> Self {
        Self {
            store,
            registry,
            orchestrator,
            sessions,
            chunking,
        }
    }

    /// Parse, chunk, and index one course document.
    pub async fn ingest_document(&self, text: &str) -> Result<UpsertOutcome> {
        let doc = parse_document(text)?;
        let chunks = chunk_course(&doc, self.chunking.target_chars, self.chunking.overlap_chars);
        self.store.upsert_course(&doc, chunks).await
    }

    /// Ingest every `.txt`/`.md` document under `dir`, in filename order.
    ///
    /// Failures are per-document and non-fatal: an unreadable or
    /// malformed document is counted and skipped while the rest of the
    /// corpus continues. Courses whose titles are already indexed are
    /// skipped without an upsert round-trip.
    pub async fn ingest_directory(&self, dir: &Path) -> Result<IngestReport> {
        let mut report = IngestReport::default();
        let mut known: HashSet<String> =
            self.store.list_course_titles().await?.into_iter().collect();

        let mut paths: Vec<_> = WalkDir::new(dir)
            .follow_links(false)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .map(|e| e.into_path())
            .filter(|p| {
                matches!(
                    p.extension().and_then(|x| x.to_str()),
                    Some("txt") | Some("md")
                )
            })
            .collect();
        paths.sort();

        for path in paths {
            let text = match std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read {}", path.display()))
            {
                Ok(text) => text,
                Err(e) => {
                    warn!(error = %e, "skipping unreadable document");
                    report.failed += 1;
                    continue;
                }
            };

            let doc = match parse_document(&text) {
                Ok(doc) => doc,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "skipping document");
                    report.failed += 1;
                    continue;
                }
            };

            if known.contains(&doc.meta.title) {
                report.skipped_existing += 1;
                continue;
            }

            let chunks =
                chunk_course(&doc, self.chunking.target_chars, self.chunking.overlap_chars);
            match self.store.upsert_course(&doc, chunks).await? {
                UpsertOutcome::Inserted { chunks } => {
                    known.insert(doc.meta.title.clone());
                    report.courses_added += 1;
                    report.chunks_added += chunks;
                }
                UpsertOutcome::AlreadyPresent => {
                    report.skipped_existing += 1;
                }
            }
        }

        info!(
            courses = report.courses_added,
            chunks = report.chunks_added,
            skipped = report.skipped_existing,
            failed = report.failed,
            "ingestion pass complete"
        );
        Ok(report)
    }

    /// Answer one query, creating a session when no id is supplied.
    pub async fn answer(&self, query: &str, session_id: Option<String>) -> Result<Answer> {
        let session_id = match session_id {
            Some(id) => id,
            None => self.sessions.create(),
        };
        let history = self.sessions.history(&session_id);

        let outcome = self
            .orchestrator
            .run(query, &history, &self.registry)
            .await?;

        self.sessions.append(&session_id, query, &outcome.answer);

        Ok(Answer {
            answer: outcome.answer,
            sources: outcome.sources,
            session_id,
        })
    }

    /// The course-listing contract.
    pub async fn course_analytics(&self) -> Result<CourseAnalytics> {
        let course_titles = self.store.list_course_titles().await?;
        Ok(CourseAnalytics {
            total_courses: course_titles.len(),
            course_titles,
        })
    }

    /// Drop a session's history. The id stays valid.
    pub fn clear_session(&self, session_id: &str) {
        self.sessions.clear(session_id);
    }
}
