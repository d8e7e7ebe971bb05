//! Two-collection semantic store.
//!
//! [`SemanticStore`] composes an [`EmbeddingClient`] with a
//! [`CourseIndex`] and owns the retrieval semantics: idempotent course
//! upsert, fuzzy course-name resolution against the catalog, and
//! similarity-ranked content search with exact course/lesson filters.

use anyhow::Result;
use std::sync::Arc;
use tracing::debug;

use crate::embedding::EmbeddingClient;
use crate::index::CourseIndex;
use crate::models::{CatalogEntry, CourseChunk, LessonSummary, ParsedDocument};

/// Result of an upsert attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum UpsertOutcome {
    /// The course was new; this many chunks were indexed.
    Inserted { chunks: usize },
    /// A course with this title is already indexed; nothing was written.
    AlreadyPresent,
}

pub struct SemanticStore {
    index: Arc<dyn CourseIndex>,
    embedder: Arc<dyn EmbeddingClient>,
}

impl SemanticStore {
    pub fn new(index: Arc<dyn CourseIndex>, embedder: Arc<dyn EmbeddingClient>) -> Self {
        Self { index, embedder }
    }

    /// Index a course and its chunks.
    ///
    /// Idempotent: if a catalog entry with the same title already
    /// exists, nothing is written and [`UpsertOutcome::AlreadyPresent`]
    /// is returned.
    pub async fn upsert_course(
        &self,
        doc: &ParsedDocument,
        chunks: Vec<CourseChunk>,
    ) -> Result<UpsertOutcome> {
        let meta = &doc.meta;
        if self.index.course(&meta.title).await?.is_some() {
            debug!(course = %meta.title, "course already indexed, skipping");
            return Ok(UpsertOutcome::AlreadyPresent);
        }

        let entry = CatalogEntry {
            title: meta.title.clone(),
            link: meta.link.clone(),
            instructor: meta.instructor.clone(),
            lessons: doc
                .lessons
                .iter()
                .filter_map(|l| {
                    l.number.map(|number| LessonSummary {
                        number,
                        title: l.title.clone().unwrap_or_default(),
                        link: l.link.clone(),
                    })
                })
                .collect(),
        };

        let title_vector = self.embedder.embed_one(&meta.title).await?;
        self.index.insert_course(entry, title_vector).await?;

        let chunk_count = chunks.len();
        if chunk_count > 0 {
            let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
            let vectors = self.embedder.embed(&texts).await?;
            anyhow::ensure!(
                vectors.len() == chunk_count,
                "embedding count mismatch: {} texts, {} vectors",
                chunk_count,
                vectors.len()
            );
            self.index
                .insert_chunks(chunks.into_iter().zip(vectors).collect())
                .await?;
        }

        debug!(course = %meta.title, chunks = chunk_count, "course indexed");
        Ok(UpsertOutcome::Inserted { chunks: chunk_count })
    }

    /// Resolve a partial or fuzzy course reference to a catalog title.
    ///
    /// Top-1 nearest neighbor against the catalog with no similarity
    /// threshold, matching the original system: any non-empty catalog
    /// produces a resolution, so a dissimilar partial name still resolves
    /// to *some* course. Returns `None` only when the catalog is empty.
    pub async fn resolve_course_name(&self, partial: &str) -> Result<Option<String>> {
        let vector = self.embedder.embed_one(partial).await?;
        Ok(self
            .index
            .nearest_course(&vector)
            .await?
            .map(|entry| entry.title))
    }

    /// Similarity-ranked content search, optionally filtered by exact
    /// course title and/or lesson number before ranking.
    pub async fn search_content(
        &self,
        query: &str,
        course_title: Option<&str>,
        lesson_number: Option<u32>,
        k: usize,
    ) -> Result<Vec<(CourseChunk, f32)>> {
        let vector = self.embedder.embed_one(query).await?;
        self.index
            .search_chunks(&vector, k, course_title, lesson_number)
            .await
    }

    /// Catalog entry for a fuzzy course reference (outline tool).
    pub async fn course_outline(&self, partial: &str) -> Result<Option<CatalogEntry>> {
        match self.resolve_course_name(partial).await? {
            Some(title) => self.index.course(&title).await,
            None => Ok(None),
        }
    }

    /// Link for one lesson of an exactly-titled course, if recorded.
    pub async fn lesson_link(&self, course_title: &str, lesson_number: u32) -> Result<Option<String>> {
        Ok(self
            .index
            .course(course_title)
            .await?
            .and_then(|entry| entry.lesson_link(lesson_number)))
    }

    /// All indexed course titles.
    pub async fn list_course_titles(&self) -> Result<Vec<String>> {
        self.index.course_titles().await
    }

    /// Number of indexed courses.
    pub async fn course_count(&self) -> Result<usize> {
        Ok(self.index.course_titles().await?.len())
    }

    /// Number of indexed content chunks.
    pub async fn chunk_count(&self) -> Result<usize> {
        self.index.chunk_count().await
    }
}
