//! Nearest-neighbor index abstraction.
//!
//! The [`CourseIndex`] trait is the seam between Lectern and the vector
//! engine: the store never sees how vectors are held or searched, so the
//! brute-force in-memory implementation can be swapped for an external
//! engine without touching retrieval logic.
//!
//! Two logical collections live behind the trait: the course catalog
//! (one entry per course, embedded over the title) and the content
//! collection (one entry per chunk, embedded over the chunk text).

use anyhow::Result;
use async_trait::async_trait;
use std::sync::RwLock;

use crate::models::{CatalogEntry, CourseChunk};

/// Abstract nearest-neighbor index over the catalog and content
/// collections.
#[async_trait]
pub trait CourseIndex: Send + Sync {
    /// Insert a catalog entry with its title embedding.
    async fn insert_course(&self, entry: CatalogEntry, vector: Vec<f32>) -> Result<()>;

    /// Insert content chunks with their embeddings.
    async fn insert_chunks(&self, chunks: Vec<(CourseChunk, Vec<f32>)>) -> Result<()>;

    /// The single nearest catalog entry, if the catalog is non-empty.
    async fn nearest_course(&self, vector: &[f32]) -> Result<Option<CatalogEntry>>;

    /// Content chunks ranked by descending similarity, optionally
    /// pre-filtered by exact course title and/or lesson number.
    ///
    /// Ties are broken by ascending chunk index, then course title, so
    /// result order is deterministic.
    async fn search_chunks(
        &self,
        vector: &[f32],
        k: usize,
        course_title: Option<&str>,
        lesson_number: Option<u32>,
    ) -> Result<Vec<(CourseChunk, f32)>>;

    /// Catalog entry for an exact title.
    async fn course(&self, title: &str) -> Result<Option<CatalogEntry>>;

    /// All catalog titles, in insertion order.
    async fn course_titles(&self) -> Result<Vec<String>>;

    /// Total number of content chunks.
    async fn chunk_count(&self) -> Result<usize>;
}

/// Compute cosine similarity between two embedding vectors.
///
/// Returns a value in `[-1.0, 1.0]`; `0.0` for empty or
/// different-length vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;

    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom < f32::EPSILON {
        return 0.0;
    }

    dot / denom
}

/// Brute-force in-memory index.
///
/// Vector search is exact cosine similarity over all stored vectors.
/// Read-mostly after the one-shot ingestion pass, so plain `RwLock`s
/// are enough.
pub struct InMemoryIndex {
    catalog: RwLock<Vec<(CatalogEntry, Vec<f32>)>>,
    content: RwLock<Vec<(CourseChunk, Vec<f32>)>>,
}

impl InMemoryIndex {
    pub fn new() -> Self {
        Self {
            catalog: RwLock::new(Vec::new()),
            content: RwLock::new(Vec::new()),
        }
    }
}

impl Default for InMemoryIndex {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CourseIndex for InMemoryIndex {
    async fn insert_course(&self, entry: CatalogEntry, vector: Vec<f32>) -> Result<()> {
        self.catalog.write().unwrap().push((entry, vector));
        Ok(())
    }

    async fn insert_chunks(&self, chunks: Vec<(CourseChunk, Vec<f32>)>) -> Result<()> {
        self.content.write().unwrap().extend(chunks);
        Ok(())
    }

    async fn nearest_course(&self, vector: &[f32]) -> Result<Option<CatalogEntry>> {
        let catalog = self.catalog.read().unwrap();
        let best = catalog
            .iter()
            .map(|(entry, v)| (entry, cosine_similarity(vector, v)))
            .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));
        Ok(best.map(|(entry, _)| entry.clone()))
    }

    async fn search_chunks(
        &self,
        vector: &[f32],
        k: usize,
        course_title: Option<&str>,
        lesson_number: Option<u32>,
    ) -> Result<Vec<(CourseChunk, f32)>> {
        let content = self.content.read().unwrap();

        let mut scored: Vec<(CourseChunk, f32)> = content
            .iter()
            .filter(|(chunk, _)| {
                course_title.is_none_or(|t| chunk.course_title == t)
                    && lesson_number.is_none_or(|n| chunk.lesson_number == Some(n))
            })
            .map(|(chunk, v)| (chunk.clone(), cosine_similarity(vector, v)))
            .collect();

        scored.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.0.chunk_index.cmp(&b.0.chunk_index))
                .then(a.0.course_title.cmp(&b.0.course_title))
        });
        scored.truncate(k);

        Ok(scored)
    }

    async fn course(&self, title: &str) -> Result<Option<CatalogEntry>> {
        let catalog = self.catalog.read().unwrap();
        Ok(catalog
            .iter()
            .find(|(entry, _)| entry.title == title)
            .map(|(entry, _)| entry.clone()))
    }

    async fn course_titles(&self) -> Result<Vec<String>> {
        let catalog = self.catalog.read().unwrap();
        Ok(catalog.iter().map(|(entry, _)| entry.title.clone()).collect())
    }

    async fn chunk_count(&self) -> Result<usize> {
        Ok(self.content.read().unwrap().len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(title: &str) -> CatalogEntry {
        CatalogEntry {
            title: title.to_string(),
            link: None,
            instructor: None,
            lessons: Vec::new(),
        }
    }

    fn chunk(course: &str, lesson: Option<u32>, index: usize) -> CourseChunk {
        CourseChunk {
            course_title: course.to_string(),
            lesson_number: lesson,
            chunk_index: index,
            text: format!("{} chunk {}", course, index),
        }
    }

    #[test]
    fn test_cosine_identical() {
        let v = vec![1.0, 2.0, 3.0];
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_orthogonal() {
        let a = vec![1.0, 0.0, 0.0];
        let b = vec![0.0, 1.0, 0.0];
        assert!(cosine_similarity(&a, &b).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_empty_and_mismatched() {
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
        assert_eq!(cosine_similarity(&[1.0, 2.0], &[1.0]), 0.0);
    }

    #[tokio::test]
    async fn nearest_course_on_empty_catalog_is_none() {
        let index = InMemoryIndex::new();
        assert!(index.nearest_course(&[1.0, 0.0]).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn nearest_course_picks_best_match() {
        let index = InMemoryIndex::new();
        index.insert_course(entry("Alpha"), vec![1.0, 0.0]).await.unwrap();
        index.insert_course(entry("Beta"), vec![0.0, 1.0]).await.unwrap();

        let hit = index.nearest_course(&[0.9, 0.1]).await.unwrap().unwrap();
        assert_eq!(hit.title, "Alpha");
    }

    #[tokio::test]
    async fn search_filters_by_course_and_lesson() {
        let index = InMemoryIndex::new();
        index
            .insert_chunks(vec![
                (chunk("Alpha", Some(1), 0), vec![1.0, 0.0]),
                (chunk("Alpha", Some(2), 1), vec![1.0, 0.0]),
                (chunk("Beta", Some(1), 0), vec![1.0, 0.0]),
            ])
            .await
            .unwrap();

        let results = index
            .search_chunks(&[1.0, 0.0], 10, Some("Alpha"), None)
            .await
            .unwrap();
        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|(c, _)| c.course_title == "Alpha"));

        let results = index
            .search_chunks(&[1.0, 0.0], 10, Some("Alpha"), Some(2))
            .await
            .unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].0.lesson_number, Some(2));
    }

    #[tokio::test]
    async fn ties_break_by_ascending_chunk_index() {
        let index = InMemoryIndex::new();
        index
            .insert_chunks(vec![
                (chunk("Alpha", Some(1), 3), vec![1.0, 0.0]),
                (chunk("Alpha", Some(1), 0), vec![1.0, 0.0]),
                (chunk("Alpha", Some(1), 7), vec![1.0, 0.0]),
            ])
            .await
            .unwrap();

        let results = index.search_chunks(&[1.0, 0.0], 10, None, None).await.unwrap();
        let indices: Vec<usize> = results.iter().map(|(c, _)| c.chunk_index).collect();
        assert_eq!(indices, vec![0, 3, 7]);
    }

    #[tokio::test]
    async fn search_respects_k() {
        let index = InMemoryIndex::new();
        index
            .insert_chunks(
                (0..10)
                    .map(|i| (chunk("Alpha", Some(1), i), vec![1.0, i as f32 / 10.0]))
                    .collect(),
            )
            .await
            .unwrap();

        let results = index.search_chunks(&[1.0, 1.0], 3, None, None).await.unwrap();
        assert_eq!(results.len(), 3);
    }
}
