//! Core data models used throughout Lectern.
//!
//! These types represent the courses, lessons, chunks, and answers that
//! flow through the ingestion and query pipeline.

use serde::{Deserialize, Serialize};

/// Course-level metadata parsed from a document header.
///
/// The title is the course's identity: globally unique, no surrogate key.
#[derive(Debug, Clone, PartialEq)]
pub struct CourseMeta {
    pub title: String,
    pub link: Option<String>,
    pub instructor: Option<String>,
}

/// One lesson block parsed from a course document.
///
/// `number` is `None` only for the fallback case of a document with a
/// valid header but no lesson markers, whose body is still indexed.
#[derive(Debug, Clone)]
pub struct LessonBlock {
    pub number: Option<u32>,
    pub title: Option<String>,
    pub link: Option<String>,
    pub text: String,
}

/// A parsed course document: header metadata plus ordered lesson blocks.
#[derive(Debug, Clone)]
pub struct ParsedDocument {
    pub meta: CourseMeta,
    pub lessons: Vec<LessonBlock>,
}

/// Lesson metadata kept in the catalog payload for display.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LessonSummary {
    pub number: u32,
    pub title: String,
    pub link: Option<String>,
}

/// A retrievable unit of lesson text.
///
/// `chunk_index` is monotonic across the whole course, not per lesson.
/// The embedding vector is derived from `text` and owned by the store.
#[derive(Debug, Clone)]
pub struct CourseChunk {
    pub course_title: String,
    pub lesson_number: Option<u32>,
    pub chunk_index: usize,
    pub text: String,
}

/// Catalog payload for one course: everything the outline tool and
/// source links need, without going back to the raw documents.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub title: String,
    pub link: Option<String>,
    pub instructor: Option<String>,
    pub lessons: Vec<LessonSummary>,
}

impl CatalogEntry {
    /// Link for a specific lesson, if the catalog has one.
    pub fn lesson_link(&self, number: u32) -> Option<String> {
        self.lessons
            .iter()
            .find(|l| l.number == number)
            .and_then(|l| l.link.clone())
    }
}

/// One user query paired with its assistant answer — the unit of
/// session history.
#[derive(Debug, Clone, PartialEq)]
pub struct Exchange {
    pub user: String,
    pub assistant: String,
}

/// Where an answer's supporting content came from.
///
/// Produced by a tool execution and returned by value with the tool
/// outcome; scoped to a single query, never shared across queries.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RetrievalSource {
    pub course: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lesson: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
}

/// The answer contract returned from [`crate::coordinator::QueryCoordinator::answer`].
#[derive(Debug, Clone, Serialize)]
pub struct Answer {
    pub answer: String,
    pub sources: Vec<RetrievalSource>,
    pub session_id: String,
}

/// The course-listing contract.
#[derive(Debug, Clone, Serialize)]
pub struct CourseAnalytics {
    pub total_courses: usize,
    pub course_titles: Vec<String>,
}

/// Counters reported at the end of an ingestion pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IngestReport {
    pub courses_added: usize,
    pub chunks_added: usize,
    pub skipped_existing: usize,
    pub failed: usize,
}
