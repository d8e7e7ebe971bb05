//! Course document parsing.
//!
//! Expected document shape:
//!
//! ```text
//! Course Title: <string>
//! Course Link: <url>            (optional)
//! Course Instructor: <string>   (optional)
//!
//! Lesson <n>: <string>
//! Lesson Link: <url>            (optional)
//! <free-form lesson text>
//! ```
//!
//! The title line is mandatory; a document without it fails with
//! [`LecternError::MalformedDocument`], which the ingestion boundary
//! treats as a per-document skip. Lesson markers are matched
//! case-insensitively and tolerate surrounding whitespace. Text between
//! the header and the first lesson marker is ignored; a document with no
//! lesson markers at all keeps its whole body as one unnumbered block so
//! the content is still retrievable.

use regex::Regex;
use std::sync::LazyLock;

use crate::error::LecternError;
use crate::models::{CourseMeta, LessonBlock, ParsedDocument};

static LESSON_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^\s*lesson\s+(\d+)\s*:\s*(.*)$").unwrap());
static LESSON_LINK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^\s*lesson\s+link\s*:\s*(\S+)\s*$").unwrap());

/// Parse one course document into metadata and ordered lesson blocks.
///
/// Numbered lessons are ordered by their lesson number (the attribute,
/// not document position).
pub fn parse_document(text: &str) -> Result<ParsedDocument, LecternError> {
    let mut lines = text.lines().peekable();

    let meta = parse_header(&mut lines)?;

    let mut lessons: Vec<LessonBlock> = Vec::new();
    let mut current: Option<LessonBlock> = None;

    for line in lines {
        if let Some(caps) = LESSON_MARKER.captures(line) {
            if let Some(block) = current.take() {
                lessons.push(finish_block(block));
            }
            // Lesson numbers are bounded small in practice; a value that
            // overflows u32 is treated as content, not a marker.
            if let Ok(number) = caps[1].parse::<u32>() {
                current = Some(LessonBlock {
                    number: Some(number),
                    title: Some(caps[2].trim().to_string()),
                    link: None,
                    text: String::new(),
                });
                continue;
            }
        }

        let Some(block) = current.as_mut() else {
            // Preamble between header and first marker.
            continue;
        };

        if block.text.trim().is_empty() && block.link.is_none() {
            if let Some(caps) = LESSON_LINK.captures(line) {
                block.link = Some(caps[1].to_string());
                continue;
            }
        }

        if !block.text.is_empty() {
            block.text.push('\n');
        }
        block.text.push_str(line);
    }

    if let Some(block) = current.take() {
        lessons.push(finish_block(block));
    }

    // Fallback: no lesson markers at all — keep the body as one
    // unnumbered block.
    if lessons.is_empty() {
        let body = body_after_header(text);
        if !body.trim().is_empty() {
            lessons.push(LessonBlock {
                number: None,
                title: None,
                link: None,
                text: body.trim().to_string(),
            });
        }
    }

    lessons.sort_by_key(|l| l.number);

    Ok(ParsedDocument { meta, lessons })
}

fn parse_header<'a, I>(lines: &mut std::iter::Peekable<I>) -> Result<CourseMeta, LecternError>
where
    I: Iterator<Item = &'a str>,
{
    let mut title: Option<String> = None;
    let mut link: Option<String> = None;
    let mut instructor: Option<String> = None;

    // The header is at most the first three non-blank lines; stop early
    // at the first line that is not header material.
    let mut consumed = 0;
    while consumed < 3 {
        let Some(line) = lines.peek() else { break };
        let trimmed = line.trim();
        if trimmed.is_empty() {
            lines.next();
            continue;
        }

        if let Some(value) = header_value(trimmed, "Course Title:") {
            if title.is_some() {
                break;
            }
            title = Some(value);
        } else if let Some(value) = header_value(trimmed, "Course Link:") {
            link = Some(value);
        } else if let Some(value) = header_value(trimmed, "Course Instructor:") {
            instructor = Some(value);
        } else {
            break;
        }

        lines.next();
        consumed += 1;
    }

    let title = title.filter(|t| !t.is_empty()).ok_or_else(|| {
        LecternError::MalformedDocument("missing 'Course Title:' header line".to_string())
    })?;

    Ok(CourseMeta {
        title,
        link,
        instructor,
    })
}

fn header_value(line: &str, prefix: &str) -> Option<String> {
    match line.get(..prefix.len()) {
        Some(head) if head.eq_ignore_ascii_case(prefix) => {
            Some(line[prefix.len()..].trim().to_string())
        }
        _ => None,
    }
}

fn finish_block(mut block: LessonBlock) -> LessonBlock {
    block.text = block.text.trim().to_string();
    block
}

/// Everything after the header lines, for the no-marker fallback.
fn body_after_header(text: &str) -> String {
    let mut remaining = Vec::new();
    let mut in_header = true;
    for line in text.lines() {
        if in_header {
            let trimmed = line.trim();
            if trimmed.is_empty()
                || header_value(trimmed, "Course Title:").is_some()
                || header_value(trimmed, "Course Link:").is_some()
                || header_value(trimmed, "Course Instructor:").is_some()
            {
                continue;
            }
            in_header = false;
        }
        remaining.push(line);
    }
    remaining.join("\n")
}
