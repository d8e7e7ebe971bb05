//! Sentence-aligned text chunking.
//!
//! Lesson text is segmented into sentences with boundary-punctuation
//! heuristics, then greedily accumulated into windows of at most
//! `target` characters. Each window after the first is seeded with the
//! trailing sentences of the previous window, up to `overlap` characters,
//! so context carries across chunk boundaries without ever splitting
//! mid-sentence.
//!
//! # Algorithm
//!
//! 1. Normalize whitespace and split into sentences (`.`, `!`, `?`
//!    followed by whitespace; dotted abbreviations and two-letter
//!    honorifics keep the sentence open).
//! 2. Accumulate sentences until adding the next one would exceed
//!    `target`, then emit the window.
//! 3. Seed the next window with trailing sentences totalling ≤ `overlap`
//!    characters. If the next sentence no longer fits beside the seed,
//!    the seed is dropped so the size cap holds.
//! 4. A single sentence longer than `target` is emitted as its own
//!    oversized chunk.
//!
//! The first chunk of each lesson is prefixed with a synthetic header
//! naming the course and lesson; all chunks keep lesson attribution in
//! metadata. Chunk indices run sequentially across the whole course.

use crate::models::{CourseChunk, ParsedDocument};

/// Split text into sentences on boundary punctuation.
///
/// Whitespace is normalized: sentences are joined token streams with
/// single spaces. Dotted abbreviations (`e.g.`, `U.S.`) and two-letter
/// honorifics (`Mr.`, `Dr.`) do not end a sentence.
pub fn split_sentences(text: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut current: Vec<&str> = Vec::new();

    for token in text.split_whitespace() {
        current.push(token);
        if ends_sentence(token) {
            sentences.push(current.join(" "));
            current.clear();
        }
    }
    if !current.is_empty() {
        sentences.push(current.join(" "));
    }
    sentences
}

fn ends_sentence(token: &str) -> bool {
    let trimmed = token.trim_end_matches(['"', '\'', ')', ']']);
    let Some(last) = trimmed.chars().last() else {
        return false;
    };
    if !matches!(last, '.' | '!' | '?') {
        return false;
    }
    if last == '.' {
        let stem = &trimmed[..trimmed.len() - 1];
        // Dotted abbreviations and initialisms: "e.g.", "U.S.".
        if stem.contains('.') {
            return false;
        }
        // Two-letter honorifics: "Mr.", "Dr.".
        let mut chars = stem.chars();
        if let (Some(a), Some(b), None) = (chars.next(), chars.next(), chars.next()) {
            if a.is_ascii_uppercase() && b.is_ascii_lowercase() {
                return false;
            }
        }
    }
    true
}

/// Chunk one lesson's text into windows of at most `target` characters
/// with sentence-aligned `overlap` between consecutive windows.
pub fn chunk_lesson(text: &str, target: usize, overlap: usize) -> Vec<String> {
    let sentences = split_sentences(text);
    if sentences.is_empty() {
        return Vec::new();
    }

    let mut chunks: Vec<String> = Vec::new();
    let mut window: Vec<&str> = Vec::new();
    let mut window_len = 0usize;
    // Sentences beyond the carried overlap seed; a window is only
    // emitted once it holds at least one of these.
    let mut new_in_window = 0usize;

    for sentence in &sentences {
        let sentence = sentence.as_str();

        if !window.is_empty() && window_len + sentence.len() + 1 > target {
            if new_in_window > 0 {
                chunks.push(window.join(" "));
                let (tail, tail_len) = overlap_tail(&window, overlap);
                window = tail;
                window_len = tail_len;
                new_in_window = 0;
            }
            if !window.is_empty() && window_len + sentence.len() + 1 > target {
                // The sentence cannot share a window with the seed;
                // drop the seed so the size cap holds.
                window.clear();
                window_len = 0;
            }
        }

        window_len += if window.is_empty() {
            sentence.len()
        } else {
            sentence.len() + 1
        };
        window.push(sentence);
        new_in_window += 1;
    }

    if new_in_window > 0 {
        chunks.push(window.join(" "));
    }

    chunks
}

/// Trailing sentences of `window` whose combined length is ≤ `overlap`.
fn overlap_tail<'a>(window: &[&'a str], overlap: usize) -> (Vec<&'a str>, usize) {
    let mut tail: Vec<&'a str> = Vec::new();
    let mut len = 0usize;

    for &sentence in window.iter().rev() {
        let extra = if tail.is_empty() {
            sentence.len()
        } else {
            sentence.len() + 1
        };
        if len + extra > overlap {
            break;
        }
        tail.insert(0, sentence);
        len += extra;
    }
    (tail, len)
}

/// Chunk every lesson of a parsed course, assigning chunk indices
/// sequentially across the whole course.
///
/// The first chunk of each lesson carries a synthetic header naming the
/// course and lesson so the chunk embeds with its context attached.
pub fn chunk_course(doc: &ParsedDocument, target: usize, overlap: usize) -> Vec<CourseChunk> {
    let mut chunks = Vec::new();
    let mut index = 0usize;

    for lesson in &doc.lessons {
        let pieces = chunk_lesson(&lesson.text, target, overlap);
        for (i, piece) in pieces.into_iter().enumerate() {
            let text = if i == 0 {
                match lesson.number {
                    Some(n) => {
                        format!("Course {} Lesson {} content: {}", doc.meta.title, n, piece)
                    }
                    None => format!("Course {} content: {}", doc.meta.title, piece),
                }
            } else {
                piece
            };
            chunks.push(CourseChunk {
                course_title: doc.meta.title.clone(),
                lesson_number: lesson.number,
                chunk_index: index,
                text,
            });
            index += 1;
        }
    }

    chunks
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CourseMeta;
    use crate::models::LessonBlock;

    /// Distinct sentences of exactly 89 characters each.
    fn uniform_sentences(count: usize) -> String {
        (0..count)
            .map(|i| format!("Item {:02} {}.", i, "y".repeat(80)))
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn normalize(text: &str) -> String {
        text.split_whitespace().collect::<Vec<_>>().join(" ")
    }

    /// Drop the longest suffix of `prev` (≤ `max` chars) that `cur`
    /// starts with — the seeded overlap.
    fn strip_overlap(prev: &str, cur: &str, max: usize) -> String {
        for start in 0..prev.len() {
            if !prev.is_char_boundary(start) {
                continue;
            }
            let suffix = &prev[start..];
            if suffix.len() > max {
                continue;
            }
            if cur.starts_with(suffix) {
                return cur[suffix.len()..].trim_start().to_string();
            }
        }
        cur.to_string()
    }

    #[test]
    fn splits_on_boundary_punctuation() {
        let sentences = split_sentences("First one. Second one! Third one? Fourth");
        assert_eq!(
            sentences,
            vec!["First one.", "Second one!", "Third one?", "Fourth"]
        );
    }

    #[test]
    fn abbreviations_do_not_split() {
        let sentences = split_sentences("Use tools e.g. search. Ask Dr. Ada about U.S. history.");
        assert_eq!(
            sentences,
            vec!["Use tools e.g. search.", "Ask Dr. Ada about U.S. history."]
        );
    }

    #[test]
    fn whitespace_is_normalized() {
        let sentences = split_sentences("Spread  over\n\nlines. And more.");
        assert_eq!(sentences, vec!["Spread over lines.", "And more."]);
    }

    #[test]
    fn short_text_is_one_chunk() {
        let chunks = chunk_lesson("A tiny lesson. Nothing more.", 800, 100);
        assert_eq!(chunks, vec!["A tiny lesson. Nothing more."]);
    }

    #[test]
    fn empty_text_yields_no_chunks() {
        assert!(chunk_lesson("", 800, 100).is_empty());
        assert!(chunk_lesson("   \n  ", 800, 100).is_empty());
    }

    #[test]
    fn windows_respect_target_size() {
        let text = uniform_sentences(28);
        let chunks = chunk_lesson(&text, 800, 100);
        for chunk in &chunks {
            assert!(chunk.len() <= 800, "chunk exceeds target: {}", chunk.len());
        }
    }

    #[test]
    fn deterministic_chunk_count_for_2500_char_lesson() {
        // 28 sentences × 89 chars + 27 separators = 2519 chars.
        // Window capacity 800 fits 8 sentences (719 chars); the 100-char
        // overlap carries exactly one 89-char sentence, after which 7 new
        // sentences fit per window: 8 + 7 + 7 + 6 = 28.
        let text = uniform_sentences(28);
        assert_eq!(text.len(), 2519);

        let chunks = chunk_lesson(&text, 800, 100);
        assert_eq!(chunks.len(), 4);

        let again = chunk_lesson(&text, 800, 100);
        assert_eq!(chunks, again);
    }

    #[test]
    fn overlap_is_sentence_aligned_suffix_of_previous_chunk() {
        let text = uniform_sentences(28);
        let chunks = chunk_lesson(&text, 800, 100);
        assert!(chunks.len() > 1);

        for pair in chunks.windows(2) {
            let (prev, cur) = (&pair[0], &pair[1]);
            // The seeded overlap: one full 89-char sentence.
            let seed = &cur[..89];
            assert!(prev.ends_with(seed), "overlap is not a suffix of the previous chunk");
            assert!(seed.ends_with('.'), "overlap boundary is not a sentence break");
            assert!(seed.len() <= 100);
        }
    }

    #[test]
    fn reconstruction_after_stripping_overlap() {
        let text = uniform_sentences(28);
        let chunks = chunk_lesson(&text, 800, 100);

        let mut rebuilt = chunks[0].clone();
        for pair in chunks.windows(2) {
            let fresh = strip_overlap(&pair[0], &pair[1], 100);
            rebuilt.push(' ');
            rebuilt.push_str(&fresh);
        }
        assert_eq!(normalize(&rebuilt), normalize(&text));
    }

    #[test]
    fn oversized_sentence_is_its_own_chunk() {
        let huge = format!("{}.", "z".repeat(300));
        let text = format!("Short lead-in one. Short lead-in two. {} Trailing sentence.", huge);
        let chunks = chunk_lesson(&text, 100, 20);

        assert!(chunks.iter().any(|c| c == &huge), "oversized sentence not emitted alone");
        for chunk in &chunks {
            assert!(chunk.len() <= 100 || chunk == &huge);
        }
    }

    #[test]
    fn course_chunking_prefixes_first_chunk_per_lesson() {
        let doc = ParsedDocument {
            meta: CourseMeta {
                title: "Retrieval Basics".to_string(),
                link: None,
                instructor: None,
            },
            lessons: vec![
                LessonBlock {
                    number: Some(0),
                    title: Some("Intro".to_string()),
                    link: None,
                    text: uniform_sentences(12),
                },
                LessonBlock {
                    number: Some(1),
                    title: Some("Depth".to_string()),
                    link: None,
                    text: uniform_sentences(12),
                },
            ],
        };

        let chunks = chunk_course(&doc, 800, 100);
        assert!(chunks.len() >= 4);

        // Indices are sequential across the whole course.
        for (i, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk.chunk_index, i);
        }

        let lesson0: Vec<_> = chunks.iter().filter(|c| c.lesson_number == Some(0)).collect();
        let lesson1: Vec<_> = chunks.iter().filter(|c| c.lesson_number == Some(1)).collect();

        assert!(lesson0[0]
            .text
            .starts_with("Course Retrieval Basics Lesson 0 content:"));
        assert!(lesson1[0]
            .text
            .starts_with("Course Retrieval Basics Lesson 1 content:"));
        for later in lesson0.iter().skip(1).chain(lesson1.iter().skip(1)) {
            assert!(!later.text.starts_with("Course "));
        }
    }

    #[test]
    fn unnumbered_block_gets_course_only_header() {
        let doc = ParsedDocument {
            meta: CourseMeta {
                title: "Loose Notes".to_string(),
                link: None,
                instructor: None,
            },
            lessons: vec![LessonBlock {
                number: None,
                title: None,
                link: None,
                text: "Only body text here.".to_string(),
            }],
        };
        let chunks = chunk_course(&doc, 800, 100);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].lesson_number, None);
        assert!(chunks[0].text.starts_with("Course Loose Notes content:"));
    }
}
