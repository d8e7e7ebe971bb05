//! Tool trait, registry, and built-in retrieval tools.
//!
//! Tools are the capabilities the conversational model can invoke:
//! named, schema-described, and dispatched by name through a
//! [`ToolRegistry`]. Each execution returns a [`ToolOutcome`] carrying
//! both the text result for the model and the retrieval sources for the
//! caller — sources travel by value with the outcome, so concurrent
//! queries can never observe each other's sources.
//!
//! Built-ins:
//!
//! - [`SearchTool`] (`search_course_content`) — semantic content search
//!   with fuzzy course-name matching and lesson filtering.
//! - [`OutlineTool`] (`get_course_outline`) — course outline with the
//!   full lesson list.

use anyhow::Result;
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::warn;

use crate::error::LecternError;
use crate::models::RetrievalSource;
use crate::store::SemanticStore;

/// A tool's function-calling contract, sent to the model verbatim.
#[derive(Debug, Clone, Serialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

/// The result of one tool execution.
#[derive(Debug, Clone, Default)]
pub struct ToolOutcome {
    /// Text fed back to the model as the tool result.
    pub text: String,
    /// Retrieval sources backing the text, scoped to this execution.
    pub sources: Vec<RetrievalSource>,
}

impl ToolOutcome {
    fn text_only(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            sources: Vec::new(),
        }
    }
}

/// A capability the model can invoke by name.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Tool name; lowercase identifier with underscores.
    fn name(&self) -> &str;

    /// One-line description the model uses to decide whether to call.
    fn description(&self) -> &str;

    /// JSON Schema (`type: "object"`) for the tool's parameters.
    fn parameters_schema(&self) -> Value;

    /// Execute with validated parameters.
    async fn execute(&self, args: Value) -> Result<ToolOutcome>;

    /// Full function-calling definition.
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters_schema(),
        }
    }
}

/// Registry of tools, dispatched by name.
///
/// Constructed explicitly at startup, not a global. Registering a tool
/// under an existing name replaces the previous registration.
pub struct ToolRegistry {
    tools: Vec<Box<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self { tools: Vec::new() }
    }

    /// Register a tool; a duplicate name overwrites the earlier tool.
    pub fn register(&mut self, tool: Box<dyn Tool>) {
        self.tools.retain(|t| t.name() != tool.name());
        self.tools.push(tool);
    }

    /// Definitions for the model's function-calling contract, in
    /// registration order.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.iter().map(|t| t.definition()).collect()
    }

    /// Find a tool by name.
    pub fn find(&self, name: &str) -> Option<&dyn Tool> {
        self.tools
            .iter()
            .find(|t| t.name() == name)
            .map(|t| t.as_ref())
    }

    /// Execute a tool by name.
    ///
    /// An unregistered name is [`LecternError::UnknownTool`]. A fault
    /// inside the tool itself is captured and converted into an
    /// error-text outcome so the conversation continues.
    pub async fn execute(&self, name: &str, args: Value) -> Result<ToolOutcome, LecternError> {
        let tool = self
            .find(name)
            .ok_or_else(|| LecternError::UnknownTool(name.to_string()))?;

        match tool.execute(args).await {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                warn!(tool = name, error = %e, "tool execution failed");
                Ok(ToolOutcome::text_only(format!(
                    "Tool '{}' failed: {}",
                    name, e
                )))
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

// ═══════════════════════════════════════════════════════════════════════
// SearchTool
// ═══════════════════════════════════════════════════════════════════════

/// Semantic content search with fuzzy course-name matching.
pub struct SearchTool {
    store: Arc<SemanticStore>,
    max_results: usize,
}

impl SearchTool {
    pub fn new(store: Arc<SemanticStore>, max_results: usize) -> Self {
        Self { store, max_results }
    }
}

#[async_trait]
impl Tool for SearchTool {
    fn name(&self) -> &str {
        "search_course_content"
    }

    fn description(&self) -> &str {
        "Search course materials with smart course name matching and lesson filtering"
    }

    fn parameters_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "What to search for in the course content"
                },
                "course_name": {
                    "type": "string",
                    "description": "Course title (partial matches work, e.g. 'MCP', 'Introduction')"
                },
                "lesson_number": {
                    "type": "integer",
                    "description": "Specific lesson number to search within (e.g. 1, 2, 3)"
                }
            },
            "required": ["query"]
        })
    }

    async fn execute(&self, args: Value) -> Result<ToolOutcome> {
        let query = args["query"].as_str().unwrap_or("");
        if query.trim().is_empty() {
            anyhow::bail!("query must not be empty");
        }

        let course_name = args["course_name"].as_str();
        let lesson_number = args["lesson_number"].as_u64().map(|n| n as u32);

        // Fuzzy course resolution; a miss is a conversational result,
        // not an error.
        let resolved = match course_name {
            Some(name) => match self.store.resolve_course_name(name).await? {
                Some(title) => Some(title),
                None => {
                    return Ok(ToolOutcome::text_only(format!(
                        "No course found matching '{}'.",
                        name
                    )));
                }
            },
            None => None,
        };

        let results = self
            .store
            .search_content(query, resolved.as_deref(), lesson_number, self.max_results)
            .await?;

        if results.is_empty() {
            let mut filter_info = String::new();
            if let Some(title) = &resolved {
                filter_info.push_str(&format!(" in course '{}'", title));
            }
            if let Some(n) = lesson_number {
                filter_info.push_str(&format!(" in lesson {}", n));
            }
            return Ok(ToolOutcome::text_only(format!(
                "No relevant content found{}.",
                filter_info
            )));
        }

        self.format_results(&results).await
    }
}

impl SearchTool {
    /// Format matched chunks into one text block with course/lesson
    /// headers, in store order, collecting one source per distinct
    /// (course, lesson) pair.
    async fn format_results(
        &self,
        results: &[(crate::models::CourseChunk, f32)],
    ) -> Result<ToolOutcome> {
        let mut formatted = Vec::new();
        let mut sources: Vec<RetrievalSource> = Vec::new();

        for (chunk, _score) in results {
            let mut header = format!("[{}", chunk.course_title);
            if let Some(n) = chunk.lesson_number {
                header.push_str(&format!(" - Lesson {}", n));
            }
            header.push(']');
            formatted.push(format!("{}\n{}", header, chunk.text));

            let already_seen = sources
                .iter()
                .any(|s| s.course == chunk.course_title && s.lesson == chunk.lesson_number);
            if !already_seen {
                let link = match chunk.lesson_number {
                    Some(n) => self.store.lesson_link(&chunk.course_title, n).await?,
                    None => None,
                };
                sources.push(RetrievalSource {
                    course: chunk.course_title.clone(),
                    lesson: chunk.lesson_number,
                    link,
                });
            }
        }

        Ok(ToolOutcome {
            text: formatted.join("\n\n"),
            sources,
        })
    }
}

// ═══════════════════════════════════════════════════════════════════════
// OutlineTool
// ═══════════════════════════════════════════════════════════════════════

/// Course outline: title, link, and the numbered lesson list.
pub struct OutlineTool {
    store: Arc<SemanticStore>,
}

impl OutlineTool {
    pub fn new(store: Arc<SemanticStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for OutlineTool {
    fn name(&self) -> &str {
        "get_course_outline"
    }

    fn description(&self) -> &str {
        "Get the outline of a course, including its full list of lessons. \
         Use this when the user asks about course structure or syllabus."
    }

    fn parameters_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "course_title": {
                    "type": "string",
                    "description": "Course title or partial name (e.g. 'MCP', 'computer use')"
                }
            },
            "required": ["course_title"]
        })
    }

    async fn execute(&self, args: Value) -> Result<ToolOutcome> {
        let course_title = args["course_title"].as_str().unwrap_or("");
        if course_title.trim().is_empty() {
            anyhow::bail!("course_title must not be empty");
        }

        let Some(outline) = self.store.course_outline(course_title).await? else {
            return Ok(ToolOutcome::text_only(format!(
                "No course found matching '{}'.",
                course_title
            )));
        };

        let mut lines = vec![
            format!("Course: {}", outline.title),
            format!("Link: {}", outline.link.as_deref().unwrap_or("N/A")),
            String::new(),
            format!("Lessons ({} total):", outline.lessons.len()),
        ];
        for lesson in &outline.lessons {
            lines.push(format!("  Lesson {}: {}", lesson.number, lesson.title));
        }

        Ok(ToolOutcome::text_only(lines.join("\n")))
    }
}
