//! Bounded tool-use conversation loop.
//!
//! One query drives the state machine
//!
//! ```text
//! AwaitingModel ──▶ ToolRequested ──▶ ExecutingTool ──▶ AwaitingModel(final)
//!       │                                                      │
//!       └──────────────────────▶ Done ◀────────────────────────┘
//! ```
//!
//! The model is called with the system prompt (history rendered in),
//! the user query, and the tool definitions. If it requests tool calls,
//! every call in that single round is executed and the model is invoked
//! exactly once more. Tool requests in the final response are not
//! honored; the loop never exceeds one round.

use anyhow::Result;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::error::LecternError;
use crate::model::{ChatMessage, ModelClient};
use crate::models::{Exchange, RetrievalSource};
use crate::tools::ToolRegistry;

/// Instruction text for the model. History is appended per query.
const SYSTEM_PROMPT: &str = "\
You are an assistant specialized in course materials and educational content. \
You have access to two tools:

1. search_course_content — Search within course lesson content for specific topics, concepts, or details.
2. get_course_outline — Retrieve a course's outline including its title, link, and full list of lessons.

Tool selection:
- Course outline, structure, or syllabus questions: use get_course_outline
- Course content or topic questions: use search_course_content
- General knowledge questions not about the course materials: answer directly without any tool

Tool usage rules:
- One tool round per query maximum
- If a tool returns no results, state this clearly without guessing

Responses must be brief, educational, and clear. Provide direct answers only — \
no meta-commentary about searches or reasoning.";

/// The final answer plus the retrieval sources gathered during the
/// query's tool round.
#[derive(Debug, Clone)]
pub struct OrchestratorOutcome {
    pub answer: String,
    pub sources: Vec<RetrievalSource>,
}

pub struct ConversationOrchestrator {
    model: Arc<dyn ModelClient>,
}

impl ConversationOrchestrator {
    pub fn new(model: Arc<dyn ModelClient>) -> Self {
        Self { model }
    }

    /// Run one query through the bounded tool-use loop.
    pub async fn run(
        &self,
        query: &str,
        history: &[Exchange],
        registry: &ToolRegistry,
    ) -> Result<OrchestratorOutcome> {
        let mut messages = vec![
            ChatMessage::system(render_system(history)),
            ChatMessage::user(query),
        ];
        let tools = registry.definitions();

        // AwaitingModel
        let first = self.model.chat(&messages, &tools).await?;

        if first.tool_calls.is_empty() {
            // Done — no tool round needed.
            return Ok(OrchestratorOutcome {
                answer: first.text.unwrap_or_default(),
                sources: Vec::new(),
            });
        }

        // ToolRequested → ExecutingTool: run every call in this one round.
        let mut sources = Vec::new();
        let first_text = first.text.clone();
        messages.push(ChatMessage::assistant(
            first.text.unwrap_or_default(),
            first.tool_calls.clone(),
        ));

        for call in &first.tool_calls {
            debug!(tool = %call.name, "executing tool call");
            match registry.execute(&call.name, call.arguments.clone()).await {
                Ok(outcome) => {
                    sources.extend(outcome.sources);
                    messages.push(ChatMessage::tool_result(call.id.clone(), outcome.text));
                }
                Err(err @ LecternError::UnknownTool(_)) => {
                    // Abort the tool round; fall back to the model's
                    // text-only response if it gave one.
                    warn!(error = %err, "tool round aborted");
                    if let Some(text) = first_text {
                        return Ok(OrchestratorOutcome {
                            answer: text,
                            sources,
                        });
                    }
                    return Err(err.into());
                }
                Err(err) => return Err(err.into()),
            }
        }

        // AwaitingModel(final)
        let last = self.model.chat(&messages, &tools).await?;
        if !last.tool_calls.is_empty() {
            debug!(
                requested = last.tool_calls.len(),
                "tool request after the bounded round ignored"
            );
        }

        // Done
        Ok(OrchestratorOutcome {
            answer: last.text.unwrap_or_default(),
            sources,
        })
    }
}

/// System prompt with the bounded conversation history rendered in.
fn render_system(history: &[Exchange]) -> String {
    if history.is_empty() {
        return SYSTEM_PROMPT.to_string();
    }

    let mut rendered = String::from(SYSTEM_PROMPT);
    rendered.push_str("\n\nPrevious conversation:\n");
    for exchange in history {
        rendered.push_str(&format!(
            "User: {}\nAssistant: {}\n",
            exchange.user, exchange.assistant
        ));
    }
    rendered
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ModelTurn, ToolCall};
    use crate::tools::{Tool, ToolOutcome};
    use async_trait::async_trait;
    use serde_json::{json, Value};
    use std::sync::Mutex;

    /// Model that replays scripted turns and records what it was sent.
    struct ScriptedModel {
        turns: Mutex<Vec<ModelTurn>>,
        seen: Mutex<Vec<Vec<ChatMessage>>>,
    }

    impl ScriptedModel {
        fn new(turns: Vec<ModelTurn>) -> Self {
            Self {
                turns: Mutex::new(turns),
                seen: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> usize {
            self.seen.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl ModelClient for ScriptedModel {
        async fn chat(
            &self,
            messages: &[ChatMessage],
            _tools: &[crate::tools::ToolDefinition],
        ) -> Result<ModelTurn> {
            self.seen.lock().unwrap().push(messages.to_vec());
            let mut turns = self.turns.lock().unwrap();
            anyhow::ensure!(!turns.is_empty(), "scripted model exhausted");
            Ok(turns.remove(0))
        }
    }

    struct EchoTool;

    #[async_trait]
    impl Tool for EchoTool {
        fn name(&self) -> &str {
            "echo"
        }
        fn description(&self) -> &str {
            "echoes its input"
        }
        fn parameters_schema(&self) -> Value {
            json!({ "type": "object", "properties": { "text": { "type": "string" } } })
        }
        async fn execute(&self, args: Value) -> Result<ToolOutcome> {
            Ok(ToolOutcome {
                text: format!("echo: {}", args["text"].as_str().unwrap_or("")),
                sources: vec![RetrievalSource {
                    course: "Echo Course".to_string(),
                    lesson: Some(1),
                    link: None,
                }],
            })
        }
    }

    fn tool_call(name: &str, args: Value) -> ToolCall {
        ToolCall {
            id: "call_1".to_string(),
            name: name.to_string(),
            arguments: args,
        }
    }

    fn text_turn(text: &str) -> ModelTurn {
        ModelTurn {
            text: Some(text.to_string()),
            tool_calls: Vec::new(),
        }
    }

    fn registry() -> ToolRegistry {
        let mut r = ToolRegistry::new();
        r.register(Box::new(EchoTool));
        r
    }

    #[tokio::test]
    async fn direct_answer_needs_one_model_call() {
        let model = Arc::new(ScriptedModel::new(vec![text_turn("Direct answer.")]));
        let orchestrator = ConversationOrchestrator::new(model.clone());

        let outcome = orchestrator.run("hi", &[], &registry()).await.unwrap();
        assert_eq!(outcome.answer, "Direct answer.");
        assert!(outcome.sources.is_empty());
        assert_eq!(model.calls(), 1);
    }

    #[tokio::test]
    async fn tool_round_executes_and_final_call_answers() {
        let model = Arc::new(ScriptedModel::new(vec![
            ModelTurn {
                text: None,
                tool_calls: vec![tool_call("echo", json!({ "text": "ping" }))],
            },
            text_turn("Final answer."),
        ]));
        let orchestrator = ConversationOrchestrator::new(model.clone());

        let outcome = orchestrator.run("use the tool", &[], &registry()).await.unwrap();
        assert_eq!(outcome.answer, "Final answer.");
        assert_eq!(outcome.sources.len(), 1);
        assert_eq!(outcome.sources[0].course, "Echo Course");
        assert_eq!(model.calls(), 2);

        // The final call saw the tool result appended.
        let seen = model.seen.lock().unwrap();
        let final_messages = &seen[1];
        assert_eq!(final_messages.len(), 4);
        assert!(final_messages[3].content.contains("echo: ping"));
        assert_eq!(final_messages[3].tool_call_id.as_deref(), Some("call_1"));
    }

    #[tokio::test]
    async fn second_tool_request_is_not_honored() {
        let model = Arc::new(ScriptedModel::new(vec![
            ModelTurn {
                text: None,
                tool_calls: vec![tool_call("echo", json!({ "text": "one" }))],
            },
            ModelTurn {
                text: Some("Text despite asking again.".to_string()),
                tool_calls: vec![tool_call("echo", json!({ "text": "two" }))],
            },
        ]));
        let orchestrator = ConversationOrchestrator::new(model.clone());

        let outcome = orchestrator.run("q", &[], &registry()).await.unwrap();
        assert_eq!(outcome.answer, "Text despite asking again.");
        // Exactly two model calls: the loop is bounded to one round.
        assert_eq!(model.calls(), 2);
    }

    #[tokio::test]
    async fn unknown_tool_falls_back_to_first_text() {
        let model = Arc::new(ScriptedModel::new(vec![ModelTurn {
            text: Some("Partial text.".to_string()),
            tool_calls: vec![tool_call("not_registered", json!({}))],
        }]));
        let orchestrator = ConversationOrchestrator::new(model.clone());

        let outcome = orchestrator.run("q", &[], &registry()).await.unwrap();
        assert_eq!(outcome.answer, "Partial text.");
        assert_eq!(model.calls(), 1);
    }

    #[tokio::test]
    async fn unknown_tool_without_text_is_an_error() {
        let model = Arc::new(ScriptedModel::new(vec![ModelTurn {
            text: None,
            tool_calls: vec![tool_call("not_registered", json!({}))],
        }]));
        let orchestrator = ConversationOrchestrator::new(model);

        let err = orchestrator.run("q", &[], &registry()).await.unwrap_err();
        assert!(err.downcast_ref::<LecternError>().is_some());
    }

    #[tokio::test]
    async fn history_is_rendered_into_the_system_prompt() {
        let model = Arc::new(ScriptedModel::new(vec![text_turn("ok")]));
        let orchestrator = ConversationOrchestrator::new(model.clone());

        let history = vec![Exchange {
            user: "What is MCP?".to_string(),
            assistant: "A protocol.".to_string(),
        }];
        orchestrator.run("follow-up", &history, &registry()).await.unwrap();

        let seen = model.seen.lock().unwrap();
        let system = &seen[0][0];
        assert!(system.content.contains("Previous conversation:"));
        assert!(system.content.contains("User: What is MCP?"));
        assert!(system.content.contains("Assistant: A protocol."));
    }

    #[tokio::test]
    async fn model_failure_propagates() {
        // Empty script: the first chat call fails.
        let model = Arc::new(ScriptedModel::new(vec![]));
        let orchestrator = ConversationOrchestrator::new(model);
        assert!(orchestrator.run("q", &[], &registry()).await.is_err());
    }
}
