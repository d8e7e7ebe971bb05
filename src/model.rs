//! Conversational model client.
//!
//! [`ModelClient`] abstracts the chat model behind one call: messages in,
//! one [`ModelTurn`] out, with any tool-call requests parsed into typed
//! values. The production implementation speaks the OpenAI-compatible
//! chat-completions protocol with function calling, which also covers
//! local servers (Ollama, llama.cpp) exposing the same API.
//!
//! A model-call failure is fatal for the query and is not retried here:
//! completions are not idempotent, so retries are a caller concern.

use anyhow::{bail, Result};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::time::Duration;

use crate::config::ModelConfig;
use crate::tools::ToolDefinition;

/// One requested tool invocation from the model.
#[derive(Debug, Clone)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    pub arguments: Value,
}

/// One model response: text, tool-call requests, or both.
#[derive(Debug, Clone, Default)]
pub struct ModelTurn {
    pub text: Option<String>,
    pub tool_calls: Vec<ToolCall>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

impl Role {
    fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::Tool => "tool",
        }
    }
}

/// One turn in the conversation sent to the model.
#[derive(Debug, Clone)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
    /// Set on assistant turns that requested tools.
    pub tool_calls: Vec<ToolCall>,
    /// Set on tool-result turns.
    pub tool_call_id: Option<String>,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
            tool_calls: Vec::new(),
            tool_call_id: None,
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            tool_calls: Vec::new(),
            tool_call_id: None,
        }
    }

    pub fn assistant(content: impl Into<String>, tool_calls: Vec<ToolCall>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            tool_calls,
            tool_call_id: None,
        }
    }

    pub fn tool_result(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: Role::Tool,
            content: content.into(),
            tool_calls: Vec::new(),
            tool_call_id: Some(tool_call_id.into()),
        }
    }
}

/// Client for the conversational model.
#[async_trait]
pub trait ModelClient: Send + Sync {
    async fn chat(&self, messages: &[ChatMessage], tools: &[ToolDefinition]) -> Result<ModelTurn>;
}

/// OpenAI-compatible chat-completions client.
pub struct OpenAiCompatibleModel {
    endpoint: String,
    model: String,
    api_key: String,
    max_tokens: u32,
    temperature: f64,
    client: reqwest::Client,
}

impl OpenAiCompatibleModel {
    /// Build a client from configuration. The API key is read from the
    /// environment variable named by `api_key_env`; an empty key is
    /// allowed for local endpoints that skip auth.
    pub fn new(config: &ModelConfig) -> Result<Self> {
        let api_key = std::env::var(&config.api_key_env).unwrap_or_default();

        Ok(Self {
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key,
            max_tokens: config.max_tokens,
            temperature: config.temperature,
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(config.timeout_secs))
                .build()?,
        })
    }
}

#[async_trait]
impl ModelClient for OpenAiCompatibleModel {
    async fn chat(&self, messages: &[ChatMessage], tools: &[ToolDefinition]) -> Result<ModelTurn> {
        let body = build_request_body(
            &self.model,
            self.temperature,
            self.max_tokens,
            messages,
            tools,
        );

        let url = format!("{}/chat/completions", self.endpoint);
        let mut req = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .json(&body);
        if !self.api_key.is_empty() {
            req = req.header("Authorization", format!("Bearer {}", self.api_key));
        }

        let resp = req
            .send()
            .await
            .map_err(|e| anyhow::anyhow!("model connection failed ({}): {}", url, e))?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            bail!("model API error {}: {}", status, text);
        }

        let json: Value = resp.json().await?;
        parse_chat_response(&json)
    }
}

/// Build the chat-completions request body.
pub fn build_request_body(
    model: &str,
    temperature: f64,
    max_tokens: u32,
    messages: &[ChatMessage],
    tools: &[ToolDefinition],
) -> Value {
    let rendered: Vec<Value> = messages
        .iter()
        .map(|m| {
            let mut obj = json!({
                "role": m.role.as_str(),
                "content": m.content,
            });
            if !m.tool_calls.is_empty() {
                obj["tool_calls"] = Value::Array(
                    m.tool_calls
                        .iter()
                        .map(|tc| {
                            json!({
                                "id": tc.id,
                                "type": "function",
                                "function": {
                                    "name": tc.name,
                                    "arguments": tc.arguments.to_string(),
                                }
                            })
                        })
                        .collect(),
                );
            }
            if let Some(id) = &m.tool_call_id {
                obj["tool_call_id"] = json!(id);
            }
            obj
        })
        .collect();

    let mut body = json!({
        "model": model,
        "temperature": temperature,
        "max_tokens": max_tokens,
        "messages": rendered,
    });

    if !tools.is_empty() {
        body["tools"] = Value::Array(
            tools
                .iter()
                .map(|t| {
                    json!({
                        "type": "function",
                        "function": {
                            "name": t.name,
                            "description": t.description,
                            "parameters": t.parameters,
                        }
                    })
                })
                .collect(),
        );
        body["tool_choice"] = json!("auto");
    }

    body
}

/// Parse a chat-completions response into a [`ModelTurn`].
pub fn parse_chat_response(json: &Value) -> Result<ModelTurn> {
    let choice = json["choices"]
        .get(0)
        .ok_or_else(|| anyhow::anyhow!("no choices in model response"))?;

    let text = choice["message"]["content"]
        .as_str()
        .filter(|s| !s.is_empty())
        .map(String::from);

    let tool_calls = match choice["message"]["tool_calls"].as_array() {
        Some(calls) => calls
            .iter()
            .filter_map(|tc| {
                let name = tc["function"]["name"].as_str()?;
                let arguments = tc["function"]["arguments"]
                    .as_str()
                    .and_then(|raw| serde_json::from_str(raw).ok())
                    .unwrap_or_else(|| json!({}));
                Some(ToolCall {
                    id: tc["id"].as_str().unwrap_or_default().to_string(),
                    name: name.to_string(),
                    arguments,
                })
            })
            .collect(),
        None => Vec::new(),
    };

    Ok(ModelTurn { text, tool_calls })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn definition() -> ToolDefinition {
        ToolDefinition {
            name: "search_course_content".to_string(),
            description: "Search course materials".to_string(),
            parameters: json!({
                "type": "object",
                "properties": { "query": { "type": "string" } },
                "required": ["query"]
            }),
        }
    }

    #[test]
    fn request_body_includes_tools_and_choice() {
        let messages = vec![ChatMessage::system("sys"), ChatMessage::user("hello")];
        let body = build_request_body("m", 0.0, 800, &messages, &[definition()]);

        assert_eq!(body["model"], "m");
        assert_eq!(body["messages"].as_array().unwrap().len(), 2);
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["tools"][0]["function"]["name"], "search_course_content");
        assert_eq!(body["tool_choice"], "auto");
    }

    #[test]
    fn request_body_omits_tools_when_none() {
        let messages = vec![ChatMessage::user("hello")];
        let body = build_request_body("m", 0.0, 800, &messages, &[]);
        assert!(body.get("tools").is_none());
        assert!(body.get("tool_choice").is_none());
    }

    #[test]
    fn assistant_tool_calls_serialize_with_string_arguments() {
        let call = ToolCall {
            id: "call_1".to_string(),
            name: "search_course_content".to_string(),
            arguments: json!({ "query": "mcp" }),
        };
        let messages = vec![
            ChatMessage::assistant("", vec![call]),
            ChatMessage::tool_result("call_1", "results here"),
        ];
        let body = build_request_body("m", 0.0, 800, &messages, &[]);

        let tc = &body["messages"][0]["tool_calls"][0];
        assert_eq!(tc["type"], "function");
        assert_eq!(tc["function"]["arguments"], "{\"query\":\"mcp\"}");

        assert_eq!(body["messages"][1]["role"], "tool");
        assert_eq!(body["messages"][1]["tool_call_id"], "call_1");
    }

    #[test]
    fn parses_text_only_response() {
        let json = json!({
            "choices": [{ "message": { "content": "An answer." }, "finish_reason": "stop" }]
        });
        let turn = parse_chat_response(&json).unwrap();
        assert_eq!(turn.text.as_deref(), Some("An answer."));
        assert!(turn.tool_calls.is_empty());
    }

    #[test]
    fn parses_tool_call_response() {
        let json = json!({
            "choices": [{
                "message": {
                    "content": null,
                    "tool_calls": [{
                        "id": "call_9",
                        "type": "function",
                        "function": {
                            "name": "search_course_content",
                            "arguments": "{\"query\": \"mcp\", \"lesson_number\": 2}"
                        }
                    }]
                },
                "finish_reason": "tool_calls"
            }]
        });
        let turn = parse_chat_response(&json).unwrap();
        assert!(turn.text.is_none());
        assert_eq!(turn.tool_calls.len(), 1);
        assert_eq!(turn.tool_calls[0].name, "search_course_content");
        assert_eq!(turn.tool_calls[0].arguments["lesson_number"], 2);
    }

    #[test]
    fn malformed_arguments_default_to_empty_object() {
        let json = json!({
            "choices": [{
                "message": {
                    "tool_calls": [{
                        "id": "call_1",
                        "function": { "name": "t", "arguments": "not json" }
                    }]
                }
            }]
        });
        let turn = parse_chat_response(&json).unwrap();
        assert_eq!(turn.tool_calls[0].arguments, json!({}));
    }

    #[test]
    fn missing_choices_is_an_error() {
        assert!(parse_chat_response(&json!({})).is_err());
    }
}
