//! Collector for claude's `stream-json` output mode.
//!
//! Events arrive as newline-delimited JSON. `stream_event` envelopes carry
//! incremental deltas for live display; `assistant` envelopes carry the
//! finalized message content that becomes the authoritative answer. Lines
//! that fail to parse are kept verbatim as fallback answer text.

use std::collections::HashSet;

use serde::Deserialize;
use serde_json::Value;

use super::{truncate, EventCollector, TOOL_ARG_DISPLAY_LIMIT};
use crate::tui::{LineStyle, TuiWriter};

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ClaudeEvent {
    StreamEvent {
        #[serde(default)]
        event: StreamPayload,
    },
    Assistant {
        #[serde(default)]
        message: AssistantMessage,
    },
    Result {
        #[serde(default)]
        subtype: Option<String>,
        #[serde(default)]
        error: Option<Value>,
        #[serde(default)]
        result: Option<Value>,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum StreamPayload {
    // The raw block doubles as the tool display payload, so it stays untyped.
    ContentBlockStart {
        #[serde(default)]
        content_block: Value,
    },
    ContentBlockDelta {
        #[serde(default)]
        delta: Delta,
    },
    ContentBlockStop,
    #[serde(other)]
    Other,
}

impl Default for StreamPayload {
    fn default() -> Self {
        StreamPayload::Other
    }
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum Delta {
    TextDelta {
        #[serde(default)]
        text: String,
    },
    #[serde(other)]
    Other,
}

impl Default for Delta {
    fn default() -> Self {
        Delta::Other
    }
}

#[derive(Debug, Default, Deserialize)]
struct AssistantMessage {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentBlock {
    Text {
        #[serde(default)]
        text: String,
    },
    ToolUse {
        #[serde(default = "unnamed_tool")]
        name: String,
        #[serde(default)]
        input: Value,
    },
    #[serde(other)]
    Other,
}

fn unnamed_tool() -> String {
    "tool".to_string()
}

/// Collector for claude stream-json events.
pub struct ClaudeCollector {
    tui: TuiWriter,
    final_parts: Vec<String>,
    stream_parts: Vec<String>,
    raw_fallback: Vec<String>,
    tools_shown: HashSet<(String, String)>,
}

impl ClaudeCollector {
    pub fn new(tui: TuiWriter) -> Self {
        Self {
            tui,
            final_parts: Vec::new(),
            stream_parts: Vec::new(),
            raw_fallback: Vec::new(),
            tools_shown: HashSet::new(),
        }
    }

    /// Render a tool invocation at most once per (name, payload) pair.
    /// `serde_json` object keys are sorted, so the serialized payload is a
    /// stable signature.
    fn show_tool(&mut self, name: &str, payload: &Value) {
        let signature = (name.to_string(), payload.to_string());
        if !self.tools_shown.insert(signature) {
            return;
        }

        let detail = payload
            .get("file_path")
            .or_else(|| payload.get("command"))
            .and_then(Value::as_str);
        match detail {
            Some(detail) => self.tui.line(
                &format!("TOOL {name}: {}", truncate(detail, TOOL_ARG_DISPLAY_LIMIT)),
                LineStyle::Tool,
            ),
            None => self.tui.line(&format!("TOOL {name}"), LineStyle::Tool),
        }
    }

    fn on_stream_event(&mut self, payload: StreamPayload) {
        match payload {
            StreamPayload::ContentBlockStart { content_block } => {
                if content_block.get("type").and_then(Value::as_str) == Some("tool_use") {
                    let name = content_block
                        .get("name")
                        .and_then(Value::as_str)
                        .unwrap_or("tool")
                        .to_string();
                    self.show_tool(&name, &content_block);
                }
            }
            StreamPayload::ContentBlockDelta { delta } => {
                if let Delta::TextDelta { text } = delta {
                    if !text.is_empty() {
                        self.tui.text_chunk(&text);
                        self.stream_parts.push(text);
                    }
                }
            }
            StreamPayload::ContentBlockStop => self.tui.flush(),
            StreamPayload::Other => {}
        }
    }

    fn on_assistant(&mut self, message: AssistantMessage) {
        for block in message.content {
            match block {
                ContentBlock::Text { text } => {
                    if !text.is_empty() {
                        self.final_parts.push(text);
                    }
                }
                ContentBlock::ToolUse { name, input } => self.show_tool(&name, &input),
                ContentBlock::Other => {}
            }
        }
    }
}

impl EventCollector for ClaudeCollector {
    fn feed(&mut self, line: &str) {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return;
        }

        let event: ClaudeEvent = match serde_json::from_str(trimmed) {
            Ok(event) => event,
            Err(_) => {
                self.raw_fallback.push(line.to_string());
                return;
            }
        };

        match event {
            ClaudeEvent::StreamEvent { event } => self.on_stream_event(event),
            ClaudeEvent::Assistant { message } => self.on_assistant(message),
            ClaudeEvent::Result {
                subtype,
                error,
                result,
            } => {
                if subtype.as_deref() == Some("error") {
                    let message = error
                        .or(result)
                        .map(|value| value_text(&value))
                        .unwrap_or_else(|| "claude error".to_string());
                    self.raw_fallback.push(message);
                }
            }
            ClaudeEvent::Other => {}
        }
    }

    fn finish(&mut self) {
        self.tui.flush();
    }

    fn final_text(&self) -> String {
        let finalized = self
            .final_parts
            .iter()
            .map(String::as_str)
            .filter(|part| !part.trim().is_empty())
            .collect::<Vec<_>>()
            .join("\n");
        let finalized = finalized.trim();
        if !finalized.is_empty() {
            return finalized.to_string();
        }

        let streamed = self.stream_parts.concat();
        let streamed = streamed.trim();
        if !streamed.is_empty() {
            return streamed.to_string();
        }

        self.raw_fallback.join("\n").trim().to_string()
    }
}

fn value_text(value: &Value) -> String {
    match value.as_str() {
        Some(text) => text.to_string(),
        None => value.to_string(),
    }
}
