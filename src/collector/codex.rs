//! Collector for codex's `--json` exec output mode.
//!
//! Codex reports work items as `item.started` / `item.completed` envelopes.
//! Agent messages arrive whole in `item.completed`, so there is no streamed
//! delta channel here; the fallback order is finalized text, then raw lines.

use serde::Deserialize;
use serde_json::Value;

use super::{truncate, EventCollector, TOOL_ARG_DISPLAY_LIMIT};
use crate::tui::{LineStyle, TuiWriter};

/// Longest rendered file-change list shown on a transcript line.
const FILE_CHANGE_DISPLAY_LIMIT: usize = 120;

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum CodexEvent {
    #[serde(rename = "item.started")]
    ItemStarted {
        #[serde(default)]
        item: CodexItem,
    },
    #[serde(rename = "item.completed")]
    ItemCompleted {
        #[serde(default)]
        item: CodexItem,
    },
    #[serde(rename = "turn.failed")]
    TurnFailed {
        #[serde(default)]
        error: Value,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum CodexItem {
    AgentMessage {
        #[serde(default)]
        text: String,
    },
    CommandExecution {
        #[serde(default)]
        command: String,
        #[serde(default)]
        exit_code: Option<i64>,
    },
    FileChange {
        #[serde(default)]
        changes: Vec<FileChange>,
    },
    WebSearch,
    McpToolCall {
        #[serde(default)]
        name: Option<String>,
    },
    #[serde(other)]
    Other,
}

impl Default for CodexItem {
    fn default() -> Self {
        CodexItem::Other
    }
}

#[derive(Debug, Deserialize)]
struct FileChange {
    #[serde(default)]
    kind: Option<String>,
    #[serde(default)]
    path: Option<String>,
}

/// Collector for codex exec JSON events.
pub struct CodexCollector {
    tui: TuiWriter,
    final_parts: Vec<String>,
    raw_fallback: Vec<String>,
}

impl CodexCollector {
    pub fn new(tui: TuiWriter) -> Self {
        Self {
            tui,
            final_parts: Vec::new(),
            raw_fallback: Vec::new(),
        }
    }

    fn on_started(&mut self, item: CodexItem) {
        match item {
            CodexItem::CommandExecution { command, .. } => self.tui.line(
                &format!("TOOL shell: {}", truncate(&command, TOOL_ARG_DISPLAY_LIMIT)),
                LineStyle::Tool,
            ),
            CodexItem::WebSearch => self.tui.line("TOOL web_search", LineStyle::Tool),
            CodexItem::McpToolCall { name } => self.tui.line(
                &format!("TOOL {}", name.as_deref().unwrap_or("mcp_tool")),
                LineStyle::Tool,
            ),
            _ => {}
        }
    }

    fn on_completed(&mut self, item: CodexItem) {
        match item {
            CodexItem::AgentMessage { text } => {
                if !text.is_empty() {
                    self.tui.text_chunk(&text);
                    self.tui.flush();
                    self.final_parts.push(text);
                }
            }
            CodexItem::CommandExecution { exit_code, .. } => {
                let suffix = match exit_code {
                    Some(code) if code != 0 => format!(" (exit {code})"),
                    _ => String::new(),
                };
                self.tui.line(&format!("DONE shell{suffix}"), LineStyle::Done);
            }
            CodexItem::FileChange { changes } => {
                if changes.is_empty() {
                    self.tui.line("DONE file_change", LineStyle::Done);
                } else {
                    let rendered = changes
                        .iter()
                        .map(|change| {
                            format!(
                                "{}:{}",
                                change.kind.as_deref().unwrap_or("?"),
                                change.path.as_deref().unwrap_or("?")
                            )
                        })
                        .collect::<Vec<_>>()
                        .join(", ");
                    self.tui.line(
                        &format!(
                            "DONE file_change: {}",
                            truncate(&rendered, FILE_CHANGE_DISPLAY_LIMIT)
                        ),
                        LineStyle::Done,
                    );
                }
            }
            CodexItem::WebSearch => self.tui.line("DONE web_search", LineStyle::Done),
            _ => {}
        }
    }
}

impl EventCollector for CodexCollector {
    fn feed(&mut self, line: &str) {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return;
        }

        let event: CodexEvent = match serde_json::from_str(trimmed) {
            Ok(event) => event,
            Err(_) => {
                self.raw_fallback.push(line.to_string());
                return;
            }
        };

        match event {
            CodexEvent::ItemStarted { item } => self.on_started(item),
            CodexEvent::ItemCompleted { item } => self.on_completed(item),
            CodexEvent::TurnFailed { error } => self.raw_fallback.push(turn_error_text(&error)),
            CodexEvent::Other => {}
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

        self.raw_fallback.join("\n").trim().to_string()
    }
}

fn turn_error_text(error: &Value) -> String {
    match error {
        Value::Null => "codex turn failed".to_string(),
        Value::String(text) => text.clone(),
        other => other
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| other.to_string()),
    }
}
