//! Per-provider stream event collectors.
//!
//! Each collector consumes the child's stdout one line at a time, renders
//! tool activity and text to the [`TuiWriter`](crate::tui::TuiWriter), and
//! accumulates the authoritative final answer. Exactly one variant is active
//! per run, selected by provider at construction.

pub mod claude;
pub mod codex;

pub use claude::ClaudeCollector;
pub use codex::CodexCollector;

use crate::config::Provider;
use crate::tui::TuiWriter;

/// Longest tool argument (command, file path) shown on a transcript line.
const TOOL_ARG_DISPLAY_LIMIT: usize = 90;

/// Consumes raw stdout lines and resolves the final answer.
pub trait EventCollector: Send {
    /// Consume one line of child stdout.
    fn feed(&mut self, line: &str);

    /// Flush any partially rendered transcript output. Called once, after
    /// the child has exited.
    fn finish(&mut self);

    /// Resolve the consolidated final answer. Fallback priority is strict:
    /// finalized fragments, then streamed fragments, then raw lines.
    fn final_text(&self) -> String;
}

/// Construct the collector for `provider`.
pub fn collector_for(provider: Provider, tui: TuiWriter) -> Box<dyn EventCollector> {
    match provider {
        Provider::Claude => Box::new(ClaudeCollector::new(tui)),
        Provider::Codex => Box::new(CodexCollector::new(tui)),
    }
}

/// Truncate display text to `limit` characters, marking the cut with `...`.
fn truncate(text: &str, limit: usize) -> String {
    if text.chars().count() <= limit {
        return text.to_string();
    }
    let kept: String = text.chars().take(limit.saturating_sub(3)).collect();
    format!("{kept}...")
}
