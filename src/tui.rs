//! Live transcript writer for the controlling terminal.
//!
//! The transcript is written to `/dev/tty`, not stdout: stdout is reserved
//! for the consolidated final answer. When no terminal device is available
//! the writer is inert unless the stderr fallback toggle is set.

use std::fs::OpenOptions;
use std::io::Write;

use crate::config::{self, Provider};

const RESET: &str = "\x1b[0m";
const DIM: &str = "\x1b[2m";
const CYAN: &str = "\x1b[36m";
const GREEN: &str = "\x1b[32m";
const MAGENTA: &str = "\x1b[35m";

/// Rendering hint for a transcript line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineStyle {
    /// Streamed assistant text.
    Plain,
    /// A tool is being invoked.
    Tool,
    /// A tool finished.
    Done,
}

impl LineStyle {
    fn color(self) -> Option<&'static str> {
        match self {
            LineStyle::Plain => None,
            LineStyle::Tool => Some(CYAN),
            LineStyle::Done => Some(GREEN),
        }
    }
}

/// Accumulates streamed text and hands back complete newline-delimited
/// lines. Kept separate from any sink so the splitting logic is testable
/// without a terminal.
#[derive(Debug, Default)]
pub struct LineBuffer {
    pending: String,
}

impl LineBuffer {
    /// Append a chunk and extract every complete line it closes off.
    /// Returned lines have their trailing newline removed; text after the
    /// last newline stays buffered.
    pub fn push(&mut self, chunk: &str) -> Vec<String> {
        self.pending.push_str(chunk);

        let mut lines = Vec::new();
        while let Some(position) = self.pending.find('\n') {
            let rest = self.pending.split_off(position + 1);
            let mut line = std::mem::replace(&mut self.pending, rest);
            line.pop();
            lines.push(line);
        }
        lines
    }

    /// Drain whatever partial line remains.
    pub fn take(&mut self) -> Option<String> {
        if self.pending.is_empty() {
            None
        } else {
            Some(std::mem::take(&mut self.pending))
        }
    }
}

/// Append-only writer for the live transcript.
///
/// Every line is prefixed with the worker label and provider name so
/// concurrent bridge runs sharing one terminal stay distinguishable.
pub struct TuiWriter {
    sink: Option<Box<dyn Write + Send>>,
    buffer: LineBuffer,
    prefix: String,
}

impl TuiWriter {
    /// Resolve the sink from the environment and terminal availability.
    pub fn new(provider: Provider, worker_label: &str) -> Self {
        Self::from_sink(resolve_sink(), provider, worker_label)
    }

    fn from_sink(
        sink: Option<Box<dyn Write + Send>>,
        provider: Provider,
        worker_label: &str,
    ) -> Self {
        Self {
            sink,
            buffer: LineBuffer::default(),
            prefix: format!("{DIM}[{worker_label}]{RESET} {MAGENTA}{provider}{RESET}"),
        }
    }

    /// Writer with a caller-supplied sink, bypassing terminal detection.
    #[cfg(test)]
    pub(crate) fn with_sink(
        sink: Option<Box<dyn Write + Send>>,
        provider: Provider,
        worker_label: &str,
    ) -> Self {
        Self::from_sink(sink, provider, worker_label)
    }

    /// Append one fully-formed display line. No-op without a sink.
    pub fn line(&mut self, text: &str, style: LineStyle) {
        let Some(sink) = self.sink.as_mut() else {
            return;
        };
        let payload = match style.color() {
            Some(color) => format!("{} {color}{text}{RESET}\n", self.prefix),
            None => format!("{} {text}\n", self.prefix),
        };
        // The terminal can disappear mid-run; go inert rather than fail.
        if sink
            .write_all(payload.as_bytes())
            .and_then(|()| sink.flush())
            .is_err()
        {
            self.sink = None;
        }
    }

    /// Append streamed text, emitting any complete lines it closes off.
    pub fn text_chunk(&mut self, chunk: &str) {
        if self.sink.is_none() || chunk.is_empty() {
            return;
        }
        for line in self.buffer.push(chunk) {
            self.line(&line, LineStyle::Plain);
        }
    }

    /// Emit any buffered partial line.
    pub fn flush(&mut self) {
        if let Some(rest) = self.buffer.take() {
            self.line(&rest, LineStyle::Plain);
        }
    }
}

fn resolve_sink() -> Option<Box<dyn Write + Send>> {
    if !config::env_enabled(config::ENV_TTY, true) {
        return None;
    }
    match OpenOptions::new().write(true).open("/dev/tty") {
        Ok(tty) => Some(Box::new(tty)),
        Err(_) if config::env_enabled(config::ENV_TTY_STDERR, false) => {
            Some(Box::new(std::io::stderr()))
        }
        Err(_) => None,
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::CapturedSink;
    use super::*;

    fn captured_writer() -> (TuiWriter, CapturedSink) {
        let sink = CapturedSink::default();
        let writer = TuiWriter::with_sink(
            Some(Box::new(sink.clone())),
            Provider::Claude,
            "worker-1",
        );
        (writer, sink)
    }

    #[test]
    fn line_buffer_splits_on_newlines() {
        let mut buffer = LineBuffer::default();
        assert_eq!(buffer.push("partial"), Vec::<String>::new());
        assert_eq!(buffer.push(" line\nnext"), vec!["partial line".to_string()]);
        assert_eq!(buffer.take(), Some("next".to_string()));
        assert_eq!(buffer.take(), None);
    }

    #[test]
    fn line_buffer_handles_multiple_lines_in_one_chunk() {
        let mut buffer = LineBuffer::default();
        assert_eq!(
            buffer.push("a\nb\nc\n"),
            vec!["a".to_string(), "b".to_string(), "c".to_string()]
        );
        assert_eq!(buffer.take(), None);
    }

    #[test]
    fn lines_carry_label_and_provider_prefix() {
        let (mut writer, sink) = captured_writer();
        writer.line("TOOL Bash: ls", LineStyle::Tool);
        let output = sink.contents();
        assert!(output.contains("[worker-1]"));
        assert!(output.contains("claude"));
        assert!(output.contains("TOOL Bash: ls"));
        assert!(output.ends_with('\n'));
    }

    #[test]
    fn text_chunks_flush_only_complete_lines() {
        let (mut writer, sink) = captured_writer();
        writer.text_chunk("no newline yet");
        assert_eq!(sink.contents(), "");
        writer.text_chunk(" ... done\n");
        assert!(sink.contents().contains("no newline yet ... done"));
    }

    #[test]
    fn flush_emits_buffered_partial_line() {
        let (mut writer, sink) = captured_writer();
        writer.text_chunk("tail without newline");
        writer.flush();
        assert!(sink.contents().contains("tail without newline"));
    }

    #[test]
    fn inert_writer_ignores_everything() {
        let mut writer = TuiWriter::with_sink(None, Provider::Codex, "worker-2");
        writer.line("invisible", LineStyle::Done);
        writer.text_chunk("also invisible\n");
        writer.flush();
    }
}
