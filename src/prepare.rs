//! Argument preparation for the wrapped tools.
//!
//! Decides whether a given invocation should be bridged at all, and if so
//! rewrites the argument list to request the provider's JSON streaming mode.
//! Flag insertion is idempotent: an argument list that already carries the
//! streaming flags passes through unchanged.

use regex::Regex;
use std::path::Path;

use crate::config::Provider;

/// Label used when no workspace path can be derived.
const UNKNOWN_LABEL: &str = "unknown";

/// Outcome of argument preparation.
///
/// When `bridging` is false the original arguments are returned untouched and
/// the caller must exec the real binary directly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prepared {
    pub args: Vec<String>,
    pub bridging: bool,
    /// Prompt text recovered from the argument list (codex only; claude
    /// prompts arrive on stdin).
    pub prompt: String,
}

impl Prepared {
    fn passthrough(args: Vec<String>) -> Self {
        Self {
            args,
            bridging: false,
            prompt: String::new(),
        }
    }
}

/// Prepare the argument list for `provider`, enabling its streaming mode when
/// the invocation qualifies for bridging.
pub fn prepare_args(provider: Provider, args: Vec<String>) -> Prepared {
    match provider {
        Provider::Claude => prepare_claude(args),
        Provider::Codex => prepare_codex(args),
    }
}

/// Claude bridges only in prompt mode (`-p` / `--print`). Streaming needs
/// verbose stream-json output with partial messages included.
fn prepare_claude(mut args: Vec<String>) -> Prepared {
    let prompt_mode = args.iter().any(|arg| arg == "-p" || arg == "--print");
    if !prompt_mode {
        return Prepared::passthrough(args);
    }

    if !args.iter().any(|arg| arg == "--verbose") {
        args.push("--verbose".to_string());
    }
    if !args.iter().any(|arg| arg == "--output-format") {
        args.push("--output-format".to_string());
        args.push("stream-json".to_string());
    }
    if !args.iter().any(|arg| arg == "--include-partial-messages") {
        args.push("--include-partial-messages".to_string());
    }

    Prepared {
        args,
        bridging: true,
        prompt: String::new(),
    }
}

/// Codex bridges only for the `exec` subcommand. The prompt is the token
/// after the `--` separator; `--json` goes in front of that separator so it
/// is parsed as a flag rather than part of the prompt.
fn prepare_codex(mut args: Vec<String>) -> Prepared {
    if args.first().map(String::as_str) != Some("exec") {
        return Prepared::passthrough(args);
    }

    let separator = args.iter().position(|arg| arg == "--");
    let prompt = separator
        .and_then(|index| args.get(index + 1))
        .cloned()
        .unwrap_or_default();

    if !args.iter().any(|arg| arg == "--json") {
        match separator {
            Some(index) => args.insert(index, "--json".to_string()),
            None => args.push("--json".to_string()),
        }
    }

    Prepared {
        args,
        bridging: true,
        prompt,
    }
}

/// Derive the display label for this run.
///
/// Source priority: explicit `-C <path>` workspace argument (codex), a
/// `Worktree: <path>` line in the prompt, then the current directory.
pub fn derive_worker_label(provider: Provider, args: &[String], prompt: &str) -> String {
    let source = match provider {
        Provider::Codex => workspace_arg(args).map(str::to_string),
        Provider::Claude => None,
    }
    .or_else(|| worktree_from_prompt(prompt))
    .or_else(|| {
        std::env::current_dir()
            .ok()
            .map(|dir| dir.display().to_string())
    });

    normalize_label(source.as_deref().unwrap_or(""))
}

/// The value of a `-C <path>` argument pair, if present.
fn workspace_arg(args: &[String]) -> Option<&str> {
    args.iter()
        .position(|arg| arg == "-C")
        .and_then(|index| args.get(index + 1))
        .map(String::as_str)
}

/// Workspace path announced in the prompt body, e.g. `Worktree: /work/fix-1`.
fn worktree_from_prompt(prompt: &str) -> Option<String> {
    let pattern = Regex::new(r"Worktree:\s*(\S+)").ok()?;
    Some(pattern.captures(prompt)?.get(1)?.as_str().to_string())
}

/// Final path segment with leading dots stripped, so hidden worktree
/// directories still read cleanly in the transcript.
fn normalize_label(path: &str) -> String {
    let base = Path::new(path.trim_end_matches('/'))
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("");
    let stripped = base.trim_start_matches('.');
    if stripped.is_empty() {
        UNKNOWN_LABEL.to_string()
    } else {
        stripped.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(tokens: &[&str]) -> Vec<String> {
        tokens.iter().map(|token| token.to_string()).collect()
    }

    #[test]
    fn claude_without_prompt_flag_is_passthrough() {
        let prepared = prepare_args(Provider::Claude, args(&["mcp", "list"]));
        assert!(!prepared.bridging);
        assert_eq!(prepared.args, args(&["mcp", "list"]));
    }

    #[test]
    fn claude_prompt_mode_enables_streaming_flags() {
        let prepared = prepare_args(Provider::Claude, args(&["-p"]));
        assert!(prepared.bridging);
        assert_eq!(
            prepared.args,
            args(&[
                "-p",
                "--verbose",
                "--output-format",
                "stream-json",
                "--include-partial-messages",
            ])
        );
    }

    #[test]
    fn claude_preparation_is_idempotent() {
        let first = prepare_args(Provider::Claude, args(&["--print"]));
        let second = prepare_args(Provider::Claude, first.args.clone());
        assert_eq!(first.args, second.args);
    }

    #[test]
    fn claude_respects_existing_output_format() {
        let prepared = prepare_args(
            Provider::Claude,
            args(&["-p", "--output-format", "stream-json"]),
        );
        let format_flags = prepared
            .args
            .iter()
            .filter(|arg| *arg == "--output-format")
            .count();
        assert_eq!(format_flags, 1);
    }

    #[test]
    fn codex_without_exec_is_passthrough() {
        let prepared = prepare_args(Provider::Codex, args(&["login"]));
        assert!(!prepared.bridging);
        assert_eq!(prepared.args, args(&["login"]));
    }

    #[test]
    fn codex_exec_inserts_json_before_separator() {
        let prepared = prepare_args(Provider::Codex, args(&["exec", "--", "do the thing"]));
        assert!(prepared.bridging);
        assert_eq!(prepared.args, args(&["exec", "--json", "--", "do the thing"]));
        assert_eq!(prepared.prompt, "do the thing");
    }

    #[test]
    fn codex_exec_without_separator_appends_json() {
        let prepared = prepare_args(Provider::Codex, args(&["exec"]));
        assert!(prepared.bridging);
        assert_eq!(prepared.args, args(&["exec", "--json"]));
        assert_eq!(prepared.prompt, "");
    }

    #[test]
    fn codex_preparation_is_idempotent() {
        let first = prepare_args(Provider::Codex, args(&["exec", "--", "task"]));
        let second = prepare_args(Provider::Codex, first.args.clone());
        assert_eq!(first.args, second.args);
    }

    #[test]
    fn worktree_pattern_drives_label() {
        let label = derive_worker_label(
            Provider::Claude,
            &[],
            "Context follows.\nWorktree: /a/b/.foo\nDo the work.",
        );
        assert_eq!(label, "foo");
    }

    #[test]
    fn codex_workspace_argument_wins_over_prompt() {
        let label = derive_worker_label(
            Provider::Codex,
            &args(&["exec", "-C", "/work/trees/fix-42", "--json"]),
            "Worktree: /elsewhere/other",
        );
        assert_eq!(label, "fix-42");
    }

    #[test]
    fn label_falls_back_to_current_directory() {
        let label = derive_worker_label(Provider::Claude, &[], "no marker here");
        let cwd = std::env::current_dir().expect("cwd");
        assert_eq!(label, normalize_label(&cwd.display().to_string()));
    }

    #[test]
    fn normalize_label_handles_edge_cases() {
        assert_eq!(normalize_label("/a/b/.foo"), "foo");
        assert_eq!(normalize_label("/a/b/trailing/"), "trailing");
        assert_eq!(normalize_label(""), "unknown");
        assert_eq!(normalize_label("..."), "unknown");
    }
}
