//! Subprocess orchestration.
//!
//! Spawns the real tool, feeds its stdout line-by-line through the event
//! collector while a background task drains stderr, and emits the
//! consolidated result once the child exits. The child's exit code is
//! always propagated as the bridge's own.

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::process::Command;
use tracing::{debug, warn};

use crate::collector::{self, EventCollector};
use crate::config::{BridgeConfig, Provider};
use crate::tui::TuiWriter;

/// Bounded wait for the stderr drain task after the child exits. A wedged
/// reader must not hang the run; whatever was captured so far is replayed.
const STDERR_JOIN_TIMEOUT: Duration = Duration::from_secs(1);

#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("could not find real {0} binary")]
    BinaryNotFound(Provider),

    #[error("failed to spawn {command}: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to capture child {0}")]
    StreamCapture(&'static str),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// What one bridged run produced, before anything is written to the
/// bridge's own stdio.
struct BridgeOutcome {
    final_text: String,
    stderr: Vec<u8>,
    exit_code: i32,
}

/// Run the child in bridged mode and emit the consolidated result.
/// Returns the child's exit code.
pub async fn run_bridge(config: &BridgeConfig) -> Result<i32, BridgeError> {
    let tui = TuiWriter::new(config.provider, &config.worker_label);
    let collector = collector::collector_for(config.provider, tui);
    let outcome = capture(config, collector).await?;
    emit(&outcome)?;
    Ok(outcome.exit_code)
}

/// Exec the real binary with untouched arguments and inherited stdio.
/// Used whenever bridging does not apply.
pub async fn run_passthrough(real_bin: &Path, args: &[String]) -> Result<i32, BridgeError> {
    let status = Command::new(real_bin)
        .args(args)
        .spawn()
        .map_err(|source| BridgeError::Spawn {
            command: real_bin.display().to_string(),
            source,
        })?
        .wait()
        .await?;
    Ok(exit_code_of(status))
}

async fn capture(
    config: &BridgeConfig,
    mut collector: Box<dyn EventCollector>,
) -> Result<BridgeOutcome, BridgeError> {
    let mut cmd = Command::new(&config.real_bin);
    cmd.args(&config.args)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .stdin(match config.provider {
            // The claude prompt travels over stdin; codex takes its prompt
            // from the argument list and keeps the caller's stdin.
            Provider::Claude => Stdio::piped(),
            Provider::Codex => Stdio::inherit(),
        });

    debug!(
        "spawning {} {}",
        config.real_bin.display(),
        config.args.join(" ")
    );
    let mut child = cmd.spawn().map_err(|source| BridgeError::Spawn {
        command: config.real_bin.display().to_string(),
        source,
    })?;

    if config.provider == Provider::Claude {
        if let Some(mut stdin) = child.stdin.take() {
            // A child that exits without reading its stdin breaks the pipe;
            // the run itself can still produce a usable answer.
            let written = async {
                stdin.write_all(config.prompt_text.as_bytes()).await?;
                stdin.shutdown().await
            }
            .await;
            if let Err(err) = written {
                warn!("failed to write prompt to child stdin: {err}");
            }
        }
    }

    let stdout = child
        .stdout
        .take()
        .ok_or(BridgeError::StreamCapture("stdout"))?;
    let mut stderr = child
        .stderr
        .take()
        .ok_or(BridgeError::StreamCapture("stderr"))?;

    // Drain stderr concurrently so a chatty child cannot deadlock on a full
    // pipe while we sit in the stdout line loop. The buffer comes back
    // through the join handle; nothing is shared.
    let stderr_task = tokio::spawn(async move {
        let mut captured = Vec::new();
        let mut chunk = [0u8; 8192];
        loop {
            match stderr.read(&mut chunk).await {
                Ok(0) => break,
                Ok(read) => captured.extend_from_slice(&chunk[..read]),
                Err(err) => {
                    warn!("stderr drain failed: {err}");
                    break;
                }
            }
        }
        captured
    });

    let mut lines = BufReader::new(stdout).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        collector.feed(&line);
    }

    let status = child.wait().await?;

    let stderr_bytes = match tokio::time::timeout(STDERR_JOIN_TIMEOUT, stderr_task).await {
        Ok(Ok(captured)) => captured,
        Ok(Err(join_err)) => {
            warn!("stderr drain task failed: {join_err}");
            Vec::new()
        }
        Err(_) => {
            warn!(
                "stderr drain did not finish within {:?}, replaying nothing",
                STDERR_JOIN_TIMEOUT
            );
            Vec::new()
        }
    };

    collector.finish();

    Ok(BridgeOutcome {
        final_text: collector.final_text(),
        stderr: stderr_bytes,
        exit_code: exit_code_of(status),
    })
}

/// Write the final answer to stdout (newline-terminated) and replay the
/// child's stderr verbatim. Live transcript output went to the terminal
/// device, so these two channels stay clean for the calling process.
fn emit(outcome: &BridgeOutcome) -> Result<(), BridgeError> {
    use std::io::Write;

    if !outcome.final_text.is_empty() {
        let mut stdout = std::io::stdout().lock();
        stdout.write_all(outcome.final_text.as_bytes())?;
        if !outcome.final_text.ends_with('\n') {
            stdout.write_all(b"\n")?;
        }
        stdout.flush()?;
    }

    if !outcome.stderr.is_empty() {
        let mut stderr = std::io::stderr().lock();
        stderr.write_all(&outcome.stderr)?;
        stderr.flush()?;
    }

    Ok(())
}

fn exit_code_of(status: std::process::ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }
    1
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::{ClaudeCollector, CodexCollector};
    use crate::tui::TuiWriter;
    use std::path::PathBuf;

    fn claude_config(script: &str, prompt: &str) -> BridgeConfig {
        BridgeConfig {
            provider: Provider::Claude,
            real_bin: PathBuf::from("/bin/sh"),
            args: vec!["-c".to_string(), script.to_string()],
            prompt_text: prompt.to_string(),
            worker_label: "test".to_string(),
        }
    }

    fn claude_collector() -> Box<dyn EventCollector> {
        Box::new(ClaudeCollector::new(TuiWriter::with_sink(
            None,
            Provider::Claude,
            "test",
        )))
    }

    #[tokio::test]
    async fn captures_final_text_stderr_and_exit_code() {
        let script = r#"cat > /dev/null
echo '{"type":"assistant","message":{"content":[{"type":"text","text":"hello"}]}}'
echo 'diagnostic noise' >&2
exit 7"#;
        let outcome = capture(&claude_config(script, "prompt"), claude_collector())
            .await
            .unwrap();

        assert_eq!(outcome.final_text, "hello");
        assert_eq!(outcome.exit_code, 7);
        assert_eq!(
            String::from_utf8_lossy(&outcome.stderr),
            "diagnostic noise\n"
        );
    }

    #[tokio::test]
    async fn prompt_reaches_the_child_stdin() {
        // The child echoes its stdin back, so feeding a valid event line as
        // the prompt proves the pipe works end to end.
        let prompt =
            r#"{"type":"assistant","message":{"content":[{"type":"text","text":"pong"}]}}"#;
        let outcome = capture(&claude_config("cat", prompt), claude_collector())
            .await
            .unwrap();

        assert_eq!(outcome.final_text, "pong");
        assert_eq!(outcome.exit_code, 0);
    }

    #[tokio::test]
    async fn codex_child_runs_without_stdin_pipe() {
        let config = BridgeConfig {
            provider: Provider::Codex,
            real_bin: PathBuf::from("/bin/sh"),
            args: vec![
                "-c".to_string(),
                r#"echo '{"type":"item.completed","item":{"type":"agent_message","text":"done"}}'"#
                    .to_string(),
            ],
            prompt_text: String::new(),
            worker_label: "test".to_string(),
        };
        let collector = Box::new(CodexCollector::new(TuiWriter::with_sink(
            None,
            Provider::Codex,
            "test",
        )));
        let outcome = capture(&config, collector).await.unwrap();

        assert_eq!(outcome.final_text, "done");
        assert_eq!(outcome.exit_code, 0);
    }

    #[tokio::test]
    async fn garbage_output_still_resolves_an_answer() {
        let script = r#"cat > /dev/null
echo 'something went sideways'
exit 1"#;
        let outcome = capture(&claude_config(script, ""), claude_collector())
            .await
            .unwrap();

        assert_eq!(outcome.final_text, "something went sideways");
        assert_eq!(outcome.exit_code, 1);
    }

    #[tokio::test]
    async fn passthrough_relays_the_exit_code() {
        let code = run_passthrough(
            Path::new("/bin/sh"),
            &["-c".to_string(), "exit 5".to_string()],
        )
        .await
        .unwrap();
        assert_eq!(code, 5);
    }

    #[tokio::test]
    async fn spawn_failure_is_reported() {
        let err = run_passthrough(Path::new("/nonexistent/tool-xyz"), &[])
            .await
            .unwrap_err();
        assert!(matches!(err, BridgeError::Spawn { .. }));
    }
}
