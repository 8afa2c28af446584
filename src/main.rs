use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use tokio::io::AsyncReadExt;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use prism::bridge::{self, BridgeError};
use prism::config::{self, BridgeConfig, Provider};
use prism::prepare;

/// Stream-mode bridge between an orchestrator and the claude/codex CLIs.
///
/// Everything after the provider selector is forwarded to the real tool;
/// an optional leading `--` separator is stripped first.
#[derive(Parser)]
#[command(name = "prism", version)]
struct Cli {
    /// Which real tool to wrap
    #[arg(value_enum)]
    provider: Provider,

    /// Arguments forwarded to the real tool
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    args: Vec<String>,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    match run(Cli::parse()).await {
        Ok(code) => ExitCode::from(u8::try_from(code).unwrap_or(1)),
        Err(err) => {
            eprintln!("prism: {err:#}");
            match err.downcast_ref::<BridgeError>() {
                Some(BridgeError::BinaryNotFound(_)) => ExitCode::from(127),
                _ => ExitCode::FAILURE,
            }
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<i32> {
    let mut args = cli.args;
    if args.first().map(String::as_str) == Some("--") {
        args.remove(0);
    }

    let real_bin = config::resolve_real_binary(cli.provider)
        .ok_or(BridgeError::BinaryNotFound(cli.provider))?;

    let prepared = prepare::prepare_args(cli.provider, args);
    if !prepared.bridging {
        debug!(
            "bridging does not apply, passing through to {}",
            real_bin.display()
        );
        return Ok(bridge::run_passthrough(&real_bin, &prepared.args).await?);
    }

    let prompt_text = match cli.provider {
        Provider::Claude => read_own_stdin()
            .await
            .context("failed to read prompt from stdin")?,
        Provider::Codex => prepared.prompt.clone(),
    };
    let worker_label = prepare::derive_worker_label(cli.provider, &prepared.args, &prompt_text);

    let config = BridgeConfig {
        provider: cli.provider,
        real_bin,
        args: prepared.args,
        prompt_text,
        worker_label,
    };
    Ok(bridge::run_bridge(&config).await?)
}

/// The claude prompt arrives on the bridge's own stdin and is forwarded to
/// the child verbatim.
async fn read_own_stdin() -> std::io::Result<String> {
    let mut raw = Vec::new();
    tokio::io::stdin().read_to_end(&mut raw).await?;
    Ok(String::from_utf8_lossy(&raw).into_owned())
}
