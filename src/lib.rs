//! # Prism
//!
//! A stream-mode bridge between an orchestrator and the claude/codex CLIs.
//!
//! Prism launches the real tool as a subprocess with its JSON streaming mode
//! enabled, renders tool activity and streamed text to the controlling
//! terminal as it arrives, and prints the consolidated final answer on stdout
//! so callers can parse it exactly as if the tool had run in plain text mode.
//!
//! ## Usage
//!
//! ```bash
//! prism claude -p < prompt.txt
//! prism codex exec -- "fix the failing test"
//! ```
//!
//! ## Modules
//!
//! - `config` - Provider identity, environment toggles, real-binary resolution
//! - `prepare` - Argument preparation and worker-label derivation
//! - `tui` - Live transcript writer for the controlling terminal
//! - `collector` - Per-provider stream event collectors
//! - `bridge` - Subprocess orchestration and result emission
pub mod bridge;
pub mod collector;
pub mod config;
pub mod prepare;
pub mod tui;
