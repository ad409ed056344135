//! Shell command runner for hotkeys and gestures.
//!
//! Commands run through `sh -c`, detached from the session: the session
//! never waits for them and their exit status is not reported.  Tokio reaps
//! the child in the background once the handle is dropped.

use std::process::Stdio;

use tokio::process::Command;
use tracing::debug;

use crate::application::dispatch_hotkey::{CommandError, CommandRunner};

/// Runs hotkey commands with the system shell.
#[derive(Debug, Clone)]
pub struct ShellCommandRunner {
    shell: String,
}

impl Default for ShellCommandRunner {
    fn default() -> Self {
        Self {
            shell: "sh".to_string(),
        }
    }
}

impl ShellCommandRunner {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CommandRunner for ShellCommandRunner {
    /// Must be called from within a Tokio runtime.
    fn run(&self, command: &str) -> Result<(), CommandError> {
        let child = Command::new(&self.shell)
            .arg("-c")
            .arg(command)
            .stdin(Stdio::null())
            .spawn()
            .map_err(|source| CommandError::Spawn {
                command: command.to_string(),
                source,
            })?;
        debug!("spawned `{command}` (pid {:?})", child.id());
        Ok(())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
