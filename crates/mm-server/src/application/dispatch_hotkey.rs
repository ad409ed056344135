//! Hotkey and gesture command dispatch.
//!
//! Every hotkey slot (1-15) can carry a shell command in the configuration.
//! When the phone triggers a slot, the dispatcher:
//!
//! 1. Looks up the slot's command.
//! 2. Treats the reserved command `SYNC_CLIPBOARD` as a request to send the
//!    desktop clipboard back to the phone.
//! 3. Runs any other command through the [`CommandRunner`] without waiting
//!    for it.
//! 4. Falls back to a middle click for an unconfigured scroll-pad tap (`B1`).
//!
//! Clipboard sync and the middle click need the session's socket and pointer,
//! so the dispatcher hands them back to the session as a [`HotkeyAction`].

use std::sync::Arc;

use mm_core::{HotkeySlot, HotkeyTable};
use thiserror::Error;
use tracing::{info, warn};

/// Command value that sends the clipboard to the phone instead of running
/// a program.
pub const SYNC_CLIPBOARD_COMMAND: &str = "SYNC_CLIPBOARD";

/// Error type for launching external commands.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("failed to spawn `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },
}

/// Launches shell commands.
///
/// Implementations must not wait for the command to finish.
#[cfg_attr(test, mockall::automock)]
pub trait CommandRunner: Send + Sync {
    fn run(&self, command: &str) -> Result<(), CommandError>;
}

/// What a triggered slot turned into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HotkeyAction {
    /// A shell command was launched.
    RanCommand(String),
    /// The session must refresh the clipboard and send `CLIPBOARDUPDATE`.
    SyncClipboard,
    /// The session must inject a middle-button click.
    MiddleClick,
    /// Nothing is configured for the slot.
    Nothing,
}

/// Resolves hotkey slots against the configured table.
pub struct HotkeyDispatcher {
    runner: Arc<dyn CommandRunner>,
}

impl HotkeyDispatcher {
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self { runner }
    }

    /// Triggers `slot`.
    ///
    /// Shell commands are launched here; a launch failure is logged and
    /// otherwise ignored.  Actions that need the session are returned.
    pub fn dispatch(&self, hotkeys: &HotkeyTable, slot: HotkeySlot) -> HotkeyAction {
        match hotkeys.command(slot) {
            Some(SYNC_CLIPBOARD_COMMAND) => HotkeyAction::SyncClipboard,
            Some(command) => {
                info!("running command for hotkey {slot}: {command}");
                if let Err(e) = self.runner.run(command) {
                    warn!("hotkey {slot}: {e}");
                }
                HotkeyAction::RanCommand(command.to_string())
            }
            None if slot == HotkeySlot::B1 => HotkeyAction::MiddleClick,
            None => HotkeyAction::Nothing,
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
