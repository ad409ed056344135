//! Capability traits the session drives: pointer, keyboard and clipboard.
//!
//! The session state machine never talks to X11 directly.  It calls these
//! traits, and the infrastructure layer supplies implementations: XTest on
//! Linux and a recording mock for tests and `--backend dry-run`.
//!
//! Devices are opened per session through [`InputBackend::open_session`] and
//! dropped when the session ends, so each implementation only has to be
//! `Send`, not `Sync`.

use mm_core::protocol::messages::{ButtonState, MouseButton};
use mm_core::Keysym;
use thiserror::Error;

/// Error type for input injection operations.
#[derive(Debug, Error)]
pub enum EmulationError {
    /// The display (or other input surface) could not be opened.
    #[error("input device unavailable: {0}")]
    Unavailable(String),

    #[error("platform error: {0}")]
    Platform(String),
}

/// Synthetic pointer input.
pub trait PointerInjector: Send {
    /// Presses or releases a button.
    fn click(&mut self, button: MouseButton, state: ButtonState) -> Result<(), EmulationError>;

    /// Moves the pointer relative to its current position.
    fn move_by(&mut self, dx: i32, dy: i32) -> Result<(), EmulationError>;

    /// Scrolls by `dx`/`dy` wheel steps.  Positive `dy` scrolls down and
    /// positive `dx` scrolls right.
    fn scroll(&mut self, dx: i32, dy: i32) -> Result<(), EmulationError>;
}

/// Synthetic keyboard input.
pub trait KeyInjector: Send {
    fn press(&mut self, key: Keysym) -> Result<(), EmulationError>;

    fn release(&mut self, key: Keysym) -> Result<(), EmulationError>;

    /// Sends a chord: presses `keys` in order, then releases them in reverse.
    ///
    /// If a press fails, the keys already held are still released before
    /// the error is returned.
    fn send(&mut self, keys: &[Keysym]) -> Result<(), EmulationError> {
        let mut held = 0;
        let mut outcome = Ok(());
        for &key in keys {
            if let Err(e) = self.press(key) {
                outcome = Err(e);
                break;
            }
            held += 1;
        }
        for &key in keys[..held].iter().rev() {
            self.release(key)?;
        }
        outcome
    }

    /// Returns `true` when `key` is only reachable with Shift held on the
    /// active layout (for example `!` on a US layout).
    fn is_shift_variant(&self, key: Keysym) -> bool;
}

/// Desktop clipboard access.
pub trait ClipboardProvider: Send {
    /// Re-reads the clipboard.  Returns `true` when the text changed.
    fn refresh(&mut self) -> bool;

    /// The text captured by the last [`refresh`](Self::refresh).
    fn current_text(&self) -> &str;
}

/// The devices one session owns.
pub struct SessionDevices {
    pub pointer: Box<dyn PointerInjector>,
    pub keyboard: Box<dyn KeyInjector>,
    pub clipboard: Box<dyn ClipboardProvider>,
}

/// Opens fresh devices for every session.
pub trait InputBackend: Send + Sync {
    /// # Errors
    ///
    /// Returns [`EmulationError::Unavailable`] when the underlying input
    /// surface cannot be opened; the session is then refused.
    fn open_session(&self) -> Result<SessionDevices, EmulationError>;
}

// ── Tests ─────────────────────────────────────────────────────────────────────
