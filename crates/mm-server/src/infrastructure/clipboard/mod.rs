//! System clipboard access through `arboard`.
//!
//! A fresh `arboard::Clipboard` context is created for every refresh, so the
//! provider holds no display handle between clipboard syncs.

use tracing::{debug, warn};

use crate::application::inject_input::ClipboardProvider;

/// Reads the desktop clipboard on demand and caches the last text seen.
#[derive(Debug, Default)]
pub struct SystemClipboard {
    cached: String,
}

impl SystemClipboard {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Reads the clipboard text.  Empty or non-text content yields `None`.
fn read_clipboard_text() -> Option<String> {
    let mut clipboard = match arboard::Clipboard::new() {
        Ok(clipboard) => clipboard,
        Err(e) => {
            warn!("failed to open clipboard: {e}");
            return None;
        }
    };
    match clipboard.get_text() {
        Ok(text) if !text.is_empty() => Some(text),
        Ok(_) | Err(arboard::Error::ContentNotAvailable) => None,
        Err(e) => {
            debug!("clipboard read error: {e}");
            None
        }
    }
}

impl ClipboardProvider for SystemClipboard {
    /// Keeps the previous text when the clipboard is empty or unreadable.
    fn refresh(&mut self) -> bool {
        match read_clipboard_text() {
            Some(text) if text != self.cached => {
                self.cached = text;
                true
            }
            _ => false,
        }
    }

    fn current_text(&self) -> &str {
        &self.cached
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
