//! Mock input backend for tests and `--backend dry-run`.
//!
//! # Why a mock backend?
//!
//! The X11 backend makes Xlib calls that:
//!
//! - Require a running X server.
//! - Actually move the cursor or press keys on the test machine.
//! - Cannot be observed directly from Rust test code.
//!
//! [`MockBackend`] replaces all of that with in-memory recording.  Every
//! session it opens pushes into one shared `Mutex<Vec<InjectedEvent>>`, so a
//! test keeps a handle to the backend, runs a session, and then asserts on
//! exactly what was injected and in what order.
//!
//! # Usage in tests
//!
//! ```ignore
//! let backend = MockBackend::new();
//! let session = Session::new(stream, "peer", config, backend.open_session()?, dispatcher);
//! session.run().await?;
//!
//! assert_eq!(backend.events(), vec![InjectedEvent::Move(5, -5)]);
//! ```
//!
//! # `should_fail` flag
//!
//! [`MockBackend::failing`] makes every injection return
//! `EmulationError::Platform`, to exercise error paths in the session.
//! [`MockBackend::unavailable`] makes `open_session` itself fail.

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use mm_core::protocol::messages::{ButtonState, MouseButton};
use mm_core::Keysym;
use tracing::debug;

use crate::application::inject_input::{
    ClipboardProvider, EmulationError, InputBackend, KeyInjector, PointerInjector, SessionDevices,
};

/// Characters that need Shift on a US keyboard.
const US_SHIFTED: &str = "~!@#$%^&*()_+{}|:\"<>?ABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// One recorded injection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InjectedEvent {
    Click(MouseButton, ButtonState),
    Move(i32, i32),
    Scroll(i32, i32),
    /// A single key press outside a chord (click modifiers).
    KeyDown(Keysym),
    KeyUp(Keysym),
    /// A complete chord sent with [`KeyInjector::send`].
    Keys(Vec<Keysym>),
}

#[derive(Default)]
struct Shared {
    events: Mutex<Vec<InjectedEvent>>,
    clipboard: Mutex<String>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// A backend that records all calls without touching the desktop.
#[derive(Clone)]
pub struct MockBackend {
    shared: Arc<Shared>,
    shift_variants: Arc<BTreeSet<Keysym>>,
    /// When `false`, events are only logged (dry-run mode).
    record: bool,
    /// When `true`, every injection returns `EmulationError::Platform`.
    pub should_fail: bool,
    /// When `true`, `open_session` fails.
    pub unavailable: bool,
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MockBackend {
    /// A recording backend with a US keyboard layout.
    pub fn new() -> Self {
        Self {
            shared: Arc::default(),
            shift_variants: Arc::new(US_SHIFTED.chars().map(Keysym::from_char).collect()),
            record: true,
            should_fail: false,
            unavailable: false,
        }
    }

    /// A backend that logs injections at debug level instead of recording
    /// them, for running the server without touching the desktop.
    pub fn dry_run() -> Self {
        Self {
            record: false,
            ..Self::new()
        }
    }

    /// Every injection fails.
    pub fn failing() -> Self {
        Self {
            should_fail: true,
            ..Self::new()
        }
    }

    /// Replaces the set of characters reported as shift variants.
    pub fn with_shift_variants(mut self, chars: &str) -> Self {
        self.shift_variants = Arc::new(chars.chars().map(Keysym::from_char).collect());
        self
    }

    /// Sets the text the clipboard provider returns on its next refresh.
    pub fn set_clipboard_text(&self, text: &str) {
        *lock(&self.shared.clipboard) = text.to_string();
    }

    /// Everything injected so far, in order.
    pub fn events(&self) -> Vec<InjectedEvent> {
        lock(&self.shared.events).clone()
    }

    pub fn clear(&self) {
        lock(&self.shared.events).clear();
    }
}

impl InputBackend for MockBackend {
    fn open_session(&self) -> Result<SessionDevices, EmulationError> {
        if self.unavailable {
            return Err(EmulationError::Unavailable("mock backend unavailable".into()));
        }
        Ok(SessionDevices {
            pointer: Box::new(MockDevice::new(self)),
            keyboard: Box::new(MockDevice::new(self)),
            clipboard: Box::new(MockClipboard {
                shared: Arc::clone(&self.shared),
                cached: String::new(),
            }),
        })
    }
}

/// Pointer and keyboard half of a mock session.
struct MockDevice {
    shared: Arc<Shared>,
    shift_variants: Arc<BTreeSet<Keysym>>,
    record: bool,
    should_fail: bool,
}

impl MockDevice {
    fn new(backend: &MockBackend) -> Self {
        Self {
            shared: Arc::clone(&backend.shared),
            shift_variants: Arc::clone(&backend.shift_variants),
            record: backend.record,
            should_fail: backend.should_fail,
        }
    }

    fn emit(&self, event: InjectedEvent) -> Result<(), EmulationError> {
        if self.should_fail {
            return Err(EmulationError::Platform("mock failure".into()));
        }
        if self.record {
            lock(&self.shared.events).push(event);
        } else {
            debug!("dry-run: {event:?}");
        }
        Ok(())
    }
}

impl PointerInjector for MockDevice {
    fn click(&mut self, button: MouseButton, state: ButtonState) -> Result<(), EmulationError> {
        self.emit(InjectedEvent::Click(button, state))
    }

    fn move_by(&mut self, dx: i32, dy: i32) -> Result<(), EmulationError> {
        self.emit(InjectedEvent::Move(dx, dy))
    }

    fn scroll(&mut self, dx: i32, dy: i32) -> Result<(), EmulationError> {
        self.emit(InjectedEvent::Scroll(dx, dy))
    }
}

impl KeyInjector for MockDevice {
    fn press(&mut self, key: Keysym) -> Result<(), EmulationError> {
        self.emit(InjectedEvent::KeyDown(key))
    }

    fn release(&mut self, key: Keysym) -> Result<(), EmulationError> {
        self.emit(InjectedEvent::KeyUp(key))
    }

    /// Records the chord as one event so tests can compare whole chords.
    fn send(&mut self, keys: &[Keysym]) -> Result<(), EmulationError> {
        self.emit(InjectedEvent::Keys(keys.to_vec()))
    }

    fn is_shift_variant(&self, key: Keysym) -> bool {
        self.shift_variants.contains(&key)
    }
}

struct MockClipboard {
    shared: Arc<Shared>,
    cached: String,
}

impl ClipboardProvider for MockClipboard {
    fn refresh(&mut self) -> bool {
        let current = lock(&self.shared.clipboard);
        if *current == self.cached {
            return false;
        }
        self.cached.clone_from(&current);
        true
    }

    fn current_text(&self) -> &str {
        &self.cached
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
