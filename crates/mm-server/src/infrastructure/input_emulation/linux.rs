//! Linux X11 input emulation via the XTest extension.
//!
//! Uses `XTestFakeKeyEvent`, `XTestFakeRelativeMotionEvent`, and
//! `XTestFakeButtonEvent` to inject input events into the X11 session.
//!
//! # What is XTest? (for beginners)
//!
//! XTest is an X11 protocol extension that lets a process synthesize keyboard
//! and mouse events as if the user had physically interacted with the hardware.
//! These events are delivered to the currently focused window exactly like real
//! input; the receiving application cannot distinguish them from physical input.
//!
//! The key functions are:
//! - `XTestFakeKeyEvent(display, keycode, is_press, time)`: simulate a key
//!   press or release.
//! - `XTestFakeRelativeMotionEvent(display, dx, dy, time)`: move the cursor
//!   relative to where it is now.  The phone is a touchpad, so every move is
//!   relative.
//! - `XTestFakeButtonEvent(display, button, is_press, time)`: simulate a
//!   mouse button press or release.
//!
//! # Key code translation
//!
//! The session works in X11 *KeySyms* (symbolic names like `XK_a` = 0x0061).
//! `XTestFakeKeyEvent` takes a *keycode* (a physical key position), so each
//! KeySym goes through `XKeysymToKeycode` at the last moment.  A KeySym with
//! no key on the active layout maps to `NoSymbol` (0) and is skipped.
//!
//! A KeySym is a *shift variant* when it is the level-1 (shifted) symbol of
//! its own keycode, e.g. `!` on the `1` key of a US layout.  The session uses
//! that to press Shift before typing it.
//!
//! # Mouse scroll via button events
//!
//! X11 does not have a dedicated scroll-wheel API.  Each scroll step is a
//! button press+release pair:
//!
//! | Button number | Scroll direction   |
//! |--------------|--------------------|
//! | 4            | Up (negative Y)    |
//! | 5            | Down (positive Y)  |
//! | 6            | Left (negative X)  |
//! | 7            | Right (positive X) |
//!
//! # Permissions
//!
//! XTest requires access to the X display.  This is normally satisfied when
//! the server runs in the user's desktop session.  If `DISPLAY` is not set or
//! the X server is not reachable, opening a session fails with
//! `EmulationError::Unavailable` and the connection is refused.

use std::ffi::CString;
use std::os::raw::c_int;
use std::ptr;

use mm_core::protocol::messages::{ButtonState, MouseButton};
use mm_core::Keysym;
use tracing::debug;
use x11::{xlib, xtest};

use crate::application::inject_input::{
    EmulationError, InputBackend, KeyInjector, PointerInjector, SessionDevices,
};
use crate::infrastructure::clipboard::SystemClipboard;

// ── X11 constants ─────────────────────────────────────────────────────────────

/// `CurrentTime`: let the server timestamp the synthesized event.
const CURRENT_TIME: xlib::Time = 0;

/// `NoSymbol` as returned by `XKeysymToKeycode`.
const NO_KEYCODE: xlib::KeyCode = 0;

const SCROLL_UP: u32 = 4;
const SCROLL_DOWN: u32 = 5;
const SCROLL_LEFT: u32 = 6;
const SCROLL_RIGHT: u32 = 7;

/// An owned Xlib display connection, closed on drop.
struct XDisplay {
    raw: *mut xlib::Display,
}

// SAFETY: the connection is owned by exactly one injector and is only used
// from the task that owns that injector; Xlib is never entered concurrently
// through it.
unsafe impl Send for XDisplay {}

impl XDisplay {
    fn open(name: Option<&str>) -> Result<Self, EmulationError> {
        let name = name
            .filter(|n| !n.is_empty())
            .map(CString::new)
            .transpose()
            .map_err(|e| EmulationError::Unavailable(format!("invalid display name: {e}")))?;
        let name_ptr = name.as_ref().map_or(ptr::null(), |n| n.as_ptr());

        // SAFETY: `name_ptr` is null or points at a NUL-terminated string that
        // outlives the call.
        let raw = unsafe { xlib::XOpenDisplay(name_ptr) };
        if raw.is_null() {
            return Err(EmulationError::Unavailable("cannot open X display".into()));
        }
        let display = Self { raw };

        let (mut event, mut error, mut major, mut minor): (c_int, c_int, c_int, c_int) =
            (0, 0, 0, 0);
        // SAFETY: `display.raw` is a live connection and the out-pointers are valid.
        let has_xtest = unsafe {
            xtest::XTestQueryExtension(display.raw, &mut event, &mut error, &mut major, &mut minor)
        };
        if has_xtest == 0 {
            return Err(EmulationError::Unavailable(
                "X server lacks the XTEST extension".into(),
            ));
        }
        Ok(display)
    }

    fn flush(&self) {
        // SAFETY: `self.raw` is a live connection.
        unsafe {
            xlib::XFlush(self.raw);
        }
    }

    fn fake_button(&self, button: u32, pressed: bool) {
        // SAFETY: `self.raw` is a live connection.
        unsafe {
            xtest::XTestFakeButtonEvent(self.raw, button, c_int::from(pressed), CURRENT_TIME);
        }
    }
}

impl Drop for XDisplay {
    fn drop(&mut self) {
        // SAFETY: `self.raw` was returned by `XOpenDisplay` and is closed once.
        unsafe {
            xlib::XCloseDisplay(self.raw);
        }
    }
}

/// Opens XTest pointer and keyboard connections for each session.
#[derive(Debug, Clone, Default)]
pub struct XTestBackend {
    /// X display name; `None` uses `$DISPLAY`.
    display: Option<String>,
}

impl XTestBackend {
    pub fn new(display: Option<String>) -> Self {
        Self { display }
    }
}

impl InputBackend for XTestBackend {
    fn open_session(&self) -> Result<SessionDevices, EmulationError> {
        let display = self.display.as_deref();
        Ok(SessionDevices {
            pointer: Box::new(XTestPointer {
                display: XDisplay::open(display)?,
            }),
            keyboard: Box::new(XTestKeyboard {
                display: XDisplay::open(display)?,
            }),
            clipboard: Box::new(SystemClipboard::new()),
        })
    }
}

/// Pointer injector backed by one X connection.
pub struct XTestPointer {
    display: XDisplay,
}

impl PointerInjector for XTestPointer {
    fn click(&mut self, button: MouseButton, state: ButtonState) -> Result<(), EmulationError> {
        let xbutton = match button {
            MouseButton::Left => 1,
            MouseButton::Middle => 2,
            MouseButton::Right => 3,
        };
        self.display.fake_button(xbutton, state == ButtonState::Down);
        self.display.flush();
        Ok(())
    }

    fn move_by(&mut self, dx: i32, dy: i32) -> Result<(), EmulationError> {
        // SAFETY: the display is a live connection.
        unsafe {
            xtest::XTestFakeRelativeMotionEvent(self.display.raw, -1, dx, dy, CURRENT_TIME);
        }
        self.display.flush();
        Ok(())
    }

    fn scroll(&mut self, dx: i32, dy: i32) -> Result<(), EmulationError> {
        let xbutton = if dx > 0 { SCROLL_RIGHT } else { SCROLL_LEFT };
        for _ in 0..dx.unsigned_abs() {
            self.display.fake_button(xbutton, true);
            self.display.fake_button(xbutton, false);
        }
        let ybutton = if dy > 0 { SCROLL_DOWN } else { SCROLL_UP };
        for _ in 0..dy.unsigned_abs() {
            self.display.fake_button(ybutton, true);
            self.display.fake_button(ybutton, false);
        }
        self.display.flush();
        Ok(())
    }
}

/// Keyboard injector backed by one X connection.
pub struct XTestKeyboard {
    display: XDisplay,
}

impl XTestKeyboard {
    fn keycode(&self, key: Keysym) -> xlib::KeyCode {
        // SAFETY: the display is a live connection.
        unsafe { xlib::XKeysymToKeycode(self.display.raw, xlib::KeySym::from(key.0)) }
    }

    fn fake_key(&mut self, key: Keysym, pressed: bool) {
        let keycode = self.keycode(key);
        if keycode == NO_KEYCODE {
            debug!("no keycode for keysym {key}; skipped");
            return;
        }
        // SAFETY: the display is a live connection.
        unsafe {
            xtest::XTestFakeKeyEvent(
                self.display.raw,
                u32::from(keycode),
                c_int::from(pressed),
                CURRENT_TIME,
            );
        }
        self.display.flush();
    }
}

impl KeyInjector for XTestKeyboard {
    fn press(&mut self, key: Keysym) -> Result<(), EmulationError> {
        self.fake_key(key, true);
        Ok(())
    }

    fn release(&mut self, key: Keysym) -> Result<(), EmulationError> {
        self.fake_key(key, false);
        Ok(())
    }

    fn is_shift_variant(&self, key: Keysym) -> bool {
        let keycode = self.keycode(key);
        if keycode == NO_KEYCODE {
            return false;
        }
        // SAFETY: the display is a live connection.
        let shifted = unsafe { xlib::XkbKeycodeToKeysym(self.display.raw, keycode, 0, 1) };
        shifted == xlib::KeySym::from(key.0)
    }
}
