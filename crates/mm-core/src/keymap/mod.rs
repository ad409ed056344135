//! Key tables for turning protocol key messages into X11 KeySyms.
//!
//! The canonical representation is the X11 [`Keysym`]; the injection
//! backend resolves it to a keycode at the last moment.

pub mod charset;
pub mod x11;

pub use charset::{Charset, ConversionError};
pub use x11::{named_key, Keysym};

use crate::protocol::messages::Modifier;

/// The KeySym pressed for a protocol modifier token.
///
/// `OPT` (the Mac option key) maps to Super.
pub fn modifier_keysym(modifier: Modifier) -> Keysym {
    match modifier {
        Modifier::Ctrl => Keysym::CONTROL_L,
        Modifier::Opt => Keysym::SUPER_L,
        Modifier::Alt => Keysym::ALT_L,
        Modifier::Shift => Keysym::SHIFT_L,
    }
}

/// Appends the KeySyms for `modifiers` to `keys`, in order.
pub fn push_modifiers(keys: &mut Vec<Keysym>, modifiers: &[Modifier]) {
    keys.extend(modifiers.iter().copied().map(modifier_keysym));
}

// ── Tests ─────────────────────────────────────────────────────────────────────
