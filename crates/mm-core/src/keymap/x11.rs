//! X11 KeySym values and the table of symbolic key names clients send.
//!
//! X11 KeySym values are defined in `X11/keysymdef.h` and
//! `X11/XF86keysym.h`.
//!
//! # What is an X11 KeySym? (for beginners)
//!
//! X11 identifies keys by **KeySym** (key symbol), not by physical position.
//! A KeySym can name a character or a function key:
//!
//! | KeySym name        | Value      | Meaning            |
//! |--------------------|------------|--------------------|
//! | `XK_a`             | 0x0061     | lowercase 'a'      |
//! | `XK_A`             | 0x0041     | uppercase 'A'      |
//! | `XK_Return`        | 0xFF0D     | Enter key          |
//! | `XF86XK_AudioPlay` | 0x1008FF14 | media play button  |
//!
//! Latin-1 characters use their code point directly, so `'t'` is KeySym
//! 0x74.  The injection backend converts a KeySym to the keycode of the key
//! that produces it on the active layout; whether Shift must be held to get
//! there is a separate question answered by the backend
//! (see `KeyInjector::is_shift_variant` in the server crate).

use std::fmt;

/// An X11 KeySym.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Keysym(pub u32);

impl Keysym {
    pub const BACKSPACE: Self = Self(0xFF08);
    pub const TAB: Self = Self(0xFF09);
    pub const RETURN: Self = Self(0xFF0D);
    pub const ESCAPE: Self = Self(0xFF1B);
    pub const DELETE: Self = Self(0xFFFF);

    pub const HOME: Self = Self(0xFF50);
    pub const LEFT: Self = Self(0xFF51);
    pub const UP: Self = Self(0xFF52);
    pub const RIGHT: Self = Self(0xFF53);
    pub const DOWN: Self = Self(0xFF54);
    pub const PAGE_UP: Self = Self(0xFF55);
    pub const PAGE_DOWN: Self = Self(0xFF56);
    pub const END: Self = Self(0xFF57);

    // Keypad
    pub const KP_ENTER: Self = Self(0xFF8D);
    pub const KP_INSERT: Self = Self(0xFF9E);
    pub const KP_MULTIPLY: Self = Self(0xFFAA);
    pub const KP_ADD: Self = Self(0xFFAB);
    pub const KP_SUBTRACT: Self = Self(0xFFAD);
    pub const KP_DECIMAL: Self = Self(0xFFAE);
    pub const KP_DIVIDE: Self = Self(0xFFAF);
    pub const KP_0: Self = Self(0xFFB0);
    pub const KP_1: Self = Self(0xFFB1);
    pub const KP_2: Self = Self(0xFFB2);
    pub const KP_3: Self = Self(0xFFB3);
    pub const KP_4: Self = Self(0xFFB4);
    pub const KP_5: Self = Self(0xFFB5);
    pub const KP_6: Self = Self(0xFFB6);
    pub const KP_7: Self = Self(0xFFB7);
    pub const KP_8: Self = Self(0xFFB8);
    pub const KP_9: Self = Self(0xFFB9);
    pub const KP_EQUAL: Self = Self(0xFFBD);

    pub const F1: Self = Self(0xFFBE);
    pub const F2: Self = Self(0xFFBF);
    pub const F3: Self = Self(0xFFC0);
    pub const F4: Self = Self(0xFFC1);
    pub const F5: Self = Self(0xFFC2);
    pub const F6: Self = Self(0xFFC3);
    pub const F7: Self = Self(0xFFC4);
    pub const F8: Self = Self(0xFFC5);
    pub const F9: Self = Self(0xFFC6);
    pub const F10: Self = Self(0xFFC7);
    pub const F11: Self = Self(0xFFC8);
    pub const F12: Self = Self(0xFFC9);

    // Modifiers
    pub const SHIFT_L: Self = Self(0xFFE1);
    pub const CONTROL_L: Self = Self(0xFFE3);
    pub const ALT_L: Self = Self(0xFFE9);
    pub const SUPER_L: Self = Self(0xFFEB);

    // XF86 multimedia keys
    pub const AUDIO_LOWER_VOLUME: Self = Self(0x1008_FF11);
    pub const AUDIO_MUTE: Self = Self(0x1008_FF12);
    pub const AUDIO_RAISE_VOLUME: Self = Self(0x1008_FF13);
    pub const AUDIO_PLAY: Self = Self(0x1008_FF14);
    pub const AUDIO_NEXT: Self = Self(0x1008_FF17);
    pub const EJECT: Self = Self(0x1008_FF2C);
    pub const WWW: Self = Self(0x1008_FF2E);

    // Latin-1 characters used by built-in shortcuts
    pub const PLUS: Self = Self(0x2B);
    pub const MINUS: Self = Self(0x2D);
    pub const LOWER_B: Self = Self(0x62);
    pub const LOWER_K: Self = Self(0x6B);
    pub const LOWER_L: Self = Self(0x6C);
    pub const LOWER_R: Self = Self(0x72);
    pub const LOWER_T: Self = Self(0x74);

    /// The KeySym that types `ch`.
    ///
    /// Latin-1 code points map to themselves; everything else uses the
    /// Unicode KeySym range (`0x0100_0000 | code point`).
    pub fn from_char(ch: char) -> Self {
        let cp = u32::from(ch);
        if cp < 0x100 {
            Self(cp)
        } else {
            Self(0x0100_0000 | cp)
        }
    }
}

impl fmt::Display for Keysym {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:04x}", self.0)
    }
}

/// Resolves a symbolic key name from a `KEY -1` message to the KeySyms to
/// press, in order.
///
/// Keypad digits come back prefixed with Shift: without Num Lock, the
/// unshifted keypad keys produce Home/End/PgUp and friends, which clients
/// send under their own names.
///
/// Returns `None` for names not in the table.
pub fn named_key(name: &str) -> Option<&'static [Keysym]> {
    let keys: &'static [Keysym] = match name {
        // keyboard page
        "ENTER" => &[Keysym::RETURN],
        "BACKSPACE" => &[Keysym::BACKSPACE],
        "TAB" => &[Keysym::TAB],

        // keypad
        "NUM_DIVIDE" => &[Keysym::KP_DIVIDE],
        "NUM_MULTIPLY" => &[Keysym::KP_MULTIPLY],
        "NUM_SUBTRACT" => &[Keysym::KP_SUBTRACT],
        "NUM_ADD" => &[Keysym::KP_ADD],
        "NUM_ENTER" => &[Keysym::KP_ENTER],
        "NUM_EQUAL" => &[Keysym::KP_EQUAL],
        "NUM_DECIMAL" => &[Keysym::KP_DECIMAL],
        "INSERT" => &[Keysym::KP_INSERT],
        "NUM0" => &[Keysym::SHIFT_L, Keysym::KP_0],
        "NUM1" => &[Keysym::SHIFT_L, Keysym::KP_1],
        "NUM2" => &[Keysym::SHIFT_L, Keysym::KP_2],
        "NUM3" => &[Keysym::SHIFT_L, Keysym::KP_3],
        "NUM4" => &[Keysym::SHIFT_L, Keysym::KP_4],
        "NUM5" => &[Keysym::SHIFT_L, Keysym::KP_5],
        "NUM6" => &[Keysym::SHIFT_L, Keysym::KP_6],
        "NUM7" => &[Keysym::SHIFT_L, Keysym::KP_7],
        "NUM8" => &[Keysym::SHIFT_L, Keysym::KP_8],
        "NUM9" => &[Keysym::SHIFT_L, Keysym::KP_9],

        // function page
        "ESCAPE" => &[Keysym::ESCAPE],
        "DELETE" => &[Keysym::DELETE],
        "HOME" => &[Keysym::HOME],
        "END" => &[Keysym::END],
        "PGUP" => &[Keysym::PAGE_UP],
        "PGDN" => &[Keysym::PAGE_DOWN],
        "UP" => &[Keysym::UP],
        "DOWN" => &[Keysym::DOWN],
        "RIGHT" => &[Keysym::RIGHT],
        "LEFT" => &[Keysym::LEFT],
        "F1" => &[Keysym::F1],
        "F2" => &[Keysym::F2],
        "F3" => &[Keysym::F3],
        "F4" => &[Keysym::F4],
        "F5" => &[Keysym::F5],
        "F6" => &[Keysym::F6],
        "F7" => &[Keysym::F7],
        "F8" => &[Keysym::F8],
        "F9" => &[Keysym::F9],
        "F10" => &[Keysym::F10],
        "F11" => &[Keysym::F11],
        "F12" => &[Keysym::F12],

        // media player
        "VOLDOWN" => &[Keysym::AUDIO_LOWER_VOLUME],
        "VOLUP" => &[Keysym::AUDIO_RAISE_VOLUME],
        "VOLMUTE" => &[Keysym::AUDIO_MUTE],
        "EJECT" => &[Keysym::EJECT],

        _ => return None,
    };
    Some(keys)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
