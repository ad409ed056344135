//! Session-level state types.
//!
//! A session starts in [`WindowMode::Other`] with the presentation
//! [`PresentationStatus::Stopped`].  `SWITCHMODE` messages change the window
//! mode; `PROGRAMKEY` messages are interpreted against it through
//! [`program_key`].

use std::fmt;

use crate::keymap::Keysym;

/// Which remote-control page the client is showing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WindowMode {
    /// Before any `SWITCHMODE`; no program keys are active.
    #[default]
    Other,
    Media,
    Web,
    Presentation,
}

impl WindowMode {
    /// Parses the argument of a `SWITCHMODE` message.  `OTHER` cannot be
    /// switched to explicitly.
    pub fn from_switch_token(token: &str) -> Option<Self> {
        match token {
            "MEDIA" => Some(Self::Media),
            "WEB" => Some(Self::Web),
            "PRESENTATION" => Some(Self::Presentation),
            _ => None,
        }
    }
}

/// Whether a slideshow has been started from the presentation page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PresentationStatus {
    #[default]
    Stopped,
    Started,
}

impl PresentationStatus {
    /// Flips the status and returns the new status together with the key
    /// that performs the transition (F5 starts, Escape stops).
    pub fn toggle(self) -> (Self, Keysym) {
        match self {
            Self::Stopped => (Self::Started, Keysym::F5),
            Self::Started => (Self::Stopped, Keysym::ESCAPE),
        }
    }
}

/// A configurable hotkey slot.
///
/// | Slots  | Triggered by                     |
/// |--------|----------------------------------|
/// | 1-4    | `HOTKEY HK1`..`HK4`              |
/// | 5      | `HOTKEY B1` (scroll-pad tap)     |
/// | 6      | `HOTKEY B2`                      |
/// | 7-15   | `GESTURE` (see [`Gesture::slot`]) |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HotkeySlot(u8);

impl HotkeySlot {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 15;

    /// Scroll-pad tap; defaults to a middle click when unconfigured.
    pub const B1: Self = Self(5);
    pub const B2: Self = Self(6);

    /// Returns the slot numbered `n`, or `None` outside 1..=15.
    pub fn new(n: u8) -> Option<Self> {
        (Self::MIN..=Self::MAX).contains(&n).then_some(Self(n))
    }

    pub fn get(self) -> u8 {
        self.0
    }
}

impl fmt::Display for HotkeySlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "slot {}", self.0)
    }
}

/// Trackpad gestures the client reports by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Gesture {
    TwoFingerDoubleTap,
    ThreeFingerSingleTap,
    ThreeFingerDoubleTap,
    FourFingerPinch,
    FourFingerSpread,
    FourFingerSwipeLeft,
    FourFingerSwipeRight,
    FourFingerSwipeUp,
    FourFingerSwipeDown,
}

impl Gesture {
    pub const ALL: [Self; 9] = [
        Self::TwoFingerDoubleTap,
        Self::ThreeFingerSingleTap,
        Self::ThreeFingerDoubleTap,
        Self::FourFingerPinch,
        Self::FourFingerSpread,
        Self::FourFingerSwipeLeft,
        Self::FourFingerSwipeRight,
        Self::FourFingerSwipeUp,
        Self::FourFingerSwipeDown,
    ];

    /// Parses a wire gesture token such as `FOURFINGERSWIPELEFT`.
    pub fn from_token(token: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|g| g.token() == token)
    }

    /// The wire token for this gesture.
    pub fn token(self) -> &'static str {
        match self {
            Self::TwoFingerDoubleTap => "TWOFINGERDOUBLETAP",
            Self::ThreeFingerSingleTap => "THREEFINGERSINGLETAP",
            Self::ThreeFingerDoubleTap => "THREEFINGERDOUBLETAP",
            Self::FourFingerPinch => "FOURFINGERPINCH",
            Self::FourFingerSpread => "FOURFINGERSPREAD",
            Self::FourFingerSwipeLeft => "FOURFINGERSWIPELEFT",
            Self::FourFingerSwipeRight => "FOURFINGERSWIPERIGHT",
            Self::FourFingerSwipeUp => "FOURFINGERSWIPEUP",
            Self::FourFingerSwipeDown => "FOURFINGERSWIPEDOWN",
        }
    }

    /// The hotkey slot (7-15) holding this gesture's command.
    pub fn slot(self) -> HotkeySlot {
        let index = Self::ALL.iter().position(|g| *g == self).unwrap_or_default();
        HotkeySlot(7 + index as u8)
    }
}

/// What a `PROGRAMKEY` resolves to in the current window mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgramKeyAction {
    /// Send this chord.
    Keys(&'static [Keysym]),
    /// Start or stop the slideshow; see [`PresentationStatus::toggle`].
    TogglePresentation,
}

/// Looks up a `PROGRAMKEY` name against the window mode.
///
/// Keys outside the mode's table (and every key in [`WindowMode::Other`])
/// return `None`.  In media mode both track buttons skip forward.
pub fn program_key(mode: WindowMode, name: &str) -> Option<ProgramKeyAction> {
    use ProgramKeyAction::{Keys, TogglePresentation};

    let action = match (mode, name) {
        (WindowMode::Media, "PLAYPAUSE") => Keys(&[Keysym::AUDIO_PLAY]),
        (WindowMode::Media, "TRACKPREV") => Keys(&[Keysym::AUDIO_NEXT]),
        (WindowMode::Media, "TRACKNEXT") => Keys(&[Keysym::AUDIO_NEXT]),
        (WindowMode::Media, "MEDIAPLUS") => Keys(&[Keysym::AUDIO_RAISE_VOLUME]),
        (WindowMode::Media, "MEDIAMINUS") => Keys(&[Keysym::AUDIO_LOWER_VOLUME]),
        (WindowMode::Media, "MEDIACUSTOMKEY1") => Keys(&[Keysym::F9]),
        (WindowMode::Media, "MEDIACUSTOMKEY5") => Keys(&[Keysym::F11]),

        (WindowMode::Web, "BROWSERNEWWINDOW") => Keys(&[Keysym::WWW]),
        (WindowMode::Web, "BROWSERNEWTAB") => Keys(&[Keysym::CONTROL_L, Keysym::LOWER_T]),
        (WindowMode::Web, "BROWSERLOCATION") => Keys(&[Keysym::CONTROL_L, Keysym::LOWER_L]),
        (WindowMode::Web, "BROWSERBACK") => Keys(&[Keysym::ALT_L, Keysym::LEFT]),
        (WindowMode::Web, "BROWSERNEXT") => Keys(&[Keysym::ALT_L, Keysym::RIGHT]),
        (WindowMode::Web, "BROWSERHOME") => Keys(&[Keysym::ALT_L, Keysym::HOME]),
        (WindowMode::Web, "BROWSERSEARCH") => Keys(&[Keysym::CONTROL_L, Keysym::LOWER_K]),
        (WindowMode::Web, "BROWSERRELOAD") => Keys(&[Keysym::CONTROL_L, Keysym::LOWER_R]),
        (WindowMode::Web, "BROWSERSTOP") => Keys(&[Keysym::ESCAPE]),
        (WindowMode::Web, "BROWSERBOOKMARKS") => Keys(&[Keysym::CONTROL_L, Keysym::LOWER_B]),
        (WindowMode::Web, "BROWSERPLUS") => Keys(&[Keysym::CONTROL_L, Keysym::TAB]),
        (WindowMode::Web, "BROWSERMINUS") => {
            Keys(&[Keysym::CONTROL_L, Keysym::SHIFT_L, Keysym::TAB])
        }

        (WindowMode::Presentation, "PRESENTATIONSTART") => TogglePresentation,
        (WindowMode::Presentation, "PRESENTATIONNEXT") => Keys(&[Keysym::RIGHT]),
        (WindowMode::Presentation, "PRESENTATIONBACK") => Keys(&[Keysym::LEFT]),

        _ => return None,
    };
    Some(action)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
