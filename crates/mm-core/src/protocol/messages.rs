//! Typed protocol messages.
//!
//! [`ClientMessage`] is everything the phone can send us; [`ServerMessage`]
//! is everything we send back.  Parsing and encoding live in
//! [`crate::protocol::codec`].

use crate::domain::config::Platform;
use crate::domain::session_state::{Gesture, WindowMode};

/// Placeholder MAC address reported in the `CONNECTED` response.
pub const HANDSHAKE_MAC: &str = "00:00:00:00:00:00";

/// Server protocol version tag reported in the `CONNECTED` response.
pub const PROTOCOL_VERSION_TAG: &str = "4";

/// Reason text sent with an accepted handshake.
pub const REASON_WELCOME: &str = "Welcome";

/// Reason text sent when the device id is not on the allow-list.
pub const REASON_DEVICE_NOT_ALLOWED: &str = "Device is not allowed";

/// Reason text sent when the password does not match.
pub const REASON_INCORRECT_PASSWORD: &str = "Incorrect password";

/// Device id reported by Android clients, which fail to connect when sent
/// the `HOTKEYS` announcement.
pub const ANDROID_DEVICE_ID: &str = "Android";

/// `KEY` code sentinel: the payload is a symbolic key name.
pub const KEY_CODE_NAMED: i64 = -1;

/// `KEY` code sentinel: the payload is raw UTF-8 that must be transcoded
/// through the keyboard layout.
pub const KEY_CODE_RAW_UTF8: i64 = -61;

/// Pointer buttons the protocol can address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MouseButton {
    Left,
    Middle,
    Right,
}

/// Press or release.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ButtonState {
    Down,
    Up,
}

/// Modifier keys a client may hold while clicking, scrolling or typing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Modifier {
    Ctrl,
    /// The Mac "option" key; injected as Super.
    Opt,
    Alt,
    Shift,
}

impl Modifier {
    /// Parses a single modifier token.  Unknown tokens yield `None`.
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "CTRL" => Some(Self::Ctrl),
            "OPT" => Some(Self::Opt),
            "ALT" => Some(Self::Alt),
            "SHIFT" => Some(Self::Shift),
            _ => None,
        }
    }

    /// Parses a `+`-joined modifier list such as `CTRL+SHIFT`, preserving
    /// order and skipping unknown or empty tokens.
    pub fn parse_list(list: &str) -> Vec<Self> {
        list.split('+').filter_map(Self::from_token).collect()
    }
}

/// What a `KEY` message asks us to type, decided by its code sentinel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyPayload {
    /// Code `-1`: a symbolic name such as `ENTER`, `F5` or `VOLUP`.
    Named(String),
    /// Code `-61`: UTF-8 bytes to convert through the keyboard layout.
    RawUtf8(String),
    /// Any other code: the first character of `text` is the character to type.
    Literal { code: i64, text: String },
}

/// Fields of the `CONNECT` hello.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ConnectMessage {
    pub password: String,
    pub device_id: String,
    pub device_name: String,
    /// Trailing platform/version fields; tolerated but unused.
    pub metadata: Vec<String>,
}

/// Which hotkey control a `HOTKEY` message refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HotkeyButton {
    /// `HK1`..`HK4`, the keyboard-page hotkeys.
    Key(u8),
    /// `B1`, a tap on the scroll pad.
    B1,
    /// `B2`, the second scroll-pad button.
    B2,
}

/// A parsed inbound message.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientMessage {
    Connect(ConnectMessage),
    SetOption {
        name: String,
        value: String,
    },
    Click {
        button: MouseButton,
        state: ButtonState,
        modifiers: Vec<Modifier>,
    },
    Move {
        dx: i32,
        dy: i32,
        /// Opaque client flag, accepted without validation.
        flag: String,
    },
    Scroll {
        dx: i32,
        dy: i32,
        modifiers: Vec<Modifier>,
    },
    /// Signed step count: magnitude is the number of steps, sign the direction.
    Zoom {
        steps: i32,
    },
    Key {
        key: KeyPayload,
        modifiers: Vec<Modifier>,
    },
    KeyString {
        text: String,
    },
    Gesture(Gesture),
    Hotkey(HotkeyButton),
    SwitchMode(WindowMode),
    ProgramKey {
        name: String,
    },
    OpenLink {
        url: String,
    },
    /// Did not match any known grammar.
    Unhandled {
        kind: String,
    },
}

impl ClientMessage {
    /// Protocol keyword of the message, for logging.
    pub fn kind(&self) -> &str {
        match self {
            Self::Connect(_) => "CONNECT",
            Self::SetOption { .. } => "SETOPTION",
            Self::Click { .. } => "CLICK",
            Self::Move { .. } => "MOVE",
            Self::Scroll { .. } => "SCROLL",
            Self::Zoom { .. } => "ZOOM",
            Self::Key { .. } => "KEY",
            Self::KeyString { .. } => "KEYSTRING",
            Self::Gesture(_) => "GESTURE",
            Self::Hotkey(_) => "HOTKEY",
            Self::SwitchMode(_) => "SWITCHMODE",
            Self::ProgramKey { .. } => "PROGRAMKEY",
            Self::OpenLink { .. } => "OPENLINK",
            Self::Unhandled { kind } => kind,
        }
    }
}

/// An outbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerMessage {
    /// Handshake result.
    Connected {
        accepted: bool,
        platform: Platform,
        hostname: String,
        reason: String,
    },
    /// Display names of hotkeys 1-4.
    Hotkeys { names: [String; 4] },
    /// Custom media-key labels advertised when entering media mode.
    MediaCustomKeys,
    /// Current desktop clipboard text.
    ClipboardUpdate { text: String },
}

impl ServerMessage {
    /// Builds the accepting `CONNECTED` response.
    pub fn welcome(platform: Platform, hostname: &str) -> Self {
        Self::Connected {
            accepted: true,
            platform,
            hostname: hostname.to_string(),
            reason: REASON_WELCOME.to_string(),
        }
    }

    /// Builds a rejecting `CONNECTED` response with the given reason.
    pub fn rejection(platform: Platform, hostname: &str, reason: &str) -> Self {
        Self::Connected {
            accepted: false,
            platform,
            hostname: hostname.to_string(),
            reason: reason.to_string(),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
