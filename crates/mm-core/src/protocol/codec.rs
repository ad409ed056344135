//! Text codec: parses inbound packets and encodes outbound responses.
//!
//! Parsing is a single tokenizing pass: the packet (minus its terminator) is
//! split on the field separator, the first token selects the message kind,
//! and each kind checks it has the fields its grammar requires.
//!
//! Field-count rules:
//!
//! | Kind         | Fields after the keyword                 | Minimum |
//! |--------------|------------------------------------------|---------|
//! | `CONNECT`    | password, device id, device name, meta.. | 4       |
//! | `SETOPTION`  | name, value                              | 2       |
//! | `CLICK`      | `L`/`R`, `D`/`U`, modifiers              | 3       |
//! | `MOVE`       | dx, dy, flag                             | 3       |
//! | `SCROLL`     | dx, dy, modifiers                        | 3       |
//! | `KEY`        | code, payload, modifiers                 | 3       |
//! | others       | one argument                             | 1       |
//!
//! Any field may be empty, and fields beyond the minimum (including the
//! empty token produced by a trailing separator) are ignored.  `CONNECT`
//! needs at least one separator after the device name, so its minimum
//! counts that trailing (possibly empty) metadata field.
//!
//! Numbers are parsed leniently: an optional sign followed by leading
//! digits, stopping at the first other character (`"3.7"` is 3, `"abc"` is
//! 0).  A malformed number never rejects a message.

use std::borrow::Cow;

use crate::domain::session_state::{Gesture, WindowMode};
use crate::protocol::messages::{
    ButtonState, ClientMessage, ConnectMessage, HotkeyButton, KeyPayload, Modifier, MouseButton,
    ServerMessage, HANDSHAKE_MAC, KEY_CODE_NAMED, KEY_CODE_RAW_UTF8, PROTOCOL_VERSION_TAG,
};
use crate::protocol::{FIELD_SEPARATOR, SUBFIELD_SEPARATOR, TERMINATOR};

// ── Public API ────────────────────────────────────────────────────────────────

/// Parses one framed packet into a [`ClientMessage`].
///
/// The trailing terminator is optional.  Packets that match no grammar come
/// back as [`ClientMessage::Unhandled`]; this function never fails.
///
/// # Examples
///
/// ```rust
/// use mm_core::protocol::{parse_message, ClientMessage};
///
/// let msg = parse_message(b"ZOOM\x1e-3\x1e\x04");
/// assert_eq!(msg, ClientMessage::Zoom { steps: -3 });
/// ```
pub fn parse_message(packet: &[u8]) -> ClientMessage {
    let body = packet.strip_suffix(&[TERMINATOR]).unwrap_or(packet);
    let fields: Vec<Cow<'_, str>> = body
        .split(|&b| b == FIELD_SEPARATOR)
        .map(String::from_utf8_lossy)
        .collect();

    let kind = fields[0].as_ref();
    let args = &fields[1..];

    let parsed = match kind {
        "CONNECT" => parse_connect(args),
        "SETOPTION" => parse_set_option(args),
        "CLICK" => parse_click(args),
        "MOVE" => parse_move(args),
        "SCROLL" => parse_scroll(args),
        "ZOOM" => args.first().map(|n| ClientMessage::Zoom {
            steps: parse_lenient_int(n),
        }),
        "KEY" => parse_key(args),
        "KEYSTRING" => args.first().map(|t| ClientMessage::KeyString {
            text: t.to_string(),
        }),
        "GESTURE" => args
            .first()
            .and_then(|g| Gesture::from_token(g))
            .map(ClientMessage::Gesture),
        "HOTKEY" => args
            .first()
            .and_then(|h| parse_hotkey_button(h))
            .map(ClientMessage::Hotkey),
        "SWITCHMODE" => args
            .first()
            .and_then(|m| WindowMode::from_switch_token(m))
            .map(ClientMessage::SwitchMode),
        "PROGRAMKEY" => args.first().map(|k| ClientMessage::ProgramKey {
            name: k.to_string(),
        }),
        "OPENLINK" => args.first().map(|u| ClientMessage::OpenLink {
            url: u.to_string(),
        }),
        _ => None,
    };

    parsed.unwrap_or_else(|| ClientMessage::Unhandled {
        kind: kind.to_string(),
    })
}

/// Parses the first packet of a session, which must be a `CONNECT` hello.
///
/// Returns `None` for anything else.
pub fn parse_hello(packet: &[u8]) -> Option<ConnectMessage> {
    match parse_message(packet) {
        ClientMessage::Connect(hello) => Some(hello),
        _ => None,
    }
}

/// Encodes a [`ServerMessage`] into its wire bytes, terminator included.
///
/// # Examples
///
/// ```rust
/// use mm_core::protocol::{encode_response, ServerMessage};
///
/// let bytes = encode_response(&ServerMessage::ClipboardUpdate { text: "hi".into() });
/// assert_eq!(bytes, b"CLIPBOARDUPDATE\x1eTEXT\x1fhi\x04");
/// ```
pub fn encode_response(msg: &ServerMessage) -> Vec<u8> {
    let mut buf = Vec::new();
    match msg {
        ServerMessage::Connected {
            accepted,
            platform,
            hostname,
            reason,
        } => {
            push_field(&mut buf, "CONNECTED");
            push_field(&mut buf, if *accepted { "YES" } else { "NO" });
            push_field(&mut buf, platform.as_str());
            push_field(&mut buf, hostname);
            push_field(&mut buf, reason);
            push_field(&mut buf, HANDSHAKE_MAC);
            buf.extend_from_slice(PROTOCOL_VERSION_TAG.as_bytes());
        }
        ServerMessage::Hotkeys { names } => {
            buf.extend_from_slice(b"HOTKEYS");
            for name in names {
                buf.push(FIELD_SEPARATOR);
                buf.extend_from_slice(name.as_bytes());
            }
        }
        ServerMessage::MediaCustomKeys => {
            for label in ["MEDIACUSTOMKEYS", "Playlist", "", "", "", "Full Screen", "", ""] {
                push_field(&mut buf, label);
            }
        }
        ServerMessage::ClipboardUpdate { text } => {
            push_field(&mut buf, "CLIPBOARDUPDATE");
            buf.extend_from_slice(b"TEXT");
            buf.push(SUBFIELD_SEPARATOR);
            // A terminator inside the text would end the client's frame early.
            buf.extend(text.bytes().filter(|&b| b != TERMINATOR));
        }
    }
    buf.push(TERMINATOR);
    buf
}

/// Parses a decimal the way the clients' numbers are meant to be read:
/// optional whitespace and sign, then leading digits.  Anything unparseable
/// is 0 and out-of-range values saturate.
pub fn parse_lenient_int(text: &str) -> i32 {
    let text = text.trim_start();
    let (negative, digits) = match text.as_bytes().first() {
        Some(b'-') => (true, &text[1..]),
        Some(b'+') => (false, &text[1..]),
        _ => (false, text),
    };

    let mut value: i64 = 0;
    for b in digits.bytes().take_while(u8::is_ascii_digit) {
        value = (value * 10 + i64::from(b - b'0')).min(i64::from(i32::MAX) + 1);
    }
    if negative {
        value = -value;
    }
    value.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32
}

// ── Per-kind parsers ──────────────────────────────────────────────────────────

fn parse_connect(args: &[Cow<'_, str>]) -> Option<ClientMessage> {
    if args.len() < 4 {
        return None;
    }
    let mut metadata: Vec<String> = args[3..].iter().map(|f| f.to_string()).collect();
    if metadata.last().is_some_and(String::is_empty) {
        metadata.pop();
    }
    Some(ClientMessage::Connect(ConnectMessage {
        password: args[0].to_string(),
        device_id: args[1].to_string(),
        device_name: args[2].to_string(),
        metadata,
    }))
}

fn parse_set_option(args: &[Cow<'_, str>]) -> Option<ClientMessage> {
    if args.len() < 2 {
        return None;
    }
    Some(ClientMessage::SetOption {
        name: args[0].to_string(),
        value: args[1].to_string(),
    })
}

fn parse_click(args: &[Cow<'_, str>]) -> Option<ClientMessage> {
    if args.len() < 3 {
        return None;
    }
    let button = match args[0].as_ref() {
        "L" => MouseButton::Left,
        "R" => MouseButton::Right,
        _ => return None,
    };
    let state = match args[1].as_ref() {
        "D" => ButtonState::Down,
        "U" => ButtonState::Up,
        _ => return None,
    };
    Some(ClientMessage::Click {
        button,
        state,
        modifiers: Modifier::parse_list(&args[2]),
    })
}

fn parse_move(args: &[Cow<'_, str>]) -> Option<ClientMessage> {
    if args.len() < 3 {
        return None;
    }
    Some(ClientMessage::Move {
        dx: parse_lenient_int(&args[0]),
        dy: parse_lenient_int(&args[1]),
        flag: args[2].to_string(),
    })
}

fn parse_scroll(args: &[Cow<'_, str>]) -> Option<ClientMessage> {
    if args.len() < 3 {
        return None;
    }
    Some(ClientMessage::Scroll {
        dx: parse_lenient_int(&args[0]),
        dy: parse_lenient_int(&args[1]),
        modifiers: Modifier::parse_list(&args[2]),
    })
}

fn parse_key(args: &[Cow<'_, str>]) -> Option<ClientMessage> {
    if args.len() < 3 {
        return None;
    }
    let code = i64::from(parse_lenient_int(&args[0]));
    let payload = args[1].to_string();
    let key = match code {
        KEY_CODE_NAMED => KeyPayload::Named(payload),
        KEY_CODE_RAW_UTF8 => KeyPayload::RawUtf8(payload),
        _ => KeyPayload::Literal {
            code,
            text: payload,
        },
    };
    Some(ClientMessage::Key {
        key,
        modifiers: Modifier::parse_list(&args[2]),
    })
}

fn parse_hotkey_button(token: &str) -> Option<HotkeyButton> {
    match token {
        "B1" => Some(HotkeyButton::B1),
        "B2" => Some(HotkeyButton::B2),
        _ => {
            let n: u8 = token.strip_prefix("HK")?.parse().ok()?;
            (1..=4).contains(&n).then_some(HotkeyButton::Key(n))
        }
    }
}

fn push_field(buf: &mut Vec<u8>, field: &str) {
    buf.extend_from_slice(field.as_bytes());
    buf.push(FIELD_SEPARATOR);
}

// ── Tests ─────────────────────────────────────────────────────────────────────
