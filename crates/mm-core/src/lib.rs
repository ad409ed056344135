//! # mm-core
//!
//! Shared library for the Mobile Mouse server containing the wire protocol
//! (framing, parsing, response encoding), the X11 key tables, and the
//! session-level domain types.
//!
//! It has zero dependencies on OS APIs, input devices, or network sockets.
//!
//! # Architecture overview
//!
//! A phone running the Mobile Mouse app connects to the desktop over TCP and
//! streams small text messages ("move the pointer by 3,-1", "press ENTER",
//! "the user swiped left with four fingers").  The server turns those into
//! synthetic mouse, keyboard and clipboard activity.
//!
//! This crate is the foundation shared by the server binary:
//!
//! - **`protocol`** – How bytes travel over the network.  Messages are ASCII
//!   fields separated by `0x1e`, terminated by `0x04`.  The framer splits the
//!   stream into packets, the codec parses them into [`ClientMessage`]s and
//!   encodes [`ServerMessage`] responses.
//!
//! - **`keymap`** – X11 KeySym constants, the table of named keys the client
//!   can send, modifier parsing, and keyboard-layout transcoding.
//!
//! - **`domain`** – The read-only [`Configuration`] snapshot and the small
//!   state types a session carries (window mode, presentation status,
//!   hotkey slots).

pub mod domain;
pub mod keymap;
pub mod protocol;

pub use domain::config::{Configuration, HotKey, HotkeyTable, Platform};
pub use domain::session_state::{Gesture, HotkeySlot, PresentationStatus, WindowMode};
pub use keymap::Keysym;
pub use protocol::codec::{encode_response, parse_message};
pub use protocol::framing::{FramingError, PacketFramer};
pub use protocol::messages::{ClientMessage, ServerMessage};
