//! Protocol module: stream framing, message types, the text codec, and
//! debug dumps.
//!
//! Wire format:
//! ```text
//! KIND 0x1e field 0x1e field ... 0x04
//! ```
//! Fields are ASCII (UTF-8 for key payloads).  One message kind
//! (`CLIPBOARDUPDATE`) additionally uses the `0x1f` sub-field separator.

pub mod codec;
pub mod dump;
pub mod framing;
pub mod messages;

pub use codec::{encode_response, parse_hello, parse_message};
pub use framing::{FramingError, PacketFramer};
pub use messages::*;

/// Terminates every message ("end of transmission").
pub const TERMINATOR: u8 = 0x04;

/// Separates fields inside a message ("record separator").
pub const FIELD_SEPARATOR: u8 = 0x1e;

/// Separates sub-fields inside a field ("unit separator").
pub const SUBFIELD_SEPARATOR: u8 = 0x1f;
