//! Application layer use cases for the server.
//!
//! # What use cases does the server have?
//!
//! - **`session`** – The per-connection state machine: handshake, then one
//!   dispatch per framed message.  Owns the window mode, the presentation
//!   status and the pointer acceleration tracker.
//!
//! - **`inject_input`** – The capability traits (`PointerInjector`,
//!   `KeyInjector`, `ClipboardProvider`) the session drives.  Implementations
//!   live in `infrastructure::input_emulation` and are opened per session.
//!
//! - **`pointer_policy`** – Move acceleration and scroll clamping.
//!
//! - **`dispatch_hotkey`** – Resolves hotkey slots and gestures to shell
//!   commands, clipboard sync or the scroll-pad middle click.

pub mod dispatch_hotkey;
pub mod inject_input;
pub mod pointer_policy;
pub mod session;
