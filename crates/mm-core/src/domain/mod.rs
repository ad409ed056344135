//! Domain types for the Mobile Mouse server.
//!
//! Nothing in here touches sockets, input devices or the filesystem.  The
//! server crate builds a [`config::Configuration`] once at startup and hands
//! a shared reference to every session; sessions keep their own small state
//! machine built from the [`session_state`] types.

/// Read-only server settings and the hotkey command table.
pub mod config;

/// Window mode, presentation status, gestures, hotkey slots and the
/// `PROGRAMKEY` table.
pub mod session_state;
