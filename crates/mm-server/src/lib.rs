//! mm-server library entry point.
//!
//! Re-exports all public modules so that integration tests in `tests/`
//! and the binary entry point in `main.rs` share the same module tree.
//!
//! # What does mm-server do? (for beginners)
//!
//! The Mobile Mouse phone apps turn a phone into a trackpad and keyboard for
//! a desktop computer.  This server is the desktop half:
//!
//! 1. Accepts a TCP connection from the phone (port 9099 by default) and
//!    advertises itself over zeroconf so the app can find it.
//! 2. Checks the phone's device id and password in the `CONNECT` handshake.
//! 3. Reads a stream of small text messages (`MOVE`, `CLICK`, `KEY`, ...)
//!    and turns each one into synthetic pointer or keyboard input through
//!    XTest.
//! 4. Runs configured shell commands for hotkeys and trackpad gestures, and
//!    sends the desktop clipboard back to the phone on request.
//!
//! Only one phone is served at a time; the next connection is accepted once
//! the current session ends.

/// Application layer: the session state machine and its collaborator traits.
pub mod application;

/// Infrastructure layer: X11, clipboard, processes, sockets and config files.
pub mod infrastructure;
