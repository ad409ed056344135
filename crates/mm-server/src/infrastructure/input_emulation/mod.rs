//! Input emulation backends.
//!
//! The X11 backend is compiled on Linux only.  The mock backend is always
//! available; it backs the tests and `--backend dry-run`.

pub mod mock;

#[cfg(target_os = "linux")]
pub mod linux;
