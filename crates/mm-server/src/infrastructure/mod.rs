//! Infrastructure layer for the server.
//!
//! Contains OS-facing adapters: input emulation, the clipboard, process
//! spawning, TCP and zeroconf, and the configuration file.
//!
//! **Dependency rule**: this layer may depend on `application` and `mm_core`,
//! but MUST NOT be imported by the `application` layer (tests excepted).
//!
//! # Sub-modules
//!
//! - **`input_emulation`** – `InputBackend` implementations: XTest on Linux
//!   and a recording `MockBackend` for tests and dry runs.
//!
//! - **`clipboard`** – `ClipboardProvider` over the system clipboard.
//!
//! - **`command`** – `CommandRunner` that launches hotkey commands via `sh -c`.
//!
//! - **`network`** – The TCP accept loop that runs one session at a time, and
//!   the `_mobileremote._tcp` zeroconf advertiser.
//!
//! - **`storage`** – TOML config file schema and loading.

pub mod clipboard;
pub mod command;
pub mod input_emulation;
pub mod network;
pub mod storage;
