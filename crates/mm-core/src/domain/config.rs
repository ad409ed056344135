//! The read-only server configuration snapshot.
//!
//! [`Configuration`] is built once at startup (defaults, then whatever the
//! config file overrides) and is never mutated afterwards.  Sessions only
//! ever see `&Configuration`.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

use super::session_state::HotkeySlot;
use crate::protocol::framing::DEFAULT_MAX_PACKET_SIZE;

/// Default TCP port the Mobile Mouse clients connect to.
pub const DEFAULT_PORT: u16 = 9099;

/// Default acceleration threshold in pixels per microsecond.
pub const DEFAULT_ACCELERATION_SPEED: f64 = 0.0004;

/// Default multiplier applied to fast pointer moves.
pub const DEFAULT_ACCELERATION_FACTOR: i32 = 4;

/// Default keyboard layout charset label.
pub const DEFAULT_KEYBOARD_LAYOUT: &str = "iso-8859-1";

/// Platform the server claims to be in its handshake.  Clients adjust their
/// shortcut labels to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Platform {
    #[default]
    #[serde(rename = "MAC")]
    Mac,
    #[serde(rename = "WIN")]
    Win,
}

impl Platform {
    /// Wire token (`MAC` or `WIN`).
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Mac => "MAC",
            Self::Win => "WIN",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A configured hotkey: the label shown on the phone and the command it runs.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct HotKey {
    pub name: String,
    pub command: String,
}

/// Sparse mapping from hotkey slot to [`HotKey`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct HotkeyTable {
    slots: BTreeMap<HotkeySlot, HotKey>,
}

impl HotkeyTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Assigns `hotkey` to `slot`, replacing any previous entry.
    pub fn insert(&mut self, slot: HotkeySlot, hotkey: HotKey) {
        self.slots.insert(slot, hotkey);
    }

    pub fn get(&self, slot: HotkeySlot) -> Option<&HotKey> {
        self.slots.get(&slot)
    }

    /// The command configured for `slot`, or `None` when the slot is empty
    /// or its command is blank.
    pub fn command(&self, slot: HotkeySlot) -> Option<&str> {
        self.get(slot)
            .map(|h| h.command.as_str())
            .filter(|c| !c.is_empty())
    }

    /// The display name for `slot`; empty when unset.
    pub fn name(&self, slot: HotkeySlot) -> &str {
        self.get(slot).map_or("", |h| h.name.as_str())
    }

    /// Display names of the four keyboard hotkeys, as announced in `HOTKEYS`.
    pub fn announced_names(&self) -> [String; 4] {
        std::array::from_fn(|i| {
            HotkeySlot::new(i as u8 + 1)
                .map(|slot| self.name(slot).to_string())
                .unwrap_or_default()
        })
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

/// Immutable server settings shared by every session.
#[derive(Debug, Clone, PartialEq)]
pub struct Configuration {
    /// Name announced in the handshake and over zeroconf.
    pub hostname: String,
    pub platform: Platform,
    /// Enables hex dumps of rejected and unhandled packets.
    pub debug: bool,
    pub port: u16,
    pub bind_address: String,
    /// Advertise the service over zeroconf.
    pub zeroconf: bool,
    /// Device ids allowed to connect; empty allows every device.
    pub device_ids: BTreeSet<String>,
    /// Required password; empty disables the check.
    pub password: String,
    pub accelerate: bool,
    /// Pointer speed (pixels per microsecond) above which moves accelerate.
    pub acceleration_speed: f64,
    pub acceleration_factor: i32,
    pub horizontal_scrolling: bool,
    /// Largest scroll step per axis; always at least 1.
    pub scroll_max: i32,
    pub keyboard_enabled: bool,
    /// Charset label used to transcode `KEY -61` payloads.
    pub keyboard_layout: String,
    /// Prefix Shift for shift-variant characters in `KEY` messages.
    pub infer_shift: bool,
    pub hotkeys: HotkeyTable,
    /// Cap on a buffered, unterminated packet.
    pub max_packet_size: usize,
    /// Disconnect a client that sends nothing for this long.
    pub idle_timeout: Option<Duration>,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            hostname: "localhost".to_string(),
            platform: Platform::Mac,
            debug: false,
            port: DEFAULT_PORT,
            bind_address: "0.0.0.0".to_string(),
            zeroconf: true,
            device_ids: BTreeSet::new(),
            password: String::new(),
            accelerate: true,
            acceleration_speed: DEFAULT_ACCELERATION_SPEED,
            acceleration_factor: DEFAULT_ACCELERATION_FACTOR,
            horizontal_scrolling: false,
            scroll_max: 1,
            keyboard_enabled: true,
            keyboard_layout: DEFAULT_KEYBOARD_LAYOUT.to_string(),
            infer_shift: true,
            hotkeys: HotkeyTable::new(),
            max_packet_size: DEFAULT_MAX_PACKET_SIZE,
            idle_timeout: None,
        }
    }
}

impl Configuration {
    /// Returns `true` when `device_id` may connect.
    pub fn is_device_allowed(&self, device_id: &str) -> bool {
        self.device_ids.is_empty() || self.device_ids.contains(device_id)
    }

    /// Returns `true` when `password` satisfies the configured password.
    pub fn password_matches(&self, password: &str) -> bool {
        self.password.is_empty() || self.password == password
    }

    /// Sets the scroll clamp, raising values below 1 to 1.
    pub fn set_scroll_max(&mut self, scroll_max: i32) {
        if scroll_max < 1 {
            warn!("mouse scroll_max {scroll_max} is below 1; using 1");
        }
        self.scroll_max = scroll_max.max(1);
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
