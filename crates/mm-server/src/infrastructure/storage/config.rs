//! TOML configuration file loading.
//!
//! Reads the server settings from `config.toml`:
//! - Linux: `$XDG_CONFIG_HOME/mmserver/config.toml` or
//!   `~/.config/mmserver/config.toml`
//! - macOS: `~/Library/Application Support/mmserver/config.toml`
//!
//! A different file can be named on the command line with `--config`.
//!
//! # What is TOML? (for beginners)
//!
//! TOML (Tom's Obvious Minimal Language) is a configuration file format designed
//! to be easy to read and write.  It looks similar to INI files but with more
//! data types.  Example:
//!
//! ```toml
//! [server]
//! port = 9099
//! platform = "MAC"
//!
//! [device]
//! id = ["3F2504E0-4F89-11D3-9A0C-0305E82C3301"]
//! password = "hunter2"
//!
//! [keyboard.hotkeys.key1]
//! name = "Terminal"
//! command = "x-terminal-emulator"
//! ```
//!
//! # Serde default values
//!
//! Every field has a default, so an empty file, a partial file, or no file at
//! all gives a working server.  The parsed [`FileConfig`] mirrors the file
//! layout; [`FileConfig::into_configuration`] flattens it into the read-only
//! [`Configuration`] snapshot the sessions use.

use std::path::{Path, PathBuf};
use std::time::Duration;

use mm_core::domain::config::{
    DEFAULT_ACCELERATION_FACTOR, DEFAULT_ACCELERATION_SPEED, DEFAULT_KEYBOARD_LAYOUT, DEFAULT_PORT,
};
use mm_core::keymap::Charset;
use mm_core::protocol::framing::DEFAULT_MAX_PACKET_SIZE;
use mm_core::{Configuration, Gesture, HotKey, HotkeySlot, HotkeyTable, Platform};
use serde::Deserialize;
use thiserror::Error;
use tracing::warn;

/// Error type for configuration file operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The platform config directory could not be determined.
    #[error("could not determine platform config directory")]
    NoPlatformConfigDir,

    /// A file system I/O error occurred.
    #[error("I/O error accessing config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),
}

// ── Config schema types ───────────────────────────────────────────────────────

/// The configuration file as written on disk.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct FileConfig {
    pub server: ServerSection,
    pub device: DeviceSection,
    pub mouse: MouseSection,
    pub keyboard: KeyboardSection,
    pub gestures: GesturesSection,
    pub input: InputSection,
}

/// `[server]`: identity, listening socket and logging.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ServerSection {
    /// Name announced to phones; defaults to the machine hostname.
    #[serde(default)]
    pub hostname: Option<String>,
    #[serde(default)]
    pub platform: Platform,
    /// Log at debug level and dump unexpected packets.
    #[serde(default)]
    pub debug: bool,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    #[serde(default = "default_true")]
    pub zeroconf: bool,
    /// `tracing` log level: `"error"`, `"warn"`, `"info"`, `"debug"`, `"trace"`.
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default = "default_max_packet_size")]
    pub max_packet_size: usize,
    #[serde(default)]
    pub idle_timeout_secs: Option<u64>,
}

/// `device.id` may be a single string or an array of strings.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum DeviceIds {
    One(String),
    Many(Vec<String>),
}

impl Default for DeviceIds {
    fn default() -> Self {
        Self::Many(Vec::new())
    }
}

/// `[device]`: who may connect.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct DeviceSection {
    pub id: DeviceIds,
    pub password: String,
}

/// A hotkey that only carries a command (scroll-pad buttons).
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct CommandEntry {
    pub command: Option<String>,
}

/// A keyboard-page hotkey: label shown on the phone plus command.  An entry
/// missing either field is skipped rather than failing the whole file.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct NamedHotkeyEntry {
    pub name: Option<String>,
    pub command: Option<String>,
}

/// `[mouse]`: acceleration, scrolling and scroll-pad buttons.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct MouseSection {
    #[serde(default = "default_true")]
    pub accelerate: bool,
    #[serde(default = "default_acceleration_speed")]
    pub acceleration_speed: f64,
    #[serde(default = "default_acceleration_factor")]
    pub acceleration_factor: i32,
    #[serde(default)]
    pub horizontal_scrolling: bool,
    #[serde(default = "default_scroll_max")]
    pub scroll_max: i32,
    #[serde(default)]
    pub hotkeys: MouseHotkeys,
}

/// `[mouse.hotkeys]`: `key1` is the scroll-pad tap, `key2` the second button.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct MouseHotkeys {
    pub key1: Option<CommandEntry>,
    pub key2: Option<CommandEntry>,
}

/// `[keyboard]`: typing behaviour and the four keyboard-page hotkeys.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct KeyboardSection {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_keyboard_layout")]
    pub layout: String,
    #[serde(default = "default_true")]
    pub infer_shift: bool,
    #[serde(default)]
    pub hotkeys: KeyboardHotkeys,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct KeyboardHotkeys {
    pub key1: Option<NamedHotkeyEntry>,
    pub key2: Option<NamedHotkeyEntry>,
    pub key3: Option<NamedHotkeyEntry>,
    pub key4: Option<NamedHotkeyEntry>,
}

/// `[gestures]`: one command per trackpad gesture.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct GesturesSection {
    pub twofingerdoubletap: Option<String>,
    pub threefingersingletap: Option<String>,
    pub threefingerdoubletap: Option<String>,
    pub fourfingerpinch: Option<String>,
    pub fourfingerspread: Option<String>,
    pub fourfingerswipeleft: Option<String>,
    pub fourfingerswiperight: Option<String>,
    pub fourfingerswipeup: Option<String>,
    pub fourfingerswipedown: Option<String>,
}

impl GesturesSection {
    fn command(&self, gesture: Gesture) -> Option<&String> {
        match gesture {
            Gesture::TwoFingerDoubleTap => self.twofingerdoubletap.as_ref(),
            Gesture::ThreeFingerSingleTap => self.threefingersingletap.as_ref(),
            Gesture::ThreeFingerDoubleTap => self.threefingerdoubletap.as_ref(),
            Gesture::FourFingerPinch => self.fourfingerpinch.as_ref(),
            Gesture::FourFingerSpread => self.fourfingerspread.as_ref(),
            Gesture::FourFingerSwipeLeft => self.fourfingerswipeleft.as_ref(),
            Gesture::FourFingerSwipeRight => self.fourfingerswiperight.as_ref(),
            Gesture::FourFingerSwipeUp => self.fourfingerswipeup.as_ref(),
            Gesture::FourFingerSwipeDown => self.fourfingerswipedown.as_ref(),
        }
    }
}

/// Which input backend drives the desktop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum BackendKind {
    /// Inject through the X11 XTest extension.
    #[default]
    X11,
    /// Log injections instead of performing them.
    DryRun,
}

/// `[input]`: backend selection.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct InputSection {
    pub backend: BackendKind,
    /// X display name; unset uses `$DISPLAY`.
    pub display: Option<String>,
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_true() -> bool {
    true
}
fn default_port() -> u16 {
    DEFAULT_PORT
}
fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_max_packet_size() -> usize {
    DEFAULT_MAX_PACKET_SIZE
}
fn default_acceleration_speed() -> f64 {
    DEFAULT_ACCELERATION_SPEED
}
fn default_acceleration_factor() -> i32 {
    DEFAULT_ACCELERATION_FACTOR
}
fn default_scroll_max() -> i32 {
    1
}
fn default_keyboard_layout() -> String {
    DEFAULT_KEYBOARD_LAYOUT.to_string()
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            hostname: None,
            platform: Platform::default(),
            debug: false,
            port: default_port(),
            bind_address: default_bind_address(),
            zeroconf: default_true(),
            log_level: default_log_level(),
            max_packet_size: default_max_packet_size(),
            idle_timeout_secs: None,
        }
    }
}

impl Default for MouseSection {
    fn default() -> Self {
        Self {
            accelerate: default_true(),
            acceleration_speed: default_acceleration_speed(),
            acceleration_factor: default_acceleration_factor(),
            horizontal_scrolling: false,
            scroll_max: default_scroll_max(),
            hotkeys: MouseHotkeys::default(),
        }
    }
}

impl Default for KeyboardSection {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            layout: default_keyboard_layout(),
            infer_shift: default_true(),
            hotkeys: KeyboardHotkeys::default(),
        }
    }
}

// ── Conversion to the runtime snapshot ────────────────────────────────────────

impl FileConfig {
    /// Flattens the file layout into the [`Configuration`] snapshot.
    ///
    /// Out-of-range values are corrected with a warning rather than
    /// rejected: `scroll_max` below 1 becomes 1, and an unknown keyboard
    /// layout is kept (raw UTF-8 keys are then dropped per message).
    pub fn into_configuration(self) -> Configuration {
        let mut config = Configuration {
            hostname: self.server.hostname.unwrap_or_else(machine_hostname),
            platform: self.server.platform,
            debug: self.server.debug,
            port: self.server.port,
            bind_address: self.server.bind_address,
            zeroconf: self.server.zeroconf,
            device_ids: match self.device.id {
                DeviceIds::One(id) => [id].into_iter().collect(),
                DeviceIds::Many(ids) => ids.into_iter().collect(),
            },
            password: self.device.password,
            accelerate: self.mouse.accelerate,
            acceleration_speed: self.mouse.acceleration_speed,
            acceleration_factor: self.mouse.acceleration_factor,
            horizontal_scrolling: self.mouse.horizontal_scrolling,
            keyboard_enabled: self.keyboard.enabled,
            infer_shift: self.keyboard.infer_shift,
            hotkeys: build_hotkey_table(&self.keyboard.hotkeys, &self.mouse.hotkeys, &self.gestures),
            max_packet_size: self.server.max_packet_size,
            idle_timeout: self.server.idle_timeout_secs.map(Duration::from_secs),
            ..Configuration::default()
        };
        config.set_scroll_max(self.mouse.scroll_max);

        if let Err(e) = Charset::from_label(&self.keyboard.layout) {
            warn!("keyboard.layout: {e}");
        }
        config.keyboard_layout = self.keyboard.layout;
        config
    }
}

fn build_hotkey_table(
    keyboard: &KeyboardHotkeys,
    mouse: &MouseHotkeys,
    gestures: &GesturesSection,
) -> HotkeyTable {
    let mut table = HotkeyTable::new();
    let keyboard_keys = [&keyboard.key1, &keyboard.key2, &keyboard.key3, &keyboard.key4];
    for (n, entry) in (1u8..).zip(keyboard_keys) {
        let (Some(slot), Some(entry)) = (HotkeySlot::new(n), entry) else {
            continue;
        };
        match (&entry.name, &entry.command) {
            (Some(name), Some(command)) => table.insert(
                slot,
                HotKey {
                    name: name.clone(),
                    command: command.clone(),
                },
            ),
            _ => warn!("keyboard.hotkeys.key{n} needs both name and command; ignored"),
        }
    }

    let mouse_keys = [(HotkeySlot::B1, &mouse.key1), (HotkeySlot::B2, &mouse.key2)];
    for (n, (slot, entry)) in (1u8..).zip(mouse_keys) {
        let Some(entry) = entry else {
            continue;
        };
        match &entry.command {
            Some(command) => table.insert(slot, unnamed(command)),
            None => warn!("mouse.hotkeys.key{n} has no command; ignored"),
        }
    }

    for gesture in Gesture::ALL {
        if let Some(command) = gestures.command(gesture) {
            table.insert(gesture.slot(), unnamed(command));
        }
    }
    table
}

fn unnamed(command: &str) -> HotKey {
    HotKey {
        name: String::new(),
        command: command.to_string(),
    }
}

/// The machine's hostname, or `localhost` when it cannot be determined.
pub fn machine_hostname() -> String {
    std::env::var("HOSTNAME")
        .ok()
        .or_else(|| std::fs::read_to_string("/proc/sys/kernel/hostname").ok())
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| "localhost".to_string())
}

// ── Config repository ─────────────────────────────────────────────────────────

/// Resolves the default config file path.
///
/// # Errors
///
/// Returns [`ConfigError::NoPlatformConfigDir`] if the base directory cannot be
/// determined.
pub fn config_file_path() -> Result<PathBuf, ConfigError> {
    platform_config_dir()
        .map(|dir| dir.join("config.toml"))
        .ok_or(ConfigError::NoPlatformConfigDir)
}

/// Parses configuration text.
///
/// # Errors
///
/// Returns [`ConfigError::Parse`] if the TOML is malformed or a value has
/// the wrong type.
pub fn parse_config(content: &str) -> Result<FileConfig, ConfigError> {
    Ok(toml::from_str(content)?)
}

/// Loads the configuration file.
///
/// With an explicit `path` the file must exist.  Without one, the default
/// location is tried and a missing file yields the defaults.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system errors, and
/// [`ConfigError::Parse`] if the TOML is malformed.
pub fn load_config(path: Option<&Path>) -> Result<FileConfig, ConfigError> {
    let (path, required) = match path {
        Some(path) => (path.to_path_buf(), true),
        None => (config_file_path()?, false),
    };

    match std::fs::read_to_string(&path) {
        Ok(content) => parse_config(&content),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound && !required => {
            Ok(FileConfig::default())
        }
        Err(source) => Err(ConfigError::Io { path, source }),
    }
}

/// Resolves the platform config directory for `mmserver`.
fn platform_config_dir() -> Option<PathBuf> {
    #[cfg(target_os = "macos")]
    {
        std::env::var_os("HOME").map(|h| {
            PathBuf::from(h)
                .join("Library")
                .join("Application Support")
                .join("mmserver")
        })
    }

    #[cfg(not(target_os = "macos"))]
    {
        // XDG_CONFIG_HOME or ~/.config
        let base = std::env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".config")))?;
        Some(base.join("mmserver"))
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    // ── Defaults ──────────────────────────────────────────────────────────────

    #[test]
    fn test_empty_file_gives_defaults() {
        // Arrange / Act
        let cfg = parse_config("").unwrap();

        // Assert
        assert_eq!(cfg, FileConfig::default());
        assert_eq!(cfg.server.port, 9099);
        assert!(cfg.server.zeroconf);
        assert_eq!(cfg.keyboard.layout, "iso-8859-1");
        assert_eq!(cfg.input.backend, BackendKind::X11);
    }

    #[test]
    fn test_partial_section_keeps_other_defaults() {
        let cfg = parse_config("[mouse]\nscroll_max = 5\n").unwrap();

        assert_eq!(cfg.mouse.scroll_max, 5);
        assert!(cfg.mouse.accelerate);
        assert_eq!(cfg.mouse.acceleration_factor, 4);
    }

    // ── Schema ────────────────────────────────────────────────────────────────

    #[test]
    fn test_device_id_accepts_string_or_array() {
        let one = parse_config("[device]\nid = \"ABC\"\n").unwrap();
        let many = parse_config("[device]\nid = [\"A\", \"B\"]\n").unwrap();

        assert_eq!(one.device.id, DeviceIds::One("ABC".into()));
        assert_eq!(many.device.id, DeviceIds::Many(vec!["A".into(), "B".into()]));
    }

    #[test]
    fn test_platform_must_be_mac_or_win() {
        assert_eq!(
            parse_config("[server]\nplatform = \"WIN\"\n").unwrap().server.platform,
            Platform::Win
        );
        assert!(matches!(
            parse_config("[server]\nplatform = \"LINUX\"\n"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_backend_names_are_kebab_case() {
        let cfg = parse_config("[input]\nbackend = \"dry-run\"\ndisplay = \":1\"\n").unwrap();
        assert_eq!(cfg.input.backend, BackendKind::DryRun);
        assert_eq!(cfg.input.display.as_deref(), Some(":1"));
    }

    #[test]
    fn test_malformed_toml_is_parse_error() {
        assert!(matches!(parse_config("[server"), Err(ConfigError::Parse(_))));
    }

    // ── Conversion ────────────────────────────────────────────────────────────

    #[test]
    fn test_hotkeys_land_in_their_slots() {
        // Arrange
        let text = r#"
            [keyboard.hotkeys.key2]
            name = "Files"
            command = "nautilus"

            [mouse.hotkeys.key1]
            command = "SYNC_CLIPBOARD"

            [gestures]
            fourfingerswipedown = "xdotool key super"
        "#;

        // Act
        let config = parse_config(text).unwrap().into_configuration();

        // Assert
        let hotkeys = &config.hotkeys;
        assert_eq!(hotkeys.len(), 3);
        assert_eq!(hotkeys.name(HotkeySlot::new(2).unwrap()), "Files");
        assert_eq!(hotkeys.command(HotkeySlot::new(2).unwrap()), Some("nautilus"));
        assert_eq!(hotkeys.command(HotkeySlot::B1), Some("SYNC_CLIPBOARD"));
        assert_eq!(
            hotkeys.command(Gesture::FourFingerSwipeDown.slot()),
            Some("xdotool key super")
        );
    }

    #[test]
    fn test_scroll_max_below_one_is_clamped() {
        let config = parse_config("[mouse]\nscroll_max = -3\n")
            .unwrap()
            .into_configuration();
        assert_eq!(config.scroll_max, 1);
    }

    #[test]
    fn test_explicit_hostname_wins_over_machine_name() {
        let config = parse_config("[server]\nhostname = \"desk\"\n")
            .unwrap()
            .into_configuration();
        assert_eq!(config.hostname, "desk");
    }

    #[test]
    fn test_idle_timeout_is_converted_to_duration() {
        let config = parse_config("[server]\nidle_timeout_secs = 30\n")
            .unwrap()
            .into_configuration();
        assert_eq!(config.idle_timeout, Some(Duration::from_secs(30)));
        assert_eq!(FileConfig::default().into_configuration().idle_timeout, None);
    }

    #[test]
    fn test_device_allow_list_is_built_from_single_id() {
        let config = parse_config("[device]\nid = \"ABC\"\npassword = \"pw\"\n")
            .unwrap()
            .into_configuration();
        assert!(config.is_device_allowed("ABC"));
        assert!(!config.is_device_allowed("XYZ"));
        assert!(config.password_matches("pw"));
    }

    #[test]
    fn test_shipped_example_config_parses_to_defaults_plus_hotkeys() {
        // Arrange
        let text = include_str!("../../../mmserver.example.toml");

        // Act
        let cfg = parse_config(text).unwrap();

        // Assert – the documented values are the real defaults
        assert_eq!(cfg.server, ServerSection::default());
        assert_eq!(cfg.device, DeviceSection::default());
        assert_eq!(cfg.input, InputSection::default());
        assert_eq!(cfg.mouse.scroll_max, default_scroll_max());
        assert_eq!(cfg.mouse.acceleration_speed, default_acceleration_speed());
        assert_eq!(cfg.keyboard.layout, default_keyboard_layout());

        let config = cfg.into_configuration();
        assert_eq!(config.hotkeys.len(), 5);
        assert_eq!(config.hotkeys.command(HotkeySlot::B2), Some("xdg-open ~"));
        assert_eq!(config.hotkeys.name(HotkeySlot::new(2).unwrap()), "Clipboard");
    }

    #[test]
    fn test_incomplete_hotkey_entry_is_skipped_and_rest_of_file_applies() {
        // Arrange
        let text = "[keyboard.hotkeys.key1]\ncommand = \"xterm\"\n\
                    [keyboard.hotkeys.key2]\nname = \"Files\"\ncommand = \"nautilus\"\n\
                    [mouse.hotkeys.key1]\n\
                    [mouse]\nscroll_max = 3\n";

        // Act
        let config = parse_config(text).unwrap().into_configuration();

        // Assert
        assert_eq!(config.scroll_max, 3);
        assert_eq!(config.hotkeys.len(), 1);
        assert!(config.hotkeys.get(HotkeySlot::new(1).unwrap()).is_none());
        assert!(config.hotkeys.get(HotkeySlot::B1).is_none());
        assert_eq!(config.hotkeys.command(HotkeySlot::new(2).unwrap()), Some("nautilus"));
    }

    // ── Loading ───────────────────────────────────────────────────────────────

    #[test]
    fn test_explicit_missing_file_is_an_error() {
        let result = load_config(Some(Path::new("/nonexistent/mmserver.toml")));
        assert!(matches!(result, Err(ConfigError::Io { .. })));
    }

    #[test]
    fn test_machine_hostname_is_never_empty() {
        assert!(!machine_hostname().is_empty());
    }
}
