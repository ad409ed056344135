//! The per-connection session state machine.
//!
//! ```text
//! AWAITING_HELLO ──CONNECT──▶ AUTHENTICATING ──ok──▶ ACTIVE ──EOF / I/O error──▶ TERMINATED
//!       │                           │
//!       └─anything else─▶ TERMINATED └─not allowed / bad password─▶ CONNECTED NO ─▶ TERMINATED
//! ```
//!
//! # Handshake
//!
//! The first packet must be a `CONNECT` hello.  The device id is checked
//! against the allow-list, then the password.  A rejected client gets a
//! `CONNECTED NO` response with the reason, and the session waits briefly
//! for the client to hang up before closing.  An accepted client gets
//! `CONNECTED YES` followed by the `HOTKEYS` names (except Android clients,
//! which fail to connect when they receive it).
//!
//! # Active state
//!
//! Each framed packet is parsed and dispatched in arrival order.  The
//! session carries a window mode (which changes what `PROGRAMKEY` means), a
//! presentation status and the acceleration tracker.
//!
//! # Errors
//!
//! Socket failures end the session.  Everything local to one message (an
//! unmapped key, an unencodable character, an unknown message kind) is
//! logged and the message is dropped.

use std::sync::Arc;
use std::time::{Duration, Instant};

use mm_core::keymap::{named_key, push_modifiers, Charset, ConversionError, Keysym};
use mm_core::protocol::dump::hex_dump;
use mm_core::protocol::messages::{
    ButtonState, ClientMessage, ConnectMessage, HotkeyButton, KeyPayload, Modifier, MouseButton,
    ServerMessage, ANDROID_DEVICE_ID, REASON_DEVICE_NOT_ALLOWED, REASON_INCORRECT_PASSWORD,
};
use mm_core::domain::session_state::{program_key, ProgramKeyAction};
use mm_core::protocol::{encode_response, parse_hello, parse_message, FramingError, PacketFramer};
use mm_core::{Configuration, HotkeySlot, PresentationStatus, WindowMode};
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::time::timeout;
use tracing::{debug, info, warn};

use super::dispatch_hotkey::{HotkeyAction, HotkeyDispatcher};
use super::inject_input::{EmulationError, SessionDevices};
use super::pointer_policy::{clamp_scroll, PointerAccelerator};

/// How long a rejected client is given to close the connection itself.
pub const REJECT_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Upper bound on chords sent for a single `ZOOM` message.
pub const MAX_ZOOM_STEPS: u32 = 64;

const READ_BUFFER_SIZE: usize = 1024;

const NO_KEYS: &[Keysym] = &[];

/// Errors that end a session abnormally.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("socket error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Framing(#[from] FramingError),

    #[error("no data received for {0:?}")]
    IdleTimeout(Duration),
}

/// How a session ended without a socket error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    /// The client closed the connection.
    ClientClosed,
    /// The first packet was not a `CONNECT` hello.
    InvalidHello,
    DeviceNotAllowed,
    IncorrectPassword,
}

/// Session-local state once the handshake has succeeded.
#[derive(Debug)]
struct ActiveState {
    mode: WindowMode,
    presentation: PresentationStatus,
    accelerator: PointerAccelerator,
}

/// One client connection.
pub struct Session<S> {
    stream: S,
    peer: String,
    config: Arc<Configuration>,
    devices: SessionDevices,
    dispatcher: Arc<HotkeyDispatcher>,
    framer: PacketFramer,
    charset: Option<Charset>,
    state: ActiveState,
}

impl<S> Session<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    pub fn new(
        stream: S,
        peer: impl Into<String>,
        config: Arc<Configuration>,
        devices: SessionDevices,
        dispatcher: Arc<HotkeyDispatcher>,
    ) -> Self {
        let peer = peer.into();
        let charset = match Charset::from_label(&config.keyboard_layout) {
            Ok(charset) => Some(charset),
            Err(e) => {
                warn!("[{peer}] {e}; raw UTF-8 keys will be dropped");
                None
            }
        };
        Self {
            stream,
            framer: PacketFramer::new(config.max_packet_size),
            state: ActiveState {
                mode: WindowMode::Other,
                presentation: PresentationStatus::Stopped,
                accelerator: PointerAccelerator::from_config(&config),
            },
            peer,
            config,
            devices,
            dispatcher,
            charset,
        }
    }

    /// Runs the session to completion.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError`] when the socket fails, the client exceeds
    /// the packet size limit, or the idle timeout expires.
    pub async fn run(mut self) -> Result<SessionEnd, SessionError> {
        info!("[{}] connected", self.peer);

        let Some(packet) = self.next_packet().await? else {
            info!("[{}] disconnected before hello", self.peer);
            return Ok(SessionEnd::ClientClosed);
        };
        let Some(hello) = parse_hello(&packet) else {
            info!("[{}] disconnected (invalid protocol)", self.peer);
            self.dump("invalid hello", &packet);
            return Ok(SessionEnd::InvalidHello);
        };

        if let Some(end) = self.authenticate(&hello).await? {
            return Ok(end);
        }

        while let Some(packet) = self.next_packet().await? {
            self.handle_packet(&packet).await?;
        }
        info!("[{}] disconnected", self.peer);
        Ok(SessionEnd::ClientClosed)
    }

    // ── Handshake ─────────────────────────────────────────────────────────────

    /// Checks the hello and sends the handshake response.  Returns the end
    /// reason when the client is rejected.
    async fn authenticate(
        &mut self,
        hello: &ConnectMessage,
    ) -> Result<Option<SessionEnd>, SessionError> {
        if self.config.debug {
            debug!("[{}] device id: {}", self.peer, hello.device_id);
            debug!("[{}] device name: {}", self.peer, hello.device_name);
        }

        if !self.config.is_device_allowed(&hello.device_id) {
            info!("[{}] device not allowed: {}", self.peer, hello.device_id);
            self.reject(REASON_DEVICE_NOT_ALLOWED).await?;
            return Ok(Some(SessionEnd::DeviceNotAllowed));
        }
        if !self.config.password_matches(&hello.password) {
            info!("[{}] incorrect password", self.peer);
            self.reject(REASON_INCORRECT_PASSWORD).await?;
            return Ok(Some(SessionEnd::IncorrectPassword));
        }

        let welcome = ServerMessage::welcome(self.config.platform, &self.config.hostname);
        self.send(&welcome).await?;

        if hello.device_id != ANDROID_DEVICE_ID {
            let names = self.config.hotkeys.announced_names();
            self.send(&ServerMessage::Hotkeys { names }).await?;
        }

        info!(
            "[{}] authenticated {} ({})",
            self.peer, hello.device_name, hello.device_id
        );
        Ok(None)
    }

    /// Sends a `CONNECTED NO` and waits (bounded) for the client to close.
    async fn reject(&mut self, reason: &str) -> Result<(), SessionError> {
        let response =
            ServerMessage::rejection(self.config.platform, &self.config.hostname, reason);
        self.send(&response).await?;

        let mut buf = [0u8; READ_BUFFER_SIZE];
        let _ = timeout(REJECT_DRAIN_TIMEOUT, self.stream.read(&mut buf)).await;
        Ok(())
    }

    // ── Dispatch ──────────────────────────────────────────────────────────────

    async fn handle_packet(&mut self, packet: &[u8]) -> Result<(), SessionError> {
        let message = parse_message(packet);
        let kind = message.kind().to_string();

        let outcome = match message {
            ClientMessage::SetOption { name, value } => {
                self.handle_option(&name, &value);
                Ok(())
            }
            ClientMessage::Click {
                button,
                state,
                modifiers,
            } => self.handle_click(button, state, &modifiers),
            ClientMessage::Move { dx, dy, .. } => self.handle_move(dx, dy),
            ClientMessage::Scroll { dx, dy, .. } => self.handle_scroll(dx, dy),
            ClientMessage::Zoom { steps } => self.handle_zoom(steps),
            ClientMessage::Key { key, modifiers } => self.handle_key(&key, &modifiers),
            ClientMessage::KeyString { text } => self.handle_key_string(&text),
            ClientMessage::Gesture(gesture) => {
                self.trigger_hotkey(gesture.slot()).await?;
                Ok(())
            }
            ClientMessage::Hotkey(button) => {
                let slot = match button {
                    HotkeyButton::Key(n) => HotkeySlot::new(n),
                    HotkeyButton::B1 => Some(HotkeySlot::B1),
                    HotkeyButton::B2 => Some(HotkeySlot::B2),
                };
                if let Some(slot) = slot {
                    self.trigger_hotkey(slot).await?;
                }
                Ok(())
            }
            ClientMessage::SwitchMode(mode) => {
                self.switch_mode(mode).await?;
                Ok(())
            }
            ClientMessage::ProgramKey { name } => self.handle_program_key(&name),
            ClientMessage::OpenLink { url } => {
                info!("[{}] open link: {url}", self.peer);
                Ok(())
            }
            ClientMessage::Connect(_) | ClientMessage::Unhandled { .. } => {
                info!("[{}] unhandled packet: {kind}", self.peer);
                self.dump("unhandled packet", packet);
                Ok(())
            }
        };

        if let Err(e) = outcome {
            warn!("[{}] {kind} dropped: {e}", self.peer);
        }
        Ok(())
    }

    fn handle_option(&self, name: &str, value: &str) {
        match name {
            "CLIPBOARDSYNC" => info!("[{}] clipboard sync: {value}", self.peer),
            "PRESENTATION" => info!("[{}] presentation mode: {value}", self.peer),
            _ => warn!("[{}] unknown option: {name}", self.peer),
        }
    }

    fn handle_click(
        &mut self,
        button: MouseButton,
        state: ButtonState,
        modifiers: &[Modifier],
    ) -> Result<(), EmulationError> {
        let mut mod_keys = Vec::new();
        push_modifiers(&mut mod_keys, modifiers);

        if state == ButtonState::Down {
            self.press_keys(&mod_keys)?;
        }
        self.devices.pointer.click(button, state)?;
        if state == ButtonState::Up {
            self.release_keys(&mod_keys)?;
        }
        Ok(())
    }

    fn handle_move(&mut self, dx: i32, dy: i32) -> Result<(), EmulationError> {
        let (dx, dy) = self.state.accelerator.apply(dx, dy, Instant::now());
        self.devices.pointer.move_by(dx, dy)
    }

    fn handle_scroll(&mut self, dx: i32, dy: i32) -> Result<(), EmulationError> {
        let (dx, dy) = clamp_scroll(
            dx,
            dy,
            self.config.horizontal_scrolling,
            self.config.scroll_max,
        );
        self.devices.pointer.scroll(dx, dy)
    }

    fn handle_zoom(&mut self, steps: i32) -> Result<(), EmulationError> {
        let key = if steps < 0 { Keysym::MINUS } else { Keysym::PLUS };
        let count = steps.unsigned_abs();
        if count > MAX_ZOOM_STEPS {
            debug!("[{}] zoom of {count} steps capped at {MAX_ZOOM_STEPS}", self.peer);
        }
        for _ in 0..count.min(MAX_ZOOM_STEPS) {
            self.send_keys(&[Keysym::CONTROL_L, key])?;
        }
        Ok(())
    }

    fn handle_key(&mut self, key: &KeyPayload, modifiers: &[Modifier]) -> Result<(), EmulationError> {
        let (prefix, target, infer_shift): (&[Keysym], Keysym, bool) = match key {
            KeyPayload::Named(name) => match named_key(name).and_then(|keys| keys.split_last()) {
                Some((target, prefix)) => (prefix, *target, false),
                None => match name.chars().next() {
                    Some(ch) => (NO_KEYS, Keysym::from_char(ch), self.config.infer_shift),
                    None => return Ok(()),
                },
            },
            KeyPayload::RawUtf8(text) => match self.transcode(text) {
                Ok(byte) => (NO_KEYS, Keysym(u32::from(byte)), self.config.infer_shift),
                Err(e) => {
                    warn!("[{}] KEY dropped: {e}", self.peer);
                    return Ok(());
                }
            },
            KeyPayload::Literal { text, .. } => match text.chars().next() {
                Some(ch) => (NO_KEYS, Keysym::from_char(ch), self.config.infer_shift),
                None => return Ok(()),
            },
        };
        if target.0 == 0 {
            return Ok(());
        }

        let mut keys = prefix.to_vec();
        if infer_shift && self.devices.keyboard.is_shift_variant(target) {
            keys.push(Keysym::SHIFT_L);
        }
        push_modifiers(&mut keys, modifiers);
        keys.push(target);
        self.send_keys(&keys)
    }

    fn transcode(&self, text: &str) -> Result<u8, ConversionError> {
        let charset = self.charset.ok_or_else(|| {
            ConversionError::UnsupportedLayout(self.config.keyboard_layout.clone())
        })?;
        charset.transcode_single(text)
    }

    fn handle_key_string(&mut self, text: &str) -> Result<(), EmulationError> {
        for ch in text.chars() {
            let key = Keysym::from_char(ch);
            if self.config.keyboard_enabled && self.devices.keyboard.is_shift_variant(key) {
                self.send_keys(&[Keysym::SHIFT_L, key])?;
            } else {
                self.send_keys(&[key])?;
            }
        }
        Ok(())
    }

    fn handle_program_key(&mut self, name: &str) -> Result<(), EmulationError> {
        match program_key(self.state.mode, name) {
            Some(ProgramKeyAction::Keys(keys)) => self.send_keys(keys),
            Some(ProgramKeyAction::TogglePresentation) => {
                let (status, key) = self.state.presentation.toggle();
                self.state.presentation = status;
                self.send_keys(&[key])
            }
            None => {
                debug!(
                    "[{}] program key {name} ignored in {:?} mode",
                    self.peer, self.state.mode
                );
                Ok(())
            }
        }
    }

    async fn switch_mode(&mut self, mode: WindowMode) -> Result<(), SessionError> {
        self.state.mode = mode;
        match mode {
            WindowMode::Media => self.send(&ServerMessage::MediaCustomKeys).await?,
            WindowMode::Presentation => self.state.presentation = PresentationStatus::Stopped,
            WindowMode::Web | WindowMode::Other => {}
        }
        Ok(())
    }

    async fn trigger_hotkey(&mut self, slot: HotkeySlot) -> Result<(), SessionError> {
        match self.dispatcher.dispatch(&self.config.hotkeys, slot) {
            HotkeyAction::SyncClipboard => {
                self.devices.clipboard.refresh();
                let text = self.devices.clipboard.current_text().to_string();
                debug!("[{}] clipboard update of {} bytes", self.peer, text.len());
                self.send(&ServerMessage::ClipboardUpdate { text }).await?;
            }
            HotkeyAction::MiddleClick => {
                let pointer = &mut self.devices.pointer;
                let clicked = pointer
                    .click(MouseButton::Middle, ButtonState::Down)
                    .and_then(|()| pointer.click(MouseButton::Middle, ButtonState::Up));
                if let Err(e) = clicked {
                    warn!("[{}] middle click failed: {e}", self.peer);
                }
            }
            HotkeyAction::RanCommand(_) | HotkeyAction::Nothing => {}
        }
        Ok(())
    }

    // ── Keyboard helpers ──────────────────────────────────────────────────────

    fn send_keys(&mut self, keys: &[Keysym]) -> Result<(), EmulationError> {
        if !self.config.keyboard_enabled || keys.is_empty() {
            return Ok(());
        }
        self.devices.keyboard.send(keys)
    }

    /// Click modifiers go through even with the keyboard disabled.
    fn press_keys(&mut self, keys: &[Keysym]) -> Result<(), EmulationError> {
        keys.iter()
            .try_for_each(|&key| self.devices.keyboard.press(key))
    }

    fn release_keys(&mut self, keys: &[Keysym]) -> Result<(), EmulationError> {
        keys.iter()
            .rev()
            .try_for_each(|&key| self.devices.keyboard.release(key))
    }

    // ── Socket I/O ────────────────────────────────────────────────────────────

    /// Returns the next complete packet, reading from the socket only when
    /// nothing is buffered.  `None` means the client closed the connection.
    async fn next_packet(&mut self) -> Result<Option<Vec<u8>>, SessionError> {
        let mut buf = [0u8; READ_BUFFER_SIZE];
        loop {
            if let Some(packet) = self.framer.next_packet() {
                return Ok(Some(packet));
            }
            let n = match self.config.idle_timeout {
                Some(limit) => timeout(limit, self.stream.read(&mut buf))
                    .await
                    .map_err(|_| SessionError::IdleTimeout(limit))??,
                None => self.stream.read(&mut buf).await?,
            };
            if n == 0 {
                if self.framer.pending_len() > 0 {
                    debug!(
                        "[{}] {} unterminated bytes discarded",
                        self.peer,
                        self.framer.pending_len()
                    );
                }
                return Ok(None);
            }
            self.framer.push(&buf[..n])?;
        }
    }

    async fn send(&mut self, message: &ServerMessage) -> Result<(), SessionError> {
        let bytes = encode_response(message);
        self.stream.write_all(&bytes).await?;
        self.stream.flush().await?;
        Ok(())
    }

    fn dump(&self, what: &str, packet: &[u8]) {
        if self.config.debug {
            debug!("[{}] {what}:\n{}", self.peer, hex_dump(packet));
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
