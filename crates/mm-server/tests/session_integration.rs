//! Integration tests for the session state machine.
//!
//! Each test runs a real [`Session`] over an in-memory duplex pipe, plays the
//! phone's side of the conversation, then closes the pipe and asserts on the
//! responses received and the input recorded by the [`MockBackend`].

use std::sync::{Arc, Mutex};
use std::time::Duration;

use mm_core::{Configuration, Gesture, HotKey, HotkeySlot, Keysym};
use mm_core::protocol::messages::{ButtonState, MouseButton};
use mm_server::application::dispatch_hotkey::{CommandError, CommandRunner, HotkeyDispatcher};
use mm_server::application::inject_input::InputBackend;
use mm_server::application::session::{Session, SessionEnd, SessionError};
use mm_server::infrastructure::input_emulation::mock::{InjectedEvent, MockBackend};
use tokio::io::{
    split, AsyncBufReadExt, AsyncWriteExt, BufReader, DuplexStream, ReadHalf, WriteHalf,
};
use tokio::task::JoinHandle;

// ── Harness ───────────────────────────────────────────────────────────────────

const HELLO: &[u8] = b"CONNECT\x1e\x1eDEV\x1ePhone\x1e\x04";
const WELCOME: &[u8] =
    b"CONNECTED\x1eYES\x1eMAC\x1etest\x1eWelcome\x1e00:00:00:00:00:00\x1e4\x04";
const EMPTY_HOTKEYS: &[u8] = b"HOTKEYS\x1e\x1e\x1e\x1e\x04";

/// Records launched commands instead of running them.
#[derive(Default)]
struct RecordingRunner {
    commands: Mutex<Vec<String>>,
}

impl CommandRunner for RecordingRunner {
    fn run(&self, command: &str) -> Result<(), CommandError> {
        self.commands.lock().unwrap().push(command.to_string());
        Ok(())
    }
}

struct Phone {
    reader: BufReader<ReadHalf<DuplexStream>>,
    writer: WriteHalf<DuplexStream>,
    session: JoinHandle<Result<SessionEnd, SessionError>>,
}

impl Phone {
    async fn send(&mut self, bytes: &[u8]) {
        self.writer.write_all(bytes).await.unwrap();
        self.writer.flush().await.unwrap();
    }

    /// Reads one response, terminator included.
    async fn response(&mut self) -> Vec<u8> {
        let mut buf = Vec::new();
        tokio::time::timeout(Duration::from_secs(5), self.reader.read_until(0x04, &mut buf))
            .await
            .expect("response within 5 s")
            .unwrap();
        buf
    }

    /// Closes the phone's side and waits for the session to finish.
    async fn hang_up(mut self) -> Result<SessionEnd, SessionError> {
        self.writer.shutdown().await.unwrap();
        tokio::time::timeout(Duration::from_secs(5), self.session)
            .await
            .expect("session ends within 5 s")
            .unwrap()
    }
}

fn config() -> Configuration {
    Configuration {
        hostname: "test".into(),
        ..Configuration::default()
    }
}

fn start(config: Configuration, backend: &MockBackend, runner: Arc<RecordingRunner>) -> Phone {
    let (phone_side, server_side) = tokio::io::duplex(4096);
    let session = Session::new(
        server_side,
        "test-peer",
        Arc::new(config),
        backend.open_session().unwrap(),
        Arc::new(HotkeyDispatcher::new(runner)),
    );
    let (reader, writer) = split(phone_side);
    Phone {
        reader: BufReader::new(reader),
        writer,
        session: tokio::spawn(session.run()),
    }
}

/// Starts a session and completes the default handshake.
async fn connected(config: Configuration, backend: &MockBackend) -> Phone {
    let mut phone = start(config, backend, Arc::default());
    phone.send(HELLO).await;
    assert_eq!(phone.response().await, WELCOME);
    assert_eq!(phone.response().await, EMPTY_HOTKEYS);
    phone
}

/// Sends `packets` after a handshake and returns what was injected.
async fn inject(config: Configuration, packets: &[u8]) -> Vec<InjectedEvent> {
    let backend = MockBackend::new();
    let mut phone = connected(config, &backend).await;
    phone.send(packets).await;
    assert_eq!(phone.hang_up().await.unwrap(), SessionEnd::ClientClosed);
    backend.events()
}

fn keys(keys: &[Keysym]) -> InjectedEvent {
    InjectedEvent::Keys(keys.to_vec())
}

fn ch(c: char) -> Keysym {
    Keysym::from_char(c)
}

// ── Handshake ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_device_not_in_allow_list_is_rejected() {
    // Arrange
    let mut cfg = config();
    cfg.device_ids.insert("ABC".into());
    let backend = MockBackend::new();
    let mut phone = start(cfg, &backend, Arc::default());

    // Act
    phone.send(b"CONNECT\x1e\x1eXYZ\x1ePhone\x1e\x04").await;
    let response = phone.response().await;
    phone.send(b"MOVE\x1e5\x1e5\x1e0\x1e\x04").await;
    let end = phone.hang_up().await.unwrap();

    // Assert
    assert_eq!(
        response,
        b"CONNECTED\x1eNO\x1eMAC\x1etest\x1eDevice is not allowed\x1e00:00:00:00:00:00\x1e4\x04"
    );
    assert_eq!(end, SessionEnd::DeviceNotAllowed);
    assert!(backend.events().is_empty());
}

#[tokio::test]
async fn test_wrong_password_is_rejected() {
    let mut cfg = config();
    cfg.password = "secret".into();
    let backend = MockBackend::new();
    let mut phone = start(cfg, &backend, Arc::default());

    phone.send(b"CONNECT\x1ewrong\x1eDEV\x1ePhone\x1e\x04").await;
    let response = phone.response().await;

    assert_eq!(
        response,
        b"CONNECTED\x1eNO\x1eMAC\x1etest\x1eIncorrect password\x1e00:00:00:00:00:00\x1e4\x04"
    );
    assert_eq!(phone.hang_up().await.unwrap(), SessionEnd::IncorrectPassword);
}

#[tokio::test]
async fn test_matching_password_and_allowed_device_are_welcomed() {
    let mut cfg = config();
    cfg.password = "secret".into();
    cfg.device_ids.insert("ABC".into());
    let backend = MockBackend::new();
    let mut phone = start(cfg, &backend, Arc::default());

    phone.send(b"CONNECT\x1esecret\x1eABC\x1ePhone\x1e2\x1e\x04").await;

    assert_eq!(phone.response().await, WELCOME);
    assert_eq!(phone.response().await, EMPTY_HOTKEYS);
    assert_eq!(phone.hang_up().await.unwrap(), SessionEnd::ClientClosed);
}

#[tokio::test]
async fn test_identical_hello_gets_identical_bytes_on_new_connection() {
    let mut responses = Vec::new();
    for _ in 0..2 {
        let backend = MockBackend::new();
        let mut phone = start(config(), &backend, Arc::default());
        phone.send(HELLO).await;
        responses.push((phone.response().await, phone.response().await));
        phone.hang_up().await.unwrap();
    }
    assert_eq!(responses[0], responses[1]);
}

#[tokio::test]
async fn test_hotkey_names_are_announced() {
    let mut cfg = config();
    cfg.hotkeys.insert(
        HotkeySlot::new(1).unwrap(),
        HotKey {
            name: "Term".into(),
            command: "xterm".into(),
        },
    );
    cfg.hotkeys.insert(
        HotkeySlot::new(4).unwrap(),
        HotKey {
            name: "Files".into(),
            command: "nautilus".into(),
        },
    );
    let backend = MockBackend::new();
    let mut phone = start(cfg, &backend, Arc::default());

    phone.send(HELLO).await;

    assert_eq!(phone.response().await, WELCOME);
    assert_eq!(phone.response().await, b"HOTKEYS\x1eTerm\x1e\x1e\x1eFiles\x04");
    phone.hang_up().await.unwrap();
}

#[tokio::test]
async fn test_android_client_gets_no_hotkeys_announcement() {
    let backend = MockBackend::new();
    let mut phone = start(config(), &backend, Arc::default());

    phone.send(b"CONNECT\x1e\x1eAndroid\x1ePixel\x1e\x04").await;
    assert_eq!(phone.response().await, WELCOME);

    // The next response must be the reply to SWITCHMODE, not HOTKEYS.
    phone.send(b"SWITCHMODE\x1eMEDIA\x1e\x04").await;
    assert!(phone.response().await.starts_with(b"MEDIACUSTOMKEYS\x1e"));
    phone.hang_up().await.unwrap();
}

#[tokio::test]
async fn test_non_connect_first_packet_ends_session() {
    let backend = MockBackend::new();
    let mut phone = start(config(), &backend, Arc::default());

    phone.send(b"MOVE\x1e1\x1e1\x1e0\x1e\x04").await;

    assert_eq!(phone.hang_up().await.unwrap(), SessionEnd::InvalidHello);
    assert!(backend.events().is_empty());
}

#[tokio::test]
async fn test_hello_split_across_writes_is_reassembled() {
    let backend = MockBackend::new();
    let mut phone = start(config(), &backend, Arc::default());

    for byte in HELLO {
        phone.send(std::slice::from_ref(byte)).await;
    }

    assert_eq!(phone.response().await, WELCOME);
    phone.hang_up().await.unwrap();
}

// ── Pointer ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_first_move_is_not_accelerated() {
    // Arrange – a zero threshold would accelerate any later move
    let mut cfg = config();
    cfg.acceleration_speed = 0.0;

    // Act
    let events = inject(cfg, b"MOVE\x1e10\x1e0\x1e1\x1e\x04").await;

    // Assert
    assert_eq!(events, vec![InjectedEvent::Move(10, 0)]);
}

#[tokio::test]
async fn test_scroll_is_clamped_with_sign_preserved() {
    let mut cfg = config();
    cfg.scroll_max = 5;
    cfg.horizontal_scrolling = true;

    let events = inject(cfg, b"SCROLL\x1e20\x1e-20\x1e\x1e\x04").await;

    assert_eq!(events, vec![InjectedEvent::Scroll(5, -5)]);
}

#[tokio::test]
async fn test_horizontal_scroll_is_dropped_when_disabled() {
    let mut cfg = config();
    cfg.scroll_max = 5;

    let events = inject(cfg, b"SCROLL\x1e20\x1e-20\x1e\x1e\x04").await;

    assert_eq!(events, vec![InjectedEvent::Scroll(0, -5)]);
}

#[tokio::test]
async fn test_click_presses_modifiers_around_button() {
    let events = inject(
        config(),
        b"CLICK\x1eL\x1eD\x1eCTRL\x1e\x04CLICK\x1eL\x1eU\x1eCTRL\x1e\x04",
    )
    .await;

    assert_eq!(
        events,
        vec![
            InjectedEvent::KeyDown(Keysym::CONTROL_L),
            InjectedEvent::Click(MouseButton::Left, ButtonState::Down),
            InjectedEvent::Click(MouseButton::Left, ButtonState::Up),
            InjectedEvent::KeyUp(Keysym::CONTROL_L),
        ]
    );
}

#[tokio::test]
async fn test_zoom_out_sends_one_chord_per_step() {
    let events = inject(config(), b"ZOOM\x1e-3\x1e\x04").await;

    assert_eq!(events, vec![keys(&[Keysym::CONTROL_L, Keysym::MINUS]); 3]);
}

#[tokio::test]
async fn test_zoom_in_uses_plus() {
    let events = inject(config(), b"ZOOM\x1e2\x1e\x04").await;

    assert_eq!(events, vec![keys(&[Keysym::CONTROL_L, Keysym::PLUS]); 2]);
}

#[tokio::test]
async fn test_zoom_is_capped_at_64_chords() {
    let events = inject(config(), b"ZOOM\x1e-100\x1e\x04").await;

    assert_eq!(events, vec![keys(&[Keysym::CONTROL_L, Keysym::MINUS]); 64]);
}

// ── Keyboard ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_named_numpad_key_gets_shift_then_modifiers() {
    let events = inject(config(), b"KEY\x1e-1\x1eNUM5\x1eCTRL\x1e\x04").await;

    assert_eq!(
        events,
        vec![keys(&[Keysym::SHIFT_L, Keysym::CONTROL_L, Keysym::KP_5])]
    );
}

#[tokio::test]
async fn test_literal_shift_variant_is_prefixed_with_shift() {
    let events = inject(config(), b"KEY\x1e33\x1e!\x1e\x1e\x04").await;

    assert_eq!(events, vec![keys(&[Keysym::SHIFT_L, ch('!')])]);
}

#[tokio::test]
async fn test_shift_inference_can_be_disabled() {
    let mut cfg = config();
    cfg.infer_shift = false;

    let events = inject(cfg, b"KEY\x1e33\x1e!\x1e\x1e\x04").await;

    assert_eq!(events, vec![keys(&[ch('!')])]);
}

#[tokio::test]
async fn test_raw_utf8_key_is_transcoded_to_layout() {
    let events = inject(config(), "KEY\x1e-61\x1eé\x1e\x1e\x04".as_bytes()).await;

    assert_eq!(events, vec![keys(&[Keysym(0xE9)])]);
}

#[tokio::test]
async fn test_unencodable_raw_key_is_dropped_and_session_continues() {
    // The euro sign has no Latin-1 encoding.
    let events = inject(
        config(),
        "KEY\x1e-61\x1e€\x1e\x1e\x04MOVE\x1e1\x1e1\x1e0\x1e\x04".as_bytes(),
    )
    .await;

    assert_eq!(events, vec![InjectedEvent::Move(1, 1)]);
}

#[tokio::test]
async fn test_key_string_types_each_character() {
    let events = inject(config(), b"KEYSTRING\x1eHi!\x1e\x04").await;

    assert_eq!(
        events,
        vec![
            keys(&[Keysym::SHIFT_L, ch('H')]),
            keys(&[ch('i')]),
            keys(&[Keysym::SHIFT_L, ch('!')]),
        ]
    );
}

#[tokio::test]
async fn test_disabled_keyboard_suppresses_keys_but_not_pointer() {
    let mut cfg = config();
    cfg.keyboard_enabled = false;

    let events = inject(
        cfg,
        b"KEY\x1e-1\x1eENTER\x1e\x1e\x04KEYSTRING\x1eabc\x1e\x04MOVE\x1e2\x1e3\x1e0\x1e\x04",
    )
    .await;

    assert_eq!(events, vec![InjectedEvent::Move(2, 3)]);
}

#[tokio::test]
async fn test_disabled_keyboard_keeps_click_modifiers() {
    // Arrange
    let mut cfg = config();
    cfg.keyboard_enabled = false;

    // Act
    let events = inject(
        cfg,
        b"CLICK\x1eL\x1eD\x1eCTRL\x1e\x04CLICK\x1eL\x1eU\x1eCTRL\x1e\x04",
    )
    .await;

    // Assert
    assert_eq!(
        events,
        vec![
            InjectedEvent::KeyDown(Keysym::CONTROL_L),
            InjectedEvent::Click(MouseButton::Left, ButtonState::Down),
            InjectedEvent::Click(MouseButton::Left, ButtonState::Up),
            InjectedEvent::KeyUp(Keysym::CONTROL_L),
        ]
    );
}

#[tokio::test]
async fn test_shift_follows_the_keyboard_layout() {
    // Arrange – a layout where '/' needs Shift and '!' does not
    let backend = MockBackend::new().with_shift_variants("/");
    let mut phone = connected(config(), &backend).await;

    // Act – SWITCHMODE's reply marks the point where the KEY was handled
    phone.send(b"KEY\x1e47\x1e/\x1e\x1e\x04SWITCHMODE\x1eMEDIA\x1e\x04").await;
    phone.response().await;
    let slash = backend.events();
    backend.clear();
    phone.send(b"KEY\x1e33\x1e!\x1e\x1e\x04").await;
    phone.hang_up().await.unwrap();

    // Assert
    assert_eq!(slash, vec![keys(&[Keysym::SHIFT_L, ch('/')])]);
    assert_eq!(backend.events(), vec![keys(&[ch('!')])]);
}

// ── Hotkeys and gestures ──────────────────────────────────────────────────────

#[tokio::test]
async fn test_unconfigured_gesture_is_noop() {
    let backend = MockBackend::new();
    let runner = Arc::new(RecordingRunner::default());
    let mut phone = start(config(), &backend, Arc::clone(&runner));
    phone.send(HELLO).await;
    phone.response().await;
    phone.response().await;

    phone.send(b"GESTURE\x1eFOURFINGERSWIPELEFT\x1e\x04").await;
    phone.hang_up().await.unwrap();

    assert!(backend.events().is_empty());
    assert!(runner.commands.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_unconfigured_b1_is_middle_click() {
    let events = inject(config(), b"HOTKEY\x1eB1\x1e\x04").await;

    assert_eq!(
        events,
        vec![
            InjectedEvent::Click(MouseButton::Middle, ButtonState::Down),
            InjectedEvent::Click(MouseButton::Middle, ButtonState::Up),
        ]
    );
}

#[tokio::test]
async fn test_configured_gesture_runs_its_command() {
    let mut cfg = config();
    cfg.hotkeys.insert(
        Gesture::FourFingerPinch.slot(),
        HotKey {
            name: String::new(),
            command: "xdotool key super".into(),
        },
    );
    let backend = MockBackend::new();
    let runner = Arc::new(RecordingRunner::default());
    let mut phone = start(cfg, &backend, Arc::clone(&runner));
    phone.send(HELLO).await;
    phone.response().await;
    phone.response().await;

    phone.send(b"GESTURE\x1eFOURFINGERPINCH\x1e\x04HOTKEY\x1eHK2\x1e\x04").await;
    phone.hang_up().await.unwrap();

    assert_eq!(*runner.commands.lock().unwrap(), vec!["xdotool key super".to_string()]);
    assert!(backend.events().is_empty());
}

#[tokio::test]
async fn test_sync_clipboard_hotkey_sends_clipboard_text() {
    let mut cfg = config();
    cfg.hotkeys.insert(
        HotkeySlot::new(3).unwrap(),
        HotKey {
            name: "Clip".into(),
            command: "SYNC_CLIPBOARD".into(),
        },
    );
    let backend = MockBackend::new();
    backend.set_clipboard_text("copied on desktop");
    let mut phone = start(cfg, &backend, Arc::default());
    phone.send(HELLO).await;
    phone.response().await;
    phone.response().await;

    phone.send(b"HOTKEY\x1eHK3\x1e\x04").await;

    assert_eq!(
        phone.response().await,
        b"CLIPBOARDUPDATE\x1eTEXT\x1fcopied on desktop\x04"
    );
    phone.hang_up().await.unwrap();
}

// ── Window modes ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_media_mode_advertises_custom_keys_and_maps_program_keys() {
    let backend = MockBackend::new();
    let mut phone = connected(config(), &backend).await;

    phone.send(b"PROGRAMKEY\x1ePLAYPAUSE\x1e\x04").await;
    phone.send(b"SWITCHMODE\x1eMEDIA\x1e\x04").await;
    let response = phone.response().await;
    phone
        .send(b"PROGRAMKEY\x1ePLAYPAUSE\x1e\x04PROGRAMKEY\x1eTRACKPREV\x1e\x04")
        .await;
    phone.hang_up().await.unwrap();

    assert_eq!(
        response,
        b"MEDIACUSTOMKEYS\x1ePlaylist\x1e\x1e\x1e\x1eFull Screen\x1e\x1e\x1e\x04"
    );
    // PLAYPAUSE before entering media mode is ignored.
    assert_eq!(
        backend.events(),
        vec![keys(&[Keysym::AUDIO_PLAY]), keys(&[Keysym::AUDIO_NEXT])]
    );
}

#[tokio::test]
async fn test_presentation_start_toggles_and_mode_switch_resets() {
    let events = inject(
        config(),
        b"SWITCHMODE\x1ePRESENTATION\x1e\x04\
PROGRAMKEY\x1ePRESENTATIONSTART\x1e\x04\
PROGRAMKEY\x1ePRESENTATIONSTART\x1e\x04\
PROGRAMKEY\x1ePRESENTATIONSTART\x1e\x04\
SWITCHMODE\x1ePRESENTATION\x1e\x04\
PROGRAMKEY\x1ePRESENTATIONSTART\x1e\x04",
    )
    .await;

    assert_eq!(
        events,
        vec![
            keys(&[Keysym::F5]),
            keys(&[Keysym::ESCAPE]),
            keys(&[Keysym::F5]),
            keys(&[Keysym::F5]),
        ]
    );
}

#[tokio::test]
async fn test_web_mode_program_keys() {
    let events = inject(
        config(),
        b"SWITCHMODE\x1eWEB\x1e\x04PROGRAMKEY\x1eBROWSERBACK\x1e\x04",
    )
    .await;

    assert_eq!(events, vec![keys(&[Keysym::ALT_L, Keysym::LEFT])]);
}

// ── Robustness ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_unhandled_and_malformed_messages_do_not_end_session() {
    let events = inject(
        config(),
        b"BOGUS\x1e1\x1e\x04CLICK\x1eX\x1eD\x1e\x1e\x04SETOPTION\x1eCLIPBOARDSYNC\x1eON\x1e\x04\
OPENLINK\x1ehttp://example.com\x1e\x04MOVE\x1e4\x1e4\x1e0\x1e\x04",
    )
    .await;

    assert_eq!(events, vec![InjectedEvent::Move(4, 4)]);
}

#[tokio::test]
async fn test_injector_failures_do_not_end_session() {
    let backend = MockBackend::failing();
    let mut phone = connected(config(), &backend).await;

    phone
        .send(b"MOVE\x1e1\x1e1\x1e0\x1e\x04KEY\x1e-1\x1eENTER\x1e\x1e\x04")
        .await;
    phone.send(b"SWITCHMODE\x1eMEDIA\x1e\x04").await;

    // The session is still alive and answering.
    assert!(phone.response().await.starts_with(b"MEDIACUSTOMKEYS"));
    assert_eq!(phone.hang_up().await.unwrap(), SessionEnd::ClientClosed);
}

#[tokio::test]
async fn test_pipelined_messages_trickled_byte_by_byte_keep_order() {
    let backend = MockBackend::new();
    let mut phone = connected(config(), &backend).await;
    let stream = b"MOVE\x1e1\x1e0\x1e0\x1e\x04SCROLL\x1e0\x1e1\x1e\x1e\x04KEY\x1e-1\x1eTAB\x1e\x1e\x04";

    for byte in stream {
        phone.send(std::slice::from_ref(byte)).await;
    }
    phone.hang_up().await.unwrap();

    let events = backend.events();
    assert_eq!(events.len(), 3);
    assert_eq!(events[1], InjectedEvent::Scroll(0, 1));
    assert_eq!(events[2], keys(&[Keysym::TAB]));
}

#[tokio::test]
async fn test_oversized_packet_ends_session_with_error() {
    let mut cfg = config();
    cfg.max_packet_size = 64;
    let backend = MockBackend::new();
    let mut phone = connected(cfg, &backend).await;

    phone.send(&[b'A'; 200]).await;
    let result = phone.hang_up().await;

    assert!(matches!(result, Err(SessionError::Framing(_))));
}

#[tokio::test]
async fn test_idle_client_is_disconnected() {
    let mut cfg = config();
    cfg.idle_timeout = Some(Duration::from_millis(50));
    let backend = MockBackend::new();
    let phone = connected(cfg, &backend).await;

    let result = tokio::time::timeout(Duration::from_secs(5), phone.session)
        .await
        .expect("idle timeout fires")
        .unwrap();

    assert!(matches!(result, Err(SessionError::IdleTimeout(_))));
}
