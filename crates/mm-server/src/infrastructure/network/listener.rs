//! TCP accept loop.
//!
//! This module is responsible for:
//!
//! 1. Binding a TCP listener on the configured address and port.
//! 2. Accepting phone connections one at a time.
//! 3. Opening fresh input devices for each connection.
//! 4. Running the session to completion before accepting the next client.
//! 5. Stopping when the `running` flag is cleared.
//!
//! # Why one session at a time?
//!
//! Two phones driving one pointer would fight over it, and the injectors are
//! not meant to be shared.  A second client simply waits in the listen
//! backlog until the first disconnects.  Each session still runs in its own
//! Tokio task so that a panic inside a session is contained and logged.

use std::net::SocketAddr;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;

use mm_core::Configuration;
use thiserror::Error;
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;
use tracing::{error, info, warn};

use crate::application::dispatch_hotkey::HotkeyDispatcher;
use crate::application::inject_input::InputBackend;
use crate::application::session::{Session, SessionEnd};

/// How often the loop wakes up to check the `running` flag.
const SHUTDOWN_POLL: Duration = Duration::from_millis(200);

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },
}

/// Everything a session needs besides its socket.
#[derive(Clone)]
pub struct ServerContext {
    pub config: Arc<Configuration>,
    pub backend: Arc<dyn InputBackend>,
    pub dispatcher: Arc<HotkeyDispatcher>,
}

/// Binds the listener on `bind_address:port`.
///
/// # Errors
///
/// Returns [`ServerError::Bind`] when the address is in use or the process
/// lacks permission.
pub async fn bind(config: &Configuration) -> Result<TcpListener, ServerError> {
    let addr = format!("{}:{}", config.bind_address, config.port);
    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|source| ServerError::Bind {
            addr: addr.clone(),
            source,
        })?;
    info!("listening on {addr}");
    Ok(listener)
}

/// Accepts and serves clients until `running` is set to `false`.
pub async fn serve(listener: TcpListener, ctx: ServerContext, running: Arc<AtomicBool>) {
    while running.load(Ordering::Relaxed) {
        match timeout(SHUTDOWN_POLL, listener.accept()).await {
            Ok(Ok((stream, peer_addr))) => {
                let task = tokio::spawn(handle_connection(stream, peer_addr, ctx.clone()));
                wait_for_session(task, &running).await;
            }
            Ok(Err(e)) => {
                // Transient accept error (e.g. too many open files).
                error!("accept error: {e}");
            }
            Err(_) => {}
        }
    }
    info!("shutdown flag set; stopping accept loop");
}

/// Awaits the session task, aborting it if shutdown is requested meanwhile.
async fn wait_for_session(mut task: tokio::task::JoinHandle<()>, running: &AtomicBool) {
    loop {
        match timeout(SHUTDOWN_POLL, &mut task).await {
            Ok(Ok(())) => return,
            Ok(Err(e)) => {
                error!("session task failed: {e}");
                return;
            }
            Err(_) if !running.load(Ordering::Relaxed) => {
                task.abort();
                return;
            }
            Err(_) => {}
        }
    }
}

/// Runs one connection and logs how it ended.
async fn handle_connection(stream: TcpStream, peer_addr: SocketAddr, ctx: ServerContext) {
    let peer = peer_addr.to_string();
    if let Err(e) = stream.set_nodelay(true) {
        warn!("[{peer}] cannot disable Nagle: {e}");
    }

    let devices = match ctx.backend.open_session() {
        Ok(devices) => devices,
        Err(e) => {
            error!("[{peer}] refusing connection: {e}");
            return;
        }
    };

    let session = Session::new(stream, peer.as_str(), ctx.config, devices, ctx.dispatcher);
    match session.run().await {
        Ok(SessionEnd::ClientClosed) => info!("[{peer}] session closed normally"),
        Ok(end) => info!("[{peer}] session ended: {end:?}"),
        Err(e) => warn!("[{peer}] session closed with error: {e}"),
    }
}
