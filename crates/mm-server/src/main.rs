//! Mobile Mouse server: entry point.
//!
//! This binary lets the Mobile Mouse phone apps drive the desktop's pointer,
//! keyboard and clipboard.  It listens for one phone at a time, advertises
//! itself over zeroconf, and injects input through XTest.
//!
//! # Usage
//!
//! ```text
//! mmserver [OPTIONS]
//!
//! Options:
//!   -f, --config <PATH>      Config file [default: ~/.config/mmserver/config.toml]
//!       --port <PORT>        TCP port, overrides server.port
//!       --backend <BACKEND>  x11 | dry-run, overrides input.backend
//!       --debug              Debug logging and packet dumps
//! ```
//!
//! # Environment variable overrides
//!
//! | Variable          | Description                              |
//! |-------------------|------------------------------------------|
//! | `MMSERVER_CONFIG` | Config file path                         |
//! | `MMSERVER_PORT`   | TCP port                                 |
//! | `RUST_LOG`        | Log filter; wins over `server.log_level` |

use std::path::PathBuf;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use anyhow::Context;
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use mm_server::application::dispatch_hotkey::HotkeyDispatcher;
use mm_server::application::inject_input::InputBackend;
use mm_server::infrastructure::command::ShellCommandRunner;
use mm_server::infrastructure::input_emulation::mock::MockBackend;
use mm_server::infrastructure::network::advertiser::{
    AvahiPublisher, NoopAdvertiser, ServiceAdvertiser,
};
use mm_server::infrastructure::network::listener::{bind, serve, ServerContext};
use mm_server::infrastructure::storage::config::{load_config, BackendKind, FileConfig};

// ── CLI argument definitions ──────────────────────────────────────────────────

/// Mobile Mouse server for X11 desktops.
#[derive(Debug, Parser)]
#[command(name = "mmserver", about = "Mobile Mouse server for X11 desktops", version)]
struct Cli {
    /// Configuration file.  Without it the default location is used, and a
    /// missing default file means built-in defaults.
    #[arg(short = 'f', long, env = "MMSERVER_CONFIG")]
    config: Option<PathBuf>,

    /// TCP port to listen on (overrides `server.port`).
    #[arg(long, env = "MMSERVER_PORT")]
    port: Option<u16>,

    /// Input backend (overrides `input.backend`).
    #[arg(long, value_enum)]
    backend: Option<BackendKind>,

    /// Log at debug level and dump unexpected packets.
    #[arg(long)]
    debug: bool,
}

impl Cli {
    /// Applies command-line overrides on top of the file configuration.
    fn apply_overrides(&self, file: &mut FileConfig) {
        if let Some(port) = self.port {
            file.server.port = port;
        }
        if let Some(backend) = self.backend {
            file.input.backend = backend;
        }
        if self.debug {
            file.server.debug = true;
        }
    }
}

/// `RUST_LOG` if set, else the configured level (raised to `debug` by the
/// debug flag).
fn log_filter(file: &FileConfig) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = if file.server.debug {
            "debug"
        } else {
            file.server.log_level.as_str()
        };
        EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"))
    })
}

fn input_backend(file: &FileConfig) -> anyhow::Result<Arc<dyn InputBackend>> {
    match file.input.backend {
        BackendKind::DryRun => Ok(Arc::new(MockBackend::dry_run())),
        #[cfg(target_os = "linux")]
        BackendKind::X11 => Ok(Arc::new(
            mm_server::infrastructure::input_emulation::linux::XTestBackend::new(
                file.input.display.clone(),
            ),
        )),
        #[cfg(not(target_os = "linux"))]
        BackendKind::X11 => anyhow::bail!("the x11 backend is only available on Linux"),
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

/// Program entry point.
///
/// # What happens at startup
///
/// 1. CLI arguments are parsed and the config file is loaded.
/// 2. `tracing_subscriber` is initialised from `RUST_LOG` or the config.
/// 3. The input backend is opened once to fail fast without a display.
/// 4. The TCP port is bound and the service is advertised.
/// 5. A Ctrl+C handler clears the shared `running` flag, which stops the
///    accept loop within 200 ms.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut file = load_config(cli.config.as_deref()).context("failed to load configuration")?;
    cli.apply_overrides(&mut file);

    tracing_subscriber::fmt()
        .with_env_filter(log_filter(&file))
        .init();

    let backend = input_backend(&file)?;
    let config = Arc::new(file.into_configuration());

    let _probe = backend
        .open_session()
        .context("cannot open input devices")?;

    let listener = bind(&config).await.context("failed to start server")?;
    let port = listener
        .local_addr()
        .map(|addr| addr.port())
        .unwrap_or(config.port);

    info!(
        "mmserver starting as \"{}\" ({}) on port {port}",
        config.hostname, config.platform
    );

    let mut advertiser: Box<dyn ServiceAdvertiser> = if config.zeroconf {
        Box::new(AvahiPublisher::new())
    } else {
        Box::new(NoopAdvertiser)
    };
    if let Err(e) = advertiser.advertise(&config.hostname, port) {
        warn!("zeroconf advertisement failed: {e}");
    }

    // ── Graceful shutdown flag ─────────────────────────────────────────────────
    let running = Arc::new(AtomicBool::new(true));
    let running_clone = Arc::clone(&running);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("received Ctrl+C; shutting down");
                running_clone.store(false, Ordering::Relaxed);
            }
            Err(e) => {
                tracing::error!("failed to listen for Ctrl+C signal: {e}");
            }
        }
    });

    let ctx = ServerContext {
        config,
        backend,
        dispatcher: Arc::new(HotkeyDispatcher::new(Arc::new(ShellCommandRunner::new()))),
    };
    serve(listener, ctx, running).await;

    advertiser.stop();
    info!("mmserver stopped");
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
