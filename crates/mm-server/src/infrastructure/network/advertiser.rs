//! Zeroconf service advertisement.
//!
//! The phone app discovers servers by browsing for `_mobileremote._tcp`.
//! [`AvahiPublisher`] registers the service by running `avahi-publish` as a
//! child process for as long as the publisher lives; dropping it (or
//! calling [`ServiceAdvertiser::stop`]) kills the child and withdraws the
//! record.
//!
//! The advertiser is owned by `main` and passed to nothing else: its
//! lifetime is the process lifetime.

use std::process::Stdio;

use thiserror::Error;
use tokio::process::{Child, Command};
use tracing::{debug, info};

/// DNS-SD service type the clients browse for.
pub const SERVICE_TYPE: &str = "_mobileremote._tcp";

#[derive(Debug, Error)]
pub enum AdvertiseError {
    #[error("failed to launch `{program}`: {source}")]
    Launch {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("already advertising")]
    AlreadyStarted,
}

/// Announces the server on the local network.
pub trait ServiceAdvertiser: Send {
    /// Starts advertising `name` on `port`.
    fn advertise(&mut self, name: &str, port: u16) -> Result<(), AdvertiseError>;

    /// Withdraws the advertisement.  Idempotent.
    fn stop(&mut self);
}

/// Advertises through the `avahi-publish` command-line tool.
pub struct AvahiPublisher {
    program: String,
    child: Option<Child>,
}

impl Default for AvahiPublisher {
    fn default() -> Self {
        Self {
            program: "avahi-publish".to_string(),
            child: None,
        }
    }
}

impl AvahiPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` while the publisher child is running.
    pub fn is_advertising(&mut self) -> bool {
        match self.child.as_mut().map(Child::try_wait) {
            Some(Ok(None)) => true,
            Some(Ok(Some(status))) => {
                debug!("{} exited with {status}", self.program);
                false
            }
            Some(Err(_)) | None => false,
        }
    }
}

impl ServiceAdvertiser for AvahiPublisher {
    /// Must be called from within a Tokio runtime.
    fn advertise(&mut self, name: &str, port: u16) -> Result<(), AdvertiseError> {
        if self.child.is_some() {
            return Err(AdvertiseError::AlreadyStarted);
        }
        let child = Command::new(&self.program)
            .arg("-s")
            .arg(name)
            .arg(SERVICE_TYPE)
            .arg(port.to_string())
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| AdvertiseError::Launch {
                program: self.program.clone(),
                source,
            })?;
        info!("advertising \"{name}\" as {SERVICE_TYPE} on port {port}");
        self.child = Some(child);
        Ok(())
    }

    fn stop(&mut self) {
        if let Some(mut child) = self.child.take() {
            if let Err(e) = child.start_kill() {
                debug!("stopping {}: {e}", self.program);
            }
            info!("service advertisement withdrawn");
        }
    }
}

impl Drop for AvahiPublisher {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Used when zeroconf is disabled.
#[derive(Debug, Default)]
pub struct NoopAdvertiser;

impl ServiceAdvertiser for NoopAdvertiser {
    fn advertise(&mut self, name: &str, port: u16) -> Result<(), AdvertiseError> {
        debug!("zeroconf disabled; not advertising \"{name}\" on port {port}");
        Ok(())
    }

    fn stop(&mut self) {}
}

// ── Tests ─────────────────────────────────────────────────────────────────────
