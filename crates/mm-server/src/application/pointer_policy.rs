//! Pointer policy: move acceleration and scroll clamping.
//!
//! # Acceleration
//!
//! Clients send small relative deltas at a high rate.  To let a thumb cross
//! a large screen, a move is multiplied by the acceleration factor when the
//! estimated finger speed exceeds a threshold:
//!
//! ```text
//! speed = sqrt(dx² + dy²) / microseconds since the previous MOVE
//! ```
//!
//! The first move of a session has no previous timestamp and is never
//! accelerated.
//!
//! # Scroll clamping
//!
//! Some clients send large scroll deltas that would spin the wheel dozens of
//! clicks; each axis is clamped to `scroll_max` while keeping its sign.
//! Horizontal scrolling is dropped entirely unless enabled.

use std::time::Instant;

use mm_core::Configuration;

/// Tracks move timing and applies the acceleration curve.
#[derive(Debug, Clone)]
pub struct PointerAccelerator {
    enabled: bool,
    /// Pixels per microsecond.
    threshold: f64,
    factor: i32,
    last_move: Option<Instant>,
}

impl PointerAccelerator {
    pub fn new(enabled: bool, threshold: f64, factor: i32) -> Self {
        Self {
            enabled,
            threshold,
            factor,
            last_move: None,
        }
    }

    pub fn from_config(config: &Configuration) -> Self {
        Self::new(
            config.accelerate,
            config.acceleration_speed,
            config.acceleration_factor,
        )
    }

    /// Returns the delta to inject for a move received at `now`, and records
    /// `now` as the previous move time.
    pub fn apply(&mut self, dx: i32, dy: i32, now: Instant) -> (i32, i32) {
        let previous = self.last_move.replace(now);
        let Some(previous) = previous else {
            return (dx, dy);
        };
        if !self.enabled {
            return (dx, dy);
        }

        let elapsed_us = now.saturating_duration_since(previous).as_secs_f64() * 1_000_000.0;
        let distance = f64::from(dx).hypot(f64::from(dy));
        let speed = if elapsed_us > 0.0 {
            distance / elapsed_us
        } else if distance > 0.0 {
            f64::INFINITY
        } else {
            0.0
        };

        if speed > self.threshold {
            (
                dx.saturating_mul(self.factor),
                dy.saturating_mul(self.factor),
            )
        } else {
            (dx, dy)
        }
    }
}

/// Applies the horizontal-scroll switch and the per-axis clamp.
pub fn clamp_scroll(dx: i32, dy: i32, horizontal_enabled: bool, scroll_max: i32) -> (i32, i32) {
    let max = scroll_max.max(1);
    let dx = if horizontal_enabled { dx } else { 0 };
    (dx.clamp(-max, max), dy.clamp(-max, max))
}

// ── Tests ─────────────────────────────────────────────────────────────────────
