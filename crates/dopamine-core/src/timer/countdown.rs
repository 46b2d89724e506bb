//! Countdown state machine.
//!
//! Remaining time is derived from accumulated running time on a monotonic
//! clock, never from counting ticks, so a late or skipped tick cannot drift
//! the display. The caller supplies `now` to every command.
//!
//! ## State Transitions
//!
//! ```text
//! Idle -> Running <-> Paused
//! Running -> Completed        (remaining reaches 0 on a tick, or forced)
//! Paused  -> Completed        (forced)
//! ```

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CountdownPhase {
    Idle,
    Running,
    Paused,
    Completed,
}

/// Snapshot published to subscribers and the live display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerState {
    pub activity_id: String,
    pub remaining_seconds: u64,
    pub is_paused: bool,
    pub last_update_time: DateTime<Utc>,
    pub phase: CountdownPhase,
}

/// Static attributes of a live countdown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerAttributes {
    pub activity_id: String,
    pub activity_name: String,
    pub activity_icon: String,
    pub total_duration_minutes: u32,
}

#[derive(Debug, Clone)]
pub struct Countdown {
    activity_id: String,
    total: Duration,
    phase: CountdownPhase,
    /// Running time accumulated before the current anchor.
    elapsed_baseline: Duration,
    /// Set while running: when the current running interval began.
    running_anchor: Option<Instant>,
}

impl Countdown {
    pub fn new(activity_id: &str, duration_minutes: u32) -> Self {
        Self {
            activity_id: activity_id.to_string(),
            total: Duration::from_secs(u64::from(duration_minutes) * 60),
            phase: CountdownPhase::Idle,
            elapsed_baseline: Duration::ZERO,
            running_anchor: None,
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn activity_id(&self) -> &str {
        &self.activity_id
    }

    pub fn phase(&self) -> CountdownPhase {
        self.phase
    }

    pub fn is_paused(&self) -> bool {
        self.phase == CountdownPhase::Paused
    }

    pub fn total_secs(&self) -> u64 {
        self.total.as_secs()
    }

    /// Running time so far; paused intervals are excluded.
    pub fn elapsed(&self, now: Instant) -> Duration {
        match self.running_anchor {
            Some(anchor) => self.elapsed_baseline + now.saturating_duration_since(anchor),
            None => self.elapsed_baseline,
        }
    }

    pub fn remaining_secs(&self, now: Instant) -> u64 {
        if self.phase == CountdownPhase::Completed {
            return 0;
        }
        self.total_secs().saturating_sub(self.elapsed(now).as_secs())
    }

    pub fn state(&self, now: Instant) -> TimerState {
        TimerState {
            activity_id: self.activity_id.clone(),
            remaining_seconds: self.remaining_secs(now),
            is_paused: self.is_paused(),
            last_update_time: Utc::now(),
            phase: self.phase,
        }
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Returns false unless the countdown was idle.
    pub fn start(&mut self, now: Instant) -> bool {
        if self.phase != CountdownPhase::Idle {
            return false;
        }
        self.phase = CountdownPhase::Running;
        self.running_anchor = Some(now);
        true
    }

    pub fn pause(&mut self, now: Instant) -> bool {
        if self.phase != CountdownPhase::Running {
            return false;
        }
        self.flush_elapsed(now);
        self.running_anchor = None;
        self.phase = CountdownPhase::Paused;
        true
    }

    pub fn resume(&mut self, now: Instant) -> bool {
        if self.phase != CountdownPhase::Paused {
            return false;
        }
        self.phase = CountdownPhase::Running;
        self.running_anchor = Some(now);
        true
    }

    /// Recompute remaining time. Returns true on the tick that completes.
    pub fn tick(&mut self, now: Instant) -> bool {
        if self.phase != CountdownPhase::Running {
            return false;
        }
        if self.remaining_secs(now) == 0 {
            self.finish(now);
            return true;
        }
        false
    }

    /// Force completion. Returns false if already completed.
    pub fn complete(&mut self, now: Instant) -> bool {
        if self.phase == CountdownPhase::Completed {
            return false;
        }
        self.finish(now);
        true
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn flush_elapsed(&mut self, now: Instant) {
        if let Some(anchor) = self.running_anchor {
            self.elapsed_baseline += now.saturating_duration_since(anchor);
            self.running_anchor = Some(now);
        }
    }

    fn finish(&mut self, now: Instant) {
        self.flush_elapsed(now);
        self.running_anchor = None;
        self.elapsed_baseline = self.elapsed_baseline.max(self.total);
        self.phase = CountdownPhase::Completed;
    }
}
