//! Countdown timers for running activities.

mod countdown;
mod live;

pub use countdown::{Countdown, CountdownPhase, TimerAttributes, TimerState};
pub use live::{LiveActivitySink, LiveCountdowns, TracingSink};
