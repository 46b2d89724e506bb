//! Live countdowns: one ticking task per activity id.
//!
//! Each running countdown owns a Tokio task that ticks at
//! `timer.tick_interval_ms`, publishes its [`TimerState`] on a watch channel
//! and forwards it to a [`LiveActivitySink`]. Pausing, stopping, completing
//! or restarting aborts the task. Every slot carries a generation number so
//! that a task or dismissal timer left over from an earlier run can never
//! publish into, or tear down, a newer one.
//!
//! Sink callbacks run while the slot table is locked and must not call back
//! into [`LiveCountdowns`].

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};

use super::countdown::{Countdown, TimerAttributes, TimerState};
use crate::storage::TimerConfig;

/// External display of running countdowns (lock screen, widget, terminal).
pub trait LiveActivitySink: Send + Sync {
    fn started(&self, attributes: &TimerAttributes, state: &TimerState);
    fn updated(&self, state: &TimerState);
    fn ended(&self, activity_id: &str);
}

/// Sink that only logs.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl LiveActivitySink for TracingSink {
    fn started(&self, attributes: &TimerAttributes, state: &TimerState) {
        tracing::info!(
            activity_id = %attributes.activity_id,
            name = %attributes.activity_name,
            remaining = state.remaining_seconds,
            "live countdown started"
        );
    }

    fn updated(&self, state: &TimerState) {
        tracing::debug!(
            activity_id = %state.activity_id,
            remaining = state.remaining_seconds,
            paused = state.is_paused,
            "live countdown tick"
        );
    }

    fn ended(&self, activity_id: &str) {
        tracing::info!(activity_id, "live countdown ended");
    }
}

struct Slot {
    countdown: Countdown,
    generation: u64,
    state_tx: watch::Sender<TimerState>,
    ticker: Option<JoinHandle<()>>,
    dismissal: Option<JoinHandle<()>>,
}

impl Slot {
    fn abort_tasks(&mut self) {
        if let Some(ticker) = self.ticker.take() {
            ticker.abort();
        }
        if let Some(dismissal) = self.dismissal.take() {
            dismissal.abort();
        }
    }

    fn publish(&self, now: Instant, sink: &dyn LiveActivitySink) -> TimerState {
        let state = self.countdown.state(now);
        self.state_tx.send_replace(state.clone());
        sink.updated(&state);
        state
    }
}

struct Inner {
    runtime: Handle,
    sink: Arc<dyn LiveActivitySink>,
    tick_interval: Duration,
    dismissal: Duration,
    slots: Mutex<HashMap<String, Slot>>,
    generations: AtomicU64,
}

impl Inner {
    fn slots(&self) -> MutexGuard<'_, HashMap<String, Slot>> {
        // A panicking sink must not wedge every other countdown.
        self.slots.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn next_generation(&self) -> u64 {
        self.generations.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// One tick for `activity_id`. Returns whether the ticker should go on.
    fn tick(self: &Arc<Self>, activity_id: &str, generation: u64) -> bool {
        let mut slots = self.slots();
        let Some(slot) = slots.get_mut(activity_id) else {
            return false;
        };
        if slot.generation != generation {
            return false;
        }

        let now = Instant::now();
        let finished = slot.countdown.tick(now);
        slot.publish(now, self.sink.as_ref());

        if finished {
            tracing::info!(activity_id, "countdown completed");
            slot.ticker = None;
            self.schedule_dismissal(slot, activity_id);
            return false;
        }
        true
    }

    fn spawn_ticker(self: &Arc<Self>, slot: &mut Slot, activity_id: &str) {
        slot.generation = self.next_generation();
        let inner = Arc::downgrade(self);
        let id = activity_id.to_string();
        let generation = slot.generation;
        let period = self.tick_interval;
        slot.ticker = Some(self.runtime.spawn(run_ticker(inner, id, generation, period)));
    }

    fn schedule_dismissal(self: &Arc<Self>, slot: &mut Slot, activity_id: &str) {
        slot.generation = self.next_generation();
        let inner: Weak<Self> = Arc::downgrade(self);
        let id = activity_id.to_string();
        let generation = slot.generation;
        let delay = self.dismissal;
        slot.dismissal = Some(self.runtime.spawn(async move {
            time::sleep(delay).await;
            if let Some(inner) = inner.upgrade() {
                inner.teardown(&id, Some(generation));
            }
        }));
    }

    /// Remove the slot; with `expected`, only if it is still that generation.
    fn teardown(&self, activity_id: &str, expected: Option<u64>) -> bool {
        let mut slots = self.slots();
        let matches = match (slots.get(activity_id), expected) {
            (Some(slot), Some(generation)) => slot.generation == generation,
            (Some(_), None) => true,
            (None, _) => false,
        };
        if !matches {
            return false;
        }

        if let Some(mut slot) = slots.remove(activity_id) {
            slot.abort_tasks();
            self.sink.ended(activity_id);
            tracing::debug!(activity_id, "countdown torn down");
        }
        true
    }
}

async fn run_ticker(inner: Weak<Inner>, activity_id: String, generation: u64, period: Duration) {
    let mut interval = time::interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        interval.tick().await;
        let Some(inner) = inner.upgrade() else {
            return;
        };
        if !inner.tick(&activity_id, generation) {
            return;
        }
    }
}

/// Registry of live countdowns, cheap to clone.
#[derive(Clone)]
pub struct LiveCountdowns {
    inner: Arc<Inner>,
}

impl LiveCountdowns {
    pub fn new(runtime: Handle, sink: Arc<dyn LiveActivitySink>, config: &TimerConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                runtime,
                sink,
                tick_interval: Duration::from_millis(config.tick_interval_ms.max(1)),
                dismissal: Duration::from_secs(config.dismissal_secs),
                slots: Mutex::new(HashMap::new()),
                generations: AtomicU64::new(0),
            }),
        }
    }

    /// Start a countdown, replacing any countdown with the same id.
    pub fn start(
        &self,
        activity_id: &str,
        activity_name: &str,
        activity_icon: &str,
        duration_minutes: u32,
    ) -> watch::Receiver<TimerState> {
        let inner = &self.inner;
        let mut slots = inner.slots();

        if let Some(mut previous) = slots.remove(activity_id) {
            previous.abort_tasks();
            inner.sink.ended(activity_id);
            tracing::debug!(activity_id, "replacing running countdown");
        }

        let now = Instant::now();
        let mut countdown = Countdown::new(activity_id, duration_minutes);
        countdown.start(now);
        let state = countdown.state(now);
        let (state_tx, state_rx) = watch::channel(state.clone());

        let attributes = TimerAttributes {
            activity_id: activity_id.to_string(),
            activity_name: activity_name.to_string(),
            activity_icon: activity_icon.to_string(),
            total_duration_minutes: duration_minutes,
        };
        inner.sink.started(&attributes, &state);

        let mut slot = Slot {
            countdown,
            generation: 0,
            state_tx,
            ticker: None,
            dismissal: None,
        };
        inner.spawn_ticker(&mut slot, activity_id);
        slots.insert(activity_id.to_string(), slot);

        tracing::info!(activity_id, activity_name, duration_minutes, "countdown started");
        state_rx
    }

    /// Freeze the countdown. `None` if no countdown has this id.
    pub fn pause(&self, activity_id: &str) -> Option<TimerState> {
        let inner = &self.inner;
        let mut slots = inner.slots();
        let slot = slots.get_mut(activity_id)?;

        let now = Instant::now();
        if slot.countdown.pause(now) {
            if let Some(ticker) = slot.ticker.take() {
                ticker.abort();
            }
            slot.generation = inner.next_generation();
            tracing::debug!(activity_id, "countdown paused");
            return Some(slot.publish(now, inner.sink.as_ref()));
        }
        Some(slot.countdown.state(now))
    }

    pub fn resume(&self, activity_id: &str) -> Option<TimerState> {
        let inner = &self.inner;
        let mut slots = inner.slots();
        let slot = slots.get_mut(activity_id)?;

        let now = Instant::now();
        if slot.countdown.resume(now) {
            inner.spawn_ticker(slot, activity_id);
            tracing::debug!(activity_id, "countdown resumed");
            return Some(slot.publish(now, inner.sink.as_ref()));
        }
        Some(slot.countdown.state(now))
    }

    /// Force remaining time to zero, publish it, and tear the countdown down
    /// after the dismissal window.
    pub fn complete(&self, activity_id: &str) -> Option<TimerState> {
        let inner = &self.inner;
        let mut slots = inner.slots();
        let slot = slots.get_mut(activity_id)?;

        let now = Instant::now();
        if !slot.countdown.complete(now) {
            return Some(slot.countdown.state(now));
        }
        if let Some(ticker) = slot.ticker.take() {
            ticker.abort();
        }
        let state = slot.publish(now, inner.sink.as_ref());
        inner.schedule_dismissal(slot, activity_id);
        tracing::info!(activity_id, "countdown completed early");
        Some(state)
    }

    /// Tear down immediately. Returns whether a countdown existed.
    pub fn stop(&self, activity_id: &str) -> bool {
        self.inner.teardown(activity_id, None)
    }

    pub fn stop_all(&self) -> usize {
        let ids: Vec<String> = self.inner.slots().keys().cloned().collect();
        ids.iter().filter(|id| self.inner.teardown(id, None)).count()
    }

    pub fn subscribe(&self, activity_id: &str) -> Option<watch::Receiver<TimerState>> {
        self.inner
            .slots()
            .get(activity_id)
            .map(|slot| slot.state_tx.subscribe())
    }

    pub fn state(&self, activity_id: &str) -> Option<TimerState> {
        self.inner
            .slots()
            .get(activity_id)
            .map(|slot| slot.countdown.state(Instant::now()))
    }

    pub fn remaining_seconds(&self, activity_id: &str) -> Option<u64> {
        self.state(activity_id).map(|state| state.remaining_seconds)
    }

    pub fn is_paused(&self, activity_id: &str) -> Option<bool> {
        self.inner
            .slots()
            .get(activity_id)
            .map(|slot| slot.countdown.is_paused())
    }

    pub fn active_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.inner.slots().keys().cloned().collect();
        ids.sort();
        ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timer::CountdownPhase;

    #[derive(Default)]
    struct RecordingSink {
        events: Mutex<Vec<String>>,
    }

    impl RecordingSink {
        fn events(&self) -> Vec<String> {
            self.events.lock().unwrap().clone()
        }
    }

    impl LiveActivitySink for RecordingSink {
        fn started(&self, attributes: &TimerAttributes, _state: &TimerState) {
            self.events.lock().unwrap().push(format!("started:{}", attributes.activity_id));
        }

        fn updated(&self, state: &TimerState) {
            self.events
                .lock()
                .unwrap()
                .push(format!("updated:{}:{}", state.activity_id, state.remaining_seconds));
        }

        fn ended(&self, activity_id: &str) {
            self.events.lock().unwrap().push(format!("ended:{activity_id}"));
        }
    }

    fn timers() -> (LiveCountdowns, Arc<RecordingSink>) {
        let sink = Arc::new(RecordingSink::default());
        let timers = LiveCountdowns::new(Handle::current(), sink.clone(), &TimerConfig::default());
        (timers, sink)
    }

    #[tokio::test(start_paused = true)]
    async fn one_minute_countdown_completes_and_is_dismissed() {
        let (timers, sink) = timers();
        let rx = timers.start("1", "5-Min Breathing", "🧘", 1);
        assert_eq!(rx.borrow().remaining_seconds, 60);

        time::sleep(Duration::from_millis(30_500)).await;
        assert_eq!(timers.remaining_seconds("1"), Some(30));

        time::sleep(Duration::from_secs(30)).await;
        assert_eq!(rx.borrow().phase, CountdownPhase::Completed);
        assert_eq!(rx.borrow().remaining_seconds, 0);
        assert_eq!(timers.active_ids(), vec!["1".to_string()]);

        time::sleep(Duration::from_secs(4)).await;
        assert!(timers.active_ids().is_empty());
        assert_eq!(sink.events().last().map(String::as_str), Some("ended:1"));
    }

    #[tokio::test(start_paused = true)]
    async fn paused_countdown_does_not_tick() {
        let (timers, sink) = timers();
        timers.start("1", "Walk", "🚶", 1);
        time::sleep(Duration::from_millis(10_500)).await;

        let paused = timers.pause("1").unwrap();
        assert!(paused.is_paused);
        assert_eq!(paused.remaining_seconds, 50);
        let published = sink.events().len();

        time::sleep(Duration::from_secs(120)).await;
        assert_eq!(sink.events().len(), published);
        assert_eq!(timers.remaining_seconds("1"), Some(50));
        assert_eq!(timers.is_paused("1"), Some(true));

        timers.resume("1");
        time::sleep(Duration::from_millis(50_500)).await;
        assert_eq!(timers.state("1").map(|s| s.phase), Some(CountdownPhase::Completed));
    }

    #[tokio::test(start_paused = true)]
    async fn zero_minute_countdown_completes_on_first_tick() {
        let (timers, _sink) = timers();
        let rx = timers.start("z", "Nothing", "", 0);
        assert_eq!(rx.borrow().remaining_seconds, 0);
        assert_eq!(rx.borrow().phase, CountdownPhase::Running);

        time::sleep(Duration::from_millis(1_100)).await;
        assert_eq!(rx.borrow().phase, CountdownPhase::Completed);
    }

    #[tokio::test(start_paused = true)]
    async fn stop_publishes_nothing_afterwards() {
        let (timers, sink) = timers();
        let mut rx = timers.start("1", "Walk", "🚶", 5);
        time::sleep(Duration::from_millis(2_500)).await;
        assert_eq!(rx.borrow_and_update().remaining_seconds, 298);

        assert!(timers.stop("1"));
        let after_stop = sink.events().len();
        time::sleep(Duration::from_secs(10)).await;
        assert_eq!(sink.events().len(), after_stop);
        assert!(timers.remaining_seconds("1").is_none());
        assert!(rx.changed().await.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn restart_is_not_torn_down_by_old_dismissal() {
        let (timers, _sink) = timers();
        timers.start("1", "Walk", "🚶", 5);
        timers.complete("1");
        time::sleep(Duration::from_secs(1)).await;

        timers.start("1", "Walk", "🚶", 5);
        time::sleep(Duration::from_secs(5)).await;
        assert_eq!(timers.remaining_seconds("1"), Some(295));
    }

    #[tokio::test(start_paused = true)]
    async fn stop_all_clears_every_countdown() {
        let (timers, sink) = timers();
        timers.start("a", "A", "", 5);
        timers.start("b", "B", "", 5);
        assert_eq!(timers.stop_all(), 2);
        assert!(timers.active_ids().is_empty());
        let ended = sink.events().iter().filter(|e| e.starts_with("ended:")).count();
        assert_eq!(ended, 2);
    }
}
