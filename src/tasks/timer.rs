//! Per-Key Timers
//!
//! Background tasks that expire or periodically update a single cache entry.
//!
//! Every installed timer owns a generation number and a one-shot cancellation
//! channel. The registry keeps the sender; the spawned task keeps the
//! receiver. A fired timer must confirm, under the owning lock, that the
//! registry still holds its generation before touching any state.

use std::collections::HashMap;
use std::hash::Hash;
use std::ops::ControlFlow;
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::trace;

// == Schedule ==
/// How often a timer fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Schedule {
    /// Fire once after the duration, then stop.
    Once(Duration),
    /// Fire every period until cancelled.
    Every(Duration),
}

impl Schedule {
    fn period(&self) -> Duration {
        match self {
            Schedule::Once(d) | Schedule::Every(d) => *d,
        }
    }
}

// == Timer ==
/// Registry record for one live timer.
#[derive(Debug)]
struct Timer {
    generation: u64,
    cancel: oneshot::Sender<()>,
}

impl Timer {
    fn cancel(self) {
        // The task may already be gone; a closed receiver is fine.
        let _ = self.cancel.send(());
    }
}

// == Timer Registry ==
/// Tracks the single live timer of each key.
///
/// The registry is meant to sit under the same lock as the entries it
/// guards, so installs, cancellations and liveness checks are atomic with
/// respect to the entry map.
#[derive(Debug)]
pub struct TimerRegistry<K> {
    active: HashMap<K, Timer>,
    next_generation: u64,
}

impl<K> Default for TimerRegistry<K> {
    fn default() -> Self {
        Self {
            active: HashMap::new(),
            next_generation: 0,
        }
    }
}

impl<K: Hash + Eq + Clone> TimerRegistry<K> {
    pub fn new() -> Self {
        Self::default()
    }

    // == Install ==
    /// Cancels any timer for `key` and spawns a new one on `runtime`.
    ///
    /// `on_fire` runs each time the schedule elapses and receives the
    /// generation it was installed with. It is responsible for taking the
    /// owning lock and checking [`is_current`](Self::is_current).
    /// Returning `ControlFlow::Break` stops a repeating timer.
    pub fn install<F>(
        &mut self,
        runtime: &Handle,
        key: K,
        schedule: Schedule,
        on_fire: F,
    ) -> JoinHandle<()>
    where
        F: FnMut(u64) -> ControlFlow<()> + Send + 'static,
    {
        self.cancel(&key);

        let generation = self.next_generation;
        self.next_generation += 1;

        let (cancel, cancelled) = oneshot::channel();
        self.active.insert(key, Timer { generation, cancel });

        trace!(generation, ?schedule, "Installing timer");
        runtime.spawn(run_timer(schedule, generation, cancelled, on_fire))
    }

    // == Cancel ==
    /// Cancels the timer for `key`, if any. Returns whether one was live.
    pub fn cancel(&mut self, key: &K) -> bool {
        match self.active.remove(key) {
            Some(timer) => {
                timer.cancel();
                true
            }
            None => false,
        }
    }

    // == Cancel All ==
    /// Cancels every live timer.
    pub fn cancel_all(&mut self) {
        for (_, timer) in self.active.drain() {
            timer.cancel();
        }
    }

    // == Liveness ==
    /// Returns true if `generation` is still the live timer for `key`.
    pub fn is_current(&self, key: &K, generation: u64) -> bool {
        self.active
            .get(key)
            .is_some_and(|timer| timer.generation == generation)
    }

    /// Drops the record for `key` without signalling.
    ///
    /// Used by a one-shot timer that is finishing on its own.
    pub fn retire(&mut self, key: &K, generation: u64) {
        if self.is_current(key, generation) {
            self.active.remove(key);
        }
    }

    pub fn contains(&self, key: &K) -> bool {
        self.active.contains_key(key)
    }

    /// Number of live timers.
    pub fn len(&self) -> usize {
        self.active.len()
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }
}

// == Timer Task ==
async fn run_timer<F>(
    schedule: Schedule,
    generation: u64,
    mut cancelled: oneshot::Receiver<()>,
    mut on_fire: F,
) where
    F: FnMut(u64) -> ControlFlow<()>,
{
    let period = schedule.period();

    loop {
        tokio::select! {
            biased;
            // Fires on an explicit cancel and when the sender is dropped.
            _ = &mut cancelled => {
                trace!(generation, "Timer cancelled");
                return;
            }
            _ = tokio::time::sleep(period) => {}
        }

        if on_fire(generation).is_break() {
            return;
        }

        if let Schedule::Once(_) = schedule {
            return;
        }
    }
}
