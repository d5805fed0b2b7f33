use std::time::Duration;
use tokio::task::JoinHandle;

use crate::event::*;

/// Single-shot timer that reports [`Event::WatchdogFired`] once `interval`
/// passes without being disarmed or re-armed.
pub struct Watchdog {
    interval: Duration,
    events: EventSender,
    generation: u64,
    task: Option<JoinHandle<()>>,
}

impl Watchdog {
    pub fn new(interval: Duration, events: EventSender) -> Self {
        Watchdog {
            interval,
            events,
            generation: 0,
            task: None,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn arm(&mut self) {
        self.disarm();
        self.generation += 1;

        let generation = self.generation;
        let interval = self.interval;
        let events = self.events.clone();
        self.task = Some(tokio::spawn(async move {
            tokio::time::sleep(interval).await;
            let _ = events.send(Event::WatchdogFired { generation });
        }));
    }

    pub fn disarm(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }

    pub fn is_armed(&self) -> bool {
        self.task.is_some()
    }

    /// Accept a fire event. False if it belongs to a cancelled deadline, which
    /// can happen when the fire was queued before a disarm.
    pub fn take_fired(&mut self, generation: u64) -> bool {
        if self.task.is_none() || generation != self.generation {
            log::debug!("Ignoring stale watchdog fire {}", generation);
            return false;
        }
        self.disarm();
        true
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}

impl Drop for Watchdog {
    fn drop(&mut self) {
        self.disarm();
    }
}
