use std::{path::Path, time::Duration};
use tokio::task::JoinHandle;

use crate::{
    event::*,
    mount_point::{self, Device},
};

pub trait MountObserver: Send {
    /// Report once `path` is no longer on `device`.
    fn watch(&mut self, path: &Path, device: Device, attempt: Attempt);
    fn stop(&mut self);
}

pub struct PollingObserver {
    interval: Duration,
    events: EventSender,
    task: Option<JoinHandle<()>>,
}

impl PollingObserver {
    pub fn new(interval: Duration, events: EventSender) -> Self {
        PollingObserver {
            interval,
            events,
            task: None,
        }
    }
}

impl MountObserver for PollingObserver {
    fn watch(&mut self, path: &Path, device: Device, attempt: Attempt) {
        self.stop();

        let path = path.to_path_buf();
        let events = self.events.clone();
        let mut ticks = tokio::time::interval(self.interval);
        self.task = Some(tokio::spawn(async move {
            loop {
                ticks.tick().await;
                let target = path.clone();
                let mounted =
                    tokio::task::spawn_blocking(move || mount_point::is_mounted(&target, device))
                        .await
                        .unwrap_or(false);
                if mounted {
                    log::info!("{} is mounted", path.display());
                    let _ = events.send(Event::MountCompleted { attempt });
                    return;
                }
            }
        }));
    }

    fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl Drop for PollingObserver {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
pub mod testing {
    use super::*;
    use std::{
        path::PathBuf,
        sync::{Arc, Mutex},
    };

    #[derive(Debug, Default, Clone)]
    pub struct ManualObserver {
        pub watching: Arc<Mutex<Option<(PathBuf, Attempt)>>>,
    }

    impl MountObserver for ManualObserver {
        fn watch(&mut self, path: &Path, _device: Device, attempt: Attempt) {
            *self.watching.lock().unwrap() = Some((path.to_path_buf(), attempt));
        }

        fn stop(&mut self) {
            *self.watching.lock().unwrap() = None;
        }
    }
}
