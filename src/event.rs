/// Sequence number of a mount attempt. Events from older attempts are stale.
pub type Attempt = u64;

pub type EventSender = tokio::sync::mpsc::UnboundedSender<Event>;
pub type EventReceiver = tokio::sync::mpsc::UnboundedReceiver<Event>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Output { attempt: Attempt, chunk: Vec<u8> },

    /// The helper exited. `Err` when its exit could not be observed.
    Exited {
        attempt: Attempt,
        status: Result<Option<i32>, String>,
    },

    MountCompleted { attempt: Attempt },

    WatchdogFired { generation: u64 },
}

pub fn channel() -> (EventSender, EventReceiver) {
    tokio::sync::mpsc::unbounded_channel()
}
