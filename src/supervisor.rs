use futures::{future, Stream, StreamExt};
use tokio::sync::{mpsc, oneshot, watch};
use tokio_stream::wrappers::WatchStream;
use uuid::Uuid;

use crate::{config::Config, error::*, event::*, filesystem::*, params::Parameters};

pub struct Supervisor {
    config: Config,
    events: EventSender,
    receiver: EventReceiver,
}

impl Supervisor {
    pub fn new(config: Config) -> Self {
        let (events, receiver) = channel();
        Supervisor {
            config,
            events,
            receiver,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn events(&self) -> EventSender {
        self.events.clone()
    }

    pub fn services(&self) -> Services {
        Services::standard(&self.config, self.events())
    }

    /// Move `filesystem` into its control task. Every request and event is
    /// applied there, one at a time.
    pub fn start(self, filesystem: Filesystem) -> SupervisorHandle {
        let (commands, command_receiver) = mpsc::unbounded_channel();
        let (snapshots, snapshot_receiver) = watch::channel(filesystem.snapshot());

        let control = Control {
            filesystem,
            snapshots,
        };
        tokio::spawn(control.run(self.receiver, command_receiver));

        SupervisorHandle {
            commands,
            snapshots: snapshot_receiver,
        }
    }
}

enum Command {
    Mount(oneshot::Sender<Result<()>>),
    Unmount,
    ReplaceParameters(Parameters, oneshot::Sender<Result<()>>),
    SetPauseTimeout(bool),
}

struct Control {
    filesystem: Filesystem,
    snapshots: watch::Sender<Snapshot>,
}

impl Control {
    async fn run(
        mut self,
        mut events: EventReceiver,
        mut commands: mpsc::UnboundedReceiver<Command>,
    ) {
        loop {
            tokio::select! {
                Some(event) = events.recv() => {
                    self.filesystem.handle(event);
                    self.publish();
                }
                command = commands.recv() => match command {
                    Some(command) => self.apply(command),
                    None => break,
                }
            }
        }
        log::debug!("{}: Control task finished", self.filesystem.id());
    }

    fn apply(&mut self, command: Command) {
        match command {
            Command::Mount(reply) => {
                let result = self.filesystem.mount();
                self.publish();
                let _closed = reply.send(result);
            }
            Command::Unmount => self.filesystem.unmount(),
            Command::ReplaceParameters(params, reply) => {
                let result = self.filesystem.replace_parameters(params);
                self.publish();
                let _closed = reply.send(result);
            }
            Command::SetPauseTimeout(pause) => {
                self.filesystem.set_pause_timeout(pause);
                self.publish();
            }
        }
    }

    fn publish(&self) {
        self.snapshots.send_replace(self.filesystem.snapshot());
    }
}

#[derive(Clone)]
pub struct SupervisorHandle {
    commands: mpsc::UnboundedSender<Command>,
    snapshots: watch::Receiver<Snapshot>,
}

impl SupervisorHandle {
    pub fn id(&self) -> Uuid {
        self.snapshots.borrow().id
    }

    pub fn snapshot(&self) -> Snapshot {
        self.snapshots.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Snapshot> {
        self.snapshots.clone()
    }

    pub fn statuses(&self) -> impl Stream<Item = Status> {
        let mut last = None;
        WatchStream::new(self.subscribe()).filter_map(move |snapshot| {
            let status = snapshot.status;
            let changed = last.replace(status) != Some(status);
            future::ready(changed.then_some(status))
        })
    }

    pub async fn wait_for(&self, pred: impl Fn(Status) -> bool) -> anyhow::Result<Status> {
        let statuses = self.statuses();
        futures::pin_mut!(statuses);
        while let Some(status) = statuses.next().await {
            if pred(status) {
                return Ok(status);
            }
        }
        anyhow::bail!("supervisor stopped")
    }

    pub async fn mount(&self) -> anyhow::Result<()> {
        let (reply, result) = oneshot::channel();
        self.send(Command::Mount(reply))?;
        Ok(result.await??)
    }

    pub fn unmount(&self) -> anyhow::Result<()> {
        self.send(Command::Unmount)
    }

    pub async fn replace_parameters(&self, params: Parameters) -> anyhow::Result<()> {
        let (reply, result) = oneshot::channel();
        self.send(Command::ReplaceParameters(params, reply))?;
        Ok(result.await??)
    }

    pub fn set_pause_timeout(&self, pause: bool) -> anyhow::Result<()> {
        self.send(Command::SetPauseTimeout(pause))
    }

    fn send(&self, command: Command) -> anyhow::Result<()> {
        self.commands
            .send(command)
            .map_err(|_| anyhow::anyhow!("supervisor stopped"))
    }
}
