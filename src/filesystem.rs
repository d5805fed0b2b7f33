use serde::{Deserialize, Serialize};
use std::{
    fmt,
    path::{Path, PathBuf},
    sync::Arc,
};
use url::Url;
use uuid::Uuid;

use crate::{
    config::Config,
    delegate::{MountDelegate, Registry},
    error::*,
    event::*,
    log_err,
    mount_point::{self, OwnershipMarker, XattrMarker},
    mount_watch::{MountObserver, PollingObserver},
    output::CapturedOutput,
    params::*,
    process::{self, Launcher, ProcessLauncher},
    shell::{CommandUnmounter, NoFavorites, ShellFavorites, Unmounter},
    store::{self, Store},
    validate,
    watchdog::Watchdog,
};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Status {
    #[default]
    Unmounted,
    Waiting,
    Mounted,
    Failed,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Status::Unmounted => "unmounted",
            Status::Waiting => "waiting",
            Status::Mounted => "mounted",
            Status::Failed => "failed",
        };
        f.write_str(s)
    }
}

pub struct Services {
    pub launcher: Box<dyn Launcher>,
    pub watchdog: Watchdog,
    pub observer: Box<dyn MountObserver>,
    pub unmounter: Arc<dyn Unmounter>,
    pub marker: Arc<dyn OwnershipMarker>,
    pub favorites: Box<dyn ShellFavorites>,
    pub store: Option<Store>,
    pub output_capacity: usize,
}

impl Services {
    pub fn standard(config: &Config, events: EventSender) -> Self {
        Services {
            launcher: Box::new(ProcessLauncher::new(events.clone())),
            watchdog: Watchdog::new(config.mount_timeout, events.clone()),
            observer: Box::new(PollingObserver::new(config.mount_poll_interval, events)),
            unmounter: Arc::new(CommandUnmounter),
            marker: Arc::new(XattrMarker),
            favorites: Box::new(NoFavorites),
            store: Some(Store::new(&config.storage_dir)),
            output_capacity: config.output_capacity,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Snapshot {
    pub id: Uuid,
    pub status: Status,
    pub error: Option<Error>,
    pub output: String,
    pub mount_path: Option<PathBuf>,
    pub pause_timeout: bool,
}

pub struct Filesystem {
    id: Uuid,
    params: Parameters,
    persistent: bool,
    status: Status,
    error: Option<Error>,
    output: CapturedOutput,
    pause_timeout: bool,
    delegate: Arc<dyn MountDelegate>,
    attempt: Attempt,
    active_mount_path: Option<PathBuf>,
    unsaved: bool,
    services: Services,
}

impl fmt::Debug for Filesystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Filesystem")
            .field("id", &self.id)
            .field("type", &self.delegate.type_id())
            .field("status", &self.status)
            .field("persistent", &self.persistent)
            .finish()
    }
}

impl Filesystem {
    pub fn new(
        params: Parameters,
        delegate: Arc<dyn MountDelegate>,
        persistent: bool,
        services: Services,
    ) -> Result<Self> {
        let id = Uuid::new_v4();

        let mut params = validate::implied_parameters(&params, &*delegate);
        params.set(keys::TYPE_ID, delegate.type_id());
        params.set(keys::UUID, id.to_string());
        validate::validate(&params, &*delegate)?;

        let mut fs = Filesystem::assemble(id, params, delegate, persistent, services);
        fs.save();
        log::info!("Created {}", fs.id);
        Ok(fs)
    }

    pub fn from_url(
        url: &Url,
        delegate: Arc<dyn MountDelegate>,
        persistent: bool,
        services: Services,
    ) -> Result<Self> {
        let params = delegate.parameters_for_url(url)?;
        Filesystem::new(params, delegate, persistent, services)
    }

    pub fn from_stored_file(
        path: impl AsRef<Path>,
        registry: &Registry,
        services: Services,
    ) -> Result<Self> {
        let params = store::read_parameters(path.as_ref())?;

        let type_id = params.str(keys::TYPE_ID).ok_or(Error::MissingPluginId)?;
        let delegate = registry
            .get(type_id)
            .ok_or_else(|| Error::InvalidPluginId(type_id.to_string()))?;

        let id = params
            .str(keys::UUID)
            .and_then(|s| Uuid::parse_str(s).ok())
            .ok_or_else(|| {
                Error::DataUnreadable(format!("{} has no identity", path.as_ref().display()))
            })?;

        Ok(Filesystem::assemble(id, params, delegate, true, services))
    }

    fn assemble(
        id: Uuid,
        params: Parameters,
        delegate: Arc<dyn MountDelegate>,
        persistent: bool,
        services: Services,
    ) -> Self {
        Filesystem {
            id,
            params,
            persistent,
            status: Status::Unmounted,
            error: None,
            output: CapturedOutput::with_capacity(services.output_capacity),
            pause_timeout: false,
            delegate,
            attempt: 0,
            active_mount_path: None,
            unsaved: false,
            services,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn error(&self) -> Option<&Error> {
        self.error.as_ref()
    }

    pub fn output(&self) -> &str {
        self.output.as_str()
    }

    pub fn parameters(&self) -> &Parameters {
        &self.params
    }

    pub fn mount_path(&self) -> Option<PathBuf> {
        self.params.mount_path()
    }

    pub fn is_persistent(&self) -> bool {
        self.persistent
    }

    pub fn pause_timeout(&self) -> bool {
        self.pause_timeout
    }

    pub fn delegate(&self) -> &dyn MountDelegate {
        &*self.delegate
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            id: self.id,
            status: self.status,
            error: self.error.clone(),
            output: self.output.as_str().to_string(),
            mount_path: self.mount_path(),
            pause_timeout: self.pause_timeout,
        }
    }

    /// Start a mount attempt. Errors are returned only when the attempt could
    /// not be described at all; runtime failures show up as [`Status::Failed`].
    pub fn mount(&mut self) -> Result<()> {
        if matches!(self.status, Status::Waiting | Status::Mounted) {
            log::debug!("{}: Already {}", self.id, self.status);
            return Ok(());
        }

        let spec = process::command_spec(&self.params, &*self.delegate)?;
        let mount_path = self
            .mount_path()
            .ok_or_else(|| Error::MissingParameter(keys::MOUNT_PATH.to_string()))?;

        // A fresh attempt clears the previous failure.
        self.error = None;
        self.set_status(Status::Unmounted);
        self.output.clear();
        self.attempt += 1;

        let device = match mount_point::prepare(&mount_path) {
            Ok(device) => device,
            Err(reason) => {
                log::warn!("{}: {}: {}", self.id, mount_path.display(), reason);
                mount_point::cleanup(&mount_path, &*self.services.marker);
                self.fail(Error::mount_failure(self.id, reason));
                return Ok(());
            }
        };
        self.services.marker.mark(&mount_path, self.id);
        self.active_mount_path = Some(mount_path.clone());

        if let Err(e) = self.services.launcher.launch(&spec, self.attempt) {
            log::error!("{}: Launching helper: {}", self.id, e);
            self.fail_runtime(FailureReason::ProcessLaunchFailed(e.to_string()));
            return Ok(());
        }

        self.services.observer.watch(&mount_path, device, self.attempt);
        self.set_status(Status::Waiting);
        self.services.watchdog.arm();
        Ok(())
    }

    pub fn unmount(&self) {
        let path = match self.active_mount_path.clone().or_else(|| self.mount_path()) {
            Some(path) => path,
            None => return,
        };

        let unmounter = Arc::clone(&self.services.unmounter);
        let id = self.id;
        tokio::spawn(async move {
            if let Err(e) = unmounter.unmount(&path).await {
                log::warn!("{}: Unmount of {} failed: {}", id, path.display(), e);
            }
        });
    }

    pub fn replace_parameters(&mut self, params: Parameters) -> Result<()> {
        let mut params = validate::implied_parameters(&params, &*self.delegate);
        params.set(keys::TYPE_ID, self.delegate.type_id());
        params.set(keys::UUID, self.id.to_string());
        validate::validate(&params, &*self.delegate)?;

        if params == self.params {
            return Ok(());
        }
        self.params = params;
        self.save();
        Ok(())
    }

    /// Setting either value restarts the running attempt's deadline.
    pub fn set_pause_timeout(&mut self, pause: bool) {
        self.pause_timeout = pause;
        if self.status == Status::Waiting {
            self.services.watchdog.arm();
        }
    }

    pub fn handle(&mut self, event: Event) {
        match event {
            Event::Output { attempt, chunk } => {
                if attempt == self.attempt {
                    self.output.push_bytes(&chunk);
                }
            }
            Event::Exited { attempt, status } => {
                if attempt != self.attempt {
                    log::debug!("{}: Ignoring exit of attempt {}", self.id, attempt);
                    return;
                }
                self.helper_exited(status);
            }
            Event::MountCompleted { attempt } => {
                if attempt == self.attempt && self.status == Status::Waiting {
                    self.set_status(Status::Mounted);
                }
            }
            Event::WatchdogFired { generation } => self.watchdog_fired(generation),
        }
    }

    fn helper_exited(&mut self, status: Result<Option<i32>, String>) {
        match (self.status, status) {
            (Status::Waiting, Err(message)) => {
                self.fail_runtime(FailureReason::ProcessTerminatedUnexpectedly(message))
            }
            (Status::Waiting, Ok(_)) | (Status::Mounted, _) => self.set_status(Status::Unmounted),
            (other, _) => log::debug!("{}: Helper exited while {}", self.id, other),
        }
    }

    fn watchdog_fired(&mut self, generation: u64) {
        if !self.services.watchdog.take_fired(generation) {
            return;
        }
        if self.pause_timeout {
            log::debug!("{}: Timeout paused", self.id);
            self.services.watchdog.arm();
            return;
        }
        if self.status != Status::Waiting {
            return;
        }

        log::warn!(
            "{}: Mount timed out after {:?}",
            self.id,
            self.services.watchdog.interval()
        );
        self.services.launcher.kill();
        self.fail_runtime(FailureReason::TimedOut);
    }

    fn fail_runtime(&mut self, reason: FailureReason) {
        let error = self
            .delegate
            .error_from_output(&self.params, self.output.as_str())
            .unwrap_or_else(|| Error::mount_failure(self.id, reason));
        self.fail(error);
    }

    fn fail(&mut self, error: Error) {
        log::error!("{}: {}", self.id, error);
        self.error = Some(error);
        self.set_status(Status::Failed);
    }

    fn set_status(&mut self, status: Status) {
        if status == self.status {
            return;
        }
        let old = std::mem::replace(&mut self.status, status);
        log::info!("{}: {} -> {}", self.id, old, status);

        let show_in_favorites = self.params.flag(keys::ADD_TO_FAVORITES);
        match status {
            Status::Waiting => {}
            Status::Mounted => {
                self.services.watchdog.disarm();
                self.services.observer.stop();
                if let (true, Some(path)) = (show_in_favorites, &self.active_mount_path) {
                    self.services.favorites.add(path);
                }
            }
            Status::Unmounted | Status::Failed => {
                self.services.watchdog.disarm();
                self.services.observer.stop();
                if let Some(path) = self.active_mount_path.take() {
                    if show_in_favorites {
                        self.services.favorites.remove(&path);
                    }
                    mount_point::cleanup(&path, &*self.services.marker);
                }
                if self.unsaved {
                    self.save();
                }
            }
        }
    }

    fn save(&mut self) {
        if !self.persistent {
            return;
        }
        let store = match &self.services.store {
            Some(store) => store,
            None => {
                log::warn!("{}: Persistent but no store configured", self.id);
                return;
            }
        };
        self.unsaved = log_err!(store.save(self.id, &self.params)).is_none();
    }
}
