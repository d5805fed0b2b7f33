use futures::StreamExt;
use structopt::*;
use url::Url;
use uuid::Uuid;

use crate::{
    config::Config,
    delegate::Registry,
    filesystem::{Filesystem, Status},
    params::Value,
    store::Store,
    supervisor::{Supervisor, SupervisorHandle},
};

#[derive(StructOpt, Debug)]
pub struct MountCommand {
    /// Filesystem to mount. The scheme picks the mount type.
    pub url: Url,

    /// Keep the filesystem's parameters for `mount-stored`.
    #[structopt(long)]
    pub persist: bool,

    /// Never give up waiting for the mount to appear.
    #[structopt(long)]
    pub pause_timeout: bool,

    /// Extra parameters as key=value.
    #[structopt(short = "o", long = "option", number_of_values = 1)]
    pub options: Vec<String>,
}

impl MountCommand {
    pub async fn run(&self, config: Config) -> anyhow::Result<()> {
        let registry = Registry::builtin();
        let delegate = registry.for_url(&self.url)?;

        let mut params = delegate.parameters_for_url(&self.url)?;
        for option in &self.options {
            let (key, value) = option
                .split_once('=')
                .ok_or_else(|| anyhow::anyhow!("Expected key=value, got {:?}", option))?;
            params.set(key, Value::parse(value));
        }

        let supervisor = Supervisor::new(config);
        let fs = Filesystem::new(params, delegate, self.persist, supervisor.services())?;
        if self.persist {
            log::info!("Stored as {}", fs.id());
        }

        let handle = supervisor.start(fs);
        if self.pause_timeout {
            handle.set_pause_timeout(true)?;
        }
        supervise(handle).await
    }
}

#[derive(StructOpt, Debug)]
pub struct MountStoredCommand {
    /// Identity printed by `list`.
    pub id: Uuid,
}

impl MountStoredCommand {
    pub async fn run(&self, config: Config) -> anyhow::Result<()> {
        let path = Store::new(&config.storage_dir).path_for(self.id);
        if !path.exists() {
            anyhow::bail!("No stored filesystem {}", self.id);
        }

        let supervisor = Supervisor::new(config);
        let fs = Filesystem::from_stored_file(&path, &Registry::builtin(), supervisor.services())?;
        supervise(supervisor.start(fs)).await
    }
}

/// Mount, then stay until the filesystem is unmounted. Ctrl-C asks the
/// platform to unmount.
pub async fn supervise(handle: SupervisorHandle) -> anyhow::Result<()> {
    handle.mount().await?;

    // The mount reply follows Waiting, so any later Unmounted ends this attempt.
    let statuses = handle.statuses();
    futures::pin_mut!(statuses);

    let ctrl_c = tokio::signal::ctrl_c();
    futures::pin_mut!(ctrl_c);
    let mut interrupted = false;

    loop {
        tokio::select! {
            status = statuses.next() => match status {
                Some(Status::Waiting) => log::info!("Waiting for {} to mount", handle.id()),
                Some(Status::Mounted) => {
                    if let Some(path) = handle.snapshot().mount_path {
                        log::info!("Mounted at {}", path.display());
                    }
                }
                Some(Status::Unmounted) => {
                    log::info!("Unmounted");
                    return Ok(());
                }
                Some(Status::Failed) => {
                    let snapshot = handle.snapshot();
                    for line in snapshot.output.lines() {
                        log::warn!("helper: {}", line);
                    }
                    return match snapshot.error {
                        Some(e) => Err(e.into()),
                        None => Err(anyhow::anyhow!("Mount failed")),
                    };
                }
                None => anyhow::bail!("Supervisor stopped"),
            },
            result = &mut ctrl_c, if !interrupted => {
                result?;
                interrupted = true;
                log::info!("Interrupted, unmounting");
                handle.unmount()?;
            }
        }
    }
}
