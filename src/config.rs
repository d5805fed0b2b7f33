use std::{path::PathBuf, time::Duration};

use crate::{output, PROJECT_DIRS};

pub const DEFAULT_MOUNT_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(250);

#[derive(Clone, Debug)]
pub struct Config {
    /// How long a mount may stay waiting before it fails.
    pub mount_timeout: Duration,
    pub mount_poll_interval: Duration,
    pub output_capacity: usize,
    pub storage_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            mount_timeout: DEFAULT_MOUNT_TIMEOUT,
            mount_poll_interval: DEFAULT_POLL_INTERVAL,
            output_capacity: output::DEFAULT_CAPACITY,
            storage_dir: PROJECT_DIRS.data_dir().join("filesystems"),
        }
    }
}
