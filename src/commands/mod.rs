use std::{path::PathBuf, time::Duration};
use structopt::*;

use crate::config::Config;

mod mount;
pub use mount::*;

mod stored;
pub use stored::*;

#[derive(StructOpt, Debug)]
#[structopt(about = "Mount remote filesystems through helper processes.")]
pub struct Options {
    /// Directory holding persistent filesystems.
    #[structopt(long, parse(from_os_str))]
    pub storage_dir: Option<PathBuf>,

    /// Seconds a mount may stay waiting before it fails.
    #[structopt(long, default_value = "30")]
    pub timeout_secs: u64,

    /// Log level spec, e.g. `debug` or `mountkeeper::process=trace`.
    #[structopt(long, default_value = "info")]
    pub log: String,

    /// Command to run.
    #[structopt(subcommand)]
    pub command: Command,
}

impl Options {
    pub fn config(&self) -> Config {
        let mut config = Config {
            mount_timeout: Duration::from_secs(self.timeout_secs),
            ..Config::default()
        };
        if let Some(dir) = &self.storage_dir {
            config.storage_dir = dir.clone();
        }
        config
    }
}

#[derive(StructOpt, Debug)]
pub enum Command {
    /// Mount the filesystem described by a URL, e.g. sshfs://user@host/path.
    Mount(MountCommand),

    /// Mount a previously persisted filesystem.
    MountStored(MountStoredCommand),

    /// List persisted filesystems.
    List(ListCommand),

    /// Delete a persisted filesystem.
    Forget(ForgetCommand),
}

impl Command {
    pub async fn run(&self, options: &Options) -> anyhow::Result<()> {
        let config = options.config();
        match self {
            Command::Mount(cmd) => cmd.run(config).await,
            Command::MountStored(cmd) => cmd.run(config).await,
            Command::List(cmd) => cmd.run(config),
            Command::Forget(cmd) => cmd.run(config),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_mount() {
        let options = Options::from_iter_safe([
            "mountkeeper",
            "--timeout-secs",
            "5",
            "mount",
            "sshfs://me@example.com/home/me",
            "--persist",
            "-o",
            "port=2222",
        ])
        .unwrap();

        assert_eq!(options.config().mount_timeout, Duration::from_secs(5));
        match options.command {
            Command::Mount(cmd) => {
                assert_eq!(cmd.url.scheme(), "sshfs");
                assert!(cmd.persist);
                assert_eq!(cmd.options, vec!["port=2222".to_string()]);
            }
            other => panic!("Unexpected command {:?}", other),
        }
    }

    #[test]
    fn storage_dir_overrides_default() {
        let options =
            Options::from_iter_safe(["mountkeeper", "--storage-dir", "/tmp/stored", "list"])
                .unwrap();

        assert_eq!(options.config().storage_dir, PathBuf::from("/tmp/stored"));
    }

    #[test]
    fn rejects_bad_uuid() {
        assert!(Options::from_iter_safe(["mountkeeper", "forget", "not-a-uuid"]).is_err());
    }
}
