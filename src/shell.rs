use async_trait::async_trait;
use std::{io, path::Path, process::Stdio};
use tokio::process::Command;

use crate::operating_system;

/// Desktop-shell sidebar registration. Failures are the shell's problem.
pub trait ShellFavorites: Send {
    fn add(&mut self, path: &Path);
    fn remove(&mut self, path: &Path);
}

#[derive(Debug, Default)]
pub struct NoFavorites;

impl ShellFavorites for NoFavorites {
    fn add(&mut self, path: &Path) {
        log::debug!("No shell to add {} to", path.display());
    }

    fn remove(&mut self, _path: &Path) {}
}

#[async_trait]
pub trait Unmounter: Send + Sync {
    async fn unmount(&self, path: &Path) -> io::Result<()>;
}

#[derive(Debug, Default)]
pub struct CommandUnmounter;

#[async_trait]
impl Unmounter for CommandUnmounter {
    async fn unmount(&self, path: &Path) -> io::Result<()> {
        let (program, args) = operating_system::unmount_command(path);
        log::info!("Unmounting {}", path.display());

        let output = Command::new(&program)
            .args(&args)
            .stdin(Stdio::null())
            .output()
            .await?;

        if output.status.success() {
            Ok(())
        } else {
            Err(io::Error::new(
                io::ErrorKind::Other,
                format!(
                    "{} exited with {}: {}",
                    program.display(),
                    output.status,
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
            ))
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::*;

    #[tokio::test]
    async fn unmounting_a_plain_dir_fails() {
        let dir = tempdir().unwrap();

        assert!(CommandUnmounter.unmount(dir.path()).await.is_err());
    }
}
