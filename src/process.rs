use std::{collections::BTreeMap, path::PathBuf, process::Stdio};
use tokio::{
    io::{AsyncRead, AsyncReadExt},
    process::{Child, Command},
    sync::oneshot,
};

use crate::{delegate::MountDelegate, error::*, event::*, operating_system, params::*};

const CHUNK_SIZE: usize = 4096;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommandSpec {
    pub executable: PathBuf,
    pub args: Vec<String>,
    /// `None` inherits the supervisor's environment.
    pub env: Option<BTreeMap<String, String>>,
}

pub fn command_spec(params: &Parameters, delegate: &dyn MountDelegate) -> Result<CommandSpec> {
    let misconfigured = |message: &str| Error::Delegate {
        type_id: delegate.type_id().to_string(),
        message: message.to_string(),
    };

    let executable = delegate
        .executable_path()
        .ok_or_else(|| misconfigured("no executable path"))?;

    let mut args = match delegate.task_arguments(params) {
        Some(args) if !args.is_empty() => args,
        _ => return Err(misconfigured("no task arguments")),
    };

    if let Some(advanced) = params.str(keys::ADVANCED_OPTIONS) {
        args.extend(advanced.split_whitespace().map(str::to_string));
    }
    args.extend(operating_system::finder_options(
        params.flag(keys::NEGATIVE_VNODE_CACHE),
        params.flag(keys::NO_APPLE_DOUBLE),
    ));

    Ok(CommandSpec {
        executable,
        args,
        env: delegate.task_environment(params),
    })
}

pub trait Launcher: Send {
    fn launch(&mut self, spec: &CommandSpec, attempt: Attempt) -> std::io::Result<()>;

    /// Force-terminate the most recently launched helper, if still running.
    fn kill(&mut self);
}

pub struct ProcessLauncher {
    events: EventSender,
    kill: Option<oneshot::Sender<()>>,
}

impl ProcessLauncher {
    pub fn new(events: EventSender) -> Self {
        ProcessLauncher { events, kill: None }
    }
}

impl Launcher for ProcessLauncher {
    fn launch(&mut self, spec: &CommandSpec, attempt: Attempt) -> std::io::Result<()> {
        let mut command = Command::new(&spec.executable);
        command
            .args(&spec.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(env) = &spec.env {
            command.env_clear().envs(env);
        }

        log::info!(
            "Launching {} {}",
            spec.executable.display(),
            spec.args.join(" ")
        );
        let mut child = command.spawn()?;

        if let Some(stdout) = child.stdout.take() {
            tokio::spawn(forward_output(stdout, attempt, self.events.clone()));
        }
        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(forward_output(stderr, attempt, self.events.clone()));
        }

        let (kill_tx, kill_rx) = oneshot::channel();
        self.kill = Some(kill_tx);
        tokio::spawn(observe_exit(child, kill_rx, attempt, self.events.clone()));

        Ok(())
    }

    fn kill(&mut self) {
        if let Some(kill) = self.kill.take() {
            // Already exited if the observer is gone.
            let _ = kill.send(());
        }
    }
}

async fn forward_output<R: AsyncRead + Unpin>(mut reader: R, attempt: Attempt, events: EventSender) {
    let mut buf = vec![0; CHUNK_SIZE];
    loop {
        match reader.read(&mut buf).await {
            Ok(0) => break,
            Ok(n) => {
                let chunk = buf[..n].to_vec();
                if events.send(Event::Output { attempt, chunk }).is_err() {
                    break;
                }
            }
            Err(e) => {
                log::warn!("Reading helper output: {}", e);
                break;
            }
        }
    }
}

async fn observe_exit(
    mut child: Child,
    kill: oneshot::Receiver<()>,
    attempt: Attempt,
    events: EventSender,
) {
    let status = tokio::select! {
        status = child.wait() => status,
        Ok(()) = kill => {
            log::warn!("Killing helper {:?}", child.id());
            if let Err(e) = child.start_kill() {
                log::warn!("Kill failed: {}", e);
            }
            child.wait().await
        }
    };

    let status = match status {
        Ok(status) => {
            log::info!("Helper exited: {}", status);
            Ok(status.code())
        }
        Err(e) => {
            log::error!("Waiting for helper: {}", e);
            Err(e.to_string())
        }
    };
    let _ = events.send(Event::Exited { attempt, status });
}
