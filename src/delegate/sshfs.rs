use percent_encoding::percent_decode_str;
use std::path::PathBuf;
use url::Url;
use uuid::Uuid;

use super::*;
use crate::operating_system;

pub const HOST: &str = "host";
pub const USER: &str = "user";
pub const PORT: &str = "port";
pub const REMOTE_PATH: &str = "path";

const DEFAULT_PORT: i64 = 22;

/// Known helper messages, checked in order.
const OUTPUT_ERRORS: &[(&str, &str)] = &[
    ("Permission denied", "authentication failed"),
    ("Connection refused", "connection refused by server"),
    ("Could not resolve hostname", "unknown host"),
    ("No such file or directory", "remote path does not exist"),
    ("remote host has disconnected", "remote host disconnected"),
];

#[derive(Debug, Default)]
pub struct Sshfs {
    pub executable: Option<PathBuf>,
}

impl MountDelegate for Sshfs {
    fn type_id(&self) -> &str {
        "sshfs"
    }

    fn default_parameters(&self) -> Parameters {
        [(PORT, Value::Int(DEFAULT_PORT))].into_iter().collect()
    }

    fn derived_parameters(&self, params: &Parameters) -> Parameters {
        let mut derived = Parameters::new();
        let volume = params
            .str(keys::VOLUME_NAME)
            .or_else(|| params.str(HOST))
            .map(str::to_string);

        if let Some(volume) = volume {
            let mount_path = operating_system::default_mount_root().join(&volume);
            derived.set(keys::VOLUME_NAME, volume.as_str());
            derived.set(keys::NAME, volume.as_str());
            derived.set(keys::MOUNT_PATH, mount_path.to_string_lossy().into_owned());
        }
        derived
    }

    fn task_arguments(&self, params: &Parameters) -> Option<Vec<String>> {
        let host = params.str(HOST)?;
        let mount_path = params.str(keys::MOUNT_PATH)?;

        let remote = match params.str(USER) {
            Some(user) => format!("{}@{}", user, host),
            None => host.to_string(),
        };
        let remote_path = params.str(REMOTE_PATH).unwrap_or_default();

        let mut args = vec![
            format!("{}:{}", remote, remote_path),
            mount_path.to_string(),
            "-p".to_string(),
            params.get(PORT)?.to_string(),
            "-f".to_string(),
        ];
        if let Some(option) = params
            .str(keys::VOLUME_NAME)
            .and_then(operating_system::volume_name_option)
        {
            args.push(option);
        }
        Some(args)
    }

    fn executable_path(&self) -> Option<PathBuf> {
        self.executable
            .clone()
            .or_else(|| operating_system::find_executable("sshfs"))
    }

    fn validate(&self, params: &Parameters) -> Result<()> {
        match params.str(HOST) {
            Some(host) if !host.is_empty() => {}
            _ => return Err(Error::MissingParameter(HOST.to_string())),
        }

        match params.get(PORT) {
            None => Ok(()),
            Some(Value::Int(port)) if (1..=65535).contains(port) => Ok(()),
            Some(other) => Err(Error::InvalidParameterValue {
                key: PORT.to_string(),
                message: format!("{} is not a TCP port", other),
            }),
        }
    }

    fn error_from_output(&self, params: &Parameters, output: &str) -> Option<Error> {
        let (_, message) = OUTPUT_ERRORS
            .iter()
            .find(|(needle, _)| output.contains(needle))?;
        let fs_id = params
            .str(keys::UUID)
            .and_then(|s| Uuid::parse_str(s).ok())
            .unwrap_or_else(Uuid::nil);

        Some(Error::mount_failure(
            fs_id,
            FailureReason::DelegateReported(message.to_string()),
        ))
    }

    fn url_schemes(&self) -> Vec<String> {
        vec!["sshfs".to_string(), "ssh".to_string()]
    }

    fn parameters_for_url(&self, url: &Url) -> Result<Parameters> {
        if !self.url_schemes().iter().any(|s| s == url.scheme()) {
            return Err(Error::InvalidParameterValue {
                key: "url".to_string(),
                message: format!("unsupported scheme {:?}", url.scheme()),
            });
        }

        let host = url
            .host_str()
            .ok_or_else(|| Error::MissingParameter(HOST.to_string()))?;

        let mut params = Parameters::new();
        params.set(HOST, host);
        if !url.username().is_empty() {
            params.set(USER, decoded(url.username()));
        }
        if let Some(port) = url.port() {
            params.set(PORT, port as i64);
        }
        if url.path() != "/" && !url.path().is_empty() {
            params.set(REMOTE_PATH, decoded(url.path()));
        }
        Ok(params)
    }
}

fn decoded(text: &str) -> String {
    percent_decode_str(text).decode_utf8_lossy().into_owned()
}
