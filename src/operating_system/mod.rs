#[cfg(target_os = "macos")]
pub use self::macos::*;

#[cfg(all(target_family = "unix", not(target_os = "macos")))]
pub use self::unix::*;

#[cfg(target_os = "macos")]
mod macos {
    use std::path::*;

    pub fn default_mount_root() -> PathBuf {
        PathBuf::from("/Volumes")
    }

    pub fn unmount_command(mount_path: &Path) -> (PathBuf, Vec<std::ffi::OsString>) {
        (
            PathBuf::from("/sbin/umount"),
            vec![mount_path.as_os_str().to_owned()],
        )
    }

    pub fn finder_options(negative_vnode_cache: bool, no_apple_double: bool) -> Vec<String> {
        let mut options = Vec::new();
        if negative_vnode_cache {
            options.push("-onegative_vncache".to_string());
        }
        if no_apple_double {
            options.push("-onoappledouble".to_string());
        }
        options
    }

    pub fn volume_name_option(volume: &str) -> Option<String> {
        Some(format!("-ovolname={}", volume))
    }
}

#[cfg(all(target_family = "unix", not(target_os = "macos")))]
mod unix {
    use std::path::*;

    pub fn default_mount_root() -> PathBuf {
        directories::UserDirs::new()
            .map(|dirs| dirs.home_dir().join("mnt"))
            .unwrap_or_else(|| PathBuf::from("/mnt"))
    }

    pub fn unmount_command(mount_path: &Path) -> (PathBuf, Vec<std::ffi::OsString>) {
        (
            PathBuf::from("fusermount"),
            vec!["-u".into(), mount_path.as_os_str().to_owned()],
        )
    }

    // libfuse rejects the macFUSE-only options.
    pub fn finder_options(_negative_vnode_cache: bool, _no_apple_double: bool) -> Vec<String> {
        Vec::new()
    }

    pub fn volume_name_option(_volume: &str) -> Option<String> {
        None
    }
}

pub fn find_executable(name: &str) -> Option<std::path::PathBuf> {
    let path = std::env::var_os("PATH")?;
    std::env::split_paths(&path)
        .map(|dir| dir.join(name))
        .find(|candidate| candidate.is_file())
}
