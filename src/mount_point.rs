use std::{
    fs::{self, OpenOptions},
    io::ErrorKind,
    os::unix::fs::MetadataExt,
    path::Path,
};
use uuid::Uuid;

use crate::error::FailureReason;

pub const OWNER_ATTRIBUTE: &str = "user.mountkeeper.owner";

pub type Device = u64;

pub trait OwnershipMarker: Send + Sync {
    fn mark(&self, path: &Path, owner: Uuid);
    fn clear(&self, path: &Path);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoMarker;

impl OwnershipMarker for NoMarker {
    fn mark(&self, _path: &Path, _owner: Uuid) {}
    fn clear(&self, _path: &Path) {}
}

#[derive(Debug, Default, Clone, Copy)]
pub struct XattrMarker;

impl OwnershipMarker for XattrMarker {
    fn mark(&self, path: &Path, owner: Uuid) {
        if let Err(e) = xattr::set(path, OWNER_ATTRIBUTE, owner.to_string().as_bytes()) {
            log::debug!("Not marking {}: {}", path.display(), e);
        }
    }

    fn clear(&self, path: &Path) {
        if let Err(e) = xattr::remove(path, OWNER_ATTRIBUTE) {
            log::debug!("Not unmarking {}: {}", path.display(), e);
        }
    }
}

/// Make `path` usable as an empty, writable mount point. Returns the device
/// the directory lives on before anything is mounted there.
pub fn prepare(path: &Path) -> Result<Device, FailureReason> {
    match fs::metadata(path) {
        Ok(meta) if meta.is_dir() => {
            if !is_empty_dir(path) {
                return Err(FailureReason::MountPointInUse);
            }
            if !is_writable(path) {
                return Err(FailureReason::MountPointNotWritable);
            }
            Ok(meta.dev())
        }
        Ok(_) => Err(FailureReason::MountPointIsFile),
        Err(e) if e.kind() == ErrorKind::NotFound => {
            fs::create_dir_all(path)
                .and_then(|()| fs::metadata(path))
                .map(|meta| meta.dev())
                .map_err(|e| {
                    log::warn!("Creating mount point {}: {}", path.display(), e);
                    FailureReason::MountPointUncreatable
                })
        }
        Err(e) => {
            log::warn!("Inspecting mount point {}: {}", path.display(), e);
            Err(FailureReason::MountPointUncreatable)
        }
    }
}

pub fn cleanup(path: &Path, marker: &dyn OwnershipMarker) {
    marker.clear(path);

    let is_dir = fs::metadata(path).map(|m| m.is_dir()).unwrap_or(false);
    if !is_dir || !is_empty_dir(path) {
        return;
    }
    match fs::remove_dir(path) {
        Ok(()) => log::debug!("Removed mount point {}", path.display()),
        Err(e) => log::warn!("Removing mount point {}: {}", path.display(), e),
    }
}

/// Unreadable directories count as non-empty.
fn is_empty_dir(path: &Path) -> bool {
    match fs::read_dir(path) {
        Ok(mut entries) => entries.next().is_none(),
        Err(_) => false,
    }
}

fn is_writable(path: &Path) -> bool {
    let scratch = path.join(format!(".mountkeeper-{}", Uuid::new_v4()));
    match OpenOptions::new().write(true).create_new(true).open(&scratch) {
        Ok(_) => {
            if let Err(e) = fs::remove_file(&scratch) {
                log::warn!("Removing {}: {}", scratch.display(), e);
            }
            true
        }
        Err(_) => false,
    }
}

/// True once `path` no longer lives on the device [`prepare`] saw.
pub fn is_mounted(path: &Path, before: Device) -> bool {
    fs::metadata(path)
        .map(|meta| meta.dev() != before)
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::*;

    #[test]
    fn empty_dir_is_ok() {
        let dir = tempdir().unwrap();

        assert_eq!(
            prepare(dir.path()),
            Ok(fs::metadata(dir.path()).unwrap().dev())
        );
        assert!(is_empty_dir(dir.path()));
    }

    #[test]
    fn non_empty_dir_is_in_use() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("file"), b"x").unwrap();

        assert_eq!(prepare(dir.path()), Err(FailureReason::MountPointInUse));
    }

    #[test]
    fn file_is_rejected() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("file");
        fs::write(&file, b"x").unwrap();

        assert_eq!(prepare(&file), Err(FailureReason::MountPointIsFile));
    }

    #[test]
    fn missing_dir_is_created() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("a/b/c");

        assert!(prepare(&path).is_ok());
        assert!(path.is_dir());
    }

    #[test]
    fn uncreatable_dir() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("file");
        fs::write(&file, b"x").unwrap();

        assert_eq!(
            prepare(&file.join("below")),
            Err(FailureReason::MountPointUncreatable)
        );
    }

    #[test]
    fn read_only_dir_is_not_writable() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempdir().unwrap();
        let path = dir.path().join("ro");
        fs::create_dir(&path).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o555)).unwrap();

        // Root ignores permission bits.
        if fs::write(path.join("check"), b"x").is_ok() {
            return;
        }

        assert_eq!(prepare(&path), Err(FailureReason::MountPointNotWritable));
        assert!(is_empty_dir(&path));

        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    }

    #[test]
    fn cleanup_removes_empty_dir() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("mnt");
        prepare(&path).unwrap();

        cleanup(&path, &NoMarker);

        assert!(!path.exists());
    }

    #[test]
    fn cleanup_keeps_non_empty_dir() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("file"), b"x").unwrap();

        cleanup(dir.path(), &NoMarker);

        assert!(dir.path().join("file").exists());
    }

    #[test]
    fn cleanup_ignores_files_and_missing_paths() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("file");
        fs::write(&file, b"x").unwrap();

        cleanup(&file, &XattrMarker);
        cleanup(&dir.path().join("missing"), &XattrMarker);

        assert!(file.exists());
    }

    #[test]
    fn marker_round_trip() {
        let dir = tempdir().unwrap();
        let owner = Uuid::new_v4();

        XattrMarker.mark(dir.path(), owner);
        // Not every filesystem takes user attributes.
        if let Ok(Some(value)) = xattr::get(dir.path(), OWNER_ATTRIBUTE) {
            assert_eq!(value, owner.to_string().into_bytes());
        }

        XattrMarker.clear(dir.path());
        assert!(matches!(xattr::get(dir.path(), OWNER_ATTRIBUTE), Ok(None) | Err(_)));
    }

    #[test]
    fn prepared_dir_is_not_a_mount() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("mnt");

        let device = prepare(&path).unwrap();

        assert!(!is_mounted(&path, device));
    }

    #[test]
    fn existing_mount_point_is_judged_against_its_own_device() {
        let root = Path::new("/");
        let device = fs::metadata(root).unwrap().dev();

        assert!(!is_mounted(root, device));
        assert!(is_mounted(root, device.wrapping_add(1)));
    }
}
