use std::{
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
};
use uuid::Uuid;

use crate::{error::*, params::*};

const EXTENSION: &str = "cbor";

#[derive(Clone, Debug)]
pub struct Store {
    dir: PathBuf,
}

impl Store {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Store {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, id: Uuid) -> PathBuf {
        self.dir.join(format!("{}.{}", id, EXTENSION))
    }

    pub fn save(&self, id: Uuid, params: &Parameters) -> anyhow::Result<()> {
        fs::create_dir_all(&self.dir)?;
        let bytes = serde_cbor::to_vec(params)?;

        let path = self.path_for(id);
        match fs::remove_file(&path) {
            Err(e) if e.kind() != ErrorKind::NotFound => return Err(e.into()),
            _ => {}
        }
        fs::write(&path, bytes)?;

        log::debug!("Saved {}", path.display());
        Ok(())
    }

    pub fn remove(&self, id: Uuid) -> anyhow::Result<()> {
        match fs::remove_file(self.path_for(id)) {
            Err(e) if e.kind() == ErrorKind::NotFound => {
                anyhow::bail!("no stored filesystem {}", id)
            }
            result => Ok(result?),
        }
    }

    pub fn list(&self) -> anyhow::Result<Vec<PathBuf>> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut paths = Vec::new();
        for entry in entries {
            let path = entry?.path();
            if path.extension().map_or(false, |ext| ext == EXTENSION) {
                paths.push(path);
            }
        }
        paths.sort();
        Ok(paths)
    }
}

pub fn read_parameters(path: impl AsRef<Path>) -> Result<Parameters> {
    let bytes = fs::read(path)?;
    Ok(serde_cbor::from_slice(&bytes)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::*;

    fn params() -> Parameters {
        [
            (keys::VOLUME_NAME, Value::from("vol")),
            (keys::ADD_TO_FAVORITES, Value::from(true)),
            ("port", Value::from(2222i64)),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn save_then_read() {
        let dir = tempdir().unwrap();
        let store = Store::new(dir.path());
        let id = Uuid::new_v4();

        store.save(id, &params()).unwrap();

        assert_eq!(read_parameters(store.path_for(id)), Ok(params()));
    }

    #[test]
    fn save_replaces() {
        let dir = tempdir().unwrap();
        let store = Store::new(dir.path().join("nested"));
        let id = Uuid::new_v4();
        store.save(id, &params()).unwrap();

        let mut changed = params();
        changed.set(keys::VOLUME_NAME, "other");
        store.save(id, &changed).unwrap();

        assert_eq!(read_parameters(store.path_for(id)), Ok(changed));
        assert_eq!(store.list().unwrap().len(), 1);
    }

    #[test]
    fn distinct_paths_per_identity() {
        let store = Store::new("/somewhere");

        assert_ne!(store.path_for(Uuid::new_v4()), store.path_for(Uuid::new_v4()));
    }

    #[test]
    fn list_only_stored_files() {
        let dir = tempdir().unwrap();
        let store = Store::new(dir.path());
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        store.save(a, &params()).unwrap();
        store.save(b, &params()).unwrap();
        fs::write(dir.path().join("notes.txt"), b"x").unwrap();

        let mut expected = vec![store.path_for(a), store.path_for(b)];
        expected.sort();
        assert_eq!(store.list().unwrap(), expected);
    }

    #[test]
    fn list_missing_dir() {
        let dir = tempdir().unwrap();

        assert!(Store::new(dir.path().join("missing")).list().unwrap().is_empty());
    }

    #[test]
    fn remove() {
        let dir = tempdir().unwrap();
        let store = Store::new(dir.path());
        let id = Uuid::new_v4();
        store.save(id, &params()).unwrap();

        store.remove(id).unwrap();

        assert!(!store.path_for(id).exists());
        assert!(store.remove(id).is_err());
    }

    #[test]
    fn unreadable_data() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.cbor");
        fs::write(&path, b"\xff\xff not cbor").unwrap();

        assert!(matches!(read_parameters(&path), Err(Error::DataUnreadable(_))));
        assert!(matches!(
            read_parameters(dir.path().join("missing.cbor")),
            Err(Error::DataUnreadable(_))
        ));
    }
}
