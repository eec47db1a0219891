//! Area store backed by a JSON file.
//!
//! The file holds a JSON array of [`Area`] rows. It is read once on open
//! and rewritten whole after every upsert.

use std::io;
use std::path::{Path, PathBuf};

use campusmap_detect::{Area, AreaStore, InMemoryAreaStore, StoreError, UnitPolygon};

fn backend(err: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> StoreError {
    StoreError::Backend(err.into())
}

/// [`AreaStore`] persisted to a single JSON file.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    areas: InMemoryAreaStore,
}

impl JsonFileStore {
    /// Open the store at `path`. A missing file is an empty store; it is
    /// created on the first upsert.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Backend`] if the file exists but cannot be
    /// read or is not a JSON array of areas.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let rows: Vec<Area> = match std::fs::read(&path) {
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(backend)?,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::warn!(path = %path.display(), "area store not found, starting empty");
                Vec::new()
            }
            Err(e) => return Err(backend(e)),
        };
        tracing::debug!(path = %path.display(), areas = rows.len(), "area store opened");
        Ok(Self {
            path,
            areas: InMemoryAreaStore::with_areas(rows),
        })
    }

    /// Location of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn save(&self) -> Result<(), StoreError> {
        let json = serde_json::to_vec_pretty(&self.areas.list()?).map_err(backend)?;
        std::fs::write(&self.path, json).map_err(backend)
    }
}

impl AreaStore for JsonFileStore {
    fn list(&self) -> Result<Vec<Area>, StoreError> {
        self.areas.list()
    }

    fn upsert(&mut self, name: &str, points: UnitPolygon) -> Result<Area, StoreError> {
        let area = self.areas.upsert(name, points)?;
        self.save()?;
        Ok(area)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use campusmap_detect::UnitPoint;

    use super::*;

    /// A fresh path in the temp dir, removed if left over from a
    /// previous run.
    fn scratch(name: &str) -> PathBuf {
        let path =
            std::env::temp_dir().join(format!("campusmap-{}-{name}.json", std::process::id()));
        let _ = std::fs::remove_file(&path);
        path
    }

    fn triangle() -> UnitPolygon {
        UnitPolygon::new(vec![
            UnitPoint::new(0.1, 0.1),
            UnitPoint::new(0.4, 0.1),
            UnitPoint::new(0.1, 0.4),
        ])
        .unwrap()
    }

    #[test]
    fn missing_file_opens_empty() {
        let path = scratch("missing");
        let store = JsonFileStore::open(&path).unwrap();
        assert!(store.list().unwrap().is_empty());
        assert!(!path.exists());
    }

    #[test]
    fn upsert_persists_across_reopen() {
        let path = scratch("persist");
        let mut store = JsonFileStore::open(&path).unwrap();
        let created = store.upsert("Library", triangle()).unwrap();

        let reopened = JsonFileStore::open(&path).unwrap();
        let areas = reopened.list().unwrap();
        assert_eq!(areas.len(), 1);
        assert_eq!(areas[0].id, created.id);
        assert_eq!(areas[0].points, triangle());
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn reopened_store_continues_ids() {
        let path = scratch("ids");
        let mut store = JsonFileStore::open(&path).unwrap();
        let first = store.upsert("Arts", triangle()).unwrap();

        let mut reopened = JsonFileStore::open(&path).unwrap();
        let second = reopened.upsert("Gym", triangle()).unwrap();
        assert_ne!(first.id, second.id);
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn corrupt_file_is_a_backend_error() {
        let path = scratch("corrupt");
        std::fs::write(&path, b"{ not json").unwrap();
        assert!(matches!(
            JsonFileStore::open(&path),
            Err(StoreError::Backend(_))
        ));
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn out_of_range_point_is_rejected_on_load() {
        let path = scratch("range");
        std::fs::write(
            &path,
            br#"[{"id":1,"name":"Bad","points":[[0.1,0.1],[1.5,0.1],[0.1,0.4]]}]"#,
        )
        .unwrap();
        assert!(matches!(
            JsonFileStore::open(&path),
            Err(StoreError::Backend(_))
        ));
        std::fs::remove_file(&path).unwrap();
    }
}
