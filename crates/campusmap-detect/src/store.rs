//! The area store boundary.
//!
//! The detection core never persists anything itself. Callers hand
//! confirmed outlines to an [`AreaStore`], which only ever sees unit-space
//! polygons. [`InMemoryAreaStore`] is the reference implementation.

use std::collections::BTreeMap;

use crate::types::{Area, AreaId, UnitPolygon};

/// Errors reported by area stores.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Area names must contain at least one non-whitespace character.
    #[error("area name must not be empty")]
    InvalidName,

    /// The backing storage failed.
    #[error("area store backend failed: {0}")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Persistence for named building outlines.
pub trait AreaStore {
    /// Every stored area, ordered by name.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Backend`] if the storage cannot be read.
    fn list(&self) -> Result<Vec<Area>, StoreError>;

    /// Insert an area, or replace the outline of the area with this name.
    ///
    /// An existing area keeps its id and label centre; only its points
    /// are overwritten.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidName`] for a blank name and
    /// [`StoreError::Backend`] if the storage cannot be written.
    fn upsert(&mut self, name: &str, points: UnitPolygon) -> Result<Area, StoreError>;
}

/// Area store held in memory, keyed by name.
#[derive(Debug, Clone, Default)]
pub struct InMemoryAreaStore {
    areas: BTreeMap<String, Area>,
    next_id: u64,
}

impl InMemoryAreaStore {
    /// An empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A store seeded with existing rows. Later rows replace earlier ones
    /// with the same name; new ids continue after the largest seen.
    #[must_use]
    pub fn with_areas(areas: impl IntoIterator<Item = Area>) -> Self {
        let mut store = Self::new();
        for area in areas {
            store.next_id = store.next_id.max(area.id.0.saturating_add(1));
            store.areas.insert(area.name.clone(), area);
        }
        store
    }

    /// Number of stored areas.
    #[must_use]
    pub fn len(&self) -> usize {
        self.areas.len()
    }

    /// Returns `true` if nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.areas.is_empty()
    }

    /// The area stored under `name`, if any.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Area> {
        self.areas.get(name.trim())
    }
}

impl AreaStore for InMemoryAreaStore {
    fn list(&self) -> Result<Vec<Area>, StoreError> {
        Ok(self.areas.values().cloned().collect())
    }

    fn upsert(&mut self, name: &str, points: UnitPolygon) -> Result<Area, StoreError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(StoreError::InvalidName);
        }

        if let Some(existing) = self.areas.get_mut(name) {
            existing.points = points;
            tracing::debug!(id = %existing.id, name, "area outline replaced");
            return Ok(existing.clone());
        }

        let area = Area {
            id: AreaId(self.next_id),
            name: name.to_string(),
            points,
            center: None,
        };
        self.next_id += 1;
        tracing::debug!(id = %area.id, name, "area created");
        self.areas.insert(area.name.clone(), area.clone());
        Ok(area)
    }
}
