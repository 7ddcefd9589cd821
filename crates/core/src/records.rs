//! Generic in-memory record table used by the in-memory store adapters.

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::entity::Entity;
use crate::error::StoreError;

/// In-memory table of entities keyed by their identifier.
///
/// Intended for tests/dev and the default wiring. Every method takes the lock
/// once, so each call is atomic on its own.
#[derive(Debug)]
pub struct InMemoryRecords<E>
where
    E: Entity,
{
    inner: RwLock<HashMap<E::Id, E>>,
}

impl<E> Default for InMemoryRecords<E>
where
    E: Entity,
{
    fn default() -> Self {
        Self {
            inner: RwLock::new(HashMap::new()),
        }
    }
}

impl<E> InMemoryRecords<E>
where
    E: Entity + Clone,
{
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, HashMap<E::Id, E>>, StoreError> {
        self.inner
            .read()
            .map_err(|_| StoreError::Unavailable(format!("{} table lock poisoned", E::KIND)))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, HashMap<E::Id, E>>, StoreError> {
        self.inner
            .write()
            .map_err(|_| StoreError::Unavailable(format!("{} table lock poisoned", E::KIND)))
    }

    pub fn get(&self, id: &E::Id) -> Result<Option<E>, StoreError> {
        Ok(self.read()?.get(id).cloned())
    }

    /// Insert a new record; fails if the id is already present.
    pub fn insert(&self, record: E) -> Result<(), StoreError> {
        let mut map = self.write()?;
        let id = record.id().clone();
        if map.contains_key(&id) {
            return Err(StoreError::Duplicate(format!("{} {id}", E::KIND)));
        }
        map.insert(id, record);
        Ok(())
    }

    /// Insert a batch of new records; nothing is written if any id is taken.
    pub fn insert_all(&self, records: Vec<E>) -> Result<(), StoreError> {
        let mut map = self.write()?;
        for record in &records {
            if map.contains_key(record.id()) {
                return Err(StoreError::Duplicate(format!("{} {}", E::KIND, record.id())));
            }
        }
        for record in records {
            map.insert(record.id().clone(), record);
        }
        Ok(())
    }

    /// Replace an existing record; fails if it is absent.
    pub fn update(&self, record: E) -> Result<(), StoreError> {
        let mut map = self.write()?;
        let id = record.id().clone();
        match map.get_mut(&id) {
            Some(slot) => {
                *slot = record;
                Ok(())
            }
            None => Err(StoreError::Missing(format!("{} {id}", E::KIND))),
        }
    }

    pub fn upsert(&self, record: E) -> Result<(), StoreError> {
        self.write()?.insert(record.id().clone(), record);
        Ok(())
    }

    pub fn remove(&self, id: &E::Id) -> Result<Option<E>, StoreError> {
        Ok(self.write()?.remove(id))
    }

    /// Remove every record matching `predicate`, returning how many went.
    pub fn remove_where(&self, predicate: impl Fn(&E) -> bool) -> Result<usize, StoreError> {
        let mut map = self.write()?;
        let before = map.len();
        map.retain(|_, record| !predicate(record));
        Ok(before - map.len())
    }

    pub fn filter(&self, predicate: impl Fn(&E) -> bool) -> Result<Vec<E>, StoreError> {
        Ok(self
            .read()?
            .values()
            .filter(|record| predicate(record))
            .cloned()
            .collect())
    }

    pub fn list(&self) -> Result<Vec<E>, StoreError> {
        self.filter(|_| true)
    }
}
