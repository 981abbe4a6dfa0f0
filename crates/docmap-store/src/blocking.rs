//! Synchronous facade over [`DocumentStore`]
//!
//! Every call is driven to completion on the shared driver runtime, so these
//! types must not be used from inside an async context.

use docmap_connection::{PoolStats, StoreConfig};
use docmap_core::{Document, DocmapError, OrderedMap, Result, UpdateOutcome};
use docmap_drivers::{DriverRegistry, block_on_tokio, get_tokio_runtime};

use crate::cursor::Cursor;
use crate::store::DocumentStore;

/// Blocking counterpart of [`DocumentStore`]
pub struct BlockingStore {
    // always `Some` until dropped
    inner: Option<DocumentStore>,
}

impl BlockingStore {
    pub fn new(store: DocumentStore) -> Self {
        Self { inner: Some(store) }
    }

    pub fn from_config(config: StoreConfig, registry: &DriverRegistry) -> Result<Self> {
        Ok(Self::new(DocumentStore::from_config(config, registry)?))
    }

    pub fn inner(&self) -> Result<&DocumentStore> {
        self.inner
            .as_ref()
            .ok_or_else(|| DocmapError::Driver("store has been released".to_string()))
    }

    pub fn commit(&self, map: &OrderedMap) -> Result<Option<String>> {
        let store = self.inner()?;
        block_on_tokio(store.commit(map))?
    }

    pub fn update(&self, old: &OrderedMap, new: &OrderedMap) -> Result<UpdateOutcome> {
        let store = self.inner()?;
        block_on_tokio(store.update(old, new))?
    }

    pub fn delete(&self, filter: &OrderedMap) -> Result<u64> {
        let store = self.inner()?;
        block_on_tokio(store.delete(filter))?
    }

    pub fn query(&self, filter: &OrderedMap) -> Result<BlockingCursor> {
        let store = self.inner()?;
        let cursor = block_on_tokio(store.query(filter))??;
        Ok(BlockingCursor {
            cursor: Some(cursor),
        })
    }

    pub fn count(&self, filter: &OrderedMap) -> Result<u64> {
        let store = self.inner()?;
        block_on_tokio(store.count(filter))?
    }

    pub fn find_one(&self, filter: &OrderedMap) -> Result<Option<OrderedMap>> {
        let store = self.inner()?;
        block_on_tokio(store.find_one(filter))?
    }

    pub fn destroy(&self) -> Result<()> {
        let store = self.inner()?;
        block_on_tokio(store.destroy())
    }

    pub fn stats(&self) -> Option<PoolStats> {
        self.inner.as_ref().and_then(DocumentStore::stats)
    }
}

impl Drop for BlockingStore {
    fn drop(&mut self) {
        drop_in_runtime(self.inner.take());
    }
}

/// Blocking counterpart of [`Cursor`]
pub struct BlockingCursor {
    cursor: Option<Cursor>,
}

impl BlockingCursor {
    pub fn next_document(&mut self) -> Result<Option<Document>> {
        let cursor = self.cursor_mut()?;
        block_on_tokio(cursor.next_document())?
    }

    pub fn next_map(&mut self) -> Result<Option<OrderedMap>> {
        let cursor = self.cursor_mut()?;
        block_on_tokio(cursor.next_map())?
    }

    pub fn collect_maps(mut self) -> Result<Vec<OrderedMap>> {
        let mut maps = Vec::new();
        while let Some(map) = self.next_map()? {
            maps.push(map);
        }
        Ok(maps)
    }

    pub fn returned(&self) -> u64 {
        self.cursor.as_ref().map_or(0, Cursor::returned)
    }

    /// Release the cursor and its connection now
    pub fn close(self) {
        drop(self);
    }

    fn cursor_mut(&mut self) -> Result<&mut Cursor> {
        self.cursor
            .as_mut()
            .ok_or_else(|| DocmapError::Driver("cursor has been released".to_string()))
    }
}

impl Drop for BlockingCursor {
    fn drop(&mut self) {
        drop_in_runtime(self.cursor.take());
    }
}

/// Drop `value` with the shared runtime entered.
///
/// Driver handles may spawn cleanup tasks when released.
fn drop_in_runtime<T>(value: Option<T>) {
    let Some(value) = value else {
        return;
    };
    match get_tokio_runtime() {
        Ok(runtime) => {
            let _enter = runtime.enter();
            drop(value);
        }
        Err(e) => {
            tracing::warn!(error = %e, "no runtime available while releasing store handle");
            drop(value);
        }
    }
}
