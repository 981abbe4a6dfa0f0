//! Shared in-memory document storage

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use bson::oid::ObjectId;
use bson::{Bson, Document};
use docmap_core::{DocmapError, ID_FIELD, Namespace, Result, UpdateOutcome};
use parking_lot::RwLock;

use crate::filter::{apply_update, check_filter, matches};

/// Documents of every collection behind one `memory://` name.
///
/// Cloning is cheap and every clone sees the same data.
#[derive(Clone)]
pub struct MemoryStore {
    inner: Arc<MemoryStoreInner>,
}

struct MemoryStoreInner {
    name: String,
    collections: RwLock<HashMap<Namespace, Vec<Document>>>,
    read_only: AtomicBool,
}

impl MemoryStore {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(MemoryStoreInner {
                name: name.into(),
                collections: RwLock::new(HashMap::new()),
                read_only: AtomicBool::new(false),
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Reject every write from now on (or accept them again)
    pub fn set_read_only(&self, read_only: bool) {
        self.inner.read_only.store(read_only, Ordering::SeqCst);
    }

    pub fn is_read_only(&self) -> bool {
        self.inner.read_only.load(Ordering::SeqCst)
    }

    /// Number of documents stored in `namespace`
    pub fn len(&self, namespace: &Namespace) -> usize {
        self.inner
            .collections
            .read()
            .get(namespace)
            .map_or(0, Vec::len)
    }

    pub fn is_empty(&self, namespace: &Namespace) -> bool {
        self.len(namespace) == 0
    }

    /// Drop every collection
    pub fn clear(&self) {
        self.inner.collections.write().clear();
    }

    pub(crate) fn insert(&self, namespace: &Namespace, mut document: Document) -> Result<()> {
        self.ensure_writable()?;

        let id = match document.get(ID_FIELD) {
            Some(id) => id.clone(),
            None => {
                let id = Bson::ObjectId(ObjectId::new());
                let mut with_id = Document::new();
                with_id.insert(ID_FIELD, id.clone());
                with_id.extend(document);
                document = with_id;
                id
            }
        };

        let mut collections = self.inner.collections.write();
        let documents = collections.entry(namespace.clone()).or_default();
        if documents.iter().any(|d| d.get(ID_FIELD) == Some(&id)) {
            return Err(DocmapError::Store(format!(
                "E11000 duplicate key error collection: {} dup key: {{ _id: {} }}",
                namespace, id
            )));
        }
        documents.push(document);
        Ok(())
    }

    pub(crate) fn update_one(
        &self,
        namespace: &Namespace,
        filter: &Document,
        update: &Document,
    ) -> Result<UpdateOutcome> {
        check_filter(filter)?;
        self.ensure_writable()?;

        let mut collections = self.inner.collections.write();
        let Some(target) = collections
            .get_mut(namespace)
            .and_then(|documents| documents.iter_mut().find(|d| matches(d, filter)))
        else {
            return Ok(UpdateOutcome::default());
        };

        // applied to a copy so a rejected update leaves the stored document intact
        let mut updated = target.clone();
        let changed = apply_update(&mut updated, update)?;
        if changed {
            *target = updated;
        }
        Ok(UpdateOutcome::new(1, u64::from(changed)))
    }

    pub(crate) fn delete_one(&self, namespace: &Namespace, filter: &Document) -> Result<u64> {
        check_filter(filter)?;
        self.ensure_writable()?;

        let mut collections = self.inner.collections.write();
        let Some(documents) = collections.get_mut(namespace) else {
            return Ok(0);
        };
        match documents.iter().position(|d| matches(d, filter)) {
            Some(index) => {
                documents.remove(index);
                Ok(1)
            }
            None => Ok(0),
        }
    }

    /// Snapshot of the matching documents, in insertion order
    pub(crate) fn find(&self, namespace: &Namespace, filter: &Document) -> Result<Vec<Document>> {
        check_filter(filter)?;
        Ok(self
            .inner
            .collections
            .read()
            .get(namespace)
            .map(|documents| {
                documents
                    .iter()
                    .filter(|d| matches(d, filter))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    pub(crate) fn count(&self, namespace: &Namespace, filter: &Document) -> Result<u64> {
        check_filter(filter)?;
        Ok(self
            .inner
            .collections
            .read()
            .get(namespace)
            .map_or(0, |documents| {
                documents.iter().filter(|d| matches(d, filter)).count() as u64
            }))
    }

    fn ensure_writable(&self) -> Result<()> {
        if self.is_read_only() {
            return Err(DocmapError::Store(format!(
                "memory store '{}' is read-only",
                self.inner.name
            )));
        }
        Ok(())
    }
}
