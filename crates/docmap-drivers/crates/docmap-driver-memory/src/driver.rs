//! Memory driver implementation

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use bson::Document;
use docmap_core::{
    Collection, Connection, ConnectionFactory, DocmapError, DocumentStream, Namespace, Result,
    StoreDriver, UpdateOutcome,
};
use parking_lot::Mutex;

use crate::store::MemoryStore;

/// Name used for `memory://` with nothing after the scheme
pub const DEFAULT_STORE_NAME: &str = "default";

/// In-process store driver for `memory://<name>` URIs
///
/// Every URI with the same name resolves to the same [`MemoryStore`] for
/// the lifetime of the driver.
pub struct MemoryDriver {
    stores: Mutex<HashMap<String, MemoryStore>>,
}

impl MemoryDriver {
    pub fn new() -> Self {
        tracing::debug!("memory driver initialized");
        Self {
            stores: Mutex::new(HashMap::new()),
        }
    }

    /// The store behind `name`, created on first use
    pub fn store(&self, name: &str) -> MemoryStore {
        self.stores
            .lock()
            .entry(name.to_string())
            .or_insert_with(|| MemoryStore::new(name))
            .clone()
    }
}

impl Default for MemoryDriver {
    fn default() -> Self {
        Self::new()
    }
}

/// Extract the store name of a `memory://` URI
pub fn store_name(uri: &str) -> Option<&str> {
    let (scheme, rest) = uri.split_once("://")?;
    if !scheme.eq_ignore_ascii_case("memory") {
        return None;
    }
    let name = rest.split(['/', '?']).next().unwrap_or_default();
    Some(if name.is_empty() { DEFAULT_STORE_NAME } else { name })
}

#[async_trait]
impl StoreDriver for MemoryDriver {
    fn id(&self) -> &'static str {
        "memory"
    }

    fn display_name(&self) -> &'static str {
        "In-memory"
    }

    fn schemes(&self) -> &'static [&'static str] {
        &["memory"]
    }

    #[tracing::instrument(skip(self))]
    async fn connector(&self, uri: &str) -> Result<Arc<dyn ConnectionFactory>> {
        let name = store_name(uri).ok_or_else(|| {
            DocmapError::Configuration(format!("not a memory:// URI: {}", uri))
        })?;
        let factory: Arc<dyn ConnectionFactory> = Arc::new(MemoryConnectionFactory {
            store: self.store(name),
        });
        Ok(factory)
    }
}

/// Hands out connections to one memory store
pub struct MemoryConnectionFactory {
    store: MemoryStore,
}

impl MemoryConnectionFactory {
    pub fn new(store: MemoryStore) -> Self {
        Self { store }
    }
}

#[async_trait]
impl ConnectionFactory for MemoryConnectionFactory {
    async fn create(&self) -> Result<Arc<dyn Connection>> {
        Ok(Arc::new(MemoryConnection {
            store: self.store.clone(),
            closed: AtomicBool::new(false),
        }))
    }
}

pub struct MemoryConnection {
    store: MemoryStore,
    closed: AtomicBool,
}

impl MemoryConnection {
    pub fn store(&self) -> &MemoryStore {
        &self.store
    }
}

#[async_trait]
impl Connection for MemoryConnection {
    fn driver_name(&self) -> &str {
        "memory"
    }

    fn collection(&self, namespace: &Namespace) -> Result<Box<dyn Collection>> {
        if self.is_closed() {
            return Err(DocmapError::Connection("connection is closed".to_string()));
        }
        Ok(Box::new(MemoryCollection {
            namespace: namespace.clone(),
            store: self.store.clone(),
        }))
    }

    async fn close(&self) -> Result<()> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

pub struct MemoryCollection {
    namespace: Namespace,
    store: MemoryStore,
}

#[async_trait]
impl Collection for MemoryCollection {
    fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    async fn insert_one(&self, document: Document) -> Result<()> {
        self.store.insert(&self.namespace, document)
    }

    async fn update_one(&self, filter: Document, update: Document) -> Result<UpdateOutcome> {
        self.store.update_one(&self.namespace, &filter, &update)
    }

    async fn delete_one(&self, filter: Document) -> Result<u64> {
        self.store.delete_one(&self.namespace, &filter)
    }

    async fn find(&self, filter: Document) -> Result<Box<dyn DocumentStream>> {
        let documents = self.store.find(&self.namespace, &filter)?;
        Ok(Box::new(MemoryDocumentStream {
            documents: documents.into(),
        }))
    }

    async fn count(&self, filter: Document) -> Result<u64> {
        self.store.count(&self.namespace, &filter)
    }
}

/// Results of a `find`, snapshotted when the query ran
pub struct MemoryDocumentStream {
    documents: VecDeque<Document>,
}

#[async_trait]
impl DocumentStream for MemoryDocumentStream {
    async fn next_document(&mut self) -> Result<Option<Document>> {
        Ok(self.documents.pop_front())
    }
}
