//! Test doubles shared by the pool and manager tests

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use docmap_core::{
    Collection, Connection, ConnectionFactory, DocmapError, Document, DocumentStream, Namespace,
    Result, StoreDriver, UpdateOutcome,
};

/// Mock connection for testing
pub(crate) struct MockConnection {
    closed: AtomicBool,
}

impl MockConnection {
    pub(crate) fn new() -> Self {
        Self {
            closed: AtomicBool::new(false),
        }
    }
}

#[async_trait]
impl Connection for MockConnection {
    fn driver_name(&self) -> &str {
        "mock"
    }

    fn collection(&self, namespace: &Namespace) -> Result<Box<dyn Collection>> {
        Ok(Box::new(MockCollection {
            namespace: namespace.clone(),
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

/// Collection that holds nothing
pub(crate) struct MockCollection {
    namespace: Namespace,
}

#[async_trait]
impl Collection for MockCollection {
    fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    async fn insert_one(&self, _document: Document) -> Result<()> {
        Ok(())
    }

    async fn update_one(&self, _filter: Document, _update: Document) -> Result<UpdateOutcome> {
        Ok(UpdateOutcome::default())
    }

    async fn delete_one(&self, _filter: Document) -> Result<u64> {
        Ok(0)
    }

    async fn find(&self, _filter: Document) -> Result<Box<dyn DocumentStream>> {
        Err(DocmapError::Driver("mock collections hold no documents".into()))
    }

    async fn count(&self, _filter: Document) -> Result<u64> {
        Ok(0)
    }
}

/// Mock factory that counts connections created
pub(crate) struct MockConnectionFactory {
    counter: AtomicUsize,
    fail: AtomicBool,
    delay_ms: AtomicU64,
}

impl MockConnectionFactory {
    pub(crate) fn new() -> Self {
        Self {
            counter: AtomicUsize::new(0),
            fail: AtomicBool::new(false),
            delay_ms: AtomicU64::new(0),
        }
    }

    pub(crate) fn count(&self) -> usize {
        self.counter.load(Ordering::SeqCst)
    }

    pub(crate) fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    /// Make every `create` sleep before answering, like a slow server
    pub(crate) fn set_delay(&self, delay: Duration) {
        self.delay_ms.store(delay.as_millis() as u64, Ordering::SeqCst);
    }
}

#[async_trait]
impl ConnectionFactory for MockConnectionFactory {
    async fn create(&self) -> Result<Arc<dyn Connection>> {
        let delay_ms = self.delay_ms.load(Ordering::SeqCst);
        if delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(delay_ms)).await;
        }
        if self.fail.load(Ordering::SeqCst) {
            return Err(DocmapError::Connection("connection refused".into()));
        }
        self.counter.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::new(MockConnection::new()))
    }
}

/// Driver handing out one shared mock factory.
///
/// `connector` fails with a connection error for the first
/// `failures_before_success` calls.
pub(crate) struct MockDriver {
    pub(crate) factory: Arc<MockConnectionFactory>,
    connector_calls: AtomicUsize,
    failures_before_success: usize,
}

impl MockDriver {
    pub(crate) fn new() -> Self {
        Self::failing(0)
    }

    pub(crate) fn failing(failures_before_success: usize) -> Self {
        Self {
            factory: Arc::new(MockConnectionFactory::new()),
            connector_calls: AtomicUsize::new(0),
            failures_before_success,
        }
    }

    pub(crate) fn connector_calls(&self) -> usize {
        self.connector_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StoreDriver for MockDriver {
    fn id(&self) -> &'static str {
        "mock"
    }

    fn display_name(&self) -> &'static str {
        "Mock"
    }

    fn schemes(&self) -> &'static [&'static str] {
        &["mock"]
    }

    async fn connector(&self, uri: &str) -> Result<Arc<dyn ConnectionFactory>> {
        let call = self.connector_calls.fetch_add(1, Ordering::SeqCst);
        if !self.accepts(uri) {
            return Err(DocmapError::Configuration(format!("unsupported URI: {}", uri)));
        }
        if call < self.failures_before_success {
            return Err(DocmapError::Connection("server selection failed".into()));
        }
        let factory: Arc<dyn ConnectionFactory> = self.factory.clone();
        Ok(factory)
    }
}
