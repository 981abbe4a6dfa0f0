//! Connection, collection and result-stream traits implemented by drivers

use std::sync::Arc;

use async_trait::async_trait;
use bson::Document;

use crate::{Namespace, Result};

/// A single live connection to a document store
#[async_trait]
pub trait Connection: Send + Sync {
    /// Get the driver name (e.g., "mongodb", "memory")
    fn driver_name(&self) -> &str;

    /// Resolve a collection handle bound to this connection.
    ///
    /// This is a local lookup; no round trip to the server is made.
    fn collection(&self, namespace: &Namespace) -> Result<Box<dyn Collection>>;

    /// Round-trip to the server to check the connection is usable
    async fn ping(&self) -> Result<()> {
        Ok(())
    }

    /// Close the connection
    async fn close(&self) -> Result<()>;

    /// Check if the connection is closed
    fn is_closed(&self) -> bool;
}

/// Counts reported by a single-document update
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdateOutcome {
    /// Documents matched by the filter (0 or 1)
    pub matched: u64,
    /// Documents actually changed (0 or 1)
    pub modified: u64,
}

impl UpdateOutcome {
    pub fn new(matched: u64, modified: u64) -> Self {
        Self { matched, modified }
    }

    /// Whether the filter selected a document
    pub fn is_match(&self) -> bool {
        self.matched > 0
    }
}

/// A collection handle scoped to the connection that resolved it
#[async_trait]
pub trait Collection: Send + Sync {
    fn namespace(&self) -> &Namespace;

    /// Insert one document
    async fn insert_one(&self, document: Document) -> Result<()>;

    /// Update the first document matching `filter`, without upsert.
    ///
    /// When every top-level key of `update` is an update operator
    /// (`$set`, `$unset`, ...) it is applied as an operator update,
    /// otherwise `update` replaces the matched document.
    async fn update_one(&self, filter: Document, update: Document) -> Result<UpdateOutcome>;

    /// Remove at most one document matching `filter`, returning the count removed
    async fn delete_one(&self, filter: Document) -> Result<u64>;

    /// Find every document matching `filter`, streamed from the server
    async fn find(&self, filter: Document) -> Result<Box<dyn DocumentStream>>;

    /// Count documents matching `filter`
    async fn count(&self, filter: Document) -> Result<u64>;
}

/// Server-side result iterator
#[async_trait]
pub trait DocumentStream: Send {
    /// Fetch the next document, `None` once the results are exhausted
    async fn next_document(&mut self) -> Result<Option<Document>>;
}

/// Whether `update` should be applied with update operators rather than as a
/// replacement document
pub fn is_operator_update(update: &Document) -> bool {
    !update.is_empty() && update.keys().all(|k| k.starts_with('$'))
}

/// Factory for creating new connections, bound to one parsed store URI
#[async_trait]
pub trait ConnectionFactory: Send + Sync + 'static {
    /// Create a new connection
    async fn create(&self) -> Result<Arc<dyn Connection>>;

    /// Validate that a connection is still usable
    ///
    /// Default implementation only checks that it has not been closed.
    async fn validate(&self, conn: &dyn Connection) -> bool {
        !conn.is_closed()
    }
}

#[async_trait]
impl<T: ConnectionFactory> ConnectionFactory for Arc<T> {
    async fn create(&self) -> Result<Arc<dyn Connection>> {
        (**self).create().await
    }

    async fn validate(&self, conn: &dyn Connection) -> bool {
        (**self).validate(conn).await
    }
}
