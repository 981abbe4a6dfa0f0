//! Document operations

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use docmap_connection::{PoolManager, PoolStats, StoreConfig, WriteMode};
use docmap_core::codec::{document_into_map, map_to_document};
use docmap_core::oid::generate_oid;
use docmap_core::{DocmapError, ID_FIELD, OrderedMap, Result, UpdateOutcome};
use docmap_drivers::DriverRegistry;
use tokio_util::sync::CancellationToken;

use crate::cursor::Cursor;

/// Map-based access to one collection of a document store
///
/// Cheap to share behind an `Arc`; every operation borrows its own pooled
/// connection.
pub struct DocumentStore {
    manager: Arc<PoolManager>,
    cancel: CancellationToken,
}

impl DocumentStore {
    /// Create a store over an existing pool manager
    pub fn new(manager: Arc<PoolManager>) -> Self {
        Self {
            manager,
            cancel: CancellationToken::new(),
        }
    }

    /// Build a store for `config`, picking the driver by URI scheme
    pub fn from_config(config: StoreConfig, registry: &DriverRegistry) -> Result<Self> {
        let uri = config
            .uri()
            .filter(|uri| !uri.trim().is_empty())
            .ok_or_else(|| DocmapError::Configuration("store URI is not set".to_string()))?;
        let driver = registry.for_uri(uri)?;
        let manager = PoolManager::new(config, driver)?;
        Ok(Self::new(Arc::new(manager)))
    }

    /// Abort operations with [`DocmapError::Cancelled`] once `token` fires
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn manager(&self) -> &Arc<PoolManager> {
        &self.manager
    }

    pub fn stats(&self) -> Option<PoolStats> {
        self.manager.stats()
    }

    /// Close the pool; the next operation builds a new one
    pub async fn destroy(&self) {
        self.manager.destroy().await;
    }

    /// Insert `map` as a new document under a freshly generated id.
    ///
    /// Returns the 24-character hex id. If the store rejects the insert the
    /// error is returned, or in [`WriteMode::BestEffort`] logged and reported
    /// as `Ok(None)`.
    pub async fn commit(&self, map: &OrderedMap) -> Result<Option<String>> {
        let mut document = map_to_document(map)?;
        let oid = generate_oid();
        document.insert(ID_FIELD, oid);

        let result = self
            .guarded("commit", async move {
                let connection = self.manager.connect().await?;
                let collection = self.manager.get_collection(&connection)?;
                let inserted = collection.insert_one(document).await;
                self.manager.disconnect(connection, collection);
                inserted
            })
            .await;

        match result {
            Ok(()) => {
                let id = oid.to_hex();
                tracing::debug!(
                    database = %self.manager.namespace().database(),
                    collection = %self.manager.namespace().collection(),
                    id = %id,
                    "document committed"
                );
                Ok(Some(id))
            }
            Err(e) => self.write_failure("commit", e, None),
        }
    }

    /// Update the first document matching `old` with `new`.
    ///
    /// When every key of `new` is an update operator the fields are modified
    /// in place, otherwise `new` replaces the document. Nothing is inserted
    /// when no document matches.
    pub async fn update(&self, old: &OrderedMap, new: &OrderedMap) -> Result<UpdateOutcome> {
        let filter = map_to_document(old)?;
        let update = map_to_document(new)?;

        let result = self
            .guarded("update", async move {
                let connection = self.manager.connect().await?;
                let collection = self.manager.get_collection(&connection)?;
                let updated = collection.update_one(filter, update).await;
                self.manager.disconnect(connection, collection);
                updated
            })
            .await;

        match result {
            Ok(outcome) => {
                tracing::debug!(
                    matched = outcome.matched,
                    modified = outcome.modified,
                    "document updated"
                );
                Ok(outcome)
            }
            Err(e) => self.write_failure("update", e, UpdateOutcome::default()),
        }
    }

    /// Remove at most one document matching `filter`, returning how many
    /// were removed
    pub async fn delete(&self, filter: &OrderedMap) -> Result<u64> {
        let filter = map_to_document(filter)?;

        let result = self
            .guarded("delete", async move {
                let connection = self.manager.connect().await?;
                let collection = self.manager.get_collection(&connection)?;
                let deleted = collection.delete_one(filter).await;
                self.manager.disconnect(connection, collection);
                deleted
            })
            .await;

        match result {
            Ok(count) => {
                tracing::debug!(count, "documents deleted");
                Ok(count)
            }
            Err(e) => self.write_failure("delete", e, 0),
        }
    }

    /// Find every document matching `filter`.
    ///
    /// The returned cursor holds a pooled connection until it is closed or
    /// dropped.
    pub async fn query(&self, filter: &OrderedMap) -> Result<Cursor> {
        let filter = map_to_document(filter)?;

        self.guarded("query", async move {
            let connection = self.manager.connect().await?;
            let collection = self.manager.get_collection(&connection)?;
            let stream = collection.find(filter).await?;
            tracing::debug!(
                database = %self.manager.namespace().database(),
                collection = %self.manager.namespace().collection(),
                "query opened"
            );
            Ok(Cursor::new(
                stream,
                collection,
                connection,
                self.operation_timeout(),
                self.cancel.clone(),
            ))
        })
        .await
    }

    /// Count documents matching `filter`
    pub async fn count(&self, filter: &OrderedMap) -> Result<u64> {
        let filter = map_to_document(filter)?;

        let count = self
            .guarded("count", async move {
                let connection = self.manager.connect().await?;
                let collection = self.manager.get_collection(&connection)?;
                let counted = collection.count(filter).await;
                self.manager.disconnect(connection, collection);
                counted
            })
            .await?;

        tracing::debug!(count, "documents counted");
        Ok(count)
    }

    /// First document matching `filter`, decoded into a map
    pub async fn find_one(&self, filter: &OrderedMap) -> Result<Option<OrderedMap>> {
        let mut cursor = self.query(filter).await?;
        let first = cursor.next_document().await?;
        cursor.close();
        first.as_ref().map(document_into_map).transpose()
    }

    fn operation_timeout(&self) -> Duration {
        self.manager.config().operation_timeout()
    }

    async fn guarded<T, F>(&self, operation: &'static str, future: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        run_guarded(&self.cancel, self.operation_timeout(), operation, future).await
    }

    fn write_failure<T>(&self, operation: &'static str, error: DocmapError, fallback: T) -> Result<T> {
        let best_effort = self.manager.config().write_mode() == WriteMode::BestEffort;
        if best_effort && matches!(error, DocmapError::Store(_)) {
            tracing::warn!(operation, error = %error, "store rejected write, continuing");
            return Ok(fallback);
        }
        tracing::error!(operation, error = %error, "store write failed");
        Err(error)
    }
}

/// Run `future` unless `cancel` fires or `timeout` elapses first.
///
/// Dropping the future on either path releases any connection it holds.
pub(crate) async fn run_guarded<T, F>(
    cancel: &CancellationToken,
    timeout: Duration,
    operation: &'static str,
    future: F,
) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => {
            tracing::debug!(operation, "operation cancelled");
            Err(DocmapError::Cancelled)
        }
        result = tokio::time::timeout(timeout, future) => match result {
            Ok(result) => result,
            Err(_) => Err(DocmapError::Timeout(format!(
                "{} did not finish within {:?}",
                operation, timeout
            ))),
        },
    }
}
