//! Query results bound to the connection that produced them

use std::time::Duration;

use docmap_connection::PooledConnection;
use docmap_core::codec::document_into_map;
use docmap_core::{Collection, Document, DocumentStream, Namespace, OrderedMap, Result};
use tokio_util::sync::CancellationToken;

use crate::store::run_guarded;

/// A live query result
///
/// Owns the server-side result stream together with the collection handle
/// and pooled connection it was opened on. All three are released, in that
/// order, exactly once: by [`Cursor::close`], by [`Cursor::collect_maps`]
/// or when the cursor is dropped.
pub struct Cursor {
    // field order is drop order
    stream: Box<dyn DocumentStream>,
    collection: Box<dyn Collection>,
    _connection: PooledConnection,
    exhausted: bool,
    returned: u64,
    timeout: Duration,
    cancel: CancellationToken,
}

impl Cursor {
    pub(crate) fn new(
        stream: Box<dyn DocumentStream>,
        collection: Box<dyn Collection>,
        connection: PooledConnection,
        timeout: Duration,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            stream,
            collection,
            _connection: connection,
            exhausted: false,
            returned: 0,
            timeout,
            cancel,
        }
    }

    /// Fetch the next native document.
    ///
    /// Returns `Ok(None)` once the results are exhausted, and keeps doing so
    /// without touching the stream again. An error also ends the cursor.
    pub async fn next_document(&mut self) -> Result<Option<Document>> {
        if self.exhausted {
            return Ok(None);
        }

        let next = run_guarded(
            &self.cancel,
            self.timeout,
            "cursor next",
            self.stream.next_document(),
        )
        .await;

        match next {
            Ok(Some(document)) => {
                self.returned += 1;
                Ok(Some(document))
            }
            Ok(None) => {
                self.exhausted = true;
                Ok(None)
            }
            Err(e) => {
                self.exhausted = true;
                Err(e)
            }
        }
    }

    /// Fetch the next document decoded into a fresh map
    pub async fn next_map(&mut self) -> Result<Option<OrderedMap>> {
        match self.next_document().await? {
            Some(document) => Ok(Some(document_into_map(&document)?)),
            None => Ok(None),
        }
    }

    /// Drain the remaining results into maps, then release the cursor
    pub async fn collect_maps(mut self) -> Result<Vec<OrderedMap>> {
        let mut maps = Vec::new();
        while let Some(map) = self.next_map().await? {
            maps.push(map);
        }
        Ok(maps)
    }

    /// Release the stream, collection handle and connection now
    pub fn close(self) {
        drop(self);
    }

    pub fn namespace(&self) -> &Namespace {
        self.collection.namespace()
    }

    /// Documents handed out so far
    pub fn returned(&self) -> u64 {
        self.returned
    }

    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }
}

impl Drop for Cursor {
    fn drop(&mut self) {
        tracing::trace!(
            namespace = %self.collection.namespace(),
            returned = self.returned,
            exhausted = self.exhausted,
            "cursor released"
        );
    }
}
