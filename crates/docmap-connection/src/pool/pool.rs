//! Connection pool implementation

use std::collections::VecDeque;
use std::ops::Deref;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Instant;

use docmap_core::{Connection, ConnectionFactory, DocmapError, Result};
use parking_lot::Mutex;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use super::config::PoolConfig;
use super::stats::PoolStats;

/// Internal wrapper for pooled connections with metadata
struct PooledConnectionInner {
    connection: Arc<dyn Connection>,
    created_at: Instant,
    last_used_at: Instant,
}

impl PooledConnectionInner {
    fn new(connection: Arc<dyn Connection>, created_at: Instant) -> Self {
        Self {
            connection,
            created_at,
            last_used_at: Instant::now(),
        }
    }
}

/// A pool of store connections shared by concurrent callers
///
/// The pool lends at most `max_size` connections at a time. Connections are
/// returned automatically when the [`PooledConnection`] wrapper is dropped,
/// and reused by later callers.
pub struct ConnectionPool {
    /// Pool configuration
    config: PoolConfig,
    /// Connection factory bound to the store URI
    factory: Arc<dyn ConnectionFactory>,
    /// Available idle connections
    idle: Mutex<VecDeque<PooledConnectionInner>>,
    /// Semaphore to limit lent connections
    semaphore: Arc<Semaphore>,
    /// Number of active connections (borrowed from pool)
    active_count: AtomicUsize,
    /// Number of requests waiting for a connection
    waiting_count: AtomicUsize,
    /// Set once the pool has been closed
    closed: AtomicBool,
}

impl ConnectionPool {
    /// Create a new connection pool with the given configuration and factory
    pub fn new<F: ConnectionFactory>(config: PoolConfig, factory: F) -> Arc<Self> {
        Self::with_factory(config, Arc::new(factory))
    }

    /// Create a new connection pool from a shared factory
    pub fn with_factory(config: PoolConfig, factory: Arc<dyn ConnectionFactory>) -> Arc<Self> {
        let semaphore = Arc::new(Semaphore::new(config.max_size()));
        Arc::new(Self {
            config,
            factory,
            idle: Mutex::new(VecDeque::new()),
            semaphore,
            active_count: AtomicUsize::new(0),
            waiting_count: AtomicUsize::new(0),
            closed: AtomicBool::new(false),
        })
    }

    /// Open connections until `min_size` are idle
    pub async fn warm_up(&self) -> Result<()> {
        while self.idle.lock().len() < self.config.min_size() {
            let connection = self.factory.create().await?;
            self.idle
                .lock()
                .push_back(PooledConnectionInner::new(connection, Instant::now()));
        }
        Ok(())
    }

    /// Get a connection from the pool
    ///
    /// Waits for a free lending slot, then reuses an idle connection or asks
    /// the factory for a new one. Only the wait for a slot is bounded by the
    /// acquire timeout; opening a connection reports the factory's own error.
    ///
    /// Returns [`DocmapError::PoolExhausted`] if no slot frees up in time.
    pub async fn get(self: &Arc<Self>) -> Result<PooledConnection> {
        let waiting = WaitingGuard::new(&self.waiting_count);
        let acquire_timeout = self.config.acquire_timeout();

        let permit =
            match tokio::time::timeout(acquire_timeout, self.semaphore.clone().acquire_owned())
                .await
            {
                Ok(Ok(permit)) => permit,
                Ok(Err(_)) => {
                    return Err(DocmapError::Connection("connection pool is closed".into()));
                }
                Err(_) => {
                    return Err(DocmapError::PoolExhausted(format!(
                        "timed out waiting for a connection (timeout: {:?})",
                        acquire_timeout
                    )));
                }
            };
        drop(waiting);

        // The permit is released if opening a connection fails
        let (connection, created_at) = match self.try_get_idle().await {
            Some(idle) => idle,
            None => (self.factory.create().await?, Instant::now()),
        };

        self.active_count.fetch_add(1, Ordering::SeqCst);

        Ok(PooledConnection {
            connection,
            created_at,
            pool: Arc::clone(self),
            _permit: permit,
        })
    }

    /// Try to get an idle connection, validating and checking lifetime
    async fn try_get_idle(&self) -> Option<(Arc<dyn Connection>, Instant)> {
        loop {
            let inner = { self.idle.lock().pop_front() }?;

            // Check if connection has exceeded max lifetime
            if let Some(max_lifetime) = self.config.max_lifetime() {
                if inner.created_at.elapsed() > max_lifetime {
                    let _ = inner.connection.close().await;
                    continue;
                }
            }

            // Check idle timeout
            if inner.last_used_at.elapsed() > self.config.idle_timeout() {
                let _ = inner.connection.close().await;
                continue;
            }

            if !self.factory.validate(&*inner.connection).await {
                let _ = inner.connection.close().await;
                continue;
            }

            return Some((inner.connection, inner.created_at));
        }
    }

    /// Return a connection to the pool
    fn return_connection(&self, connection: Arc<dyn Connection>, created_at: Instant) {
        self.active_count.fetch_sub(1, Ordering::SeqCst);

        if connection.is_closed() {
            return;
        }
        if self.closed.load(Ordering::SeqCst) {
            close_detached(connection);
            return;
        }

        let mut idle = self.idle.lock();
        idle.push_back(PooledConnectionInner::new(connection, created_at));
    }

    /// Get current pool statistics
    pub fn stats(&self) -> PoolStats {
        let idle = self.idle.lock().len();
        let active = self.active_count.load(Ordering::SeqCst);
        let waiting = self.waiting_count.load(Ordering::SeqCst);
        let available = self.semaphore.available_permits();
        PoolStats::new(idle + active, idle, active, waiting, available)
    }

    /// Get the pool configuration
    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    /// Close all idle connections in the pool
    pub async fn close_idle(&self) {
        let connections: Vec<_> = {
            let mut idle = self.idle.lock();
            idle.drain(..).collect()
        };

        for inner in connections {
            let _ = inner.connection.close().await;
        }
    }

    /// Close the pool.
    ///
    /// Pending and future acquisitions fail and idle connections are closed.
    /// Connections still lent out are closed when they come back.
    pub async fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        self.semaphore.close();
        self.close_idle().await;
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

/// Close a connection from a synchronous context.
///
/// `Drop` cannot await, so the close runs as a task on the current runtime.
fn close_detached(connection: Arc<dyn Connection>) {
    match tokio::runtime::Handle::try_current() {
        Ok(handle) => {
            handle.spawn(async move {
                if let Err(e) = connection.close().await {
                    tracing::warn!(error = %e, "failed to close connection returned to a closed pool");
                }
            });
        }
        Err(_) => {
            tracing::warn!("no tokio runtime to close a connection returned to a closed pool");
        }
    }
}

/// Keeps `waiting_count` accurate on every exit path of `get`
struct WaitingGuard<'a>(&'a AtomicUsize);

impl<'a> WaitingGuard<'a> {
    fn new(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for WaitingGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// A connection borrowed from the pool
///
/// When dropped, the connection is returned to the pool exactly once and the
/// lending slot is released.
pub struct PooledConnection {
    connection: Arc<dyn Connection>,
    created_at: Instant,
    pool: Arc<ConnectionPool>,
    _permit: OwnedSemaphorePermit,
}

impl Deref for PooledConnection {
    type Target = dyn Connection;

    fn deref(&self) -> &Self::Target {
        self.connection.as_ref()
    }
}

impl Drop for PooledConnection {
    fn drop(&mut self) {
        self.pool
            .return_connection(Arc::clone(&self.connection), self.created_at);
    }
}

impl PooledConnection {
    /// Get the underlying connection as an Arc
    pub fn inner(&self) -> &Arc<dyn Connection> {
        &self.connection
    }

    /// Return the connection to the pool now.
    ///
    /// Equivalent to dropping it; spelled out at call sites that release
    /// resources explicitly.
    pub fn release(self) {
        drop(self);
    }
}
