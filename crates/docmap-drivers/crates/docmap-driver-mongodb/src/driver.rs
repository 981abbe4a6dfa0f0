//! MongoDB driver implementation

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use bson::{Document, doc};
use docmap_core::{
    Collection, Connection, ConnectionFactory, DocmapError, DocumentStream, Namespace, Result,
    StoreDriver, UpdateOutcome, is_operator_update,
};
use futures::TryStreamExt;
use mongodb::error::{Error as MongoError, ErrorKind};
use mongodb::options::ClientOptions;
use mongodb::{Client, Cursor};

/// Application name reported to the server when the URI sets none
pub const DEFAULT_APP_NAME: &str = "docmap";

/// MongoDB store driver
///
/// Handles `mongodb://` and `mongodb+srv://` URIs.
pub struct MongoDbDriver;

impl MongoDbDriver {
    /// Create a new MongoDB driver instance
    pub fn new() -> Self {
        tracing::debug!("MongoDB driver initialized");
        Self
    }
}

impl Default for MongoDbDriver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StoreDriver for MongoDbDriver {
    fn id(&self) -> &'static str {
        "mongodb"
    }

    fn display_name(&self) -> &'static str {
        "MongoDB"
    }

    fn schemes(&self) -> &'static [&'static str] {
        &["mongodb", "mongodb+srv"]
    }

    #[tracing::instrument(skip(self, uri))]
    async fn connector(&self, uri: &str) -> Result<Arc<dyn ConnectionFactory>> {
        if !self.accepts(uri) {
            return Err(DocmapError::Configuration(
                "MongoDB URIs must start with mongodb:// or mongodb+srv://".to_string(),
            ));
        }

        let options = ClientOptions::parse(uri)
            .await
            .map_err(|e| map_mongo_error("failed to parse MongoDB URI", e))?;

        tracing::debug!(hosts = ?options.hosts, "parsed MongoDB URI");
        let factory: Arc<dyn ConnectionFactory> = Arc::new(MongoConnectionFactory::new(options));
        Ok(factory)
    }
}

/// Opens single-socket MongoDB clients from parsed options
pub struct MongoConnectionFactory {
    options: ClientOptions,
}

impl MongoConnectionFactory {
    /// Create a factory from parsed client options.
    ///
    /// The options are restricted to one socket per client.
    pub fn new(mut options: ClientOptions) -> Self {
        options.max_pool_size = Some(1);
        options.min_pool_size = None;
        if options.app_name.is_none() {
            options.app_name = Some(DEFAULT_APP_NAME.to_string());
        }
        Self { options }
    }

    pub fn options(&self) -> &ClientOptions {
        &self.options
    }
}

#[async_trait]
impl ConnectionFactory for MongoConnectionFactory {
    async fn create(&self) -> Result<Arc<dyn Connection>> {
        let client = Client::with_options(self.options.clone())
            .map_err(|e| map_mongo_error("failed to create MongoDB client", e))?;

        let connection = MongoDbConnection::new(client);
        connection.ping().await?;

        tracing::debug!("opened MongoDB connection");
        Ok(Arc::new(connection))
    }
}

/// One MongoDB client lent out by the pool
pub struct MongoDbConnection {
    client: Client,
    closed: AtomicBool,
}

impl MongoDbConnection {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            closed: AtomicBool::new(false),
        }
    }

    /// Get the MongoDB client
    pub fn client(&self) -> &Client {
        &self.client
    }

    fn ensure_not_closed(&self) -> Result<()> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(DocmapError::Connection("connection is closed".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl Connection for MongoDbConnection {
    fn driver_name(&self) -> &str {
        "mongodb"
    }

    fn collection(&self, namespace: &Namespace) -> Result<Box<dyn Collection>> {
        self.ensure_not_closed()?;
        let inner = self
            .client
            .database(namespace.database())
            .collection::<Document>(namespace.collection());
        Ok(Box::new(MongoCollection {
            namespace: namespace.clone(),
            inner,
        }))
    }

    async fn ping(&self) -> Result<()> {
        self.ensure_not_closed()?;
        self.client
            .database("admin")
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|e| map_mongo_error("MongoDB ping failed", e))?;
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        self.client.clone().shutdown().immediate(true).await;
        tracing::debug!("closed MongoDB connection");
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

/// Collection handle bound to one client
pub struct MongoCollection {
    namespace: Namespace,
    inner: mongodb::Collection<Document>,
}

#[async_trait]
impl Collection for MongoCollection {
    fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    async fn insert_one(&self, document: Document) -> Result<()> {
        self.inner
            .insert_one(document)
            .await
            .map_err(|e| map_mongo_error("insert failed", e))?;
        Ok(())
    }

    async fn update_one(&self, filter: Document, update: Document) -> Result<UpdateOutcome> {
        let result = if is_operator_update(&update) {
            self.inner.update_one(filter, update).await
        } else {
            self.inner.replace_one(filter, update).await
        }
        .map_err(|e| map_mongo_error("update failed", e))?;

        Ok(UpdateOutcome::new(
            result.matched_count,
            result.modified_count,
        ))
    }

    async fn delete_one(&self, filter: Document) -> Result<u64> {
        let result = self
            .inner
            .delete_one(filter)
            .await
            .map_err(|e| map_mongo_error("delete failed", e))?;
        Ok(result.deleted_count)
    }

    async fn find(&self, filter: Document) -> Result<Box<dyn DocumentStream>> {
        let cursor = self
            .inner
            .find(filter)
            .await
            .map_err(|e| map_mongo_error("find failed", e))?;
        Ok(Box::new(MongoDocumentStream { cursor }))
    }

    async fn count(&self, filter: Document) -> Result<u64> {
        self.inner
            .count_documents(filter)
            .await
            .map_err(|e| map_mongo_error("count failed", e))
    }
}

/// Server-side cursor of a `find`
pub struct MongoDocumentStream {
    cursor: Cursor<Document>,
}

#[async_trait]
impl DocumentStream for MongoDocumentStream {
    async fn next_document(&mut self) -> Result<Option<Document>> {
        self.cursor
            .try_next()
            .await
            .map_err(|e| map_mongo_error("cursor iteration failed", e))
    }
}

/// Translate a driver error into the docmap error taxonomy
pub fn map_mongo_error(context: &str, error: MongoError) -> DocmapError {
    let message = format!("{}: {}", context, error);
    match *error.kind {
        ErrorKind::InvalidArgument { .. } => DocmapError::Configuration(message),
        ErrorKind::ServerSelection { .. }
        | ErrorKind::Io(_)
        | ErrorKind::DnsResolve { .. }
        | ErrorKind::ConnectionPoolCleared { .. } => DocmapError::Connection(message),
        ErrorKind::Authentication { .. } => DocmapError::Configuration(message),
        ErrorKind::Write(_) | ErrorKind::Command(_) | ErrorKind::InsertMany(_) => {
            DocmapError::Store(message)
        }
        _ => DocmapError::Driver(message),
    }
}
