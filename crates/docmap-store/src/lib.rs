//! docmap store - document operations on string maps
//!
//! [`DocumentStore`] is what request handlers talk to: every operation takes
//! [`OrderedMap`]s, converts them to native documents before touching the
//! network, borrows a pooled connection for the duration of the call and
//! gives it back afterwards. Reads hand back a [`Cursor`] that keeps its
//! connection until it is closed or dropped.
//!
//! Hosts without a Tokio runtime use [`BlockingStore`].
//!
//! # Example
//!
//! ```ignore
//! use docmap_store::{DocumentStore, OrderedMap, StoreConfig};
//! use docmap_drivers::DriverRegistry;
//!
//! let config = StoreConfig::new("mongodb://localhost:27017")
//!     .with_database("app")
//!     .with_collection("people");
//! let store = DocumentStore::from_config(config, &DriverRegistry::with_defaults())?;
//!
//! let id = store.commit(&OrderedMap::from([("name", "Ada")])).await?;
//! let mut cursor = store.query(&OrderedMap::from([("name", "Ada")])).await?;
//! while let Some(person) = cursor.next_map().await? {
//!     println!("{:?}", person);
//! }
//! ```

mod blocking;
mod cursor;
mod store;

pub use blocking::{BlockingCursor, BlockingStore};
pub use cursor::Cursor;
pub use store::DocumentStore;

pub use docmap_connection::{PoolManager, PoolStats, StoreConfig, WriteMode};
pub use docmap_core::{DocmapError, OrderedMap, Result, UpdateOutcome, is_oid_valid};
pub use tokio_util::sync::CancellationToken;
