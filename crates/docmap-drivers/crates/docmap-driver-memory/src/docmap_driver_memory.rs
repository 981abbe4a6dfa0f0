//! In-process document store driver for docmap
//!
//! Keeps documents in memory, one [`MemoryStore`] per `memory://<name>` URI.
//! Connections opened for the same name see the same data, which makes the
//! driver useful for tests and for embedding without a server.
//!
//! Supported query surface:
//!
//! - filters: top-level field equality (an empty filter matches everything)
//! - updates: `$set` and `$unset`, or whole-document replacement
//! - inserts: duplicate `_id` values are rejected
//!
//! All data is lost when the last handle to a store is dropped.

mod driver;
#[cfg(test)]
mod driver_tests;
mod filter;
mod store;

pub use driver::*;
pub use store::MemoryStore;
