//! docmap drivers - store driver implementations
//!
//! This crate bundles the concrete implementations of the
//! [`StoreDriver`] trait defined in `docmap-core` behind cargo features,
//! a [`DriverRegistry`] that picks one by name or URI scheme, and the shared
//! Tokio runtime used by synchronous callers.

#[cfg(feature = "memory")]
pub use docmap_driver_memory as memory;
#[cfg(feature = "mongodb")]
pub use docmap_driver_mongodb as mongodb;

mod registry;
mod runtime;

pub use registry::DriverRegistry;
pub use runtime::{block_on_tokio, get_tokio_runtime};

/// Re-export commonly used types from docmap-core
pub use docmap_core::{ConnectionFactory, DocmapError, Result, StoreDriver};
