//! docmap core - shared types for the document data-access layer
//!
//! This crate provides the types every other docmap crate builds on:
//!
//! - `OrderedMap` - the caller-facing document representation
//! - `codec` - conversion between `OrderedMap` and BSON via JSON text
//! - `Connection`, `Collection`, `DocumentStream` - the driver seam
//! - `StoreDriver` - turns a store URI into a `ConnectionFactory`
//! - `DocmapError` - the error type shared across the workspace

pub mod codec;
mod connection;
mod driver;
mod error;
mod map;
mod namespace;
pub mod oid;

pub use bson::{self, Document};
pub use connection::*;
pub use driver::*;
pub use error::*;
pub use map::OrderedMap;
pub use namespace::Namespace;
pub use oid::{is_oid_valid, ID_FIELD};
