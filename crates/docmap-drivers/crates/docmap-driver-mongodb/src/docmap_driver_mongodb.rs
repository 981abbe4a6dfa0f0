//! MongoDB driver for docmap
//!
//! Connects the docmap pool to a MongoDB deployment through the official
//! `mongodb` crate. The store URI is parsed once by [`MongoDbDriver`]; every
//! pooled connection is then a client restricted to a single socket, so the
//! docmap pool alone decides how many connections are open.
//!
//! # Example
//!
//! ```ignore
//! use docmap_core::StoreDriver;
//! use docmap_driver_mongodb::MongoDbDriver;
//!
//! let factory = MongoDbDriver::new()
//!     .connector("mongodb://localhost:27017")
//!     .await?;
//! let connection = factory.create().await?;
//! ```

mod driver;
#[cfg(test)]
mod driver_tests;

pub use driver::*;
