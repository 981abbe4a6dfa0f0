//! Database/collection pair addressing a collection in the store

use std::fmt;

use crate::{DocmapError, Result};

const MAX_DATABASE_NAME_LEN: usize = 64;
const INVALID_DATABASE_CHARS: &[char] = &['/', '\\', '.', ' ', '"', '$', '\0'];

/// A validated (database, collection) pair
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Namespace {
    database: String,
    collection: String,
}

impl Namespace {
    /// Create a namespace, rejecting names the store would refuse.
    ///
    /// Database names must be non-empty, shorter than 64 bytes and free of
    /// `/\. "$` and NUL. Collection names must be non-empty, free of `$` and
    /// NUL and must not use the reserved `system.` prefix.
    pub fn new(database: impl Into<String>, collection: impl Into<String>) -> Result<Self> {
        let database = database.into();
        let collection = collection.into();

        if database.is_empty() {
            return Err(DocmapError::InvalidNamespace(
                "database name is empty".to_string(),
            ));
        }
        if database.len() >= MAX_DATABASE_NAME_LEN {
            return Err(DocmapError::InvalidNamespace(format!(
                "database name '{}' must be shorter than {} bytes",
                database, MAX_DATABASE_NAME_LEN
            )));
        }
        if let Some(c) = database.chars().find(|c| INVALID_DATABASE_CHARS.contains(c)) {
            return Err(DocmapError::InvalidNamespace(format!(
                "database name '{}' contains invalid character {:?}",
                database, c
            )));
        }

        if collection.is_empty() {
            return Err(DocmapError::InvalidNamespace(
                "collection name is empty".to_string(),
            ));
        }
        if collection.contains('$') || collection.contains('\0') {
            return Err(DocmapError::InvalidNamespace(format!(
                "collection name '{}' contains '$' or NUL",
                collection
            )));
        }
        if collection.starts_with("system.") {
            return Err(DocmapError::InvalidNamespace(format!(
                "collection name '{}' uses the reserved 'system.' prefix",
                collection
            )));
        }

        Ok(Self {
            database,
            collection,
        })
    }

    pub fn database(&self) -> &str {
        &self.database
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.database, self.collection)
    }
}
