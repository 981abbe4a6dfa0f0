//! Store driver trait

use std::sync::Arc;

use async_trait::async_trait;

use crate::{ConnectionFactory, Result};

/// A document store driver.
///
/// The driver turns a store URI into a [`ConnectionFactory`]; the pool then
/// uses that factory every time it needs a fresh connection.
#[async_trait]
pub trait StoreDriver: Send + Sync {
    /// Get the driver identifier (e.g., "mongodb")
    fn id(&self) -> &'static str;

    /// Human-readable name
    fn display_name(&self) -> &'static str;

    /// URI schemes handled by this driver, without the `://`
    fn schemes(&self) -> &'static [&'static str];

    /// Parse `uri` and return a factory bound to it.
    ///
    /// Fails with a configuration error when the URI cannot be parsed.
    async fn connector(&self, uri: &str) -> Result<Arc<dyn ConnectionFactory>>;

    /// Check whether this driver handles `uri`, judging by its scheme
    fn accepts(&self, uri: &str) -> bool {
        uri_scheme(uri).is_some_and(|scheme| {
            self.schemes()
                .iter()
                .any(|s| s.eq_ignore_ascii_case(scheme))
        })
    }
}

/// Extract the scheme of a URI (the part before `://`)
pub fn uri_scheme(uri: &str) -> Option<&str> {
    uri.split_once("://")
        .map(|(scheme, _)| scheme)
        .filter(|scheme| !scheme.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uri_scheme() {
        assert_eq!(uri_scheme("mongodb://localhost:27017"), Some("mongodb"));
        assert_eq!(uri_scheme("mongodb+srv://cluster.example.com"), Some("mongodb+srv"));
        assert_eq!(uri_scheme("memory://test"), Some("memory"));
        assert_eq!(uri_scheme("localhost:27017"), None);
        assert_eq!(uri_scheme("://nothing"), None);
    }
}
