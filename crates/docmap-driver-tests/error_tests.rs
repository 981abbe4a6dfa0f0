//! Error handling tests
//!
//! Tests cover:
//! - Missing and unsupported store URIs
//! - Maps that cannot be encoded
//! - Servers that cannot be reached
//! - Store rejections under both write modes

use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use docmap_connection::{BackoffStrategy, PoolManager, RetryConfig, StoreConfig, WriteMode};
use docmap_core::{DocmapError, OrderedMap};
use docmap_drivers::memory::MemoryDriver;
use docmap_store::DocumentStore;
use pretty_assertions::assert_eq;
use rstest::rstest;

use crate::fixtures::{TestBackend, TEST_DATABASE, registry, store_for, test_config, test_store};

#[test]
fn test_missing_uri() {
    let err = DocumentStore::from_config(StoreConfig::default(), registry())
        .err()
        .expect("missing uri should be rejected");
    assert!(matches!(err, DocmapError::Configuration(_)));
}

#[test]
fn test_unsupported_scheme() {
    let err = DocumentStore::from_config(StoreConfig::new("postgres://localhost/app"), registry())
        .err()
        .expect("unknown scheme should be rejected");
    assert!(matches!(err, DocmapError::Configuration(_)));
    assert!(err.to_string().contains("postgres://"));
}

#[rstest]
#[case::memory(TestBackend::Memory)]
#[case::mongodb(TestBackend::MongoDb)]
#[tokio::test]
async fn test_codec_error_is_reported(#[case] backend: TestBackend) -> Result<()> {
    let Some(store) = test_store(backend).await? else {
        return Ok(());
    };

    let bad = OrderedMap::from([("$set", r#"{"owner":{"$oid":"not-hex"}}"#)]);
    let err = store
        .update(&OrderedMap::new(), &bad)
        .await
        .err()
        .context("bad extended JSON should fail")?;

    assert!(matches!(err, DocmapError::Codec(_)), "unexpected error: {}", err);
    assert!(store.stats().is_none(), "codec errors happen before connecting");
    Ok(())
}

#[tokio::test]
async fn test_unreachable_mongodb_is_connection_error() -> Result<()> {
    let config = StoreConfig::new("mongodb://127.0.0.1:1/?serverSelectionTimeoutMS=100")
        .with_database(TEST_DATABASE)
        .with_collection("unreachable")
        .with_retry(RetryConfig::new(2, BackoffStrategy::new(10, 10)));
    let store = store_for(config)?;

    let started = Instant::now();
    let err = store
        .commit(&OrderedMap::from([("k", "v")]))
        .await
        .err()
        .context("nothing listens on port 1")?;

    assert!(matches!(err, DocmapError::Connection(_)), "unexpected error: {}", err);
    let stats = store.stats().context("pool is built even when warm-up fails")?;
    assert_eq!(stats.active(), 0);
    assert!(started.elapsed().as_secs() < 10);
    Ok(())
}

#[tokio::test]
async fn test_store_rejection_by_write_mode() -> Result<()> {
    let driver = Arc::new(MemoryDriver::new());
    let store_with_mode = |mode: WriteMode| -> Result<DocumentStore> {
        let config = StoreConfig::new("memory://rejecting")
            .with_database(TEST_DATABASE)
            .with_collection("people")
            .with_write_mode(mode);
        let manager = PoolManager::new(config, driver.clone())?;
        Ok(DocumentStore::new(Arc::new(manager)))
    };
    driver.store("rejecting").set_read_only(true);

    let strict = store_with_mode(WriteMode::Strict)?;
    let err = strict
        .commit(&OrderedMap::from([("k", "v")]))
        .await
        .err()
        .context("read-only store should reject")?;
    assert!(matches!(err, DocmapError::Store(_)));

    let lenient = store_with_mode(WriteMode::BestEffort)?;
    assert_eq!(lenient.commit(&OrderedMap::from([("k", "v")])).await?, None);
    assert_eq!(lenient.delete(&OrderedMap::new()).await?, 0);
    Ok(())
}

#[rstest]
#[case::memory(TestBackend::Memory)]
#[case::mongodb(TestBackend::MongoDb)]
#[tokio::test]
async fn test_cancelled_store(#[case] backend: TestBackend) -> Result<()> {
    let Some(config) = test_config(backend).await else {
        return Ok(());
    };
    let token = docmap_store::CancellationToken::new();
    let store = store_for(config)?.with_cancellation(token.clone());

    token.cancel();
    let err = store
        .count(&OrderedMap::new())
        .await
        .err()
        .context("cancelled store should refuse work")?;
    assert!(matches!(err, DocmapError::Cancelled));
    Ok(())
}
