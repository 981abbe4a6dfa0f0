//! Connection pooling tests across backends
//!
//! The pool is built lazily, shared by every operation of a store, bounded
//! by its max size and rebuilt after being destroyed.

use std::sync::Arc;

use anyhow::{Context, Result};
use docmap_connection::PoolConfig;
use docmap_core::{DocmapError, OrderedMap};
use pretty_assertions::assert_eq;
use rstest::rstest;

use crate::fixtures::{TestBackend, store_for, test_config, test_store};

#[rstest]
#[case::memory(TestBackend::Memory)]
#[case::mongodb(TestBackend::MongoDb)]
#[tokio::test]
async fn test_pool_is_created_lazily(#[case] backend: TestBackend) -> Result<()> {
    let Some(store) = test_store(backend).await? else {
        return Ok(());
    };

    assert!(store.stats().is_none(), "no pool before the first operation");
    store.count(&OrderedMap::new()).await?;

    let stats = store.stats().context("pool after first operation")?;
    assert_eq!(stats.active(), 0);
    assert_eq!(stats.idle(), 1);
    Ok(())
}

#[rstest]
#[case::memory(TestBackend::Memory)]
#[case::mongodb(TestBackend::MongoDb)]
#[tokio::test]
async fn test_concurrent_operations_respect_max_size(#[case] backend: TestBackend) -> Result<()> {
    let Some(store) = test_store(backend).await? else {
        return Ok(());
    };
    let store = Arc::new(store);

    let mut handles = Vec::new();
    for i in 0..20 {
        let store = Arc::clone(&store);
        handles.push(tokio::spawn(async move {
            let n = i.to_string();
            store.commit(&OrderedMap::from([("n", n.as_str())])).await
        }));
    }
    for handle in handles {
        handle.await?.context("commit")?;
    }

    assert_eq!(store.count(&OrderedMap::new()).await?, 20);
    let stats = store.stats().context("pool")?;
    assert_eq!(stats.active(), 0);
    assert!(stats.total() <= 4, "pool grew past max size: {:?}", stats);
    Ok(())
}

#[rstest]
#[case::memory(TestBackend::Memory)]
#[case::mongodb(TestBackend::MongoDb)]
#[tokio::test]
async fn test_exhausted_pool(#[case] backend: TestBackend) -> Result<()> {
    let Some(config) = test_config(backend).await else {
        return Ok(());
    };
    let store = store_for(config.with_pool(PoolConfig::new(0, 1).with_acquire_timeout_ms(100)))?;

    let held = store.query(&OrderedMap::new()).await?;
    let err = store.count(&OrderedMap::new()).await.err().context("pool should be exhausted")?;
    assert!(matches!(err, DocmapError::PoolExhausted(_)), "unexpected error: {}", err);

    held.close();
    assert_eq!(store.count(&OrderedMap::new()).await?, 0);
    Ok(())
}

#[rstest]
#[case::memory(TestBackend::Memory)]
#[case::mongodb(TestBackend::MongoDb)]
#[tokio::test]
async fn test_destroy_and_rebuild(#[case] backend: TestBackend) -> Result<()> {
    let Some(store) = test_store(backend).await? else {
        return Ok(());
    };

    store.commit(&OrderedMap::from([("k", "v")])).await?;
    store.destroy().await;
    assert!(store.stats().is_none());

    // a second destroy is a no-op
    store.destroy().await;

    assert_eq!(store.count(&OrderedMap::new()).await?, 1);
    assert!(store.stats().is_some());
    Ok(())
}

#[rstest]
#[case::memory(TestBackend::Memory)]
#[case::mongodb(TestBackend::MongoDb)]
#[tokio::test]
async fn test_warm_pool_opens_min_size(#[case] backend: TestBackend) -> Result<()> {
    let Some(config) = test_config(backend).await else {
        return Ok(());
    };
    let store = store_for(config.with_pool(PoolConfig::new(2, 4)))?;

    store.manager().initialize().await?;
    let stats = store.stats().context("pool")?;
    assert_eq!(stats.idle(), 2);
    assert_eq!(stats.active(), 0);
    Ok(())
}
