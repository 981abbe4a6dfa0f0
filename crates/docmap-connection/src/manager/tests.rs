//! Tests for pool lifecycle management

use std::sync::Arc;

use docmap_core::{DocmapError, StoreDriver};

use super::PoolManager;
use crate::config::StoreConfig;
use crate::mock::MockDriver;
use crate::pool::PoolConfig;
use crate::retry::{BackoffStrategy, RetryConfig};

fn quick_retry(max_attempts: u32) -> RetryConfig {
    RetryConfig::new(max_attempts, BackoffStrategy::new(1, 5))
}

fn manager_with(config: StoreConfig, driver: Arc<MockDriver>) -> PoolManager {
    let driver: Arc<dyn StoreDriver> = driver;
    PoolManager::new(config, driver).expect("valid configuration")
}

fn mock_config() -> StoreConfig {
    StoreConfig::new("mock://local")
        .with_database("app")
        .with_collection("people")
        .with_retry(quick_retry(3))
}

#[tokio::test]
async fn test_initialize_without_uri_creates_no_pool() {
    let driver = Arc::new(MockDriver::new());
    let manager = manager_with(StoreConfig::default(), driver.clone());

    let err = manager.initialize().await.err().expect("missing uri");
    assert!(matches!(err, DocmapError::Configuration(_)));
    assert!(manager.stats().is_none());
    assert!(!manager.is_initialized());
    assert_eq!(driver.connector_calls(), 0);
}

#[tokio::test]
async fn test_connect_without_uri_is_not_retried() {
    let driver = Arc::new(MockDriver::new());
    let manager = manager_with(StoreConfig::default().with_retry(quick_retry(5)), driver.clone());

    let err = manager.connect().await.err().expect("missing uri");
    assert!(matches!(err, DocmapError::Configuration(_)));
    assert_eq!(driver.connector_calls(), 0);
}

#[tokio::test]
async fn test_initialize_is_one_time() {
    let driver = Arc::new(MockDriver::new());
    let manager = manager_with(mock_config(), driver.clone());

    let first = manager.initialize().await.expect("initialize");
    let second = manager.initialize().await.expect("initialize again");

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(driver.connector_calls(), 1);
    assert!(manager.is_initialized());
}

#[tokio::test]
async fn test_initialize_warms_min_size() {
    let driver = Arc::new(MockDriver::new());
    let config = mock_config().with_pool(PoolConfig::new(2, 4));
    let manager = manager_with(config, driver.clone());

    manager.initialize().await.expect("initialize");

    let stats = manager.stats().expect("pool exists");
    assert_eq!(stats.idle(), 2);
    assert_eq!(driver.factory.count(), 2);
}

#[tokio::test]
async fn test_connect_initializes_lazily() {
    let driver = Arc::new(MockDriver::new());
    let manager = manager_with(mock_config(), driver.clone());
    assert!(manager.stats().is_none());

    let conn = manager.connect().await.expect("connect");
    assert_eq!(conn.driver_name(), "mock");
    assert_eq!(manager.stats().expect("pool").active(), 1);
}

#[tokio::test]
async fn test_connect_retries_transient_initialization_failures() {
    let driver = Arc::new(MockDriver::failing(2));
    let manager = manager_with(mock_config().with_retry(quick_retry(3)), driver.clone());

    let _conn = manager.connect().await.expect("third attempt succeeds");
    assert_eq!(driver.connector_calls(), 3);
}

#[tokio::test]
async fn test_connect_gives_up_after_retry_budget() {
    let driver = Arc::new(MockDriver::failing(10));
    let manager = manager_with(mock_config().with_retry(quick_retry(2)), driver.clone());

    let err = manager.connect().await.err().expect("never reachable");
    assert!(matches!(err, DocmapError::Connection(_)));
    assert_eq!(driver.connector_calls(), 2);
    assert!(manager.stats().is_none());

    // a later call starts a fresh round of attempts
    let _ = manager.connect().await;
    assert_eq!(driver.connector_calls(), 4);
}

#[tokio::test]
async fn test_unsupported_uri_is_a_configuration_error() {
    let driver = Arc::new(MockDriver::new());
    let manager = manager_with(StoreConfig::new("http://nowhere").with_retry(quick_retry(4)), driver.clone());

    let err = manager.connect().await.err().expect("wrong scheme");
    assert!(matches!(err, DocmapError::Configuration(_)));
    assert_eq!(driver.connector_calls(), 1);
}

#[tokio::test]
async fn test_invalid_namespace_rejected_at_construction() {
    let driver: Arc<dyn StoreDriver> = Arc::new(MockDriver::new());
    let config = mock_config().with_collection("bad$name");
    let err = PoolManager::new(config, driver).err().expect("invalid namespace");
    assert!(matches!(err, DocmapError::InvalidNamespace(_)));
}

#[tokio::test]
async fn test_get_collection_uses_configured_namespace() {
    let manager = manager_with(mock_config(), Arc::new(MockDriver::new()));

    let conn = manager.connect().await.expect("connect");
    let collection = manager.get_collection(&conn).expect("collection");
    assert_eq!(collection.namespace().to_string(), "app.people");
    assert_eq!(manager.namespace(), collection.namespace());

    manager.disconnect(conn, collection);
}

#[tokio::test]
async fn test_disconnect_returns_connection() {
    let manager = manager_with(mock_config(), Arc::new(MockDriver::new()));

    let conn = manager.connect().await.expect("connect");
    let collection = manager.get_collection(&conn).expect("collection");
    assert_eq!(manager.stats().expect("pool").active(), 1);

    manager.disconnect(conn, collection);

    let stats = manager.stats().expect("pool");
    assert_eq!(stats.active(), 0);
    assert_eq!(stats.idle(), 1);
}

#[tokio::test]
async fn test_destroy_without_pool_is_noop() {
    let manager = manager_with(mock_config(), Arc::new(MockDriver::new()));
    manager.destroy().await;
    assert!(manager.stats().is_none());
}

#[tokio::test]
async fn test_destroy_then_connect_reinitializes() {
    let driver = Arc::new(MockDriver::new());
    let manager = manager_with(mock_config(), driver.clone());

    let first = manager.initialize().await.expect("initialize");
    manager.connect().await.expect("connect").release();

    manager.destroy().await;
    assert!(first.is_closed());
    assert!(manager.stats().is_none());

    let _conn = manager.connect().await.expect("reconnect");
    assert_eq!(driver.connector_calls(), 2);
}

#[tokio::test]
async fn test_destroy_closes_connection_lent_out() {
    let manager = manager_with(mock_config(), Arc::new(MockDriver::new()));

    let conn = manager.connect().await.expect("connect");
    let lent = Arc::clone(conn.inner());
    manager.destroy().await;
    assert!(!lent.is_closed(), "a lent connection stays usable until returned");

    conn.release();
    for _ in 0..10 {
        if lent.is_closed() {
            break;
        }
        tokio::task::yield_now().await;
    }
    assert!(lent.is_closed());
}

#[tokio::test]
async fn test_connect_exhausted_pool_times_out() {
    let config = mock_config().with_pool(PoolConfig::new(0, 1).with_acquire_timeout_ms(50));
    let manager = manager_with(config, Arc::new(MockDriver::new()));

    let _held = manager.connect().await.expect("connect");
    let err = manager.connect().await.err().expect("exhausted");
    assert!(matches!(err, DocmapError::PoolExhausted(_)));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_first_connects_share_one_pool() {
    let driver = Arc::new(MockDriver::new());
    let config = mock_config().with_pool(PoolConfig::new(0, 8).with_acquire_timeout_ms(5_000));
    let manager = Arc::new(manager_with(config, driver.clone()));

    let mut handles = Vec::new();
    for _ in 0..8 {
        let manager = manager.clone();
        handles.push(tokio::spawn(async move {
            let conn = manager.connect().await?;
            let collection = manager.get_collection(&conn)?;
            tokio::task::yield_now().await;
            manager.disconnect(conn, collection);
            Ok::<_, DocmapError>(())
        }));
    }
    for handle in handles {
        handle.await.expect("join").expect("connect/disconnect");
    }

    assert_eq!(driver.connector_calls(), 1);
    let stats = manager.stats().expect("pool");
    assert_eq!(stats.active(), 0);
    assert!(stats.total() <= 8);
}
