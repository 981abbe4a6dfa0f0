//! Docker container management for integration tests.
//!
//! The MongoDB container is started lazily by the first test that asks for
//! it and reused by every later test in the process. testcontainers-rs
//! removes it when the process exits.

use std::sync::{Arc, Mutex};

use once_cell::sync::Lazy;
use testcontainers::{ContainerAsync, runners::AsyncRunner};
use testcontainers_modules::mongo::Mongo;

/// Port MongoDB listens on inside the container
const MONGODB_PORT: u16 = 27017;

/// Information about a running test container
#[derive(Clone, Debug)]
pub struct ContainerInfo {
    /// Host address (typically 127.0.0.1)
    pub host: String,
    /// Port number (randomly assigned by testcontainers)
    pub port: u16,
}

impl ContainerInfo {
    /// Connection URI for the container
    pub fn uri(&self) -> String {
        format!(
            "mongodb://{}:{}/?serverSelectionTimeoutMS=5000",
            self.host, self.port
        )
    }
}

struct MongoDbContainer {
    #[allow(dead_code)]
    inner: ContainerAsync<Mongo>,
    info: ContainerInfo,
}

/// Global MongoDB container instance
static MONGODB_CONTAINER: Lazy<Arc<Mutex<Option<MongoDbContainer>>>> =
    Lazy::new(|| Arc::new(Mutex::new(None)));

/// Get or create the MongoDB test container
///
/// Fails when no Docker daemon is reachable.
pub async fn mongodb_container() -> anyhow::Result<ContainerInfo> {
    {
        let guard = MONGODB_CONTAINER
            .lock()
            .map_err(|e| anyhow::anyhow!("failed to lock mongodb container: {}", e))?;

        if let Some(ref container) = *guard {
            return Ok(container.info.clone());
        }
    }

    tracing::info!("starting MongoDB test container");

    let container = Mongo::default()
        .start()
        .await
        .map_err(|e| anyhow::anyhow!("failed to start mongodb container: {}", e))?;

    let host_port = container
        .get_host_port_ipv4(MONGODB_PORT)
        .await
        .map_err(|e| anyhow::anyhow!("failed to get mongodb port: {}", e))?;

    let info = ContainerInfo {
        host: "127.0.0.1".to_string(),
        port: host_port,
    };

    tracing::info!(port = host_port, "MongoDB test container started successfully");

    let mut guard = MONGODB_CONTAINER
        .lock()
        .map_err(|e| anyhow::anyhow!("failed to lock mongodb container: {}", e))?;

    // Another test may have started one concurrently; keep the first.
    if let Some(ref existing) = *guard {
        return Ok(existing.info.clone());
    }
    *guard = Some(MongoDbContainer {
        inner: container,
        info: info.clone(),
    });

    Ok(info)
}
