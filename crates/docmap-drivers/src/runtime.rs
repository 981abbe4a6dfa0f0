//! Tokio runtime for synchronous callers
//!
//! The store and its drivers are async. Hosts that are not running inside a
//! Tokio runtime go through [`block_on_tokio`], which drives futures on one
//! shared multi-thread runtime.

use std::sync::OnceLock;

use docmap_core::{DocmapError, Result};
use tokio::runtime::Runtime;

/// Global Tokio runtime for docmap drivers
static TOKIO_RUNTIME: OnceLock<Runtime> = OnceLock::new();

/// Get or create the shared Tokio runtime.
///
/// Fails with an I/O error if the runtime cannot be built; a later call
/// tries again.
pub fn get_tokio_runtime() -> Result<&'static Runtime> {
    if let Some(runtime) = TOKIO_RUNTIME.get() {
        return Ok(runtime);
    }

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .thread_name("docmap-driver-runtime")
        .build()
        .map_err(DocmapError::Io)?;

    // A concurrent caller may have won the race; its runtime is kept and
    // ours is dropped.
    Ok(TOKIO_RUNTIME.get_or_init(|| runtime))
}

/// Run a future to completion on the shared Tokio runtime.
///
/// This blocks the current thread until the future completes. It must not
/// be called from inside an async context.
///
/// # Example
///
/// ```ignore
/// let count = block_on_tokio(async { store.count(&filter).await })??;
/// ```
pub fn block_on_tokio<F, T>(future: F) -> Result<T>
where
    F: std::future::Future<Output = T>,
{
    if tokio::runtime::Handle::try_current().is_ok() {
        return Err(DocmapError::Driver(
            "block_on_tokio called from within an async runtime".to_string(),
        ));
    }
    Ok(get_tokio_runtime()?.block_on(future))
}
