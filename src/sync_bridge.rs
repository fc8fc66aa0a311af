// colloquy/src/sync_bridge.rs

//! Blocking entry point over the async core.

use anyhow::{anyhow, Context, Result};
use std::future::Future;

/// Drives a future to completion from synchronous code.
///
/// The future runs on a dedicated thread with its own single-threaded
/// runtime, so this is safe to call both from plain synchronous code and
/// from inside an existing tokio runtime (where a nested `block_on` would
/// panic). The runtime is torn down when the call returns, on success and
/// on error alike.
pub fn block_on<F, T>(future: F) -> Result<T>
where
    F: Future<Output = T> + Send,
    T: Send,
{
    std::thread::scope(|scope| {
        scope
            .spawn(|| {
                let runtime = tokio::runtime::Builder::new_current_thread()
                    .enable_all()
                    .build()
                    .context("Failed to build bridge runtime")?;
                Ok(runtime.block_on(future))
            })
            .join()
            .map_err(|_| anyhow!("bridge thread panicked"))?
    })
}
