//! runtime-bridge — run async driver futures behind synchronous ports.
//!
//! The domain ports are synchronous while the database and HTTP drivers are
//! async. Adapters hold a [`Bridge`] and funnel every driver call through
//! [`Bridge::block_on`].
//!
//! Supports both standalone mode (creates its own Tokio runtime) and server
//! mode (reuses the existing runtime via `Handle::current()`).

use std::future::Future;
use std::sync::Arc;

/// Handle to the runtime that drives adapter futures.
#[derive(Clone, Debug)]
pub struct Bridge {
    // None when constructed inside a runtime (reuses the existing one)
    rt: Option<Arc<tokio::runtime::Runtime>>,
}

impl Bridge {
    /// Check if we're inside a Tokio runtime. If yes, reuse it.
    /// If no, create a small multi-threaded runtime owned by this bridge.
    pub fn new() -> std::io::Result<Self> {
        if tokio::runtime::Handle::try_current().is_ok() {
            Ok(Self { rt: None })
        } else {
            let rt = tokio::runtime::Builder::new_multi_thread()
                .worker_threads(2)
                .thread_name("runtime-bridge")
                .enable_all()
                .build()?;
            Ok(Self {
                rt: Some(Arc::new(rt)),
            })
        }
    }

    #[cfg(test)]
    fn is_standalone(&self) -> bool {
        self.rt.is_some()
    }

    /// Run an async future to completion, using either the owned runtime or the current one.
    ///
    /// In server mode this must be called from a multi-threaded runtime
    /// (worker or blocking thread); a current-thread runtime cannot block in place.
    pub fn block_on<F: Future>(&self, fut: F) -> F::Output {
        match &self.rt {
            Some(rt) => rt.block_on(fut),
            None => tokio::task::block_in_place(|| tokio::runtime::Handle::current().block_on(fut)),
        }
    }
}
