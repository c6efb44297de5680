//! Background block loader.
//!
//! Disk reads run on a tokio blocking pool so loading a finer level never
//! blocks the render/interaction thread. Completions come back over an
//! unbounded channel and are drained non-blockingly by the cache at its
//! inter-frame commit point. Every request carries the cache generation;
//! completions from a previous generation (session closing, working set
//! reset) are discarded, never applied.

use std::sync::Arc;

use tokio::sync::mpsc;

use surflab_store::{SceneStore, StoreError};
use surflab_types::{BlockId, Surfel};

/// Result of one background load.
pub struct LoadCompletion {
    /// Block that was loaded.
    pub block: BlockId,
    /// Resolution level that was loaded.
    pub level: usize,
    /// Cache generation at request time.
    pub generation: u64,
    /// The payload, or the store error that prevented loading it.
    pub result: Result<Arc<[Surfel]>, StoreError>,
}

/// Owns the worker runtime and the completion channel.
pub struct BlockLoader {
    store: Arc<SceneStore>,
    runtime: Option<tokio::runtime::Runtime>,
    tx: mpsc::UnboundedSender<LoadCompletion>,
    rx: mpsc::UnboundedReceiver<LoadCompletion>,
    in_flight: usize,
}

impl BlockLoader {
    /// Start a loader over the given store.
    pub fn new(store: Arc<SceneStore>) -> std::io::Result<Self> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .thread_name("surflab-loader")
            .build()?;
        let (tx, rx) = mpsc::unbounded_channel();
        Ok(Self {
            store,
            runtime: Some(runtime),
            tx,
            rx,
            in_flight: 0,
        })
    }

    /// Queue a load. Returns immediately; the payload arrives via `poll`.
    pub fn request(&mut self, block: BlockId, level: usize, generation: u64) {
        let Some(runtime) = &self.runtime else {
            return;
        };
        let store = Arc::clone(&self.store);
        let tx = self.tx.clone();
        self.in_flight += 1;
        runtime.spawn_blocking(move || {
            let result = store.load_level(block, level).map(Arc::from);
            // Receiver gone means the loader shut down; the load is abandoned.
            let _ = tx.send(LoadCompletion {
                block,
                level,
                generation,
                result,
            });
        });
    }

    /// Take one finished load, if any. Never blocks.
    pub fn poll(&mut self) -> Option<LoadCompletion> {
        match self.rx.try_recv() {
            Ok(completion) => {
                self.in_flight -= 1;
                Some(completion)
            }
            Err(_) => None,
        }
    }

    /// Number of requests not yet drained via `poll`.
    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    /// Stop the worker runtime without waiting for outstanding loads.
    ///
    /// Loads already running are abandoned: their completions either never
    /// send or are never polled.
    pub fn shutdown(&mut self) {
        if let Some(runtime) = self.runtime.take() {
            runtime.shutdown_background();
        }
    }
}
