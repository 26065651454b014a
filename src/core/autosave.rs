//! Debounced background saving and the session owning the inventory
//!
//! Every mutation bumps [`Inventory::version`]. The autosaver thread polls the
//! version and saves once it has stayed unchanged for the debounce window, so
//! a burst of changes produces one write. The snapshot is taken under the lock
//! and written after releasing it.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crossbeam::channel::{self, RecvTimeoutError, Sender};
use parking_lot::Mutex;
use tracing::{debug, error, info};

use crate::core::config::{Config, ConfigError};
use crate::core::inventory::Inventory;
use crate::core::persistence::{JsonDirStore, ListStore, PersistenceError};
use crate::core::quota::QuotaGate;

/// Inventory shared between the command thread and the autosaver
pub type SharedInventory = Arc<Mutex<Inventory>>;

/// Background thread saving the inventory after changes settle
pub struct Autosaver {
    shutdown: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
    saved: Arc<AtomicU64>,
}

impl Autosaver {
    pub fn spawn<S: ListStore + 'static>(
        inventory: SharedInventory,
        store: Arc<S>,
        debounce: Duration,
    ) -> Self {
        let (tx, rx) = channel::bounded::<()>(1);
        let tick = (debounce / 4).max(Duration::from_millis(5));
        let saved = Arc::new(AtomicU64::new(inventory.lock().version()));
        let last_saved = Arc::clone(&saved);
        let handle = std::thread::spawn(move || {
            let mut pending: Option<(u64, Instant)> = None;
            loop {
                match rx.recv_timeout(tick) {
                    Err(RecvTimeoutError::Timeout) => {}
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                }

                let version = inventory.lock().version();
                if version == last_saved.load(Ordering::Acquire) {
                    pending = None;
                    continue;
                }
                match pending {
                    Some((seen, since)) if seen == version => {
                        if since.elapsed() >= debounce {
                            let snapshot = inventory.lock().snapshot();
                            match snapshot.save(store.as_ref()) {
                                Ok(()) => last_saved.store(snapshot.version, Ordering::Release),
                                Err(e) => error!(error = %e, "autosave failed"),
                            }
                            pending = None;
                        }
                    }
                    // New or superseded change: restart the window
                    _ => pending = Some((version, Instant::now())),
                }
            }
            debug!("autosaver stopped");
        });
        Self {
            shutdown: Some(tx),
            handle: Some(handle),
            saved,
        }
    }

    /// Version of the last snapshot this autosaver wrote
    pub fn saved_version(&self) -> u64 {
        self.saved.load(Ordering::Acquire)
    }

    /// Stop the thread and wait for it; pending changes are not saved
    ///
    /// Returns the version of the last snapshot written.
    pub fn stop(mut self) -> u64 {
        self.shutdown_and_join();
        self.saved_version()
    }

    fn shutdown_and_join(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                error!("autosaver thread panicked");
            }
        }
    }
}

impl Drop for Autosaver {
    fn drop(&mut self) {
        self.shutdown_and_join();
    }
}

/// Error opening a session
#[derive(Debug, thiserror::Error, miette::Diagnostic)]
pub enum SessionError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Persistence(#[from] PersistenceError),
}

/// A loaded inventory with its store and autosaver
pub struct Session<S: ListStore + 'static = JsonDirStore> {
    inventory: SharedInventory,
    store: Arc<S>,
    autosaver: Option<Autosaver>,
    loaded_version: u64,
}

impl Session<JsonDirStore> {
    /// Open the data directory named by `config`
    pub fn open(config: &Config) -> Result<Self, SessionError> {
        let store = JsonDirStore::open(config.data_dir()?)?;
        info!(dir = %store.root().display(), "opening inventory");
        Ok(Self::with_store(
            Arc::new(store),
            config.quota_gate(),
            Some(config.debounce()),
        )?)
    }
}

impl<S: ListStore + 'static> Session<S> {
    /// Load from `store`; autosave runs when a debounce window is given
    pub fn with_store(
        store: Arc<S>,
        quota: QuotaGate,
        debounce: Option<Duration>,
    ) -> Result<Self, PersistenceError> {
        let inventory = Inventory::load(store.as_ref(), quota)?;
        let loaded_version = inventory.version();
        let inventory = Arc::new(Mutex::new(inventory));
        let autosaver =
            debounce.map(|d| Autosaver::spawn(Arc::clone(&inventory), Arc::clone(&store), d));
        Ok(Self {
            inventory,
            store,
            autosaver,
            loaded_version,
        })
    }

    pub fn read<R>(&self, f: impl FnOnce(&Inventory) -> R) -> R {
        f(&self.inventory.lock())
    }

    pub fn write<R>(&self, f: impl FnOnce(&mut Inventory) -> R) -> R {
        f(&mut self.inventory.lock())
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Stop autosaving and save synchronously if anything changed since the
    /// last write
    pub fn close(mut self) -> Result<(), PersistenceError> {
        let saved = match self.autosaver.take() {
            Some(autosaver) => autosaver.stop(),
            None => self.loaded_version,
        };
        let inventory = self.inventory.lock();
        if inventory.version() != saved {
            inventory.save(self.store.as_ref())?;
        }
        Ok(())
    }
}
