//! A polling file watcher.
//!
//! `Watcher` re-stats a set of registered paths at a fixed interval on one
//! background thread. Paths are grouped into independent `WatchScope`s, each
//! with its own callback, so several consumers can share the single poll
//! thread without seeing each other's files.
//!
//! The first scan after a path is registered never fires an event, it only
//! records the baseline timestamp. A path whose stat starts failing is
//! treated as deleted: the scope fires `WatchEvent::Removed` once and the
//! entry is dropped.
//!
//! Callbacks run on the poll thread. They are expected to hand the path off
//! to the owning thread (usually by pushing into a mutex-guarded queue) and
//! return; they must never touch state that belongs to another thread.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, SystemTime};

use crate::errors::*;
use crate::utils::FastHashMap;

/// What happened to a watched path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchEvent {
    /// The file's modification timestamp moved forward.
    Changed,
    /// The file could not be stat-ed anymore. Fired once, after which the
    /// path is no longer watched.
    Removed,
}

/// Construction parameters of `Watcher`.
#[derive(Debug, Clone, Copy)]
pub struct WatcherParams {
    /// The sleep interval between two scan passes. This also bounds the
    /// shutdown latency of `stop`.
    pub interval: Duration,
}

impl Default for WatcherParams {
    fn default() -> Self {
        WatcherParams {
            interval: Duration::from_millis(500),
        }
    }
}

type Callback = Box<dyn Fn(&Path, WatchEvent) + Send + Sync>;

struct ScopeState {
    // Maps watched path to the last observed modification timestamp. `None`
    // means the baseline has not been captured yet.
    files: Mutex<FastHashMap<PathBuf, Option<SystemTime>>>,
    on_change: Callback,
}

impl ScopeState {
    fn scan(&self) {
        let mut files = self.files.lock().unwrap();

        let mut removals = Vec::new();
        for (path, last) in files.iter_mut() {
            match fs::metadata(path).and_then(|m| m.modified()) {
                Ok(modified) => {
                    let newer = last.map_or(true, |prev| modified > prev);
                    if newer && last.is_some() {
                        (self.on_change)(path, WatchEvent::Changed);
                    }

                    *last = Some(modified);
                }
                Err(_) => removals.push(path.clone()),
            }
        }

        for path in removals {
            files.remove(&path);
            (self.on_change)(&path, WatchEvent::Removed);
        }
    }
}

struct Shared {
    interval: Duration,
    stop: AtomicBool,
    next_scope: AtomicUsize,
    scopes: Mutex<Vec<(usize, Arc<ScopeState>)>>,
}

impl Shared {
    fn scan(&self) {
        // Holding the registry lock for the whole pass guarantees that no
        // callback fires for a scope after the scope has been dropped.
        let scopes = self.scopes.lock().unwrap();
        for (_, scope) in scopes.iter() {
            scope.scan();
        }
    }
}

/// The file watcher. One background poll thread is shared by all the scopes
/// created from it.
///
/// The watcher is an explicit object: the host constructs it once, passes it
/// by reference to every consumer that needs a scope, and drops it on
/// shutdown. Dropping stops the poll thread.
pub struct Watcher {
    shared: Arc<Shared>,
    thread: Option<thread::JoinHandle<()>>,
}

impl Watcher {
    /// Creates a new `Watcher`. The poll thread is not spawned until
    /// `start` is called.
    pub fn new(params: WatcherParams) -> Self {
        Watcher {
            shared: Arc::new(Shared {
                interval: params.interval,
                stop: AtomicBool::new(false),
                next_scope: AtomicUsize::new(1),
                scopes: Mutex::new(Vec::new()),
            }),
            thread: None,
        }
    }

    /// Allocates an independent watch scope. All scopes share this watcher's
    /// poll thread; each keeps its own watched-path set and callback.
    ///
    /// The callback runs on whichever thread performs the scan, so it must
    /// not touch state owned by other threads.
    pub fn scope<F>(&self, on_change: F) -> WatchScope
    where
        F: Fn(&Path, WatchEvent) + Send + Sync + 'static,
    {
        let state = Arc::new(ScopeState {
            files: Mutex::new(FastHashMap::default()),
            on_change: Box::new(on_change),
        });

        let id = self.shared.next_scope.fetch_add(1, Ordering::Relaxed);
        self.shared.scopes.lock().unwrap().push((id, state.clone()));

        WatchScope {
            id,
            shared: self.shared.clone(),
            state,
        }
    }

    /// Spawns the poll thread if it is not running yet.
    pub fn start(&mut self) -> Result<()> {
        if self.thread.is_some() {
            return Err(Error::WatcherAlreadyRunning);
        }

        let shared = self.shared.clone();
        let thread = thread::Builder::new()
            .name("kiln-watch".into())
            .spawn(move || {
                while !shared.stop.load(Ordering::Relaxed) {
                    shared.scan();
                    thread::sleep(shared.interval);
                }
            })?;

        self.thread = Some(thread);
        info!("watcher started (interval {:?})", self.shared.interval);
        Ok(())
    }

    /// Signals the poll thread to terminate and blocks until it exits. The
    /// thread notices the signal after its current sleep, so this blocks for
    /// up to one poll interval. No-op if the watcher is not running.
    pub fn stop(&mut self) {
        if let Some(thread) = self.thread.take() {
            self.shared.stop.store(true, Ordering::Relaxed);
            if thread.join().is_err() {
                warn!("watcher thread panicked during shutdown");
            }
            self.shared.stop.store(false, Ordering::Relaxed);
            info!("watcher stopped");
        }
    }

    /// Runs one scan pass synchronously on the calling thread. This is the
    /// same pass the poll thread runs every tick; single-threaded hosts and
    /// tests may pump it manually instead of calling `start`.
    pub fn poll(&self) {
        self.shared.scan();
    }

    /// Checks if the poll thread is running.
    pub fn is_running(&self) -> bool {
        self.thread.is_some()
    }
}

impl Drop for Watcher {
    fn drop(&mut self) {
        self.stop();
    }
}

/// An independent set of watched paths with one change callback, backed by
/// the `Watcher` it was created from. Dropping the scope unregisters it; no
/// callback fires for it afterwards.
pub struct WatchScope {
    id: usize,
    shared: Arc<Shared>,
    state: Arc<ScopeState>,
}

impl WatchScope {
    /// Registers `path` with an unobserved baseline. The next scan only
    /// records the current timestamp; events fire from the scan after that.
    /// Re-watching an already-watched path keeps its baseline.
    pub fn watch<P: Into<PathBuf>>(&self, path: P) {
        let mut files = self.state.files.lock().unwrap();
        files.entry(path.into()).or_insert(None);
    }

    /// Removes `path` from this scope. No-op if it was not watched.
    pub fn forget<P: AsRef<Path>>(&self, path: P) {
        let mut files = self.state.files.lock().unwrap();
        files.remove(path.as_ref());
    }

    /// Returns the number of watched paths.
    pub fn len(&self) -> usize {
        self.state.files.lock().unwrap().len()
    }

    /// Checks if this scope watches no paths.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Drop for WatchScope {
    fn drop(&mut self) {
        let mut scopes = self.shared.scopes.lock().unwrap();
        scopes.retain(|(id, _)| *id != self.id);
    }
}
