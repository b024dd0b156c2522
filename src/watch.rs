//! Polling watcher over a plan's execution artifacts.
//!
//! The watcher does not compute state. It snapshots a signature (path →
//! mtime) over `execution/feedbacks/{APPROVED_*,FIX_*}` and
//! `execution/EXECUTION_TASK_*`, re-scans on a fixed interval, and invokes
//! a registered callback, debounced, when anything changed. The caller's
//! callback re-derives whatever state it cares about; running it twice is
//! harmless by contract.
//!
//! Polling is deliberate: no OS notification API, one writer assumed
//! between ticks. The worker is a dedicated thread whose loop owns a single
//! rearmable debounce deadline, so a burst of changes collapses into
//! exactly one callback once the tree goes quiet. The stored signature is
//! refreshed on every tick whether or not the debounce fires.
//!
//! Failures inside the loop (scan errors, callback panics) are logged
//! and swallowed; the worker must outlive them all.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{Receiver, RecvTimeoutError, Sender, channel};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant, SystemTime};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);
pub const DEFAULT_DEBOUNCE_DELAY: Duration = Duration::from_millis(500);
const DEFAULT_JOIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Filename prefixes watched under `execution/feedbacks/`.
const FEEDBACK_PREFIXES: [&str; 2] = ["APPROVED_", "FIX_"];
/// Filename prefix watched under `execution/`.
const EXECUTION_PREFIXES: [&str; 1] = ["EXECUTION_TASK_"];

type ChangeCallback = Arc<dyn Fn() + Send + Sync + 'static>;
type Signature = HashMap<PathBuf, SystemTime>;

/// Handles owned by a running worker.
struct Worker {
    handle: std::thread::JoinHandle<()>,
    shutdown_tx: Sender<()>,
    done_rx: Receiver<()>,
}

/// Watches one plan's execution directories and reports changes.
///
/// Lifecycle is Stopped → Running → Stopped: [`StateWatcher::start`] is a
/// no-op while running, and [`StateWatcher::stop`] joins the worker with a
/// bounded timeout: a wedged callback makes `stop` give up and leak the
/// worker thread rather than hang the caller.
pub struct StateWatcher {
    plan_dir: PathBuf,
    poll_interval: Duration,
    debounce_delay: Duration,
    join_timeout: Duration,
    callback: ChangeCallback,
    signature: Arc<Mutex<Signature>>,
    worker: Option<Worker>,
}

impl StateWatcher {
    /// Create a stopped watcher over `plan_dir` with default intervals.
    pub fn new(plan_dir: impl Into<PathBuf>, on_change: impl Fn() + Send + Sync + 'static) -> Self {
        Self {
            plan_dir: plan_dir.into(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            debounce_delay: DEFAULT_DEBOUNCE_DELAY,
            join_timeout: DEFAULT_JOIN_TIMEOUT,
            callback: Arc::new(on_change),
            signature: Arc::new(Mutex::new(Signature::new())),
            worker: None,
        }
    }

    /// Set the interval between filesystem scans.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Set the quiet period required before the callback fires.
    pub fn with_debounce_delay(mut self, delay: Duration) -> Self {
        self.debounce_delay = delay;
        self
    }

    /// Set how long [`StateWatcher::stop`] waits for the worker to exit.
    pub fn with_join_timeout(mut self, timeout: Duration) -> Self {
        self.join_timeout = timeout;
        self
    }

    pub fn is_running(&self) -> bool {
        self.worker.is_some()
    }

    /// Take an initial signature snapshot and spawn the polling worker.
    /// No-op if the watcher is already running.
    pub fn start(&mut self) {
        if self.worker.is_some() {
            return;
        }

        match scan_signature(&self.plan_dir) {
            Ok(initial) => *lock(&self.signature) = initial,
            Err(err) => {
                tracing::warn!(
                    "Initial signature scan failed for {}: {err}",
                    self.plan_dir.display()
                );
                lock(&self.signature).clear();
            }
        }

        let (shutdown_tx, shutdown_rx) = channel();
        let (done_tx, done_rx) = channel();
        let plan_dir = self.plan_dir.clone();
        let poll_interval = self.poll_interval;
        let debounce_delay = self.debounce_delay;
        let callback = Arc::clone(&self.callback);
        let signature = Arc::clone(&self.signature);

        let handle = std::thread::spawn(move || {
            run_loop(
                &plan_dir,
                poll_interval,
                debounce_delay,
                &callback,
                &signature,
                &shutdown_rx,
            );
            let _ = done_tx.send(());
        });

        self.worker = Some(Worker {
            handle,
            shutdown_tx,
            done_rx,
        });
    }

    /// Signal the worker to exit, discard any pending debounce, and join
    /// with a bounded wait. Returns even if the worker is stuck in a wedged
    /// callback; the thread is leaked in that case. No-op when stopped.
    pub fn stop(&mut self) {
        let Some(worker) = self.worker.take() else {
            return;
        };

        // A send failure means the worker already exited; joining below
        // still drains it.
        let _ = worker.shutdown_tx.send(());

        match worker.done_rx.recv_timeout(self.join_timeout) {
            Ok(()) | Err(RecvTimeoutError::Disconnected) => {
                let _ = worker.handle.join();
            }
            Err(RecvTimeoutError::Timeout) => {
                tracing::warn!(
                    "Watcher worker for {} did not exit within {:?}; leaking the thread",
                    self.plan_dir.display(),
                    self.join_timeout
                );
            }
        }
    }

    /// Invoke the callback synchronously on the caller's thread, bypassing
    /// debounce. May overlap a debounce-triggered invocation; the callback
    /// is idempotent by contract.
    pub fn force_callback(&self) {
        invoke(&self.callback);
    }
}

impl Drop for StateWatcher {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Create and start a watcher over a plan directory. `None` intervals use
/// the defaults.
pub fn watch(
    plan_dir: impl Into<PathBuf>,
    on_change: impl Fn() + Send + Sync + 'static,
    poll_interval: Option<Duration>,
    debounce_delay: Option<Duration>,
) -> StateWatcher {
    let mut watcher = StateWatcher::new(plan_dir, on_change)
        .with_poll_interval(poll_interval.unwrap_or(DEFAULT_POLL_INTERVAL))
        .with_debounce_delay(debounce_delay.unwrap_or(DEFAULT_DEBOUNCE_DELAY));
    watcher.start();
    watcher
}

/// The worker loop: sleep until the next poll tick or pending debounce
/// deadline, whichever is sooner, unless a shutdown arrives first.
fn run_loop(
    plan_dir: &Path,
    poll_interval: Duration,
    debounce_delay: Duration,
    callback: &ChangeCallback,
    signature: &Mutex<Signature>,
    shutdown_rx: &Receiver<()>,
) {
    let mut next_poll = Instant::now() + poll_interval;
    let mut debounce_deadline: Option<Instant> = None;

    loop {
        let wake_at = debounce_deadline.map_or(next_poll, |deadline| deadline.min(next_poll));
        let timeout = wake_at.saturating_duration_since(Instant::now());
        match shutdown_rx.recv_timeout(timeout) {
            Ok(()) | Err(RecvTimeoutError::Disconnected) => return,
            Err(RecvTimeoutError::Timeout) => {}
        }

        if let Some(deadline) = debounce_deadline
            && Instant::now() >= deadline
        {
            debounce_deadline = None;
            invoke(callback);
        }

        if Instant::now() >= next_poll {
            next_poll = Instant::now() + poll_interval;
            match scan_signature(plan_dir) {
                Ok(current) => {
                    let changed = {
                        let mut stored = lock(signature);
                        let changed = signature_changed(&stored, &current);
                        *stored = current;
                        changed
                    };
                    if changed {
                        // Rearm: a burst of changes keeps pushing the
                        // deadline out, collapsing into one callback.
                        debounce_deadline = Some(Instant::now() + debounce_delay);
                    }
                }
                Err(err) => {
                    tracing::warn!("Signature scan failed for {}: {err}", plan_dir.display());
                }
            }
        }
    }
}

fn invoke(callback: &ChangeCallback) {
    let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| callback()));
    if outcome.is_err() {
        tracing::warn!("State-change callback panicked; watcher keeps running");
    }
}

fn lock(signature: &Mutex<Signature>) -> MutexGuard<'_, Signature> {
    signature.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Snapshot path → mtime over the watched directories. Missing directories
/// contribute nothing; unreadable ones are an error for the caller to log.
fn scan_signature(plan_dir: &Path) -> std::io::Result<Signature> {
    let mut signature = Signature::new();
    let execution_dir = plan_dir.join("execution");
    collect_entries(
        &mut signature,
        &execution_dir.join("feedbacks"),
        &FEEDBACK_PREFIXES,
    )?;
    collect_entries(&mut signature, &execution_dir, &EXECUTION_PREFIXES)?;
    Ok(signature)
}

fn collect_entries(
    signature: &mut Signature,
    dir: &Path,
    prefixes: &[&str],
) -> std::io::Result<()> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(()),
        Err(err) => return Err(err),
    };

    for entry in entries.flatten() {
        let name = entry.file_name().to_string_lossy().to_string();
        if !prefixes.iter().any(|prefix| name.starts_with(prefix)) {
            continue;
        }
        // A file removed mid-scan just drops out of the signature.
        if let Ok(metadata) = entry.metadata()
            && let Ok(modified) = metadata.modified()
        {
            signature.insert(entry.path(), modified);
        }
    }
    Ok(())
}

/// A change is any new path, any removed path, or any mtime increase.
fn signature_changed(old: &Signature, new: &Signature) -> bool {
    new.iter().any(|(path, mtime)| match old.get(path) {
        None => true,
        Some(previous) => mtime > previous,
    }) || old.keys().any(|path| !new.contains_key(path))
}
