use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;

use probe_core::{dedupe_batch, normalize_url, PendingQueue, ProbeStatus, StatusRow, StatusTable};
use probe_logging::{probe_debug, probe_error, probe_info, probe_warn};
use thiserror::Error;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};
use tokio::sync::Semaphore;
use tokio::time::MissedTickBehavior;

use crate::config::DispatcherConfig;
use crate::executor::{ProbeOutcome, Prober, ReqwestProber};
use crate::sink::StatusSink;

#[derive(Debug, Error)]
pub enum DispatcherError {
    #[error("failed to build http client: {0}")]
    ClientBuild(String),
    #[error("failed to start dispatcher worker: {0}")]
    WorkerStart(String),
}

enum Command {
    DrainNow,
    Shutdown,
}

/// State shared between the handle, the worker loop, and probe tasks.
struct Shared {
    queue: Mutex<PendingQueue>,
    table: Mutex<StatusTable>,
    draining: AtomicBool,
    sink: Arc<dyn StatusSink>,
}

impl Shared {
    /// Write a status and notify the sink.
    ///
    /// The table lock covers only the write; per-URL notification order
    /// still holds because each URL's transitions are causally ordered
    /// (enqueue, then drain, then completion).
    fn set_status(&self, url: &str, status: ProbeStatus) {
        lock(&self.table).set(url, status.clone());
        self.sink.notify(url, &status);
    }
}

/// Recover the guard from a poisoned lock; the protected state is a plain
/// queue or table and stays consistent across a panic.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Handle to a running dispatcher.
///
/// Spawning starts a dedicated background thread that owns a tokio runtime
/// and the poll loop; dropping the handle (or calling [`stop`]) shuts the
/// worker down. There is no ambient global state: each handle is an
/// independent dispatcher instance.
///
/// [`stop`]: DispatcherHandle::stop
pub struct DispatcherHandle {
    shared: Arc<Shared>,
    cmd_tx: UnboundedSender<Command>,
    worker: Option<thread::JoinHandle<()>>,
}

impl DispatcherHandle {
    /// Start a dispatcher probing over HTTP(S) with `config`.
    pub fn spawn(
        config: DispatcherConfig,
        sink: Arc<dyn StatusSink>,
    ) -> Result<Self, DispatcherError> {
        let prober = Arc::new(ReqwestProber::from_config(&config)?);
        Self::spawn_with_prober(config, sink, prober)
    }

    /// Start a dispatcher with a caller-supplied prober implementation.
    pub fn spawn_with_prober(
        config: DispatcherConfig,
        sink: Arc<dyn StatusSink>,
        prober: Arc<dyn Prober>,
    ) -> Result<Self, DispatcherError> {
        let shared = Arc::new(Shared {
            queue: Mutex::new(PendingQueue::new()),
            table: Mutex::new(StatusTable::new()),
            draining: AtomicBool::new(false),
            sink,
        });
        let (cmd_tx, cmd_rx) = tokio::sync::mpsc::unbounded_channel();

        // Build the runtime here so startup failures surface to the caller.
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
            .map_err(|err| DispatcherError::WorkerStart(err.to_string()))?;

        let worker_shared = shared.clone();
        let worker = thread::Builder::new()
            .name("probe-dispatcher".to_string())
            .spawn(move || {
                runtime.block_on(worker_loop(worker_shared, config, prober, cmd_rx));
            })
            .map_err(|err| DispatcherError::WorkerStart(err.to_string()))?;

        Ok(Self {
            shared,
            cmd_tx,
            worker: Some(worker),
        })
    }

    /// Enqueue one URL for probing.
    ///
    /// The URL is trimmed; empty input is ignored. The entry is marked
    /// `Pending` (superseding any terminal status from an earlier probe) and
    /// the worker is nudged so the drain starts without waiting out a full
    /// poll interval. Safe to call while a drain is in progress; such
    /// enqueues land in the next backlog.
    pub fn enqueue(&self, raw: &str) {
        let url = normalize_url(raw);
        if url.is_empty() {
            return;
        }
        self.shared.set_status(url, ProbeStatus::Pending);
        lock(&self.shared.queue).enqueue(url);
        let _ = self.cmd_tx.send(Command::DrainNow);
    }

    /// Enqueue a batch, deduplicating exact trimmed matches within it.
    ///
    /// Returns the number of URLs accepted.
    pub fn enqueue_all<I, S>(&self, raws: I) -> usize
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let accepted = dedupe_batch(raws);
        for url in &accepted {
            self.shared.set_status(url, ProbeStatus::Pending);
        }
        {
            let mut queue = lock(&self.shared.queue);
            for url in &accepted {
                queue.enqueue(url);
            }
        }
        if !accepted.is_empty() {
            let _ = self.cmd_tx.send(Command::DrainNow);
        }
        accepted.len()
    }

    /// Trigger a drain cycle without waiting for the next poll tick.
    pub fn drain_now(&self) {
        let _ = self.cmd_tx.send(Command::DrainNow);
    }

    /// Current contents of the status table, ordered by normalized URL.
    pub fn snapshot(&self) -> Vec<StatusRow> {
        lock(&self.shared.table).snapshot()
    }

    /// Current status of one URL, if it was ever enqueued.
    pub fn status_of(&self, url: &str) -> Option<ProbeStatus> {
        lock(&self.shared.table).get(url).cloned()
    }

    /// True when no drain cycle is in progress.
    ///
    /// Individual probes may still be in flight; this reflects only the
    /// `Idle -> Draining -> Idle` phase of the poll loop.
    pub fn is_idle(&self) -> bool {
        !self.shared.draining.load(Ordering::Acquire)
    }

    /// Shut the worker down and wait for it to exit.
    ///
    /// In-flight probes are allowed to finish before the runtime is torn
    /// down; their final statuses still land in the table.
    pub fn stop(mut self) {
        let _ = self.cmd_tx.send(Command::Shutdown);
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

impl Drop for DispatcherHandle {
    fn drop(&mut self) {
        // Best effort; `stop` is the orderly path.
        let _ = self.cmd_tx.send(Command::Shutdown);
    }
}

/// Clears the draining flag on every exit path of a drain cycle.
struct DrainGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> DrainGuard<'a> {
    fn enter(flag: &'a AtomicBool) -> Self {
        flag.store(true, Ordering::Release);
        Self { flag }
    }
}

impl Drop for DrainGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

async fn worker_loop(
    shared: Arc<Shared>,
    config: DispatcherConfig,
    prober: Arc<dyn Prober>,
    mut cmd_rx: UnboundedReceiver<Command>,
) {
    let limit = config.concurrency_limit.max(1);
    let limiter = Arc::new(Semaphore::new(limit));
    let mut ticker = tokio::time::interval(config.poll_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    probe_info!(
        "dispatcher started, concurrency_limit={} poll_interval={:?}",
        limit,
        config.poll_interval
    );

    // A single loop both polls and drains, so a tick or nudge that fires
    // mid-drain is not observed until the current drain finishes.
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                drain(&shared, &limiter, &prober).await;
            }
            cmd = cmd_rx.recv() => match cmd {
                Some(Command::DrainNow) => {
                    drain(&shared, &limiter, &prober).await;
                }
                Some(Command::Shutdown) | None => break,
            }
        }
    }

    // Let in-flight probes finish before the runtime is torn down.
    let _ = limiter.acquire_many(limit as u32).await;
    probe_info!("dispatcher stopped");
}

/// One drain cycle: `Idle -> Draining -> Idle`.
///
/// Pulls the entire current backlog, then launches one probe per URL in
/// queue order, never holding more than the limiter's capacity in flight.
/// The acquisition order serializes launches; completions are unordered.
async fn drain(shared: &Arc<Shared>, limiter: &Arc<Semaphore>, prober: &Arc<dyn Prober>) {
    let _guard = DrainGuard::enter(&shared.draining);

    // Lock scope is just the dequeue; enqueues during the drain start a
    // fresh backlog for the next cycle.
    let backlog = lock(&shared.queue).drain_all();
    if backlog.is_empty() {
        return;
    }
    probe_debug!("drain cycle started, backlog={}", backlog.len());

    for url in backlog {
        // Acquire before marking `Probing` so the probing population never
        // exceeds the configured limit.
        let permit = match limiter.clone().acquire_owned().await {
            Ok(permit) => permit,
            Err(_) => {
                probe_error!("concurrency limiter closed, abandoning drain");
                return;
            }
        };
        shared.set_status(&url, ProbeStatus::Probing);

        let shared = shared.clone();
        let prober = prober.clone();
        tokio::spawn(async move {
            // Dropping the permit releases the slot exactly once per
            // acquire, on success, failure, and panic alike.
            let _permit = permit;

            let probe_url = url.clone();
            let prober = prober.clone();
            let joined = tokio::spawn(async move { prober.probe(&probe_url).await }).await;
            let outcome = match joined {
                Ok(outcome) => outcome,
                // A panicking prober is a fault like any other: classify it,
                // never propagate it.
                Err(err) => ProbeOutcome::failed(format!("probe task failed: {err}")),
            };
            if let ProbeOutcome::Failed { reason } = &outcome {
                probe_warn!("probe failed, url={} reason={}", url, reason);
            }
            shared.set_status(&url, outcome.into_status());
        });
    }
}
