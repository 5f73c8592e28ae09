//! # Actor Pattern for Single-Writer Storage Access
//!
//! Every database operation runs on one dedicated owner thread. Producers
//! (sensor callbacks, the UI, timers) never touch the connection; they send
//! typed requests to the owner and, when they need an answer, wait on a
//! private one-shot channel created for that call.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐  ┌──────────────┐  ┌──────────────┐
//! │ sensor cb A  │  │ sensor cb B  │  │   UI thread  │
//! │ add_co2(..)  │  │ add_station  │  │ query(..)    │
//! └──────┬───────┘  └──────┬───────┘  └──────┬───────┘
//!        │ fire-and-forget │                 │ + oneshot::Sender
//!        └─────────────────┼─────────────────┘
//!                          ▼
//!              tokio::sync::mpsc (bounded, FIFO)
//!                          │
//!                          ▼
//!              ┌───────────────────────┐
//!              │  weatherdb-owner      │  current-thread runtime
//!              │                       │
//!              │  ┌─────────────────┐  │  ◄── maintenance tasks run
//!              │  │     Storage     │  │      here with &mut Storage
//!              │  │   (Connection)  │  │
//!              │  └─────────────────┘  │
//!              └───────────────────────┘
//! ```
//!
//! ## Per-Call Response Channels
//!
//! Each result-bearing request carries its own `oneshot::Sender`. Two threads
//! querying at the same time can never receive each other's answers, and a
//! caller whose request is never executed sees the sender dropped (or an
//! explicit [`Error::Closed`]) instead of hanging.
//!
//! ## Shutdown
//!
//! 1. The handle enqueues [`StoreRequest::Shutdown`] behind any pending work.
//! 2. The owner finishes everything queued before it, then closes the queue.
//! 3. Requests that slipped in after the sentinel are drained; each waiting
//!    caller receives `Error::Closed`.
//! 4. The owner drops the connection and signals exit. The handle waits at
//!    most `shutdown_timeout` for that signal, then detaches the thread.

use std::sync::mpsc as std_mpsc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::time::{timeout, Instant};
use tracing::{debug, info, warn};

use crate::config::StoreConfig;
use crate::query::QuerySpec;
use crate::storage::Storage;
use crate::types::{
    current_time_secs, AirQualityReading, Co2Reading, Identifier, PmConcentrationReading,
    PmCountReading, Reading, Sample, SensorReading, StationReading, Timestamp,
};
use crate::{Error, Result};

// =============================================================================
// Configuration
// =============================================================================

/// How long the owner sleeps when no maintenance task is registered.
const IDLE_WAIT: Duration = Duration::from_secs(3600);

/// Smallest interval a maintenance task may run at.
const MIN_TASK_INTERVAL: Duration = Duration::from_millis(10);

/// Poll step while the request queue is full during shutdown.
const SHUTDOWN_POLL: Duration = Duration::from_millis(5);

// =============================================================================
// Requests
// =============================================================================

/// Requests understood by the owner thread.
///
/// Variants without a `response` are fire-and-forget.
#[derive(Debug)]
pub enum StoreRequest {
    Ingest(Sample),
    Query {
        spec: QuerySpec,
        response: oneshot::Sender<Result<Vec<f64>>>,
    },
    RainOverPeriod {
        identifier: Identifier,
        period: i64,
        now: Timestamp,
        response: oneshot::Sender<Result<Option<f64>>>,
    },
    RainPeriodSeries {
        num: usize,
        period: i64,
        identifier: Identifier,
        response: oneshot::Sender<Result<Vec<f64>>>,
    },
    SettingGet {
        key: String,
        response: oneshot::Sender<Result<Option<String>>>,
    },
    SettingSet {
        key: String,
        value: String,
    },
    SettingGetOrInit {
        key: String,
        default: String,
        response: oneshot::Sender<Result<String>>,
    },
    /// Sentinel: stop after everything queued before it.
    Shutdown,
}

impl StoreRequest {
    /// Answers a request that will never run with `Error::Closed`.
    fn reject(self) {
        match self {
            StoreRequest::Query { response, .. } => {
                let _ = response.send(Err(Error::Closed));
            }
            StoreRequest::RainOverPeriod { response, .. } => {
                let _ = response.send(Err(Error::Closed));
            }
            StoreRequest::RainPeriodSeries { response, .. } => {
                let _ = response.send(Err(Error::Closed));
            }
            StoreRequest::SettingGet { response, .. } => {
                let _ = response.send(Err(Error::Closed));
            }
            StoreRequest::SettingGetOrInit { response, .. } => {
                let _ = response.send(Err(Error::Closed));
            }
            StoreRequest::Ingest(sample) => {
                debug!(kind = %sample.kind, "discarding sample queued after shutdown");
            }
            StoreRequest::SettingSet { key, .. } => {
                debug!(%key, "discarding setting queued after shutdown");
            }
            StoreRequest::Shutdown => {}
        }
    }
}

/// Executes one request against the owner's storage.
///
/// A send error only means the caller stopped waiting, so it is ignored.
fn dispatch(storage: &mut Storage, request: StoreRequest) {
    match request {
        StoreRequest::Ingest(sample) => {
            if let Err(e) = storage.apply(&sample) {
                warn!(kind = %sample.kind, timestamp = sample.timestamp, error = %e, "dropping sample");
            }
        }
        StoreRequest::Query { spec, response } => {
            let _ = response.send(storage.query(&spec));
        }
        StoreRequest::RainOverPeriod {
            identifier,
            period,
            now,
            response,
        } => {
            let _ = response.send(storage.rain_over_period_at(identifier, period, now));
        }
        StoreRequest::RainPeriodSeries {
            num,
            period,
            identifier,
            response,
        } => {
            let _ = response.send(storage.rain_period_series(num, period, identifier));
        }
        StoreRequest::SettingGet { key, response } => {
            let _ = response.send(storage.setting_get(&key));
        }
        StoreRequest::SettingSet { key, value } => {
            if let Err(e) = storage.setting_set(&key, &value) {
                warn!(%key, error = %e, "failed to store setting");
            }
        }
        StoreRequest::SettingGetOrInit {
            key,
            default,
            response,
        } => {
            let _ = response.send(storage.setting_get_or_init(&key, &default));
        }
        StoreRequest::Shutdown => {}
    }
}

// =============================================================================
// Maintenance Tasks
// =============================================================================

/// Periodic work executed on the owner thread between requests.
///
/// Tasks get `&mut Storage` and call store operations inline, without going
/// through the queue. A task that blocks stalls every producer, so keep
/// `run` short.
///
/// # Example
///
/// ```rust
/// use std::time::Duration;
/// use weatherdb::{MaintenanceTask, Result, Storage};
///
/// struct CountCo2Rows(i64);
///
/// impl MaintenanceTask for CountCo2Rows {
///     fn interval(&self) -> Duration {
///         Duration::from_secs(60)
///     }
///
///     fn run(&mut self, storage: &mut Storage) -> Result<()> {
///         self.0 = storage
///             .connection()
///             .query_row("SELECT COUNT(*) FROM co2", [], |row| row.get(0))?;
///         Ok(())
///     }
/// }
/// ```
pub trait MaintenanceTask: Send + 'static {
    /// Time between two runs. The first run happens one interval after start.
    fn interval(&self) -> Duration;

    fn run(&mut self, storage: &mut Storage) -> Result<()>;

    /// Name used in log output.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

struct ScheduledTask {
    task: Box<dyn MaintenanceTask>,
    interval: Duration,
    next_run: Instant,
}

impl ScheduledTask {
    fn new(task: Box<dyn MaintenanceTask>, now: Instant) -> Self {
        let interval = task.interval().max(MIN_TASK_INTERVAL);
        Self {
            task,
            interval,
            next_run: now + interval,
        }
    }
}

/// Runs every task whose deadline has passed.
fn run_due_tasks(storage: &mut Storage, tasks: &mut [ScheduledTask]) {
    let now = Instant::now();
    for scheduled in tasks.iter_mut().filter(|t| t.next_run <= now) {
        if let Err(e) = scheduled.task.run(storage) {
            warn!(task = scheduled.task.name(), error = %e, "maintenance task failed");
        }
        scheduled.next_run = Instant::now() + scheduled.interval;
    }
}

// =============================================================================
// Owner Loop
// =============================================================================

/// The owner thread's main loop.
///
/// Returns after the shutdown sentinel, or when every handle is dropped.
async fn run_owner(
    mut storage: Storage,
    mut rx: mpsc::Receiver<StoreRequest>,
    mut tasks: Vec<ScheduledTask>,
) {
    info!(tasks = tasks.len(), "store owner started");

    loop {
        let wait = tasks
            .iter()
            .map(|t| t.next_run.saturating_duration_since(Instant::now()))
            .min()
            .unwrap_or(IDLE_WAIT);

        match timeout(wait, rx.recv()).await {
            Ok(Some(StoreRequest::Shutdown)) | Ok(None) => break,
            Ok(Some(request)) => dispatch(&mut storage, request),
            Err(_) => {}
        }

        run_due_tasks(&mut storage, &mut tasks);
    }

    rx.close();
    let mut drained = 0usize;
    while let Ok(request) = rx.try_recv() {
        request.reject();
        drained += 1;
    }

    drop(storage);
    info!(drained, "store owner stopped");
}

// =============================================================================
// Lifecycle
// =============================================================================

struct OwnerThread {
    thread: JoinHandle<()>,
    exited: std_mpsc::Receiver<()>,
}

/// Shared by every clone of a handle; only the first `shutdown` waits.
struct Lifecycle {
    owner: Mutex<Option<OwnerThread>>,
    /// Set by the first `shutdown`; new requests are refused from then on.
    closed: AtomicBool,
    shutdown_timeout: Duration,
}

impl Lifecycle {
    fn take_owner(&self) -> Option<OwnerThread> {
        self.owner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take()
    }
}

// =============================================================================
// Builder
// =============================================================================

/// Opens the database and starts the owner thread.
///
/// ```rust,no_run
/// use weatherdb::{StoreBuilder, StoreConfig};
///
/// let store = StoreBuilder::new(StoreConfig::file("/var/lib/weather/values.db")).spawn()?;
/// store.add_co2(415, 2_150, 45)?;
/// store.shutdown()?;
/// # Ok::<(), weatherdb::Error>(())
/// ```
pub struct StoreBuilder {
    config: StoreConfig,
    tasks: Vec<Box<dyn MaintenanceTask>>,
}

impl StoreBuilder {
    pub fn new(config: StoreConfig) -> Self {
        Self {
            config,
            tasks: Vec::new(),
        }
    }

    /// Registers a task to run periodically on the owner thread.
    pub fn task(mut self, task: impl MaintenanceTask) -> Self {
        self.tasks.push(Box::new(task));
        self
    }

    /// Opens the database and spawns the owner thread.
    ///
    /// # Errors
    ///
    /// - `Error::Sqlite` / `Error::Schema` if the database can't be opened
    /// - `Error::Spawn` if the runtime or thread can't be created
    pub fn spawn(self) -> Result<StoreHandle> {
        let StoreBuilder { config, tasks } = self;

        let storage = Storage::open(&config.location)?;
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()?;

        let (tx, rx) = mpsc::channel(config.channel_capacity.max(1));
        let (exit_tx, exit_rx) = std_mpsc::sync_channel(1);

        let thread = thread::Builder::new()
            .name("weatherdb-owner".to_string())
            .spawn(move || {
                let now = Instant::now();
                let tasks = tasks
                    .into_iter()
                    .map(|task| ScheduledTask::new(task, now))
                    .collect();
                runtime.block_on(run_owner(storage, rx, tasks));
                let _ = exit_tx.send(());
            })?;

        info!(location = ?config.location, "store opened");

        Ok(StoreHandle {
            tx,
            lifecycle: Arc::new(Lifecycle {
                owner: Mutex::new(Some(OwnerThread {
                    thread,
                    exited: exit_rx,
                })),
                closed: AtomicBool::new(false),
                shutdown_timeout: config.shutdown_timeout,
            }),
        })
    }
}

// =============================================================================
// Handle
// =============================================================================

/// Blocking handle to the store.
///
/// Cheap to clone and safe to share across threads. Methods block the
/// calling thread, so they must not be called from inside an async runtime;
/// use [`crate::WeatherDb`] there.
#[derive(Clone)]
pub struct StoreHandle {
    tx: mpsc::Sender<StoreRequest>,
    lifecycle: Arc<Lifecycle>,
}

impl std::fmt::Debug for StoreHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreHandle")
            .field("closed", &self.is_closed())
            .finish()
    }
}

impl StoreHandle {
    /// Opens a store with no maintenance tasks.
    pub fn open(config: StoreConfig) -> Result<Self> {
        StoreBuilder::new(config).spawn()
    }

    // =========================================================================
    // Plumbing
    // =========================================================================

    fn ensure_open(&self) -> Result<()> {
        if self.lifecycle.closed.load(Ordering::Acquire) {
            return Err(Error::Closed);
        }
        Ok(())
    }

    fn send(&self, request: StoreRequest) -> Result<()> {
        self.ensure_open()?;
        self.tx.blocking_send(request).map_err(|_| Error::Closed)
    }

    fn call<T>(&self, build: impl FnOnce(oneshot::Sender<Result<T>>) -> StoreRequest) -> Result<T> {
        let (response, rx) = oneshot::channel();
        self.send(build(response))?;
        rx.blocking_recv().map_err(|_| Error::Closed)?
    }

    pub(crate) async fn send_async(&self, request: StoreRequest) -> Result<()> {
        self.ensure_open()?;
        self.tx.send(request).await.map_err(|_| Error::Closed)
    }

    pub(crate) async fn call_async<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<Result<T>>) -> StoreRequest,
    ) -> Result<T> {
        let (response, rx) = oneshot::channel();
        self.send_async(build(response)).await?;
        rx.await.map_err(|_| Error::Closed)?
    }

    // =========================================================================
    // Ingestion (fire-and-forget)
    // =========================================================================

    /// Queues `reading`, stamped with the current time.
    ///
    /// Returns once the request is queued. Storage errors are logged by the
    /// owner and never reach the caller.
    pub fn ingest(&self, reading: Reading) -> Result<()> {
        self.ingest_at(current_time_secs(), reading)
    }

    /// Queues `reading` with an explicit timestamp.
    pub fn ingest_at(&self, timestamp: Timestamp, reading: Reading) -> Result<()> {
        let sample = reading.into_sample(timestamp);
        sample.validate()?;
        self.send(StoreRequest::Ingest(sample))
    }

    pub fn add_air_quality(
        &self,
        iaq_index: i64,
        iaq_index_accuracy: i64,
        temperature: i64,
        humidity: i64,
        air_pressure: i64,
    ) -> Result<()> {
        self.ingest(Reading::AirQuality(AirQualityReading {
            iaq_index,
            iaq_index_accuracy,
            temperature,
            humidity,
            air_pressure,
        }))
    }

    pub fn add_pm_concentration(&self, pm10: i64, pm25: i64, pm100: i64) -> Result<()> {
        self.ingest(Reading::PmConcentration(PmConcentrationReading { pm10, pm25, pm100 }))
    }

    pub fn add_pm_count(&self, counts: PmCountReading) -> Result<()> {
        self.ingest(Reading::PmCount(counts))
    }

    pub fn add_co2(&self, co2_concentration: i64, temperature: i64, humidity: i64) -> Result<()> {
        self.ingest(Reading::Co2(Co2Reading {
            co2_concentration,
            temperature,
            humidity,
        }))
    }

    pub fn add_station(&self, reading: StationReading) -> Result<()> {
        self.ingest(Reading::Station(reading))
    }

    pub fn add_sensor(&self, identifier: Identifier, temperature: i64, humidity: i64) -> Result<()> {
        self.ingest(Reading::Sensor(SensorReading {
            identifier,
            temperature,
            humidity,
        }))
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Downsampled series of `spec.num` points, oldest first.
    pub fn query(&self, spec: QuerySpec) -> Result<Vec<f64>> {
        self.call(|response| StoreRequest::Query { spec, response })
    }

    /// Rain at station `identifier` over the last `period` seconds, or `None`
    /// without readings in that window.
    pub fn rain_over_period(&self, identifier: Identifier, period: i64) -> Result<Option<f64>> {
        let now = current_time_secs();
        self.call(|response| StoreRequest::RainOverPeriod {
            identifier,
            period,
            now,
            response,
        })
    }

    /// Rain per `period` over the last `num` periods, oldest first.
    pub fn rain_period_series(
        &self,
        num: usize,
        period: i64,
        identifier: Identifier,
    ) -> Result<Vec<f64>> {
        self.call(|response| StoreRequest::RainPeriodSeries {
            num,
            period,
            identifier,
            response,
        })
    }

    // =========================================================================
    // Settings
    // =========================================================================

    pub fn setting_get(&self, key: &str) -> Result<Option<String>> {
        self.call(|response| StoreRequest::SettingGet {
            key: key.to_string(),
            response,
        })
    }

    /// Queues a settings write. Later reads through any handle observe it.
    pub fn setting_set(&self, key: &str, value: &str) -> Result<()> {
        self.send(StoreRequest::SettingSet {
            key: key.to_string(),
            value: value.to_string(),
        })
    }

    pub fn setting_get_or_init(&self, key: &str, default: &str) -> Result<String> {
        self.call(|response| StoreRequest::SettingGetOrInit {
            key: key.to_string(),
            default: default.to_string(),
            response,
        })
    }

    // =========================================================================
    // Shutdown
    // =========================================================================

    /// Stops the owner thread after the work queued so far.
    ///
    /// Waits at most `shutdown_timeout`. If the queue is still full at the
    /// deadline, the sentinel is delivered from a detached thread. Calling it
    /// again, or from another clone, returns immediately. Every request
    /// issued afterwards fails with `Error::Closed`.
    pub fn shutdown(&self) -> Result<()> {
        self.lifecycle.closed.store(true, Ordering::Release);
        let Some(owner) = self.lifecycle.take_owner() else {
            return Ok(());
        };

        let limit = self.lifecycle.shutdown_timeout;
        let deadline = std::time::Instant::now() + limit;

        loop {
            match self.tx.try_send(StoreRequest::Shutdown) {
                Ok(()) | Err(mpsc::error::TrySendError::Closed(_)) => break,
                Err(mpsc::error::TrySendError::Full(_)) => {
                    if std::time::Instant::now() >= deadline {
                        warn!(timeout_ms = limit.as_millis() as u64, "request queue full at shutdown; detaching owner");
                        self.deliver_sentinel_later();
                        return Ok(());
                    }
                    thread::sleep(SHUTDOWN_POLL);
                }
            }
        }

        let remaining = deadline.saturating_duration_since(std::time::Instant::now());
        match owner.exited.recv_timeout(remaining) {
            Ok(()) | Err(std_mpsc::RecvTimeoutError::Disconnected) => {
                if owner.thread.join().is_err() {
                    warn!("store owner panicked");
                }
                info!("store shut down");
            }
            Err(std_mpsc::RecvTimeoutError::Timeout) => {
                warn!(timeout_ms = limit.as_millis() as u64, "store owner did not stop in time; detaching");
            }
        }

        Ok(())
    }

    /// Queues the sentinel from a detached thread once the queue has room.
    fn deliver_sentinel_later(&self) {
        let tx = self.tx.clone();
        let spawned = thread::Builder::new()
            .name("weatherdb-shutdown".to_string())
            .spawn(move || {
                let _ = tx.blocking_send(StoreRequest::Shutdown);
            });
        if let Err(e) = spawned {
            warn!(error = %e, "could not queue shutdown sentinel; owner stops when all handles drop");
        }
    }

    /// Whether the store has stopped accepting requests.
    pub fn is_closed(&self) -> bool {
        self.lifecycle.closed.load(Ordering::Acquire) || self.tx.is_closed()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::MeasurementKind;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const T0: i64 = 1_699_920_000;

    fn open() -> StoreHandle {
        StoreHandle::open(StoreConfig::in_memory()).expect("should open store")
    }

    #[test]
    fn test_ingest_then_query() {
        let store = open();
        for (offset, ppm) in [(0, 400), (20, 410), (40, 420)] {
            store
                .ingest_at(
                    T0 + offset,
                    Reading::Co2(Co2Reading {
                        co2_concentration: ppm,
                        temperature: 2_000,
                        humidity: 40,
                    }),
                )
                .expect("ingest");
        }

        // FIFO: the query is answered after all three samples are applied.
        let series = store
            .query(QuerySpec::new(MeasurementKind::Co2, "co2_concentration", 1, 60))
            .expect("query");
        assert_eq!(series, vec![410.0]);

        store.shutdown().expect("shutdown");
    }

    #[test]
    fn test_settings_via_handle() {
        let store = open();
        assert_eq!(store.setting_get("graph_resolution").expect("get"), None);
        store.setting_set("graph_resolution", "2").expect("set");
        assert_eq!(
            store.setting_get("graph_resolution").expect("get").as_deref(),
            Some("2")
        );
        assert_eq!(store.setting_get_or_init("logging_period", "1").expect("init"), "1");
        store.shutdown().expect("shutdown");
    }

    #[test]
    fn test_requests_after_shutdown_fail() {
        let store = open();
        store.shutdown().expect("shutdown");

        assert!(store.is_closed());
        assert!(matches!(store.setting_get("x"), Err(Error::Closed)));
        assert!(matches!(store.add_co2(1, 2, 3), Err(Error::Closed)));

        // Second shutdown is a no-op.
        store.shutdown().expect("second shutdown");
    }

    #[test]
    fn test_reject_answers_with_closed() {
        let (response, rx) = oneshot::channel();
        StoreRequest::SettingGet {
            key: "k".to_string(),
            response,
        }
        .reject();
        assert!(matches!(rx.blocking_recv(), Ok(Err(Error::Closed))));
    }

    /// Blocks the owner once, long enough for the queue to fill up.
    struct StallOnce(Arc<AtomicBool>);

    impl MaintenanceTask for StallOnce {
        fn interval(&self) -> Duration {
            Duration::from_millis(10)
        }

        fn run(&mut self, _storage: &mut Storage) -> Result<()> {
            if !self.0.swap(true, Ordering::SeqCst) {
                thread::sleep(Duration::from_millis(400));
            }
            Ok(())
        }
    }

    #[test]
    fn test_shutdown_with_full_queue_still_closes() {
        let config = StoreConfig::in_memory()
            .channel_capacity(1)
            .shutdown_timeout(Duration::from_millis(50));
        let stalled = Arc::new(AtomicBool::new(false));
        let store = StoreBuilder::new(config)
            .task(StallOnce(Arc::clone(&stalled)))
            .spawn()
            .expect("spawn");

        while !stalled.load(Ordering::SeqCst) {
            thread::sleep(Duration::from_millis(1));
        }
        // Occupies the single queue slot while the owner is stalled.
        store.add_co2(400, 2_000, 40).expect("ingest");

        store.shutdown().expect("shutdown");
        store.shutdown().expect("second shutdown");

        assert!(store.is_closed());
        assert!(matches!(store.setting_get("graph_resolution"), Err(Error::Closed)));
        assert!(matches!(store.add_co2(1, 2, 3), Err(Error::Closed)));

        // The sentinel still reaches the owner once the stall ends.
        let deadline = std::time::Instant::now() + Duration::from_secs(5);
        while !store.tx.is_closed() && std::time::Instant::now() < deadline {
            thread::sleep(Duration::from_millis(10));
        }
        assert!(store.tx.is_closed(), "owner should stop after the stall");
    }

    struct Counter(Arc<AtomicUsize>);

    impl MaintenanceTask for Counter {
        fn interval(&self) -> Duration {
            Duration::from_millis(20)
        }

        fn run(&mut self, storage: &mut Storage) -> Result<()> {
            storage.setting_set("ticks", &self.0.fetch_add(1, Ordering::SeqCst).to_string())?;
            Ok(())
        }
    }

    #[test]
    fn test_maintenance_task_runs_on_owner() {
        let ticks = Arc::new(AtomicUsize::new(0));
        let store = StoreBuilder::new(StoreConfig::in_memory())
            .task(Counter(Arc::clone(&ticks)))
            .spawn()
            .expect("spawn");

        let deadline = std::time::Instant::now() + Duration::from_secs(5);
        while ticks.load(Ordering::SeqCst) < 3 && std::time::Instant::now() < deadline {
            thread::sleep(Duration::from_millis(10));
        }
        assert!(ticks.load(Ordering::SeqCst) >= 3, "task should have run");
        assert!(store.setting_get("ticks").expect("get").is_some());

        store.shutdown().expect("shutdown");
    }
}
