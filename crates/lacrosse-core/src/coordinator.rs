// ── Refresh coordinator ──
//
// Decides when cached readings are stale, runs at most one refresh cycle
// at a time, and fans the outcome out to every caller that arrived while
// the cycle ran. A cycle is: log in if needed, fetch the status page
// (re-login and refetch once if the session went stale), parse, replace
// the registry.

use std::mem;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

use lacrosse_api::{Credentials, PortalClient, TransportConfig, parser};

use crate::config::PortalConfig;
use crate::convert;
use crate::error::CoreError;
use crate::model::{AccountInfo, DeviceRecord, ReadingKind, ReadingValue};
use crate::session::SessionManager;
use crate::store::{DeviceRegistry, ReplaceReport};

/// Stale-session retries allowed within one cycle.
const MAX_STALE_SESSION_RETRIES: u32 = 1;

/// Completion callback for a caller waiting on a cycle.
type Waiter = Box<dyn FnOnce(Result<(), CoreError>) + Send>;

/// Device list handed to callers.
pub type DeviceList = Arc<Vec<Arc<DeviceRecord>>>;

#[derive(Default)]
struct RefreshCycle {
    in_progress: bool,
    /// Drained from the end: last in, first notified.
    waiters: Vec<Waiter>,
    last_success: Option<Instant>,
    /// Bumped by `invalidate_cache`; a cycle only marks the cache fresh if
    /// no invalidation happened while it ran.
    generation: u64,
}

enum Admission {
    /// Cache is fresh, nothing to wait for.
    Fresh,
    /// Wait on this receiver; `start` says whether we launched the cycle,
    /// `generation` is the cache generation it was admitted under.
    Wait {
        rx: oneshot::Receiver<Result<(), CoreError>>,
        start: bool,
        generation: u64,
    },
}

// ── Coordinator ──────────────────────────────────────────────────

/// The main entry point for consumers.
///
/// Cheaply cloneable via `Arc<CoordinatorInner>`. Every query goes through
/// the cache window; cache misses share one in-flight refresh.
#[derive(Clone)]
pub struct Coordinator {
    inner: Arc<CoordinatorInner>,
}

struct CoordinatorInner {
    config: PortalConfig,
    session: SessionManager,
    store: DeviceRegistry,
    cycle: Mutex<RefreshCycle>,
}

impl Coordinator {
    /// Create a coordinator from configuration. Does NOT touch the
    /// network -- the first query logs in and fetches.
    pub fn new(config: PortalConfig) -> Result<Self, CoreError> {
        let mut transport = TransportConfig::default().with_cookie_jar();
        if let Some(timeout) = config.timeout {
            transport = transport.with_timeout(timeout);
        }
        let client = PortalClient::new(config.base_url.clone(), &transport)?
            .with_login_scheme(config.login_scheme.clone());
        let credentials = Credentials {
            username: config.username.clone(),
            password: config.password.clone(),
        };

        Ok(Self {
            inner: Arc::new(CoordinatorInner {
                session: SessionManager::new(client, credentials),
                store: DeviceRegistry::new(),
                cycle: Mutex::new(RefreshCycle::default()),
                config,
            }),
        })
    }

    /// Access the portal configuration.
    pub fn config(&self) -> &PortalConfig {
        &self.inner.config
    }

    /// Access the device registry.
    pub fn store(&self) -> &DeviceRegistry {
        &self.inner.store
    }

    /// Access the session manager.
    pub fn session(&self) -> &SessionManager {
        &self.inner.session
    }

    /// Is the last successful refresh still inside the cache window?
    pub fn is_fresh(&self) -> bool {
        let cycle = self.lock_cycle();
        self.within_window(&cycle)
    }

    /// Is a refresh cycle running right now?
    pub fn is_refreshing(&self) -> bool {
        self.lock_cycle().in_progress
    }

    /// Make the next query refresh regardless of the cache window.
    ///
    /// Called while a cycle runs, that cycle still releases its waiters but
    /// leaves the cache stale.
    pub fn invalidate_cache(&self) {
        let mut cycle = self.lock_cycle();
        cycle.last_success = None;
        cycle.generation += 1;
    }

    // ── Queries ──────────────────────────────────────────────────

    /// The current device list, refreshed first if the cache is stale.
    pub async fn device_list(&self) -> Result<DeviceList, CoreError> {
        self.refresh_if_stale().await?;
        Ok(self.inner.store.devices())
    }

    /// Callback form of [`device_list`](Self::device_list).
    ///
    /// `on_done` runs exactly once, on the tokio runtime.
    pub fn get_device_list<F>(&self, on_done: F) -> JoinHandle<()>
    where
        F: FnOnce(Result<DeviceList, CoreError>) + Send + 'static,
    {
        let coordinator = self.clone();
        tokio::spawn(async move { on_done(coordinator.device_list().await) })
    }

    /// One reading of one device, refreshed first if the cache is stale.
    pub async fn query(
        &self,
        device_name: &str,
        kind: ReadingKind,
    ) -> Result<ReadingValue, CoreError> {
        trace!(device = device_name, %kind, "query");
        self.refresh_if_stale().await?;
        self.inner
            .store
            .get(device_name)
            .map(|record| record.reading(kind))
            .ok_or_else(|| CoreError::DeviceNotFound {
                name: device_name.to_owned(),
            })
    }

    /// Refresh unless the cache is fresh. Joins a running cycle if there is one.
    pub async fn refresh_if_stale(&self) -> Result<(), CoreError> {
        self.run(false).await
    }

    /// Refresh now, ignoring the cache window. Still joins a running cycle.
    pub async fn refresh(&self) -> Result<(), CoreError> {
        self.run(true).await
    }

    // ── Cycle machinery ──────────────────────────────────────────

    async fn run(&self, force: bool) -> Result<(), CoreError> {
        match self.admit(force) {
            Admission::Fresh => {
                debug!(
                    window_secs = self.inner.config.cache_window.as_secs(),
                    "using cached data"
                );
                Ok(())
            }
            Admission::Wait {
                rx,
                start,
                generation,
            } => {
                if start {
                    let coordinator = self.clone();
                    tokio::spawn(async move { coordinator.run_cycle(generation).await });
                }
                rx.await.unwrap_or(Err(CoreError::RefreshAbandoned))
            }
        }
    }

    /// Decide, under the cycle lock, whether to serve from cache, join the
    /// running cycle, or start a new one.
    fn admit(&self, force: bool) -> Admission {
        let mut cycle = self.lock_cycle();
        if !force && !cycle.in_progress && self.within_window(&cycle) {
            return Admission::Fresh;
        }

        let (tx, rx) = oneshot::channel();
        cycle.waiters.push(Box::new(move |outcome| {
            let _ = tx.send(outcome);
        }));

        if cycle.in_progress {
            debug!(waiters = cycle.waiters.len(), "refresh in progress, queueing");
            Admission::Wait {
                rx,
                start: false,
                generation: cycle.generation,
            }
        } else {
            cycle.in_progress = true;
            Admission::Wait {
                rx,
                start: true,
                generation: cycle.generation,
            }
        }
    }

    async fn run_cycle(self, generation: u64) {
        let mut guard = CycleGuard {
            cycle: &self.inner.cycle,
            finished: false,
        };

        let outcome = self.fetch_and_apply().await;
        match &outcome {
            Ok(report) => info!(
                devices = report.kept,
                added = report.added.len(),
                dropped = report.duplicates.len() + report.unnamed,
                "config refresh successful"
            ),
            Err(e) => warn!(error = %e, "config refresh failed"),
        }

        let waiters = {
            let mut cycle = self.lock_cycle();
            cycle.in_progress = false;
            if outcome.is_ok() && cycle.generation == generation {
                cycle.last_success = Some(Instant::now());
            }
            mem::take(&mut cycle.waiters)
        };
        guard.finished = true;

        release_waiters(waiters, &outcome.map(|_| ()));
    }

    async fn fetch_and_apply(&self) -> Result<ReplaceReport, CoreError> {
        let page = self.fetch_status_page(MAX_STALE_SESSION_RETRIES).await?;

        let status = parser::parse_status_page(&page).map_err(|e| {
            warn!(error = %e, "status page parsing failed");
            CoreError::from(e)
        })?;

        let account = AccountInfo::from(&status);
        let records = convert::records_from_status(&status);
        if tracing::enabled!(tracing::Level::TRACE) {
            if let Ok(json) = serde_json::to_string(&records) {
                trace!(devices = %json, "parsed devices");
            }
        }

        self.inner.store.apply_refresh(account, records)
    }

    /// Log in if needed and fetch the status page.
    ///
    /// A page without the logged-in marker drops the session; while
    /// `retries` remain the login and fetch are repeated. Transport
    /// failures drop the session but are not retried here.
    async fn fetch_status_page(&self, mut retries: u32) -> Result<String, CoreError> {
        let session = &self.inner.session;
        loop {
            session.ensure_authenticated().await?;

            match session.client().fetch_status_page().await {
                Ok(page) => return Ok(page),
                Err(e) => {
                    if e.invalidates_session() {
                        session.invalidate().await;
                    }
                    if e.is_auth_expired() && retries > 0 {
                        retries -= 1;
                        info!("status page says session is stale, logging in again");
                        continue;
                    }
                    warn!(error = %e, "status page fetch failed");
                    return Err(e.into());
                }
            }
        }
    }

    fn within_window(&self, cycle: &RefreshCycle) -> bool {
        cycle
            .last_success
            .is_some_and(|at| at.elapsed() <= self.inner.config.cache_window)
    }

    fn lock_cycle(&self) -> MutexGuard<'_, RefreshCycle> {
        self.inner
            .cycle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

/// Notify every waiter, last arrival first.
fn release_waiters(mut waiters: Vec<Waiter>, outcome: &Result<(), CoreError>) {
    debug!(waiters = waiters.len(), "releasing refresh waiters");
    while let Some(waiter) = waiters.pop() {
        waiter(outcome.clone());
    }
}

/// Clears the in-progress flag if a cycle task dies before finishing.
/// Dropping the waiters wakes their callers with `RefreshAbandoned`.
struct CycleGuard<'a> {
    cycle: &'a Mutex<RefreshCycle>,
    finished: bool,
}

impl Drop for CycleGuard<'_> {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        let mut cycle = self.cycle.lock().unwrap_or_else(PoisonError::into_inner);
        cycle.in_progress = false;
        cycle.waiters.clear();
    }
}
