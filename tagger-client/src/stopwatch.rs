//! Stopwatch synchronization
//!
//! The match clock lives on the backend; this unit mirrors it. Commands
//! (start/stop/reset) are confirmed by the server before local state
//! changes. While the clock runs, a background poller refreshes the elapsed
//! time every [`POLL_PERIOD`].
//!
//! Polling lifecycle:
//! - at most one poller exists per unit; arming cancels the previous one
//! - leaving `Running` cancels the poller immediately
//! - a tick result is applied only while its poller is still current and
//!   the clock is still running, so a response landing after `stop()` is
//!   dropped
//! - a failed tick is logged and skipped; the next tick retries
//!
//! Dropping the unit cancels its poller.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::NaiveDateTime;
use tagger_common::match_clock::format_match_clock;
use tagger_common::model::{StopwatchAction, StopwatchStatus};
use tagger_common::SessionId;
use tokio::sync::{watch, RwLock};
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::api::TaggerApi;
use crate::{Error, Result};

/// Fixed elapsed-time poll period
pub const POLL_PERIOD: Duration = Duration::from_millis(500);

/// Point-in-time view of the mirrored clock
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StopwatchSnapshot {
    pub running: bool,
    /// Seconds, never negative
    pub elapsed_time: f64,
    pub start_time: Option<NaiveDateTime>,
    /// A command is in flight
    pub loading: bool,
    /// Last command or sync failure, cleared by the next success
    pub last_error: Option<String>,
}

impl StopwatchSnapshot {
    /// `M:SS` rendering of the elapsed time
    pub fn display(&self) -> String {
        format_match_clock(self.elapsed_time)
    }

    pub fn can_start(&self) -> bool {
        !self.running && !self.loading
    }

    pub fn can_stop(&self) -> bool {
        self.running && !self.loading
    }

    fn adopt(&mut self, status: &StopwatchStatus) {
        self.running = status.running;
        self.elapsed_time = status.elapsed_time.max(0.0);
        self.start_time = status.start_time;
        self.last_error = None;
    }
}

pub struct StopwatchSync {
    api: Arc<dyn TaggerApi>,
    session: watch::Receiver<SessionId>,
    state: Arc<RwLock<StopwatchSnapshot>>,
    /// Token of the live poller, if any
    poller: Mutex<Option<CancellationToken>>,
    /// Bumped whenever the live poller changes; stale ticks compare against it
    generation: Arc<AtomicU64>,
    period: Duration,
}

impl StopwatchSync {
    pub fn new(api: Arc<dyn TaggerApi>, session: watch::Receiver<SessionId>) -> Self {
        Self::with_period(api, session, POLL_PERIOD)
    }

    pub fn with_period(
        api: Arc<dyn TaggerApi>,
        session: watch::Receiver<SessionId>,
        period: Duration,
    ) -> Self {
        Self {
            api,
            session,
            state: Arc::new(RwLock::new(StopwatchSnapshot::default())),
            poller: Mutex::new(None),
            generation: Arc::new(AtomicU64::new(0)),
            period,
        }
    }

    fn current_session(&self) -> SessionId {
        self.session.borrow().clone()
    }

    /// Seed local state from the server, arming polling if its clock runs
    ///
    /// Covers a restart while the backend-side clock is already running.
    pub async fn mount(&self) -> Result<StopwatchSnapshot> {
        let session = self.current_session();
        match self.api.stopwatch_status(&session).await {
            Ok(status) => {
                self.state.write().await.adopt(&status);
                if status.running {
                    self.arm_polling();
                } else {
                    self.cancel_polling();
                }
                debug!(session = %session, running = status.running, "Stopwatch synced");
                Ok(self.snapshot().await)
            }
            Err(e) => {
                warn!(session = %session, "Initial stopwatch sync failed: {}", e);
                self.state.write().await.last_error = Some(e.to_string());
                Err(e)
            }
        }
    }

    /// Stopped -> Running
    pub async fn start(&self) -> Result<StopwatchSnapshot> {
        if self.snapshot().await.running {
            return Err(Error::InvalidState("Stopwatch is already running".to_string()));
        }
        let status = self.command(StopwatchAction::Start).await?;
        if status.running {
            self.arm_polling();
        }
        Ok(self.snapshot().await)
    }

    /// Running -> Stopped; the display freezes at the server's value
    pub async fn stop(&self) -> Result<StopwatchSnapshot> {
        if !self.snapshot().await.running {
            return Err(Error::InvalidState("Stopwatch is not running".to_string()));
        }
        self.command(StopwatchAction::Stop).await?;
        self.cancel_polling();
        Ok(self.snapshot().await)
    }

    /// Any -> Stopped with zero elapsed time
    pub async fn reset(&self) -> Result<StopwatchSnapshot> {
        self.command(StopwatchAction::Reset).await?;
        self.cancel_polling();
        {
            let mut state = self.state.write().await;
            state.running = false;
            state.elapsed_time = 0.0;
            state.start_time = None;
        }
        Ok(self.snapshot().await)
    }

    /// Send a command; state is adopted only on success
    async fn command(&self, action: StopwatchAction) -> Result<StopwatchStatus> {
        {
            let mut state = self.state.write().await;
            if state.loading {
                return Err(Error::InvalidState(
                    "Another stopwatch command is in flight".to_string(),
                ));
            }
            state.loading = true;
        }

        let session = self.current_session();
        let result = self.api.stopwatch_command(&session, action).await;

        let mut state = self.state.write().await;
        state.loading = false;
        match result {
            Ok(status) => {
                state.adopt(&status);
                info!(session = %session, action = %action, elapsed = status.elapsed_time, "Stopwatch command applied");
                Ok(status)
            }
            Err(e) => {
                error!(session = %session, action = %action, "Stopwatch command failed: {}", e);
                state.last_error = Some(e.to_string());
                Err(e)
            }
        }
    }

    /// Run one poll tick now
    ///
    /// The result is applied only while the clock is running. Unlike the
    /// background poller, failures are returned to the caller.
    pub async fn poll_once(&self) -> Result<StopwatchSnapshot> {
        let session = self.current_session();
        let elapsed = self.api.elapsed_time(&session).await?;
        {
            let mut state = self.state.write().await;
            if state.running {
                state.elapsed_time = elapsed.elapsed_time.max(0.0);
            }
        }
        Ok(self.snapshot().await)
    }

    pub async fn snapshot(&self) -> StopwatchSnapshot {
        self.state.read().await.clone()
    }

    /// Formatted elapsed time (`M:SS`)
    pub async fn display(&self) -> String {
        self.state.read().await.display()
    }

    pub async fn can_start(&self) -> bool {
        self.state.read().await.can_start()
    }

    pub async fn can_stop(&self) -> bool {
        self.state.read().await.can_stop()
    }

    /// Whether a background poller is armed
    pub fn is_polling(&self) -> bool {
        self.poller
            .lock()
            .map(|p| p.as_ref().map_or(false, |t| !t.is_cancelled()))
            .unwrap_or(false)
    }

    /// Stop polling and forget all local clock state
    pub async fn discard(&self) {
        self.cancel_polling();
        *self.state.write().await = StopwatchSnapshot::default();
    }

    /// Replace any live poller with a fresh one
    fn arm_polling(&self) {
        let token = CancellationToken::new();
        let generation = {
            let mut slot = match self.poller.lock() {
                Ok(slot) => slot,
                Err(poisoned) => poisoned.into_inner(),
            };
            if let Some(previous) = slot.replace(token.clone()) {
                previous.cancel();
            }
            self.generation.fetch_add(1, Ordering::SeqCst) + 1
        };

        let api = Arc::clone(&self.api);
        let session = self.session.clone();
        let state = Arc::clone(&self.state);
        let current = Arc::clone(&self.generation);
        let period = self.period;

        debug!(generation, "Stopwatch polling armed");
        tokio::spawn(async move {
            let mut timer = interval_at(Instant::now() + period, period);
            timer.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => break,
                    _ = timer.tick() => {}
                }

                let id = session.borrow().clone();
                match api.elapsed_time(&id).await {
                    Ok(elapsed) => {
                        let mut snapshot = state.write().await;
                        if token.is_cancelled() || current.load(Ordering::SeqCst) != generation {
                            break;
                        }
                        if snapshot.running {
                            snapshot.elapsed_time = elapsed.elapsed_time.max(0.0);
                        }
                    }
                    Err(e) => warn!(session = %id, "Elapsed time poll failed: {}", e),
                }
            }

            debug!(generation, "Stopwatch polling stopped");
        });
    }

    fn cancel_polling(&self) {
        let mut slot = match self.poller.lock() {
            Ok(slot) => slot,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Some(token) = slot.take() {
            token.cancel();
            self.generation.fetch_add(1, Ordering::SeqCst);
        }
    }
}

impl Drop for StopwatchSync {
    fn drop(&mut self) {
        self.cancel_polling();
    }
}
