//! Timer-driven pipeline execution with cooperative cancellation.
//!
//! A [`Pipeline`] performs one fetch-then-apply cycle per [`Pipeline::tick`].
//! [`run_pipeline`] drives it from a [`Ticker`] until the token is cancelled:
//!
//! - the token is checked before every fetch
//! - a tick in flight when the token fires is dropped, which discards its result
//! - failures become a [`Notice`] on the pipeline and the loop continues
//! - ticks never overlap; a tick that falls due while another runs is skipped

use crate::error::SyncError;
use async_trait::async_trait;
use std::time::Duration;
use time::OffsetDateTime;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval, Interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Source of tick instants.
#[async_trait]
pub trait Ticker: Send {
    /// Waits for the next tick. Returns `false` once the clock has ended.
    async fn tick(&mut self) -> bool;
}

/// Wall-clock ticker on a fixed period. The first tick fires immediately.
pub struct IntervalTicker {
    interval: Interval,
}

impl IntervalTicker {
    pub fn new(period: Duration) -> Self {
        let mut ticks = interval(period.max(Duration::from_millis(1)));
        ticks.set_missed_tick_behavior(MissedTickBehavior::Skip);
        Self { interval: ticks }
    }
}

#[async_trait]
impl Ticker for IntervalTicker {
    async fn tick(&mut self) -> bool {
        self.interval.tick().await;
        true
    }
}

/// Ticker advanced by hand through its [`ManualClock`]; ends when every clock
/// handle is dropped.
pub struct ManualTicker {
    rx: mpsc::UnboundedReceiver<()>,
}

#[derive(Clone)]
pub struct ManualClock {
    tx: mpsc::UnboundedSender<()>,
}

impl ManualTicker {
    pub fn new() -> (Self, ManualClock) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { rx }, ManualClock { tx })
    }
}

impl ManualClock {
    /// Queues one tick. Returns `false` if the ticker is gone.
    pub fn advance(&self) -> bool {
        self.tx.send(()).is_ok()
    }
}

#[async_trait]
impl Ticker for ManualTicker {
    async fn tick(&mut self) -> bool {
        self.rx.recv().await.is_some()
    }
}

/// Transient, user-visible description of a failed tick.
#[derive(Debug, Clone, PartialEq)]
pub struct Notice {
    pub source: &'static str,
    pub message: String,
    pub at: OffsetDateTime,
}

impl Notice {
    pub fn new(source: &'static str, message: impl Into<String>) -> Self {
        Self {
            source,
            message: message.into(),
            at: OffsetDateTime::now_utc(),
        }
    }
}

/// Outcome of a tick that applied its data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TickReport {
    /// Points, entries or devices applied by the tick.
    pub applied: usize,
}

/// One independently scheduled fetch-then-apply loop body.
///
/// Implementations await exactly one fetch per tick and apply its result
/// synchronously afterwards, so a tick dropped at its await point leaves the
/// pipeline's state untouched.
#[async_trait]
pub trait Pipeline: Send + 'static {
    fn name(&self) -> &'static str;

    async fn tick(&mut self) -> Result<TickReport, SyncError>;

    /// Records a failed tick for display; existing data is left alone.
    fn report_failure(&mut self, notice: Notice);
}

/// Runs `pipeline` on `ticker` until `token` is cancelled or the ticker ends,
/// then hands the pipeline back.
pub async fn run_pipeline<P, T>(mut pipeline: P, mut ticker: T, token: CancellationToken) -> P
where
    P: Pipeline,
    T: Ticker,
{
    let name = pipeline.name();
    info!(pipeline = name, "pipeline started");

    loop {
        let ticked = tokio::select! {
            biased;
            _ = token.cancelled() => false,
            ticked = ticker.tick() => ticked,
        };
        if !ticked || token.is_cancelled() {
            break;
        }

        let outcome = tokio::select! {
            biased;
            _ = token.cancelled() => Err(SyncError::Stopped),
            outcome = pipeline.tick() => outcome,
        };

        match outcome {
            Ok(report) => debug!(pipeline = name, applied = report.applied, "tick applied"),
            Err(SyncError::Stopped) => break,
            Err(SyncError::FilterChanged) => {
                debug!(pipeline = name, "filter changed mid-fetch; result discarded")
            }
            Err(err) => {
                warn!(pipeline = name, error = %err, "tick failed");
                pipeline.report_failure(Notice::new(name, err.to_string()));
            }
        }
    }

    info!(pipeline = name, "pipeline stopped");
    pipeline
}

/// A pipeline running on its own task.
///
/// Stopping (or dropping) the subscription cancels the task; no fetch is
/// issued and no state is mutated after the cancellation is observed.
pub struct Subscription<P> {
    token: CancellationToken,
    handle: Option<JoinHandle<P>>,
}

impl<P: Pipeline> Subscription<P> {
    pub fn spawn<T>(pipeline: P, ticker: T) -> Self
    where
        T: Ticker + 'static,
    {
        let token = CancellationToken::new();
        let handle = tokio::spawn(run_pipeline(pipeline, ticker, token.clone()));
        Self {
            token,
            handle: Some(handle),
        }
    }

    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    pub fn is_stopped(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Cancels the task and waits for it, returning the pipeline.
    pub async fn stop(mut self) -> Option<P> {
        self.token.cancel();
        match self.handle.take() {
            Some(handle) => handle.await.ok(),
            None => None,
        }
    }
}

impl<P> Drop for Subscription<P> {
    fn drop(&mut self) {
        self.token.cancel();
    }
}
