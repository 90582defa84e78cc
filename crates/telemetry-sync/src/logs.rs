//! Incremental ("tail") retrieval of the receiver's log ring.
//!
//! A subscription starts with one full fetch under its filter and then keeps
//! appending the results of delta fetches. The backend tracks what it already
//! delivered, so entries are appended as received without any local dedup.
//! Any filter change or manual refresh starts over with an empty collection.

use crate::error::SyncError;
use crate::metrics::SyncMetrics;
use crate::schedule::{IntervalTicker, Notice, Pipeline, TickReport};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;
use swarm_client::{LogEntry, LogFilter, LogLevel, SwarmSource};
use tokio::sync::watch;
use tracing::info;

/// Read side of a log subscription.
#[derive(Debug, Clone, Default)]
pub struct LogView {
    /// Filter the entries below were fetched under.
    pub filter: LogFilter,
    pub entries: Vec<LogEntry>,
    /// Whether the full fetch for `filter` has been applied.
    pub loaded: bool,
    pub notice: Option<Notice>,
}

impl LogView {
    pub fn sender_options(&self) -> Vec<String> {
        sender_options(&self.entries, self.filter.sender.as_deref())
    }
}

/// Distinct non-empty sender ids of `entries`, plus the selected one, sorted.
pub fn sender_options(entries: &[LogEntry], selected: Option<&str>) -> Vec<String> {
    let mut senders: BTreeSet<&str> = entries.iter().filter_map(|e| e.sender()).collect();
    if let Some(selected) = selected.filter(|s| !s.is_empty()) {
        senders.insert(selected);
    }
    senders.into_iter().map(str::to_string).collect()
}

#[derive(Debug, Clone, PartialEq)]
struct TailRequest {
    filter: LogFilter,
    /// Bumped on every restart, including refreshes under the same filter.
    generation: u64,
}

/// Control side of a log subscription, usable from the presentation layer.
#[derive(Clone)]
pub struct LogTailHandle {
    tx: Arc<watch::Sender<TailRequest>>,
}

impl LogTailHandle {
    /// Switches to `filter`. A filter equal to the active one is ignored.
    pub fn set_filter(&self, filter: LogFilter) {
        self.tx.send_if_modified(|req| {
            if req.filter == filter {
                return false;
            }
            req.filter = filter;
            req.generation += 1;
            true
        });
    }

    pub fn set_level(&self, level: LogLevel) {
        let sender = self.filter().sender;
        self.set_filter(LogFilter::new(level, sender));
    }

    pub fn set_sender(&self, sender: Option<String>) {
        let level = self.filter().level;
        self.set_filter(LogFilter::new(level, sender));
    }

    /// Discards the collection and re-runs the full fetch under the same filter.
    pub fn refresh(&self) {
        self.tx.send_modify(|req| req.generation += 1);
    }

    pub fn filter(&self) -> LogFilter {
        self.tx.borrow().filter.clone()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Full,
    Delta,
}

pub struct LogTailer {
    source: Arc<dyn SwarmSource>,
    requests: watch::Receiver<TailRequest>,
    /// Generation the collection was built under.
    generation: u64,
    phase: Phase,
    period: Duration,
    view: Arc<RwLock<LogView>>,
    metrics: Option<SyncMetrics>,
}

impl LogTailer {
    pub fn new(
        source: Arc<dyn SwarmSource>,
        filter: LogFilter,
        period: Duration,
    ) -> (Self, LogTailHandle) {
        let (tx, rx) = watch::channel(TailRequest {
            filter: filter.clone(),
            generation: 0,
        });
        let tailer = Self {
            source,
            requests: rx,
            generation: 0,
            phase: Phase::Full,
            period,
            view: Arc::new(RwLock::new(LogView {
                filter,
                ..LogView::default()
            })),
            metrics: None,
        };
        (tailer, LogTailHandle { tx: Arc::new(tx) })
    }

    pub fn with_metrics(mut self, metrics: SyncMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn view(&self) -> Arc<RwLock<LogView>> {
        Arc::clone(&self.view)
    }

    pub fn ticker(&self) -> IntervalTicker {
        IntervalTicker::new(self.period)
    }

    /// Picks up a pending filter change or refresh: clears the collection and
    /// schedules a full fetch. Requests stay visible after every handle is
    /// dropped, so the last one is still honored.
    fn sync_request(&mut self) -> LogFilter {
        let request = self.requests.borrow_and_update().clone();
        if request.generation != self.generation {
            info!(
                log_level = %request.filter.level,
                sender = ?request.filter.sender,
                "log filter restarted"
            );
            self.generation = request.generation;
            let mut view = self.view.write();
            view.filter = request.filter.clone();
            view.entries.clear();
            view.loaded = false;
            view.notice = None;
            self.phase = Phase::Full;
        }
        request.filter
    }

    fn is_superseded(&self) -> bool {
        self.requests.borrow().generation != self.generation
    }

    fn record_len(&self, len: usize) {
        if let Some(metrics) = &self.metrics {
            metrics.log_entries.set(len as i64);
        }
    }
}

#[async_trait]
impl Pipeline for LogTailer {
    fn name(&self) -> &'static str {
        "logs"
    }

    async fn tick(&mut self) -> Result<TickReport, SyncError> {
        let filter = self.sync_request();
        let phase = self.phase;

        let fetched = match phase {
            Phase::Full => self.source.logs(&filter).await,
            Phase::Delta => self.source.new_logs(&filter).await,
        };
        let entries = match fetched {
            Ok(entries) => entries,
            Err(err) => {
                if let Some(metrics) = &self.metrics {
                    metrics.log_fetch_failures.inc();
                }
                return Err(err.into());
            }
        };

        // A result fetched under a superseded filter must not leak into the
        // collection of the new one.
        if self.is_superseded() {
            return Err(SyncError::FilterChanged);
        }

        let applied = entries.len();
        let mut view = self.view.write();
        match phase {
            Phase::Full => {
                view.entries = entries;
                view.loaded = true;
                self.phase = Phase::Delta;
            }
            Phase::Delta => view.entries.extend(entries),
        }
        view.notice = None;
        let len = view.entries.len();
        drop(view);

        self.record_len(len);
        Ok(TickReport { applied })
    }

    fn report_failure(&mut self, notice: Notice) {
        self.view.write().notice = Some(notice);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schedule::{run_pipeline, ManualTicker};
    use swarm_client::{MockCall, MockSource, SourceError};
    use tokio_util::sync::CancellationToken;

    fn entry(message: &str, sender: Option<&str>) -> LogEntry {
        LogEntry::new("INFO", "00:00:01", message, sender)
    }

    fn messages(view: &Arc<RwLock<LogView>>) -> Vec<String> {
        view.read()
            .entries
            .iter()
            .map(|e| e.message.clone())
            .collect()
    }

    fn tailer(mock: &Arc<MockSource>, filter: LogFilter) -> (LogTailer, LogTailHandle) {
        LogTailer::new(mock.clone(), filter, Duration::from_millis(1000))
    }

    #[tokio::test]
    async fn test_full_then_deltas_append_in_order() {
        let mock = Arc::new(MockSource::new());
        mock.push_logs(Ok(vec![entry("a", None), entry("b", None), entry("c", None)]));
        mock.push_new_logs(Ok(vec![entry("d", None)]));
        mock.push_new_logs(Ok(vec![]));

        let (mut tailer, _handle) = tailer(&mock, LogFilter::default());
        let view = tailer.view();
        assert_eq!(tailer.tick().await.unwrap().applied, 3);
        assert_eq!(tailer.tick().await.unwrap().applied, 1);
        assert_eq!(tailer.tick().await.unwrap().applied, 0);

        assert_eq!(messages(&view), vec!["a", "b", "c", "d"]);
        assert!(view.read().loaded);
        let filter = LogFilter::default();
        assert_eq!(
            mock.calls(),
            vec![
                MockCall::Logs(filter.clone()),
                MockCall::NewLogs(filter.clone()),
                MockCall::NewLogs(filter),
            ]
        );
    }

    #[tokio::test]
    async fn test_filter_change_restarts_with_full_fetch() {
        let mock = Arc::new(MockSource::new());
        mock.push_logs(Ok(vec![entry("all-1", None), entry("all-2", Some("AA:01"))]));
        mock.push_new_logs(Ok(vec![entry("all-3", None)]));
        mock.push_logs(Ok(vec![entry("err-1", Some("AA:01"))]));
        mock.push_new_logs(Ok(vec![entry("err-2", Some("AA:01"))]));

        let (mut tailer, handle) = tailer(&mock, LogFilter::default());
        let view = tailer.view();
        tailer.tick().await.unwrap();
        tailer.tick().await.unwrap();
        assert_eq!(messages(&view), vec!["all-1", "all-2", "all-3"]);

        let errors = LogFilter::new(LogLevel::Error, Some("AA:01".into()));
        handle.set_filter(errors.clone());
        tailer.tick().await.unwrap();
        assert_eq!(messages(&view), vec!["err-1"]);
        assert_eq!(view.read().filter, errors);
        tailer.tick().await.unwrap();
        assert_eq!(messages(&view), vec!["err-1", "err-2"]);

        let calls = mock.calls();
        assert_eq!(calls[2], MockCall::Logs(errors.clone()));
        assert_eq!(calls[3], MockCall::NewLogs(errors));
    }

    #[tokio::test]
    async fn test_filter_change_survives_dropped_handle() {
        let mock = Arc::new(MockSource::new());
        mock.push_logs(Ok(vec![entry("all-1", None)]));
        mock.push_logs(Ok(vec![entry("err-1", None)]));
        mock.push_new_logs(Ok(vec![entry("err-delta", None)]));

        let (mut tailer, handle) = tailer(&mock, LogFilter::default());
        let view = tailer.view();
        tailer.tick().await.unwrap();

        handle.set_level(LogLevel::Error);
        drop(handle);
        tailer.tick().await.unwrap();
        assert_eq!(messages(&view), vec!["err-1"]);
        assert_eq!(view.read().filter.level, LogLevel::Error);

        tailer.tick().await.unwrap();
        assert_eq!(messages(&view), vec!["err-1", "err-delta"]);
        let errors = LogFilter::new(LogLevel::Error, None);
        assert_eq!(
            mock.calls(),
            vec![
                MockCall::Logs(LogFilter::default()),
                MockCall::Logs(errors.clone()),
                MockCall::NewLogs(errors),
            ]
        );
    }

    #[tokio::test]
    async fn test_same_filter_is_not_a_restart() {
        let mock = Arc::new(MockSource::new());
        mock.push_logs(Ok(vec![entry("a", None)]));
        mock.push_new_logs(Ok(vec![entry("b", None)]));

        let (mut tailer, handle) = tailer(&mock, LogFilter::default());
        tailer.tick().await.unwrap();
        handle.set_level(LogLevel::All);
        handle.set_sender(None);
        tailer.tick().await.unwrap();

        assert_eq!(messages(&tailer.view()), vec!["a", "b"]);
        assert!(matches!(mock.calls()[1], MockCall::NewLogs(_)));
    }

    #[tokio::test]
    async fn test_refresh_replaces_collection() {
        let mock = Arc::new(MockSource::new());
        mock.push_logs(Ok(vec![entry("a", None)]));
        mock.push_new_logs(Ok(vec![entry("b", None)]));
        mock.push_logs(Ok(vec![entry("a", None), entry("b", None), entry("c", None)]));

        let (mut tailer, handle) = tailer(&mock, LogFilter::default());
        tailer.tick().await.unwrap();
        tailer.tick().await.unwrap();
        handle.refresh();
        tailer.tick().await.unwrap();

        assert_eq!(messages(&tailer.view()), vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_failures_keep_entries_and_retry() {
        let mock = Arc::new(MockSource::new());
        mock.push_logs(Err(SourceError::Transport {
            endpoint: "/logging/getLogs".into(),
            message: "connection reset".into(),
        }));
        mock.push_logs(Ok(vec![entry("a", None)]));
        mock.push_new_logs(Err(SourceError::Status {
            endpoint: "/logging/getNewLogs".into(),
            status: 500,
        }));
        mock.push_new_logs(Ok(vec![entry("b", None)]));

        let (tailer, _handle) = tailer(&mock, LogFilter::default());
        let view = tailer.view();
        let (ticker, clock) = ManualTicker::new();
        for _ in 0..4 {
            clock.advance();
        }
        drop(clock);
        run_pipeline(tailer, ticker, CancellationToken::new()).await;

        assert_eq!(messages(&view), vec!["a", "b"]);
        assert!(view.read().notice.is_none());
        let calls = mock.calls();
        // A failed full fetch is retried as a full fetch.
        assert!(matches!(calls[0], MockCall::Logs(_)));
        assert!(matches!(calls[1], MockCall::Logs(_)));
        assert!(matches!(calls[2], MockCall::NewLogs(_)));
        assert!(matches!(calls[3], MockCall::NewLogs(_)));
    }

    #[tokio::test]
    async fn test_failed_delta_surfaces_notice_without_clearing() {
        let mock = Arc::new(MockSource::new());
        mock.push_logs(Ok(vec![entry("a", None), entry("b", None)]));
        mock.push_new_logs(Err(SourceError::Decode {
            endpoint: "/logging/getNewLogs".into(),
            message: "EOF while parsing".into(),
        }));

        let (tailer, _handle) = tailer(&mock, LogFilter::default());
        let view = tailer.view();
        let (ticker, clock) = ManualTicker::new();
        clock.advance();
        clock.advance();
        drop(clock);
        run_pipeline(tailer, ticker, CancellationToken::new()).await;

        assert_eq!(messages(&view), vec!["a", "b"]);
        let notice = view.read().notice.clone().unwrap();
        assert_eq!(notice.source, "logs");
    }

    /// Wraps a mock and switches the filter while the first full fetch is in flight.
    struct RacingSource {
        inner: MockSource,
        handle: parking_lot::Mutex<Option<LogTailHandle>>,
    }

    #[async_trait]
    impl SwarmSource for RacingSource {
        async fn devices(&self) -> swarm_client::Result<Vec<swarm_client::DeviceSnapshot>> {
            self.inner.devices().await
        }
        async fn sensor_values(
            &self,
            device: Option<&str>,
        ) -> swarm_client::Result<Vec<swarm_client::SensorReading>> {
            self.inner.sensor_values(device).await
        }
        async fn logs(&self, filter: &LogFilter) -> swarm_client::Result<Vec<LogEntry>> {
            if let Some(handle) = self.handle.lock().take() {
                handle.set_level(LogLevel::Error);
            }
            self.inner.logs(filter).await
        }
        async fn new_logs(&self, filter: &LogFilter) -> swarm_client::Result<Vec<LogEntry>> {
            self.inner.new_logs(filter).await
        }
        async fn sensor_settings(&self) -> swarm_client::Result<Vec<swarm_client::SensorGroup>> {
            self.inner.sensor_settings().await
        }
        async fn toggle_function(&self, name: &str, enabled: bool) -> swarm_client::Result<()> {
            self.inner.toggle_function(name, enabled).await
        }
        async fn send_command(
            &self,
            command: swarm_client::DeviceCommand,
            device: &str,
        ) -> swarm_client::Result<()> {
            self.inner.send_command(command, device).await
        }
    }

    #[tokio::test]
    async fn test_result_of_superseded_filter_is_discarded() {
        let racing = Arc::new(RacingSource {
            inner: MockSource::new(),
            handle: parking_lot::Mutex::new(None),
        });
        racing.inner.push_logs(Ok(vec![entry("stale", None)]));
        racing.inner.push_logs(Ok(vec![entry("fresh", None)]));

        let (mut tailer, handle) =
            LogTailer::new(racing.clone(), LogFilter::default(), Duration::from_secs(1));
        *racing.handle.lock() = Some(handle);
        let view = tailer.view();

        assert!(matches!(tailer.tick().await, Err(SyncError::FilterChanged)));
        assert!(view.read().entries.is_empty());

        tailer.tick().await.unwrap();
        assert_eq!(messages(&view), vec!["fresh"]);
        assert_eq!(view.read().filter.level, LogLevel::Error);
        assert_eq!(
            racing.inner.calls()[1],
            MockCall::Logs(LogFilter::new(LogLevel::Error, None))
        );
    }

    #[test]
    fn test_sender_options_sorted_distinct_with_selection() {
        let entries = vec![
            entry("1", Some("CC:03")),
            entry("2", None),
            entry("3", Some("AA:01")),
            entry("4", Some("CC:03")),
            entry("5", Some("")),
        ];
        assert_eq!(sender_options(&entries, None), vec!["AA:01", "CC:03"]);
        assert_eq!(
            sender_options(&entries, Some("BB:02")),
            vec!["AA:01", "BB:02", "CC:03"]
        );
    }
}
