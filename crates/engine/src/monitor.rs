use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

/// Sliding window for the average query latency.
const QUERY_WINDOW: usize = 100;

/// Serializable view of [`PerformanceMonitor`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PerformanceSnapshot {
    pub uptime_secs: f64,
    /// Completed calls per operation name.
    pub operations: BTreeMap<String, u64>,
    pub avg_ms: BTreeMap<String, f64>,
    pub last_ms: BTreeMap<String, f64>,
    pub total_queries: u64,
    /// Mean over the most recent queries.
    pub avg_query_ms: f64,
    pub total_items: u64,
}

#[derive(Debug, Default)]
struct Timer {
    count: u64,
    total: Duration,
    last: Duration,
}

#[derive(Debug, Default)]
struct MonitorState {
    timers: BTreeMap<String, Timer>,
    query_times: VecDeque<Duration>,
    total_queries: u64,
    total_items: u64,
}

/// Per-operation counters and timings.
#[derive(Debug)]
pub struct PerformanceMonitor {
    started: Instant,
    state: Mutex<MonitorState>,
}

impl PerformanceMonitor {
    #[must_use]
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
            state: Mutex::new(MonitorState::default()),
        }
    }

    pub fn record(&self, operation: &str, elapsed: Duration) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let timer = state.timers.entry(operation.to_string()).or_default();
        timer.count += 1;
        timer.total += elapsed;
        timer.last = elapsed;
    }

    pub fn record_query(&self, elapsed: Duration) {
        self.record("search", elapsed);
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.total_queries += 1;
        if state.query_times.len() == QUERY_WINDOW {
            state.query_times.pop_front();
        }
        state.query_times.push_back(elapsed);
    }

    pub fn add_items(&self, count: u64) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.total_items += count;
    }

    #[must_use]
    pub fn snapshot(&self) -> PerformanceSnapshot {
        let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let mut snapshot = PerformanceSnapshot {
            uptime_secs: self.started.elapsed().as_secs_f64(),
            total_queries: state.total_queries,
            total_items: state.total_items,
            ..PerformanceSnapshot::default()
        };
        for (name, timer) in &state.timers {
            snapshot.operations.insert(name.clone(), timer.count);
            #[allow(clippy::cast_precision_loss)]
            let avg = millis(timer.total) / timer.count.max(1) as f64;
            snapshot.avg_ms.insert(name.clone(), avg);
            snapshot.last_ms.insert(name.clone(), millis(timer.last));
        }
        if !state.query_times.is_empty() {
            let total: Duration = state.query_times.iter().sum();
            #[allow(clippy::cast_precision_loss)]
            let window = state.query_times.len() as f64;
            snapshot.avg_query_ms = millis(total) / window;
        }
        snapshot
    }
}

impl Default for PerformanceMonitor {
    fn default() -> Self {
        Self::new()
    }
}

fn millis(duration: Duration) -> f64 {
    duration.as_secs_f64() * 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn aggregates_timings_per_operation() {
        let monitor = PerformanceMonitor::new();
        monitor.record("store", Duration::from_millis(10));
        monitor.record("store", Duration::from_millis(30));
        monitor.record_query(Duration::from_millis(4));
        monitor.add_items(2);

        let snapshot = monitor.snapshot();
        assert_eq!(snapshot.operations.get("store"), Some(&2));
        assert_eq!(snapshot.operations.get("search"), Some(&1));
        assert!((snapshot.avg_ms["store"] - 20.0).abs() < 1e-9);
        assert!((snapshot.last_ms["store"] - 30.0).abs() < 1e-9);
        assert!((snapshot.avg_query_ms - 4.0).abs() < 1e-9);
        assert_eq!(snapshot.total_queries, 1);
        assert_eq!(snapshot.total_items, 2);
    }

    #[test]
    fn query_window_is_bounded() {
        let monitor = PerformanceMonitor::new();
        monitor.record_query(Duration::from_millis(1000));
        for _ in 0..QUERY_WINDOW {
            monitor.record_query(Duration::from_millis(2));
        }
        let snapshot = monitor.snapshot();
        assert!((snapshot.avg_query_ms - 2.0).abs() < 1e-9);
        assert_eq!(snapshot.total_queries, QUERY_WINDOW as u64 + 1);
    }
}
