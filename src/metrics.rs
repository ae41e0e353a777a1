/// Metrics for the two page retrieval paths
///
/// Tracks attempts, outcomes and latency for direct downloads and render captures

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

/// Which network path produced (or failed to produce) a page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RetrievalPath {
    Direct,
    Render,
}

impl fmt::Display for RetrievalPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RetrievalPath::Direct => f.write_str("direct"),
            RetrievalPath::Render => f.write_str("render"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathMetrics {
    pub path: RetrievalPath,
    pub total_requests: u64,
    pub successful_requests: u64,
    pub failed_requests: u64,
    pub last_success: Option<DateTime<Utc>>,
    pub last_failure: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    pub average_response_time_ms: f64,
    pub total_response_time_ms: u64,
    pub timeout_count: u64,
}

impl PathMetrics {
    pub fn new(path: RetrievalPath) -> Self {
        Self {
            path,
            total_requests: 0,
            successful_requests: 0,
            failed_requests: 0,
            last_success: None,
            last_failure: None,
            last_error: None,
            average_response_time_ms: 0.0,
            total_response_time_ms: 0,
            timeout_count: 0,
        }
    }

    pub fn success_rate(&self) -> f64 {
        if self.total_requests == 0 {
            0.0
        } else {
            (self.successful_requests as f64 / self.total_requests as f64) * 100.0
        }
    }

    pub fn record_success(&mut self, response_time: Duration) {
        self.total_requests += 1;
        self.successful_requests += 1;
        self.last_success = Some(Utc::now());

        let response_ms = response_time.as_millis() as u64;
        self.total_response_time_ms += response_ms;
        self.average_response_time_ms =
            self.total_response_time_ms as f64 / self.successful_requests as f64;
    }

    pub fn record_failure(&mut self, error: String) {
        self.total_requests += 1;
        self.failed_requests += 1;
        self.last_failure = Some(Utc::now());

        if error.to_lowercase().contains("timeout") || error.contains("timed out") {
            self.timeout_count += 1;
        }
        self.last_error = Some(error);
    }
}

/// Process-wide retrieval metrics
#[derive(Default)]
pub struct MetricsTracker {
    metrics: Mutex<HashMap<RetrievalPath, PathMetrics>>,
}

impl MetricsTracker {
    pub fn new() -> Self {
        Self::default()
    }

    // A panic while holding the lock leaves the counters usable
    fn lock(&self) -> MutexGuard<'_, HashMap<RetrievalPath, PathMetrics>> {
        self.metrics.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn record_success(&self, path: RetrievalPath, response_time: Duration) {
        let mut metrics = self.lock();
        let path_metrics = metrics
            .entry(path)
            .or_insert_with(|| PathMetrics::new(path));
        path_metrics.record_success(response_time);

        log::debug!(
            "[{}] Success - Response time: {}ms - Success rate: {:.2}%",
            path,
            response_time.as_millis(),
            path_metrics.success_rate()
        );
    }

    pub fn record_failure(&self, path: RetrievalPath, error: String) {
        let mut metrics = self.lock();
        let path_metrics = metrics
            .entry(path)
            .or_insert_with(|| PathMetrics::new(path));
        path_metrics.record_failure(error);

        log::debug!(
            "[{}] Failure - Success rate: {:.2}%",
            path,
            path_metrics.success_rate()
        );
    }

    pub fn get_metrics(&self, path: RetrievalPath) -> Option<PathMetrics> {
        self.lock().get(&path).cloned()
    }

    pub fn get_all_metrics(&self) -> Vec<PathMetrics> {
        let mut all: Vec<PathMetrics> = self.lock().values().cloned().collect();
        all.sort_by_key(|m| m.path as u8);
        all
    }
}

/// Time an operation and record its outcome against `path`
pub async fn track_request<F, T, E>(
    tracker: &MetricsTracker,
    path: RetrievalPath,
    operation: F,
) -> Result<T, E>
where
    F: std::future::Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let start = Instant::now();
    let result = operation.await;
    let duration = start.elapsed();

    match &result {
        Ok(_) => tracker.record_success(path, duration),
        Err(e) => tracker.record_failure(path, e.to_string()),
    }

    result
}
