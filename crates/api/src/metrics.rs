use serde::Serialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

pub struct Metrics {
    // Counters
    total_requests: AtomicUsize,
    successful_requests: AtomicUsize,
    failed_requests: AtomicUsize,

    // Timing (in microseconds)
    total_extract_time_us: AtomicU64,
    total_merge_time_us: AtomicU64,
    total_summarize_time_us: AtomicU64,

    // Counts
    graph_builds: AtomicUsize,
    merges: AtomicUsize,
    summarize_runs: AtomicUsize,
    chunks_extracted: AtomicUsize,
    chunks_failed: AtomicUsize,
    paragraphs_summarized: AtomicUsize,
    questions_generated: AtomicUsize,
}

impl Metrics {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            total_requests: AtomicUsize::new(0),
            successful_requests: AtomicUsize::new(0),
            failed_requests: AtomicUsize::new(0),
            total_extract_time_us: AtomicU64::new(0),
            total_merge_time_us: AtomicU64::new(0),
            total_summarize_time_us: AtomicU64::new(0),
            graph_builds: AtomicUsize::new(0),
            merges: AtomicUsize::new(0),
            summarize_runs: AtomicUsize::new(0),
            chunks_extracted: AtomicUsize::new(0),
            chunks_failed: AtomicUsize::new(0),
            paragraphs_summarized: AtomicUsize::new(0),
            questions_generated: AtomicUsize::new(0),
        })
    }

    pub fn record_request(&self, success: bool) {
        self.total_requests.fetch_add(1, Ordering::Relaxed);
        if success {
            self.successful_requests.fetch_add(1, Ordering::Relaxed);
        } else {
            self.failed_requests.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_extraction(&self, duration: Duration, succeeded: usize, failed: usize) {
        self.total_extract_time_us.fetch_add(duration.as_micros() as u64, Ordering::Relaxed);
        self.graph_builds.fetch_add(1, Ordering::Relaxed);
        self.chunks_extracted.fetch_add(succeeded, Ordering::Relaxed);
        self.chunks_failed.fetch_add(failed, Ordering::Relaxed);
    }

    pub fn record_merge(&self, duration: Duration) {
        self.total_merge_time_us.fetch_add(duration.as_micros() as u64, Ordering::Relaxed);
        self.merges.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_summaries(&self, duration: Duration, paragraphs: usize) {
        self.total_summarize_time_us.fetch_add(duration.as_micros() as u64, Ordering::Relaxed);
        self.summarize_runs.fetch_add(1, Ordering::Relaxed);
        self.paragraphs_summarized.fetch_add(paragraphs, Ordering::Relaxed);
    }

    pub fn record_questions(&self, count: usize) {
        self.questions_generated.fetch_add(count, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            total_requests: self.total_requests.load(Ordering::Relaxed),
            successful_requests: self.successful_requests.load(Ordering::Relaxed),
            failed_requests: self.failed_requests.load(Ordering::Relaxed),
            avg_extract_time_ms: avg_time_ms(&self.total_extract_time_us, &self.graph_builds),
            avg_merge_time_ms: avg_time_ms(&self.total_merge_time_us, &self.merges),
            avg_summarize_time_ms: avg_time_ms(&self.total_summarize_time_us, &self.summarize_runs),
            chunks_extracted: self.chunks_extracted.load(Ordering::Relaxed),
            chunks_failed: self.chunks_failed.load(Ordering::Relaxed),
            paragraphs_summarized: self.paragraphs_summarized.load(Ordering::Relaxed),
            questions_generated: self.questions_generated.load(Ordering::Relaxed),
        }
    }
}

fn avg_time_ms(total_us: &AtomicU64, count: &AtomicUsize) -> f64 {
    let total = total_us.load(Ordering::Relaxed) as f64;
    let cnt = count.load(Ordering::Relaxed) as f64;
    if cnt > 0.0 {
        total / cnt / 1000.0 // Convert to ms
    } else {
        0.0
    }
}

#[derive(Debug, Serialize)]
pub struct MetricsSnapshot {
    pub total_requests: usize,
    pub successful_requests: usize,
    pub failed_requests: usize,
    pub avg_extract_time_ms: f64,
    pub avg_merge_time_ms: f64,
    pub avg_summarize_time_ms: f64,
    pub chunks_extracted: usize,
    pub chunks_failed: usize,
    pub paragraphs_summarized: usize,
    pub questions_generated: usize,
}

pub struct TimedOperation {
    start: Instant,
}

impl TimedOperation {
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_averages() {
        let metrics = Metrics::new();
        metrics.record_request(true);
        metrics.record_request(false);
        metrics.record_extraction(Duration::from_millis(40), 2, 1);
        metrics.record_extraction(Duration::from_millis(20), 3, 0);

        let snapshot = metrics.snapshot();

        assert_eq!(snapshot.total_requests, 2);
        assert_eq!(snapshot.failed_requests, 1);
        assert_eq!(snapshot.chunks_extracted, 5);
        assert_eq!(snapshot.chunks_failed, 1);
        assert!((snapshot.avg_extract_time_ms - 30.0).abs() < 1e-9);
        assert_eq!(snapshot.avg_merge_time_ms, 0.0);
    }
}
