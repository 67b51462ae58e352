use std::sync::atomic::{AtomicU64, Ordering};

use crate::domain::{ActivityLevel, NUM_CLASSES};

/// Request counters exported on `/metrics`
#[derive(Default)]
pub struct Metrics {
    /// Successful predictions
    pub predictions: AtomicU64,
    /// Predictions per class index
    pub predictions_by_class: [AtomicU64; NUM_CLASSES],
    /// Requests rejected with a 4xx
    pub rejected_requests: AtomicU64,
    /// Failed store writes (activities and profiles)
    pub store_failures: AtomicU64,
    /// Successful profile upserts
    pub profile_upserts: AtomicU64,
}

impl Metrics {
    /// Create a new metrics instance
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_prediction(&self, class_index: usize) {
        self.predictions.fetch_add(1, Ordering::Relaxed);
        if let Some(counter) = self.predictions_by_class.get(class_index) {
            counter.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn inc_rejected(&self) {
        self.rejected_requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_store_failures(&self) {
        self.store_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_profile_upserts(&self) {
        self.profile_upserts.fetch_add(1, Ordering::Relaxed);
    }

    /// Prometheus text exposition
    pub fn render(&self, uptime_secs: i64, store_up: bool) -> String {
        let mut out = format!(
            r#"# HELP activity_up Store reachability (1=up, 0=down)
# TYPE activity_up gauge
activity_up {}

# HELP activity_uptime_seconds Uptime in seconds
# TYPE activity_uptime_seconds counter
activity_uptime_seconds {}

# HELP activity_predictions_total Predictions served
# TYPE activity_predictions_total counter
activity_predictions_total {}

# HELP activity_rejected_requests_total Requests rejected as malformed or invalid
# TYPE activity_rejected_requests_total counter
activity_rejected_requests_total {}

# HELP activity_store_failures_total Failed store writes
# TYPE activity_store_failures_total counter
activity_store_failures_total {}

# HELP activity_profile_upserts_total Profile upserts
# TYPE activity_profile_upserts_total counter
activity_profile_upserts_total {}

# HELP activity_predictions_by_class_total Predictions per activity level
# TYPE activity_predictions_by_class_total counter
"#,
            u8::from(store_up),
            uptime_secs,
            self.predictions.load(Ordering::Relaxed),
            self.rejected_requests.load(Ordering::Relaxed),
            self.store_failures.load(Ordering::Relaxed),
            self.profile_upserts.load(Ordering::Relaxed),
        );

        for level in ActivityLevel::ALL {
            out.push_str(&format!(
                "activity_predictions_by_class_total{{class=\"{}\",level=\"{}\"}} {}\n",
                level.index(),
                level,
                self.predictions_by_class[level.index()].load(Ordering::Relaxed)
            ));
        }
        out
    }
}
