// Path: crates/telemetry/src/time.rs
use std::time::Instant;

/// Logs how long it lived when dropped.
pub struct ScopeTimer {
    label: &'static str,
    start: Instant,
}

impl ScopeTimer {
    /// Starts timing a scope named `label`.
    pub fn new(label: &'static str) -> Self {
        Self {
            label,
            start: Instant::now(),
        }
    }

    /// Milliseconds since the timer started.
    pub fn elapsed_ms(&self) -> u128 {
        self.start.elapsed().as_millis()
    }
}

impl Drop for ScopeTimer {
    fn drop(&mut self) {
        tracing::debug!(
            target: "timing",
            label = self.label,
            elapsed_ms = self.elapsed_ms() as u64,
            "scope finished"
        );
    }
}
