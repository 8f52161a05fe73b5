//! Correlation IDs for flow runs.
//!
//! Each flow invocation gets a `trace_id` that appears on every log line for
//! that run and in the response returned to the dashboard, so a user report
//! ("the phishing check failed") can be matched to the server logs.

use std::sync::atomic::{AtomicU32, Ordering};

use chrono::Utc;

static RUNS: AtomicU32 = AtomicU32::new(0);

/// Trace ID for one run of `flow`: `tr-<flow>-<unix micros, hex>-<run seq>`.
pub fn generate_trace_id(flow: &str) -> String {
    let micros = Utc::now().timestamp_micros();
    let seq = RUNS.fetch_add(1, Ordering::Relaxed) & 0xffff;
    format!("tr-{flow}-{micros:x}-{seq:04x}")
}
