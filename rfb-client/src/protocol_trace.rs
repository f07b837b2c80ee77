//! Optional per-PDU trace, enabled with `RFB_PROTOCOL_TRACE=1`.
//!
//! The flag is read once on first use and never changes afterwards.

use once_cell::sync::Lazy;

static TRACE_ENABLED: Lazy<bool> = Lazy::new(|| {
    std::env::var("RFB_PROTOCOL_TRACE")
        .map(|v| matches!(v.as_str(), "1" | "true" | "TRUE"))
        .unwrap_or(false)
});

#[inline]
pub fn enabled() -> bool {
    *TRACE_ENABLED
}

#[inline]
pub fn out_msg(name: &str, fields: &str) {
    if enabled() {
        tracing::info!(target: "protocol_trace", "OUT {} {}", name, fields);
    }
}

#[inline]
pub fn in_msg(name: &str, fields: &str) {
    if enabled() {
        tracing::info!(target: "protocol_trace", "IN  {} {}", name, fields);
    }
}
