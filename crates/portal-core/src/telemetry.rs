//! Pipeline counters.
//!
//! - `portal_requests_total{outcome}` - Logical requests by final outcome
//! - `portal_retries_total{reason}` - Scheduled retries by failure kind
//! - `portal_forced_logouts_total` - Sessions revoked by a 403
//!
//! Recording is a no-op until a recorder is installed (see the CLI's
//! `--print-metrics`).

use metrics::counter;

pub fn record_request(outcome: &str) {
    let labels = [("outcome", outcome.to_string())];
    counter!("portal_requests_total", &labels).increment(1);
}

pub fn record_retry(reason: &str) {
    let labels = [("reason", reason.to_string())];
    counter!("portal_retries_total", &labels).increment(1);
}

pub fn record_forced_logout() {
    counter!("portal_forced_logouts_total").increment(1);
}
