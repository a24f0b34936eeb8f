//! Client-side counters
//!
//! - `admin_api_requests_total` (counter): labels `method`, `status`
//!   (`"network_error"` when no response arrived)
//! - `admin_api_token_refresh_total` (counter): label `outcome`
//! - `admin_api_auth_retries_total` (counter): 401 replays
//!
//! With no recorder installed these are no-ops.

pub fn record_request(method: &str, status: u16) {
    metrics::counter!("admin_api_requests_total", "method" => method.to_string(), "status" => status.to_string())
        .increment(1);
}

pub fn record_network_error(method: &str) {
    metrics::counter!("admin_api_requests_total", "method" => method.to_string(), "status" => "network_error")
        .increment(1);
}

pub fn record_refresh(outcome: &'static str) {
    metrics::counter!("admin_api_token_refresh_total", "outcome" => outcome).increment(1);
}

pub fn record_auth_retry() {
    metrics::counter!("admin_api_auth_retries_total").increment(1);
}
