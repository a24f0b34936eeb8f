//! Prometheus exposition for `--metrics`
//!
//! The client library records its counters through the `metrics` facade
//! (see `admin_client::metrics`); this installs a Prometheus recorder so a
//! run can print them when it finishes.

use anyhow::{Context, Result};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

/// Install the Prometheus recorder and return a handle for rendering metrics.
pub fn install_recorder() -> Result<PrometheusHandle> {
    PrometheusBuilder::new()
        .install_recorder()
        .context("failed to install Prometheus recorder")
}
