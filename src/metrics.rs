use std::sync::OnceLock;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

static HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Install the Prometheus exporter and register all application metrics.
/// Returns a `PrometheusHandle` whose `render()` method produces the
/// text/plain Prometheus scrape payload.
///
/// Safe to call more than once; later calls return the first handle.
pub fn init_metrics() -> PrometheusHandle {
    HANDLE
        .get_or_init(|| {
            let handle = match PrometheusBuilder::new().install_recorder() {
                Ok(handle) => handle,
                Err(e) => {
                    // Another recorder owns the global slot; render from a detached one.
                    tracing::warn!(error = %e, "Prometheus recorder already installed");
                    PrometheusBuilder::new().build_recorder().handle()
                }
            };

            // Pre-register counters so they appear even before the first increment.
            counter!("signals_received_total").absolute(0);
            counter!("signals_executed_total").absolute(0);
            counter!("signals_failed_total").absolute(0);
            counter!("copied_trades_executed").absolute(0);
            counter!("copied_trades_failed").absolute(0);
            counter!("copy_attempts_skipped").absolute(0);
            counter!("subscriptions_created").absolute(0);
            counter!("subscriptions_stopped").absolute(0);

            gauge!("pending_signals").set(0.0);

            // Histogram is lazily created on first record; force creation.
            histogram!("propagation_tick_seconds").record(0.0);

            handle
        })
        .clone()
}
