use prometheus::{Histogram, HistogramOpts, IntCounter, Opts, Registry, TextEncoder};
use std::sync::Arc;

const NAMESPACE: &str = "asclepius";

fn counter(registry: &Registry, name: &str, help: &str) -> IntCounter {
	let c = IntCounter::with_opts(Opts::new(name, help).namespace(NAMESPACE))
		.expect("valid counter opts");
	registry
		.register(Box::new(c.clone()))
		.expect("metric name registered twice");
	c
}

/// All Prometheus metrics, registered against one private registry so
/// test instances never collide.
pub struct MetricsRegistry {
	registry: Registry,

	// Sync cycle metrics
	pub sync_cycles_total: IntCounter,
	pub sync_records_upserted_total: IntCounter,
	pub sync_records_deactivated_total: IntCounter,
	pub sync_entries_dropped_total: IntCounter,
	pub sync_partial_failures_total: IntCounter,
	pub sync_failures_total: IntCounter,
	pub sync_cycle_duration_seconds: Histogram,

	// Availability ledger metrics
	pub ledger_commits_total: IntCounter,
	pub ledger_rejections_total: IntCounter,
	pub ledger_conflicts_total: IntCounter,
}

impl MetricsRegistry {
	pub fn new() -> Self {
		let registry = Registry::new();

		let sync_cycle_duration_seconds = Histogram::with_opts(
			HistogramOpts::new(
				"sync_cycle_duration_seconds",
				"Duration of fetch-merge-upsert cycles in seconds",
			)
			.namespace(NAMESPACE)
			.buckets(vec![0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0, 10.0]),
		)
		.expect("valid histogram opts");
		registry
			.register(Box::new(sync_cycle_duration_seconds.clone()))
			.expect("metric name registered twice");

		Self {
			sync_cycles_total: counter(&registry, "sync_cycles_total", "Total sync cycles started"),
			sync_records_upserted_total: counter(
				&registry,
				"sync_records_upserted_total",
				"Total records upserted into the central store",
			),
			sync_records_deactivated_total: counter(
				&registry,
				"sync_records_deactivated_total",
				"Total records marked inactive for not being reported",
			),
			sync_entries_dropped_total: counter(
				&registry,
				"sync_entries_dropped_total",
				"Source entries dropped or rejected during merge",
			),
			sync_partial_failures_total: counter(
				&registry,
				"sync_partial_failures_total",
				"Sync cycles that completed with per-record upsert failures",
			),
			sync_failures_total: counter(
				&registry,
				"sync_failures_total",
				"Sync cycles that aborted outright",
			),
			sync_cycle_duration_seconds,
			ledger_commits_total: counter(
				&registry,
				"ledger_commits_total",
				"Bookings/transfers committed by the availability ledger",
			),
			ledger_rejections_total: counter(
				&registry,
				"ledger_rejections_total",
				"Bookings/transfers rejected for insufficient availability",
			),
			ledger_conflicts_total: counter(
				&registry,
				"ledger_conflicts_total",
				"Version-guard conflicts retried by the availability ledger",
			),
			registry,
		}
	}

	/// Encode every registered metric in Prometheus text format.
	pub fn encode(&self) -> String {
		let families = self.registry.gather();
		match TextEncoder::new().encode_to_string(&families) {
			Ok(text) => text,
			Err(e) => {
				tracing::error!(error = %e, "failed to encode metrics");
				String::new()
			}
		}
	}
}

impl Default for MetricsRegistry {
	fn default() -> Self {
		Self::new()
	}
}

pub fn init_metrics() -> anyhow::Result<Arc<MetricsRegistry>> {
	Ok(Arc::new(MetricsRegistry::new()))
}

#[cfg(feature = "unit-tests")]
mod tests {
	use super::MetricsRegistry;

	#[test]
	fn fresh_registries_are_independent() {
		let a = MetricsRegistry::new();
		let b = MetricsRegistry::new();
		a.sync_cycles_total.inc();
		assert_eq!(a.sync_cycles_total.get(), 1);
		assert_eq!(b.sync_cycles_total.get(), 0);
	}

	#[test]
	fn encode_emits_namespaced_families() {
		let registry = MetricsRegistry::new();
		registry.ledger_commits_total.inc();
		let text = registry.encode();
		assert!(text.contains("asclepius_ledger_commits_total 1"));
		assert!(text.contains("asclepius_sync_cycle_duration_seconds"));
	}
}
