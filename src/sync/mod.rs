pub mod merge;
pub mod scheduler;
pub mod writer;

pub use merge::{MergedSet, merge_snapshots};
pub use scheduler::start_scheduler;
pub use writer::SyncReport;

use chrono::Utc;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tracing::debug;

use crate::observability::MetricsRegistry;
use crate::source::SourceAdapter;
use crate::store::CentralStore;

#[derive(Debug, Error)]
pub enum SyncError {
	/// A source snapshot could not be fetched; the whole cycle aborts
	/// (the scheduler's next tick is the retry).
	#[error("source '{source_id}' unavailable: {error}")]
	Source {
		source_id: String,
		error: anyhow::Error,
	},
	/// One or more upserts failed; earlier upserts in the cycle stand.
	#[error("{} of {} record upserts failed", report.failed, report.processed)]
	Partial { report: SyncReport },
	/// Central store unreachable or rejecting writes; cycle aborted.
	#[error("central store error: {0}")]
	Store(anyhow::Error),
}

/// Run one full fetch-merge-upsert cycle across all sources.
pub async fn run_cycle(
	sources: &[Arc<dyn SourceAdapter>],
	store: &Arc<dyn CentralStore>,
	metrics: &Arc<MetricsRegistry>,
) -> Result<SyncReport, SyncError> {
	let started = Instant::now();
	metrics.sync_cycles_total.inc();

	let mut snapshots = Vec::with_capacity(sources.len());
	for source in sources {
		let snapshot = source
			.fetch_snapshot()
			.await
			.map_err(|error| SyncError::Source {
				source_id: source.source_id().to_string(),
				error,
			})?;
		debug!(
			source_id = source.source_id(),
			entries = snapshot.len(),
			"fetched source snapshot"
		);
		snapshots.push(snapshot);
	}

	let merged = merge_snapshots(&snapshots, Utc::now());
	let result = writer::apply(store, &merged).await;

	let report = match &result {
		Ok(report) => Some(report),
		Err(SyncError::Partial { report }) => Some(report),
		Err(_) => None,
	};
	if let Some(report) = report {
		metrics
			.sync_records_upserted_total
			.inc_by(report.upserted as u64);
		metrics
			.sync_records_deactivated_total
			.inc_by(report.deactivated);
		metrics
			.sync_entries_dropped_total
			.inc_by((report.dropped + report.rejected) as u64);
	}
	metrics
		.sync_cycle_duration_seconds
		.observe(started.elapsed().as_secs_f64());

	result
}
