use serde::Serialize;
use std::sync::Arc;
use tracing::warn;

use crate::store::CentralStore;
use crate::sync::SyncError;
use crate::sync::merge::MergedSet;

/// Counts for one fetch-merge-upsert cycle, reported by the sync
/// trigger API and logged by the scheduler.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SyncReport {
	/// Normalized records processed this cycle.
	pub processed: usize,
	pub upserted: usize,
	/// Central records flipped to inactive because no source reported them.
	pub deactivated: u64,
	/// Per-record upsert failures (cycle continues).
	pub failed: usize,
	/// Source entries dropped for lacking an identity key.
	pub dropped: usize,
	/// Source entries rejected for malformed category mappings.
	pub rejected: usize,
}

/// Apply a merged record set to the central store.
///
/// Step 1 bulk-deactivates every record whose key was not seen this
/// cycle; its failure aborts the cycle. Step 2 upserts each merged
/// record; individual failures are isolated, logged, and reported as a
/// partial failure without rolling back earlier upserts.
pub async fn apply(
	store: &Arc<dyn CentralStore>,
	merged: &MergedSet,
) -> Result<SyncReport, SyncError> {
	let mut report = SyncReport {
		processed: merged.records.len(),
		dropped: merged.dropped,
		rejected: merged.rejected,
		..Default::default()
	};

	report.deactivated = store
		.deactivate_missing(&merged.seen)
		.await
		.map_err(SyncError::Store)?;

	for record in merged.records.values() {
		match store.upsert_record(record).await {
			Ok(()) => report.upserted += 1,
			Err(e) => {
				warn!(hospital_id = %record.hospital_id, error = %e, "record upsert failed");
				report.failed += 1;
			}
		}
	}

	if report.failed > 0 {
		return Err(SyncError::Partial { report });
	}
	Ok(report)
}
