pub mod mem;
pub mod pg;

pub use mem::MemStore;
pub use pg::PgStore;

use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashSet;

use crate::model::{Category, CategoryMap, ResourceRecord, Transaction};

/// Abstraction over the authoritative central store so tests can
/// substitute an in-memory implementation. Implemented by [`PgStore`]
/// and [`MemStore`].
///
/// The store is the shared resource between the sync cycle
/// (deactivate + upsert) and the availability ledger (guarded
/// decrement); every write path bumps the record's `version` so the
/// ledger can detect and retry lost races instead of clobbering a
/// fresher value.
#[async_trait]
pub trait CentralStore: Send + Sync + 'static {
	/// Lightweight ping to verify connectivity / readiness.
	async fn ping(&self) -> Result<()>;

	/// All records, active and inactive.
	async fn list_records(&self) -> Result<Vec<ResourceRecord>>;

	/// Resolve a record by exact `hospital_id` or case-insensitive name.
	async fn find_by_identity(&self, identity: &str) -> Result<Option<ResourceRecord>>;

	/// Insert-or-overwrite by `hospital_id`, forcing the record active.
	/// This is the only path that resurrects an inactive record.
	async fn upsert_record(&self, record: &ResourceRecord) -> Result<()>;

	/// Mark every record whose key is not in `seen` as inactive. Returns
	/// the number of records flipped. Never deletes.
	async fn deactivate_missing(&self, seen: &HashSet<String>) -> Result<u64>;

	/// Version-guarded write of one category mapping plus its matching
	/// transaction record, as a single atomic commit refreshing
	/// `last_updated`. Returns `Ok(false)` without writing anything when
	/// the record's version no longer matches `expected_version` (a
	/// concurrent writer won). On error neither the counts nor the
	/// transaction are persisted.
	async fn commit_availability(
		&self,
		hospital_id: &str,
		category: Category,
		counts: &CategoryMap,
		expected_version: i64,
		tx: &Transaction,
	) -> Result<bool>;
}
