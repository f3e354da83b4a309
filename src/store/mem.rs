use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use std::collections::{HashMap, HashSet};
use tokio::sync::RwLock;

use crate::model::{Category, CategoryMap, RecordStatus, ResourceRecord, Transaction};
use crate::store::CentralStore;

/// In-memory central store used by the test suite and local
/// experiments. Mirrors the Postgres semantics: upserts force records
/// active and bump versions, deactivation never deletes, and category
/// writes are version-guarded under a single write lock.
#[derive(Default)]
pub struct MemStore {
	records: RwLock<HashMap<String, ResourceRecord>>,
	transactions: RwLock<Vec<Transaction>>,
}

impl MemStore {
	pub fn new() -> Self {
		Self::default()
	}

	/// Seed a record directly, bypassing the sync path. Test helper.
	pub async fn seed(&self, record: ResourceRecord) {
		let mut records = self.records.write().await;
		records.insert(record.hospital_id.clone(), record);
	}

	/// Snapshot of the append-only transaction log. Test helper.
	pub async fn transactions(&self) -> Vec<Transaction> {
		self.transactions.read().await.clone()
	}
}

#[async_trait]
impl CentralStore for MemStore {
	async fn ping(&self) -> Result<()> {
		Ok(())
	}

	async fn list_records(&self) -> Result<Vec<ResourceRecord>> {
		let records = self.records.read().await;
		let mut out: Vec<ResourceRecord> = records.values().cloned().collect();
		out.sort_by(|a, b| a.hospital_id.cmp(&b.hospital_id));
		Ok(out)
	}

	async fn find_by_identity(&self, identity: &str) -> Result<Option<ResourceRecord>> {
		let needle = identity.trim();
		let records = self.records.read().await;
		if let Some(record) = records.get(needle) {
			return Ok(Some(record.clone()));
		}
		Ok(records
			.values()
			.find(|r| r.name.eq_ignore_ascii_case(needle))
			.cloned())
	}

	async fn upsert_record(&self, record: &ResourceRecord) -> Result<()> {
		let mut records = self.records.write().await;
		let version = records
			.get(&record.hospital_id)
			.map(|existing| existing.version + 1)
			.unwrap_or(0);

		let mut updated = record.clone();
		updated.status = RecordStatus::Active;
		updated.version = version;
		records.insert(updated.hospital_id.clone(), updated);
		Ok(())
	}

	async fn deactivate_missing(&self, seen: &HashSet<String>) -> Result<u64> {
		let mut records = self.records.write().await;
		let mut flipped = 0;
		for record in records.values_mut() {
			if record.status == RecordStatus::Active && !seen.contains(&record.hospital_id) {
				record.status = RecordStatus::Inactive;
				flipped += 1;
			}
		}
		Ok(flipped)
	}

	async fn commit_availability(
		&self,
		hospital_id: &str,
		category: Category,
		counts: &CategoryMap,
		expected_version: i64,
		tx: &Transaction,
	) -> Result<bool> {
		// The records write lock is held across both writes, so the
		// decrement and its transaction record land together or not at
		// all, mirroring the Postgres transaction.
		let mut records = self.records.write().await;
		let Some(record) = records.get_mut(hospital_id) else {
			return Ok(false);
		};
		if record.version != expected_version {
			return Ok(false);
		}
		*record.category_mut(category) = counts.clone();
		record.last_updated = Utc::now();
		record.version += 1;
		self.transactions.write().await.push(tx.clone());
		Ok(true)
	}
}

#[cfg(feature = "unit-tests")]
mod tests {
	use super::*;
	use crate::model::RecordStatus;

	fn record(id: &str, name: &str) -> ResourceRecord {
		ResourceRecord {
			hospital_id: id.to_string(),
			name: name.to_string(),
			beds: CategoryMap::new(),
			equipment: CategoryMap::new(),
			blood_bank: CategoryMap::new(),
			medical_supplies: CategoryMap::new(),
			diagnostics: CategoryMap::new(),
			last_updated: Utc::now(),
			status: RecordStatus::Active,
			version: 0,
		}
	}

	#[tokio::test]
	async fn upsert_bumps_version_and_reactivates() {
		let store = MemStore::new();
		store.upsert_record(&record("h1", "General")).await.unwrap();
		store
			.deactivate_missing(&HashSet::new())
			.await
			.unwrap();

		let stale = store.find_by_identity("h1").await.unwrap().unwrap();
		assert_eq!(stale.status, RecordStatus::Inactive);

		store.upsert_record(&record("h1", "General")).await.unwrap();
		let fresh = store.find_by_identity("h1").await.unwrap().unwrap();
		assert_eq!(fresh.status, RecordStatus::Active);
		assert_eq!(fresh.version, 1);
	}

	fn transaction(id: &str, icu: u64) -> Transaction {
		let mut items = CategoryMap::new();
		items.set("icu", icu);
		Transaction {
			requester_subject: "doc-1".to_string(),
			requester_email: "doc@example.com".to_string(),
			hospital_id: id.to_string(),
			hospital_name: "General".to_string(),
			kind: crate::model::TransactionKind::Booking,
			category: Category::Beds,
			items,
			created_at: Utc::now(),
		}
	}

	#[tokio::test]
	async fn commit_rejects_stale_version_without_writing() {
		let store = MemStore::new();
		store.upsert_record(&record("h1", "General")).await.unwrap();

		let mut counts = CategoryMap::new();
		counts.set("icu", 3);

		assert!(
			store
				.commit_availability("h1", Category::Beds, &counts, 0, &transaction("h1", 2))
				.await
				.unwrap()
		);
		// Version moved to 1; a writer still holding 0 must lose, and its
		// transaction must not be recorded.
		assert!(
			!store
				.commit_availability("h1", Category::Beds, &counts, 0, &transaction("h1", 2))
				.await
				.unwrap()
		);
		assert_eq!(store.transactions().await.len(), 1);
	}

	#[tokio::test]
	async fn commit_lands_counts_and_transaction_together() {
		let store = MemStore::new();
		store.upsert_record(&record("h1", "General")).await.unwrap();

		let mut counts = CategoryMap::new();
		counts.set("icu", 3);
		assert!(
			store
				.commit_availability("h1", Category::Beds, &counts, 0, &transaction("h1", 2))
				.await
				.unwrap()
		);

		let record = store.find_by_identity("h1").await.unwrap().unwrap();
		assert_eq!(record.beds.get("icu"), 3);
		assert_eq!(record.version, 1);
		let txs = store.transactions().await;
		assert_eq!(txs.len(), 1);
		assert_eq!(txs[0].items.get("icu"), 2);
	}

	#[tokio::test]
	async fn find_by_identity_matches_name_case_insensitively() {
		let store = MemStore::new();
		store
			.upsert_record(&record("h1", "City General"))
			.await
			.unwrap();

		assert!(store.find_by_identity("h1").await.unwrap().is_some());
		assert!(
			store
				.find_by_identity("  city GENERAL ")
				.await
				.unwrap()
				.is_some()
		);
		assert!(store.find_by_identity("nowhere").await.unwrap().is_none());
	}
}
