use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use tracing::warn;

use crate::model::{Category, CategoryMap, RawResourceEntry, RecordStatus, ResourceRecord};

/// Output of one merge pass: the normalized record map keyed by
/// `hospital_id`, plus the full set of identity keys seen this cycle
/// (the upsert writer deactivates everything outside it). Rejected
/// entries contribute their key to `seen` without a record: their
/// update is refused, but the hospital is still being reported.
#[derive(Debug, Default)]
pub struct MergedSet {
	pub records: HashMap<String, ResourceRecord>,
	pub seen: HashSet<String>,
	/// Entries lacking a non-empty identity key.
	pub dropped: usize,
	/// Entries rejected for a malformed category mapping.
	pub rejected: usize,
}

/// Combine N source snapshots into a normalized record set.
///
/// Policy is last-write-wins at record granularity: when multiple
/// snapshots report the same `hospital_id`, the last one processed
/// replaces earlier ones wholesale — there is no field-level
/// reconciliation across sources. Entries without an identity key are
/// dropped; entries with a malformed category value are rejected at
/// this boundary instead of defaulting deep in business logic.
pub fn merge_snapshots(snapshots: &[Vec<RawResourceEntry>], now: DateTime<Utc>) -> MergedSet {
	let mut merged = MergedSet::default();

	for snapshot in snapshots {
		for entry in snapshot {
			let Some(hospital_id) = entry
				.hospital_id
				.as_deref()
				.map(str::trim)
				.filter(|id| !id.is_empty())
			else {
				merged.dropped += 1;
				continue;
			};

			match normalize_entry(hospital_id, entry, now) {
				Ok(record) => {
					merged.seen.insert(record.hospital_id.clone());
					merged.records.insert(record.hospital_id.clone(), record);
				}
				Err(reason) => {
					// The update is rejected but the source is still
					// reporting this hospital: keep its central record
					// active instead of deactivating it this cycle.
					warn!(hospital_id, %reason, "rejecting malformed source entry");
					merged.seen.insert(hospital_id.to_string());
					merged.rejected += 1;
				}
			}
		}
	}

	merged
}

/// Normalize one raw entry: missing category mappings become empty
/// maps (never absent), missing `last_updated` becomes `now`, and
/// status is forced active.
fn normalize_entry(
	hospital_id: &str,
	entry: &RawResourceEntry,
	now: DateTime<Utc>,
) -> Result<ResourceRecord, anyhow::Error> {
	let mut record = ResourceRecord {
		hospital_id: hospital_id.to_string(),
		name: entry
			.name
			.as_deref()
			.map(str::trim)
			.filter(|n| !n.is_empty())
			.unwrap_or(hospital_id)
			.to_string(),
		beds: CategoryMap::new(),
		equipment: CategoryMap::new(),
		blood_bank: CategoryMap::new(),
		medical_supplies: CategoryMap::new(),
		diagnostics: CategoryMap::new(),
		last_updated: entry.last_updated.unwrap_or(now),
		status: RecordStatus::Active,
		version: 0,
	};

	for category in Category::ALL {
		if let Some(raw) = entry.raw_category(category) {
			let counts = CategoryMap::from_value(raw)
				.map_err(|e| anyhow::anyhow!("{} category: {}", category, e))?;
			*record.category_mut(category) = counts;
		}
	}

	Ok(record)
}

#[cfg(feature = "unit-tests")]
mod tests {
	use super::*;
	use serde_json::json;

	fn entry(id: Option<&str>) -> RawResourceEntry {
		RawResourceEntry {
			hospital_id: id.map(str::to_string),
			name: Some("City General".to_string()),
			beds: Some(json!({"ICU": 5})),
			..Default::default()
		}
	}

	#[test]
	fn keyless_entries_are_dropped_not_errors() {
		let snapshots = vec![vec![entry(None), entry(Some("  ")), entry(Some("h1"))]];
		let merged = merge_snapshots(&snapshots, Utc::now());
		assert_eq!(merged.dropped, 2);
		assert_eq!(merged.records.len(), 1);
		assert!(merged.seen.contains("h1"));
	}

	#[test]
	fn missing_categories_become_empty_maps() {
		let raw = RawResourceEntry {
			hospital_id: Some("h1".to_string()),
			..Default::default()
		};
		let merged = merge_snapshots(&[vec![raw]], Utc::now());
		let record = &merged.records["h1"];
		for category in Category::ALL {
			assert!(record.category(category).is_empty());
		}
		// Name falls back to the identity key when the source omits it.
		assert_eq!(record.name, "h1");
	}

	#[test]
	fn last_snapshot_processed_wins_per_key() {
		let mut first = entry(Some("h1"));
		first.beds = Some(json!({"icu": 5}));
		let mut second = entry(Some("h1"));
		second.beds = Some(json!({"icu": 9}));

		let merged = merge_snapshots(&[vec![first], vec![second]], Utc::now());
		assert_eq!(merged.records.len(), 1);
		assert_eq!(merged.records["h1"].beds.get("icu"), 9);
		assert_eq!(merged.seen.len(), 1);
	}

	#[test]
	fn malformed_category_rejects_whole_entry() {
		let mut bad = entry(Some("h1"));
		bad.equipment = Some(json!({"ventilators": -2}));
		let good = entry(Some("h2"));

		let merged = merge_snapshots(&[vec![bad, good]], Utc::now());
		assert_eq!(merged.rejected, 1);
		assert!(!merged.records.contains_key("h1"));
		assert!(merged.records.contains_key("h2"));
		// The rejected hospital is still being reported; it must not be
		// treated as vanished.
		assert!(merged.seen.contains("h1"));
	}

	#[test]
	fn normalization_fills_timestamp_and_status() {
		let now = Utc::now();
		let merged = merge_snapshots(&[vec![entry(Some("h1"))]], now);
		let record = &merged.records["h1"];
		assert_eq!(record.last_updated, now);
		assert_eq!(record.status, RecordStatus::Active);
		assert_eq!(record.beds.get("icu"), 5);
	}
}
