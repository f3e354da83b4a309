use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Resource classes tracked for every hospital. Each category holds a
/// mapping of sub-resource slug to an available count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
	Beds,
	Equipment,
	BloodBank,
	MedicalSupplies,
	Diagnostics,
}

impl Category {
	pub const ALL: [Category; 5] = [
		Category::Beds,
		Category::Equipment,
		Category::BloodBank,
		Category::MedicalSupplies,
		Category::Diagnostics,
	];

	/// Stable column/wire name for the category.
	pub fn as_str(&self) -> &'static str {
		match self {
			Category::Beds => "beds",
			Category::Equipment => "equipment",
			Category::BloodBank => "blood_bank",
			Category::MedicalSupplies => "medical_supplies",
			Category::Diagnostics => "diagnostics",
		}
	}

	/// Parse a client-supplied category label ("Blood Bank", "beds", ...).
	pub fn parse(raw: &str) -> Option<Category> {
		match slugify(raw).as_str() {
			"beds" => Some(Category::Beds),
			"equipment" => Some(Category::Equipment),
			"blood_bank" => Some(Category::BloodBank),
			"medical_supplies" => Some(Category::MedicalSupplies),
			"diagnostics" => Some(Category::Diagnostics),
			_ => None,
		}
	}
}

impl std::fmt::Display for Category {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Canonical form of a sub-resource key: trimmed, lowercased, inner
/// whitespace collapsed to underscores ("ICU Ward" -> "icu_ward").
pub fn slugify(raw: &str) -> String {
	raw.trim()
		.to_lowercase()
		.split_whitespace()
		.collect::<Vec<_>>()
		.join("_")
}

/// Error raised when a source reports a category value that is not a
/// mapping of sub-resource name to a non-negative integer count.
#[derive(Debug, Error)]
pub enum CategoryMapError {
	#[error("category value is not an object")]
	NotAnObject,
	#[error("count for '{key}' is not a non-negative integer")]
	BadCount { key: String },
}

/// Validated mapping of sub-resource slug to a non-negative count.
///
/// Sources report these as free-form JSON objects; validation happens
/// once at the merge boundary via [`CategoryMap::from_value`] so that
/// business logic downstream never sees a negative or fractional count.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CategoryMap(BTreeMap<String, u64>);

impl CategoryMap {
	pub fn new() -> Self {
		Self::default()
	}

	/// Available count for a sub-resource; an absent key counts as zero.
	pub fn get(&self, key: &str) -> u64 {
		self.0.get(key).copied().unwrap_or(0)
	}

	pub fn set(&mut self, key: impl Into<String>, count: u64) {
		self.0.insert(slugify(&key.into()), count);
	}

	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}

	pub fn len(&self) -> usize {
		self.0.len()
	}

	pub fn iter(&self) -> impl Iterator<Item = (&String, &u64)> {
		self.0.iter()
	}

	/// Validate a raw JSON category value. Keys are slugged; values must
	/// be non-negative integers. A malformed value rejects the whole map
	/// rather than silently defaulting.
	pub fn from_value(value: &serde_json::Value) -> Result<Self, CategoryMapError> {
		let obj = match value {
			serde_json::Value::Object(map) => map,
			_ => return Err(CategoryMapError::NotAnObject),
		};

		let mut out = BTreeMap::new();
		for (key, v) in obj {
			let count = v
				.as_u64()
				.ok_or_else(|| CategoryMapError::BadCount { key: key.clone() })?;
			out.insert(slugify(key), count);
		}
		Ok(Self(out))
	}
}

impl FromIterator<(String, u64)> for CategoryMap {
	fn from_iter<I: IntoIterator<Item = (String, u64)>>(iter: I) -> Self {
		Self(iter.into_iter().map(|(k, v)| (slugify(&k), v)).collect())
	}
}

/// Reporting status of a central record. A hospital whose source stops
/// reporting is marked inactive; its record is never deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordStatus {
	Active,
	Inactive,
}

impl RecordStatus {
	pub fn as_str(&self) -> &'static str {
		match self {
			RecordStatus::Active => "active",
			RecordStatus::Inactive => "inactive",
		}
	}
}

/// One hospital's merged availability record in the central store.
///
/// `hospital_id` is the canonical identity key used to correlate the
/// same hospital across sources and sync cycles; `name` is a display
/// attribute only (booking lookups also accept it, case-insensitively).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceRecord {
	pub hospital_id: String,
	pub name: String,
	pub beds: CategoryMap,
	pub equipment: CategoryMap,
	pub blood_bank: CategoryMap,
	pub medical_supplies: CategoryMap,
	pub diagnostics: CategoryMap,
	pub last_updated: DateTime<Utc>,
	pub status: RecordStatus,
	/// Optimistic concurrency token, bumped by every store write.
	#[serde(default)]
	pub version: i64,
}

impl ResourceRecord {
	pub fn category(&self, category: Category) -> &CategoryMap {
		match category {
			Category::Beds => &self.beds,
			Category::Equipment => &self.equipment,
			Category::BloodBank => &self.blood_bank,
			Category::MedicalSupplies => &self.medical_supplies,
			Category::Diagnostics => &self.diagnostics,
		}
	}

	pub fn category_mut(&mut self, category: Category) -> &mut CategoryMap {
		match category {
			Category::Beds => &mut self.beds,
			Category::Equipment => &mut self.equipment,
			Category::BloodBank => &mut self.blood_bank,
			Category::MedicalSupplies => &mut self.medical_supplies,
			Category::Diagnostics => &mut self.diagnostics,
		}
	}
}

/// A source row exactly as read: every field optional and loosely
/// typed. Normalization and validation happen in the merge engine.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawResourceEntry {
	pub hospital_id: Option<String>,
	pub name: Option<String>,
	pub beds: Option<serde_json::Value>,
	pub equipment: Option<serde_json::Value>,
	pub blood_bank: Option<serde_json::Value>,
	pub medical_supplies: Option<serde_json::Value>,
	pub diagnostics: Option<serde_json::Value>,
	pub last_updated: Option<DateTime<Utc>>,
}

impl RawResourceEntry {
	pub fn raw_category(&self, category: Category) -> Option<&serde_json::Value> {
		match category {
			Category::Beds => self.beds.as_ref(),
			Category::Equipment => self.equipment.as_ref(),
			Category::BloodBank => self.blood_bank.as_ref(),
			Category::MedicalSupplies => self.medical_supplies.as_ref(),
			Category::Diagnostics => self.diagnostics.as_ref(),
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
	Booking,
	Transfer,
}

impl TransactionKind {
	pub fn as_str(&self) -> &'static str {
		match self {
			TransactionKind::Booking => "booking",
			TransactionKind::Transfer => "transfer",
		}
	}
}

/// Append-only record of a committed booking or transfer. Created once
/// by the availability ledger, never updated or deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
	pub requester_subject: String,
	pub requester_email: String,
	pub hospital_id: String,
	pub hospital_name: String,
	pub kind: TransactionKind,
	pub category: Category,
	/// Itemized quantities consumed, keyed by sub-resource slug.
	pub items: CategoryMap,
	pub created_at: DateTime<Utc>,
}

#[cfg(feature = "unit-tests")]
mod tests {
	use super::*;
	use serde_json::json;

	#[test]
	fn slugify_normalizes_whitespace_and_case() {
		assert_eq!(slugify("ICU Ward"), "icu_ward");
		assert_eq!(slugify("  O Positive  "), "o_positive");
		assert_eq!(slugify("ventilators"), "ventilators");
		assert_eq!(slugify(""), "");
	}

	#[test]
	fn category_map_accepts_non_negative_integers() {
		let map = CategoryMap::from_value(&json!({"ICU": 5, "General Ward": 0})).unwrap();
		assert_eq!(map.get("icu"), 5);
		assert_eq!(map.get("general_ward"), 0);
		assert_eq!(map.get("absent"), 0);
	}

	#[test]
	fn category_map_rejects_negative_and_fractional_counts() {
		assert!(CategoryMap::from_value(&json!({"icu": -1})).is_err());
		assert!(CategoryMap::from_value(&json!({"icu": 2.5})).is_err());
		assert!(CategoryMap::from_value(&json!({"icu": "three"})).is_err());
	}

	#[test]
	fn category_map_rejects_non_objects() {
		assert!(CategoryMap::from_value(&json!([1, 2, 3])).is_err());
		assert!(CategoryMap::from_value(&json!(7)).is_err());
		assert!(CategoryMap::from_value(&json!(null)).is_err());
	}

	#[test]
	fn category_serde_uses_snake_case() {
		let s = serde_json::to_string(&Category::BloodBank).unwrap();
		assert_eq!(s, "\"blood_bank\"");
		let c: Category = serde_json::from_str("\"medical_supplies\"").unwrap();
		assert_eq!(c, Category::MedicalSupplies);
	}

	#[test]
	fn category_parse_accepts_display_labels() {
		assert_eq!(Category::parse("Blood Bank"), Some(Category::BloodBank));
		assert_eq!(Category::parse("beds"), Some(Category::Beds));
		assert_eq!(Category::parse("staff"), None);
	}

	#[test]
	fn record_status_round_trips() {
		let s = serde_json::to_string(&RecordStatus::Inactive).unwrap();
		assert_eq!(s, "\"inactive\"");
		assert_eq!(RecordStatus::Active.as_str(), "active");
	}
}
