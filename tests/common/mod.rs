#![allow(dead_code)]

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use chrono::Utc;
use serde_json::json;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;

use asclepius::auth::{IdentityVerifier, Principal};
use asclepius::ledger::Ledger;
use asclepius::model::{CategoryMap, RawResourceEntry, RecordStatus, ResourceRecord};
use asclepius::observability::MetricsRegistry;
use asclepius::source::SourceAdapter;
use asclepius::state::AppState;
use asclepius::store::{CentralStore, MemStore};

/// In-memory source whose snapshot can be swapped between cycles, and
/// which can be made to fail to exercise cycle-abort paths.
pub struct MemSource {
	id: String,
	entries: RwLock<Vec<RawResourceEntry>>,
	failing: AtomicBool,
}

impl MemSource {
	pub fn new(id: &str, entries: Vec<RawResourceEntry>) -> Arc<Self> {
		Arc::new(Self {
			id: id.to_string(),
			entries: RwLock::new(entries),
			failing: AtomicBool::new(false),
		})
	}

	pub async fn set_entries(&self, entries: Vec<RawResourceEntry>) {
		*self.entries.write().await = entries;
	}

	pub fn set_failing(&self, failing: bool) {
		self.failing.store(failing, Ordering::SeqCst);
	}
}

#[async_trait]
impl SourceAdapter for MemSource {
	fn source_id(&self) -> &str {
		&self.id
	}

	async fn fetch_snapshot(&self) -> Result<Vec<RawResourceEntry>> {
		if self.failing.load(Ordering::SeqCst) {
			return Err(anyhow!("source database unreachable"));
		}
		Ok(self.entries.read().await.clone())
	}
}

/// Verifier accepting exactly one token, standing in for the external
/// identity provider.
pub struct StubVerifier;

pub const VALID_TOKEN: &str = "valid-token";

#[async_trait]
impl IdentityVerifier for StubVerifier {
	async fn verify(&self, token: &str) -> Result<Principal> {
		if token == VALID_TOKEN {
			Ok(Principal {
				subject: "doc-1".to_string(),
				email: "doc@example.com".to_string(),
			})
		} else {
			Err(anyhow!("unknown token"))
		}
	}
}

/// A raw source entry with the given id and an ICU bed count.
pub fn entry_with_beds(id: &str, name: &str, icu: u64) -> RawResourceEntry {
	RawResourceEntry {
		hospital_id: Some(id.to_string()),
		name: Some(name.to_string()),
		beds: Some(json!({ "ICU": icu })),
		..Default::default()
	}
}

/// A fully-populated central record, bypassing the sync path.
pub fn seeded_record(id: &str, name: &str, icu: u64) -> ResourceRecord {
	let mut beds = CategoryMap::new();
	beds.set("icu", icu);
	ResourceRecord {
		hospital_id: id.to_string(),
		name: name.to_string(),
		beds,
		equipment: CategoryMap::new(),
		blood_bank: CategoryMap::new(),
		medical_supplies: CategoryMap::new(),
		diagnostics: CategoryMap::new(),
		last_updated: Utc::now(),
		status: RecordStatus::Active,
		version: 0,
	}
}

/// Application state wired entirely against in-memory fakes.
pub fn test_state(store: Arc<MemStore>, sources: Vec<Arc<dyn SourceAdapter>>) -> AppState {
	let store: Arc<dyn CentralStore> = store;
	let metrics = Arc::new(MetricsRegistry::new());
	AppState {
		ledger: Arc::new(Ledger::new(store.clone(), metrics.clone(), 4)),
		store,
		sources: Arc::new(sources),
		verifier: Arc::new(StubVerifier),
		metrics,
	}
}
