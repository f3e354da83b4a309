use chrono::{DateTime, Utc};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

use crate::auth::Principal;
use crate::model::{Category, CategoryMap, Transaction, TransactionKind};
use crate::observability::MetricsRegistry;
use crate::store::CentralStore;

#[derive(Debug, Error)]
pub enum LedgerError {
	#[error("hospital '{identity}' not found")]
	NotFound { identity: String },
	#[error("not enough {resource} available: requested {requested}, available {available}")]
	Insufficient {
		resource: String,
		requested: u64,
		available: u64,
	},
	/// Optimistic-concurrency retries exhausted under contention.
	#[error("commit conflicted {attempts} times, giving up")]
	Contended { attempts: u32 },
	#[error("central store error: {0}")]
	Store(anyhow::Error),
}

/// One booking or transfer commitment against a hospital's resources.
#[derive(Debug, Clone)]
pub struct CommitRequest {
	/// Hospital identity: exact `hospital_id` or case-insensitive name.
	pub hospital: String,
	pub category: Category,
	/// Requested quantities per sub-resource slug. Must be non-empty.
	pub items: CategoryMap,
	pub requester: Principal,
	pub kind: TransactionKind,
	pub requested_at: DateTime<Utc>,
}

/// Confirmation returned on success. Deliberately does not echo the
/// updated inventory; clients re-fetch via the read API.
#[derive(Debug, Clone)]
pub struct CommitOutcome {
	pub hospital_id: String,
	pub hospital_name: String,
}

/// The availability ledger: all-or-nothing check-then-decrement of one
/// category mapping.
///
/// The check pass compares every requested sub-resource against the
/// current availability (absent key counts as zero); any shortfall
/// rejects the whole request before a single write happens. The write
/// is one version-guarded atomic commit of the new counts plus the
/// transaction record, so a concurrent sync overwrite or a competing
/// booking makes the guard fail and the whole read-check-write sequence
/// is retried against fresh state, up to a configured bound. No
/// decrement is ever lost, no counter can go below zero, and no
/// decrement is ever persisted without its transaction record.
pub struct Ledger {
	store: Arc<dyn CentralStore>,
	metrics: Arc<MetricsRegistry>,
	max_attempts: u32,
}

impl Ledger {
	pub fn new(
		store: Arc<dyn CentralStore>,
		metrics: Arc<MetricsRegistry>,
		max_attempts: u32,
	) -> Self {
		Self {
			store,
			metrics,
			max_attempts: max_attempts.max(1),
		}
	}

	pub async fn commit(&self, request: &CommitRequest) -> Result<CommitOutcome, LedgerError> {
		for attempt in 1..=self.max_attempts {
			let record = self
				.store
				.find_by_identity(&request.hospital)
				.await
				.map_err(LedgerError::Store)?
				.ok_or_else(|| LedgerError::NotFound {
					identity: request.hospital.trim().to_string(),
				})?;

			// All-or-nothing check before any write.
			let available = record.category(request.category);
			for (resource, &requested) in request.items.iter() {
				let have = available.get(resource);
				if have < requested {
					self.metrics.ledger_rejections_total.inc();
					return Err(LedgerError::Insufficient {
						resource: resource.clone(),
						requested,
						available: have,
					});
				}
			}

			let mut updated = available.clone();
			for (resource, &requested) in request.items.iter() {
				updated.set(resource.clone(), available.get(resource) - requested);
			}

			let tx = Transaction {
				requester_subject: request.requester.subject.clone(),
				requester_email: request.requester.email.clone(),
				hospital_id: record.hospital_id.clone(),
				hospital_name: record.name.clone(),
				kind: request.kind,
				category: request.category,
				items: request.items.clone(),
				created_at: request.requested_at,
			};

			// Decrement and transaction record are one atomic store
			// commit; a failure here leaves neither behind, so a retried
			// request cannot decrement twice.
			let applied = self
				.store
				.commit_availability(
					&record.hospital_id,
					request.category,
					&updated,
					record.version,
					&tx,
				)
				.await
				.map_err(LedgerError::Store)?;

			if !applied {
				// Someone else wrote this record between our read and our
				// write; re-read and re-check against the fresh counts.
				self.metrics.ledger_conflicts_total.inc();
				debug!(
					hospital_id = %record.hospital_id,
					attempt,
					"guarded decrement conflicted, retrying"
				);
				continue;
			}

			self.metrics.ledger_commits_total.inc();
			info!(
				hospital_id = %record.hospital_id,
				category = %request.category,
				kind = tx.kind.as_str(),
				items = request.items.len(),
				"availability committed"
			);
			return Ok(CommitOutcome {
				hospital_id: record.hospital_id,
				hospital_name: record.name,
			});
		}

		Err(LedgerError::Contended {
			attempts: self.max_attempts,
		})
	}
}
