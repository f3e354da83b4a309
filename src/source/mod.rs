use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};

use crate::model::RawResourceEntry;

/// Read-only typed access to one autonomous hospital source. A
/// snapshot is the source's current full resource listing; it is
/// ephemeral and re-fetched every sync cycle, never persisted.
///
/// Asclepius never writes through this trait.
#[async_trait]
pub trait SourceAdapter: Send + Sync + 'static {
	/// Stable identifier used in logs and error reports.
	fn source_id(&self) -> &str;

	async fn fetch_snapshot(&self) -> Result<Vec<RawResourceEntry>>;
}

/// Postgres-backed source adapter: one pool per autonomous hospital
/// database. Rows are read leniently — every column may be absent or
/// malformed, and normalization is the merge engine's job.
pub struct PgSourceAdapter {
	id: String,
	pool: PgPool,
}

impl PgSourceAdapter {
	pub fn new(id: impl Into<String>, pool: PgPool) -> Self {
		Self {
			id: id.into(),
			pool,
		}
	}

	pub async fn connect(id: impl Into<String>, database_url: &str) -> Result<Self> {
		let id = id.into();
		let pool = PgPool::connect(database_url)
			.await
			.with_context(|| format!("failed to connect to source '{}'", id))?;
		Ok(Self::new(id, pool))
	}
}

#[async_trait]
impl SourceAdapter for PgSourceAdapter {
	fn source_id(&self) -> &str {
		&self.id
	}

	async fn fetch_snapshot(&self) -> Result<Vec<RawResourceEntry>> {
		let rows = sqlx::query(
			"SELECT hospital_id, name, beds, equipment, blood_bank, \
			 medical_supplies, diagnostics, last_updated FROM resources",
		)
		.fetch_all(&self.pool)
		.await
		.with_context(|| format!("failed to fetch snapshot from source '{}'", self.id))?;

		let mut entries = Vec::with_capacity(rows.len());
		for row in rows {
			entries.push(RawResourceEntry {
				hospital_id: row.try_get("hospital_id").ok().flatten(),
				name: row.try_get("name").ok().flatten(),
				beds: row.try_get("beds").ok().flatten(),
				equipment: row.try_get("equipment").ok().flatten(),
				blood_bank: row.try_get("blood_bank").ok().flatten(),
				medical_supplies: row.try_get("medical_supplies").ok().flatten(),
				diagnostics: row.try_get("diagnostics").ok().flatten(),
				last_updated: row
					.try_get::<Option<DateTime<Utc>>, _>("last_updated")
					.ok()
					.flatten(),
			});
		}
		Ok(entries)
	}
}
