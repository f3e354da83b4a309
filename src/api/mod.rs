use axum::http::HeaderMap;
use axum::routing::{get, post};
use axum::{Json, Router, extract::State};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::auth::Principal;
use crate::error::ApiError;
use crate::ledger::CommitRequest;
use crate::model::{Category, CategoryMap, ResourceRecord, TransactionKind, slugify};
use crate::state::AppState;
use crate::sync::{self, SyncError, SyncReport};

/// Build the full application router.
pub fn router(state: AppState) -> Router {
	Router::new()
		.route("/api/resources", get(list_resources))
		.route("/api/sync", post(trigger_sync))
		.route("/api/bookings", post(create_booking))
		.route("/api/transfers", post(create_transfer))
		.route("/health", get(crate::health::db_health))
		.route("/metrics", get(crate::health::metrics_handler))
		.with_state(state)
}

/// Resolve the verified requester from the Authorization header.
async fn authenticate(state: &AppState, headers: &HeaderMap) -> Result<Principal, ApiError> {
	let token = headers
		.get(axum::http::header::AUTHORIZATION)
		.and_then(|v| v.to_str().ok())
		.and_then(|v| v.strip_prefix("Bearer "))
		.ok_or_else(|| ApiError::Unauthorized("no bearer token provided".to_string()))?;

	state
		.verifier
		.verify(token)
		.await
		.map_err(|e| ApiError::Unauthorized(e.to_string()))
}

/// Read API: the current set of records, active and inactive.
async fn list_resources(
	State(state): State<AppState>,
) -> Result<Json<Vec<ResourceRecord>>, ApiError> {
	let records = state
		.store
		.list_records()
		.await
		.map_err(|e| ApiError::Unavailable(e.to_string()))?;
	Ok(Json(records))
}

/// Sync trigger API: run one merge+upsert cycle synchronously and
/// report what it processed. Partial upsert failures still produce a
/// report; only an aborted cycle is an error.
async fn trigger_sync(
	State(state): State<AppState>,
	headers: HeaderMap,
) -> Result<Json<SyncReport>, ApiError> {
	authenticate(&state, &headers).await?;

	match sync::run_cycle(&state.sources, &state.store, &state.metrics).await {
		Ok(report) => Ok(Json(report)),
		Err(SyncError::Partial { report }) => {
			warn!(failed = report.failed, "manual sync completed with failures");
			Ok(Json(report))
		}
		Err(e) => Err(e.into()),
	}
}

#[derive(Debug, Deserialize)]
struct BookingBody {
	hospital: Option<String>,
	category: Option<String>,
	/// Sub-resource -> requested quantity, validated at the boundary.
	items: Option<Value>,
	booking_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
struct CommitResponse {
	message: String,
	hospital_id: String,
	hospital_name: String,
}

fn require<T>(field: Option<T>, name: &str) -> Result<T, ApiError> {
	field.ok_or_else(|| ApiError::Validation(format!("missing required field '{}'", name)))
}

/// Validate a raw items object into non-empty, strictly positive
/// requested quantities.
fn validate_items(raw: &Value) -> Result<CategoryMap, ApiError> {
	let items = CategoryMap::from_value(raw)
		.map_err(|e| ApiError::Validation(format!("invalid items: {}", e)))?;
	if items.is_empty() {
		return Err(ApiError::Validation("items must not be empty".to_string()));
	}
	if let Some((resource, _)) = items.iter().find(|(_, q)| **q == 0) {
		return Err(ApiError::Validation(format!(
			"requested quantity for '{}' must be positive",
			resource
		)));
	}
	Ok(items)
}

/// Booking API: atomically decrement the requested quantities. Returns
/// a confirmation without echoing inventory; clients re-fetch via the
/// read API.
async fn create_booking(
	State(state): State<AppState>,
	headers: HeaderMap,
	Json(body): Json<BookingBody>,
) -> Result<Json<CommitResponse>, ApiError> {
	let requester = authenticate(&state, &headers).await?;

	let hospital = require(body.hospital, "hospital")?;
	let category_raw = require(body.category, "category")?;
	let items_raw = require(body.items, "items")?;
	let booking_date = require(body.booking_date, "booking_date")?;

	let category = Category::parse(&category_raw)
		.ok_or_else(|| ApiError::Validation(format!("unknown category '{}'", category_raw)))?;
	let items = validate_items(&items_raw)?;

	let outcome = state
		.ledger
		.commit(&CommitRequest {
			hospital,
			category,
			items,
			requester,
			kind: TransactionKind::Booking,
			requested_at: booking_date,
		})
		.await?;

	Ok(Json(CommitResponse {
		message: "resource booking request submitted successfully".to_string(),
		hospital_id: outcome.hospital_id,
		hospital_name: outcome.hospital_name,
	}))
}

#[derive(Debug, Deserialize)]
struct TransferBody {
	hospital: Option<String>,
	/// Bed service the patients are transferred into ("ICU", ...).
	service: Option<String>,
	patients: Option<Vec<PatientInfo>>,
	transfer_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
struct PatientInfo {
	#[allow(dead_code)]
	name: String,
	#[allow(dead_code)]
	age: u32,
}

/// Transfer API: each patient consumes one bed in the named service.
/// Shares the booking path through the availability ledger.
async fn create_transfer(
	State(state): State<AppState>,
	headers: HeaderMap,
	Json(body): Json<TransferBody>,
) -> Result<Json<CommitResponse>, ApiError> {
	let requester = authenticate(&state, &headers).await?;

	let hospital = require(body.hospital, "hospital")?;
	let service = require(body.service, "service")?;
	let patients = require(body.patients, "patients")?;
	let transfer_date = require(body.transfer_date, "transfer_date")?;

	if patients.is_empty() {
		return Err(ApiError::Validation(
			"patients must not be empty".to_string(),
		));
	}

	let mut items = CategoryMap::new();
	items.set(slugify(&service), patients.len() as u64);

	let outcome = state
		.ledger
		.commit(&CommitRequest {
			hospital,
			category: Category::Beds,
			items,
			requester,
			kind: TransactionKind::Transfer,
			requested_at: transfer_date,
		})
		.await?;

	Ok(Json(CommitResponse {
		message: "patient transfer request submitted successfully".to_string(),
		hospital_id: outcome.hospital_id,
		hospital_name: outcome.hospital_name,
	}))
}
