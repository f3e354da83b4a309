mod common;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use std::sync::Arc;
use tower::ServiceExt;

use asclepius::api;
use asclepius::source::SourceAdapter;
use asclepius::store::{CentralStore, MemStore};

use common::{MemSource, VALID_TOKEN, entry_with_beds, seeded_record, test_state};

fn app(store: Arc<MemStore>, sources: Vec<Arc<dyn SourceAdapter>>) -> Router {
	api::router(test_state(store, sources))
}

fn post_json(uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
	let mut builder = Request::builder()
		.method("POST")
		.uri(uri)
		.header(header::CONTENT_TYPE, "application/json");
	if let Some(token) = token {
		builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
	}
	builder.body(Body::from(body.to_string())).unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
	let bytes = response.into_body().collect().await.unwrap().to_bytes();
	serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
#[cfg(feature = "unit-tests")]
async fn read_api_lists_active_and_inactive_records() {
	let store = Arc::new(MemStore::new());
	store.seed(seeded_record("h1", "City General", 5)).await;
	let mut inactive = seeded_record("h2", "North Clinic", 2);
	inactive.status = asclepius::model::RecordStatus::Inactive;
	store.seed(inactive).await;

	let response = app(store, vec![])
		.oneshot(
			Request::builder()
				.uri("/api/resources")
				.body(Body::empty())
				.unwrap(),
		)
		.await
		.unwrap();
	assert_eq!(response.status(), StatusCode::OK);

	let body = body_json(response).await;
	let records = body.as_array().unwrap();
	assert_eq!(records.len(), 2);
	assert_eq!(records[0]["hospital_id"], "h1");
	assert_eq!(records[0]["beds"]["icu"], 5);
	assert_eq!(records[1]["status"], "inactive");
}

#[tokio::test]
#[cfg(feature = "unit-tests")]
async fn booking_requires_bearer_token() {
	let store = Arc::new(MemStore::new());
	store.seed(seeded_record("h1", "City General", 5)).await;

	let body = json!({
		"hospital": "City General",
		"category": "beds",
		"items": { "icu": 1 },
		"booking_date": "2026-08-24T10:00:00Z"
	});

	let response = app(store.clone(), vec![])
		.oneshot(post_json("/api/bookings", None, body.clone()))
		.await
		.unwrap();
	assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

	let response = app(store, vec![])
		.oneshot(post_json("/api/bookings", Some("bogus"), body))
		.await
		.unwrap();
	assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
#[cfg(feature = "unit-tests")]
async fn booking_validates_required_fields() {
	let store = Arc::new(MemStore::new());
	store.seed(seeded_record("h1", "City General", 5)).await;

	// Missing items
	let body = json!({
		"hospital": "City General",
		"category": "beds",
		"booking_date": "2026-08-24T10:00:00Z"
	});
	let response = app(store.clone(), vec![])
		.oneshot(post_json("/api/bookings", Some(VALID_TOKEN), body))
		.await
		.unwrap();
	assert_eq!(response.status(), StatusCode::BAD_REQUEST);
	let error = body_json(response).await;
	assert!(error["error"].as_str().unwrap().contains("items"));

	// Unknown category
	let body = json!({
		"hospital": "City General",
		"category": "staffing",
		"items": { "icu": 1 },
		"booking_date": "2026-08-24T10:00:00Z"
	});
	let response = app(store.clone(), vec![])
		.oneshot(post_json("/api/bookings", Some(VALID_TOKEN), body))
		.await
		.unwrap();
	assert_eq!(response.status(), StatusCode::BAD_REQUEST);

	// Zero quantity
	let body = json!({
		"hospital": "City General",
		"category": "beds",
		"items": { "icu": 0 },
		"booking_date": "2026-08-24T10:00:00Z"
	});
	let response = app(store, vec![])
		.oneshot(post_json("/api/bookings", Some(VALID_TOKEN), body))
		.await
		.unwrap();
	assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
#[cfg(feature = "unit-tests")]
async fn booking_decrements_then_rejects_when_drained() {
	let store = Arc::new(MemStore::new());
	store.seed(seeded_record("h1", "City General", 5)).await;

	let body = json!({
		// case-insensitive name lookup
		"hospital": "city general",
		"category": "beds",
		"items": { "ICU": 3 },
		"booking_date": "2026-08-24T10:00:00Z"
	});

	let response = app(store.clone(), vec![])
		.oneshot(post_json("/api/bookings", Some(VALID_TOKEN), body.clone()))
		.await
		.unwrap();
	assert_eq!(response.status(), StatusCode::OK);
	let confirmation = body_json(response).await;
	assert_eq!(confirmation["hospital_id"], "h1");
	// confirmation deliberately does not echo updated inventory
	assert!(confirmation.get("beds").is_none());

	let record = store.find_by_identity("h1").await.unwrap().unwrap();
	assert_eq!(record.beds.get("icu"), 2);

	// Only 2 left now; the same request must fail without mutation.
	let response = app(store.clone(), vec![])
		.oneshot(post_json("/api/bookings", Some(VALID_TOKEN), body))
		.await
		.unwrap();
	assert_eq!(response.status(), StatusCode::CONFLICT);
	let error = body_json(response).await;
	assert!(error["error"].as_str().unwrap().contains("icu"));

	let record = store.find_by_identity("h1").await.unwrap().unwrap();
	assert_eq!(record.beds.get("icu"), 2);

	let transactions = store.transactions().await;
	assert_eq!(transactions.len(), 1);
	assert_eq!(transactions[0].requester_subject, "doc-1");
}

#[tokio::test]
#[cfg(feature = "unit-tests")]
async fn booking_unknown_hospital_is_404() {
	let store = Arc::new(MemStore::new());

	let body = json!({
		"hospital": "Nowhere Clinic",
		"category": "beds",
		"items": { "icu": 1 },
		"booking_date": "2026-08-24T10:00:00Z"
	});
	let response = app(store, vec![])
		.oneshot(post_json("/api/bookings", Some(VALID_TOKEN), body))
		.await
		.unwrap();
	assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
#[cfg(feature = "unit-tests")]
async fn transfer_consumes_one_bed_per_patient() {
	let store = Arc::new(MemStore::new());
	store.seed(seeded_record("h1", "City General", 5)).await;

	let body = json!({
		"hospital": "City General",
		"service": "ICU",
		"patients": [
			{ "name": "A", "age": 40 },
			{ "name": "B", "age": 62 }
		],
		"transfer_date": "2026-08-24T10:00:00Z"
	});
	let response = app(store.clone(), vec![])
		.oneshot(post_json("/api/transfers", Some(VALID_TOKEN), body))
		.await
		.unwrap();
	assert_eq!(response.status(), StatusCode::OK);

	let record = store.find_by_identity("h1").await.unwrap().unwrap();
	assert_eq!(record.beds.get("icu"), 3);

	let transactions = store.transactions().await;
	assert_eq!(transactions.len(), 1);
	assert_eq!(transactions[0].items.get("icu"), 2);
}

#[tokio::test]
#[cfg(feature = "unit-tests")]
async fn sync_trigger_runs_one_cycle_and_reports() {
	let store = Arc::new(MemStore::new());
	let source = MemSource::new("source-1", vec![entry_with_beds("h1", "City General", 5)]);
	let sources: Vec<Arc<dyn SourceAdapter>> = vec![source];

	let response = app(store.clone(), sources)
		.oneshot(post_json("/api/sync", Some(VALID_TOKEN), json!({})))
		.await
		.unwrap();
	assert_eq!(response.status(), StatusCode::OK);

	let report = body_json(response).await;
	assert_eq!(report["processed"], 1);
	assert_eq!(report["upserted"], 1);
	assert!(store.find_by_identity("h1").await.unwrap().is_some());
}

#[tokio::test]
#[cfg(feature = "unit-tests")]
async fn health_endpoint_reports_ok_for_memstore() {
	let store = Arc::new(MemStore::new());
	let response = app(store, vec![])
		.oneshot(
			Request::builder()
				.uri("/health")
				.body(Body::empty())
				.unwrap(),
		)
		.await
		.unwrap();
	assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
#[cfg(feature = "unit-tests")]
async fn metrics_endpoint_exposes_ledger_counters() {
	let store = Arc::new(MemStore::new());
	store.seed(seeded_record("h1", "City General", 5)).await;
	let state = test_state(store, vec![]);
	let router = api::router(state.clone());

	let body = json!({
		"hospital": "City General",
		"category": "beds",
		"items": { "icu": 1 },
		"booking_date": "2026-08-24T10:00:00Z"
	});
	let response = router
		.clone()
		.oneshot(post_json("/api/bookings", Some(VALID_TOKEN), body))
		.await
		.unwrap();
	assert_eq!(response.status(), StatusCode::OK);

	let response = router
		.oneshot(
			Request::builder()
				.uri("/metrics")
				.body(Body::empty())
				.unwrap(),
		)
		.await
		.unwrap();
	assert_eq!(response.status(), StatusCode::OK);
	let bytes = response.into_body().collect().await.unwrap().to_bytes();
	let text = String::from_utf8(bytes.to_vec()).unwrap();
	assert!(text.contains("asclepius_ledger_commits_total 1"));
}
