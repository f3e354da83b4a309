pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod health;
pub mod ledger;
pub mod model;
pub mod observability;
pub mod source;
pub mod state;
pub mod store;
pub mod sync;

use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::auth::JwtVerifier;
use crate::config::Settings;
use crate::ledger::Ledger;
use crate::observability::init_metrics;
use crate::source::{PgSourceAdapter, SourceAdapter};
use crate::state::AppState;
use crate::store::{CentralStore, PgStore};

/// Connect the central store and one adapter per configured source.
/// All connections are built here from settings and handed down by
/// reference; nothing holds ambient connection state.
pub async fn connect_stores(
	settings: &Settings,
) -> Result<(Arc<dyn CentralStore>, Vec<Arc<dyn SourceAdapter>>)> {
	let store: Arc<dyn CentralStore> =
		Arc::new(PgStore::connect(settings.central_database_url.as_str()).await?);

	let mut sources: Vec<Arc<dyn SourceAdapter>> =
		Vec::with_capacity(settings.source_database_urls.len());
	for (i, url) in settings.source_database_urls.iter().enumerate() {
		let id = format!("source-{}", i + 1);
		let adapter = PgSourceAdapter::connect(id.clone(), url.as_str()).await?;
		info!(source_id = %id, "connected source");
		sources.push(Arc::new(adapter));
	}

	Ok((store, sources))
}

/// Run the hub: periodic sync against all configured sources plus the
/// HTTP API, for the process lifetime.
pub async fn run(settings: Settings) -> Result<()> {
	if settings.jwt_secret.is_empty() {
		warn!("HUB_JWT_SECRET is empty; all bearer tokens will be rejected");
	}

	let (store, sources) = connect_stores(&settings).await?;
	let metrics = init_metrics()?;

	let verifier = Arc::new(JwtVerifier::new(
		&settings.jwt_secret,
		settings.jwt_issuer.as_deref(),
	));
	let ledger = Arc::new(Ledger::new(
		store.clone(),
		metrics.clone(),
		settings.ledger_max_attempts,
	));

	// The scheduler runs decoupled from request traffic; its handle is
	// deliberately dropped (it lives for the process lifetime).
	let _scheduler = sync::start_scheduler(
		sources.clone(),
		store.clone(),
		metrics.clone(),
		Duration::from_millis(settings.sync_interval_ms),
	);

	let state = AppState {
		store,
		sources: Arc::new(sources),
		ledger,
		verifier,
		metrics,
	};

	let app = api::router(state);
	let addr = format!("{}:{}", settings.host, settings.port);
	let listener = tokio::net::TcpListener::bind(&addr)
		.await
		.with_context(|| format!("failed to bind {}", addr))?;

	info!(%addr, "asclepius listening");
	axum::serve(listener, app)
		.await
		.context("http server terminated")?;
	Ok(())
}
