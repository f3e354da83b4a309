use std::sync::Arc;

use crate::auth::IdentityVerifier;
use crate::ledger::Ledger;
use crate::observability::MetricsRegistry;
use crate::source::SourceAdapter;
use crate::store::CentralStore;

/// Application state passed to handlers via Axum's `State` extractor.
///
/// All store handles are constructed once at startup from settings and
/// shared by reference; no component reaches for ambient globals.
#[derive(Clone)]
pub struct AppState {
	pub store: Arc<dyn CentralStore>,
	pub sources: Arc<Vec<Arc<dyn SourceAdapter>>>,
	pub ledger: Arc<Ledger>,
	pub verifier: Arc<dyn IdentityVerifier>,
	pub metrics: Arc<MetricsRegistry>,
}
