use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, error, info, warn};

use crate::observability::MetricsRegistry;
use crate::source::SourceAdapter;
use crate::store::CentralStore;
use crate::sync::{self, SyncError};

/// Start the periodic sync driver: one eager cycle at startup, then
/// one per `period` for the process lifetime. Cycles are single-flight
/// by construction — each cycle is awaited inline and missed ticks are
/// skipped, so a cycle that overruns the interval delays the next one
/// instead of overlapping it. Cycle failures are logged and swallowed;
/// they never stop the scheduler.
pub fn start_scheduler(
	sources: Vec<Arc<dyn SourceAdapter>>,
	store: Arc<dyn CentralStore>,
	metrics: Arc<MetricsRegistry>,
	period: Duration,
) -> JoinHandle<()> {
	tokio::spawn(async move {
		if sources.is_empty() {
			// Running a cycle with zero sources would deactivate every
			// central record, so refuse to tick at all.
			warn!("no sources configured; periodic sync disabled");
			return;
		}

		info!(
			sources = sources.len(),
			period_ms = period.as_millis() as u64,
			"starting periodic sync"
		);

		let mut tick = interval(period);
		tick.set_missed_tick_behavior(MissedTickBehavior::Skip);

		loop {
			// First tick completes immediately: the eager startup cycle.
			tick.tick().await;

			match sync::run_cycle(&sources, &store, &metrics).await {
				Ok(report) => {
					debug!(
						upserted = report.upserted,
						deactivated = report.deactivated,
						dropped = report.dropped,
						rejected = report.rejected,
						"sync cycle completed"
					);
				}
				Err(e @ SyncError::Partial { .. }) => {
					metrics.sync_partial_failures_total.inc();
					warn!(error = %e, "sync cycle completed with partial failures");
				}
				Err(e) => {
					metrics.sync_failures_total.inc();
					error!(error = %e, "sync cycle failed");
				}
			}
		}
	})
}
