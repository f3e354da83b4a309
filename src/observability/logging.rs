use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Structured JSON logging to stdout. The configured default level
/// applies unless `RUST_LOG` overrides it.
pub fn init_logging(default_level: log::Level) -> anyhow::Result<()> {
	let fallback = default_level.as_str().to_lowercase();
	let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
		EnvFilter::try_new(&fallback).unwrap_or_else(|_| EnvFilter::new("info"))
	});

	let format = tracing_subscriber::fmt::layer()
		.json()
		.with_target(true)
		.with_current_span(true)
		.with_span_list(true)
		.with_file(true)
		.with_line_number(true);

	tracing_subscriber::registry()
		.with(filter)
		.with(format)
		.try_init()
		.map_err(|e| anyhow::anyhow!("failed to initialize logging: {}", e))
}

#[cfg(feature = "unit-tests")]
mod tests {
	#[test]
	fn logging_initializes_at_most_once() {
		// A second call in the same process returns an error instead of
		// panicking; both outcomes are acceptable here.
		let _ = super::init_logging(log::Level::Info);
		let _ = super::init_logging(log::Level::Debug);
	}
}
