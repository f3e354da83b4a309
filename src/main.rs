use asclepius::{config, observability, run, sync};
use clap::{Parser, Subcommand};
use std::sync::Arc;

#[derive(Parser)]
#[command(
	name = "asclepius",
	about = "Asclepius - central hospital resource availability hub"
)]
struct Cli {
	#[command(subcommand)]
	command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
	/// Run the hub: periodic sync plus the HTTP API (default)
	Run,
	/// Run a single fetch-merge-upsert cycle and exit
	SyncOnce,
}

#[tokio::main]
async fn main() {
	let cli = Cli::parse();

	let settings = match config::load() {
		Ok(settings) => settings,
		Err(e) => {
			eprintln!("Warning: failed to load config, using defaults: {}", e);
			config::Settings::default()
		}
	};

	if let Err(e) = observability::init_logging(settings.log_level) {
		eprintln!("Warning: failed to initialize logging: {}", e);
	}

	match cli.command.unwrap_or(Commands::Run) {
		Commands::Run => {
			if let Err(e) = run(settings).await {
				eprintln!("asclepius exited with error: {:#}", e);
				std::process::exit(1);
			}
		}
		Commands::SyncOnce => {
			let result = async {
				let (store, sources) = asclepius::connect_stores(&settings).await?;
				if sources.is_empty() {
					anyhow::bail!("no sources configured (HUB_SOURCE_DATABASE_URLS)");
				}
				let metrics = Arc::new(observability::MetricsRegistry::new());
				let report = sync::run_cycle(&sources, &store, &metrics).await?;
				Ok::<_, anyhow::Error>(report)
			}
			.await;

			match result {
				Ok(report) => println!(
					"Sync cycle complete: {} processed, {} upserted, {} deactivated, {} dropped, {} rejected.",
					report.processed,
					report.upserted,
					report.deactivated,
					report.dropped,
					report.rejected
				),
				Err(e) => {
					eprintln!("Sync cycle failed: {:#}", e);
					std::process::exit(1);
				}
			}
		}
	}
}
