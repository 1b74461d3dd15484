use clap::Parser;
use privacy_pool_subscriber::config::AppConfig;
use privacy_pool_subscriber::indexer::IndexerClient;
use privacy_pool_subscriber::retry::RetryPolicy;
use privacy_pool_subscriber::sync::filters::pool_filters;
use privacy_pool_subscriber::sync::subscriber::{Subscriber, SubscriberConfig};
use privacy_pool_subscriber::sync::IngestionCoordinator;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Privacy-pool transaction subscriber
#[derive(Debug, Parser)]
#[command(version)]
struct Cli {
	/// Env file naming the indexer, application setup and database paths
	#[arg(long, env = "POOL_ENV_FILE", default_value = "../config/.env")]
	env_file: PathBuf,

	/// Seconds between indexer polls
	#[arg(long, env = "POOL_POLL_INTERVAL_SECS", default_value_t = 5)]
	poll_interval_secs: u64,

	/// Maximum transactions fetched per indexer page
	#[arg(long, env = "POOL_PAGE_LIMIT", default_value_t = 1000)]
	page_limit: u32,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
	tracing_subscriber::fmt()
		.with_env_filter(
			EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
		)
		.with_target(false)
		.with_thread_ids(false)
		.with_thread_names(false)
		.with_file(false)
		.with_line_number(false)
		.with_timer(tracing_subscriber::fmt::time::time())
		.init();

	let cli = Cli::parse();
	info!("Starting privacy pool subscriber");

	let config = match AppConfig::load(&cli.env_file) {
		Ok(config) => config,
		Err(e) => {
			error!("Failed to load configuration: {}", e);
			return ExitCode::FAILURE;
		}
	};
	info!(
		"Application {} (created in round {}), indexer {}, database {:?}",
		config.app.id, config.app.creation_block, config.indexer.url, config.db_path
	);

	let coordinator = match IngestionCoordinator::open(&config, RetryPolicy::default()) {
		Ok(coordinator) => coordinator,
		Err(e) => {
			error!("Failed to start coordinator: {}", e);
			return ExitCode::FAILURE;
		}
	};

	let indexer_client =
		match IndexerClient::new(config.indexer.url.clone(), config.indexer.token.clone()) {
			Ok(client) => client,
			Err(e) => {
				error!("Failed to create indexer client: {}", e);
				return ExitCode::FAILURE;
			}
		};

	let mut subscriber = Subscriber::new(
		indexer_client,
		coordinator,
		SubscriberConfig {
			application_id: config.app.id,
			filters: pool_filters(config.app.id),
			frequency: Duration::from_secs(cli.poll_interval_secs.max(1)),
			page_limit: cli.page_limit,
		},
	);

	let shutdown = async {
		if let Err(e) = tokio::signal::ctrl_c().await {
			error!("Failed to listen for Ctrl-C: {}", e);
			std::future::pending::<()>().await;
		}
	};

	let mut exit_code = ExitCode::SUCCESS;
	if let Err(e) = subscriber.run(shutdown).await {
		error!("Subscriber stopped: {}", e);
		exit_code = ExitCode::FAILURE;
	}

	if let Err(e) = subscriber.into_handler().shutdown() {
		error!("Failed to close store: {}", e);
		exit_code = ExitCode::FAILURE;
	}

	exit_code
}
