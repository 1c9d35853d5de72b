// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Teamboard CLI
//!
//! Creates, inspects and follows shared team boards through the sync engine.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{debug, info};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use teamboard_cli_config::{
	load_config_with_cli,
	runtime::LoggingConfig,
	CliOverrides, LogFormat, LogLevel,
};
use teamboard_sync::{
	CreateTeamRequest, Item, ItemCatalog, ItemSourceResolver, ItemsListener, NoopCatalog,
	StaticCatalog, SyncOrchestrator, TeamCode,
};

mod render;

/// Teamboard - shared item checklists kept in sync across clients
#[derive(Parser, Debug)]
#[command(name = "teamboard", version, about, long_about = None)]
struct Args {
	/// Path to custom configuration file
	#[arg(short, long)]
	config: Option<PathBuf>,

	/// Log level (overrides config)
	#[arg(short, long)]
	log_level: Option<String>,

	/// Output logs as JSON (overrides config)
	#[arg(long)]
	json_logs: bool,

	/// Team backend base URL (overrides config)
	#[arg(long)]
	server_url: Option<String>,

	/// JSON object mapping item names to item ids
	#[arg(long, value_name = "FILE")]
	catalog: Option<PathBuf>,

	#[command(subcommand)]
	command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
	/// Create a team from manual text or a remote item document
	Create {
		/// Display name of the team
		name: String,

		/// File holding the item list, one item per line or a JSON document
		#[arg(long, value_name = "FILE", conflicts_with = "remote_url")]
		items_file: Option<PathBuf>,

		/// URL of an externally hosted item document
		#[arg(long)]
		remote_url: Option<String>,

		#[arg(long, default_value = "")]
		webhook: String,

		/// Auto-refresh period in minutes; 0 uses the configured default
		#[arg(long, default_value_t = 0)]
		refresh_minutes: u32,

		/// Keep obtained flags when the item list is replaced
		#[arg(long)]
		persist_obtained: bool,

		#[arg(long)]
		leader: Option<String>,
	},

	/// Print a team's settings and items
	Show { team: TeamCode },

	/// Follow a team and print its items on every change until Ctrl-C
	Watch { team: TeamCode },

	/// Mark an item as obtained
	Obtain { team: TeamCode, item: String },

	/// Reload a team's items from its source
	Refresh { team: TeamCode },

	/// Delete a team
	Delete { team: TeamCode },

	/// Parse an item document locally without contacting the backend
	Parse {
		/// Document to parse; `-` reads stdin
		file: PathBuf,
	},
}

impl From<&Args> for CliOverrides {
	fn from(args: &Args) -> Self {
		CliOverrides {
			server_url: args.server_url.clone(),
			log_level: args.log_level.clone(),
			log_format: if args.json_logs {
				Some("json".to_string())
			} else {
				None
			},
			config_file: args.config.clone(),
		}
	}
}

fn log_level_to_tracing(level: LogLevel) -> tracing::Level {
	match level {
		LogLevel::Trace => tracing::Level::TRACE,
		LogLevel::Debug => tracing::Level::DEBUG,
		LogLevel::Info => tracing::Level::INFO,
		LogLevel::Warn => tracing::Level::WARN,
		LogLevel::Error => tracing::Level::ERROR,
	}
}

fn init_tracing(logging: &LoggingConfig) {
	let level = log_level_to_tracing(logging.level);
	let filter = EnvFilter::try_from_default_env()
		.unwrap_or_else(|_| EnvFilter::new(format!("teamboard={level}")));

	// Board output goes to stdout, so logs go to stderr.
	match logging.format {
		LogFormat::Json => {
			tracing_subscriber::registry()
				.with(filter)
				.with(fmt::layer().json().with_writer(std::io::stderr))
				.init();
		}
		LogFormat::Compact => {
			tracing_subscriber::registry()
				.with(filter)
				.with(fmt::layer().compact().with_writer(std::io::stderr))
				.init();
		}
		LogFormat::Pretty => {
			tracing_subscriber::registry()
				.with(filter)
				.with(fmt::layer().with_writer(std::io::stderr))
				.init();
		}
	}
}

fn load_catalog(path: Option<&Path>) -> Result<Arc<dyn ItemCatalog>> {
	let Some(path) = path else {
		return Ok(Arc::new(NoopCatalog));
	};
	let content = std::fs::read_to_string(path)
		.with_context(|| format!("failed to read catalog {}", path.display()))?;
	let ids: HashMap<String, i64> = serde_json::from_str(&content)
		.with_context(|| format!("catalog {} is not a JSON object of name to id", path.display()))?;
	let catalog: StaticCatalog = ids.into_iter().collect();
	debug!(path = %path.display(), entries = catalog.len(), "loaded item catalog");
	Ok(Arc::new(catalog))
}

fn read_document(path: &Path) -> Result<String> {
	if path == Path::new("-") {
		return std::io::read_to_string(std::io::stdin()).context("failed to read stdin");
	}
	std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}

fn create_request(
	name: String,
	manual_items: Option<String>,
	remote_url: Option<String>,
	webhook: String,
	refresh_minutes: u32,
	persist_obtained: bool,
	leader: Option<String>,
) -> CreateTeamRequest {
	let mut request = CreateTeamRequest::new(name)
		.with_webhook(webhook)
		.with_refresh_interval(refresh_minutes)
		.with_persist_obtained(persist_obtained);
	if let Some(url) = remote_url {
		request = request.with_remote_url(url);
	} else if let Some(text) = manual_items {
		request = request.with_manual_items(text);
	}
	if let Some(leader) = leader {
		request = request.with_leader(leader);
	}
	request
}

async fn watch(orchestrator: &SyncOrchestrator, team: &TeamCode) -> Result<()> {
	let listener: ItemsListener = Arc::new(|items: &[Item]| {
		println!("{}\n", render::items_block(items));
	});

	let janitor = orchestrator.spawn_janitor();
	let initial = orchestrator
		.register_listener(team, listener)
		.await
		.with_context(|| format!("failed to load team {team}"))?;
	info!(team_code = %team, count = initial.len(), "watching team, press Ctrl-C to stop");

	tokio::signal::ctrl_c()
		.await
		.context("failed to listen for Ctrl-C")?;

	orchestrator.unregister_listener(team).await;
	janitor.abort();
	Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
	let args = Args::parse();

	let config = load_config_with_cli(CliOverrides::from(&args))
		.context("failed to load configuration")?;
	init_tracing(&config.logging);

	let catalog = load_catalog(args.catalog.as_deref())?;

	if let Command::Parse { file } = &args.command {
		let document = read_document(file)?;
		let resolver = ItemSourceResolver::new(&config.sync_config()).with_catalog(catalog);
		let items = resolver.parse(&document).await;
		println!("{}", render::items_block(&items));
		return Ok(());
	}

	info!(base_url = %config.server.base_url, "starting teamboard");
	let orchestrator = SyncOrchestrator::from_config(config.sync_config(), catalog)
		.context("failed to build sync engine")?;

	match args.command {
		Command::Create {
			name,
			items_file,
			remote_url,
			webhook,
			refresh_minutes,
			persist_obtained,
			leader,
		} => {
			let manual_items = items_file.as_deref().map(read_document).transpose()?;
			let request = create_request(
				name,
				manual_items,
				remote_url,
				webhook,
				refresh_minutes,
				persist_obtained,
				leader,
			);
			let code = orchestrator
				.create_team(&request)
				.await
				.context("failed to create team")?;
			println!("{code}");
		}
		Command::Show { team } => {
			let record = orchestrator
				.team_record(&team)
				.await
				.with_context(|| format!("failed to fetch team {team}"))?;
			println!("{}", render::record_header(&record));
			println!("{}", render::items_block(&record.items));
		}
		Command::Watch { team } => watch(&orchestrator, &team).await?,
		Command::Obtain { team, item } => {
			orchestrator
				.update_item_obtained(&team, &item, true)
				.await
				.with_context(|| format!("failed to mark {item} obtained"))?;
		}
		Command::Refresh { team } => {
			let items = orchestrator
				.refresh(&team)
				.await
				.with_context(|| format!("failed to refresh team {team}"))?;
			println!("{}", render::items_block(&items));
		}
		Command::Delete { team } => {
			orchestrator
				.delete_team(&team)
				.await
				.with_context(|| format!("failed to delete team {team}"))?;
		}
		Command::Parse { .. } => {}
	}

	Ok(())
}
