#![warn(
	clippy::all,
	clippy::pedantic,
	clippy::correctness,
	clippy::perf,
	clippy::style,
	clippy::suspicious,
	clippy::complexity,
	clippy::nursery,
	clippy::unwrap_used,
	unused_qualifications,
	rust_2018_idioms,
	trivial_casts,
	trivial_numeric_casts,
	unused_allocation,
	clippy::dbg_macro
)]
#![allow(clippy::missing_errors_doc, clippy::module_name_repetitions)]

mod context;
mod domains;
mod ui;
mod util;

use crate::{
	context::{Context, ContextArgs},
	domains::{
		diagnostics::DiagnoseArgs,
		hash::HashArgs,
		preview::{FramesArgs, MediaArgs, ThumbnailArgs},
		scan::{ScanArgs, ValidateArgs},
	},
	util::output::OutputFormat,
};

use mc_core::CancellationToken;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::{error, warn};
use uuid::Uuid;

#[derive(Parser, Debug)]
#[command(name = "mediacat", version, about = "Media ingestion and preview pipeline")]
struct Cli {
	/// Data directory holding the config, the catalog and generated artifacts
	#[arg(long, global = true, env = "MEDIACAT_DATA_DIR")]
	data_dir: Option<PathBuf>,

	/// Pipeline config file, defaults to `<data-dir>/mediacat.json`
	#[arg(long, global = true)]
	config: Option<PathBuf>,

	/// Catalog file, defaults to `<data-dir>/catalog.json`
	#[arg(long, global = true)]
	catalog: Option<PathBuf>,

	/// Profile whose catalog records and artifacts are used
	#[arg(long, global = true, env = "MEDIACAT_PROFILE", default_value_t = Uuid::nil())]
	profile: Uuid,

	/// Output format
	#[arg(long, global = true, value_enum, default_value = "human")]
	format: OutputFormat,

	/// Also write logs to this file
	#[arg(long, global = true)]
	log_file: Option<PathBuf>,

	/// More detailed logs
	#[arg(short, long, global = true, default_value_t = false)]
	verbose: bool,

	#[command(subcommand)]
	command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
	/// Scan a directory into the catalog
	Scan(ScanArgs),
	/// Check paths for length, characters and accessibility
	Validate(ValidateArgs),
	/// Fingerprint files
	Hash(HashArgs),
	/// Generate a webp thumbnail
	Thumbnail(ThumbnailArgs),
	/// Extract evenly spaced scrub frames from a video
	Frames(FramesArgs),
	/// Print the duration of a video
	Duration(MediaArgs),
	/// Tell whether an image is animated
	Animated(MediaArgs),
	/// Rebuild every cataloged thumbnail of the profile
	Regenerate,
	/// Report orphaned artifacts
	Diagnose(DiagnoseArgs),
	/// Delete orphaned artifacts
	Cleanup,
}

#[tokio::main]
async fn main() -> Result<()> {
	let cli = Cli::parse();

	let _log_guard = util::logging::init(cli.verbose, cli.log_file.as_deref())?;

	let ctx = Context::load(ContextArgs {
		data_dir: cli.data_dir,
		config: cli.config,
		catalog: cli.catalog,
		profile_id: cli.profile,
		format: cli.format,
	})
	.await?;

	let cancel = CancellationToken::new();
	tokio::spawn({
		let cancel = cancel.clone();
		async move {
			if tokio::signal::ctrl_c().await.is_ok() {
				warn!("Interrupted, finishing in-flight work;");
				cancel.cancel();
			}
		}
	});

	let res = match cli.command {
		Commands::Scan(args) => domains::scan::run(&ctx, args, &cancel).await,
		Commands::Validate(args) => domains::scan::validate(&ctx, args).await,
		Commands::Hash(args) => domains::hash::run(&ctx, args, &cancel).await,
		Commands::Thumbnail(args) => domains::preview::thumbnail(&ctx, args, &cancel).await,
		Commands::Frames(args) => domains::preview::frames(&ctx, args).await,
		Commands::Duration(args) => domains::preview::duration(&ctx, args).await,
		Commands::Animated(args) => domains::preview::animated(&ctx, args).await,
		Commands::Regenerate => domains::preview::regenerate(&ctx, &cancel).await,
		Commands::Diagnose(args) => domains::diagnostics::diagnose(&ctx, args).await,
		Commands::Cleanup => domains::diagnostics::cleanup(&ctx).await,
	};

	if let Err(e) = &res {
		error!(?e, "Command failed;");
	}

	res
}
