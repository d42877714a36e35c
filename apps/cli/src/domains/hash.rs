use crate::{context::Context, print_output, ui::progress::BarReporter};

use mc_core::{hash_files, CancellationToken, HashMode, HashOptions};

use std::{collections::BTreeMap, path::PathBuf};

use anyhow::Result;
use clap::Args;

#[derive(Args, Debug, Clone)]
pub struct HashArgs {
	/// Files to fingerprint
	#[arg(required = true)]
	pub paths: Vec<PathBuf>,

	/// Only hash the head and tail of each file
	#[arg(long, default_value_t = false)]
	pub partial: bool,

	/// Files hashed at once, defaults to the configured concurrency
	#[arg(long)]
	pub concurrency: Option<usize>,
}

pub async fn run(ctx: &Context, args: HashArgs, cancel: &CancellationToken) -> Result<()> {
	let options = HashOptions {
		mode: if args.partial {
			HashMode::Partial
		} else {
			HashMode::Full
		},
		concurrency: args
			.concurrency
			.unwrap_or(ctx.config.hashing.concurrency),
	};

	let reporter = BarReporter::new(ctx.is_human());
	let results = hash_files(&args.paths, options, &reporter, cancel).await;
	reporter.finish();

	// Paths never reached after a cancel are left out
	let output = args
		.paths
		.iter()
		.filter_map(|path| {
			results.get(path).map(|res| {
				(
					path.display().to_string(),
					res.as_ref().map_or_else(|e| format!("error: {e}"), ToString::to_string),
				)
			})
		})
		.collect::<BTreeMap<_, _>>();

	print_output!(ctx, output, |output: &BTreeMap<String, String>| {
		for (path, fingerprint) in output {
			println!("{fingerprint}  {path}");
		}
		if output.len() < args.paths.len() {
			println!("canceled, {} files not hashed", args.paths.len() - output.len());
		}
	});

	Ok(())
}
