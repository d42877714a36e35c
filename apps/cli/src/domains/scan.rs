use crate::{context::Context, print_output, ui::progress::BarReporter, util::output::human_bytes};

use mc_core::{
	validator::validate_path, CancellationToken, PathValidationResult, ScanReport, ScanStatus,
	Scanner,
};

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;

#[derive(Args, Debug, Clone)]
pub struct ScanArgs {
	/// Directory to scan
	pub root: PathBuf,

	/// Generate thumbnails, scrub frames and durations for new files
	#[arg(long, default_value_t = false)]
	pub previews: bool,

	/// Register files without fingerprinting them
	#[arg(long, default_value_t = false)]
	pub no_fingerprint: bool,

	/// Extra glob patterns to ignore, on top of the configured ones
	#[arg(long = "ignore", value_name = "GLOB")]
	pub ignore: Vec<String>,

	/// Descend into symlinked directories
	#[arg(long, default_value_t = false)]
	pub follow_symlinks: bool,
}

pub async fn run(ctx: &Context, args: ScanArgs, cancel: &CancellationToken) -> Result<()> {
	let mut config = ctx.config.clone();
	config.scanner.generate_previews |= args.previews;
	config.scanner.fingerprint &= !args.no_fingerprint;
	config.scanner.follow_symlinks |= args.follow_symlinks;
	config.scanner.ignore_patterns.extend(args.ignore);

	let scanner = Scanner::new(ctx.profile_id, ctx.dyn_catalog(), &config)?;
	let reporter = BarReporter::new(ctx.is_human());

	let report = scanner.scan(&args.root, &reporter, cancel).await;
	reporter.finish();
	let report = report?;

	ctx.save_catalog().await?;

	print_output!(ctx, report, |report: &ScanReport| {
		let stats = &report.stats;
		match report.status {
			ScanStatus::Completed => println!("Scan of {} complete", args.root.display()),
			ScanStatus::Canceled => println!("Scan of {} canceled", args.root.display()),
		}
		println!("  processed:   {}", stats.processed);
		println!("  registered:  {} ({})", stats.registered, human_bytes(stats.bytes));
		println!("  skipped:     {}", stats.skipped);
		println!("  ignored:     {}", stats.ignored);
		println!("  vanished:    {}", stats.vanished);
		if config.scanner.generate_previews {
			println!("  thumbnails:  {}", stats.thumbnails);
			println!("  frame sets:  {}", stats.preview_frames);
		}
		println!("  took:        {:.2?}", report.elapsed);

		if !report.errors.is_empty() {
			println!("{} non-critical errors:", report.errors.len());
			for e in &report.errors {
				println!("  - {e}");
			}
		}
	});

	Ok(())
}

#[derive(Args, Debug, Clone)]
pub struct ValidateArgs {
	pub paths: Vec<PathBuf>,
}

pub async fn validate(ctx: &Context, args: ValidateArgs) -> Result<()> {
	let mut results = Vec::with_capacity(args.paths.len());
	for path in args.paths {
		let result = validate_path(&path).await;
		results.push((path, result));
	}

	print_output!(ctx, results, |results: &Vec<(PathBuf, PathValidationResult)>| {
		for (path, result) in results {
			if result.valid {
				println!("ok       {}", path.display());
			} else {
				println!(
					"invalid  {} ({})",
					path.display(),
					result.message.as_deref().unwrap_or("unknown error")
				);
			}
		}
	});

	Ok(())
}
