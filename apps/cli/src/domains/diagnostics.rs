use crate::{context::Context, print_output, util::output::human_bytes};

use mc_core::{CleanupResult, DiagnosticResult, ThumbnailDiagnostics};

use anyhow::Result;
use clap::Args;

#[derive(Args, Debug, Clone)]
pub struct DiagnoseArgs {
	/// List every orphan instead of a sample
	#[arg(long, default_value_t = false)]
	pub all: bool,
}

pub async fn diagnose(ctx: &Context, args: DiagnoseArgs) -> Result<()> {
	let diagnostics = ThumbnailDiagnostics::new(ctx.store(), ctx.dyn_catalog());
	let result = diagnostics.diagnose(ctx.profile_id).await?;

	print_output!(ctx, result, |result: &DiagnosticResult| {
		println!("Artifacts of profile {}", result.profile_id);
		println!(
			"  on disk:     {} ({})",
			result.total_artifacts,
			human_bytes(result.total_bytes)
		);
		println!("  referenced:  {}", result.referenced);
		println!("  missing:     {}", result.missing);
		println!(
			"  orphaned:    {} ({})",
			result.orphaned_count,
			human_bytes(result.orphaned_bytes)
		);

		let listed = if args.all {
			&result.orphans
		} else {
			&result.sample
		};
		for orphan in listed {
			println!("  - {} ({})", orphan.path.display(), human_bytes(orphan.size));
		}
		if listed.len() < result.orphaned_count {
			println!("  ... and {} more", result.orphaned_count - listed.len());
		}
	});

	Ok(())
}

pub async fn cleanup(ctx: &Context) -> Result<()> {
	let diagnostics = ThumbnailDiagnostics::new(ctx.store(), ctx.dyn_catalog());
	let result = diagnostics.cleanup(ctx.profile_id).await?;

	print_output!(ctx, result, |result: &CleanupResult| {
		println!(
			"Deleted {} orphaned artifacts, freed {}",
			result.deleted_count,
			human_bytes(result.freed_bytes)
		);
		for e in &result.errors {
			println!("  - {e}");
		}
	});

	Ok(())
}
