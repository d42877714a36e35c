use crate::{context::Context, print_output, ui::progress::BarReporter};

use mc_core::{
	CancellationToken, Catalog, FileId, FileRecord, NoopReporter, RegenerationItem,
	RegenerationResult,
};

use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::Args;
use serde::Serialize;
use tracing::info;

#[derive(Args, Debug, Clone)]
pub struct ThumbnailArgs {
	pub path: PathBuf,

	/// Longest side in pixels, defaults to the configured resolution
	#[arg(long)]
	pub resolution: Option<u32>,

	/// Point the file's catalog record at the new thumbnail, replacing its old one
	#[arg(long, default_value_t = false)]
	pub attach: bool,
}

#[derive(Args, Debug, Clone)]
pub struct FramesArgs {
	pub path: PathBuf,

	/// Number of frames, defaults to the configured count
	#[arg(long)]
	pub count: Option<u32>,
}

#[derive(Args, Debug, Clone)]
pub struct MediaArgs {
	pub path: PathBuf,
}

#[derive(Serialize)]
struct Artifact {
	path: PathBuf,
	artifacts: Vec<String>,
}

pub async fn thumbnail(ctx: &Context, args: ThumbnailArgs, cancel: &CancellationToken) -> Result<()> {
	let generator = ctx.generator();

	if args.attach {
		let Some(record) = ctx.catalog.find_by_path(ctx.profile_id, &args.path).await else {
			bail!(
				"{} is not in the catalog of profile {}",
				args.path.display(),
				ctx.profile_id
			);
		};

		let result = generator
			.regenerate_all_thumbnails(
				&[regeneration_item(record)],
				|file_id, path| persist(ctx, file_id, path),
				&NoopReporter,
				cancel,
			)
			.await;
		ctx.save_catalog().await?;

		if let Some(e) = result.errors.first() {
			bail!("{e}");
		}

		let thumbnail = ctx
			.catalog
			.find_by_path(ctx.profile_id, &args.path)
			.await
			.and_then(|record| record.thumbnail);

		let output = Artifact {
			path: args.path,
			artifacts: thumbnail.into_iter().collect(),
		};
		print_output!(ctx, output, print_artifact);

		return Ok(());
	}

	let artifact = generator
		.generate_thumbnail(&args.path, args.resolution)
		.await?;

	let output = Artifact {
		path: args.path,
		artifacts: vec![artifact.display().to_string()],
	};
	print_output!(ctx, output, print_artifact);

	Ok(())
}

pub async fn frames(ctx: &Context, args: FramesArgs) -> Result<()> {
	let frames = ctx
		.generator()
		.generate_preview_frames(&args.path, args.count)
		.await?;

	let output = Artifact {
		path: args.path,
		artifacts: frames
			.split(mc_core::preview::PREVIEW_FRAMES_DELIMITER)
			.map(ToString::to_string)
			.collect(),
	};
	print_output!(ctx, output, print_artifact);

	Ok(())
}

pub async fn duration(ctx: &Context, args: MediaArgs) -> Result<()> {
	let duration = ctx.generator().get_video_duration(&args.path).await;

	print_output!(ctx, duration, |duration: &String| println!("{duration}"));

	Ok(())
}

pub async fn animated(ctx: &Context, args: MediaArgs) -> Result<()> {
	let animated = ctx.generator().check_is_animated(&args.path).await;

	print_output!(ctx, animated, |animated: &bool| {
		println!("{}", if *animated { "animated" } else { "still" });
	});

	Ok(())
}

pub async fn regenerate(ctx: &Context, cancel: &CancellationToken) -> Result<()> {
	let items = ctx
		.catalog
		.with_thumbnails(ctx.profile_id)
		.await
		.into_iter()
		.map(regeneration_item)
		.collect::<Vec<_>>();

	info!(items = items.len(), "Regenerating thumbnails;");

	let reporter = BarReporter::new(ctx.is_human());
	let result = ctx
		.generator()
		.regenerate_all_thumbnails(&items, |file_id, path| persist(ctx, file_id, path), &reporter, cancel)
		.await;
	reporter.finish();

	ctx.save_catalog().await?;

	print_output!(ctx, result, |result: &RegenerationResult| {
		println!(
			"Regenerated {} thumbnails, {} failed{}",
			result.success,
			result.failed,
			if result.canceled { " (canceled)" } else { "" }
		);
		for e in &result.errors {
			println!("  - {e}");
		}
	});

	Ok(())
}

fn regeneration_item(record: FileRecord) -> RegenerationItem {
	RegenerationItem {
		file_id: record.id,
		path: record.path,
		current_thumbnail: record.thumbnail.map(PathBuf::from),
	}
}

async fn persist(ctx: &Context, file_id: FileId, path: PathBuf) -> Result<(), mc_core::CatalogError> {
	ctx.catalog.update_artifact_path(file_id, &path).await
}

fn print_artifact(output: &Artifact) {
	for artifact in &output.artifacts {
		println!("{artifact}");
	}
}
