//! Finds and reclaims orphaned artifacts.
//!
//! An orphan is an artifact file present under a profile's artifact directory that no catalog
//! record references, neither as its thumbnail nor among its preview frames. Nothing else about
//! the catalog is interpreted.

use crate::{
	catalog::{ArtifactReferences, Catalog, CatalogError, ProfileId},
	preview::PREVIEW_FRAMES_DELIMITER,
	store::{normalize_path, ArtifactStore, WEBP_EXTENSION},
};

use mc_utils::{chain_optional_iter, error::FileIOError};

use std::{
	collections::HashSet,
	io,
	path::{Path, PathBuf},
	sync::Arc,
};

use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::{debug, info, instrument, warn};

/// Orphans listed in [`DiagnosticResult::sample`]
pub const DIAGNOSTIC_SAMPLE_SIZE: usize = 10;

#[derive(thiserror::Error, Debug)]
pub enum DiagnosticsError {
	#[error("failed to list artifact references: {0}")]
	Catalog(#[from] CatalogError),
	#[error(transparent)]
	FileIO(#[from] FileIOError),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrphanedThumbnail {
	pub path: PathBuf,
	pub size: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagnosticResult {
	pub profile_id: ProfileId,
	pub total_artifacts: usize,
	pub total_bytes: u64,
	/// Distinct paths referenced by the catalog
	pub referenced: usize,
	/// References whose file is gone from disk
	pub missing: usize,
	pub orphaned_count: usize,
	pub orphaned_bytes: u64,
	/// Sorted by path
	pub orphans: Vec<OrphanedThumbnail>,
	pub sample: Vec<OrphanedThumbnail>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleanupResult {
	pub deleted_count: usize,
	pub freed_bytes: u64,
	pub errors: Vec<String>,
}

pub struct ThumbnailDiagnostics {
	store: ArtifactStore,
	catalog: Arc<dyn Catalog>,
}

impl ThumbnailDiagnostics {
	pub fn new(store: ArtifactStore, catalog: Arc<dyn Catalog>) -> Self {
		Self { store, catalog }
	}

	#[instrument(skip(self))]
	pub async fn diagnose(&self, profile_id: ProfileId) -> Result<DiagnosticResult, DiagnosticsError> {
		let profile_dir = self.store.profile_dir(profile_id);

		let references = self.catalog.list_artifact_references(profile_id).await?;
		let referenced = referenced_keys(&profile_dir, &references);

		let artifacts = list_artifacts(&profile_dir).await?;

		let on_disk = artifacts
			.iter()
			.filter_map(|artifact| artifact.path.strip_prefix(&profile_dir).ok())
			.collect::<HashSet<_>>();

		let missing = referenced
			.iter()
			.filter(|key| !on_disk.contains(key.as_path()))
			.count();

		let total_artifacts = artifacts.len();
		let total_bytes = artifacts.iter().map(|artifact| artifact.size).sum();

		let mut orphans = artifacts
			.into_iter()
			.filter(|artifact| {
				artifact
					.path
					.strip_prefix(&profile_dir)
					.is_ok_and(|key| !referenced.contains(key))
			})
			.collect::<Vec<_>>();
		orphans.sort_by(|a, b| a.path.cmp(&b.path));

		let orphaned_bytes = orphans.iter().map(|orphan| orphan.size).sum();

		debug!(
			total_artifacts,
			orphaned = orphans.len(),
			missing,
			"Diagnosed artifacts"
		);

		Ok(DiagnosticResult {
			profile_id,
			total_artifacts,
			total_bytes,
			referenced: referenced.len(),
			missing,
			orphaned_count: orphans.len(),
			orphaned_bytes,
			sample: orphans.iter().take(DIAGNOSTIC_SAMPLE_SIZE).cloned().collect(),
			orphans,
		})
	}

	/// Deletes every orphan found by a fresh [`diagnose`](Self::diagnose), one failure doesn't
	/// stop the others.
	#[instrument(skip(self))]
	pub async fn cleanup(&self, profile_id: ProfileId) -> Result<CleanupResult, DiagnosticsError> {
		let DiagnosticResult { orphans, .. } = self.diagnose(profile_id).await?;

		let mut result = CleanupResult::default();

		for OrphanedThumbnail { path, size } in orphans {
			match fs::remove_file(&path).await {
				Ok(()) => {
					debug!(path = %path.display(), "Removed orphaned artifact");
					result.deleted_count += 1;
					result.freed_bytes += size;
				}
				// Someone else got to it first
				Err(e) if e.kind() == io::ErrorKind::NotFound => {}
				Err(e) => {
					let e = FileIOError::from((&path, e, "Failed to remove orphaned artifact"));
					warn!(%e, "Skipping orphan;");
					result.errors.push(e.to_string());
				}
			}
		}

		info!(
			deleted = result.deleted_count,
			freed_bytes = result.freed_bytes,
			errors = result.errors.len(),
			"Cleaned up orphaned artifacts;"
		);

		Ok(result)
	}
}

/// Reference keys are paths relative to the profile directory, whatever form the catalog
/// stored them in: absolute, relative to the current directory, or bare keys. Paths resolving
/// outside of the profile directory aren't ours to judge.
fn referenced_keys(profile_dir: &Path, references: &[ArtifactReferences]) -> HashSet<PathBuf> {
	let normalized_dir = normalize_path(profile_dir);

	references
		.iter()
		.flat_map(|ArtifactReferences { thumbnail, preview_frames }| {
			chain_optional_iter(
				preview_frames
					.as_deref()
					.into_iter()
					.flat_map(|frames| frames.split(PREVIEW_FRAMES_DELIMITER)),
				[thumbnail.as_deref()],
			)
		})
		.map(str::trim)
		.filter(|reference| !reference.is_empty())
		.filter_map(|reference| reference_key(profile_dir, &normalized_dir, Path::new(reference)))
		.collect()
}

fn reference_key(profile_dir: &Path, normalized_dir: &Path, reference: &Path) -> Option<PathBuf> {
	if let Ok(key) = reference.strip_prefix(profile_dir) {
		return Some(key.to_path_buf());
	}

	if let Ok(key) = normalize_path(reference).strip_prefix(normalized_dir) {
		return Some(key.to_path_buf());
	}

	// Bare `<shard>/<name>.webp` keys
	(reference.is_relative() && reference.components().count() <= 2)
		.then(|| reference.to_path_buf())
}

/// Webp files in the profile directory and its shard directories.
/// A missing profile directory just means there are no artifacts yet.
async fn list_artifacts(profile_dir: &Path) -> Result<Vec<OrphanedThumbnail>, FileIOError> {
	let mut artifacts = vec![];

	let mut read_profile_dir = match fs::read_dir(profile_dir).await {
		Ok(read_dir) => read_dir,
		Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(artifacts),
		Err(e) => return Err(FileIOError::from((profile_dir, e, "Failed to list artifacts"))),
	};

	let mut shard_dirs = vec![];

	while let Some(entry) = read_profile_dir
		.next_entry()
		.await
		.map_err(|e| FileIOError::from((profile_dir, e, "Failed to list artifacts")))?
	{
		let path = entry.path();
		match entry.metadata().await {
			Ok(metadata) if metadata.is_dir() => shard_dirs.push(path),
			Ok(metadata) if is_artifact(&path) && metadata.is_file() => {
				artifacts.push(OrphanedThumbnail {
					path,
					size: metadata.len(),
				});
			}
			Ok(_) => {}
			Err(e) => warn!(path = %path.display(), %e, "Failed to read artifact metadata;"),
		}
	}

	for shard_dir in shard_dirs {
		if let Err(e) = list_shard(&shard_dir, &mut artifacts).await {
			warn!(%e, "Skipping unreadable shard directory;");
		}
	}

	Ok(artifacts)
}

async fn list_shard(
	shard_dir: &Path,
	artifacts: &mut Vec<OrphanedThumbnail>,
) -> Result<(), FileIOError> {
	let mut read_shard_dir = fs::read_dir(shard_dir)
		.await
		.map_err(|e| FileIOError::from((shard_dir, e)))?;

	while let Some(entry) = read_shard_dir
		.next_entry()
		.await
		.map_err(|e| FileIOError::from((shard_dir, e)))?
	{
		let path = entry.path();
		if !is_artifact(&path) {
			continue;
		}

		match entry.metadata().await {
			Ok(metadata) if metadata.is_file() => artifacts.push(OrphanedThumbnail {
				path,
				size: metadata.len(),
			}),
			Ok(_) => {}
			Err(e) => warn!(path = %path.display(), %e, "Failed to read artifact metadata;"),
		}
	}

	Ok(())
}

fn is_artifact(path: &Path) -> bool {
	path.extension() == Some(WEBP_EXTENSION.as_ref())
}
