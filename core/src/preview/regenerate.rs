use crate::{
	catalog::{CatalogError, FileId},
	progress::{ProgressReporter, ProgressUpdate},
	store::remove_artifact,
};

use super::{NonCriticalPreviewError, PreviewGenerator};

use std::{future::Future, path::PathBuf};

use futures::{future, stream, StreamExt};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, warn};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegenerationItem {
	pub file_id: FileId,
	pub path: PathBuf,
	/// Artifact the catalog points at right now, removed once the new one is persisted
	pub current_thumbnail: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegenerationResult {
	pub success: usize,
	pub failed: usize,
	pub errors: Vec<NonCriticalPreviewError>,
	pub canceled: bool,
}

impl PreviewGenerator {
	/// Rebuilds the thumbnail of every item.
	///
	/// For each item the new artifact is written first, then `persist` repoints the catalog,
	/// and only after that succeeds is the previous artifact deleted. A failing item never stops
	/// the batch; progress is reported after every item whatever its outcome.
	#[instrument(skip_all, fields(total = items.len()))]
	pub async fn regenerate_all_thumbnails<F, Fut>(
		&self,
		items: &[RegenerationItem],
		persist: F,
		reporter: &dyn ProgressReporter,
		cancel: &CancellationToken,
	) -> RegenerationResult
	where
		F: Fn(FileId, PathBuf) -> Fut + Sync,
		Fut: Future<Output = Result<(), CatalogError>> + Send,
	{
		let total = items.len();
		let persist = &persist;

		let mut regenerated = stream::iter(items)
			.take_while(|_| future::ready(!cancel.is_cancelled()))
			.map(|item| async move { (item, self.regenerate_one(item, persist).await) })
			.buffer_unordered(self.regeneration.concurrency.max(1));

		let mut result = RegenerationResult::default();
		let mut current = 0;

		while let Some((item, res)) = regenerated.next().await {
			current += 1;

			match res {
				Ok(()) => result.success += 1,
				Err(e) => {
					warn!(file_id = %item.file_id, %e, "Failed to regenerate thumbnail;");
					result.failed += 1;
					result.errors.push(e);
				}
			}

			reporter.progress(ProgressUpdate::Item {
				current,
				total,
				path: Some(item.path.clone()),
			});
		}

		result.canceled = current < total;

		result
	}

	async fn regenerate_one<F, Fut>(
		&self,
		item: &RegenerationItem,
		persist: &F,
	) -> Result<(), NonCriticalPreviewError>
	where
		F: Fn(FileId, PathBuf) -> Fut + Sync,
		Fut: Future<Output = Result<(), CatalogError>> + Send,
	{
		let new_path = self.generate_thumbnail(&item.path, None).await?;

		if let Err(e) = persist(item.file_id, new_path.clone()).await {
			// The catalog still points at the old artifact, so the new one would be an orphan
			if let Err(e) = remove_artifact(&new_path).await {
				warn!(%e, "Failed to remove unpersisted artifact;");
			}

			return Err(NonCriticalPreviewError::Persist {
				file_id: item.file_id,
				reason: e.to_string(),
			});
		}

		if let Some(old_path) = item.current_thumbnail.as_ref().filter(|old| **old != new_path) {
			// Left behind files are orphans that diagnostics can reclaim later
			if let Err(e) = remove_artifact(old_path).await {
				warn!(%e, "Failed to remove replaced artifact;");
			} else {
				debug!(old_path = %old_path.display(), "Removed replaced artifact");
			}
		}

		Ok(())
	}
}
