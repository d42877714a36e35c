use crate::store::{new_artifact_path, remove_artifact, write_artifact};

use super::{
	thumbnail::{encode_webp, fit_within},
	NonCriticalPreviewError, PreviewGenerator, PREVIEW_FRAMES_DELIMITER,
};

use mc_ffmpeg::{extract_frame, probe_duration, sample_timestamps};

use std::{
	path::{Path, PathBuf},
	time::Duration,
};

use tokio::{task::spawn_blocking, time::timeout};
use tracing::{instrument, trace, warn};

impl PreviewGenerator {
	/// Writes `frame_count` frames evenly spread over the media duration and returns their paths
	/// joined by [`PREVIEW_FRAMES_DELIMITER`], in timestamp order.
	///
	/// Either every frame is written or none is kept.
	#[instrument(skip_all, fields(path = %path.as_ref().display(), ?frame_count))]
	pub async fn generate_preview_frames(
		&self,
		path: impl AsRef<Path> + Send,
		frame_count: Option<u32>,
	) -> Result<String, NonCriticalPreviewError> {
		let path = path.as_ref();
		let count = frame_count.unwrap_or(self.frames.count);
		let limit = self.thumbnail.timeout();

		let duration = probe_duration(&self.binaries, path)
			.await
			.map_err(|e| NonCriticalPreviewError::FrameExtraction(path.to_path_buf(), e.to_string()))?
			.ok_or_else(|| NonCriticalPreviewError::UnknownDuration(path.to_path_buf()))?;

		let mut written = Vec::with_capacity(count as usize);

		let res = timeout(limit, async {
			for at in sample_timestamps(duration, count) {
				written.push(self.write_frame(path, at).await?);
			}
			Ok::<_, NonCriticalPreviewError>(())
		})
		.await
		.unwrap_or_else(|_| Err(NonCriticalPreviewError::TimedOut(path.to_path_buf(), limit)));

		if let Err(e) = res {
			for frame in &written {
				if let Err(e) = remove_artifact(frame).await {
					warn!(%e, "Failed to remove frame of an incomplete set;");
				}
			}
			return Err(e);
		}

		trace!(frames = written.len(), "Generated preview frames");

		Ok(written
			.iter()
			.map(|frame| frame.to_string_lossy())
			.collect::<Vec<_>>()
			.join(PREVIEW_FRAMES_DELIMITER))
	}

	async fn write_frame(&self, path: &Path, at: Duration) -> Result<PathBuf, NonCriticalPreviewError> {
		let frame = extract_frame(&self.binaries, path, at)
			.await
			.map_err(|e| NonCriticalPreviewError::FrameExtraction(path.to_path_buf(), e.to_string()))?;

		let resolution = self.frames.resolution;
		let quality = f32::from(self.frames.quality);
		let file_path = path.to_path_buf();

		let webp = spawn_blocking(move || {
			encode_webp(&file_path, &fit_within(frame, resolution), quality)
		})
		.await
		.map_err(|e| NonCriticalPreviewError::Panic(path.to_path_buf(), e.to_string()))??;

		let output_path = new_artifact_path(&self.artifacts_dir, None);
		write_artifact(&output_path, &webp)
			.await
			.map_err(|e| NonCriticalPreviewError::SaveArtifact(e.to_string()))?;

		Ok(output_path)
	}
}
