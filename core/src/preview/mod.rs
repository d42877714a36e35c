//! Thumbnails, scrub frames, durations and animation checks for media files.
//!
//! Every generator writes fresh artifacts under the resolved artifact directory it was built
//! with and reports failures as [`NonCriticalPreviewError`]s; nothing here is fatal.

use crate::{
	catalog::FileId,
	config::{PipelineConfig, PreviewFramesConfig, RegenerationConfig, ThumbnailConfig},
	store::normalize_path,
};

use mc_ffmpeg::{format_duration, probe_duration, FfmpegBinaries};

use std::{
	path::{Path, PathBuf},
	time::Duration,
};

use serde::{Deserialize, Serialize};
use tokio::task::spawn_blocking;
use tracing::{debug, instrument, warn};

mod frames;
mod regenerate;
mod thumbnail;

pub use regenerate::{RegenerationItem, RegenerationResult};

/// Reported for media whose duration can't be determined
pub const UNKNOWN_DURATION: &str = "00:00";

/// Separates frame paths in a preview frames reference
pub const PREVIEW_FRAMES_DELIMITER: &str = ",";

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum NonCriticalPreviewError {
	#[error("failed to read media file: {0}")]
	ReadMedia(String),
	#[error("no preview can be generated for this file: <path='{}'>", .0.display())]
	Unsupported(PathBuf),
	#[error("failed to decode image <path='{}'>: {1}", .0.display())]
	FormatImage(PathBuf, String),
	#[error("failed to generate video thumbnail <path='{}'>: {1}", .0.display())]
	VideoThumbnail(PathBuf, String),
	#[error("failed to extract video frame <path='{}'>: {1}", .0.display())]
	FrameExtraction(PathBuf, String),
	#[error("media has no usable duration: <path='{}'>", .0.display())]
	UnknownDuration(PathBuf),
	#[error("failed to encode webp <path='{}'>: {1}", .0.display())]
	WebPEncoding(PathBuf, String),
	#[error("decoder panicked <path='{}'>: {1}", .0.display())]
	Panic(PathBuf, String),
	#[error("preview generation timed out <path='{}', timeout='{1:?}'>", .0.display())]
	TimedOut(PathBuf, Duration),
	#[error("failed to save artifact: {0}")]
	SaveArtifact(String),
	#[error("failed to repoint catalog record <file_id='{file_id}'>: {reason}")]
	Persist { file_id: FileId, reason: String },
}

/// Generates preview artifacts into one profile's artifact directory
#[derive(Debug, Clone)]
pub struct PreviewGenerator {
	artifacts_dir: PathBuf,
	thumbnail: ThumbnailConfig,
	frames: PreviewFramesConfig,
	regeneration: RegenerationConfig,
	binaries: FfmpegBinaries,
}

impl PreviewGenerator {
	pub fn new(artifacts_dir: impl Into<PathBuf>, config: &PipelineConfig) -> Self {
		Self {
			artifacts_dir: normalize_path(artifacts_dir.into()),
			thumbnail: config.thumbnail.clone(),
			frames: config.preview_frames.clone(),
			regeneration: config.regeneration.clone(),
			binaries: config.ffmpeg.clone(),
		}
	}

	#[must_use]
	pub fn artifacts_dir(&self) -> &Path {
		&self.artifacts_dir
	}

	/// Human readable container duration, [`UNKNOWN_DURATION`] when there is none
	#[instrument(skip_all, fields(path = %path.as_ref().display()))]
	pub async fn get_video_duration(&self, path: impl AsRef<Path> + Send) -> String {
		match probe_duration(&self.binaries, path).await {
			Ok(Some(duration)) => format_duration(duration),
			Ok(None) => UNKNOWN_DURATION.to_string(),
			Err(e) => {
				warn!(%e, "Failed to probe media duration;");
				UNKNOWN_DURATION.to_string()
			}
		}
	}

	/// Whether the image holds more than one frame, judged by its content only
	#[instrument(skip_all, fields(path = %path.as_ref().display()))]
	pub async fn check_is_animated(&self, path: impl AsRef<Path> + Send) -> bool {
		let path = path.as_ref().to_path_buf();

		match spawn_blocking(move || mc_images::is_animated(path)).await {
			Ok(Ok(animated)) => animated,
			Ok(Err(e)) => {
				debug!(%e, "Couldn't count frames, treating as static;");
				false
			}
			Err(e) => {
				warn!(%e, "Frame counting task failed;");
				false
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	use image::{
		codecs::gif::GifEncoder, Delay, Frame, ImageFormat, Rgba, RgbaImage,
	};
	use tempfile::tempdir;

	fn generator(dir: &Path) -> PreviewGenerator {
		let mut config = PipelineConfig::default();
		config.ffmpeg = FfmpegBinaries::new(
			dir.join("no-such-ffmpeg"),
			dir.join("no-such-ffprobe"),
		);
		PreviewGenerator::new(dir.join("artifacts"), &config)
	}

	#[tokio::test]
	async fn duration_falls_back_to_sentinel() {
		let dir = tempdir().unwrap();
		let video = dir.path().join("clip.mp4");
		std::fs::write(&video, b"not really a video").unwrap();

		assert_eq!(
			generator(dir.path()).get_video_duration(&video).await,
			UNKNOWN_DURATION
		);
	}

	#[tokio::test]
	async fn animation_is_detected_from_content() {
		let dir = tempdir().unwrap();
		let generator = generator(dir.path());

		let still = dir.path().join("still.gif");
		RgbaImage::from_pixel(4, 4, Rgba([1, 2, 3, 255]))
			.save_with_format(&still, ImageFormat::Gif)
			.unwrap();

		// Named like a still image on purpose
		let animated = dir.path().join("animated.png");
		{
			let mut encoder = GifEncoder::new(std::fs::File::create(&animated).unwrap());
			for shade in [0, 128] {
				encoder
					.encode_frame(Frame::from_parts(
						RgbaImage::from_pixel(4, 4, Rgba([shade, 0, 0, 255])),
						0,
						0,
						Delay::from_numer_denom_ms(100, 1),
					))
					.unwrap();
			}
		}

		assert!(!generator.check_is_animated(&still).await);
		assert!(generator.check_is_animated(&animated).await);
		assert!(!generator.check_is_animated(dir.path().join("missing.gif")).await);
	}
}
