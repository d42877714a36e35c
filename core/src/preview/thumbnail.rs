use crate::{
	classify::classify,
	store::{new_artifact_path, write_artifact},
};

use super::{NonCriticalPreviewError, PreviewGenerator};

use mc_ffmpeg::ThumbnailerBuilder;
use mc_file_ext::{Extension, ImageExtension};
use mc_images::{format_image_as, scale_dimensions};

use std::{
	panic,
	path::{Path, PathBuf},
};

use image::{imageops::FilterType, DynamicImage, GenericImageView};
use tokio::{sync::oneshot, task::spawn_blocking, time::timeout};
use tracing::{error, instrument, trace};

impl PreviewGenerator {
	/// Decodes the source (a still image or a video frame), scales its longest side down to
	/// `resolution` and writes it as a fresh webp artifact, returning the artifact path.
	#[instrument(skip_all, fields(path = %path.as_ref().display(), ?resolution))]
	pub async fn generate_thumbnail(
		&self,
		path: impl AsRef<Path> + Send,
		resolution: Option<u32>,
	) -> Result<PathBuf, NonCriticalPreviewError> {
		let path = path.as_ref();
		let resolution = resolution.unwrap_or(self.thumbnail.resolution);
		let limit = self.thumbnail.timeout();

		let ext = classify(path)
			.await
			.map_err(|e| NonCriticalPreviewError::ReadMedia(e.to_string()))?
			.ok_or_else(|| NonCriticalPreviewError::Unsupported(path.to_path_buf()))?;

		let generation = async {
			match ext {
				Extension::Image(image_ext) => {
					self.image_thumbnail(path, image_ext, resolution).await
				}
				Extension::Video(_) => self.video_thumbnail(path, resolution).await,
				Extension::Audio(_) => Err(NonCriticalPreviewError::Unsupported(path.to_path_buf())),
			}
		};

		let webp = timeout(limit, generation)
			.await
			.map_err(|_| NonCriticalPreviewError::TimedOut(path.to_path_buf(), limit))??;

		trace!("Generated thumbnail bytes");

		let output_path = new_artifact_path(&self.artifacts_dir, None);
		write_artifact(&output_path, &webp)
			.await
			.map_err(|e| NonCriticalPreviewError::SaveArtifact(e.to_string()))?;

		Ok(output_path)
	}

	async fn image_thumbnail(
		&self,
		path: &Path,
		ext: ImageExtension,
		resolution: u32,
	) -> Result<Vec<u8>, NonCriticalPreviewError> {
		let file_path = path.to_path_buf();
		let quality = f32::from(self.thumbnail.quality);

		let (tx, rx) = oneshot::channel();

		// Third party decoders may panic on hostile input, keep that inside the blocking task
		let handle = spawn_blocking({
			let file_path = file_path.clone();

			move || {
				let _ = tx.send(
					panic::catch_unwind(|| {
						inner_image_thumbnail(&file_path, ext, resolution, quality)
					})
					.unwrap_or_else(move |_| {
						Err(NonCriticalPreviewError::Panic(
							file_path,
							"Internal panic on third party crate".to_string(),
						))
					}),
				);
			}
		});

		if let Ok(res) = rx.await {
			res
		} else {
			error!("Image thumbnail task died before reporting back");
			let reason = match handle.await {
				Err(e) => e.to_string(),
				Ok(()) => "task finished without a result".to_string(),
			};
			Err(NonCriticalPreviewError::Panic(file_path, reason))
		}
	}

	async fn video_thumbnail(
		&self,
		path: &Path,
		resolution: u32,
	) -> Result<Vec<u8>, NonCriticalPreviewError> {
		let to_error =
			|e: mc_ffmpeg::Error| NonCriticalPreviewError::VideoThumbnail(path.to_path_buf(), e.to_string());

		ThumbnailerBuilder::new()
			.binaries(self.binaries.clone())
			.size(resolution)
			.quality(f32::from(self.thumbnail.quality))
			.map_err(to_error)?
			.build()
			.process_to_webp_bytes(path)
			.await
			.map_err(to_error)
	}
}

fn inner_image_thumbnail(
	file_path: &Path,
	ext: ImageExtension,
	resolution: u32,
	quality: f32,
) -> Result<Vec<u8>, NonCriticalPreviewError> {
	let img = format_image_as(file_path, ext.to_string()).map_err(|e| {
		NonCriticalPreviewError::FormatImage(file_path.to_path_buf(), e.to_string())
	})?;

	encode_webp(file_path, &fit_within(img, resolution), quality)
}

/// Shrinks `img` so its longest side is at most `resolution`, never upscales
pub(super) fn fit_within(img: DynamicImage, resolution: u32) -> DynamicImage {
	let (w, h) = img.dimensions();
	let (w_scaled, h_scaled) = scale_dimensions(w, h, resolution);

	if (w, h) == (w_scaled, h_scaled) {
		img
	} else {
		img.resize_exact(w_scaled, h_scaled, FilterType::Triangle)
	}
}

pub(super) fn encode_webp(
	file_path: &Path,
	img: &DynamicImage,
	quality: f32,
) -> Result<Vec<u8>, NonCriticalPreviewError> {
	mc_ffmpeg::encode_webp(img, quality).map_err(|e| {
		NonCriticalPreviewError::WebPEncoding(file_path.to_path_buf(), e.to_string())
	})
}

#[cfg(test)]
mod tests {
	use super::*;

	use crate::config::PipelineConfig;

	use image::{ImageFormat, Rgb, RgbImage};
	use tempfile::tempdir;

	#[tokio::test]
	async fn image_thumbnails_are_scaled_webp_artifacts() {
		let dir = tempdir().unwrap();
		let source = dir.path().join("wide.png");
		RgbImage::from_pixel(800, 400, Rgb([10, 200, 30]))
			.save_with_format(&source, ImageFormat::Png)
			.unwrap();

		let generator = PreviewGenerator::new(dir.path().join("artifacts"), &PipelineConfig::default());
		let artifact = generator.generate_thumbnail(&source, Some(100)).await.unwrap();

		assert!(artifact.starts_with(dir.path().join("artifacts")));
		let thumb = image::open(&artifact).unwrap();
		assert_eq!(thumb.dimensions(), (100, 50));
	}

	#[tokio::test]
	async fn corrupt_and_unknown_files_are_non_critical() {
		let dir = tempdir().unwrap();
		let generator = PreviewGenerator::new(dir.path().join("artifacts"), &PipelineConfig::default());

		let corrupt = dir.path().join("corrupt.jpg");
		std::fs::write(&corrupt, b"garbage").unwrap();
		let song = dir.path().join("song.mp3");
		std::fs::write(&song, b"ID3").unwrap();
		let notes = dir.path().join("notes");
		std::fs::write(&notes, b"plain text").unwrap();

		assert!(matches!(
			generator.generate_thumbnail(&corrupt, None).await,
			Err(NonCriticalPreviewError::FormatImage(..))
		));
		assert!(matches!(
			generator.generate_thumbnail(&song, None).await,
			Err(NonCriticalPreviewError::Unsupported(_))
		));
		assert!(matches!(
			generator.generate_thumbnail(&notes, None).await,
			Err(NonCriticalPreviewError::Unsupported(_))
		));
		assert!(matches!(
			generator.generate_thumbnail(dir.path().join("gone.png"), None).await,
			Err(NonCriticalPreviewError::FormatImage(..))
		));

		// Nothing was left behind
		assert!(!dir.path().join("artifacts").exists());
	}

	#[test]
	fn small_images_are_not_upscaled() {
		let img = DynamicImage::ImageRgb8(RgbImage::new(10, 20));
		assert_eq!(fit_within(img, 512).dimensions(), (10, 20));
	}
}
