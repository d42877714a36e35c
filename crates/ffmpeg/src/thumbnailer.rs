use crate::{
	binaries::FfmpegBinaries,
	error::{Error, Result},
	frame::extract_frame,
	probe::probe_duration,
};

use std::{ops::Deref, path::Path, time::Duration};

use image::{imageops::FilterType, DynamicImage};
use tokio::task::spawn_blocking;
use tracing::debug;
use webp::Encoder;

/// Where in the video the frame is grabbed, as a fraction of its duration
const SEEK_PERCENTAGE: f32 = 0.1;

/// `Thumbnailer` struct holds data from a `ThumbnailerBuilder`, exposing methods
/// to generate thumbnails from video files.
#[derive(Debug, Clone)]
pub struct Thumbnailer {
	builder: ThumbnailerBuilder,
}

impl Thumbnailer {
	/// Processes an video input file and returns a webp encoded thumbnail as bytes
	pub async fn process_to_webp_bytes(
		&self,
		video_file_path: impl AsRef<Path> + Send,
	) -> Result<Vec<u8>> {
		let video_file_path = video_file_path.as_ref();
		let binaries = &self.builder.binaries;

		let seek = match probe_duration(binaries, video_file_path).await {
			Ok(Some(duration)) => duration.mul_f32(SEEK_PERCENTAGE),
			Ok(None) => Duration::ZERO,
			Err(e) => {
				debug!(?e, "Failed to probe duration, grabbing the first frame instead;");
				Duration::ZERO
			}
		};

		// Some containers lie about their duration, so fall back to the very first frame
		let frame = match extract_frame(binaries, video_file_path, seek).await {
			Err(Error::NoFrame(_)) if !seek.is_zero() => {
				extract_frame(binaries, video_file_path, Duration::ZERO).await?
			}
			res => res?,
		};

		let size = self.builder.size;
		let quality = self.builder.quality;

		spawn_blocking(move || encode_webp(&resize(&frame, size), quality)).await?
	}
}

/// Scales the longest side down to `max_side`, aspect ratio kept, never upscales
fn resize(img: &DynamicImage, max_side: u32) -> DynamicImage {
	if img.width().max(img.height()) > max_side {
		img.resize(max_side, max_side, FilterType::Triangle)
	} else {
		img.clone()
	}
}

/// Encodes any decoded image as a lossy webp
pub fn encode_webp(img: &DynamicImage, quality: f32) -> Result<Vec<u8>> {
	// The encoder only takes 8 bit RGB(A) buffers
	let rgba = DynamicImage::ImageRgba8(img.to_rgba8());

	let encoder =
		Encoder::from_image(&rgba).map_err(|reason| Error::WebPEncoding(reason.to_string()))?;

	// Type WebPMemory is !Send, which makes the Future in this function !Send,
	// this make us `deref` to have a `&[u8]` and then `to_owned` to make a Vec<u8>
	// which implies on a unwanted clone...
	Ok(encoder.encode(quality).deref().to_vec())
}

/// `ThumbnailerBuilder` struct holds data to build a `Thumbnailer` struct, exposing many methods
/// to configure how a thumbnail must be generated.
#[derive(Debug, Clone)]
pub struct ThumbnailerBuilder {
	binaries: FfmpegBinaries,
	size: u32,
	quality: f32,
}

impl Default for ThumbnailerBuilder {
	fn default() -> Self {
		Self {
			binaries: FfmpegBinaries::default(),
			size: 128,
			quality: 80.0,
		}
	}
}

impl ThumbnailerBuilder {
	/// Creates a new `ThumbnailerBuilder` with default values:
	/// - `binaries`: `ffmpeg` and `ffprobe` from `PATH`
	/// - `size`: 128 pixels
	/// - `quality`: 80
	#[must_use]
	pub fn new() -> Self {
		Self::default()
	}

	#[must_use]
	pub fn binaries(mut self, binaries: FfmpegBinaries) -> Self {
		self.binaries = binaries;
		self
	}

	/// Longest side of the thumbnail, aspect ratio is kept
	#[must_use]
	pub const fn size(mut self, size: u32) -> Self {
		self.size = size;
		self
	}

	/// Quality must be a value between 0.0 and 100.0
	pub fn quality(mut self, quality: f32) -> Result<Self> {
		if !(0.0..=100.0).contains(&quality) {
			return Err(Error::InvalidQuality(quality));
		}
		self.quality = quality;
		Ok(self)
	}

	/// Builds a `Thumbnailer` struct
	#[must_use]
	pub fn build(self) -> Thumbnailer {
		Thumbnailer { builder: self }
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	use image::{Rgb, RgbImage};

	#[test]
	fn builder_rejects_out_of_range_values() {
		assert!(matches!(
			ThumbnailerBuilder::new().quality(101.0),
			Err(Error::InvalidQuality(_))
		));
		assert!(matches!(
			ThumbnailerBuilder::new().quality(-0.5),
			Err(Error::InvalidQuality(_))
		));
		assert!(ThumbnailerBuilder::new().quality(60.0).is_ok());
	}

	#[test]
	fn resize_only_shrinks() {
		let img = DynamicImage::ImageRgb8(RgbImage::new(400, 200));
		let scaled = resize(&img, 100);
		assert_eq!((scaled.width(), scaled.height()), (100, 50));

		let untouched = resize(&img, 1000);
		assert_eq!((untouched.width(), untouched.height()), (400, 200));
	}

	#[test]
	fn encodes_webp_container() {
		let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(16, 16, Rgb([10, 200, 30])));
		let bytes = encode_webp(&img, 60.0).unwrap();
		assert_eq!(&bytes[..4], b"RIFF");
		assert_eq!(&bytes[8..12], b"WEBP");
	}

	#[tokio::test]
	async fn missing_ffmpeg_is_an_error_not_a_panic() {
		let thumbnailer = ThumbnailerBuilder::new()
			.binaries(FfmpegBinaries::new("/nonexistent/ffmpeg", "/nonexistent/ffprobe"))
			.build();

		let res = thumbnailer.process_to_webp_bytes("/tmp/clip.mp4").await;
		assert!(matches!(res, Err(Error::Spawn { .. })));
	}
}
