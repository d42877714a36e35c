use crate::{
	binaries::{run_to_stdout, FfmpegBinaries},
	error::{Error, Result},
};

use std::{ffi::OsStr, path::Path, time::Duration};

use image::{DynamicImage, ImageFormat};
use tokio::task::spawn_blocking;
use tracing::{instrument, trace};

/// Decodes the frame shown at `at` into memory.
///
/// Seeking happens before the input is opened so ffmpeg jumps to the nearest keyframe
/// instead of decoding everything up to `at`.
#[instrument(skip_all, fields(path = %path.as_ref().display(), ?at))]
pub async fn extract_frame(
	binaries: &FfmpegBinaries,
	path: impl AsRef<Path> + Send,
	at: Duration,
) -> Result<DynamicImage> {
	let path = path.as_ref();
	let seek = format!("{:.3}", at.as_secs_f64());

	let png = run_to_stdout(
		&binaries.ffmpeg_path,
		[
			OsStr::new("-v"),
			OsStr::new("error"),
			OsStr::new("-nostdin"),
			OsStr::new("-ss"),
			OsStr::new(&seek),
			OsStr::new("-i"),
			path.as_os_str(),
			OsStr::new("-frames:v"),
			OsStr::new("1"),
			OsStr::new("-f"),
			OsStr::new("image2pipe"),
			OsStr::new("-vcodec"),
			OsStr::new("png"),
			OsStr::new("-"),
		],
	)
	.await?;

	if png.is_empty() {
		return Err(Error::NoFrame(path.to_path_buf()));
	}

	trace!(bytes = png.len(), "Grabbed frame");

	spawn_blocking(move || image::load_from_memory_with_format(&png, ImageFormat::Png))
		.await?
		.map_err(Into::into)
}

/// `count` timestamps evenly spread over `duration`, never touching its very start or end
#[must_use]
pub fn sample_timestamps(duration: Duration, count: u32) -> Vec<Duration> {
	(1..=count)
		.map(|i| duration * i / (count + 1))
		.collect()
}
