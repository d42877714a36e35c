use crate::{
	binaries::{run_to_stdout, FfmpegBinaries},
	error::{Error, Result},
};

use std::{ffi::OsStr, path::Path, time::Duration};

use tracing::instrument;

/// Reads the container duration with ffprobe.
///
/// Streams without a known (or with a zero) duration give `Ok(None)`.
#[instrument(skip_all, fields(path = %path.as_ref().display()))]
pub async fn probe_duration(
	binaries: &FfmpegBinaries,
	path: impl AsRef<Path> + Send,
) -> Result<Option<Duration>> {
	let stdout = run_to_stdout(
		&binaries.ffprobe_path,
		[
			OsStr::new("-v"),
			OsStr::new("error"),
			OsStr::new("-show_entries"),
			OsStr::new("format=duration"),
			OsStr::new("-of"),
			OsStr::new("default=noprint_wrappers=1:nokey=1"),
			path.as_ref().as_os_str(),
		],
	)
	.await?;

	parse_duration(&String::from_utf8_lossy(&stdout))
}

pub(crate) fn parse_duration(raw: &str) -> Result<Option<Duration>> {
	let raw = raw.trim();
	if raw.is_empty() || raw.eq_ignore_ascii_case("n/a") {
		return Ok(None);
	}

	let secs = raw
		.parse::<f64>()
		.map_err(|_| Error::InvalidDuration(raw.to_string()))?;

	if !secs.is_finite() || secs <= 0.0 {
		return Ok(None);
	}

	Ok(Some(Duration::from_secs_f64(secs)))
}

/// `MM:SS` below an hour, `H:MM:SS` above
#[must_use]
pub fn format_duration(duration: Duration) -> String {
	let total = duration.as_secs();
	let (hours, minutes, seconds) = (total / 3600, (total % 3600) / 60, total % 60);

	if hours > 0 {
		format!("{hours}:{minutes:02}:{seconds:02}")
	} else {
		format!("{minutes:02}:{seconds:02}")
	}
}
