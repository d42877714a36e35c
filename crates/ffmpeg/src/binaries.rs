use crate::error::{Error, Result};

use std::{
	ffi::OsStr,
	path::{Path, PathBuf},
	process::Stdio,
};

use serde::{Deserialize, Serialize};
use tokio::process::Command;
use tracing::trace;

/// Where to find the `ffmpeg` and `ffprobe` executables
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FfmpegBinaries {
	pub ffmpeg_path: PathBuf,
	pub ffprobe_path: PathBuf,
}

impl Default for FfmpegBinaries {
	fn default() -> Self {
		Self {
			ffmpeg_path: PathBuf::from("ffmpeg"),
			ffprobe_path: PathBuf::from("ffprobe"),
		}
	}
}

impl FfmpegBinaries {
	#[must_use]
	pub fn new(ffmpeg_path: impl Into<PathBuf>, ffprobe_path: impl Into<PathBuf>) -> Self {
		Self {
			ffmpeg_path: ffmpeg_path.into(),
			ffprobe_path: ffprobe_path.into(),
		}
	}
}

/// Runs `binary` to completion and hands back its stdout, a non zero exit is an error
pub(crate) async fn run_to_stdout<'a>(
	binary: &Path,
	args: impl IntoIterator<Item = &'a OsStr>,
) -> Result<Vec<u8>> {
	trace!(binary = %binary.display(), "Spawning");

	let output = Command::new(binary)
		.args(args)
		.stdin(Stdio::null())
		.kill_on_drop(true)
		.output()
		.await
		.map_err(|source| Error::Spawn {
			binary: binary.to_path_buf(),
			source,
		})?;

	if !output.status.success() {
		return Err(Error::Failed {
			binary: binary.to_path_buf(),
			status: output.status,
			stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
		});
	}

	Ok(output.stdout)
}
