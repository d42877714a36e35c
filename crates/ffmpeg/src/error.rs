use std::{path::PathBuf, process::ExitStatus};

use thiserror::Error;
use tokio::task::JoinError;

pub type Result<T> = std::result::Result<T, Error>;

/// Error type for the library.
#[derive(Error, Debug)]
pub enum Error {
	#[error("I/O Error: {0}")]
	Io(#[from] std::io::Error),
	#[error("failed to spawn <binary='{}'>: {source}", .binary.display())]
	Spawn {
		binary: PathBuf,
		#[source]
		source: std::io::Error,
	},
	#[error("<binary='{}'> exited with {status}: {stderr}", .binary.display())]
	Failed {
		binary: PathBuf,
		status: ExitStatus,
		stderr: String,
	},
	#[error("ffprobe reported an unparsable duration: '{0}'")]
	InvalidDuration(String),
	#[error("no video frame could be decoded <path='{}'>", .0.display())]
	NoFrame(PathBuf),
	#[error("failed to load decoded frame: {0}")]
	Image(#[from] image::ImageError),
	#[error("failed to encode webp: {0}")]
	WebPEncoding(String),
	#[error("Received an invalid quality, expected range [0.0, 100.0], received: {0}")]
	InvalidQuality(f32),
	#[error("Background task failed: {0}")]
	BackgroundTaskFailed(#[from] JoinError),
}
