use mc_ffmpeg::FfmpegBinaries;
use mc_file_ext::MediaKind;
use mc_utils::error::FileIOError;

use std::{
	io,
	path::{Path, PathBuf},
	time::Duration,
};

use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::{info, warn};

pub const CONFIG_FILE_NAME: &str = "mediacat.json";

/// Bytes; files at or above this size get a partial fingerprint during scans.
pub const DEFAULT_PARTIAL_HASH_THRESHOLD: u64 = 100 * 1024 * 1024;

/// Tunables for every pipeline component. Every field has a default so a partial file is enough.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
	/// Artifacts live under `<data_dir>/thumbnails/<profile_id>/`
	pub data_dir: PathBuf,
	pub thumbnail: ThumbnailConfig,
	pub preview_frames: PreviewFramesConfig,
	pub hashing: HashingConfig,
	pub scanner: ScannerConfig,
	pub regeneration: RegenerationConfig,
	pub ffmpeg: FfmpegBinaries,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThumbnailConfig {
	/// Longest side in pixels
	pub resolution: u32,
	pub quality: u8,
	pub timeout_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreviewFramesConfig {
	pub count: u32,
	pub resolution: u32,
	pub quality: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HashingConfig {
	/// `0` disables partial hashing entirely
	pub partial_threshold: u64,
	pub concurrency: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScannerConfig {
	/// Glob patterns matched against both the entry name and its full path
	pub ignore_patterns: Vec<String>,
	pub skip_hidden: bool,
	pub follow_symlinks: bool,
	pub accepted_kinds: Vec<MediaKind>,
	pub fingerprint: bool,
	pub generate_previews: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegenerationConfig {
	pub concurrency: usize,
}

impl Default for PipelineConfig {
	fn default() -> Self {
		Self {
			data_dir: PathBuf::from("."),
			thumbnail: ThumbnailConfig::default(),
			preview_frames: PreviewFramesConfig::default(),
			hashing: HashingConfig::default(),
			scanner: ScannerConfig::default(),
			regeneration: RegenerationConfig::default(),
			ffmpeg: FfmpegBinaries::default(),
		}
	}
}

impl Default for ThumbnailConfig {
	fn default() -> Self {
		Self {
			resolution: 512,
			quality: 60,
			timeout_secs: 300,
		}
	}
}

impl ThumbnailConfig {
	#[must_use]
	pub const fn timeout(&self) -> Duration {
		Duration::from_secs(self.timeout_secs)
	}
}

impl Default for PreviewFramesConfig {
	fn default() -> Self {
		Self {
			count: 6,
			resolution: 320,
			quality: 60,
		}
	}
}

impl Default for HashingConfig {
	fn default() -> Self {
		Self {
			partial_threshold: DEFAULT_PARTIAL_HASH_THRESHOLD,
			concurrency: 4,
		}
	}
}

impl Default for ScannerConfig {
	fn default() -> Self {
		Self {
			ignore_patterns: vec![],
			skip_hidden: true,
			follow_symlinks: false,
			accepted_kinds: vec![MediaKind::Image, MediaKind::Video, MediaKind::Audio],
			fingerprint: true,
			generate_previews: false,
		}
	}
}

impl Default for RegenerationConfig {
	fn default() -> Self {
		Self { concurrency: 2 }
	}
}

impl PipelineConfig {
	/// Loads the config file, writing the defaults to `path` when it doesn't exist yet.
	pub async fn load_from(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
		let path = path.as_ref();

		match fs::read(path).await {
			Ok(bytes) => {
				info!(path = %path.display(), "Loading pipeline config;");
				serde_json::from_slice(&bytes).map_err(|source| ConfigError::Invalid {
					path: path.into(),
					source,
				})
			}
			Err(e) if e.kind() == io::ErrorKind::NotFound => {
				warn!(path = %path.display(), "No pipeline config found, creating one with defaults;");
				let config = Self::default();
				config.save_to(path).await?;
				Ok(config)
			}
			Err(e) => Err(FileIOError::from((path, e, "Failed to read pipeline config")).into()),
		}
	}

	pub async fn save_to(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
		let path = path.as_ref();

		if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
			fs::create_dir_all(parent)
				.await
				.map_err(|e| FileIOError::from((parent, e, "Failed to create config directory")))?;
		}

		fs::write(path, serde_json::to_vec_pretty(self)?)
			.await
			.map_err(|e| FileIOError::from((path, e, "Failed to write pipeline config")))?;

		Ok(())
	}

	#[must_use]
	pub fn with_data_dir(mut self, data_dir: impl Into<PathBuf>) -> Self {
		self.data_dir = data_dir.into();
		self
	}
}

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
	#[error("invalid pipeline config <path='{}'>: {source}", .path.display())]
	Invalid {
		path: Box<Path>,
		source: serde_json::Error,
	},
	#[error(transparent)]
	SerdeJson(#[from] serde_json::Error),
	#[error(transparent)]
	FileIO(#[from] FileIOError),
}

#[cfg(test)]
mod tests {
	use super::*;

	use tempfile::tempdir;

	#[tokio::test]
	async fn missing_config_is_created_with_defaults() {
		let dir = tempdir().unwrap();
		let path = dir.path().join("nested").join(CONFIG_FILE_NAME);

		let config = PipelineConfig::load_from(&path).await.unwrap();

		assert_eq!(config, PipelineConfig::default());
		assert!(path.exists());
	}

	#[tokio::test]
	async fn partial_config_keeps_defaults_for_the_rest() {
		let dir = tempdir().unwrap();
		let path = dir.path().join(CONFIG_FILE_NAME);
		std::fs::write(&path, r#"{"thumbnail": {"resolution": 256}, "hashing": {"partial_threshold": 0}}"#)
			.unwrap();

		let config = PipelineConfig::load_from(&path).await.unwrap();

		assert_eq!(config.thumbnail.resolution, 256);
		assert_eq!(config.thumbnail.quality, 60);
		assert_eq!(config.hashing.partial_threshold, 0);
		assert_eq!(config.hashing.concurrency, 4);
		assert!(config.scanner.skip_hidden);
	}

	#[tokio::test]
	async fn broken_config_is_an_error() {
		let dir = tempdir().unwrap();
		let path = dir.path().join(CONFIG_FILE_NAME);
		std::fs::write(&path, "{ not json").unwrap();

		assert!(matches!(
			PipelineConfig::load_from(&path).await,
			Err(ConfigError::Invalid { .. })
		));
	}
}
