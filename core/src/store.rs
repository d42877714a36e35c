//! On-disk layout of generated artifacts.
//!
//! `<data_dir>/thumbnails/<profile_id>/<shard>/<name>.webp`, where `<name>` is a fresh uuid for
//! every artifact and `<shard>` its first three hex characters. Fresh names mean a regenerated
//! artifact never overwrites the one the catalog still points at.

use crate::catalog::ProfileId;

use mc_utils::error::FileIOError;

use std::path::{self, Component, Path, PathBuf};

use tokio::{
	fs::{self, File},
	io::AsyncWriteExt,
};
use tracing::trace;
use uuid::Uuid;

pub const THUMBNAIL_CACHE_DIR_NAME: &str = "thumbnails";
pub const WEBP_EXTENSION: &str = "webp";
const TEMP_EXTENSION: &str = "tmp";

#[must_use]
pub fn get_shard_hex(name: &str) -> &str {
	name.get(..3).unwrap_or(name)
}

/// Resolves artifact directories for profiles
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactStore {
	thumbnails_dir: PathBuf,
}

/// Absolute form of `path` with `.` and `..` resolved lexically. Symlinks are left alone.
#[must_use]
pub fn normalize_path(path: impl AsRef<Path>) -> PathBuf {
	let path = path.as_ref();
	let absolute = path::absolute(path).unwrap_or_else(|_| path.to_path_buf());

	let mut normalized = PathBuf::new();
	for component in absolute.components() {
		match component {
			Component::CurDir => {}
			Component::ParentDir => {
				normalized.pop();
			}
			other => normalized.push(other),
		}
	}

	normalized
}

impl ArtifactStore {
	/// Relative data directories are resolved against the current directory right away, so
	/// artifact paths handed to a catalog are always absolute.
	pub fn new(data_dir: impl AsRef<Path>) -> Self {
		Self {
			thumbnails_dir: normalize_path(data_dir).join(THUMBNAIL_CACHE_DIR_NAME),
		}
	}

	#[must_use]
	pub fn thumbnails_dir(&self) -> &Path {
		&self.thumbnails_dir
	}

	#[must_use]
	pub fn profile_dir(&self, profile_id: ProfileId) -> PathBuf {
		self.thumbnails_dir.join(profile_id.to_string())
	}
}

/// A not yet used artifact name, `suffix` is appended after the uuid (frame indexes)
pub(crate) fn new_artifact_path(artifacts_dir: &Path, suffix: Option<&str>) -> PathBuf {
	let name = Uuid::new_v4().simple().to_string();

	let mut path = artifacts_dir.join(get_shard_hex(&name));
	match suffix {
		Some(suffix) => path.push(format!("{name}-{suffix}")),
		None => path.push(&name),
	}
	path.set_extension(WEBP_EXTENSION);

	path
}

/// Writes `bytes` next to `path` and renames it into place, so a reader never sees half an artifact
pub(crate) async fn write_artifact(path: &Path, bytes: &[u8]) -> Result<(), FileIOError> {
	if let Some(shard_dir) = path.parent() {
		fs::create_dir_all(shard_dir)
			.await
			.map_err(|e| FileIOError::from((shard_dir, e, "Failed to create shard directory")))?;
	}

	let temp_path = path.with_extension(TEMP_EXTENSION);

	let write = async {
		let mut file = File::create(&temp_path).await?;
		file.write_all(bytes).await?;
		file.sync_all().await
	};

	if let Err(e) = write.await {
		let _ = fs::remove_file(&temp_path).await;
		return Err(FileIOError::from((&temp_path, e, "Failed to write artifact")));
	}

	fs::rename(&temp_path, path).await.map_err(|e| {
		FileIOError::from((path, e, "Failed to move artifact into place"))
	})?;

	trace!(path = %path.display(), "Wrote artifact to disk");

	Ok(())
}

/// Missing files count as removed
pub(crate) async fn remove_artifact(path: &Path) -> Result<(), FileIOError> {
	match fs::remove_file(path).await {
		Ok(()) => Ok(()),
		Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
		Err(e) => Err(FileIOError::from((path, e, "Failed to remove artifact"))),
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	use tempfile::tempdir;

	#[test]
	fn artifacts_are_sharded_by_name() {
		let path = new_artifact_path(Path::new("/data/thumbnails/p"), None);

		let name = path.file_stem().unwrap().to_str().unwrap();
		let shard = path.parent().unwrap().file_name().unwrap().to_str().unwrap();

		assert_eq!(shard, &name[..3]);
		assert_eq!(path.extension().unwrap(), WEBP_EXTENSION);
		assert_ne!(path, new_artifact_path(Path::new("/data/thumbnails/p"), None));
	}

	#[test]
	fn profile_dirs_live_under_thumbnails() {
		let store = ArtifactStore::new("/data");
		let profile = Uuid::new_v4();

		assert_eq!(
			store.profile_dir(profile),
			Path::new("/data/thumbnails").join(profile.to_string())
		);
		assert_eq!(get_shard_hex("ab"), "ab");
	}

	#[test]
	fn relative_data_dirs_are_made_absolute() {
		let cwd = std::env::current_dir().unwrap();
		let store = ArtifactStore::new("./data/../media-data");

		assert!(store.thumbnails_dir().is_absolute());
		assert_eq!(
			store.thumbnails_dir(),
			cwd.join("media-data").join(THUMBNAIL_CACHE_DIR_NAME)
		);
		assert_eq!(normalize_path("/a/./b/../c"), Path::new("/a/c"));
	}

	#[tokio::test]
	async fn written_artifacts_leave_no_temp_files() {
		let dir = tempdir().unwrap();
		let path = new_artifact_path(dir.path(), Some("0"));

		write_artifact(&path, b"RIFF").await.unwrap();

		assert_eq!(std::fs::read(&path).unwrap(), b"RIFF");
		let siblings = std::fs::read_dir(path.parent().unwrap()).unwrap().count();
		assert_eq!(siblings, 1);

		remove_artifact(&path).await.unwrap();
		remove_artifact(&path).await.unwrap();
		assert!(!path.exists());
	}
}
