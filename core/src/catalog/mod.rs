//! The contract between the pipeline and whatever stores file records.
//!
//! The pipeline only ever talks to a [`Catalog`]; [`MemoryCatalog`] is the bundled implementation
//! used by the CLI (snapshotted to JSON between runs) and by tests.

use crate::hasher::Fingerprint;

use mc_file_ext::{Extension, MediaKind};

use std::{
	fmt,
	path::{Path, PathBuf},
};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

mod memory;

pub use memory::{FileRecord, MemoryCatalog};

/// Every catalog entry and every artifact directory is scoped by a profile
pub type ProfileId = Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FileId(pub u64);

impl fmt::Display for FileId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.0)
	}
}

/// A file the scanner found, validated and classified
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveredFile {
	pub path: PathBuf,
	pub kind: MediaKind,
	pub extension: Option<Extension>,
	pub size_in_bytes: u64,
	pub date_modified: Option<DateTime<Utc>>,
	pub fingerprint: Option<Fingerprint>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Upserted {
	pub file_id: FileId,
	/// Set when the record already pointed at a thumbnail that is still valid for its content
	pub existing_thumbnail: Option<PathBuf>,
}

/// Raw artifact references of one record, exactly as they are stored.
///
/// `preview_frames` is a comma separated list of paths.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactReferences {
	pub thumbnail: Option<String>,
	pub preview_frames: Option<String>,
}

#[derive(thiserror::Error, Debug, Clone, Serialize, Deserialize)]
pub enum CatalogError {
	#[error("file record not found: <id='{0}'>")]
	NotFound(FileId),
	#[error("catalog storage error: {0}")]
	Storage(String),
}

#[async_trait]
pub trait Catalog: Send + Sync {
	async fn upsert_file(
		&self,
		profile_id: ProfileId,
		file: &DiscoveredFile,
	) -> Result<Upserted, CatalogError>;

	async fn update_artifact_path(&self, file_id: FileId, path: &Path)
		-> Result<(), CatalogError>;

	async fn update_preview_frames(&self, file_id: FileId, frames: &str)
		-> Result<(), CatalogError>;

	async fn update_duration(&self, file_id: FileId, duration: &str) -> Result<(), CatalogError>;

	async fn list_artifact_references(
		&self,
		profile_id: ProfileId,
	) -> Result<Vec<ArtifactReferences>, CatalogError>;
}
