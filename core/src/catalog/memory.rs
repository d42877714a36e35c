use crate::hasher::Fingerprint;

use super::{
	ArtifactReferences, Catalog, CatalogError, DiscoveredFile, FileId, ProfileId, Upserted,
};

use mc_file_ext::MediaKind;

use std::{
	collections::{BTreeMap, HashMap},
	path::{Path, PathBuf},
};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::trace;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
	pub id: FileId,
	pub profile_id: ProfileId,
	pub path: PathBuf,
	pub kind: MediaKind,
	pub size_in_bytes: u64,
	pub date_modified: Option<DateTime<Utc>>,
	pub fingerprint: Option<Fingerprint>,
	pub thumbnail: Option<String>,
	pub preview_frames: Option<String>,
	pub duration: Option<String>,
}

impl FileRecord {
	/// Artifacts stay valid only while the content they were made from is unchanged
	fn same_content(&self, file: &DiscoveredFile) -> bool {
		match (&self.fingerprint, &file.fingerprint) {
			(Some(stored), Some(fresh)) => stored == fresh,
			_ => {
				self.size_in_bytes == file.size_in_bytes
					&& self.date_modified == file.date_modified
			}
		}
	}
}

#[derive(Debug, Default)]
struct Inner {
	next_id: u64,
	records: BTreeMap<FileId, FileRecord>,
	/// `(profile, path)` lookups, kept in step with `records`
	by_path: HashMap<ProfileId, HashMap<PathBuf, FileId>>,
}

impl Inner {
	fn from_records(records: BTreeMap<FileId, FileRecord>) -> Self {
		let next_id = records.keys().last().map_or(0, |id| id.0 + 1);

		let mut by_path = HashMap::<_, HashMap<_, _>>::new();
		for record in records.values() {
			by_path
				.entry(record.profile_id)
				.or_default()
				.insert(record.path.clone(), record.id);
		}

		Self {
			next_id,
			records,
			by_path,
		}
	}

	fn find_by_path(&self, profile_id: ProfileId, path: &Path) -> Option<FileId> {
		self.by_path.get(&profile_id)?.get(path).copied()
	}

	fn insert(&mut self, record: FileRecord) {
		self.by_path
			.entry(record.profile_id)
			.or_default()
			.insert(record.path.clone(), record.id);
		self.records.insert(record.id, record);
	}

	fn remove(&mut self, file_id: FileId) -> Option<FileRecord> {
		let record = self.records.remove(&file_id)?;

		if let Some(paths) = self.by_path.get_mut(&record.profile_id) {
			paths.remove(&record.path);
			if paths.is_empty() {
				self.by_path.remove(&record.profile_id);
			}
		}

		Some(record)
	}

	fn get_mut(&mut self, file_id: FileId) -> Result<&mut FileRecord, CatalogError> {
		self.records
			.get_mut(&file_id)
			.ok_or(CatalogError::NotFound(file_id))
	}
}

/// In-memory [`Catalog`] keyed by `(profile, path)`
#[derive(Debug, Default)]
pub struct MemoryCatalog {
	inner: RwLock<Inner>,
}

impl MemoryCatalog {
	#[must_use]
	pub fn new() -> Self {
		Self::default()
	}

	/// Rebuilds a catalog from a snapshot taken with [`MemoryCatalog::snapshot`]
	#[must_use]
	pub fn from_records(records: impl IntoIterator<Item = FileRecord>) -> Self {
		let records = records
			.into_iter()
			.map(|record| (record.id, record))
			.collect::<BTreeMap<_, _>>();

		Self {
			inner: RwLock::new(Inner::from_records(records)),
		}
	}

	pub async fn snapshot(&self) -> Vec<FileRecord> {
		self.inner.read().await.records.values().cloned().collect()
	}

	pub async fn len(&self) -> usize {
		self.inner.read().await.records.len()
	}

	pub async fn is_empty(&self) -> bool {
		self.inner.read().await.records.is_empty()
	}

	pub async fn get(&self, file_id: FileId) -> Option<FileRecord> {
		self.inner.read().await.records.get(&file_id).cloned()
	}

	pub async fn find_by_path(
		&self,
		profile_id: ProfileId,
		path: impl AsRef<Path> + Send,
	) -> Option<FileRecord> {
		let inner = self.inner.read().await;
		inner
			.find_by_path(profile_id, path.as_ref())
			.and_then(|id| inner.records.get(&id).cloned())
	}

	/// Records of `profile_id` that have a thumbnail
	pub async fn with_thumbnails(&self, profile_id: ProfileId) -> Vec<FileRecord> {
		self.inner
			.read()
			.await
			.records
			.values()
			.filter(|record| record.profile_id == profile_id && record.thumbnail.is_some())
			.cloned()
			.collect()
	}

	pub async fn remove(&self, file_id: FileId) -> Option<FileRecord> {
		self.inner.write().await.remove(file_id)
	}
}

#[async_trait]
impl Catalog for MemoryCatalog {
	async fn upsert_file(
		&self,
		profile_id: ProfileId,
		file: &DiscoveredFile,
	) -> Result<Upserted, CatalogError> {
		let mut inner = self.inner.write().await;

		if let Some(file_id) = inner.find_by_path(profile_id, &file.path) {
			let record = inner.get_mut(file_id)?;

			if !record.same_content(file) {
				trace!(path = %file.path.display(), "Content changed, dropping stale artifact references");
				record.thumbnail = None;
				record.preview_frames = None;
				record.duration = None;
			}

			record.kind = file.kind;
			record.size_in_bytes = file.size_in_bytes;
			record.date_modified = file.date_modified;
			record.fingerprint.clone_from(&file.fingerprint);

			return Ok(Upserted {
				file_id,
				existing_thumbnail: record.thumbnail.as_ref().map(PathBuf::from),
			});
		}

		let file_id = FileId(inner.next_id);
		inner.next_id += 1;

		inner.insert(FileRecord {
			id: file_id,
			profile_id,
			path: file.path.clone(),
			kind: file.kind,
			size_in_bytes: file.size_in_bytes,
			date_modified: file.date_modified,
			fingerprint: file.fingerprint.clone(),
			thumbnail: None,
			preview_frames: None,
			duration: None,
		});

		Ok(Upserted {
			file_id,
			existing_thumbnail: None,
		})
	}

	async fn update_artifact_path(
		&self,
		file_id: FileId,
		path: &Path,
	) -> Result<(), CatalogError> {
		self.inner.write().await.get_mut(file_id)?.thumbnail =
			Some(path.to_string_lossy().into_owned());
		Ok(())
	}

	async fn update_preview_frames(
		&self,
		file_id: FileId,
		frames: &str,
	) -> Result<(), CatalogError> {
		self.inner.write().await.get_mut(file_id)?.preview_frames =
			(!frames.is_empty()).then(|| frames.to_string());
		Ok(())
	}

	async fn update_duration(&self, file_id: FileId, duration: &str) -> Result<(), CatalogError> {
		self.inner.write().await.get_mut(file_id)?.duration = Some(duration.to_string());
		Ok(())
	}

	async fn list_artifact_references(
		&self,
		profile_id: ProfileId,
	) -> Result<Vec<ArtifactReferences>, CatalogError> {
		Ok(self
			.inner
			.read()
			.await
			.records
			.values()
			.filter(|record| record.profile_id == profile_id)
			.filter(|record| record.thumbnail.is_some() || record.preview_frames.is_some())
			.map(|record| ArtifactReferences {
				thumbnail: record.thumbnail.clone(),
				preview_frames: record.preview_frames.clone(),
			})
			.collect())
	}
}
