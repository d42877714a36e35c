use super::{rules::IgnoreRules, NonCriticalScannerError};

use std::{
	collections::{HashSet, VecDeque},
	fs::Metadata,
	io,
	path::{Path, PathBuf},
};

use tokio::fs::{self, DirEntry, ReadDir};
use tracing::{debug, trace};

#[derive(Debug)]
pub(super) struct WalkedFile {
	pub path: PathBuf,
	pub metadata: Metadata,
}

/// Breadth first, pull based traversal yielding regular files only.
///
/// Entries that can't be read are recorded and skipped, the walk itself never fails.
pub(super) struct Walker<'rules> {
	rules: &'rules IgnoreRules,
	follow_symlinks: bool,
	to_walk: VecDeque<PathBuf>,
	current: Option<(PathBuf, ReadDir)>,
	/// Canonical directories already queued, only tracked when following symlinks
	visited: HashSet<PathBuf>,
	pub errors: Vec<NonCriticalScannerError>,
	pub ignored: u64,
	/// Files listed, but gone before their metadata could be read
	pub vanished: u64,
}

impl<'rules> Walker<'rules> {
	pub async fn new(root: &Path, rules: &'rules IgnoreRules, follow_symlinks: bool) -> Self {
		let mut visited = HashSet::new();
		if follow_symlinks {
			if let Ok(canonical) = fs::canonicalize(root).await {
				visited.insert(canonical);
			}
		}

		Self {
			rules,
			follow_symlinks,
			to_walk: VecDeque::from([root.to_path_buf()]),
			current: None,
			visited,
			errors: vec![],
			ignored: 0,
			vanished: 0,
		}
	}

	pub async fn next_file(&mut self) -> Option<WalkedFile> {
		loop {
			let (dir, mut read_dir) = match self.current.take() {
				Some(current) => current,
				None => {
					let dir = self.to_walk.pop_front()?;
					match fs::read_dir(&dir).await {
						Ok(read_dir) => (dir, read_dir),
						Err(e) => {
							self.skip(NonCriticalScannerError::ReadDir {
								path: dir,
								error: e.to_string(),
							});
							continue;
						}
					}
				}
			};

			match read_dir.next_entry().await {
				Ok(Some(entry)) => {
					self.current = Some((dir, read_dir));
					if let Some(file) = self.visit(entry).await {
						return Some(file);
					}
				}
				Ok(None) => trace!(dir = %dir.display(), "Finished directory"),
				Err(e) => self.skip(NonCriticalScannerError::ReadDir {
					path: dir,
					error: e.to_string(),
				}),
			}
		}
	}

	async fn visit(&mut self, entry: DirEntry) -> Option<WalkedFile> {
		let path = entry.path();

		if self.rules.is_ignored(&path, &entry.file_name()) {
			trace!(path = %path.display(), "Ignoring entry");
			self.ignored += 1;
			return None;
		}

		let mut listed_as_file = false;
		let metadata = match entry.file_type().await {
			Ok(file_type) if file_type.is_symlink() => {
				if !self.follow_symlinks {
					self.ignored += 1;
					return None;
				}
				fs::metadata(&path).await
			}
			Ok(file_type) => {
				listed_as_file = file_type.is_file();
				entry.metadata().await
			}
			Err(e) => Err(e),
		};

		let metadata = match metadata {
			Ok(metadata) => metadata,
			Err(e) if listed_as_file && e.kind() == io::ErrorKind::NotFound => {
				trace!(path = %path.display(), "Entry vanished while walking");
				self.vanished += 1;
				return None;
			}
			Err(e) => {
				self.skip(NonCriticalScannerError::Metadata {
					path,
					error: e.to_string(),
				});
				return None;
			}
		};

		if metadata.is_dir() {
			if self.follow_symlinks && !self.first_visit(&path).await {
				return None;
			}
			self.to_walk.push_back(path);
			None
		} else if metadata.is_file() {
			Some(WalkedFile { path, metadata })
		} else {
			// sockets, fifos, devices
			self.ignored += 1;
			None
		}
	}

	async fn first_visit(&mut self, dir: &Path) -> bool {
		match fs::canonicalize(dir).await {
			Ok(canonical) => {
				if self.visited.insert(canonical) {
					return true;
				}
				debug!(dir = %dir.display(), "Directory already walked, symlink loop?");
				self.skip(NonCriticalScannerError::SymlinkCycle(dir.to_path_buf()));
				false
			}
			Err(e) => {
				self.skip(NonCriticalScannerError::Metadata {
					path: dir.to_path_buf(),
					error: e.to_string(),
				});
				false
			}
		}
	}

	fn skip(&mut self, error: NonCriticalScannerError) {
		debug!(%error, "Skipping entry;");
		self.errors.push(error);
	}
}
