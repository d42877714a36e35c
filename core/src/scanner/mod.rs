//! Two pass directory scanner.
//!
//! The first pass only counts files to give progress a denominator; it is a best effort
//! estimate of a live filesystem. The second pass validates, classifies and fingerprints every
//! file and hands it to the [`Catalog`]. Phases go `counting → scanning → complete`, or straight
//! to `error` when the root can't be scanned at all.

use crate::{
	catalog::{Catalog, DiscoveredFile, FileId, ProfileId, Upserted},
	classify::{classify, kind_of},
	config::{HashingConfig, PipelineConfig, ScannerConfig},
	hasher::{hash_file, HashMode, NonCriticalHasherError},
	preview::{NonCriticalPreviewError, PreviewGenerator},
	progress::{ProgressReporter, ProgressUpdate, ScanPhase, ScanProgress},
	store::ArtifactStore,
	validator::{validate_path_sync, PathErrorKind},
};

use mc_file_ext::MediaKind;
use mc_utils::error::FileIOError;

use std::{
	io,
	path::{Path, PathBuf},
	sync::Arc,
	time::Duration,
};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::{fs, time::Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, trace, warn};

mod rules;
mod walk;

pub use rules::IgnoreRules;

use walk::{WalkedFile, Walker};

/// Counting progress is only sent every this many files
const COUNTING_REPORT_INTERVAL: u64 = 256;

#[derive(thiserror::Error, Debug)]
pub enum ScannerError {
	#[error("scan root does not exist: <path='{}'>", .0.display())]
	RootNotFound(PathBuf),
	#[error("scan root is not a directory: <path='{}'>", .0.display())]
	RootNotADirectory(PathBuf),
	#[error("scan root is not accessible: {0}")]
	RootInaccessible(#[from] FileIOError),
	#[error("invalid ignore pattern: {0}")]
	IgnorePattern(#[from] globset::Error),
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum NonCriticalScannerError {
	#[error("failed to read directory <path='{}'>: {error}", .path.display())]
	ReadDir { path: PathBuf, error: String },
	#[error("failed to read metadata <path='{}'>: {error}", .path.display())]
	Metadata { path: PathBuf, error: String },
	#[error("directory was already walked, skipping symlink loop: <path='{}'>", .0.display())]
	SymlinkCycle(PathBuf),
	#[error("invalid path <path='{}', kind='{kind:?}'>: {message}", .path.display())]
	InvalidPath {
		path: PathBuf,
		kind: PathErrorKind,
		message: String,
	},
	#[error("failed to classify file: {0}")]
	Classify(String),
	#[error("failed to fingerprint file <path='{}'>: {error}", .path.display())]
	Fingerprint {
		path: PathBuf,
		error: NonCriticalHasherError,
	},
	#[error("catalog rejected file <path='{}'>: {error}", .path.display())]
	Catalog { path: PathBuf, error: String },
	#[error("failed to generate preview <path='{}'>: {error}", .path.display())]
	Preview {
		path: PathBuf,
		error: NonCriticalPreviewError,
	},
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanStatus {
	Completed,
	Canceled,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanStats {
	/// Estimate from the counting pass
	pub counted: u64,
	/// Files handled in the scanning pass, whatever the outcome
	pub processed: u64,
	pub registered: u64,
	pub skipped: u64,
	/// Disappeared between being listed and being looked at
	pub vanished: u64,
	/// Ignore rules, hidden entries, unfollowed symlinks and kinds we don't take
	pub ignored: u64,
	pub bytes: u64,
	pub thumbnails: u64,
	pub preview_frames: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanReport {
	pub status: ScanStatus,
	pub stats: ScanStats,
	pub errors: Vec<NonCriticalScannerError>,
	pub elapsed: Duration,
}

enum Outcome {
	Registered,
	Skipped,
	Vanished,
	Ignored,
}

/// Scans directories into one profile of a [`Catalog`]
pub struct Scanner {
	profile_id: ProfileId,
	catalog: Arc<dyn Catalog>,
	config: ScannerConfig,
	hashing: HashingConfig,
	rules: IgnoreRules,
	previews: Option<PreviewGenerator>,
}

impl Scanner {
	/// Previews are only generated when `scanner.generate_previews` is set, into the profile's
	/// directory of the artifact store under `data_dir`.
	pub fn new(
		profile_id: ProfileId,
		catalog: Arc<dyn Catalog>,
		config: &PipelineConfig,
	) -> Result<Self, ScannerError> {
		let rules = IgnoreRules::new(&config.scanner.ignore_patterns, config.scanner.skip_hidden)?;

		let previews = config.scanner.generate_previews.then(|| {
			PreviewGenerator::new(
				ArtifactStore::new(&config.data_dir).profile_dir(profile_id),
				config,
			)
		});

		Ok(Self {
			profile_id,
			catalog,
			config: config.scanner.clone(),
			hashing: config.hashing.clone(),
			rules,
			previews,
		})
	}

	#[instrument(skip_all, fields(root = %root.as_ref().display(), profile_id = %self.profile_id))]
	pub async fn scan(
		&self,
		root: impl AsRef<Path> + Send,
		reporter: &dyn ProgressReporter,
		cancel: &CancellationToken,
	) -> Result<ScanReport, ScannerError> {
		let root = root.as_ref();
		let start = Instant::now();

		if let Err(e) = check_root(root).await {
			reporter.progress(ProgressUpdate::Scan(
				ScanProgress::new(ScanPhase::Error, 0, 0).with_message(e.to_string()),
			));
			return Err(e);
		}

		let mut report = ScanReport {
			status: ScanStatus::Completed,
			stats: ScanStats::default(),
			errors: vec![],
			elapsed: Duration::ZERO,
		};

		let Some(counted) = self.count(root, reporter, cancel).await else {
			info!("Scan canceled while counting");
			report.status = ScanStatus::Canceled;
			return Ok(finish(report, 0, 0, start, reporter));
		};

		report.stats.counted = counted;
		debug!(counted, "Finished counting");

		let mut total = counted;
		let mut current = 0;
		let mut seen_vanished = 0;
		let mut walker = Walker::new(root, &self.rules, self.config.follow_symlinks).await;

		loop {
			if cancel.is_cancelled() {
				info!(current, total, "Scan canceled");
				report.status = ScanStatus::Canceled;
				break;
			}

			let next = walker.next_file().await;

			for _ in seen_vanished..walker.vanished {
				total = lower_total(total, current);
			}
			seen_vanished = walker.vanished;

			let Some(file) = next else {
				break;
			};

			match self.process(&file, &mut report).await {
				Outcome::Vanished => {
					report.stats.vanished += 1;
					total = lower_total(total, current);
					continue;
				}
				Outcome::Registered => report.stats.registered += 1,
				Outcome::Skipped => report.stats.skipped += 1,
				Outcome::Ignored => report.stats.ignored += 1,
			}

			current += 1;
			report.stats.processed = current;

			// Files created after counting are scanned too, but the estimate is never raised:
			// past it, progress stays pinned at `total`
			reporter.progress(ProgressUpdate::Scan(
				ScanProgress::new(ScanPhase::Scanning, current.min(total), total)
					.with_file(&file.path),
			));
		}

		report.stats.ignored += walker.ignored;
		report.stats.vanished += walker.vanished;
		report.errors.append(&mut walker.errors);

		let reported = current.min(total);

		// A finished scan may lower the estimate to what was really there, a canceled one keeps it
		let total = match report.status {
			ScanStatus::Completed => reported,
			ScanStatus::Canceled => total,
		};

		Ok(finish(report, reported, total, start, reporter))
	}

	async fn count(
		&self,
		root: &Path,
		reporter: &dyn ProgressReporter,
		cancel: &CancellationToken,
	) -> Option<u64> {
		reporter.progress(ProgressUpdate::Scan(ScanProgress::new(ScanPhase::Counting, 0, 0)));

		let mut walker = Walker::new(root, &self.rules, self.config.follow_symlinks).await;
		let mut counted = 0;
		let mut reported = 0;

		while walker.next_file().await.is_some() {
			if cancel.is_cancelled() {
				return None;
			}

			counted += 1;
			if counted % COUNTING_REPORT_INTERVAL == 0 {
				reporter.progress(ProgressUpdate::Scan(ScanProgress::new(
					ScanPhase::Counting,
					counted,
					counted,
				)));
				reported = counted;
			}
		}

		if counted != reported {
			reporter.progress(ProgressUpdate::Scan(ScanProgress::new(
				ScanPhase::Counting,
				counted,
				counted,
			)));
		}

		Some(counted)
	}

	async fn process(&self, file: &WalkedFile, report: &mut ScanReport) -> Outcome {
		let path = &file.path;

		let validation = validate_path_sync(path);
		if !validation.valid {
			return match validation.error_kind {
				Some(PathErrorKind::NotFound) => {
					trace!(path = %path.display(), "File vanished before it could be scanned");
					Outcome::Vanished
				}
				kind => {
					report.errors.push(NonCriticalScannerError::InvalidPath {
						path: path.clone(),
						kind: kind.unwrap_or(PathErrorKind::Inaccessible),
						message: validation.message.unwrap_or_default(),
					});
					Outcome::Skipped
				}
			};
		}

		let extension = match classify(path).await {
			Ok(extension) => extension,
			Err(e) if e.source.kind() == io::ErrorKind::NotFound => return Outcome::Vanished,
			Err(e) => {
				report
					.errors
					.push(NonCriticalScannerError::Classify(e.to_string()));
				return Outcome::Skipped;
			}
		};

		let kind = kind_of(extension);
		if !self.config.accepted_kinds.contains(&kind) {
			trace!(path = %path.display(), %kind, "Not a kind we take");
			return Outcome::Ignored;
		}

		let size_in_bytes = file.metadata.len();

		let fingerprint = if self.config.fingerprint {
			match hash_file(path, self.hash_mode(size_in_bytes)).await {
				Ok(fingerprint) => Some(fingerprint),
				Err(error) => {
					report.errors.push(NonCriticalScannerError::Fingerprint {
						path: path.clone(),
						error,
					});
					return Outcome::Skipped;
				}
			}
		} else {
			None
		};

		let discovered = DiscoveredFile {
			path: path.clone(),
			kind,
			extension,
			size_in_bytes,
			date_modified: file.metadata.modified().ok().map(DateTime::<Utc>::from),
			fingerprint,
		};

		let Upserted {
			file_id,
			existing_thumbnail,
		} = match self.catalog.upsert_file(self.profile_id, &discovered).await {
			Ok(upserted) => upserted,
			Err(e) => {
				report.errors.push(NonCriticalScannerError::Catalog {
					path: path.clone(),
					error: e.to_string(),
				});
				return Outcome::Skipped;
			}
		};

		report.stats.bytes += size_in_bytes;

		if let Some(previews) = &self.previews {
			if existing_thumbnail.is_none() {
				self.generate_previews(previews, file_id, &discovered, report)
					.await;
			} else {
				trace!(path = %path.display(), "Thumbnail already present");
			}
		}

		Outcome::Registered
	}

	fn hash_mode(&self, size_in_bytes: u64) -> HashMode {
		let threshold = self.hashing.partial_threshold;
		if threshold > 0 && size_in_bytes >= threshold {
			HashMode::Partial
		} else {
			HashMode::Full
		}
	}

	async fn generate_previews(
		&self,
		previews: &PreviewGenerator,
		file_id: FileId,
		file: &DiscoveredFile,
		report: &mut ScanReport,
	) {
		if !matches!(file.kind, MediaKind::Image | MediaKind::Video) {
			return;
		}

		let preview_error = |error| NonCriticalScannerError::Preview {
			path: file.path.clone(),
			error,
		};

		match previews.generate_thumbnail(&file.path, None).await {
			Ok(thumbnail) => {
				if let Err(e) = self.catalog.update_artifact_path(file_id, &thumbnail).await {
					warn!(%e, "Failed to store thumbnail reference;");
					report.errors.push(NonCriticalScannerError::Catalog {
						path: file.path.clone(),
						error: e.to_string(),
					});
				} else {
					report.stats.thumbnails += 1;
				}
			}
			Err(e) => report.errors.push(preview_error(e)),
		}

		if !file.kind.is_time_based() {
			return;
		}

		match previews.generate_preview_frames(&file.path, None).await {
			Ok(frames) => match self.catalog.update_preview_frames(file_id, &frames).await {
				Ok(()) => report.stats.preview_frames += 1,
				Err(e) => report.errors.push(NonCriticalScannerError::Catalog {
					path: file.path.clone(),
					error: e.to_string(),
				}),
			},
			Err(e) => report.errors.push(preview_error(e)),
		}

		let duration = previews.get_video_duration(&file.path).await;
		if let Err(e) = self.catalog.update_duration(file_id, &duration).await {
			report.errors.push(NonCriticalScannerError::Catalog {
				path: file.path.clone(),
				error: e.to_string(),
			});
		}
	}
}

/// Takes one vanished entry off the estimate, never going below what was already reported
fn lower_total(total: u64, current: u64) -> u64 {
	total.saturating_sub(1).max(current.min(total))
}

async fn check_root(root: &Path) -> Result<(), ScannerError> {
	match fs::metadata(root).await {
		Ok(metadata) if metadata.is_dir() => fs::read_dir(root)
			.await
			.map(|_| ())
			.map_err(|e| FileIOError::from((root, e, "Failed to list scan root")).into()),
		Ok(_) => Err(ScannerError::RootNotADirectory(root.to_path_buf())),
		Err(e) if e.kind() == io::ErrorKind::NotFound => {
			Err(ScannerError::RootNotFound(root.to_path_buf()))
		}
		Err(e) => Err(FileIOError::from((root, e, "Failed to read scan root")).into()),
	}
}

fn finish(
	mut report: ScanReport,
	current: u64,
	total: u64,
	start: Instant,
	reporter: &dyn ProgressReporter,
) -> ScanReport {
	report.elapsed = start.elapsed();

	let mut complete = ScanProgress::new(ScanPhase::Complete, current, total);
	if report.status == ScanStatus::Canceled {
		complete = complete.with_message("scan canceled");
	}
	reporter.progress(ProgressUpdate::Scan(complete));

	info!(
		status = ?report.status,
		registered = report.stats.registered,
		skipped = report.stats.skipped,
		errors = report.errors.len(),
		elapsed = ?report.elapsed,
		"Scan finished;",
	);

	report
}
