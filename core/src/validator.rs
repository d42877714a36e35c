//! Cheap checks run on every path before it is touched for real.
//!
//! Nothing here ever returns an error: the outcome is always a verdict, and the caller decides
//! whether a rejected path is skipped or reported.

use mc_utils::error::io_error_code;

use std::{
	fs, io,
	path::{Component, Path},
};

use serde::{Deserialize, Serialize};
use tokio::fs as async_fs;

/// Longest accepted path, in characters. Exactly this many is still fine.
pub const MAX_PATH_LENGTH: usize = 260;

/// Characters rejected in any file or directory name, on top of control characters
pub const RESERVED_CHARACTERS: [char; 8] = ['<', '>', ':', '"', '|', '?', '*', '\\'];

/// Error codes that mean "leave this entry alone and carry on"
const SKIPPABLE_CODES: [&str; 5] = ["EACCES", "EPERM", "ENOENT", "ENAMETOOLONG", "EBUSY"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PathErrorKind {
	TooLong,
	InvalidChars,
	Inaccessible,
	NotFound,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathValidationResult {
	pub valid: bool,
	pub error_kind: Option<PathErrorKind>,
	pub message: Option<String>,
}

impl PathValidationResult {
	const fn ok() -> Self {
		Self {
			valid: true,
			error_kind: None,
			message: None,
		}
	}

	fn rejected(kind: PathErrorKind, message: impl Into<String>) -> Self {
		Self {
			valid: false,
			error_kind: Some(kind),
			message: Some(message.into()),
		}
	}
}

#[must_use]
pub fn validate_length(path: impl AsRef<Path>) -> bool {
	path.as_ref().as_os_str().to_string_lossy().chars().count() <= MAX_PATH_LENGTH
}

/// Only name components are inspected, so drive prefixes (`C:`) and separators are fine.
/// Names that aren't valid UTF-8 are rejected as well.
#[must_use]
pub fn validate_chars(path: impl AsRef<Path>) -> bool {
	path.as_ref().components().all(|component| match component {
		Component::Normal(name) => name.to_str().is_some_and(|name| {
			!name
				.chars()
				.any(|c| c.is_control() || RESERVED_CHARACTERS.contains(&c))
		}),
		_ => true,
	})
}

/// Directories must be listable, everything else must be openable for reading
#[must_use]
pub fn validate_access_sync(path: impl AsRef<Path>) -> bool {
	probe_access_sync(path.as_ref()).is_ok()
}

pub async fn validate_access(path: impl AsRef<Path> + Send) -> bool {
	probe_access(path.as_ref()).await.is_ok()
}

fn probe_access_sync(path: &Path) -> io::Result<()> {
	if fs::metadata(path)?.is_dir() {
		fs::read_dir(path).map(|_| ())
	} else {
		fs::File::open(path).map(|_| ())
	}
}

async fn probe_access(path: &Path) -> io::Result<()> {
	if async_fs::metadata(path).await?.is_dir() {
		async_fs::read_dir(path).await.map(|_| ())
	} else {
		async_fs::File::open(path).await.map(|_| ())
	}
}

/// Runs every check in order, stopping at the first failure: length, characters, access.
#[must_use]
pub fn validate_path_sync(path: impl AsRef<Path>) -> PathValidationResult {
	let path = path.as_ref();
	static_checks(path).unwrap_or_else(|| access_verdict(path, probe_access_sync(path)))
}

pub async fn validate_path(path: impl AsRef<Path> + Send) -> PathValidationResult {
	let path = path.as_ref();
	match static_checks(path) {
		Some(rejected) => rejected,
		None => access_verdict(path, probe_access(path).await),
	}
}

fn static_checks(path: &Path) -> Option<PathValidationResult> {
	if !validate_length(path) {
		return Some(PathValidationResult::rejected(
			PathErrorKind::TooLong,
			format!("path is longer than {MAX_PATH_LENGTH} characters"),
		));
	}

	if !validate_chars(path) {
		return Some(PathValidationResult::rejected(
			PathErrorKind::InvalidChars,
			"path contains reserved or control characters",
		));
	}

	None
}

fn access_verdict(path: &Path, res: io::Result<()>) -> PathValidationResult {
	match res {
		Ok(()) => PathValidationResult::ok(),
		Err(e) if e.kind() == io::ErrorKind::NotFound => PathValidationResult::rejected(
			PathErrorKind::NotFound,
			format!("path does not exist: {}", path.display()),
		),
		Err(e) => PathValidationResult::rejected(
			PathErrorKind::Inaccessible,
			format!("path is not accessible: {}: {e}", path.display()),
		),
	}
}

/// Whether a traversal should skip the entry that produced `e` instead of failing
#[must_use]
pub fn is_skippable_error(e: &io::Error) -> bool {
	get_error_code(e).is_some_and(|code| SKIPPABLE_CODES.contains(&code))
}

#[must_use]
pub fn get_error_code(e: &io::Error) -> Option<&'static str> {
	io_error_code(e)
}
