//! Content fingerprints.
//!
//! Files are streamed through blake3, never buffered whole. Partial fingerprints only look at
//! the first and last [`PARTIAL_WINDOW`] bytes plus the file size; they are tagged differently
//! from full ones and never compare equal to them.

use crate::progress::{ProgressReporter, ProgressUpdate};

use mc_utils::error::FileIOError;

use std::{
	collections::HashMap,
	fmt,
	path::{Path, PathBuf},
	str::FromStr,
};

use blake3::Hasher;
use futures::{future, stream, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::{
	fs::File,
	io::{self, AsyncReadExt, AsyncSeekExt, SeekFrom},
};
use tokio_util::sync::CancellationToken;
use tracing::{instrument, trace, warn};

/// Size of each of the head and tail windows of a partial fingerprint
pub const PARTIAL_WINDOW: u64 = 1024 * 1024;

const READ_BUFFER_SIZE: usize = 64 * 1024;

const FULL_PREFIX: &str = "blake3";
const PARTIAL_PREFIX: &str = "blake3-partial";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HashMode {
	#[default]
	Full,
	Partial,
}

/// A tagged digest, rendered as `blake3:<hex>` or `blake3-partial:<hex>`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct Fingerprint {
	pub mode: HashMode,
	pub hex: String,
}

impl fmt::Display for Fingerprint {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let prefix = match self.mode {
			HashMode::Full => FULL_PREFIX,
			HashMode::Partial => PARTIAL_PREFIX,
		};
		write!(f, "{prefix}:{}", self.hex)
	}
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("malformed fingerprint: <fingerprint='{0}'>")]
pub struct MalformedFingerprint(String);

impl FromStr for Fingerprint {
	type Err = MalformedFingerprint;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let (mode, hex) = match s.split_once(':') {
			Some((FULL_PREFIX, hex)) => (HashMode::Full, hex),
			Some((PARTIAL_PREFIX, hex)) => (HashMode::Partial, hex),
			_ => return Err(MalformedFingerprint(s.to_string())),
		};

		if hex.len() != blake3::OUT_LEN * 2 || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
			return Err(MalformedFingerprint(s.to_string()));
		}

		Ok(Self {
			mode,
			hex: hex.to_string(),
		})
	}
}

impl From<Fingerprint> for String {
	fn from(fingerprint: Fingerprint) -> Self {
		fingerprint.to_string()
	}
}

impl TryFrom<String> for Fingerprint {
	type Error = MalformedFingerprint;

	fn try_from(s: String) -> Result<Self, Self::Error> {
		s.parse()
	}
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum NonCriticalHasherError {
	#[error("failed to hash file: {0}")]
	Io(String),
	#[error("not a regular file: <path='{}'>", .0.display())]
	NotAFile(PathBuf),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HashOptions {
	pub mode: HashMode,
	/// Files hashed at the same time, at least one
	pub concurrency: usize,
}

impl Default for HashOptions {
	fn default() -> Self {
		Self {
			mode: HashMode::Full,
			concurrency: 4,
		}
	}
}

/// Outcome per path. Paths not reached before cancellation are missing.
pub type HashResults = HashMap<PathBuf, Result<Fingerprint, NonCriticalHasherError>>;

#[instrument(skip_all, fields(path = %path.as_ref().display(), ?mode))]
pub async fn hash_file(
	path: impl AsRef<Path> + Send,
	mode: HashMode,
) -> Result<Fingerprint, NonCriticalHasherError> {
	let path = path.as_ref();

	let digest = match mode {
		HashMode::Full => full_digest(path).await,
		HashMode::Partial => partial_digest(path).await,
	}
	.map_err(|e| match e {
		DigestError::Io(e) => NonCriticalHasherError::Io(e.to_string()),
		DigestError::NotAFile => NonCriticalHasherError::NotAFile(path.to_path_buf()),
	})?;

	trace!("Hashed file");

	Ok(Fingerprint {
		mode,
		hex: digest.to_hex().to_string(),
	})
}

enum DigestError {
	Io(FileIOError),
	NotAFile,
}

async fn open_regular_file(path: &Path) -> Result<(File, u64), DigestError> {
	let file = File::open(path)
		.await
		.map_err(|e| DigestError::Io(FileIOError::from((path, e, "Failed to open file"))))?;

	let metadata = file
		.metadata()
		.await
		.map_err(|e| DigestError::Io(FileIOError::from((path, e, "Failed to read metadata"))))?;

	if metadata.is_file() {
		Ok((file, metadata.len()))
	} else {
		Err(DigestError::NotAFile)
	}
}

async fn full_digest(path: &Path) -> Result<blake3::Hash, DigestError> {
	let (mut file, _) = open_regular_file(path).await?;
	let mut hasher = Hasher::new();

	stream_into(&mut hasher, &mut file, None)
		.await
		.map_err(|e| DigestError::Io(FileIOError::from((path, e, "Failed to read file"))))?;

	Ok(hasher.finalize())
}

async fn partial_digest(path: &Path) -> Result<blake3::Hash, DigestError> {
	let (mut file, size) = open_regular_file(path).await?;

	sample_windows(&mut file, size)
		.await
		.map_err(|e| DigestError::Io(FileIOError::from((path, e, "Failed to read file"))))
}

/// Hashes `size` followed by the head and tail windows of a file opened at that size
async fn sample_windows(file: &mut File, size: u64) -> io::Result<blake3::Hash> {
	let mut hasher = Hasher::new();
	hasher.update(&size.to_le_bytes());

	if size <= PARTIAL_WINDOW * 2 {
		// Windows would overlap, so the whole file is the sample
		stream_into(&mut hasher, file, None).await?;
	} else {
		stream_into(&mut hasher, file, Some(PARTIAL_WINDOW)).await?;
		file.seek(SeekFrom::Start(size - PARTIAL_WINDOW)).await?;
		stream_into(&mut hasher, file, Some(PARTIAL_WINDOW)).await?;
	}

	Ok(hasher.finalize())
}

/// Feeds `limit` bytes (or everything up to EOF) to `hasher`.
/// Running out of data before `limit` means the file shrank under us.
async fn stream_into(hasher: &mut Hasher, file: &mut File, limit: Option<u64>) -> io::Result<()> {
	let mut buf = vec![0; READ_BUFFER_SIZE];
	let mut remaining = limit;

	loop {
		let want = match remaining {
			Some(0) => return Ok(()),
			Some(left) => buf.len().min(usize::try_from(left).unwrap_or(usize::MAX)),
			None => buf.len(),
		};

		let read = file.read(&mut buf[..want]).await?;
		if read == 0 {
			return if remaining.is_some() {
				Err(io::Error::from(io::ErrorKind::UnexpectedEof))
			} else {
				Ok(())
			};
		}

		hasher.update(&buf[..read]);
		if let Some(left) = remaining.as_mut() {
			*left -= read as u64;
		}
	}
}

/// Hashes a batch with bounded concurrency, reporting after every finished file.
///
/// A failing file never aborts the batch. Cancellation stops new files from being picked up;
/// the ones already in flight are finished.
#[instrument(skip_all, fields(total = paths.len(), ?options))]
pub async fn hash_files(
	paths: &[PathBuf],
	options: HashOptions,
	reporter: &dyn ProgressReporter,
	cancel: &CancellationToken,
) -> HashResults {
	let total = paths.len();
	let mode = options.mode;
	let mut results = HashMap::with_capacity(total);

	let mut hashed = stream::iter(paths)
		.take_while(|_| future::ready(!cancel.is_cancelled()))
		.map(|path| async move { (path, hash_file(path, mode).await) })
		.buffer_unordered(options.concurrency.max(1));

	let mut current = 0;
	while let Some((path, res)) = hashed.next().await {
		current += 1;

		if let Err(e) = &res {
			warn!(path = %path.display(), %e, "Skipping file that couldn't be hashed;");
		}

		reporter.progress(ProgressUpdate::Item {
			current,
			total,
			path: Some(path.clone()),
		});

		results.insert(path.clone(), res);
	}

	results
}
