use mc_file_ext::{Extension, MediaKind, HEADER_LEN};
use mc_utils::error::FileIOError;

use std::path::Path;

use tokio::{fs::File, io::AsyncReadExt};

/// Classifies by extension, peeking at the file signature only when the name says nothing.
///
/// `Ok(None)` means the file is readable but isn't media we know about.
pub async fn classify(path: impl AsRef<Path> + Send) -> Result<Option<Extension>, FileIOError> {
	let path = path.as_ref();

	if let Some(ext) = Extension::from_path(path) {
		return Ok(Some(ext));
	}

	let header = read_header(path).await?;
	Ok(Extension::from_signature(&header))
}

#[must_use]
pub fn kind_of(ext: Option<Extension>) -> MediaKind {
	ext.map_or(MediaKind::Unknown, |ext| ext.kind())
}

async fn read_header(path: &Path) -> Result<Vec<u8>, FileIOError> {
	let file = File::open(path)
		.await
		.map_err(|e| FileIOError::from((path, e, "Failed to open file to read its signature")))?;

	let mut header = Vec::with_capacity(HEADER_LEN);
	file.take(HEADER_LEN as u64)
		.read_to_end(&mut header)
		.await
		.map_err(|e| FileIOError::from((path, e, "Failed to read file signature")))?;

	Ok(header)
}
