use std::{fmt::Display, io, path::Path};

use thiserror::Error;

/// File I/O error that includes the path that caused the error
#[derive(Error, Debug)]
pub struct FileIOError {
	pub path: Box<Path>,
	#[source]
	pub source: io::Error,
	pub maybe_context: Option<String>,
}

impl Display for FileIOError {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(
			f,
			"file I/O error{}: {}; path: '{}'",
			self.maybe_context
				.as_ref()
				.map(|ctx| format!(" ({ctx})"))
				.unwrap_or_default(),
			self.source,
			self.path.display()
		)
	}
}

impl<P: AsRef<Path>> From<(P, io::Error)> for FileIOError {
	fn from((path, source): (P, io::Error)) -> Self {
		Self {
			path: path.as_ref().into(),
			source,
			maybe_context: None,
		}
	}
}

impl<P: AsRef<Path>> From<(P, io::Error, &'static str)> for FileIOError {
	fn from((path, source, context): (P, io::Error, &'static str)) -> Self {
		Self {
			path: path.as_ref().into(),
			source,
			maybe_context: Some(context.into()),
		}
	}
}

impl FileIOError {
	/// Normalized code of the underlying I/O error, see [`io_error_code`]
	#[must_use]
	pub fn code(&self) -> Option<&'static str> {
		io_error_code(&self.source)
	}
}

/// Maps an I/O error to a POSIX-style code name, whatever the platform.
///
/// Raw OS codes win over [`io::ErrorKind`] because several kinds we care about
/// (busy files, overlong names) are not reliably surfaced as a kind.
#[must_use]
pub fn io_error_code(e: &io::Error) -> Option<&'static str> {
	if let Some(code) = e.raw_os_error().and_then(raw_os_error_code) {
		return Some(code);
	}

	match e.kind() {
		io::ErrorKind::PermissionDenied => Some("EACCES"),
		io::ErrorKind::NotFound => Some("ENOENT"),
		io::ErrorKind::AlreadyExists => Some("EEXIST"),
		io::ErrorKind::InvalidInput => Some("EINVAL"),
		io::ErrorKind::TimedOut => Some("ETIMEDOUT"),
		io::ErrorKind::Interrupted => Some("EINTR"),
		io::ErrorKind::UnexpectedEof => Some("EOF"),
		_ => None,
	}
}

#[cfg(unix)]
fn raw_os_error_code(raw: i32) -> Option<&'static str> {
	match raw {
		libc::EACCES => Some("EACCES"),
		libc::EPERM => Some("EPERM"),
		libc::ENOENT => Some("ENOENT"),
		libc::ENOTDIR => Some("ENOTDIR"),
		libc::ENAMETOOLONG => Some("ENAMETOOLONG"),
		libc::EBUSY => Some("EBUSY"),
		libc::ELOOP => Some("ELOOP"),
		libc::EISDIR => Some("EISDIR"),
		libc::EMFILE => Some("EMFILE"),
		libc::EIO => Some("EIO"),
		_ => None,
	}
}

#[cfg(windows)]
fn raw_os_error_code(raw: i32) -> Option<&'static str> {
	// https://learn.microsoft.com/en-us/windows/win32/debug/system-error-codes--0-499-
	match raw {
		2 | 3 => Some("ENOENT"),
		5 => Some("EACCES"),
		32 | 33 => Some("EBUSY"),
		206 => Some("ENAMETOOLONG"),
		1920 => Some("ELOOP"),
		_ => None,
	}
}

#[cfg(not(any(unix, windows)))]
fn raw_os_error_code(_raw: i32) -> Option<&'static str> {
	None
}
