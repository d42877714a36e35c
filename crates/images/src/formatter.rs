use crate::{
	consts,
	error::{Error, Result},
	generic::GenericHandler,
	ImageHandler,
};
use image::DynamicImage;
use std::{
	ffi::{OsStr, OsString},
	path::Path,
};

pub fn format_image(path: impl AsRef<Path>) -> Result<DynamicImage> {
	let ext = path
		.as_ref()
		.extension()
		.map_or_else(|| Err(Error::NoExtension), |e| Ok(e.to_ascii_lowercase()))?;
	match_to_handler(&ext)?.handle_image(path.as_ref())
}

/// Like [`format_image`], for files whose real format is known but not reflected in their name
pub fn format_image_as(path: impl AsRef<Path>, ext: impl AsRef<OsStr>) -> Result<DynamicImage> {
	match_to_handler(&ext.as_ref().to_ascii_lowercase())?.handle_image(path.as_ref())
}

/// Whether [`format_image`] has a handler for this path's extension
#[must_use]
pub fn is_supported(path: impl AsRef<Path>) -> bool {
	path.as_ref()
		.extension()
		.is_some_and(|ext| match_to_handler(&ext.to_ascii_lowercase()).is_ok())
}

fn match_to_handler(ext: &OsStr) -> Result<Box<dyn ImageHandler>> {
	let mut handler: Option<Box<dyn ImageHandler>> = None;

	if consts::GENERIC_EXTENSIONS
		.iter()
		.map(OsString::from)
		.any(|x| x == ext)
	{
		handler = Some(Box::new(GenericHandler {}));
	}

	handler.ok_or(Error::Unsupported)
}
