#![warn(
	clippy::all,
	clippy::pedantic,
	clippy::correctness,
	clippy::perf,
	clippy::style,
	clippy::suspicious,
	clippy::complexity,
	clippy::nursery,
	clippy::unwrap_used,
	unused_qualifications,
	rust_2018_idioms,
	clippy::expect_used,
	trivial_casts,
	trivial_numeric_casts,
	unused_allocation,
	clippy::dbg_macro
)]
#![forbid(unsafe_code)]
#![allow(clippy::missing_errors_doc, clippy::module_name_repetitions)]

mod animation;
mod consts;
mod error;
mod formatter;
mod generic;

pub use animation::is_animated;
pub use consts::GENERIC_EXTENSIONS;
pub use error::{Error, Result};
pub use formatter::{format_image, format_image_as, is_supported};
pub use image::DynamicImage;

use std::{fs, io::Read, path::Path};

pub trait ImageHandler {
	fn maximum_size(&self) -> u64
	where
		Self: Sized; // thanks vtables

	fn get_data(&self, path: &Path) -> Result<Vec<u8>>
	where
		Self: Sized,
	{
		let mut file = fs::File::open(path)?;
		if file.metadata()?.len() > self.maximum_size() {
			Err(Error::TooLarge)
		} else {
			let mut data = vec![];
			file.read_to_end(&mut data)?;
			Ok(data)
		}
	}

	fn handle_image(&self, path: &Path) -> Result<DynamicImage>;
}

/// Scales `width`x`height` down so that its longest side is at most `max_side`,
/// keeping the aspect ratio. Images already small enough are left untouched.
#[must_use]
#[allow(
	clippy::cast_possible_truncation,
	clippy::cast_sign_loss,
	clippy::cast_precision_loss
)]
pub fn scale_dimensions(width: u32, height: u32, max_side: u32) -> (u32, u32) {
	let longest = width.max(height);
	if longest <= max_side || longest == 0 {
		return (width, height);
	}

	let factor = f64::from(max_side) / f64::from(longest);
	(
		((f64::from(width) * factor).round() as u32).max(1),
		((f64::from(height) * factor).round() as u32).max(1),
	)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn scale_keeps_aspect_ratio() {
		assert_eq!(scale_dimensions(4000, 3000, 512), (512, 384));
		assert_eq!(scale_dimensions(3000, 4000, 512), (384, 512));
		assert_eq!(scale_dimensions(100, 50, 512), (100, 50));
		assert_eq!(scale_dimensions(10_000, 1, 100), (100, 1));
		assert_eq!(scale_dimensions(0, 0, 100), (0, 0));
	}
}
