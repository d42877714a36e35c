//! Magic byte signatures.
//!
//! References:
//! https://www.garykessler.net/library/file_sigs.html
//! https://github.com/bojand/infer/

use crate::extensions::{AudioExtension, Extension, ImageExtension, VideoExtension};

/// How many leading bytes are needed to match every known signature
pub const HEADER_LEN: usize = 64;

/// A byte pattern anchored at `offset`, `None` matches any byte
pub(crate) struct MagicBytes {
	pub bytes: &'static [Option<u8>],
	pub offset: usize,
}

impl MagicBytes {
	pub fn matches(&self, header: &[u8]) -> bool {
		header.len() >= self.offset + self.bytes.len()
			&& self
				.bytes
				.iter()
				.zip(&header[self.offset..])
				.all(|(expected, actual)| expected.map_or(true, |b| b == *actual))
	}
}

macro_rules! magic_byte {
	(_) => {
		None
	};
	($b:literal) => {
		Some($b)
	};
}

macro_rules! magic {
	([$($b:tt),+ $(,)?]) => {
		MagicBytes {
			bytes: &[$(magic_byte!($b)),+],
			offset: 0,
		}
	};
	([$($b:tt),+ $(,)?] + $offset:literal) => {
		MagicBytes {
			bytes: &[$(magic_byte!($b)),+],
			offset: $offset,
		}
	};
}

// Order matters: the more specific `ftyp` brands must come before the generic one,
// and RIFF containers are told apart by their form type.
pub(crate) static SIGNATURES: &[(MagicBytes, Extension)] = &[
	(
		magic!([0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A]),
		Extension::Image(ImageExtension::Png),
	),
	(
		magic!([0xFF, 0xD8, 0xFF]),
		Extension::Image(ImageExtension::Jpg),
	),
	(
		magic!([0x47, 0x49, 0x46, 0x38, _, 0x61]),
		Extension::Image(ImageExtension::Gif),
	),
	(
		magic!([0x52, 0x49, 0x46, 0x46, _, _, _, _, 0x57, 0x45, 0x42, 0x50]),
		Extension::Image(ImageExtension::Webp),
	),
	(
		magic!([0x52, 0x49, 0x46, 0x46, _, _, _, _, 0x41, 0x56, 0x49, 0x20]),
		Extension::Video(VideoExtension::Avi),
	),
	(
		magic!([0x52, 0x49, 0x46, 0x46, _, _, _, _, 0x57, 0x41, 0x56, 0x45]),
		Extension::Audio(AudioExtension::Wav),
	),
	(
		magic!([0x66, 0x74, 0x79, 0x70, 0x68, 0x65, 0x69, 0x63] + 4),
		Extension::Image(ImageExtension::Heic),
	),
	(
		magic!([0x66, 0x74, 0x79, 0x70, 0x6D, 0x69, 0x66, 0x31] + 4),
		Extension::Image(ImageExtension::Heif),
	),
	(
		magic!([0x66, 0x74, 0x79, 0x70, 0x61, 0x76, 0x69, 0x66] + 4),
		Extension::Image(ImageExtension::Avif),
	),
	(
		magic!([0x66, 0x74, 0x79, 0x70, 0x71, 0x74, 0x20, 0x20] + 4),
		Extension::Video(VideoExtension::Mov),
	),
	(
		magic!([0x66, 0x74, 0x79, 0x70, 0x4D, 0x34, 0x56] + 4),
		Extension::Video(VideoExtension::M4v),
	),
	(
		magic!([0x66, 0x74, 0x79, 0x70, 0x4D, 0x34, 0x41, 0x20] + 4),
		Extension::Audio(AudioExtension::M4a),
	),
	(
		magic!([0x66, 0x74, 0x79, 0x70, 0x33, 0x67, 0x70] + 4),
		Extension::Video(VideoExtension::_3gp),
	),
	(
		magic!([0x66, 0x74, 0x79, 0x70] + 4),
		Extension::Video(VideoExtension::Mp4),
	),
	(
		magic!([0x1A, 0x45, 0xDF, 0xA3]),
		Extension::Video(VideoExtension::Mkv),
	),
	(
		magic!([0x46, 0x4C, 0x56]),
		Extension::Video(VideoExtension::Flv),
	),
	(
		magic!([
			0x30, 0x26, 0xB2, 0x75, 0x8E, 0x66, 0xCF, 0x11, 0xA6, 0xD9, 0x00, 0xAA, 0x00, 0x62,
			0xCE, 0x6C
		]),
		Extension::Video(VideoExtension::Wmv),
	),
	(
		magic!([0x00, 0x00, 0x01, 0xBA]),
		Extension::Video(VideoExtension::Mpg),
	),
	(
		magic!([0x00, 0x00, 0x01, 0xB3]),
		Extension::Video(VideoExtension::Mpg),
	),
	(
		magic!([0x66, 0x4C, 0x61, 0x43]),
		Extension::Audio(AudioExtension::Flac),
	),
	(
		magic!([0x4F, 0x67, 0x67, 0x53]),
		Extension::Audio(AudioExtension::Ogg),
	),
	(
		magic!([0x49, 0x44, 0x33]),
		Extension::Audio(AudioExtension::Mp3),
	),
	(
		magic!([0x46, 0x4F, 0x52, 0x4D, _, _, _, _, 0x41, 0x49, 0x46, 0x46]),
		Extension::Audio(AudioExtension::Aiff),
	),
	(
		magic!([0x49, 0x49, 0x2A, 0x00]),
		Extension::Image(ImageExtension::Tiff),
	),
	(
		magic!([0x4D, 0x4D, 0x00, 0x2A]),
		Extension::Image(ImageExtension::Tiff),
	),
	(
		magic!([0x00, 0x00, 0x01, 0x00]),
		Extension::Image(ImageExtension::Ico),
	),
	(magic!([0x42, 0x4D]), Extension::Image(ImageExtension::Bmp)),
];
