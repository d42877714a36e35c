use crate::{
	kind::MediaKind,
	magic::{HEADER_LEN, SIGNATURES},
};

use std::{ffi::OsStr, path::Path, str::FromStr};

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "extension", rename_all = "lowercase")]
pub enum Extension {
	Image(ImageExtension),
	Video(VideoExtension),
	Audio(AudioExtension),
}

macro_rules! extension_category_enum {
	($name:ident { $($(#[$attr:meta])* $variant:ident,)* }) => {
		#[derive(
			Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, EnumIter,
		)]
		#[serde(rename_all = "lowercase")]
		#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
		pub enum $name {
			$($(#[$attr])* $variant,)*
		}
	};
}

extension_category_enum! {
	ImageExtension {
		Jpg,
		Jpeg,
		Png,
		Gif,
		Bmp,
		Tif,
		Tiff,
		Webp,
		Ico,
		Heic,
		Heif,
		Avif,
		Svg,
		Dng,
		Cr2,
		Nef,
		Arw,
	}
}

extension_category_enum! {
	VideoExtension {
		Avi,
		Mov,
		Qt,
		Mp4,
		M4v,
		Mkv,
		Webm,
		Flv,
		Wmv,
		Asf,
		Mpg,
		Mpeg,
		Ogv,
		Ts,
		Mts,
		M2ts,
		#[serde(rename = "3gp")]
		#[strum(serialize = "3gp")]
		_3gp,
		Wtv,
	}
}

extension_category_enum! {
	AudioExtension {
		Mp3,
		Wav,
		Flac,
		Ogg,
		Oga,
		Opus,
		M4a,
		Aac,
		Aiff,
		Aif,
		Wma,
	}
}

impl Extension {
	/// Classifies by file extension only, no I/O
	#[must_use]
	pub fn from_path(path: impl AsRef<Path>) -> Option<Self> {
		path.as_ref()
			.extension()
			.and_then(OsStr::to_str)
			.and_then(|ext| ext.parse().ok())
	}

	/// Classifies by the leading bytes of a file, at most [`HEADER_LEN`] are inspected
	#[must_use]
	pub fn from_signature(header: &[u8]) -> Option<Self> {
		let header = &header[..header.len().min(HEADER_LEN)];

		SIGNATURES
			.iter()
			.find(|(magic, _)| magic.matches(header))
			.map(|(_, ext)| *ext)
	}

	/// Prefers the extension, falls back to the signature when the extension is unknown
	#[must_use]
	pub fn resolve(path: impl AsRef<Path>, header: Option<&[u8]>) -> Option<Self> {
		Self::from_path(path).or_else(|| header.and_then(Self::from_signature))
	}

	#[must_use]
	pub const fn kind(&self) -> MediaKind {
		match self {
			Self::Image(_) => MediaKind::Image,
			Self::Video(_) => MediaKind::Video,
			Self::Audio(_) => MediaKind::Audio,
		}
	}
}

impl FromStr for Extension {
	type Err = strum::ParseError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		ImageExtension::from_str(s)
			.map(Self::Image)
			.or_else(|_| VideoExtension::from_str(s).map(Self::Video))
			.or_else(|_| AudioExtension::from_str(s).map(Self::Audio))
	}
}

impl std::fmt::Display for Extension {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Self::Image(ext) => std::fmt::Display::fmt(ext, f),
			Self::Video(ext) => std::fmt::Display::fmt(ext, f),
			Self::Audio(ext) => std::fmt::Display::fmt(ext, f),
		}
	}
}
