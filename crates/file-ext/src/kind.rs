/// Media Kind
///
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

#[derive(
	Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[repr(u8)]
pub enum MediaKind {
	// A file that can not be identified
	Unknown = 0,
	// An image file, animated or not
	Image = 5,
	// An audio file
	Audio = 6,
	// A video file
	Video = 7,
}

impl MediaKind {
	/// Time-based media get scrub frames and a duration probe
	#[must_use]
	pub const fn is_time_based(self) -> bool {
		matches!(self, Self::Video)
	}
}
