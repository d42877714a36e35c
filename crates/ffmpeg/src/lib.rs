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
	trivial_casts,
	trivial_numeric_casts,
	unused_allocation,
	clippy::dbg_macro
)]
#![forbid(unsafe_code)]
#![allow(clippy::missing_errors_doc, clippy::module_name_repetitions)]

mod binaries;
mod error;
mod frame;
mod probe;
mod thumbnailer;

pub use binaries::FfmpegBinaries;
pub use error::{Error, Result};
pub use frame::{extract_frame, sample_timestamps};
pub use probe::{format_duration, probe_duration};
pub use thumbnailer::{encode_webp, Thumbnailer, ThumbnailerBuilder};
