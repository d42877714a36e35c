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
	clippy::unnecessary_cast,
	clippy::cast_lossless,
	clippy::cast_possible_truncation,
	clippy::cast_possible_wrap,
	clippy::cast_precision_loss,
	clippy::cast_sign_loss,
	clippy::dbg_macro,
	clippy::deprecated_cfg_attr,
	clippy::separated_literal_suffix,
	deprecated
)]
#![forbid(deprecated_in_future)]
#![allow(
	clippy::missing_errors_doc,
	clippy::module_name_repetitions,
	clippy::future_not_send
)]

//! Media ingestion and preview pipeline.
//!
//! [`Scanner`] walks a directory tree into a [`Catalog`], [`hash_files`] fingerprints files,
//! [`PreviewGenerator`] writes thumbnails and scrub frames, and [`ThumbnailDiagnostics`] finds
//! and removes artifacts no catalog record points at anymore. Every entry point takes its
//! progress reporter and cancellation token explicitly; nothing here installs global state.

pub mod catalog;
pub mod classify;
pub mod config;
pub mod diagnostics;
pub mod hasher;
pub mod preview;
pub mod progress;
pub mod scanner;
pub mod store;
pub mod validator;

pub use catalog::{
	ArtifactReferences, Catalog, CatalogError, DiscoveredFile, FileId, FileRecord, MemoryCatalog,
	ProfileId, Upserted,
};
pub use config::{ConfigError, PipelineConfig};
pub use diagnostics::{CleanupResult, DiagnosticResult, DiagnosticsError, ThumbnailDiagnostics};
pub use hasher::{hash_file, hash_files, Fingerprint, HashMode, HashOptions, HashResults};
pub use preview::{PreviewGenerator, RegenerationItem, RegenerationResult};
pub use progress::{
	ChannelReporter, NoopReporter, ProgressReporter, ProgressUpdate, ScanPhase, ScanProgress,
};
pub use scanner::{ScanReport, ScanStatus, Scanner, ScannerError};
pub use store::ArtifactStore;
pub use validator::{PathErrorKind, PathValidationResult};

pub use tokio_util::sync::CancellationToken;
