#![allow(dead_code)]

use mc_core::{ProgressReporter, ProgressUpdate, ScanPhase, ScanProgress};

use std::{
	path::Path,
	sync::{Arc, Mutex},
};

use image::{ImageFormat, Rgb, RgbImage};

pub fn write_png(path: impl AsRef<Path>, width: u32, height: u32) {
	let path = path.as_ref();
	if let Some(parent) = path.parent() {
		std::fs::create_dir_all(parent).unwrap();
	}
	RgbImage::from_pixel(width, height, Rgb([90, 140, 200]))
		.save_with_format(path, ImageFormat::Png)
		.unwrap();
}

pub fn write_bytes(path: impl AsRef<Path>, bytes: &[u8]) {
	let path = path.as_ref();
	if let Some(parent) = path.parent() {
		std::fs::create_dir_all(parent).unwrap();
	}
	std::fs::write(path, bytes).unwrap();
}

/// A reporter keeping every update it gets
#[derive(Clone, Default)]
pub struct Recorder {
	updates: Arc<Mutex<Vec<ProgressUpdate>>>,
}

impl ProgressReporter for Recorder {
	fn progress(&self, update: ProgressUpdate) {
		self.updates.lock().unwrap().push(update);
	}
}

impl Recorder {
	pub fn updates(&self) -> Vec<ProgressUpdate> {
		self.updates.lock().unwrap().clone()
	}

	pub fn scan_updates(&self) -> Vec<ScanProgress> {
		self.updates()
			.into_iter()
			.filter_map(|update| match update {
				ProgressUpdate::Scan(progress) => Some(progress),
				ProgressUpdate::Item { .. } => None,
			})
			.collect()
	}

	pub fn phase(&self, phase: ScanPhase) -> Vec<ScanProgress> {
		self.scan_updates()
			.into_iter()
			.filter(|progress| progress.phase == phase)
			.collect()
	}

	pub fn items(&self) -> Vec<(usize, usize)> {
		self.updates()
			.into_iter()
			.filter_map(|update| match update {
				ProgressUpdate::Item { current, total, .. } => Some((current, total)),
				ProgressUpdate::Scan(_) => None,
			})
			.collect()
	}
}
