//! Progress reporting for pipeline runs.
//!
//! Reporters are injected into every entry point. The pipeline never waits on them:
//! [`ChannelReporter`] drops updates when its queue is full instead of applying back-pressure.

use std::{fmt, path::PathBuf};

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::trace;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanPhase {
	Counting,
	Scanning,
	Complete,
	Error,
}

/// `current` never goes backwards within a phase. `total` is a best effort estimate taken
/// during [`ScanPhase::Counting`] and may only shrink afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanProgress {
	pub phase: ScanPhase,
	pub current: u64,
	pub total: u64,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub current_file: Option<PathBuf>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub message: Option<String>,
}

impl ScanProgress {
	#[must_use]
	pub const fn new(phase: ScanPhase, current: u64, total: u64) -> Self {
		Self {
			phase,
			current,
			total,
			current_file: None,
			message: None,
		}
	}

	#[must_use]
	pub fn with_file(mut self, path: impl Into<PathBuf>) -> Self {
		self.current_file = Some(path.into());
		self
	}

	#[must_use]
	pub fn with_message(mut self, message: impl Into<String>) -> Self {
		self.message = Some(message.into());
		self
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProgressUpdate {
	Scan(ScanProgress),
	/// Per item progress of a batch (hashing, regeneration), sent after every item
	Item {
		current: usize,
		total: usize,
		path: Option<PathBuf>,
	},
}

pub trait ProgressReporter: Send + Sync {
	fn progress(&self, update: ProgressUpdate);
}

impl<F> ProgressReporter for F
where
	F: Fn(ProgressUpdate) + Send + Sync,
{
	fn progress(&self, update: ProgressUpdate) {
		self(update);
	}
}

/// Discards every update
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopReporter;

impl ProgressReporter for NoopReporter {
	fn progress(&self, _update: ProgressUpdate) {}
}

/// Forwards updates over a bounded channel, dropping them when the receiver lags behind
#[derive(Clone)]
pub struct ChannelReporter {
	tx: mpsc::Sender<ProgressUpdate>,
}

impl fmt::Debug for ChannelReporter {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ChannelReporter")
			.field("capacity", &self.tx.max_capacity())
			.finish()
	}
}

impl ChannelReporter {
	#[must_use]
	pub fn new(capacity: usize) -> (Self, mpsc::Receiver<ProgressUpdate>) {
		let (tx, rx) = mpsc::channel(capacity.max(1));
		(Self { tx }, rx)
	}
}

impl ProgressReporter for ChannelReporter {
	fn progress(&self, update: ProgressUpdate) {
		match self.tx.try_send(update) {
			Ok(()) => {}
			Err(TrySendError::Full(update)) => {
				trace!(?update, "Progress receiver is lagging, dropping update");
			}
			// Nobody is listening anymore, which is fine
			Err(TrySendError::Closed(_)) => {}
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	use std::sync::Mutex;

	#[test]
	fn closures_are_reporters() {
		let seen = Mutex::new(vec![]);
		let reporter = |update: ProgressUpdate| seen.lock().unwrap().push(update);

		reporter.progress(ProgressUpdate::Item {
			current: 1,
			total: 2,
			path: None,
		});

		assert_eq!(seen.lock().unwrap().len(), 1);
	}

	#[tokio::test]
	async fn channel_reporter_never_blocks() {
		let (reporter, mut rx) = ChannelReporter::new(2);

		for current in 1..=5 {
			reporter.progress(ProgressUpdate::Scan(ScanProgress::new(
				ScanPhase::Scanning,
				current,
				5,
			)));
		}

		// Only the first two fit, the rest were dropped without waiting
		let mut received = vec![];
		while let Ok(update) = rx.try_recv() {
			received.push(update);
		}
		assert_eq!(received.len(), 2);

		drop(rx);
		reporter.progress(ProgressUpdate::Scan(ScanProgress::new(
			ScanPhase::Complete,
			5,
			5,
		)));
	}

	#[test]
	fn scan_progress_serializes_without_empty_fields() {
		let json = serde_json::to_string(&ScanProgress::new(ScanPhase::Counting, 0, 0)).unwrap();
		assert_eq!(json, r#"{"phase":"counting","current":0,"total":0}"#);
	}
}
