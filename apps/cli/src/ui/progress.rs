//! Terminal progress bars fed by pipeline progress updates

use mc_core::{ProgressReporter, ProgressUpdate, ScanPhase};

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

const BAR_TEMPLATE: &str = "{spinner:.yellow} {msg:12} [{bar:40.blue/grey}] {pos}/{len}";
const SPINNER_TEMPLATE: &str = "{spinner:.yellow} {msg:12} {pos}";

/// Draws a single bar on stderr. Hidden when output is JSON so nothing but the result is printed.
pub struct BarReporter {
	bar: ProgressBar,
}

impl BarReporter {
	pub fn new(visible: bool) -> Self {
		let bar = ProgressBar::with_draw_target(
			None,
			if visible {
				ProgressDrawTarget::stderr()
			} else {
				ProgressDrawTarget::hidden()
			},
		);
		bar.set_style(spinner_style());

		Self { bar }
	}

	pub fn finish(&self) {
		self.bar.finish_and_clear();
	}
}

impl ProgressReporter for BarReporter {
	fn progress(&self, update: ProgressUpdate) {
		match update {
			ProgressUpdate::Scan(progress) => match progress.phase {
				ScanPhase::Counting => {
					self.bar.set_message("counting");
					self.bar.set_position(progress.current);
					self.bar.tick();
				}
				ScanPhase::Scanning => {
					if self.bar.length().is_none() {
						self.bar.set_style(bar_style());
					}
					self.bar.set_message("scanning");
					self.bar.set_length(progress.total);
					self.bar.set_position(progress.current);
				}
				ScanPhase::Complete | ScanPhase::Error => {
					self.bar.set_length(progress.total);
					self.bar.set_position(progress.current);
					self.bar.finish_and_clear();
				}
			},
			ProgressUpdate::Item {
				current,
				total,
				path,
			} => {
				if self.bar.length().is_none() {
					self.bar.set_style(bar_style());
				}
				self.bar.set_length(total as u64);
				self.bar.set_position(current as u64);
				if let Some(name) = path.as_deref().and_then(|p| p.file_name()) {
					self.bar.set_message(name.to_string_lossy().into_owned());
				}
			}
		}
	}
}

fn bar_style() -> ProgressStyle {
	ProgressStyle::with_template(BAR_TEMPLATE)
		.unwrap_or_else(|_| ProgressStyle::default_bar())
		.progress_chars("█▉▊▋▌▍▎▏ ")
}

fn spinner_style() -> ProgressStyle {
	ProgressStyle::with_template(SPINNER_TEMPLATE)
		.unwrap_or_else(|_| ProgressStyle::default_spinner())
		.tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏ ")
}
