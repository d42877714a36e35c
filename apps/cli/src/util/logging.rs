use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context as _};
use tracing_appender::{
	non_blocking::WorkerGuard,
	rolling::{RollingFileAppender, Rotation},
};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_FILTER: &str = "info,mc_core=debug";
const VERBOSE_FILTER: &str = "debug,mc_core=trace";

/// Logs go to stderr so stdout stays parseable; `RUST_LOG` wins over both defaults.
///
/// The returned guard flushes the log file when dropped, keep it alive until exit.
pub fn init(verbose: bool, log_file: Option<&Path>) -> anyhow::Result<Option<WorkerGuard>> {
	let env_filter = if verbose { VERBOSE_FILTER } else { DEFAULT_FILTER };

	let (file_layer, guard) = match log_file {
		Some(path) => {
			let (dir, file_name) = split_log_path(path)?;
			let appender = RollingFileAppender::builder()
				.rotation(Rotation::NEVER)
				.filename_prefix(file_name)
				.build(&dir)
				.with_context(|| format!("failed to open log file {}", path.display()))?;
			let (writer, guard) = tracing_appender::non_blocking(appender);

			let layer = fmt::layer()
				.with_target(true)
				.with_ansi(false)
				.with_writer(writer);

			(Some(layer), Some(guard))
		}
		None => (None, None),
	};

	tracing_subscriber::registry()
		.with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(env_filter)))
		.with(
			fmt::layer()
				.with_target(true)
				.with_thread_ids(verbose)
				.with_writer(std::io::stderr),
		)
		.with(file_layer)
		.try_init()
		.context("failed to install tracing subscriber")?;

	Ok(guard)
}

/// Directory and file name of a log file, a bare name lives in the current directory
fn split_log_path(path: &Path) -> anyhow::Result<(PathBuf, String)> {
	let file_name = path
		.file_name()
		.and_then(|name| name.to_str())
		.ok_or_else(|| anyhow!("log file must end in a UTF-8 file name: {}", path.display()))?;

	let dir = match path.parent() {
		Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
		_ => PathBuf::from("."),
	};

	Ok((dir, file_name.to_string()))
}
