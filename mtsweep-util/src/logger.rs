//! Logger
//!
//! Logs to stderr, filtered by `RUST_LOG` (`info` by default), and optionally
//! to a file, filtered by `RUST_LOG_FILE` (`debug` by default).

// Imports
use {
	std::{
		fs,
		io,
		path::Path,
		sync::{Mutex, PoisonError},
	},
	tracing_subscriber::{prelude::*, EnvFilter},
};

/// Initializes the logger.
///
/// Any messages logged through [`pre_init`] are emitted right after.
pub fn init(log_file: Option<&Path>, log_file_append: bool) {
	// Terminal layer
	let term_layer = tracing_subscriber::fmt::layer()
		.with_writer(io::stderr)
		.with_filter(self::env_filter("RUST_LOG", "info"));

	// File layer, if we got a file
	let file_layer = log_file.and_then(|path| match self::open_log_file(path, log_file_append) {
		Ok(file) => Some(
			tracing_subscriber::fmt::layer()
				.with_ansi(false)
				.with_writer(Mutex::new(file))
				.with_filter(self::env_filter("RUST_LOG_FILE", "debug")),
		),
		Err(err) => {
			pre_init::warn(format!("Unable to open log file {path:?}: {err}"));
			None
		},
	});

	if let Err(err) = tracing_subscriber::registry()
		.with(term_layer)
		.with(file_layer)
		.try_init()
	{
		eprintln!("Unable to initialize logger: {err}");
	}

	pre_init::flush();
}

/// Creates an env filter from `var`, falling back to `default`
fn env_filter(var: &str, default: &str) -> EnvFilter {
	EnvFilter::try_from_env(var).unwrap_or_else(|_| EnvFilter::new(default))
}

/// Opens the log file, either appending or truncating
fn open_log_file(path: &Path, append: bool) -> Result<fs::File, io::Error> {
	fs::OpenOptions::new()
		.create(true)
		.write(true)
		.append(append)
		.truncate(!append)
		.open(path)
}

/// Logging before the logger is initialized
pub mod pre_init {
	use super::*;

	/// Level of a buffered message
	#[derive(Clone, Copy, PartialEq, Eq, Debug)]
	pub enum Level {
		Debug,
		Warn,
	}

	/// Messages buffered until the logger is initialized
	static MESSAGES: Mutex<Vec<(Level, String)>> = Mutex::new(Vec::new());

	/// Buffers a debug message
	pub fn debug(msg: String) {
		self::push(Level::Debug, msg);
	}

	/// Buffers a warning
	pub fn warn(msg: String) {
		self::push(Level::Warn, msg);
	}

	fn push(level: Level, msg: String) {
		MESSAGES.lock().unwrap_or_else(PoisonError::into_inner).push((level, msg));
	}

	/// Takes all buffered messages
	pub(super) fn take() -> Vec<(Level, String)> {
		std::mem::take(&mut *MESSAGES.lock().unwrap_or_else(PoisonError::into_inner))
	}

	/// Emits all buffered messages
	pub(super) fn flush() {
		for (level, msg) in self::take() {
			match level {
				Level::Debug => tracing::debug!("{msg}"),
				Level::Warn => tracing::warn!("{msg}"),
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use {super::*, std::io::Write};

	#[test]
	fn pre_init_buffers_in_order() {
		pre_init::debug("Args: first".to_owned());
		pre_init::warn("second".to_owned());

		let messages = pre_init::take();
		let first = messages.iter().position(|(_, msg)| msg == "Args: first");
		let second = messages.iter().position(|(_, msg)| msg == "second");
		assert!(first < second, "Expected buffered order to be kept: {messages:?}");
		assert!(messages.contains(&(pre_init::Level::Warn, "second".to_owned())));
	}

	#[test]
	fn log_file_truncates_unless_appending() {
		let dir = tempfile::tempdir().expect("Unable to create temp dir");
		let path = dir.path().join("sweep.log");

		writeln!(open_log_file(&path, false).expect("open"), "one").expect("write");
		writeln!(open_log_file(&path, true).expect("open"), "two").expect("write");
		assert_eq!(fs::read_to_string(&path).expect("read"), "one\ntwo\n");

		writeln!(open_log_file(&path, false).expect("open"), "three").expect("write");
		assert_eq!(fs::read_to_string(&path).expect("read"), "three\n");
	}
}
