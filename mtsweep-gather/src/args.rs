//! Arguments

// Imports
use std::path::PathBuf;

/// Arguments
#[derive(Debug)]
#[derive(clap::Parser)]
pub struct Args {
	/// Log file
	///
	/// Specifies a file to perform verbose logging to.
	/// You can use `RUST_LOG_FILE` to set filtering options
	#[clap(long = "log-file")]
	pub log_file: Option<PathBuf>,

	/// Whether to append to the log file
	#[clap(long = "log-file-append")]
	pub log_file_append: bool,

	/// Results directory, containing every experiment
	#[clap(short = 'd', long = "base-dir", default_value = "../experiment-results")]
	pub base_dir: PathBuf,

	/// Csv file with every run
	#[clap(short = 'o', long = "output", default_value = "memory_sim_results.csv")]
	pub output: PathBuf,

	/// Csv file with the mean of every configuration
	#[clap(short = 's', long = "summary", default_value = "memory_sim_summary.csv")]
	pub summary: PathBuf,

	/// Directory for the per-workload csv files
	#[clap(short = 'w', long = "workload-csvs", default_value = "workload_results")]
	pub workload_csvs: PathBuf,

	/// Directory for the per-timestamp csv files
	#[clap(short = 't', long = "timestamp-csvs", default_value = "timestamp_results")]
	pub timestamp_csvs: PathBuf,

	/// Csv file comparing the translation cache enabled against disabled
	#[clap(short = 'c', long = "comparative", default_value = "toc_comparative.csv")]
	pub comparative: PathBuf,
}
