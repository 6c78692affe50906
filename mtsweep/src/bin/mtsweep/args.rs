//! Arguments

// Imports
use {mtsweep::WorkloadTier, std::path::PathBuf};

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

	/// Workload type
	#[clap(short = 't', long = "workload-type", value_enum)]
	pub workload_type: WorkloadTier,

	/// Index of a single workload of the type to run
	#[clap(short = 'n', long = "workload-num")]
	pub workload_num: Option<usize>,

	/// Workers per distinct configuration
	#[clap(short = 'p', long = "parallel-factor", default_value_t = 2)]
	pub parallel_factor: usize,

	/// Results directory
	#[clap(short = 'r', long = "results-dir", default_value = "experiment-results")]
	pub results_dir: PathBuf,

	/// Experiment name
	#[clap(short = 'e', long = "exp-name", default_value = "memory_simulation")]
	pub exp_name: String,

	/// Experiment purpose
	#[clap(short = 'u', long = "exp-purpose")]
	pub exp_purpose: String,

	/// Workload root directory
	#[clap(short = 'a', long = "apps-dir", default_value = "apps")]
	pub apps_dir: PathBuf,

	/// Sweep config file
	///
	/// Overrides the simulator paths and configuration axes.
	#[clap(long = "config")]
	pub config_file: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
	use {super::*, clap::Parser};

	#[test]
	fn defaults() {
		let args = Args::try_parse_from(["mtsweep", "-t", "super-huge", "-u", "Testing"]).expect("Valid args");
		assert_eq!(args.workload_type, WorkloadTier::SuperHuge);
		assert_eq!(args.workload_num, None);
		assert_eq!(args.parallel_factor, 2);
		assert_eq!(args.results_dir, PathBuf::from("experiment-results"));
		assert_eq!(args.exp_name, "memory_simulation");
		assert_eq!(args.apps_dir, PathBuf::from("apps"));
		assert_eq!(args.config_file, None);
	}

	#[test]
	fn requires_type_and_purpose() {
		assert!(Args::try_parse_from(["mtsweep", "-u", "Testing"]).is_err());
		assert!(Args::try_parse_from(["mtsweep", "-t", "tiny"]).is_err());
		assert!(Args::try_parse_from(["mtsweep", "-t", "gigantic", "-u", "Testing"]).is_err());
	}
}
