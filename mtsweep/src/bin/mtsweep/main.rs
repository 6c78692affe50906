//! Memory-translation simulator sweep (`mtsweep`)

// Modules
mod args;

// Imports
use {
	self::args::Args,
	anyhow::Context,
	clap::Parser,
	mtsweep::{
		layout::RunSuffixes,
		workload,
		Config,
		CoreAffinity,
		Experiment,
		RunExecutor,
		Scheduler,
		WorkerPolicy,
	},
	mtsweep_util::logger,
};

fn main() -> Result<(), anyhow::Error> {
	// Get arguments
	let args = Args::parse();
	logger::pre_init::debug(format!("Args: {args:?}"));

	// Initialize logging
	logger::init(args.log_file.as_deref(), args.log_file_append);

	// Read the config file, if any
	let config = match &args.config_file {
		Some(config_file) => Config::load(config_file).context("Unable to load config file")?,
		None => Config::default(),
	};
	tracing::debug!(?config, "Loaded config");
	let space = config.space()?;

	// Select and resolve the workloads before doing anything else
	let workload_specs = workload::select(args.workload_type, args.workload_num).context("Unable to select workloads")?;
	let workloads = workload::resolve_all(&workload_specs, &args.apps_dir)?;

	// Create the experiment
	let experiment = Experiment::create(
		&args.results_dir,
		&args.exp_name,
		&args.exp_purpose,
		args.workload_type.name(),
		chrono::Local::now(),
	)
	.context("Unable to create experiment")?;
	experiment
		.write_readme(&space, &workload_specs)
		.context("Unable to write experiment readme")?;

	// Expand every run
	let descriptors = space.expand(
		&workloads,
		config.repetitions,
		&experiment.dir,
		&mut RunSuffixes::new(rand::thread_rng()),
	);
	let policy = WorkerPolicy {
		parallel_factor: args.parallel_factor,
		ceiling:         match (args.workload_type.worker_ceiling(), config.max_workers) {
			(Some(lhs), Some(rhs)) => Some(lhs.min(rhs)),
			(lhs, rhs) => lhs.or(rhs),
		},
	};
	let workers = policy.worker_count(space.len(), descriptors.len());
	tracing::info!(
		configs = space.len(),
		workloads = workloads.len(),
		runs = descriptors.len(),
		?policy,
		"Expanded configuration space"
	);

	// Then run them all
	let executor = RunExecutor::new(config.simulator.clone(), CoreAffinity::available(), &experiment.name);
	let scheduler = Scheduler::new(executor, workers);
	let report = scheduler.run(&descriptors);

	experiment
		.write_summary(&report, chrono::Local::now())
		.context("Unable to write experiment summary")?;
	for tally in &report.per_workload {
		tracing::info!(
			workload = %tally.name,
			succeeded = tally.succeeded,
			total = tally.total,
			"Workload finished"
		);
	}
	tracing::info!(dir = ?experiment.dir, "Results written");

	Ok(())
}
