//! Experiment scheduler
//!
//! Runs every descriptor on a fixed pool of worker threads. Workers pop
//! descriptors from a single shared queue, in submission order, and each
//! blocks on one simulator process at a time.

// Imports
use {
	crate::{
		executor::{RunExecutor, RunResult},
		space::RunDescriptor,
	},
	std::{
		collections::VecDeque,
		sync::{Mutex, PoisonError},
		thread,
		time::{Duration, Instant},
	},
};

/// Worker policy
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct WorkerPolicy {
	/// Workers per distinct configuration
	pub parallel_factor: usize,

	/// Hard ceiling on the number of workers
	pub ceiling: Option<usize>,
}

impl WorkerPolicy {
	/// Returns the number of workers to use for `runs` runs over `distinct_configs` configurations.
	///
	/// Always at least 1 if there are any runs.
	#[must_use]
	pub fn worker_count(&self, distinct_configs: usize, runs: usize) -> usize {
		let mut workers = self.parallel_factor.saturating_mul(distinct_configs).min(runs);
		if let Some(ceiling) = self.ceiling {
			workers = workers.min(ceiling);
		}

		workers.max(usize::from(runs > 0))
	}
}

/// Scheduler
#[derive(Debug)]
pub struct Scheduler {
	executor: RunExecutor,
	workers:  usize,
}

impl Scheduler {
	/// Creates a new scheduler with a fixed number of workers
	#[must_use]
	pub fn new(executor: RunExecutor, workers: usize) -> Self {
		Self {
			executor,
			workers: workers.max(1),
		}
	}

	/// Returns the number of workers
	#[must_use]
	pub const fn workers(&self) -> usize {
		self.workers
	}

	/// Runs all descriptors to completion
	pub fn run(&self, descriptors: &[RunDescriptor]) -> SweepReport {
		let start = Instant::now();
		tracing::info!(
			runs = descriptors.len(),
			workers = self.workers,
			"Running {} tasks with {} parallel workers",
			descriptors.len(),
			self.workers
		);

		let queue = Mutex::new(descriptors.iter().collect::<VecDeque<_>>());
		let results = thread::scope(|s| {
			let handles = (0..self.workers)
				.map(|worker_idx| {
					let queue = &queue;
					s.spawn(move || {
						let mut results = vec![];
						loop {
							// Note: The lock is only held for the pop
							let Some(descriptor) = queue.lock().unwrap_or_else(PoisonError::into_inner).pop_front()
							else {
								break;
							};
							results.push(self.executor.execute(descriptor));
						}

						tracing::trace!(worker_idx, runs = results.len(), "Worker finished");
						results
					})
				})
				.collect::<Vec<_>>();

			handles
				.into_iter()
				.flat_map(|handle| match handle.join() {
					Ok(results) => results,
					Err(_) => {
						tracing::error!("Worker panicked, its results are lost");
						vec![]
					},
				})
				.collect::<Vec<_>>()
		});

		let report = SweepReport::new(descriptors, results, start.elapsed());
		tracing::info!(
			"Completed {} of {} tasks successfully in {:.2?}",
			report.succeeded,
			report.total,
			report.elapsed
		);

		report
	}
}

/// Per-workload tally
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct WorkloadTally {
	/// Workload name
	pub name: String,

	/// Workload arguments
	pub args: Vec<String>,

	/// Successful runs
	pub succeeded: usize,

	/// All runs
	pub total: usize,
}

/// Sweep report
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct SweepReport {
	/// Results, ordered by descriptor
	pub results: Vec<RunResult>,

	/// Successful runs
	pub succeeded: usize,

	/// All runs
	pub total: usize,

	/// Tallies per workload, in the order workloads were first scheduled
	pub per_workload: Vec<WorkloadTally>,

	/// Time taken by the whole sweep
	pub elapsed: Duration,
}

impl SweepReport {
	/// Builds the report of `results`, in any order.
	///
	/// Descriptors without a result count as failed.
	#[must_use]
	pub fn new(descriptors: &[RunDescriptor], mut results: Vec<RunResult>, elapsed: Duration) -> Self {
		results.sort_by_key(|result| result.idx);

		let mut per_workload = Vec::<WorkloadTally>::new();
		for descriptor in descriptors {
			let spec = &descriptor.workload.spec;
			let success = results
				.binary_search_by_key(&descriptor.idx, |result| result.idx)
				.is_ok_and(|pos| results[pos].success);

			let tally = match per_workload.iter_mut().position(|tally| tally.name == spec.name) {
				Some(pos) => &mut per_workload[pos],
				None => {
					per_workload.push(WorkloadTally {
						name:      spec.name.clone(),
						args:      spec.args.clone(),
						succeeded: 0,
						total:     0,
					});
					let last = per_workload.len() - 1;
					&mut per_workload[last]
				},
			};
			tally.total += 1;
			tally.succeeded += usize::from(success);
		}

		Self {
			succeeded: results.iter().filter(|result| result.success).count(),
			total: descriptors.len(),
			results,
			per_workload,
			elapsed,
		}
	}
}
