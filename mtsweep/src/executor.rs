//! Run executor

// Imports
use {
	crate::{command::SimulatorCommand, config::SimulatorConfig, space::RunDescriptor},
	anyhow::Context,
	mtsweep_util::{DisplayWrapper, StrTail},
	std::{
		fmt,
		fs,
		num::NonZeroUsize,
		path::PathBuf,
		process,
		sync::{
			atomic::{self, AtomicUsize},
			Arc,
		},
		thread,
		time::{Duration, Instant},
	},
};

/// Keywords that make a report line part of the summary.
///
/// Matched as case-sensitive substrings.
pub const SUMMARY_KEYWORDS: [&str; 7] = ["translation", "cache", "page", "miss", "hit", "cycle", "walk"];

/// Maximum number of characters of a failed run's output that are logged
pub const ERROR_EXCERPT_LEN: usize = 200;

/// Core affinity.
///
/// Hands out cores round-robin, from a counter shared by every clone.
#[derive(Clone, Debug)]
pub struct CoreAffinity {
	next:  Arc<AtomicUsize>,
	cores: usize,
}

impl CoreAffinity {
	/// Creates a core affinity over `cores` cores
	#[must_use]
	pub fn new(cores: usize) -> Self {
		Self {
			next:  Arc::new(AtomicUsize::new(0)),
			cores: cores.max(1),
		}
	}

	/// Creates a core affinity over all available cores
	#[must_use]
	pub fn available() -> Self {
		Self::new(thread::available_parallelism().map_or(1, NonZeroUsize::get))
	}

	/// Returns the next core
	pub fn next_core(&self) -> usize {
		self.next.fetch_add(1, atomic::Ordering::Relaxed) % self.cores
	}
}

/// Returns all lines of `report` with a summary keyword
pub fn key_statistics(report: &str) -> impl Iterator<Item = &str> {
	report
		.lines()
		.map(str::trim)
		.filter(|line| SUMMARY_KEYWORDS.iter().any(|keyword| line.contains(keyword)))
}

/// Result of a run
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct RunResult {
	/// Descriptor index
	pub idx: usize,

	/// Workload name
	pub workload: String,

	/// Whether the run succeeded
	pub success: bool,

	/// Exit code, if the simulator exited normally
	pub exit_code: Option<i32>,

	/// Core the run was pinned to
	pub core: Option<usize>,

	/// Combined stdout and stderr
	pub progress: PathBuf,

	/// Error excerpt, if the run failed
	pub error: Option<String>,

	/// Time taken
	pub elapsed: Duration,
}

/// Run executor
#[derive(Clone, Debug)]
pub struct RunExecutor {
	simulator:       SimulatorConfig,
	affinity:        CoreAffinity,
	experiment_name: String,
}

impl RunExecutor {
	/// Creates a new executor
	#[must_use]
	pub fn new(simulator: SimulatorConfig, affinity: CoreAffinity, experiment_name: impl Into<String>) -> Self {
		Self {
			simulator,
			affinity,
			experiment_name: experiment_name.into(),
		}
	}

	/// Executes a run.
	///
	/// Failures of the simulator are reported in the result, never returned.
	pub fn execute(&self, descriptor: &RunDescriptor) -> RunResult {
		let start = Instant::now();

		let mut cmd = SimulatorCommand::new(
			&self.simulator,
			&descriptor.config,
			&descriptor.workload,
			&descriptor.files.output,
		);
		if descriptor.workload.spec.pinned {
			cmd = cmd.pin_to_core(self.affinity.next_core());
		}

		tracing::info!(
			workload = %descriptor.workload.spec.name,
			config = %descriptor.config.id(),
			suffix = %descriptor.suffix,
			core = ?cmd.core(),
			"Running"
		);
		tracing::debug!(%cmd, "Simulator command");

		let outcome = self.run(descriptor, &cmd);
		let elapsed = start.elapsed();
		let mut result = RunResult {
			idx: descriptor.idx,
			workload: descriptor.workload.spec.name.clone(),
			success: false,
			exit_code: None,
			core: cmd.core(),
			progress: descriptor.files.progress.clone(),
			error: None,
			elapsed,
		};

		match outcome {
			Ok(status) if status.success() => {
				result.success = true;
				result.exit_code = status.code();
				tracing::info!(
					workload = %descriptor.workload.spec.name,
					config = %descriptor.config.id(),
					?elapsed,
					"Completed"
				);

				if let Err(err) = self.write_summary(descriptor) {
					tracing::warn!(summary = ?descriptor.files.summary, "Unable to write summary: {err:?}");
				}
			},
			Ok(status) => {
				result.exit_code = status.code();
				let excerpt = self::progress_excerpt(descriptor);
				tracing::warn!(
					workload = %descriptor.workload.spec.name,
					config = %descriptor.config.id(),
					%status,
					"Simulator failed: {excerpt}"
				);
				result.error = Some(excerpt);
			},
			Err(err) => {
				tracing::warn!(
					workload = %descriptor.workload.spec.name,
					config = %descriptor.config.id(),
					"Unable to run simulator: {err:?}"
				);
				result.error = Some(format!("{err:#}").tail_chars(ERROR_EXCERPT_LEN).to_owned());
			},
		}

		result
	}

	/// Runs the simulator until it exits
	fn run(&self, descriptor: &RunDescriptor, cmd: &SimulatorCommand) -> Result<process::ExitStatus, anyhow::Error> {
		if let Some(workload_dir) = descriptor.files.output.parent() {
			fs::create_dir_all(workload_dir)
				.with_context(|| format!("Unable to create workload directory {workload_dir:?}"))?;
		}

		let progress = fs::File::create(&descriptor.files.progress).context("Unable to create progress file")?;
		let progress_err = progress.try_clone().context("Unable to clone progress file")?;

		let mut child = cmd
			.to_command()
			.stdin(process::Stdio::null())
			.stdout(progress)
			.stderr(progress_err)
			.spawn()
			.context("Unable to spawn simulator")?;

		child.wait().context("Unable to wait for simulator")
	}

	/// Writes the summary of a successful run
	fn write_summary(&self, descriptor: &RunDescriptor) -> Result<(), anyhow::Error> {
		let report = match fs::read_to_string(&descriptor.files.output) {
			Ok(report) => Some(report),
			Err(err) => {
				tracing::warn!(output = ?descriptor.files.output, ?err, "Unable to read report");
				None
			},
		};

		let summary = self.summary(descriptor, report.as_deref()).to_string();
		fs::write(&descriptor.files.summary, summary).context("Unable to write summary file")
	}

	/// Returns the summary of a run
	fn summary<'a>(&'a self, descriptor: &'a RunDescriptor, report: Option<&'a str>) -> impl fmt::Display + 'a {
		DisplayWrapper::new(move |f| {
			let config = &descriptor.config;
			writeln!(f, "Experiment: {}", self.experiment_name)?;
			writeln!(f, "Workload: {}", descriptor.workload.spec.name)?;
			writeln!(f, "Options: {}", descriptor.workload.spec.args.join(" "))?;
			writeln!(f, "Configuration:")?;
			writeln!(f, "  Config ID: {}", config.id())?;
			writeln!(f, "  PGD PWC Size: {}, Ways: {}", config.pwc.pgd.entries, config.pwc.pgd.ways)?;
			writeln!(f, "  PUD PWC Size: {}, Ways: {}", config.pwc.pud.entries, config.pwc.pud.ways)?;
			writeln!(f, "  PMD PWC Size: {}, Ways: {}", config.pwc.pmd.entries, config.pwc.pmd.ways)?;
			writeln!(
				f,
				"  Page Tables: PGD {}, PUD {}, PMD {}, PTE {}",
				config.page_tables.pgd, config.page_tables.pud, config.page_tables.pmd, config.page_tables.pte
			)?;
			writeln!(f, "  TOC Enabled: {}, Size: {}", config.toc.enabled, config.toc.size)?;
			writeln!(f, "  Physical Memory: {} GB", config.memory.phys_mem_gb)?;
			writeln!(f, "  L1 TLB Size: {}", config.memory.l1_tlb_size)?;
			writeln!(f, "  L2 TLB Size: {}", config.memory.l2_tlb_size)?;
			writeln!(f, "  PTE Cachable: {}", u8::from(config.memory.pte_cachable))?;
			writeln!(f)?;

			let Some(report) = report else {
				return Ok(());
			};
			writeln!(f, "Key Statistics:")?;
			let mut found = false;
			for line in self::key_statistics(report) {
				writeln!(f, "  {line}")?;
				found = true;
			}
			if !found {
				writeln!(f, "  No statistics found in output file")?;
			}

			Ok(())
		})
	}
}

/// Returns the tail of a run's progress file
fn progress_excerpt(descriptor: &RunDescriptor) -> String {
	match fs::read(&descriptor.files.progress) {
		Ok(progress) => String::from_utf8_lossy(&progress)
			.trim_end()
			.tail_chars(ERROR_EXCERPT_LEN)
			.to_owned(),
		Err(err) => format!("<unable to read progress file: {err}>"),
	}
}

#[cfg(test)]
mod tests {
	use {
		super::*,
		crate::{
			axis::{MemoryConfig, PageTableSizes, PwcGeometry, TocConfig},
			layout::RunFiles,
			space::SimConfig,
			workload::{ResolvedWorkload, WorkloadSpec},
		},
		std::{collections::HashSet, path::Path},
	};

	fn descriptor(dir: &Path, exe: &Path, pinned: bool) -> RunDescriptor {
		let config = SimConfig {
			page_tables: PageTableSizes::default(),
			pwc:         PwcGeometry::defaults()[0],
			toc:         TocConfig { enabled: false, size: 0 },
			memory:      MemoryConfig::default(),
		};
		let spec = WorkloadSpec::new("BTree", ["1", "1"]);
		RunDescriptor {
			idx: 0,
			config,
			workload: ResolvedWorkload {
				spec: match pinned {
					true => spec.pinned(),
					false => spec,
				},
				exe:  exe.to_path_buf(),
				args: vec!["1".to_owned(), "1".to_owned()],
			},
			suffix: "abc123".to_owned(),
			files: RunFiles::new(&dir.join("BTree"), &config.id(), "abc123"),
		}
	}

	#[test]
	fn affinity_is_round_robin() {
		let affinity = CoreAffinity::new(3);
		let cores = (0..7).map(|_| affinity.next_core()).collect::<Vec<_>>();
		assert_eq!(cores, [0, 1, 2, 0, 1, 2, 0]);

		// Clones share the counter
		let other = affinity.clone();
		assert_eq!(other.next_core(), 1);
		assert_eq!(affinity.next_core(), 2);
	}

	#[test]
	fn concurrent_affinity_is_distinct() {
		let affinity = CoreAffinity::new(8);
		let cores = thread::scope(|s| {
			let handles = (0..8)
				.map(|_| s.spawn(|| affinity.next_core()))
				.collect::<Vec<_>>();
			handles
				.into_iter()
				.map(|handle| handle.join().expect("Thread panicked"))
				.collect::<HashSet<_>>()
		});
		assert_eq!(cores.len(), 8);
	}

	#[test]
	fn key_statistics_are_case_sensitive() {
		let report = "L1 TLB Hit 120 60.0%\nPage Table Entry Cache hits ratio 84.00%\n  Total page tables: 12\nTOC Size: 64\nfull walk done\n";
		assert_eq!(key_statistics(report).collect::<Vec<_>>(), [
			"Page Table Entry Cache hits ratio 84.00%",
			"Total page tables: 12",
			"full walk done",
		]);
	}

	#[test]
	fn summary_lists_config_and_statistics() {
		let dir = tempfile::tempdir().expect("Unable to create temp dir");
		let executor = RunExecutor::new(SimulatorConfig::default(), CoreAffinity::new(1), "exp");
		let descriptor = descriptor(dir.path(), Path::new("/apps/BTree"), false);

		let summary = executor
			.summary(&descriptor, Some("Total page tables: 12\nTOC Size: 64\n"))
			.to_string();
		assert!(summary.starts_with("Experiment: exp\nWorkload: BTree\nOptions: 1 1\nConfiguration:\n"));
		assert!(summary.contains("  PMD PWC Size: 96, Ways: 4\n"));
		assert!(summary.ends_with("Key Statistics:\n  Total page tables: 12\n"));

		let summary = executor.summary(&descriptor, Some("TOC Size: 64\n")).to_string();
		assert!(summary.ends_with("Key Statistics:\n  No statistics found in output file\n"));

		let summary = executor.summary(&descriptor, None).to_string();
		assert!(!summary.contains("Key Statistics"));
	}

	#[cfg(unix)]
	fn fake_simulator(dir: &Path, script: &str) -> SimulatorConfig {
		use std::os::unix::fs::PermissionsExt;

		let launcher = dir.join("fake-pin");
		fs::write(&launcher, format!("#!/bin/sh\n{script}\n")).expect("Unable to write script");
		fs::set_permissions(&launcher, fs::Permissions::from_mode(0o755)).expect("Unable to set permissions");
		SimulatorConfig {
			launcher,
			..SimulatorConfig::default()
		}
	}

	#[cfg(unix)]
	#[test]
	fn successful_run_writes_summary() {
		let dir = tempfile::tempdir().expect("Unable to create temp dir");

		// Writes a report to the path after `-o`
		let simulator = fake_simulator(
			dir.path(),
			r#"while [ "$1" != "-o" ]; do shift; done
echo "Processed 1*10M accesses"
printf 'Total page tables: 3\nL1 TLB Hit 5 100.00%%\n' > "$2""#,
		);
		let executor = RunExecutor::new(simulator, CoreAffinity::new(1), "exp");
		let descriptor = descriptor(dir.path(), Path::new("/apps/BTree"), false);

		let result = executor.execute(&descriptor);
		assert!(result.success, "Run failed: {result:?}");
		assert_eq!(result.exit_code, Some(0));
		assert_eq!(result.core, None);

		let progress = fs::read_to_string(&descriptor.files.progress).expect("Progress exists");
		assert!(progress.contains("Processed 1*10M accesses"));
		let summary = fs::read_to_string(&descriptor.files.summary).expect("Summary exists");
		assert!(summary.contains("  Total page tables: 3\n"));
	}

	#[cfg(unix)]
	#[test]
	fn failed_run_is_isolated() {
		let dir = tempfile::tempdir().expect("Unable to create temp dir");
		let simulator = fake_simulator(dir.path(), "echo 'Error: Unable to open output file' >&2\nexit 3");
		let executor = RunExecutor::new(simulator, CoreAffinity::new(4), "exp");
		let descriptor = descriptor(dir.path(), Path::new("/apps/BTree"), false);

		let result = executor.execute(&descriptor);
		assert!(!result.success);
		assert_eq!(result.exit_code, Some(3));
		assert_eq!(result.error.as_deref(), Some("Error: Unable to open output file"));
		assert!(!descriptor.files.summary.exists());
	}

	#[test]
	fn missing_simulator_is_a_failed_run() {
		let dir = tempfile::tempdir().expect("Unable to create temp dir");
		let simulator = SimulatorConfig {
			launcher: dir.path().join("no-such-launcher"),
			..SimulatorConfig::default()
		};
		let executor = RunExecutor::new(simulator, CoreAffinity::new(1), "exp");

		let result = executor.execute(&descriptor(dir.path(), Path::new("/apps/BTree"), false));
		assert!(!result.success);
		assert_eq!(result.exit_code, None);
		assert!(result.error.is_some_and(|err| err.contains("Unable to spawn simulator")));
	}
}
