//! Experiment directory
//!
//! Holds the human-readable `README.md`, written before any run, and
//! `experiment_summary.md`, written once every run finished.

// Imports
use {
	crate::{layout, scheduler::SweepReport, space::ConfigurationSpace, workload::WorkloadSpec},
	anyhow::Context,
	chrono::{DateTime, Local},
	std::{
		fmt,
		fs,
		path::{Path, PathBuf},
	},
};

/// Format of human-readable dates
const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Experiment
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Experiment {
	/// Name
	pub name: String,

	/// Purpose
	pub purpose: String,

	/// Workload type
	pub workload_type: String,

	/// Start time
	pub started: DateTime<Local>,

	/// Directory
	pub dir: PathBuf,
}

impl Experiment {
	/// Creates the experiment directory inside `results_root`
	pub fn create(
		results_root: &Path,
		name: &str,
		purpose: &str,
		workload_type: &str,
		started: DateTime<Local>,
	) -> Result<Self, anyhow::Error> {
		let timestamp = started.format(layout::TIMESTAMP_FORMAT).to_string();
		let dir = results_root.join(layout::experiment_dir_name(&timestamp, name));
		fs::create_dir_all(&dir).with_context(|| format!("Unable to create experiment directory {dir:?}"))?;

		// Note: The simulator may run in another directory, so we need an absolute path
		let dir = dir
			.canonicalize()
			.with_context(|| format!("Unable to canonicalize experiment directory {dir:?}"))?;
		tracing::info!(?dir, "Created experiment directory");

		Ok(Self {
			name: name.to_owned(),
			purpose: purpose.to_owned(),
			workload_type: workload_type.to_owned(),
			started,
			dir,
		})
	}

	/// Path of the readme
	#[must_use]
	pub fn readme_path(&self) -> PathBuf {
		self.dir.join("README.md")
	}

	/// Path of the summary
	#[must_use]
	pub fn summary_path(&self) -> PathBuf {
		self.dir.join("experiment_summary.md")
	}

	/// Writes the readme
	pub fn write_readme(&self, space: &ConfigurationSpace, workloads: &[WorkloadSpec]) -> Result<(), anyhow::Error> {
		let readme = Readme {
			experiment: self,
			space,
			workloads,
		};
		fs::write(self.readme_path(), readme.to_string()).context("Unable to write experiment readme")
	}

	/// Writes the summary
	pub fn write_summary(&self, report: &SweepReport, finished: DateTime<Local>) -> Result<(), anyhow::Error> {
		let summary = Summary {
			experiment: self,
			report,
			finished,
		};
		fs::write(self.summary_path(), summary.to_string()).context("Unable to write experiment summary")
	}
}

/// Experiment readme
struct Readme<'a> {
	experiment: &'a Experiment,
	space:      &'a ConfigurationSpace,
	workloads:  &'a [WorkloadSpec],
}

impl fmt::Display for Readme<'_> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let experiment = self.experiment;
		writeln!(f, "# Experiment: {}\n", experiment.name)?;
		writeln!(f, "## Date and Time\n{}\n", experiment.started.format(DATE_FORMAT))?;
		writeln!(f, "## Purpose\n{}\n", experiment.purpose)?;
		writeln!(f, "## Workload Type\n{}\n", experiment.workload_type)?;

		writeln!(f, "## Configuration Summary")?;
		self.space.fmt_axes(f)?;
		writeln!(f, "\nTotal configurations: {}\n", self.space.len())?;

		writeln!(f, "## Workloads")?;
		for workload in self.workloads {
			let pinned = match workload.pinned {
				true => " (pinned)",
				false => "",
			};
			writeln!(f, "- {workload}{pinned}")?;
		}

		Ok(())
	}
}

/// Experiment summary
struct Summary<'a> {
	experiment: &'a Experiment,
	report:     &'a SweepReport,
	finished:   DateTime<Local>,
}

impl fmt::Display for Summary<'_> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let report = self.report;
		writeln!(f, "# Experiment Summary: {}\n", self.experiment.name)?;

		writeln!(f, "## Overview")?;
		writeln!(f, "- Date and Time: {}", self.finished.format(DATE_FORMAT))?;
		writeln!(
			f,
			"- Completed: {} of {} tasks successfully",
			report.succeeded, report.total
		)?;
		writeln!(
			f,
			"- Total execution time: {:.2} seconds\n",
			report.elapsed.as_secs_f64()
		)?;

		writeln!(f, "## Purpose\n{}\n", self.experiment.purpose)?;

		writeln!(f, "## Workload Summary")?;
		for (idx, tally) in report.per_workload.iter().enumerate() {
			writeln!(f, "### Workload {}: {}", idx + 1, tally.name)?;
			if !tally.args.is_empty() {
				writeln!(f, "- Options: {}", tally.args.join(" "))?;
			}
			writeln!(f, "- Success rate: {}/{}\n", tally.succeeded, tally.total)?;
		}

		Ok(())
	}
}
