//! Memory-translation simulator sweep (`mtsweep`)
//!
//! Expands a configuration space into simulator runs, executes them on a
//! bounded worker pool and parses the resulting reports.

// Modules
pub mod axis;
pub mod command;
pub mod config;
pub mod executor;
pub mod experiment;
pub mod layout;
pub mod report;
pub mod scheduler;
pub mod space;
pub mod workload;

// Exports
pub use self::{
	config::Config,
	executor::{CoreAffinity, RunExecutor, RunResult},
	experiment::Experiment,
	report::{MetricValue, MetricsRecord},
	scheduler::{Scheduler, SweepReport, WorkerPolicy},
	space::{ConfigurationSpace, RunDescriptor, SimConfig},
	workload::{WorkloadSpec, WorkloadTier},
};
