//! Sweep configuration
//!
//! Read from an optional json file. Every field has a default, so partial
//! files only override what they mention.

// Imports
use {
	crate::{
		axis::{MemoryConfig, PageTableSizes, PwcGeometry, TocConfig},
		space::ConfigurationSpace,
	},
	anyhow::Context,
	std::{fs, path::Path, path::PathBuf},
};

/// Configuration
#[derive(Clone, PartialEq, Eq, Debug)]
#[derive(serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct Config {
	/// Simulator
	pub simulator: SimulatorConfig,

	/// Number of times each configuration is run for each workload
	pub repetitions: usize,

	/// Maximum number of workers
	pub max_workers: Option<usize>,

	/// Axes
	pub axes: AxesConfig,
}

impl Default for Config {
	fn default() -> Self {
		Self {
			simulator:   SimulatorConfig::default(),
			repetitions: 1,
			max_workers: None,
			axes:        AxesConfig::default(),
		}
	}
}

impl Config {
	/// Loads a configuration file
	pub fn load(path: &Path) -> Result<Self, anyhow::Error> {
		let config_file = fs::File::open(path).with_context(|| format!("Unable to open config file {path:?}"))?;
		let config = serde_json::from_reader::<_, Self>(config_file)
			.with_context(|| format!("Unable to parse config file {path:?}"))?;
		anyhow::ensure!(config.repetitions > 0, "Repetitions must be at least 1");
		anyhow::ensure!(config.max_workers != Some(0), "Maximum workers must be at least 1");
		anyhow::ensure!(
			config
				.axes
				.pwc
				.iter()
				.all(|pwc| [pwc.pgd, pwc.pud, pwc.pmd].iter().all(|geometry| geometry.ways != 0)),
			"Page walk cache ways must be at least 1"
		);

		Ok(config)
	}

	/// Builds the configuration space
	pub fn space(&self) -> Result<ConfigurationSpace, anyhow::Error> {
		ConfigurationSpace::new(
			self.axes.page_tables.clone(),
			self.axes.pwc.clone(),
			self.axes.toc.clone(),
			self.axes.memory.clone(),
		)
		.context("Unable to build configuration space")
	}
}

/// Simulator configuration
#[derive(Clone, PartialEq, Eq, Debug)]
#[derive(serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct SimulatorConfig {
	/// Instrumentation launcher
	pub launcher: PathBuf,

	/// Simulator tool, loaded by the launcher
	pub tool: PathBuf,

	/// Directory to run the simulator from
	pub working_dir: Option<PathBuf>,
}

impl Default for SimulatorConfig {
	fn default() -> Self {
		Self {
			launcher:    PathBuf::from("../../../pin"),
			tool:        PathBuf::from("obj-intel64/memory_simulator.so"),
			working_dir: None,
		}
	}
}

/// Axes configuration
#[derive(Clone, PartialEq, Eq, Debug)]
#[derive(serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct AxesConfig {
	pub page_tables: Vec<PageTableSizes>,
	pub pwc:         Vec<PwcGeometry>,
	pub toc:         Vec<TocConfig>,
	pub memory:      Vec<MemoryConfig>,
}

impl Default for AxesConfig {
	fn default() -> Self {
		Self {
			page_tables: vec![PageTableSizes::default()],
			pwc:         PwcGeometry::defaults(),
			toc:         TocConfig::defaults(),
			memory:      vec![MemoryConfig::default()],
		}
	}
}

#[cfg(test)]
mod tests {
	use {super::*, crate::axis::CacheGeometry};

	fn load(json: &str) -> Result<Config, anyhow::Error> {
		let dir = tempfile::tempdir().expect("Unable to create temp dir");
		let path = dir.path().join("sweep.json");
		fs::write(&path, json).expect("Unable to write config");
		Config::load(&path)
	}

	#[test]
	fn empty_file_uses_defaults() {
		let config = load("{}").expect("Valid config");
		assert_eq!(config, Config::default());
		assert_eq!(config.space().expect("Valid space").len(), 10);
	}

	#[test]
	fn partial_file_overrides() {
		let config = load(
			r#"{
				"repetitions": 3,
				"simulator": { "working_dir": "/opt/pin/tools" },
				"axes": {
					"pwc": [{ "pgd": { "entries": 8, "ways": 2 }, "pud": { "entries": 8, "ways": 2 }, "pmd": { "entries": 32, "ways": 4 } }],
					"toc": [{ "enabled": true, "size": 128 }]
				}
			}"#,
		)
		.expect("Valid config");

		assert_eq!(config.repetitions, 3);
		assert_eq!(config.simulator.working_dir, Some(PathBuf::from("/opt/pin/tools")));
		assert_eq!(config.simulator.tool, SimulatorConfig::default().tool);
		assert_eq!(config.axes.pwc[0].pmd, CacheGeometry::new(32, 4));
		assert_eq!(config.axes.memory, [MemoryConfig::default()]);
		assert_eq!(config.space().expect("Valid space").len(), 1);
	}

	#[test]
	fn rejects_bad_values() {
		assert!(load(r#"{ "repetitions": 0 }"#).is_err());
		assert!(load(r#"{ "max_workers": 0 }"#).is_err());
		assert!(load(
			r#"{ "axes": { "pwc": [{ "pgd": { "entries": 8, "ways": 0 }, "pud": { "entries": 8, "ways": 2 }, "pmd": { "entries": 32, "ways": 4 } }] } }"#
		)
		.is_err());
		assert!(load(r#"{ "axes": { "toc": [] } }"#).expect("Valid file").space().is_err());
		assert!(load("not json").is_err());
	}
}
