//! Configuration space

// Imports
use {
	crate::{
		axis::{Axis, MemoryConfig, PageTableSizes, PwcGeometry, TocConfig},
		layout::{ConfigId, RunFiles, RunSuffixes},
		workload::ResolvedWorkload,
	},
	rand::Rng,
	std::{fmt, path::Path},
};

/// Simulator configuration, one value of each axis
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct SimConfig {
	pub page_tables: PageTableSizes,
	pub pwc:         PwcGeometry,
	pub toc:         TocConfig,
	pub memory:      MemoryConfig,
}

impl SimConfig {
	/// Returns the id of this configuration
	#[must_use]
	pub const fn id(&self) -> ConfigId {
		ConfigId {
			page_tables: self.page_tables,
			pwc:         self.pwc,
			toc:         self.toc,
		}
	}
}

impl fmt::Display for SimConfig {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{} | {} | {} | {}", self.page_tables, self.pwc, self.toc, self.memory)
	}
}

/// Configuration space.
///
/// The cartesian product of all axes, in field order.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct ConfigurationSpace {
	pub page_tables: Axis<PageTableSizes>,
	pub pwc:         Axis<PwcGeometry>,
	pub toc:         Axis<TocConfig>,
	pub memory:      Axis<MemoryConfig>,
}

impl ConfigurationSpace {
	/// Creates a configuration space from the values of each axis
	pub fn new(
		page_tables: Vec<PageTableSizes>,
		pwc: Vec<PwcGeometry>,
		toc: Vec<TocConfig>,
		memory: Vec<MemoryConfig>,
	) -> Result<Self, anyhow::Error> {
		Ok(Self {
			page_tables: Axis::new("Page tables", page_tables)?,
			pwc:         Axis::new("Page walk caches", pwc)?,
			toc:         Axis::new("Translation cache", toc)?,
			memory:      Axis::new("Memory", memory)?,
		})
	}

	/// Returns the number of configurations
	#[must_use]
	pub fn len(&self) -> usize {
		self.page_tables.len() * self.pwc.len() * self.toc.len() * self.memory.len()
	}

	/// Returns if there are no configurations
	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	/// Returns all configurations, with the first axis outermost
	#[must_use]
	pub fn configs(&self) -> Vec<SimConfig> {
		itertools::iproduct!(
			&self.page_tables.values,
			&self.pwc.values,
			&self.toc.values,
			&self.memory.values
		)
		.map(|(&page_tables, &pwc, &toc, &memory)| SimConfig {
			page_tables,
			pwc,
			toc,
			memory,
		})
		.collect()
	}

	/// Expands this space into run descriptors.
	///
	/// Workloads are outermost, then each configuration, then each repetition.
	/// Each descriptor's files are placed in `<experiment_dir>/<workload>`.
	pub fn expand<R: Rng>(
		&self,
		workloads: &[ResolvedWorkload],
		repetitions: usize,
		experiment_dir: &Path,
		suffixes: &mut RunSuffixes<R>,
	) -> Vec<RunDescriptor> {
		let configs = self.configs();
		let mut descriptors = Vec::with_capacity(workloads.len() * configs.len() * repetitions);
		for workload in workloads {
			let workload_dir = experiment_dir.join(&workload.spec.name);
			for config in &configs {
				for _ in 0..repetitions {
					let suffix = suffixes.next_suffix();
					descriptors.push(RunDescriptor {
						idx: descriptors.len(),
						config: *config,
						workload: workload.clone(),
						files: RunFiles::new(&workload_dir, &config.id(), &suffix),
						suffix,
					});
				}
			}
		}

		descriptors
	}

	/// Writes a listing of every axis, one per line
	pub fn fmt_axes(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		writeln!(f, "- {}", self.page_tables)?;
		writeln!(f, "- {}", self.pwc)?;
		writeln!(f, "- {}", self.toc)?;
		writeln!(f, "- {}", self.memory)
	}
}

/// Run descriptor
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct RunDescriptor {
	/// Index in the sweep
	pub idx: usize,

	/// Configuration
	pub config: SimConfig,

	/// Workload
	pub workload: ResolvedWorkload,

	/// Run suffix
	pub suffix: String,

	/// Files
	pub files: RunFiles,
}

#[cfg(test)]
mod tests {
	use {
		super::*,
		crate::{axis::CacheGeometry, workload::WorkloadSpec},
		rand::{rngs::StdRng, SeedableRng},
		std::{collections::HashSet, path::PathBuf},
	};

	fn workload(name: &str) -> ResolvedWorkload {
		ResolvedWorkload {
			spec: WorkloadSpec::new(name, ["1"]),
			exe:  PathBuf::from("/apps").join(name),
			args: vec!["1".to_owned()],
		}
	}

	fn space() -> ConfigurationSpace {
		ConfigurationSpace::new(
			vec![PageTableSizes::default(), PageTableSizes {
				pgd: 256,
				..PageTableSizes::default()
			}],
			PwcGeometry::defaults(),
			TocConfig::defaults(),
			vec![MemoryConfig::default()],
		)
		.expect("Axes have values")
	}

	fn expand(seed: u64, repetitions: usize) -> Vec<RunDescriptor> {
		let mut suffixes = RunSuffixes::new(StdRng::seed_from_u64(seed));
		space().expand(
			&[workload("BTree"), workload("graphbig/pr"), workload("gups-static")],
			repetitions,
			Path::new("results/20240101_000000_exp"),
			&mut suffixes,
		)
	}

	#[test]
	fn count_is_product_of_axes() {
		let space = space();
		assert_eq!(space.len(), 2 * 5 * 2);
		assert_eq!(space.configs().len(), space.len());
		assert_eq!(expand(0, 1).len(), space.len() * 3);
		assert_eq!(expand(0, 3).len(), space.len() * 3 * 3);
	}

	#[test]
	fn first_axis_is_outermost() {
		let configs = space().configs();
		let half = configs.len() / 2;
		assert!(configs[..half].iter().all(|config| config.page_tables.pgd == 512));
		assert!(configs[half..].iter().all(|config| config.page_tables.pgd == 256));

		// Last axis varies fastest
		assert_eq!(configs[0].toc, TocConfig::defaults()[0]);
		assert_eq!(configs[1].toc, TocConfig::defaults()[1]);
		assert_eq!(configs[0].pwc, configs[1].pwc);
		assert_eq!(configs[2].pwc.pgd, CacheGeometry::new(32, 8));
	}

	#[test]
	fn expansion_is_deterministic() {
		let strip = |descriptors: Vec<RunDescriptor>| {
			descriptors
				.into_iter()
				.map(|descriptor| (descriptor.idx, descriptor.config, descriptor.workload.spec.name))
				.collect::<Vec<_>>()
		};
		assert_eq!(strip(expand(1, 2)), strip(expand(2, 2)));
		assert_eq!(expand(3, 1), expand(3, 1));
	}

	#[test]
	fn workloads_are_outermost() {
		let descriptors = expand(0, 1);
		let per_workload = space().len();
		assert!(descriptors[..per_workload]
			.iter()
			.all(|descriptor| descriptor.workload.spec.name == "BTree"));
		assert_eq!(descriptors[per_workload].workload.spec.name, "graphbig/pr");
		assert!(descriptors.iter().enumerate().all(|(idx, descriptor)| descriptor.idx == idx));
	}

	#[test]
	fn run_files_never_collide() {
		let descriptors = expand(7, 4);
		let outputs = descriptors
			.iter()
			.map(|descriptor| descriptor.files.output.clone())
			.collect::<HashSet<_>>();
		assert_eq!(outputs.len(), descriptors.len());

		let descriptor = &descriptors[space().len()];
		assert!(descriptor
			.files
			.output
			.starts_with("results/20240101_000000_exp/graphbig/pr"));
	}

	#[test]
	fn memory_axis_shares_config_id() {
		let space = ConfigurationSpace::new(
			vec![PageTableSizes::default()],
			vec![PwcGeometry::defaults()[0]],
			vec![TocConfig::defaults()[0]],
			vec![MemoryConfig::default(), MemoryConfig {
				phys_mem_gb: 60,
				..MemoryConfig::default()
			}],
		)
		.expect("Axes have values");
		let descriptors = space.expand(
			&[workload("BTree")],
			1,
			Path::new("results/20240101_000000_exp"),
			&mut RunSuffixes::new(StdRng::seed_from_u64(0)),
		);

		assert_eq!(descriptors.len(), 2);
		assert_ne!(descriptors[0].config, descriptors[1].config);
		assert_eq!(descriptors[0].config.id(), descriptors[1].config.id());
		assert_ne!(descriptors[0].files.output, descriptors[1].files.output);
	}
}
