//! Workloads

// Imports
use {
	anyhow::Context,
	std::{
		env,
		fmt,
		path::{Path, PathBuf},
	},
};

/// Workload specification
#[derive(Clone, PartialEq, Eq, Debug)]
#[derive(serde::Serialize, serde::Deserialize)]
pub struct WorkloadSpec {
	/// Name, as a path relative to the workload root (e.g. `graphbig/pr`)
	pub name: String,

	/// Arguments
	#[serde(default)]
	pub args: Vec<String>,

	/// Whether this workload must be pinned to a single core
	#[serde(default)]
	pub pinned: bool,
}

impl WorkloadSpec {
	/// Creates a new, unpinned, workload
	pub fn new<I: IntoIterator<Item = S>, S: Into<String>>(name: impl Into<String>, args: I) -> Self {
		Self {
			name:   name.into(),
			args:   args.into_iter().map(Into::into).collect(),
			pinned: false,
		}
	}

	/// Marks this workload as pinned
	#[must_use]
	pub fn pinned(self) -> Self {
		Self { pinned: true, ..self }
	}

	/// Resolves this workload against the workload root
	pub fn resolve(&self, root: &Path) -> Result<ResolvedWorkload, anyhow::Error> {
		let exe = root.join(&self.name);
		anyhow::ensure!(exe.is_file(), "Workload {:?} does not exist at {exe:?}", self.name);

		// Note: The simulator may run in another directory, so we need an absolute path
		let exe = exe
			.canonicalize()
			.with_context(|| format!("Unable to canonicalize workload path {exe:?}"))?;

		Ok(ResolvedWorkload {
			spec: self.clone(),
			args: self.args.iter().map(|arg| self::expand_home(arg)).collect(),
			exe,
		})
	}
}

impl fmt::Display for WorkloadSpec {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.name)?;
		for arg in &self.args {
			write!(f, " {arg}")?;
		}
		Ok(())
	}
}

/// Expands a leading `~/` to the home directory
fn expand_home(arg: &str) -> String {
	match (arg.strip_prefix("~/"), env::var_os("HOME")) {
		(Some(rest), Some(home)) => Path::new(&home).join(rest).to_string_lossy().into_owned(),
		_ => arg.to_owned(),
	}
}

/// Resolved workload
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct ResolvedWorkload {
	/// Specification
	pub spec: WorkloadSpec,

	/// Executable
	pub exe: PathBuf,

	/// Arguments, ready to pass to the executable
	pub args: Vec<String>,
}

/// Resolves all workloads against the workload root.
///
/// Fails if the root, or any of the workloads, doesn't exist, before anything
/// else is done.
pub fn resolve_all(specs: &[WorkloadSpec], root: &Path) -> Result<Vec<ResolvedWorkload>, anyhow::Error> {
	anyhow::ensure!(root.is_dir(), "Workload root {root:?} does not exist");
	specs
		.iter()
		.map(|spec| spec.resolve(root))
		.collect::<Result<Vec<_>, _>>()
		.context("Unable to resolve workloads")
}

/// Workload tier
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
#[derive(clap::ValueEnum)]
pub enum WorkloadTier {
	Tiny,
	Middle,
	Large,
	Huge,
	SuperHuge,
	Special,
}

impl WorkloadTier {
	/// Returns the workloads of this tier
	#[must_use]
	pub fn workloads(self) -> Vec<WorkloadSpec> {
		const GRAPHBIG_FB: [&str; 4] = ["--dataset", "~/workload/graphbig/datagen-7_5-fb", "--separator", " "];
		const GRAPHBIG_SF3: [&str; 2] = ["--dataset", "~/workload/snb/social_network-sf3-numpart-1"];
		const GRAPHBIG_SF10: [&str; 2] = ["--dataset", "~/workload/snb/social_network-sf10-numpart-1"];

		match self {
			Self::Tiny => vec![
				WorkloadSpec::new("hello-static", [] as [&str; 0]),
				WorkloadSpec::new("BTree", ["1", "1"]),
				WorkloadSpec::new("xsbench-static", ["-t", "1", "-g", "2", "-p", "3"]).pinned(),
			],
			Self::Middle => vec![
				WorkloadSpec::new("BTree", ["30000000", "100000"]),
				WorkloadSpec::new("xsbench-static", ["-t", "1"]).pinned(),
				WorkloadSpec::new("gups-static", ["5"]).pinned(),
				WorkloadSpec::new("graphbig/pr", GRAPHBIG_FB),
			],
			Self::Large => vec![
				WorkloadSpec::new("BTree", ["700000", "100000"]),
				WorkloadSpec::new("xsbench-static", ["-t", "1", "-g", "2000", "-p", "40000"]).pinned(),
				WorkloadSpec::new("seq-list-static", ["-s", "15", "-e", "15"]),
			],
			Self::Huge => vec![
				WorkloadSpec::new("BTree", ["90000000", "100"]),
				WorkloadSpec::new("graphbig/dc", GRAPHBIG_SF10),
				WorkloadSpec::new("gups-static", ["20"]).pinned(),
				WorkloadSpec::new("graphbig/pr", GRAPHBIG_SF10),
				WorkloadSpec::new("xsbench-static", ["-t", "1", "-g", "40000"]).pinned(),
			],
			Self::SuperHuge => vec![
				WorkloadSpec::new("BTree", ["1500000000", "70000000"]),
				WorkloadSpec::new("xsbench-static", ["-t", "1", "-g", "170000", "-p", "4000000"]).pinned(),
				WorkloadSpec::new("gups-static", ["128"]).pinned(),
			],
			Self::Special => vec![
				WorkloadSpec::new("seq-list-static", ["-s", "24", "-e", "24", "-V"]),
				WorkloadSpec::new("graphbig/dc", GRAPHBIG_SF3),
				WorkloadSpec::new("graphbig/pr", GRAPHBIG_SF3),
			],
		}
	}

	/// Returns the maximum number of workers for this tier, if limited.
	///
	/// The largest workloads can't run many at a time without running out
	/// of memory.
	#[must_use]
	pub const fn worker_ceiling(self) -> Option<usize> {
		match self {
			Self::Huge => Some(4),
			Self::SuperHuge => Some(2),
			Self::Tiny | Self::Middle | Self::Large | Self::Special => None,
		}
	}

	/// Returns the name of this tier
	#[must_use]
	pub const fn name(self) -> &'static str {
		match self {
			Self::Tiny => "tiny",
			Self::Middle => "middle",
			Self::Large => "large",
			Self::Huge => "huge",
			Self::SuperHuge => "super-huge",
			Self::Special => "special",
		}
	}
}

/// Selects the workloads of a tier, optionally only the one at `idx`
pub fn select(tier: WorkloadTier, idx: Option<usize>) -> Result<Vec<WorkloadSpec>, anyhow::Error> {
	let workloads = tier.workloads();
	match idx {
		Some(idx) => {
			let len = workloads.len();
			let workload = workloads.into_iter().nth(idx).with_context(|| {
				format!(
					"Workload index {idx} is out of range for tier {:?} ({len} workloads)",
					tier.name()
				)
			})?;
			Ok(vec![workload])
		},
		None => Ok(workloads),
	}
}
