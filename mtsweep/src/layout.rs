//! Output layout
//!
//! Every sweep is laid out as
//! `<results>/<timestamp>_<experiment>/<workload>/{output|summary|progress}_<config id>_<suffix>.txt`.

// Imports
use {
	crate::axis::{CacheGeometry, PageTableSizes, PwcGeometry, TocConfig},
	anyhow::Context,
	mtsweep_util::DisplayWrapper,
	once_cell::sync::Lazy,
	rand::Rng,
	regex::Regex,
	std::{
		collections::HashSet,
		fmt,
		path::{Path, PathBuf},
		str::FromStr,
	},
};

/// Timestamp format of experiment directories
pub const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Name of the experiment directory for `timestamp` and `experiment_name`
#[must_use]
pub fn experiment_dir_name(timestamp: &str, experiment_name: &str) -> String {
	format!("{timestamp}_{experiment_name}")
}

/// Splits an experiment directory name into its timestamp and experiment name.
///
/// Returns `None` if it doesn't start with a `YYYYMMDD_HHMMSS_` timestamp.
#[must_use]
pub fn parse_experiment_dir_name(name: &str) -> Option<(&str, &str)> {
	static EXPERIMENT_DIR_REGEX: Lazy<Regex> =
		Lazy::new(|| Regex::new(r"^(\d{8}_\d{6})_(.+)$").expect("Experiment dir regex is valid"));

	let captures = EXPERIMENT_DIR_REGEX.captures(name)?;
	Some((captures.get(1)?.as_str(), captures.get(2)?.as_str()))
}

/// Configuration id.
///
/// Encodes the page table, page walk cache and TOC axes, e.g.
/// `pgd512_pud512_pmd512_pte512_pwc16x4-16x4-96x4_toc1-64`.
///
/// The memory axis is not encoded, so runs that only differ in memory share an id
/// and are told apart by their suffix.
///
/// Page walk caches may also be written as entries only, e.g. `pwc16-16-96`, in which
/// case their ways are unknown and stored as `0`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct ConfigId {
	pub page_tables: PageTableSizes,
	pub pwc:         PwcGeometry,
	pub toc:         TocConfig,
}

impl fmt::Display for ConfigId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let PageTableSizes { pgd, pud, pmd, pte } = self.page_tables;
		let geometry = |geometry: CacheGeometry| {
			DisplayWrapper::new(move |f| match geometry.ways {
				0 => write!(f, "{}", geometry.entries),
				_ => write!(f, "{geometry}"),
			})
		};
		write!(
			f,
			"pgd{pgd}_pud{pud}_pmd{pmd}_pte{pte}_pwc{}-{}-{}_toc{}-{}",
			geometry(self.pwc.pgd),
			geometry(self.pwc.pud),
			geometry(self.pwc.pmd),
			u8::from(self.toc.enabled),
			self.toc.size
		)
	}
}

impl FromStr for ConfigId {
	type Err = anyhow::Error;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let mut fields = s.split('_');
		let mut next_num = |prefix: &str| -> Result<u64, anyhow::Error> {
			let value = self::next_field(&mut fields, prefix)?;
			value
				.parse()
				.with_context(|| format!("Unable to parse {prefix} value {value:?}"))
		};
		let page_tables = PageTableSizes {
			pgd: next_num("pgd")?,
			pud: next_num("pud")?,
			pmd: next_num("pmd")?,
			pte: next_num("pte")?,
		};

		let pwc = {
			let pwc = self::next_field(&mut fields, "pwc")?;
			let geometries = pwc
				.split('-')
				.map(self::parse_geometry)
				.collect::<Result<Vec<_>, _>>()
				.with_context(|| format!("Unable to parse page walk caches {pwc:?}"))?;
			match geometries[..] {
				[pgd, pud, pmd] => PwcGeometry { pgd, pud, pmd },
				_ => anyhow::bail!("Expected 3 page walk caches, found {}", geometries.len()),
			}
		};

		let toc = {
			let toc = self::next_field(&mut fields, "toc")?;
			let (enabled, size) = toc.split_once('-').context("Missing TOC size")?;
			let enabled = match enabled {
				"0" => false,
				"1" => true,
				_ => anyhow::bail!("Invalid TOC flag {enabled:?}"),
			};
			let size = size.parse().with_context(|| format!("Unable to parse TOC size {size:?}"))?;
			TocConfig { enabled, size }
		};

		anyhow::ensure!(fields.next().is_none(), "Unexpected trailing fields in config id {s:?}");

		Ok(Self { page_tables, pwc, toc })
	}
}

/// Returns the next `_`-separated field, without its `prefix`
fn next_field<'a>(fields: &mut impl Iterator<Item = &'a str>, prefix: &str) -> Result<&'a str, anyhow::Error> {
	let field = fields.next().with_context(|| format!("Missing {prefix} field"))?;
	field
		.strip_prefix(prefix)
		.with_context(|| format!("Expected field {field:?} to start with {prefix:?}"))
}

/// Parses a `<entries>x<ways>` or `<entries>` geometry
fn parse_geometry(s: &str) -> Result<CacheGeometry, anyhow::Error> {
	let (entries, ways) = match s.split_once('x') {
		Some((entries, ways)) => {
			let ways = ways.parse().context("Unable to parse ways")?;
			anyhow::ensure!(ways != 0, "Ways must be non-zero");
			(entries, ways)
		},
		None => (s, 0),
	};
	Ok(CacheGeometry {
		entries: entries.parse().context("Unable to parse entries")?,
		ways,
	})
}

/// Kind of run file
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum RunFileKind {
	/// Simulator report
	Output,

	/// Key statistics and configuration
	Summary,

	/// Combined stdout and stderr
	Progress,
}

impl RunFileKind {
	/// Returns the file name prefix of this kind
	#[must_use]
	pub const fn prefix(self) -> &'static str {
		match self {
			Self::Output => "output",
			Self::Summary => "summary",
			Self::Progress => "progress",
		}
	}

	/// Returns the file name of this kind for a run
	#[must_use]
	pub fn file_name(self, config_id: &ConfigId, suffix: &str) -> String {
		format!("{}_{config_id}_{suffix}.txt", self.prefix())
	}
}

/// Parsed run file name
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct RunFileName {
	/// Kind
	pub kind: RunFileKind,

	/// Config id, if the name held a valid one
	pub config_id: Option<ConfigId>,

	/// Run suffix
	pub suffix: String,
}

impl RunFileName {
	/// Parses a run file name.
	///
	/// Returns `None` if this isn't a run file at all. Run files whose config id
	/// doesn't parse are still accepted, without one.
	#[must_use]
	pub fn parse(file_name: &str) -> Option<Self> {
		let stem = file_name.strip_suffix(".txt")?;
		let (prefix, rest) = stem.split_once('_')?;
		let kind = [RunFileKind::Output, RunFileKind::Summary, RunFileKind::Progress]
			.into_iter()
			.find(|kind| kind.prefix() == prefix)?;
		let (config_id, suffix) = rest.rsplit_once('_')?;

		let config_id = match config_id.parse::<ConfigId>() {
			Ok(config_id) => Some(config_id),
			Err(err) => {
				tracing::trace!(?file_name, ?err, "Run file has no config id");
				None
			},
		};

		Some(Self {
			kind,
			config_id,
			suffix: suffix.to_owned(),
		})
	}
}

/// Files of a single run
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct RunFiles {
	pub output:   PathBuf,
	pub summary:  PathBuf,
	pub progress: PathBuf,
}

impl RunFiles {
	/// Creates the run files for a run inside `workload_dir`
	#[must_use]
	pub fn new(workload_dir: &Path, config_id: &ConfigId, suffix: &str) -> Self {
		let path = |kind: RunFileKind| workload_dir.join(kind.file_name(config_id, suffix));
		Self {
			output:   path(RunFileKind::Output),
			summary:  path(RunFileKind::Summary),
			progress: path(RunFileKind::Progress),
		}
	}
}

/// Run suffix generator.
///
/// Suffixes are 6 lowercase hex digits, unique for each generator.
#[derive(Debug)]
pub struct RunSuffixes<R> {
	rng:  R,
	used: HashSet<String>,
}

impl<R: Rng> RunSuffixes<R> {
	/// Creates a suffix generator from an rng
	pub fn new(rng: R) -> Self {
		Self {
			rng,
			used: HashSet::new(),
		}
	}

	/// Generates the next unique suffix
	pub fn next_suffix(&mut self) -> String {
		loop {
			let suffix = format!("{:06x}", self.rng.gen_range(0..0x100_0000_u32));
			if self.used.insert(suffix.clone()) {
				break suffix;
			}
		}
	}
}
