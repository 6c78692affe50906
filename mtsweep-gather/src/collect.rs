//! Result collection
//!
//! Walks a results directory, where every `<timestamp>_<name>` directory is one
//! experiment and every `output_*.txt` file below it is the report of one run.

// Imports
use {
	anyhow::Context,
	itertools::Itertools,
	mtsweep::{
		layout::{self, ConfigId, RunFileKind, RunFileName},
		report,
		MetricValue,
		MetricsRecord,
	},
	once_cell::sync::Lazy,
	regex::Regex,
	std::{fs, path::Path},
};

/// Experiment being collected
#[derive(Clone, Debug)]
struct Experiment<'a> {
	timestamp: &'a str,
	name:      &'a str,
	purpose:   String,
	dir:       &'a Path,
}

/// Collected runs
#[derive(Clone, PartialEq, Debug, Default)]
pub struct Collection {
	/// Record of each run
	pub records: Vec<MetricsRecord>,

	/// Runs skipped because their report couldn't be read or had no metrics
	pub skipped: usize,
}

/// Collects a record for every run below `results_root`.
///
/// Runs whose report can't be read, or doesn't contain any metrics, are skipped
/// with a warning.
pub fn collect(results_root: &Path) -> Result<Collection, anyhow::Error> {
	anyhow::ensure!(
		results_root.is_dir(),
		"Results directory {results_root:?} does not exist"
	);

	let experiment_dirs = fs::read_dir(results_root)
		.with_context(|| format!("Unable to read results directory {results_root:?}"))?
		.map(|entry| entry.map(|entry| entry.path()))
		.collect::<Result<Vec<_>, _>>()
		.with_context(|| format!("Unable to read entry of results directory {results_root:?}"))?
		.into_iter()
		.filter(|path| path.is_dir())
		.sorted()
		.collect::<Vec<_>>();

	let mut collection = Collection::default();
	for experiment_dir in &experiment_dirs {
		let Some((timestamp, name)) = experiment_dir
			.file_name()
			.and_then(|name| name.to_str())
			.and_then(layout::parse_experiment_dir_name)
		else {
			tracing::trace!(?experiment_dir, "Skipping non-experiment directory");
			continue;
		};

		let experiment = Experiment {
			timestamp,
			name,
			purpose: self::read_purpose(&experiment_dir.join("README.md")),
			dir: experiment_dir,
		};
		let prev_records = collection.records.len();
		self::collect_experiment(results_root, &experiment, &mut collection);
		tracing::debug!(
			?experiment_dir,
			runs = collection.records.len() - prev_records,
			"Collected experiment"
		);
	}

	Ok(collection)
}

/// Collects every run of an experiment
fn collect_experiment(results_root: &Path, experiment: &Experiment<'_>, collection: &mut Collection) {
	// Note: Reports are always inside a workload directory, so we skip the
	//       experiment directory's own files.
	let walker = walkdir::WalkDir::new(experiment.dir).min_depth(2).sort_by_file_name();
	for entry in walker {
		let entry = match entry {
			Ok(entry) => entry,
			Err(err) => {
				tracing::warn!(?err, "Unable to read experiment directory entry");
				continue;
			},
		};
		if !entry.file_type().is_file() {
			continue;
		}

		let Some(run_file) = entry.file_name().to_str().and_then(RunFileName::parse) else {
			continue;
		};
		if run_file.kind != RunFileKind::Output {
			continue;
		}

		match self::collect_run(results_root, experiment, entry.path(), &run_file) {
			Some(record) => collection.records.push(record),
			None => collection.skipped += 1,
		}
	}
}

/// Collects a single run from its report
fn collect_run(
	results_root: &Path,
	experiment: &Experiment<'_>,
	report_path: &Path,
	run_file: &RunFileName,
) -> Option<MetricsRecord> {
	let report = match fs::read_to_string(report_path) {
		Ok(report) => report,
		Err(err) => {
			tracing::warn!(?report_path, ?err, "Unable to read report, skipping");
			return None;
		},
	};

	let metrics = report::parse(&report);
	if metrics.is_empty() {
		tracing::warn!(?report_path, "No metrics extracted from report, skipping");
		return None;
	}

	let path_fields = self::path_fields(results_root, experiment, report_path, run_file);
	Some(self::merge(path_fields, metrics))
}

/// Merges the path-derived fields of a run with its parsed metrics.
///
/// Parsed metrics win on name clashes.
fn merge(mut path_fields: MetricsRecord, metrics: MetricsRecord) -> MetricsRecord {
	for (field, value) in metrics {
		if let Some(path_value) = path_fields.get(&field) {
			tracing::trace!(%field, %path_value, %value, "Parsed field overrides path field");
		}
		path_fields.insert(field, value);
	}

	path_fields
}

/// Returns all fields derived from the path of a report
fn path_fields(
	results_root: &Path,
	experiment: &Experiment<'_>,
	report_path: &Path,
	run_file: &RunFileName,
) -> MetricsRecord {
	let mut record = MetricsRecord::new();
	let mut insert_text = |field: &str, value: String| {
		record.insert(field.to_owned(), MetricValue::Text(value));
	};
	insert_text("timestamp", experiment.timestamp.to_owned());
	insert_text("experiment_name", experiment.name.to_owned());
	insert_text("purpose", experiment.purpose.clone());

	let workload_dir = report_path
		.parent()
		.and_then(|parent| parent.strip_prefix(experiment.dir).ok())
		.unwrap_or_else(|| Path::new(""));
	let workload_components = workload_dir
		.components()
		.map(|component| component.as_os_str().to_string_lossy().into_owned())
		.collect::<Vec<_>>();
	if let Some(workload) = workload_components.last() {
		insert_text("workload", workload.clone());
	}
	insert_text("full_workload_path", workload_components.join("/"));

	let summary_path = report_path
		.file_name()
		.and_then(|file_name| file_name.to_str())
		.and_then(|file_name| file_name.strip_prefix(RunFileKind::Output.prefix()))
		.map(|rest| report_path.with_file_name(format!("{}{rest}", RunFileKind::Summary.prefix())));
	if let Some(summary_path) = summary_path.filter(|path| path.exists()) {
		let summary_path = summary_path.strip_prefix(results_root).unwrap_or(&summary_path);
		insert_text("summary_file", summary_path.to_string_lossy().into_owned());
	}

	if let Some(config_id) = run_file.config_id {
		record.extend(
			self::config_id_fields(&config_id)
				.into_iter()
				// Note: Ways of `0` are unknown
				.filter(|&(field, value)| value != 0 || !field.ends_with("_ways_pt"))
				.map(|(field, value)| (field.to_owned(), MetricValue::Integer(value))),
		);
	}

	record
}

/// Returns the fields encoded in a config id
fn config_id_fields(config_id: &ConfigId) -> [(&'static str, u64); 12] {
	let ConfigId { page_tables, pwc, toc } = *config_id;
	[
		("pgd_size_pt", page_tables.pgd),
		("pud_size_pt", page_tables.pud),
		("pmd_size_pt", page_tables.pmd),
		("pte_size_pt", page_tables.pte),
		("pgd_pwc", pwc.pgd.entries),
		("pud_pwc", pwc.pud.entries),
		("pmd_pwc", pwc.pmd.entries),
		("pgd_pwc_ways_pt", pwc.pgd.ways),
		("pud_pwc_ways_pt", pwc.pud.ways),
		("pmd_pwc_ways_pt", pwc.pmd.ways),
		("toc_enabled_pt", u64::from(toc.enabled)),
		("toc_size_pt", toc.size),
	]
}

/// Reads the purpose of an experiment from its readme.
///
/// Returns an empty string if the readme, or its purpose, is missing.
fn read_purpose(readme_path: &Path) -> String {
	static PURPOSE_REGEX: Lazy<Regex> =
		Lazy::new(|| Regex::new(r"(?s)## Purpose\n(.*?)(?:\n\n|\z)").expect("Purpose regex is valid"));

	let readme = match fs::read_to_string(readme_path) {
		Ok(readme) => readme,
		Err(err) => {
			tracing::debug!(?readme_path, ?err, "Unable to read experiment readme");
			return String::new();
		},
	};

	PURPOSE_REGEX
		.captures(&readme)
		.and_then(|captures| captures.get(1))
		.map(|purpose| purpose.as_str().trim().to_owned())
		.unwrap_or_default()
}
