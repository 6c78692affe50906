//! Csv tables

// Imports
use {
	crate::aggregate::{AggregateRow, ComparativeRow},
	anyhow::Context,
	itertools::Itertools,
	mtsweep::{MetricValue, MetricsRecord},
	std::{
		collections::{BTreeMap, BTreeSet},
		fs,
		path::Path,
	},
};

/// Table row, from column to cell
pub type Row = BTreeMap<String, String>;

/// Columns always written first, in this order, if present
pub const PRIORITY_COLUMNS: [&str; 47] = [
	// Experiment
	"timestamp",
	"experiment_name",
	"purpose",
	"workload",
	// Configuration
	"pgd_size",
	"pud_size",
	"pmd_size",
	"pte_size",
	"pgd_pwc_entries",
	"pgd_pwc_ways",
	"pud_pwc_entries",
	"pud_pwc_ways",
	"pmd_pwc_entries",
	"pmd_pwc_ways",
	"phys_mem_gb",
	"l1_tlb_entries",
	"l1_tlb_ways",
	"l2_tlb_entries",
	"l2_tlb_ways",
	"toc_enabled",
	"toc_size",
	// Tlb
	"l1_tlb_hit_count",
	"l1_tlb_accesses",
	"l1_tlb_hit_percentage",
	"l2_tlb_hit_count",
	"l2_tlb_accesses",
	"l2_tlb_hit_percentage",
	"tlb_efficiency",
	// Page walk caches
	"pgd_pwc_hit_count",
	"pgd_pwc_accesses",
	"pgd_pwc_hit_percentage",
	"pud_pwc_hit_count",
	"pud_pwc_accesses",
	"pud_pwc_hit_percentage",
	"pmd_pwc_hit_count",
	"pmd_pwc_accesses",
	"pmd_pwc_hit_percentage",
	// Memory requests
	"avg_memory_requests_per_translation",
	// Page tables
	"total_page_tables",
	"page_table_memory_mb",
	// Page table entry cache
	"pte_cache_hits",
	"pte_cache_misses",
	"page_walk_memory_accesses",
	"pte_cache_hit_ratio",
	// Memory
	"memory_accesses",
	"total_access_cost_cycles",
	// Reference
	"summary_file",
];

/// Columns never written
pub const EXCLUDED_COLUMNS: [&str; 4] = ["pgd_pwc", "pud_pwc", "pmd_pwc", "full_workload_path"];

/// Returns if a column is never written
#[must_use]
pub fn is_excluded(column: &str) -> bool {
	column.ends_with("_pt") || EXCLUDED_COLUMNS.contains(&column)
}

/// Returns the columns of `rows`.
///
/// Priority columns come first, then every other column alphabetically.
#[must_use]
pub fn columns(rows: &[Row]) -> Vec<&str> {
	let present = rows
		.iter()
		.flat_map(|row| row.keys().map(String::as_str))
		.filter(|column| !self::is_excluded(column))
		.collect::<BTreeSet<_>>();

	let priority = PRIORITY_COLUMNS.iter().copied().filter(|column| present.contains(column));
	let extra = present
		.iter()
		.copied()
		.filter(|column| !PRIORITY_COLUMNS.contains(column));

	priority.chain(extra).collect()
}

/// Writes `rows` as a csv file.
///
/// Missing cells are left empty.
pub fn write(path: &Path, rows: &[Row]) -> Result<(), anyhow::Error> {
	let columns = self::columns(rows);
	let mut writer = csv::WriterBuilder::new()
		.from_path(path)
		.with_context(|| format!("Unable to create csv file {path:?}"))?;

	writer.write_record(&columns).context("Unable to write csv header")?;
	for row in rows {
		let cells = columns.iter().map(|column| row.get(*column).map_or("", String::as_str));
		writer.write_record(cells).context("Unable to write csv row")?;
	}
	writer.flush().context("Unable to flush csv file")?;

	tracing::debug!(?path, rows = rows.len(), columns = columns.len(), "Wrote csv file");
	Ok(())
}

/// Writes one csv file per distinct value of `column` into `dir`.
///
/// Rows without that column are left out. Returns the number of files written.
pub fn write_split_by(
	dir: &Path,
	rows: &[Row],
	column: &str,
	file_name: impl Fn(&str) -> String,
) -> Result<usize, anyhow::Error> {
	fs::create_dir_all(dir).with_context(|| format!("Unable to create directory {dir:?}"))?;

	let groups = rows
		.iter()
		.filter_map(|row| Some((row.get(column)?.as_str(), row.clone())))
		.into_group_map();
	for (value, rows) in groups.iter().sorted_by_key(|(value, _)| **value) {
		// Note: Nested workloads contain path separators
		let path = dir.join(file_name(&value.replace('/', "_")));
		self::write(&path, rows).with_context(|| format!("Unable to write csv for {column} {value:?}"))?;
	}

	Ok(groups.len())
}

/// Builds the row of a run record
#[must_use]
pub fn record_row(record: &MetricsRecord) -> Row {
	record
		.iter()
		.map(|(field, value)| (field.clone(), value.to_string()))
		.collect()
}

/// Builds the row of an aggregate
#[must_use]
pub fn aggregate_row(row: &AggregateRow) -> Row {
	let mut cells = row.group.iter().cloned().collect::<Row>();
	cells.extend(
		row.means
			.iter()
			.map(|(metric, &mean)| (metric.clone(), self::decimal(mean))),
	);
	cells.insert("run_count".to_owned(), row.run_count.to_string());

	cells
}

/// Builds the row of a comparison.
///
/// Means are prefixed by `enabled_prefix` or `disabled_prefix`.
#[must_use]
pub fn comparative_row(row: &ComparativeRow, enabled_prefix: &str, disabled_prefix: &str) -> Row {
	let mut cells = row.group.iter().cloned().collect::<Row>();
	cells.extend(
		row.enabled
			.iter()
			.map(|(metric, &mean)| (format!("{enabled_prefix}_{metric}"), self::decimal(mean))),
	);
	cells.extend(
		row.disabled
			.iter()
			.map(|(metric, &mean)| (format!("{disabled_prefix}_{metric}"), self::decimal(mean))),
	);
	cells.extend(
		row.improvements
			.iter()
			.map(|(metric, &improvement)| (format!("{metric}_improvement"), self::decimal(improvement))),
	);

	cells
}

/// Canonical representation of a decimal
fn decimal(value: f64) -> String {
	MetricValue::rounded(value).to_string()
}
