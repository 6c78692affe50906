//! Aggregation
//!
//! Groups run records by their configuration and reduces every group to the
//! mean of each metric. Groups can also be compared across a toggle, such as
//! the translation cache being enabled or not.

// Imports
use {
	mtsweep::{MetricValue, MetricsRecord},
	std::collections::BTreeMap,
};

/// Metrics that are aggregated
pub const METRICS: [&str; 11] = [
	"l1_tlb_hit_percentage",
	"l2_tlb_hit_percentage",
	"tlb_efficiency",
	"pgd_pwc_hit_percentage",
	"pud_pwc_hit_percentage",
	"pmd_pwc_hit_percentage",
	"page_table_memory_mb",
	"pte_cache_hit_ratio",
	"total_access_cost_cycles",
	"avg_memory_requests_per_translation",
	"avg_memory_requests_per_walk",
];

/// Metrics where a lower value is better
pub const LOWER_IS_BETTER: [&str; 3] = [
	"total_access_cost_cycles",
	"avg_memory_requests_per_translation",
	"avg_memory_requests_per_walk",
];

/// Keys identifying a full configuration
pub const SUMMARY_KEYS: [&str; 19] = [
	"experiment_name",
	"workload",
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
];

/// Keys identifying a configuration, except for the translation cache
pub const COMPARE_KEYS: [&str; 17] = [
	"experiment_name",
	"workload",
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
];

/// Keys of the translation cache that only exist while it's enabled
pub const TOC_ENABLED_KEYS: [&str; 1] = ["toc_size"];

/// Returns the keys present in at least one record
#[must_use]
pub fn present_keys<'a>(records: &[MetricsRecord], keys: &[&'a str]) -> Vec<&'a str> {
	keys.iter()
		.copied()
		.filter(|key| records.iter().any(|record| record.contains_key(*key)))
		.collect()
}

/// Aggregate row
#[derive(Clone, PartialEq, Debug)]
pub struct AggregateRow {
	/// Group key and value pairs
	pub group: Vec<(String, String)>,

	/// Mean of every metric with at least one value
	pub means: BTreeMap<String, f64>,

	/// Number of runs in this group
	pub run_count: usize,
}

/// Summarizes `records`, grouped by `group_keys`.
///
/// Records missing any of the keys are left out. Rows are sorted by their group.
pub fn summarize(records: &[MetricsRecord], group_keys: &[&str]) -> Result<Vec<AggregateRow>, anyhow::Error> {
	anyhow::ensure!(!group_keys.is_empty(), "No grouping keys found");
	Ok(self::aggregate(records.iter(), group_keys))
}

/// Comparative row
#[derive(Clone, PartialEq, Debug)]
pub struct ComparativeRow {
	/// Group key and value pairs
	pub group: Vec<(String, String)>,

	/// Means with the toggle enabled
	pub enabled: BTreeMap<String, f64>,

	/// Means with the toggle disabled
	pub disabled: BTreeMap<String, f64>,

	/// Improvement percentage of every metric present on both sides
	pub improvements: BTreeMap<String, f64>,
}

/// Compares records with `toggle` enabled against those with it disabled.
///
/// The disabled side is summarized over `group_keys`, the enabled side over
/// `group_keys` followed by `enabled_keys`, so every enabled group is compared
/// against the disabled group it shares `group_keys` with. Only groups present on
/// both sides are kept. Records whose toggle is missing, or isn't a boolean, are left out.
pub fn compare(
	records: &[MetricsRecord],
	toggle: &str,
	group_keys: &[&str],
	enabled_keys: &[&str],
) -> Result<Vec<ComparativeRow>, anyhow::Error> {
	anyhow::ensure!(!group_keys.is_empty(), "No grouping keys found");

	let (enabled, disabled) = records.iter().fold((vec![], vec![]), |(mut enabled, mut disabled), record| {
		match record.get(toggle).and_then(self::parse_toggle) {
			Some(true) => enabled.push(record),
			Some(false) => disabled.push(record),
			None => tracing::trace!(?toggle, "Record has no toggle value, skipping"),
		}
		(enabled, disabled)
	});
	tracing::debug!(
		enabled = enabled.len(),
		disabled = disabled.len(),
		?toggle,
		"Partitioned records"
	);

	let disabled = self::aggregate(disabled, group_keys)
		.into_iter()
		.map(|row| (row.group, row.means))
		.collect::<BTreeMap<_, _>>();

	let enabled_group_keys = group_keys.iter().chain(enabled_keys).copied().collect::<Vec<_>>();
	let rows = self::aggregate(enabled, &enabled_group_keys)
		.into_iter()
		.filter_map(|row| {
			let disabled = disabled.get(&row.group[..group_keys.len()])?;
			let improvements = row
				.means
				.iter()
				.filter_map(|(metric, &enabled)| {
					let improvement = self::improvement(metric, enabled, *disabled.get(metric)?)?;
					Some((metric.clone(), improvement))
				})
				.collect();

			Some(ComparativeRow {
				group: row.group,
				enabled: row.means,
				disabled: disabled.clone(),
				improvements,
			})
		})
		.collect();

	Ok(rows)
}

/// Signed percentage improvement of `enabled` over `disabled`.
///
/// Returns `None` if `disabled` is zero.
#[must_use]
pub fn improvement(metric: &str, enabled: f64, disabled: f64) -> Option<f64> {
	if disabled == 0.0 {
		return None;
	}

	let delta = match LOWER_IS_BETTER.contains(&metric) {
		true => disabled - enabled,
		false => enabled - disabled,
	};
	Some(((delta / disabled * 100.0) * 1e6).round() / 1e6)
}

/// Parses a toggle value
#[must_use]
pub fn parse_toggle(value: &MetricValue) -> Option<bool> {
	match value {
		MetricValue::Integer(1) => Some(true),
		MetricValue::Integer(0) => Some(false),
		MetricValue::Text(text) => match text.to_ascii_lowercase().as_str() {
			"true" | "1" | "yes" | "on" => Some(true),
			"false" | "0" | "no" | "off" => Some(false),
			_ => None,
		},
		_ => None,
	}
}

/// Groups and aggregates `records`
fn aggregate<'a>(records: impl IntoIterator<Item = &'a MetricsRecord>, group_keys: &[&str]) -> Vec<AggregateRow> {
	let mut groups = BTreeMap::<Vec<String>, Vec<&MetricsRecord>>::new();
	for record in records {
		let Some(group) = group_keys
			.iter()
			.map(|key| record.get(*key).map(ToString::to_string))
			.collect::<Option<Vec<_>>>()
		else {
			tracing::trace!(?group_keys, "Record is missing a grouping key, skipping");
			continue;
		};
		groups.entry(group).or_default().push(record);
	}

	groups
		.into_iter()
		.map(|(group, records)| {
			let means = METRICS
				.iter()
				.filter_map(|&metric| {
					let mean = records
						.iter()
						.filter_map(|record| record.get(metric)?.as_f64())
						.collect::<average::Mean>();
					match mean.is_empty() {
						true => None,
						false => Some((metric.to_owned(), mean.mean())),
					}
				})
				.collect();

			AggregateRow {
				group: group_keys
					.iter()
					.map(|key| (*key).to_owned())
					.zip(group)
					.collect(),
				means,
				run_count: records.len(),
			}
		})
		.collect()
}
