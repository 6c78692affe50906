//! Simulator report parsing
//!
//! The simulator's report is free-form text. Metrics are extracted by matching
//! every rule of a closed [`CATALOGUE`] against the whole report, independently
//! of one another. Each rule names the fields its capture groups map onto and
//! what happens when its label is missing.
//!
//! On top of the extracted fields, a few fields are derived from the six
//! translation resolution paths, each of which has a fixed memory access cost.

// Imports
use {
	once_cell::sync::Lazy,
	regex::Regex,
	std::{collections::BTreeMap, fmt},
};

/// Metric value
#[derive(Clone, PartialEq, Debug)]
pub enum MetricValue {
	Integer(u64),
	Decimal(f64),
	Text(String),
}

impl MetricValue {
	/// Returns this value as a float, if numeric
	#[must_use]
	pub fn as_f64(&self) -> Option<f64> {
		match *self {
			Self::Integer(value) => Some(value as f64),
			Self::Decimal(value) => Some(value),
			Self::Text(_) => None,
		}
	}

	/// Returns this value as an integer, if it is one
	#[must_use]
	pub fn as_u64(&self) -> Option<u64> {
		match *self {
			Self::Integer(value) => Some(value),
			_ => None,
		}
	}

	/// Creates a decimal rounded to 6 places
	#[must_use]
	pub fn rounded(value: f64) -> Self {
		Self::Decimal((value * 1e6).round() / 1e6)
	}
}

/// Canonical representation.
///
/// Integers are plain digits, decimals are rounded to 6 places and always keep
/// a fractional digit (`60.0`), and text is written as-is.
impl fmt::Display for MetricValue {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Integer(value) => write!(f, "{value}"),
			Self::Decimal(value) => {
				let value = (value * 1e6).round() / 1e6;
				match value.fract() == 0.0 && value.is_finite() {
					true => write!(f, "{value:.1}"),
					false => write!(f, "{value}"),
				}
			},
			Self::Text(value) => f.write_str(value),
		}
	}
}

/// Metrics record
pub type MetricsRecord = BTreeMap<String, MetricValue>;

/// Kind of value a capture group holds
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ValueKind {
	Integer,
	Decimal,
	Text,
}

impl ValueKind {
	/// Converts a captured string into a value of this kind
	fn parse(self, s: &str) -> Option<MetricValue> {
		match self {
			Self::Integer => s.parse().ok().map(MetricValue::Integer),
			Self::Decimal => s.parse::<f64>().ok().filter(|value| value.is_finite()).map(MetricValue::Decimal),
			Self::Text => Some(MetricValue::Text(s.to_owned())),
		}
	}
}

/// Field captured by a rule
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Capture {
	/// Field name
	pub field: &'static str,

	/// Value kind
	pub kind: ValueKind,
}

const fn int(field: &'static str) -> Capture {
	Capture {
		field,
		kind: ValueKind::Integer,
	}
}

const fn dec(field: &'static str) -> Capture {
	Capture {
		field,
		kind: ValueKind::Decimal,
	}
}

const fn text(field: &'static str) -> Capture {
	Capture {
		field,
		kind: ValueKind::Text,
	}
}

/// Policy when a rule's label isn't in the report
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Absent {
	/// The fields are left out
	Omit,

	/// The fields are zero
	Zero,
}

/// Labeled-line rule
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct LabelRule {
	/// Label
	pub label: &'static str,

	/// Pattern, matched anywhere in the report
	pub pattern: &'static str,

	/// Captures, in capture group order.
	///
	/// There may be less captures than groups in the pattern, the
	/// remaining groups are ignored.
	pub captures: &'static [Capture],

	/// Policy when missing
	pub absent: Absent,
}

impl LabelRule {
	const fn new(label: &'static str, pattern: &'static str, captures: &'static [Capture]) -> Self {
		Self {
			label,
			pattern,
			captures,
			absent: Absent::Omit,
		}
	}

	const fn zero_if_absent(self) -> Self {
		Self {
			absent: Absent::Zero,
			..self
		}
	}
}

/// Every label recognized in a report
pub static CATALOGUE: &[LabelRule] = &[
	// Configuration
	LabelRule::new("Physical Memory", r"Physical Memory:\s+(\d+)\s+GB", &[int("phys_mem_gb")]),
	LabelRule::new("L1 TLB", r"L1 TLB:\s+(\d+)\s+entries,\s+(\d+)-way", &[
		int("l1_tlb_entries"),
		int("l1_tlb_ways"),
	]),
	LabelRule::new("L2 TLB", r"L2 TLB:\s+(\d+)\s+entries,\s+(\d+)-way", &[
		int("l2_tlb_entries"),
		int("l2_tlb_ways"),
	]),
	LabelRule::new(
		"Page Walk Cache (PGD)",
		r"Page Walk Cache \(PGD\):\s+(\d+)\s+entries,\s+(\d+)-way",
		&[int("pgd_pwc_entries"), int("pgd_pwc_ways")],
	),
	LabelRule::new(
		"Page Walk Cache (PUD)",
		r"Page Walk Cache \(PUD\):\s+(\d+)\s+entries,\s+(\d+)-way",
		&[int("pud_pwc_entries"), int("pud_pwc_ways")],
	),
	LabelRule::new(
		"Page Walk Cache (PMD)",
		r"Page Walk Cache \(PMD\):\s+(\d+)\s+entries,\s+(\d+)-way",
		&[int("pmd_pwc_entries"), int("pmd_pwc_ways")],
	),
	LabelRule::new("PGD Size", r"PGD Size:\s+(\d+)\s+entries", &[int("pgd_size")]),
	LabelRule::new("PUD Size", r"PUD Size:\s+(\d+)\s+entries", &[int("pud_size")]),
	LabelRule::new("PMD Size", r"PMD Size:\s+(\d+)\s+entries", &[int("pmd_size")]),
	LabelRule::new("PTE Size", r"PTE Size:\s+(\d+)\s+entries", &[int("pte_size")]),
	LabelRule::new("TOC Enabled", r"TOC Enabled:\s+(\w+)", &[text("toc_enabled")]),
	LabelRule::new("TOC Size", r"TOC Size:\s+(\d+)", &[int("toc_size")]),
	// Translation resolution paths
	LabelRule::new("L1 TLB Hit", r"L1 TLB Hit\s+(\d+)\s+([\d\.]+)%", &[int("l1_tlb_hit_count")]).zero_if_absent(),
	LabelRule::new("L2 TLB Hit", r"L2 TLB Hit\s+(\d+)\s+([\d\.]+)%", &[int("l2_tlb_hit_count")]).zero_if_absent(),
	LabelRule::new("PMD PWC Hit", r"PMD PWC Hit\s+(\d+)\s+([\d\.]+)%", &[int("pmd_pwc_hit_count")]).zero_if_absent(),
	LabelRule::new("PUD PWC Hit", r"PUD PWC Hit\s+(\d+)\s+([\d\.]+)%", &[int("pud_pwc_hit_count")]).zero_if_absent(),
	LabelRule::new("PGD PWC Hit", r"PGD PWC Hit\s+(\d+)\s+([\d\.]+)%", &[int("pgd_pwc_hit_count")]).zero_if_absent(),
	LabelRule::new("Full Page Walk", r"Full Page Walk\s+(\d+)\s+([\d\.]+)?%?", &[int(
		"full_page_walk_count",
	)])
	.zero_if_absent(),
	LabelRule::new("Total Translations", r"Total Translations\s+(\d+)", &[int("total_translations")]),
	LabelRule::new("TLB Efficiency", r"TLB Efficiency:\s+([\d\.]+)%", &[dec("tlb_efficiency")]),
	// Cache statistics rows: name, entries, sets, ways, accesses, hits, hit rate
	LabelRule::new(
		"L1 TLB statistics",
		r"L1 TLB\s+\d+\s+\d+\s+\d+\s+(\d+)\s+\d+\s+([\d\.]+)%",
		&[int("l1_tlb_accesses"), dec("l1_tlb_hit_percentage")],
	),
	LabelRule::new(
		"L2 TLB statistics",
		r"L2 TLB\s+\d+\s+\d+\s+\d+\s+(\d+)\s+\d+\s+([\d\.]+)%",
		&[int("l2_tlb_accesses"), dec("l2_tlb_hit_percentage")],
	),
	LabelRule::new(
		"PML4E Cache (PGD)",
		r"PML4E Cache \(PGD\)\s+\d+\s+\d+\s+\d+\s+(\d+)\s+\d+\s+([\d\.]+)%",
		&[int("pgd_pwc_accesses"), dec("pgd_pwc_hit_percentage")],
	),
	LabelRule::new(
		"PDPTE Cache (PUD)",
		r"PDPTE Cache \(PUD\)\s+\d+\s+\d+\s+\d+\s+(\d+)\s+\d+\s+([\d\.]+)%",
		&[int("pud_pwc_accesses"), dec("pud_pwc_hit_percentage")],
	),
	LabelRule::new(
		"PDE Cache (PMD)",
		r"PDE Cache \(PMD\)\s+\d+\s+\d+\s+\d+\s+(\d+)\s+\d+\s+([\d\.]+)%",
		&[int("pmd_pwc_accesses"), dec("pmd_pwc_hit_percentage")],
	),
	// Page tables
	LabelRule::new("Total page tables", r"Total page tables:\s+(\d+)", &[int("total_page_tables")]),
	LabelRule::new(
		"Total memory for page tables",
		r"Total memory for page tables:\s+([\d\.]+)\s+MB",
		&[dec("page_table_memory_mb")],
	),
	LabelRule::new(
		"Page Table Entry data Cache Hits",
		r"Page Table Entry data Cache Hits\s+(\d+)",
		&[int("pte_cache_hits")],
	),
	LabelRule::new(
		"Page Table Entry data Cache Misses",
		r"Page Table Entry data Cache Misses\s+(\d+)",
		&[int("pte_cache_misses")],
	),
	LabelRule::new(
		"Page Walk Memory Accesses",
		r"Page Walk Memory Accesses\s+(\d+)",
		&[int("page_walk_memory_accesses")],
	),
	LabelRule::new(
		"Page Table Entry Cache hits ratio",
		r"Page Table Entry Cache hits ratio\s+([\d\.]+)%",
		&[dec("pte_cache_hit_ratio")],
	),
	// Data cache
	LabelRule::new("Memory Accesses", r"Memory Accesses:\s+(\d+)", &[int("memory_accesses")]),
	LabelRule::new(
		"Total Access Cost (cycles)",
		r"Total Access Cost \(cycles\):\s+(\d+)",
		&[int("total_access_cost_cycles")],
	),
];

/// Compiled patterns, one per catalogue rule
static PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
	CATALOGUE
		.iter()
		.map(|rule| Regex::new(rule.pattern).expect("Catalogue patterns are valid"))
		.collect()
});

/// Translation resolution paths, fastest first, with their memory access cost
pub const RESOLUTION_PATHS: [(&str, u64); 6] = [
	("l1_tlb_hit_count", 0),
	("l2_tlb_hit_count", 0),
	("pmd_pwc_hit_count", 1),
	("pud_pwc_hit_count", 2),
	("pgd_pwc_hit_count", 3),
	("full_page_walk_count", 4),
];

/// Applies a single rule to `report`, inserting the captured fields into `record`.
///
/// Returns whether the rule's label was found.
fn apply_rule(rule: &LabelRule, pattern: &Regex, report: &str, record: &mut MetricsRecord) -> bool {
	let Some(captures) = pattern.captures(report) else {
		return false;
	};

	for (group_idx, capture) in rule.captures.iter().enumerate() {
		let Some(group) = captures.get(group_idx + 1) else {
			continue;
		};

		match capture.kind.parse(group.as_str()) {
			Some(value) => {
				record.insert(capture.field.to_owned(), value);
			},
			None => tracing::debug!(
				label = rule.label,
				field = capture.field,
				value = group.as_str(),
				"Unable to parse report value, skipping field"
			),
		}
	}

	true
}

/// Parses a report into a metrics record.
///
/// Never fails: malformed values only drop their own field. A report in which
/// no label is found at all yields an empty record.
#[must_use]
pub fn parse(report: &str) -> MetricsRecord {
	let mut record = MetricsRecord::new();

	let mut any_found = false;
	let mut missing = vec![];
	for (rule, pattern) in CATALOGUE.iter().zip(&*PATTERNS) {
		match self::apply_rule(rule, pattern, report, &mut record) {
			true => any_found = true,
			false => missing.push(rule),
		}
	}

	// Note: Without any label, this isn't a report, so we don't zero anything.
	if !any_found {
		return record;
	}

	for rule in missing {
		tracing::trace!(label = rule.label, "Label missing from report");
		if rule.absent == Absent::Zero {
			for capture in rule.captures {
				record.insert(capture.field.to_owned(), MetricValue::Integer(0));
			}
		}
	}

	self::add_derived(&mut record);
	record
}

/// Weighted number of memory requests across all resolution paths.
///
/// Returns `None` if any path count is missing.
#[must_use]
pub fn weighted_memory_requests(record: &MetricsRecord) -> Option<u64> {
	RESOLUTION_PATHS.iter().try_fold(0_u64, |acc, &(field, cost)| {
		let count = record.get(field)?.as_u64()?;
		acc.checked_add(count.checked_mul(cost)?)
	})
}

/// Adds all derived fields to `record`
fn add_derived(record: &mut MetricsRecord) {
	// Note: The L1 TLB is accessed once per translation
	if !record.contains_key("total_translations") {
		if let Some(accesses) = record.get("l1_tlb_accesses").cloned() {
			record.insert("total_translations".to_owned(), accesses);
		}
	}

	let Some(memory_requests) = self::weighted_memory_requests(record) else {
		return;
	};

	if let Some(total) = record.get("total_translations").and_then(MetricValue::as_u64) {
		if total > 0 {
			record.insert(
				"avg_memory_requests_per_translation".to_owned(),
				MetricValue::rounded(memory_requests as f64 / total as f64),
			);
		}
	}

	// Note: The numerator counts every path, while the denominator only
	//       counts walks that reached the PMD page walk cache.
	if let Some(pmd_accesses) = record.get("pmd_pwc_accesses").and_then(MetricValue::as_u64) {
		if pmd_accesses > 0 {
			record.insert(
				"avg_memory_requests_per_walk".to_owned(),
				MetricValue::rounded(memory_requests as f64 / pmd_accesses as f64),
			);
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	const FULL_REPORT: &str = "\
Memory Simulator Configuration:
Physical Memory: 30 GB
L1 TLB: 32 entries, 4-way
L2 TLB: 512 entries, 8-way
Page Walk Cache (PGD): 16 entries, 4-way
Page Walk Cache (PUD): 16 entries, 4-way
Page Walk Cache (PMD): 96 entries, 4-way
PGD Size: 512 entries
PUD Size: 512 entries
PMD Size: 512 entries
PTE Size: 512 entries
TOC Enabled: true
TOC Size: 64

Translation Path Statistics:
L1 TLB Hit                    800            80.00%
L2 TLB Hit                    100            10.00%
PMD PWC Hit                   50             5.00%
PUD PWC Hit                   25             2.50%
PGD PWC Hit                   15             1.50%
Full Page Walk                10             1.00%
Total Translations            1000
TLB Efficiency: 90.00%

Cache Statistics:
Cache                         Entries   Sets      Ways             Accesses           Hits       Hit Rate
---------------------------------------------------------------------------------------------------------
L1 TLB                        32        8         4                    1000            800         80.00%
L2 TLB                        512       64        8                     200            100         50.00%
PML4E Cache (PGD)             16        4         4                      25             15         60.00%
PDPTE Cache (PUD)             16        4         4                      50             25         50.00%
PDE Cache (PMD)               96        24        4                     100             50         50.00%

Total page tables: 12
Total memory for page tables: 0.046875 MB

Page Table Entry data Cache Hits        420
Page Table Entry data Cache Misses       80
Page Walk Memory Accesses               500
Page Table Entry Cache hits ratio     84.00%

Memory Accesses: 123456
Total Access Cost (cycles): 987654
";

	fn int_field(record: &MetricsRecord, field: &str) -> Option<u64> {
		record.get(field).and_then(MetricValue::as_u64)
	}

	#[test]
	fn catalogue_patterns_compile() {
		assert_eq!(PATTERNS.len(), CATALOGUE.len());
		for (rule, pattern) in CATALOGUE.iter().zip(&*PATTERNS) {
			assert!(
				pattern.captures_len() > rule.captures.len(),
				"Rule {:?} has more captures than groups",
				rule.label
			);
		}
	}

	#[test]
	fn catalogue_fields_are_unique() {
		let mut fields = CATALOGUE
			.iter()
			.flat_map(|rule| rule.captures.iter().map(|capture| capture.field))
			.collect::<Vec<_>>();
		let total = fields.len();
		fields.sort_unstable();
		fields.dedup();
		assert_eq!(fields.len(), total);
	}

	#[test]
	fn parses_full_report() {
		let record = parse(FULL_REPORT);

		assert_eq!(int_field(&record, "phys_mem_gb"), Some(30));
		assert_eq!(int_field(&record, "l2_tlb_ways"), Some(8));
		assert_eq!(int_field(&record, "pmd_pwc_entries"), Some(96));
		assert_eq!(int_field(&record, "pte_size"), Some(512));
		assert_eq!(record.get("toc_enabled"), Some(&MetricValue::Text("true".to_owned())));
		assert_eq!(int_field(&record, "toc_size"), Some(64));
		assert_eq!(int_field(&record, "l1_tlb_hit_count"), Some(800));
		assert_eq!(int_field(&record, "full_page_walk_count"), Some(10));
		assert_eq!(int_field(&record, "total_translations"), Some(1000));
		assert_eq!(record.get("tlb_efficiency").map(ToString::to_string).as_deref(), Some("90.0"));
		assert_eq!(int_field(&record, "l1_tlb_accesses"), Some(1000));
		assert_eq!(int_field(&record, "pgd_pwc_accesses"), Some(25));
		assert_eq!(int_field(&record, "pmd_pwc_accesses"), Some(100));
		assert_eq!(
			record.get("pud_pwc_hit_percentage").map(ToString::to_string).as_deref(),
			Some("50.0")
		);
		assert_eq!(int_field(&record, "total_page_tables"), Some(12));
		assert_eq!(
			record.get("page_table_memory_mb").map(ToString::to_string).as_deref(),
			Some("0.046875")
		);
		assert_eq!(int_field(&record, "pte_cache_hits"), Some(420));
		assert_eq!(int_field(&record, "pte_cache_misses"), Some(80));
		assert_eq!(int_field(&record, "page_walk_memory_accesses"), Some(500));
		assert_eq!(int_field(&record, "memory_accesses"), Some(123456));
		assert_eq!(int_field(&record, "total_access_cost_cycles"), Some(987654));
	}

	#[test]
	fn derives_average_memory_requests() {
		let record = parse(FULL_REPORT);

		// 50 * 1 + 25 * 2 + 15 * 3 + 10 * 4 = 185
		assert_eq!(weighted_memory_requests(&record), Some(185));
		assert_eq!(
			record.get("avg_memory_requests_per_translation"),
			Some(&MetricValue::Decimal(0.185))
		);
	}

	/// The per-walk average divides the weighted sum over every path by the
	/// PMD page walk cache accesses only, so it may exceed the per-path cost bound.
	#[test]
	fn per_walk_average_uses_pmd_accesses() {
		let record = parse(FULL_REPORT);
		assert_eq!(record.get("avg_memory_requests_per_walk"), Some(&MetricValue::Decimal(1.85)));

		let record = parse("PDE Cache (PMD)  96  24  4  10  5  50.00%\nFull Page Walk  20  100.00%\n");
		assert_eq!(record.get("avg_memory_requests_per_walk"), Some(&MetricValue::Decimal(8.0)));
	}

	#[test]
	fn parses_minimal_report() {
		let record = parse("L1 TLB Hit 120 60.0%\nTotal Translations 200\n");

		assert_eq!(int_field(&record, "l1_tlb_hit_count"), Some(120));
		assert_eq!(int_field(&record, "total_translations"), Some(200));
		assert_eq!(int_field(&record, "full_page_walk_count"), Some(0));
		assert_eq!(int_field(&record, "pgd_pwc_hit_count"), Some(0));
		assert_eq!(record.get("avg_memory_requests_per_translation").map(ToString::to_string).as_deref(), Some("0.0"));
		assert!(!record.contains_key("phys_mem_gb"));
		assert!(!record.contains_key("tlb_efficiency"));
		assert!(!record.contains_key("avg_memory_requests_per_walk"));
	}

	#[test]
	fn full_page_walk_without_percentage() {
		let record = parse("Full Page Walk 42\n");
		assert_eq!(int_field(&record, "full_page_walk_count"), Some(42));
	}

	#[test]
	fn empty_report_yields_nothing() {
		assert!(parse("").is_empty());
		assert!(parse("Processed 1*10M accesses\nsegmentation fault\n").is_empty());
	}

	#[test]
	fn total_translations_falls_back_to_l1_accesses() {
		let record = parse("L1 TLB   32  8  4  400  300  75.00%\nFull Page Walk  100  25.00%\n");
		assert_eq!(int_field(&record, "total_translations"), Some(400));
		assert_eq!(record.get("avg_memory_requests_per_translation"), Some(&MetricValue::Decimal(1.0)));
	}

	#[test]
	fn zero_translations_has_no_average() {
		let record = parse("Total Translations 0\n");
		assert_eq!(int_field(&record, "total_translations"), Some(0));
		assert!(!record.contains_key("avg_memory_requests_per_translation"));
	}

	#[test]
	fn malformed_value_only_drops_its_field() {
		let record = parse("Total Translations 99999999999999999999999\nTOC Size: 64\nTLB Efficiency: 1.2.3%\n");
		assert!(!record.contains_key("total_translations"));
		assert!(!record.contains_key("tlb_efficiency"));
		assert_eq!(int_field(&record, "toc_size"), Some(64));
		assert!(!record.contains_key("avg_memory_requests_per_translation"));
	}

	#[test]
	fn first_match_wins() {
		let record = parse("TOC Size: 64\nTOC Size: 128\n");
		assert_eq!(int_field(&record, "toc_size"), Some(64));
	}

	#[test]
	fn average_is_bounded_by_path_costs() {
		let reports = [
			"L1 TLB Hit 5 100.00%\nTotal Translations 5\n",
			"Full Page Walk 5 100.00%\nTotal Translations 5\n",
			"PMD PWC Hit 3 30.00%\nPGD PWC Hit 7 70.00%\nTotal Translations 10\n",
			FULL_REPORT,
		];
		for report in reports {
			let avg = parse(report)
				.get("avg_memory_requests_per_translation")
				.and_then(MetricValue::as_f64)
				.expect("Average present");
			assert!((0.0..=4.0).contains(&avg), "Average {avg} out of bounds");
		}
	}

	#[test]
	fn canonical_values() {
		assert_eq!(MetricValue::Integer(120).to_string(), "120");
		assert_eq!(MetricValue::Decimal(60.0).to_string(), "60.0");
		assert_eq!(MetricValue::rounded(2.0 / 3.0).to_string(), "0.666667");
		assert_eq!(MetricValue::Decimal(1.23456789).to_string(), "1.234568");
		assert_eq!(MetricValue::Text("true".to_owned()).to_string(), "true");
	}
}
