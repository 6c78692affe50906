//! Gathers `mtsweep`'s results into csv tables

// Modules
mod aggregate;
mod args;
mod collect;
mod table;

// Imports
use {
	self::args::Args,
	anyhow::Context,
	clap::Parser,
	mtsweep_util::logger,
};

fn main() -> Result<(), anyhow::Error> {
	// Get arguments
	let args = Args::parse();
	logger::pre_init::debug(format!("Args: {args:?}"));

	// Initialize logging
	logger::init(args.log_file.as_deref(), args.log_file_append);

	// Collect every run
	tracing::info!(base_dir = ?args.base_dir, "Gathering results");
	let collect::Collection { records, skipped } =
		collect::collect(&args.base_dir).context("Unable to collect results")?;
	if skipped != 0 {
		tracing::warn!("Skipped {skipped} runs without metrics");
	}
	if records.is_empty() {
		tracing::warn!("No results found");
		return Ok(());
	}
	tracing::info!("Found {} experiment result files", records.len());

	// Write all runs
	let rows = records.iter().map(table::record_row).collect::<Vec<_>>();
	table::write(&args.output, &rows).context("Unable to write results")?;
	let timestamps = table::write_split_by(&args.timestamp_csvs, &rows, "timestamp", |timestamp| {
		format!("experiment_{timestamp}.csv")
	})
	.context("Unable to write per-timestamp results")?;
	let workloads = table::write_split_by(&args.workload_csvs, &rows, "workload", |workload| {
		format!("{workload}_results.csv")
	})
	.context("Unable to write per-workload results")?;
	tracing::info!(timestamps, workloads, "Wrote results");

	// Then the summary
	let summary_keys = aggregate::present_keys(&records, &aggregate::SUMMARY_KEYS);
	let summary = aggregate::summarize(&records, &summary_keys).context("Unable to summarize results")?;
	let summary_rows = summary.iter().map(table::aggregate_row).collect::<Vec<_>>();
	table::write(&args.summary, &summary_rows).context("Unable to write summary")?;
	tracing::info!(configurations = summary.len(), "Wrote summary");

	// And finally the comparison
	let compare_keys = aggregate::present_keys(&records, &aggregate::COMPARE_KEYS);
	let toc_keys = aggregate::present_keys(&records, &aggregate::TOC_ENABLED_KEYS);
	let comparison =
		aggregate::compare(&records, "toc_enabled", &compare_keys, &toc_keys).context("Unable to compare results")?;
	match comparison.is_empty() {
		true => tracing::warn!("No configuration ran with the translation cache both enabled and disabled"),
		false => {
			let comparative_rows = comparison
				.iter()
				.map(|row| table::comparative_row(row, "toc_enabled", "toc_disabled"))
				.collect::<Vec<_>>();
			table::write(&args.comparative, &comparative_rows).context("Unable to write comparison")?;
			tracing::info!(configurations = comparison.len(), "Wrote comparison");
		},
	}

	Ok(())
}
