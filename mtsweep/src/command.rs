//! Simulator command builder

// Imports
use {
	crate::{config::SimulatorConfig, space::SimConfig, workload::ResolvedWorkload},
	std::{
		ffi::OsString,
		fmt,
		path::{Path, PathBuf},
		process,
	},
};

/// Simulator knob
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Knob {
	PgdPwcSize,
	PgdPwcWays,
	PudPwcSize,
	PudPwcWays,
	PmdPwcSize,
	PmdPwcWays,
	PhysMemGb,
	L1TlbSize,
	L2TlbSize,
	PteCachable,
	PgdSize,
	PudSize,
	PmdSize,
	PteSize,
	TocEnabled,
	TocSize,
}

impl Knob {
	/// Returns the command line flag of this knob
	#[must_use]
	pub const fn flag(self) -> &'static str {
		match self {
			Self::PgdPwcSize => "-pgd_pwc_size",
			Self::PgdPwcWays => "-pgd_pwc_ways",
			Self::PudPwcSize => "-pud_pwc_size",
			Self::PudPwcWays => "-pud_pwc_ways",
			Self::PmdPwcSize => "-pmd_pwc_size",
			Self::PmdPwcWays => "-pmd_pwc_ways",
			Self::PhysMemGb => "-phys_mem_gb",
			Self::L1TlbSize => "-l1_tlb_size",
			Self::L2TlbSize => "-l2_tlb_size",
			Self::PteCachable => "-pte_cachable",
			Self::PgdSize => "-pgd_size",
			Self::PudSize => "-pud_size",
			Self::PmdSize => "-pmd_size",
			Self::PteSize => "-pte_size",
			Self::TocEnabled => "-toc_enabled",
			Self::TocSize => "-toc_size",
		}
	}
}

/// Returns every knob's value for a configuration
#[must_use]
pub fn knobs(config: &SimConfig) -> [(Knob, u64); 16] {
	let SimConfig {
		page_tables,
		pwc,
		toc,
		memory,
	} = *config;
	[
		(Knob::PgdPwcSize, pwc.pgd.entries),
		(Knob::PgdPwcWays, pwc.pgd.ways),
		(Knob::PudPwcSize, pwc.pud.entries),
		(Knob::PudPwcWays, pwc.pud.ways),
		(Knob::PmdPwcSize, pwc.pmd.entries),
		(Knob::PmdPwcWays, pwc.pmd.ways),
		(Knob::PhysMemGb, memory.phys_mem_gb),
		(Knob::L1TlbSize, memory.l1_tlb_size),
		(Knob::L2TlbSize, memory.l2_tlb_size),
		(Knob::PteCachable, u64::from(memory.pte_cachable)),
		(Knob::PgdSize, page_tables.pgd),
		(Knob::PudSize, page_tables.pud),
		(Knob::PmdSize, page_tables.pmd),
		(Knob::PteSize, page_tables.pte),
		(Knob::TocEnabled, u64::from(toc.enabled)),
		(Knob::TocSize, toc.size),
	]
}

/// Simulator command
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct SimulatorCommand {
	launcher:    PathBuf,
	tool:        PathBuf,
	working_dir: Option<PathBuf>,
	knobs:       Vec<(Knob, u64)>,
	report:      PathBuf,
	exe:         PathBuf,
	args:        Vec<String>,
	core:        Option<usize>,
}

impl SimulatorCommand {
	/// Creates the command to run `workload` under `config`, writing the report to `report`
	#[must_use]
	pub fn new(simulator: &SimulatorConfig, config: &SimConfig, workload: &ResolvedWorkload, report: &Path) -> Self {
		Self {
			launcher:    simulator.launcher.clone(),
			tool:        simulator.tool.clone(),
			working_dir: simulator.working_dir.clone(),
			knobs:       self::knobs(config).to_vec(),
			report:      report.to_path_buf(),
			exe:         workload.exe.clone(),
			args:        workload.args.clone(),
			core:        None,
		}
	}

	/// Pins the command to a single core
	#[must_use]
	pub fn pin_to_core(self, core: usize) -> Self {
		Self {
			core: Some(core),
			..self
		}
	}

	/// Returns the core this command is pinned to
	#[must_use]
	pub const fn core(&self) -> Option<usize> {
		self.core
	}

	/// Returns the full command line, program first
	#[must_use]
	pub fn argv(&self) -> Vec<OsString> {
		let mut argv = Vec::<OsString>::new();
		if let Some(core) = self.core {
			argv.extend(["taskset".into(), "-c".into(), core.to_string().into()]);
		}

		argv.extend([self.launcher.clone().into(), "-t".into(), self.tool.clone().into()]);
		for &(knob, value) in &self.knobs {
			argv.extend([knob.flag().into(), value.to_string().into()]);
		}
		argv.extend(["-o".into(), self.report.clone().into(), "--".into(), self.exe.clone().into()]);
		argv.extend(self.args.iter().map(OsString::from));

		argv
	}

	/// Builds the process command
	#[must_use]
	pub fn to_command(&self) -> process::Command {
		let mut argv = self.argv().into_iter();
		// Note: `argv` always starts with the launcher or `taskset`
		let mut cmd = process::Command::new(argv.next().unwrap_or_default());
		cmd.args(argv);
		if let Some(working_dir) = &self.working_dir {
			cmd.current_dir(working_dir);
		}

		cmd
	}
}

impl fmt::Display for SimulatorCommand {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		for (idx, arg) in self.argv().iter().enumerate() {
			if idx != 0 {
				f.write_str(" ")?;
			}
			write!(f, "{}", arg.to_string_lossy())?;
		}
		Ok(())
	}
}
