//! Configuration axes
//!
//! Each axis is an independent dimension of the sweep. The values of each axis
//! are typed, so they can be mapped onto the simulator's knobs without going
//! through strings.

// Imports
use std::fmt;

/// Axis
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Axis<T> {
	/// Name
	pub name: &'static str,

	/// Values, in enumeration order
	pub values: Vec<T>,
}

impl<T> Axis<T> {
	/// Creates a new axis.
	///
	/// Returns `Err` if there are no values, since the cartesian product
	/// would then be empty.
	pub fn new(name: &'static str, values: Vec<T>) -> Result<Self, anyhow::Error> {
		anyhow::ensure!(!values.is_empty(), "Axis {name:?} has no values");
		Ok(Self { name, values })
	}

	/// Returns the number of values in this axis
	#[must_use]
	pub fn len(&self) -> usize {
		self.values.len()
	}

	/// Returns if this axis has no values
	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.values.is_empty()
	}
}

impl<T: fmt::Display> fmt::Display for Axis<T> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}: ", self.name)?;
		for (idx, value) in self.values.iter().enumerate() {
			if idx != 0 {
				f.write_str(", ")?;
			}
			write!(f, "{value}")?;
		}
		Ok(())
	}
}

/// Page table sizes, in entries per level
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
#[derive(serde::Serialize, serde::Deserialize)]
pub struct PageTableSizes {
	pub pgd: u64,
	pub pud: u64,
	pub pmd: u64,
	pub pte: u64,
}

impl Default for PageTableSizes {
	fn default() -> Self {
		Self {
			pgd: 512,
			pud: 512,
			pmd: 512,
			pte: 512,
		}
	}
}

impl fmt::Display for PageTableSizes {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "PGD={} PUD={} PMD={} PTE={}", self.pgd, self.pud, self.pmd, self.pte)
	}
}

/// Cache geometry
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
#[derive(serde::Serialize, serde::Deserialize)]
pub struct CacheGeometry {
	pub entries: u64,
	pub ways:    u64,
}

impl CacheGeometry {
	/// Creates a new geometry
	#[must_use]
	pub const fn new(entries: u64, ways: u64) -> Self {
		Self { entries, ways }
	}
}

impl fmt::Display for CacheGeometry {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}x{}", self.entries, self.ways)
	}
}

/// Page walk cache geometries, one per intermediate level
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
#[derive(serde::Serialize, serde::Deserialize)]
pub struct PwcGeometry {
	pub pgd: CacheGeometry,
	pub pud: CacheGeometry,
	pub pmd: CacheGeometry,
}

impl PwcGeometry {
	/// Geometries swept when no config file is given
	#[must_use]
	pub fn defaults() -> Vec<Self> {
		const fn pwc(pgd: (u64, u64), pud: (u64, u64), pmd: (u64, u64)) -> PwcGeometry {
			PwcGeometry {
				pgd: CacheGeometry::new(pgd.0, pgd.1),
				pud: CacheGeometry::new(pud.0, pud.1),
				pmd: CacheGeometry::new(pmd.0, pmd.1),
			}
		}

		vec![
			pwc((16, 4), (16, 4), (96, 4)),
			pwc((32, 8), (16, 4), (96, 4)),
			pwc((16, 4), (32, 8), (96, 4)),
			pwc((16, 4), (16, 4), (128, 8)),
			pwc((32, 8), (32, 8), (128, 8)),
		]
	}
}

impl fmt::Display for PwcGeometry {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "PGD {} / PUD {} / PMD {}", self.pgd, self.pud, self.pmd)
	}
}

/// Translation cache (TOC) configuration
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
#[derive(serde::Serialize, serde::Deserialize)]
pub struct TocConfig {
	pub enabled: bool,
	pub size:    u64,
}

impl TocConfig {
	/// Configurations swept when no config file is given
	#[must_use]
	pub fn defaults() -> Vec<Self> {
		vec![Self { enabled: false, size: 0 }, Self {
			enabled: true,
			size:    64,
		}]
	}
}

impl fmt::Display for TocConfig {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self.enabled {
			true => write!(f, "TOC on ({} entries)", self.size),
			false => f.write_str("TOC off"),
		}
	}
}

/// Physical memory and TLB sizing
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
#[derive(serde::Serialize, serde::Deserialize)]
pub struct MemoryConfig {
	pub phys_mem_gb:  u64,
	pub l1_tlb_size:  u64,
	pub l2_tlb_size:  u64,
	pub pte_cachable: bool,
}

impl Default for MemoryConfig {
	fn default() -> Self {
		Self {
			phys_mem_gb:  30,
			l1_tlb_size:  32,
			l2_tlb_size:  512,
			pte_cachable: false,
		}
	}
}

impl fmt::Display for MemoryConfig {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(
			f,
			"{} GB, L1 TLB {}, L2 TLB {}, PTE cachable: {}",
			self.phys_mem_gb, self.l1_tlb_size, self.l2_tlb_size, self.pte_cachable
		)
	}
}
