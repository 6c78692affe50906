//! Utilities

// Modules
pub mod logger;

// Imports
use std::{cell::RefCell, fmt};

/// Extension trait for string slices
#[extend::ext(name = StrTail)]
pub impl str {
	/// Returns the last `max_chars` characters of this string.
	///
	/// Always splits on a character boundary.
	fn tail_chars(&self, max_chars: usize) -> &str {
		let skip = self.chars().count().saturating_sub(max_chars);
		match self.char_indices().nth(skip) {
			Some((idx, _)) => &self[idx..],
			None => "",
		}
	}
}

/// [`fmt::Display`] helper to display using a `FnMut(&mut fmt::Formatter)`
pub struct DisplayWrapper<F: FnMut(&mut fmt::Formatter) -> fmt::Result>(RefCell<F>);

impl<F: FnMut(&mut fmt::Formatter) -> fmt::Result> DisplayWrapper<F> {
	/// Creates a new display wrapper
	#[must_use]
	pub const fn new(func: F) -> Self {
		Self(RefCell::new(func))
	}
}

impl<F: FnMut(&mut fmt::Formatter) -> fmt::Result> fmt::Display for DisplayWrapper<F> {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		// Note: `f` cannot be re-entrant, so this cannot fail
		self.0.borrow_mut()(f)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn tail_chars_keeps_end() {
		assert_eq!("error: bad thing".tail_chars(9), "bad thing");
		assert_eq!("short".tail_chars(200), "short");
		assert_eq!("".tail_chars(3), "");
		assert_eq!("abc".tail_chars(0), "");
	}

	#[test]
	fn tail_chars_respects_char_boundaries() {
		assert_eq!("ação".tail_chars(2), "ão");
	}

	#[test]
	fn display_wrapper_formats_with_closure() {
		let values = [1, 2, 3];
		let wrapper = DisplayWrapper::new(|f| {
			for value in &values {
				write!(f, "[{value}]")?;
			}
			Ok(())
		});
		assert_eq!(wrapper.to_string(), "[1][2][3]");
	}
}
