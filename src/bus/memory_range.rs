// Copyright 2021 Nir H. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

#![deny(missing_docs)]
//! Macros for describing memory ranges.

/// Memory range is represented by start and end addresses, 32 bits each.
pub type MemoryRange = u64;

/// Memory boundries - wrapper for passing constants into a range pattern.
pub trait MemoryBounds<const S: u64> {
	/// The start address of the memory boundry.
	const START: u32 = ((S >> 32) & 0xFFFF_FFFF) as u32;
	/// The end address of the memory boundry.
	const END: u32 = (S & 0xFFFF_FFFF) as u32;
}

impl<const S: u64> MemoryBounds<S> for () { }

/// Make a memory range constant.
///
/// * `start` - Start address (inclusive).
/// * `end` - End address (inclusive).
#[macro_export]
macro_rules! make_range {
	($start:tt, $end:tt) => (($start << 32) + $end)
}

/// Returns the first address in the given memory range.
#[macro_export]
macro_rules! range_start {
	($range:tt) => { (<() as MemoryBounds<$range>>::START as u64) }
}

/// Returns the last address (inclusive) in the given memory range.
#[macro_export]
macro_rules! range_end {
	($range:tt) => { (<() as MemoryBounds<$range>>::END as u64) }
}

/// Returns the number of bytes covered by the given memory range.
#[macro_export]
macro_rules! range_size {
	($range:tt) => { (range_end!($range) - range_start!($range) + 1) }
}

/// Create a range pattern from the given memory range.
///
/// # Examples
/// ```
/// # #[macro_use] extern crate virt_cortex_m;
/// # use virt_cortex_m::bus::memory_range::*;
/// # fn main() {
///
/// const MMAP_SRAM: MemoryRange = make_range!(0x2000_0000, 0x3FFF_FFFF);
/// let address: u32 = 0x2000_1000;
///
/// match address {
///		memory_range!(MMAP_SRAM) => {}
///		_ => { assert!(false); }
/// }
///
/// # }
/// ```
#[macro_export]
macro_rules! memory_range {
	($range:tt) => {
		<() as MemoryBounds<$range>>::START..=<() as MemoryBounds<$range>>::END
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_memory_range() {
		const FIRST_5_BYTES: MemoryRange = make_range!(0, 4);

		match 3_u32 {
			memory_range!(FIRST_5_BYTES) => {}
			_ => { assert!(false); }
		};

		match 5_u32 {
			memory_range!(FIRST_5_BYTES) => { assert!(false); }
			_ => {}
		};
	}

	#[test]
	fn test_range_bounds() {
		const HIGH: MemoryRange = make_range!(0xE000_E000, 0xE000_EFFF);

		assert_eq!(0xE000_E000, range_start!(HIGH));
		assert_eq!(0xE000_EFFF, range_end!(HIGH));
		assert_eq!(0x1000, range_size!(HIGH));
	}
}
