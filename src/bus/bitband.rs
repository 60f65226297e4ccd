// Copyright 2021 Nir H. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

#![deny(missing_docs)]
//! Bit-band aliasing.
//!
//! Every bit of the first megabyte of a bit-band region is mirrored as a 32-bit word
//! in the region's alias window. Reading an alias word returns the bit in its lowest
//! byte lane, and writing the lowest lane sets or clears the bit.

use super::consts::*;
use super::memory_range::*;

/// Size of a bit-band window (1 MiB).
pub const BITBAND_SIZE: u32 = range_size!(MMAP_SRAM_BITBAND) as u32;

/// A bit-band window and its alias.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BitBand {
	/// First byte of the bit-addressable window.
	pub target_base: u32,
	/// First word of the alias window.
	pub alias_base: u32,
}

/// A single bit, as addressed through an alias word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BitAddress {
	/// The byte containing the bit.
	pub address: u32,
	/// The bit's index within the byte.
	pub bit: u8,
	/// Byte lane of the access within the alias word.
	pub lane: u8,
}

impl BitBand {
	/// The alias window over the start of sram.
	pub fn sram() -> Self {
		BitBand {
			target_base: range_start!(MMAP_SRAM_BITBAND) as u32,
			alias_base: range_start!(MMAP_SRAM_BITBAND_ALIAS) as u32,
		}
	}

	/// The alias window over the start of the peripheral region.
	pub fn peripheral() -> Self {
		BitBand {
			target_base: range_start!(MMAP_PERIPHERAL_BITBAND) as u32,
			alias_base: range_start!(MMAP_PERIPHERAL_BITBAND_ALIAS) as u32,
		}
	}

	/// Size of the alias window, in bytes.
	pub fn alias_size(&self) -> u32 {
		BITBAND_SIZE * 32
	}

	/// Resolve an alias address into the bit it stands for.
	///
	/// Returns `None` if the address is outside the alias window.
	pub fn translate(&self, address: u32) -> Option<BitAddress> {
		let offset = address.checked_sub(self.alias_base)?;
		if offset >= self.alias_size() {
			return None;
		}

		Some(BitAddress {
			address: self.target_base + (offset >> 5),
			bit: ((offset >> 2) & 7) as u8,
			lane: (offset & 3) as u8,
		})
	}
}
