// Copyright 2021 Nir H. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

#![deny(missing_docs)]
//! Emulate the Cortex-M memory map and bus access.

#[macro_use]
pub mod memory_range;
pub mod bitband;
pub mod region;

use core::mem::size_of;

use num::{PrimInt, Unsigned};

use bitband::*;
use memory_range::*;
use region::*;

use crate::BoardError;

/// Bus locations-related constants.
#[allow(missing_docs)]
pub mod consts {
	use super::*;

	/// Code region, flash is mapped at its start.
	pub const MMAP_CODE: MemoryRange = make_range!(0x0000_0000, 0x1FFF_FFFF);
	pub const MMAP_SRAM: MemoryRange = make_range!(0x2000_0000, 0x3FFF_FFFF);
	/// Bit-addressable start of sram.
	pub const MMAP_SRAM_BITBAND: MemoryRange = make_range!(0x2000_0000, 0x200F_FFFF);
	pub const MMAP_SRAM_BITBAND_ALIAS: MemoryRange = make_range!(0x2200_0000, 0x23FF_FFFF);
	pub const MMAP_PERIPHERAL: MemoryRange = make_range!(0x4000_0000, 0x5FFF_FFFF);
	/// Bit-addressable start of the peripheral region.
	pub const MMAP_PERIPHERAL_BITBAND: MemoryRange = make_range!(0x4000_0000, 0x400F_FFFF);
	pub const MMAP_PERIPHERAL_BITBAND_ALIAS: MemoryRange = make_range!(0x4200_0000, 0x43FF_FFFF);
	/// System control space: NVIC, SCB and friends.
	pub const MMAP_SCS: MemoryRange = make_range!(0xE000_E000, 0xE000_EFFF);

	pub const FLASH_BASE: u64 = range_start!(MMAP_CODE);
	pub const SRAM_BASE: u64 = range_start!(MMAP_SRAM);
}

use consts::*;

/// A device that can be written and read by the cpu.
///
/// Addresses are offsets relative to where the device is mapped.
pub trait Memory {
	/// Write a 8-bit value to the device.
	///
	/// * `offset` - The offset to write into.
	/// * `value` - The value to write.
	fn write(&mut self, offset: u32, value: u8) -> Result<(), BoardError>;

	/// Read a 8-bit value from this device.
	///
	/// * `offset` - The offset to read from.
	fn read(&self, offset: u32) -> Result<u8, BoardError>;

	/// Store an image into the device, bypassing guest access rules.
	fn load(&mut self, offset: u32, bytes: &[u8]) -> Result<(), BoardError> {
		for (index, value) in bytes.iter().enumerate() {
			self.write(offset + index as u32, *value)?;
		}

		Ok(())
	}
}

struct Mapping {
	info: RegionInfo,
	device: Box<dyn Memory>,
}

impl Mapping {
	fn offset_of(&self, address: u32) -> Option<u32> {
		let address = address as u64;

		if address >= self.info.base_address && address <= self.info.end_address() {
			Some((address - self.info.base_address) as u32)
		} else {
			None
		}
	}
}

/// The machine's global address space.
///
/// Regions are added once, while the board is composed. When two regions overlap, the
/// one added last answers the access.
#[derive(Default)]
pub struct AddressSpace {
	mappings: Vec<Mapping>,
	bitbands: Vec<BitBand>,
	ignore_transaction_failures: bool,
}

impl AddressSpace {
	/// Initialize an empty address space.
	pub fn new() -> Self {
		Self::default()
	}

	/// Make guest accesses to unmapped or read-only addresses silently succeed.
	///
	/// Failed reads return zero. Loader access is unaffected.
	pub fn set_ignore_transaction_failures(&mut self, ignore: bool) {
		self.ignore_transaction_failures = ignore;
	}

	/// Map a ram-backed region at `base`.
	pub fn add_subregion(&mut self, base: u64, region: MemoryRegion) -> Result<RegionInfo, BoardError> {
		let name = region.name().to_string();
		let size = region.size();
		let kind = region.kind();

		self.add_device(&name, base, size, kind, Box::new(region))
	}

	/// Map an arbitrary device at `base`.
	pub fn add_device(
		&mut self,
		name: &str,
		base: u64,
		size: u64,
		kind: RegionKind,
		device: Box<dyn Memory>,
	) -> Result<RegionInfo, BoardError> {
		if size == 0 || base.checked_add(size).map_or(true, |end| end > (1 << 32)) {
			return Err(BoardError::Configuration(format!(
				"region '{}' ({:#x} bytes at {:#x}) doesn't fit the 32-bit bus",
				name, size, base
			)));
		}

		let info = RegionInfo {
			name: name.into(),
			base_address: base,
			size_bytes: size,
			kind,
		};

		for existing in self.mappings.iter().filter(|m| m.info.overlaps(&info)) {
			log::warn!(
				"region '{}' [{:#010x}..={:#010x}] overlaps '{}' [{:#010x}..={:#010x}]",
				info.name,
				info.base_address,
				info.end_address(),
				existing.info.name,
				existing.info.base_address,
				existing.info.end_address()
			);
		}

		log::debug!("mapped '{}' at {:#010x}, {:#x} bytes", info.name, base, size);
		self.mappings.push(Mapping {
			info: info.clone(),
			device,
		});

		Ok(info)
	}

	/// Register a bit-band alias window.
	pub fn add_bitband(&mut self, band: BitBand) {
		log::debug!(
			"bit-band alias at {:#010x} over {:#010x}",
			band.alias_base,
			band.target_base
		);
		self.bitbands.push(band);
	}

	/// The mapped regions, in the order they were added.
	pub fn regions(&self) -> impl Iterator<Item = &RegionInfo> {
		self.mappings.iter().map(|m| &m.info)
	}

	/// Looks up a mapped region by name.
	pub fn region(&self, name: &str) -> Option<&RegionInfo> {
		self.regions().find(|info| info.name == name)
	}

	/// The registered bit-band windows.
	pub fn bitbands(&self) -> &[BitBand] {
		&self.bitbands
	}

	/// Copy an image into the address space, ignoring read-only protection.
	///
	/// The image must fit entirely inside a single region.
	pub fn load(&mut self, address: u32, bytes: &[u8]) -> Result<(), BoardError> {
		let (index, offset) = self.resolve(address)?;
		self.mappings[index].device.load(offset, bytes)
	}

	/// Writes the complete array's bytes, starting at `address`.
	pub fn write_all(&mut self, address: u32, array: &[u8]) -> Result<(), BoardError> {
		for (index, value) in array.iter().enumerate() {
			self.write(address.wrapping_add(index as u32), *value)?;
		}

		Ok(())
	}

	/// Reads `len` consecutive bytes, starting at `address`.
	pub fn read_bytes(&self, address: u32, len: usize) -> Result<Vec<u8>, BoardError> {
		(0..len)
			.map(|index| self.read(address.wrapping_add(index as u32)))
			.collect()
	}

	/// Reads an unsigned little-endian value.
	pub fn read_le<T: PrimInt + Unsigned>(&self, address: u32) -> Result<T, BoardError> {
		let mut result = T::zero();

		for i in 0..size_of::<T>() {
			let byte = self.read(address.wrapping_add(i as u32))?;
			let data: T = num::cast(byte).unwrap_or_else(T::zero);

			result = result | (data << (8 * i));
		}

		Ok(result)
	}

	/// Writes an unsigned little-endian value.
	pub fn write_le<T: PrimInt + Unsigned>(&mut self, address: u32, value: T) -> Result<(), BoardError> {
		let mask: T = num::cast(0xFF_u8).unwrap_or_else(T::zero);

		for i in 0..size_of::<T>() {
			let byte: u8 = num::cast((value >> (8 * i)) & mask).unwrap_or(0);

			self.write(address.wrapping_add(i as u32), byte)?;
		}

		Ok(())
	}

	/// Returns the mapping that answers the given address and the offset within it.
	fn resolve(&self, address: u32) -> Result<(usize, u32), BoardError> {
		self.mappings
			.iter()
			.enumerate()
			.rev()
			.find_map(|(index, mapping)| mapping.offset_of(address).map(|offset| (index, offset)))
			.ok_or(BoardError::BadAddress(address as u64))
	}

	fn bit_alias(&self, address: u32) -> Option<BitAddress> {
		self.bitbands.iter().find_map(|band| band.translate(address))
	}

	fn raw_write(&mut self, address: u32, value: u8) -> Result<(), BoardError> {
		if let Some(alias) = self.bit_alias(address) {
			if alias.lane != 0 {
				return Ok(());
			}

			let byte = self.raw_read(alias.address)?;
			let byte = if value & 1 != 0 {
				byte | (1 << alias.bit)
			} else {
				byte & !(1 << alias.bit)
			};

			return self.raw_write(alias.address, byte);
		}

		let (index, offset) = self.resolve(address)?;
		self.mappings[index].device.write(offset, value)
	}

	fn raw_read(&self, address: u32) -> Result<u8, BoardError> {
		if let Some(alias) = self.bit_alias(address) {
			if alias.lane != 0 {
				return Ok(0);
			}

			let byte = self.raw_read(alias.address)?;
			return Ok((byte >> alias.bit) & 1);
		}

		let (index, offset) = self.resolve(address)?;
		self.mappings[index].device.read(offset)
	}
}

impl Memory for AddressSpace {
	/// Route a write to the device mapped at `offset`.
	fn write(&mut self, offset: u32, value: u8) -> Result<(), BoardError> {
		match self.raw_write(offset, value) {
			Err(err) if self.ignore_transaction_failures => {
				log::trace!("dropped write of {:#04x} to {:#010x}: {}", value, offset, err);
				Ok(())
			}
			result => result,
		}
	}

	/// Route a read to the device mapped at `offset`.
	fn read(&self, offset: u32) -> Result<u8, BoardError> {
		match self.raw_read(offset) {
			Err(err) if self.ignore_transaction_failures => {
				log::trace!("unmapped read from {:#010x}: {}", offset, err);
				Ok(0)
			}
			result => result,
		}
	}

	fn load(&mut self, offset: u32, bytes: &[u8]) -> Result<(), BoardError> {
		AddressSpace::load(self, offset, bytes)
	}
}
