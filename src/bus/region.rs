// Copyright 2021 Nir H. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! Ram-backed memory regions (flash and sram).

use super::Memory;

use crate::BoardError;

/// Whether the cpu may write to a region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegionKind {
	/// Guest writes are rejected; only the image loader fills it.
	ReadOnly,
	/// Plain working memory.
	ReadWrite,
}

/// A named, sized, typed span of the address space.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegionInfo {
	/// The region's name.
	pub name: String,
	/// Where the region is mapped.
	pub base_address: u64,
	/// Number of bytes mapped.
	pub size_bytes: u64,
	/// Access kind.
	pub kind: RegionKind,
}

impl RegionInfo {
	/// The last address covered by the region (inclusive).
	///
	/// An empty region reports its base address.
	pub fn end_address(&self) -> u64 {
		self.base_address + self.size_bytes.saturating_sub(1)
	}

	/// Whether two regions share at least one address.
	pub fn overlaps(&self, other: &RegionInfo) -> bool {
		self.base_address <= other.end_address() && other.base_address <= self.end_address()
	}
}

/// Host memory backing a rom or ram region.
pub struct MemoryRegion {
	name: String,
	kind: RegionKind,
	data: Vec<u8>,
}

impl MemoryRegion {
	/// Allocate a read-only region, zero filled.
	pub fn new_rom(name: &str, size: u64) -> Result<Self, BoardError> {
		Self::allocate(name, size, RegionKind::ReadOnly)
	}

	/// Allocate a read-write region, zero filled.
	pub fn new_ram(name: &str, size: u64) -> Result<Self, BoardError> {
		Self::allocate(name, size, RegionKind::ReadWrite)
	}

	fn allocate(name: &str, size: u64, kind: RegionKind) -> Result<Self, BoardError> {
		let failed = || BoardError::ResourceAllocation { region: name.into(), size };

		// A region can't be empty, nor exceed the 32-bit bus.
		if size == 0 || size > (1 << 32) {
			return Err(failed());
		}
		let len = usize::try_from(size).map_err(|_| failed())?;

		let mut data: Vec<u8> = Vec::new();
		data.try_reserve_exact(len).map_err(|_| failed())?;
		data.resize(len, 0);

		Ok(MemoryRegion {
			name: name.into(),
			kind,
			data,
		})
	}

	/// The region's name.
	pub fn name(&self) -> &str {
		&self.name
	}

	/// The region's access kind.
	pub fn kind(&self) -> RegionKind {
		self.kind
	}

	/// The region's size in bytes.
	pub fn size(&self) -> u64 {
		self.data.len() as u64
	}

	/// Copy `bytes` into the region, starting at `offset`.
	///
	/// Used by loaders; ignores the region's access kind.
	pub fn fill(&mut self, offset: u32, bytes: &[u8]) -> Result<(), BoardError> {
		let start = offset as usize;
		let end = start
			.checked_add(bytes.len())
			.filter(|end| *end <= self.data.len())
			.ok_or(BoardError::BadAddress(offset as u64 + bytes.len() as u64))?;

		self.data[start..end].copy_from_slice(bytes);
		Ok(())
	}
}

impl Memory for MemoryRegion {
	fn write(&mut self, offset: u32, value: u8) -> Result<(), BoardError> {
		if self.kind == RegionKind::ReadOnly {
			return Err(BoardError::ReadOnly(offset as u64));
		}

		match self.data.get_mut(offset as usize) {
			Some(cell) => {
				*cell = value;
				Ok(())
			}
			None => Err(BoardError::BadAddress(offset as u64)),
		}
	}

	fn read(&self, offset: u32) -> Result<u8, BoardError> {
		self.data
			.get(offset as usize)
			.copied()
			.ok_or(BoardError::BadAddress(offset as u64))
	}

	fn load(&mut self, offset: u32, bytes: &[u8]) -> Result<(), BoardError> {
		self.fill(offset, bytes)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_empty_region_is_rejected() {
		match MemoryRegion::new_rom("flash", 0) {
			Err(BoardError::ResourceAllocation { region, size }) => {
				assert_eq!("flash", region);
				assert_eq!(0, size);
			}
			_ => { assert!(false); }
		}
	}

	#[test]
	fn test_rom_rejects_writes() -> Result<(), BoardError> {
		let mut rom = MemoryRegion::new_rom("flash", 16)?;
		rom.fill(4, &[0xAA, 0xBB])?;

		assert!(matches!(rom.write(4, 0), Err(BoardError::ReadOnly(4))));
		assert_eq!(0xAA, rom.read(4)?);
		assert_eq!(0xBB, rom.read(5)?);
		assert_eq!(0x00, rom.read(6)?);
		Ok(())
	}

	#[test]
	fn test_ram_rw() -> Result<(), BoardError> {
		let mut ram = MemoryRegion::new_ram("sram", 8)?;
		ram.write(7, 0x5A)?;

		assert_eq!(0x5A, ram.read(7)?);
		assert!(matches!(ram.read(8), Err(BoardError::BadAddress(8))));
		Ok(())
	}

	#[test]
	fn test_fill_out_of_bounds() -> Result<(), BoardError> {
		let mut rom = MemoryRegion::new_rom("flash", 4)?;

		assert!(rom.fill(2, &[1, 2, 3]).is_err());
		assert!(rom.fill(0, &[1, 2, 3, 4]).is_ok());
		Ok(())
	}

	#[test]
	fn test_overlap() {
		let flash = RegionInfo {
			name: "flash".into(),
			base_address: 0,
			size_bytes: 0x2000_0001,
			kind: RegionKind::ReadOnly,
		};
		let sram = RegionInfo {
			name: "sram".into(),
			base_address: 0x2000_0000,
			size_bytes: 0x1000,
			kind: RegionKind::ReadWrite,
		};

		assert!(flash.overlaps(&sram));
		assert!(!RegionInfo { size_bytes: 0x2000_0000, ..flash }.overlaps(&sram));
	}

	#[test]
	fn test_empty_region_end() {
		let empty = RegionInfo {
			name: "empty".into(),
			base_address: 0,
			size_bytes: 0,
			kind: RegionKind::ReadWrite,
		};

		assert_eq!(0, empty.end_address());
		assert_eq!(0x2000_0000, RegionInfo { base_address: 0x2000_0000, ..empty }.end_address());
	}
}
