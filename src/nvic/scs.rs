// Copyright 2021 Nir H. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

#![deny(missing_docs)]
//! The System Control Space register block.
//!
//! Only register storage is modelled: enable, pending and priority bits are kept but
//! never delivered to the core.

use crate::bus::Memory;
use crate::bus::memory_range::*;
use crate::BoardError;

/// Register offsets within the system control space.
#[allow(missing_docs)]
pub mod consts {
	use super::*;

	/// Interrupt controller type register.
	pub const SCS_ICTR: MemoryRange = make_range!(0x004, 0x007);
	pub const SCS_NVIC_ISER: MemoryRange = make_range!(0x100, 0x13F);
	pub const SCS_NVIC_ICER: MemoryRange = make_range!(0x180, 0x1BF);
	pub const SCS_NVIC_ISPR: MemoryRange = make_range!(0x200, 0x23F);
	pub const SCS_NVIC_ICPR: MemoryRange = make_range!(0x280, 0x2BF);
	/// Active bits, read-only.
	pub const SCS_NVIC_IABR: MemoryRange = make_range!(0x300, 0x33F);
	pub const SCS_NVIC_IPR: MemoryRange = make_range!(0x400, 0x5EF);
	pub const SCS_CPUID: MemoryRange = make_range!(0xD00, 0xD03);
	pub const SCS_VTOR: MemoryRange = make_range!(0xD08, 0xD0B);

	/// Implemented VTOR bits (TBLOFF).
	pub const VTOR_MASK: u32 = 0xFFFF_FF80;
	/// One bit per line, 32 lines per register.
	pub const NVIC_BANKS: usize = 16;
}

use consts::*;

/// Index of the 32-bit register containing `offset`, within a register bank.
macro_rules! bank {
	($offset:expr, $range:tt) => ((($offset as u64 - range_start!($range)) / 4) as usize)
}

/// NVIC and system control registers.
pub struct SystemControlSpace {
	num_irq: u32,
	cpuid: u32,
	vtor: u32,
	enabled: [u32; NVIC_BANKS],
	pending: [u32; NVIC_BANKS],
	priority: Vec<u8>,
}

impl SystemControlSpace {
	/// Create the register block for `num_irq` external lines.
	pub fn new(num_irq: u32, cpuid: u32) -> Self {
		SystemControlSpace {
			num_irq,
			cpuid,
			vtor: 0,
			enabled: [0; NVIC_BANKS],
			pending: [0; NVIC_BANKS],
			priority: vec![0; num_irq as usize],
		}
	}

	/// Bits of register `bank` that map to implemented lines.
	fn line_mask(&self, bank: usize) -> u32 {
		let first = bank as u32 * 32;

		match self.num_irq.saturating_sub(first) {
			0 => 0,
			n if n >= 32 => 0xFFFF_FFFF,
			n => (1 << n) - 1,
		}
	}

	/// Value of the ICTR register.
	fn ictr(&self) -> u32 {
		((self.num_irq + 31) / 32).saturating_sub(1)
	}

	/// The 32-bit register containing `offset`, for word-wide registers.
	fn register(&self, offset: u32) -> Option<u32> {
		match offset {
			memory_range!(SCS_ICTR) => Some(self.ictr()),
			memory_range!(SCS_NVIC_ISER) => Some(self.enabled[bank!(offset, SCS_NVIC_ISER)]),
			memory_range!(SCS_NVIC_ICER) => Some(self.enabled[bank!(offset, SCS_NVIC_ICER)]),
			memory_range!(SCS_NVIC_ISPR) => Some(self.pending[bank!(offset, SCS_NVIC_ISPR)]),
			memory_range!(SCS_NVIC_ICPR) => Some(self.pending[bank!(offset, SCS_NVIC_ICPR)]),
			memory_range!(SCS_NVIC_IABR) => Some(0),
			memory_range!(SCS_CPUID) => Some(self.cpuid),
			memory_range!(SCS_VTOR) => Some(self.vtor),
			_ => None,
		}
	}
}

impl Memory for SystemControlSpace {
	fn write(&mut self, offset: u32, value: u8) -> Result<(), BoardError> {
		let lane = offset & 3;
		let bits = (value as u32) << (8 * lane);

		match offset {
			memory_range!(SCS_NVIC_ISER) => {
				let bank = bank!(offset, SCS_NVIC_ISER);
				self.enabled[bank] |= bits & self.line_mask(bank);
			}
			memory_range!(SCS_NVIC_ICER) => {
				let bank = bank!(offset, SCS_NVIC_ICER);
				self.enabled[bank] &= !(bits & self.line_mask(bank));
			}
			memory_range!(SCS_NVIC_ISPR) => {
				let bank = bank!(offset, SCS_NVIC_ISPR);
				self.pending[bank] |= bits & self.line_mask(bank);
			}
			memory_range!(SCS_NVIC_ICPR) => {
				let bank = bank!(offset, SCS_NVIC_ICPR);
				self.pending[bank] &= !(bits & self.line_mask(bank));
			}
			memory_range!(SCS_NVIC_IPR) => {
				let line = (offset as u64 - range_start!(SCS_NVIC_IPR)) as usize;
				if let Some(prio) = self.priority.get_mut(line) {
					*prio = value;
				}
			}
			memory_range!(SCS_VTOR) => {
				let keep = !(0xFF << (8 * lane));
				self.vtor = ((self.vtor & keep) | bits) & VTOR_MASK;
			}
			memory_range!(SCS_ICTR) |
			memory_range!(SCS_NVIC_IABR) |
			memory_range!(SCS_CPUID) => {
				// Read-only, writes are ignored.
			}
			_ => {
				return Err(BoardError::BadAddress(offset as u64));
			}
		}

		Ok(())
	}

	fn read(&self, offset: u32) -> Result<u8, BoardError> {
		if let memory_range!(SCS_NVIC_IPR) = offset {
			let line = (offset as u64 - range_start!(SCS_NVIC_IPR)) as usize;
			return Ok(self.priority.get(line).copied().unwrap_or(0));
		}

		match self.register(offset) {
			Some(register) => Ok((register >> (8 * (offset & 3))) as u8),
			None => Err(BoardError::BadAddress(offset as u64)),
		}
	}
}
