// Copyright 2021 Nir H. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

#![deny(missing_docs)]
//! The Cortex-M core as seen by the board.
//!
//! Instruction execution lives elsewhere; the board only needs to know the core's model,
//! wire the interrupt controller into it, and reset it from the vector table.

pub mod model;

pub use model::CpuModel;

use crate::bus::AddressSpace;
use crate::BoardError;

/// Number of exception vectors the architecture reserves ahead of external interrupts.
pub const NUM_INTERNAL_EXCEPTIONS: u32 = 16;

/// What the interrupt controller tells the core about the board's interrupts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InterruptTopology {
	/// External interrupt lines.
	pub num_irq: u32,
	/// Whether the bit-band aliases are mapped.
	pub bitband: bool,
}

impl InterruptTopology {
	/// Total number of exception vectors, internal exceptions included.
	pub fn num_exceptions(&self) -> u32 {
		NUM_INTERNAL_EXCEPTIONS + self.num_irq
	}
}

/// The board's cpu core.
#[derive(Debug, Clone)]
pub struct CortexM {
	model: CpuModel,
	msp: u32,
	pc: u32,
	topology: Option<InterruptTopology>,
}

impl CortexM {
	/// Initializes a new core, not yet wired to an interrupt controller.
	pub fn new(model: CpuModel) -> Self {
		CortexM {
			model,
			msp: 0,
			pc: 0,
			topology: None,
		}
	}

	/// The core's model.
	pub fn model(&self) -> CpuModel {
		self.model
	}

	/// Called by the interrupt controller when it's realized.
	pub(crate) fn attach_interrupt_controller(&mut self, topology: InterruptTopology) {
		self.topology = Some(topology);
	}

	/// The interrupt topology, once a controller has been realized.
	pub fn interrupt_topology(&self) -> Option<&InterruptTopology> {
		self.topology.as_ref()
	}

	/// The main stack pointer.
	pub fn sp(&self) -> u32 {
		self.msp
	}

	/// The program counter.
	pub fn pc(&self) -> u32 {
		self.pc
	}

	/// Load the initial stack pointer and reset vector from the vector table at `vtor`.
	pub fn reset(&mut self, memory: &AddressSpace, vtor: u32) -> Result<(), BoardError> {
		self.msp = memory.read_le::<u32>(vtor)?;

		// The reset vector carries the Thumb bit.
		self.pc = memory.read_le::<u32>(vtor.wrapping_add(4))? & !1;

		log::debug!("{} reset: sp={:#010x} pc={:#010x}", self.model, self.msp, self.pc);
		Ok(())
	}
}
