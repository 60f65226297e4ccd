// Copyright 2021 Nir H. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

#![deny(missing_docs)]
//! The ARMv7-M container: the cpu core, its NVIC and the bit-band aliases.
//!
//! Construction happens in two phases. [`Armv7m::new`] returns an unconfigured
//! device, setters fill in its properties, and [`Armv7m::realize`] checks them,
//! creates the core and maps the device into the linked address space.

pub mod scs;

use scs::SystemControlSpace;

use crate::bus::bitband::BitBand;
use crate::bus::consts::*;
use crate::bus::memory_range::*;
use crate::bus::region::RegionKind;
use crate::bus::AddressSpace;
use crate::cpu::{CortexM, CpuModel, InterruptTopology};
use crate::BoardError;

/// The device's type name.
pub const TYPE_ARMV7M: &str = "armv7m";

/// Maximum number of external interrupts an NVIC can implement.
pub const NVIC_MAX_IRQ: i64 = 496;

/// Lines configured when `num_irq` isn't set.
pub const DEFAULT_NUM_IRQ: i64 = 64;

/// An unrealized ARMv7-M container.
pub struct Armv7m<'a> {
	num_irq: i64,
	cpu_type: Option<String>,
	enable_bitband: bool,
	memory: Option<&'a mut AddressSpace>,
}

impl<'a> Default for Armv7m<'a> {
	fn default() -> Self {
		Self::new()
	}
}

impl<'a> Armv7m<'a> {
	/// Create an unconfigured device.
	pub fn new() -> Self {
		Armv7m {
			num_irq: DEFAULT_NUM_IRQ,
			cpu_type: None,
			enable_bitband: false,
			memory: None,
		}
	}

	/// Sets the number of external interrupt lines.
	pub fn set_num_irq(&mut self, num_irq: i64) -> &mut Self {
		self.num_irq = num_irq;
		self
	}

	/// Sets the model of the core to create.
	pub fn set_cpu_type(&mut self, cpu_type: &str) -> &mut Self {
		self.cpu_type = Some(cpu_type.into());
		self
	}

	/// Enables the bit-band alias windows.
	pub fn set_enable_bitband(&mut self, enable: bool) -> &mut Self {
		self.enable_bitband = enable;
		self
	}

	/// Links the address space the core and the NVIC are attached to.
	pub fn link_memory(&mut self, memory: &'a mut AddressSpace) -> &mut Self {
		self.memory = Some(memory);
		self
	}

	/// Finalize the device.
	///
	/// Maps the system control space and, if enabled, the bit-band aliases into the
	/// linked address space, then creates the core and wires the NVIC into it.
	pub fn realize(self) -> Result<Nvic, BoardError> {
		let fail = |reason: String| BoardError::DeviceRealization { device: TYPE_ARMV7M, reason };

		let memory = self.memory.ok_or_else(|| fail("memory link not set".into()))?;

		let cpu_type = self.cpu_type.ok_or_else(|| fail("cpu-type not set".into()))?;
		let model: CpuModel = cpu_type.parse().map_err(|err: BoardError| fail(err.to_string()))?;

		if self.num_irq < 1 || self.num_irq > NVIC_MAX_IRQ {
			return Err(fail(format!(
				"num-irq {} is outside the NVIC's 1..={} range",
				self.num_irq, NVIC_MAX_IRQ
			)));
		}
		let num_irq = self.num_irq as u32;

		memory
			.add_device(
				"armv7m.scs",
				range_start!(MMAP_SCS),
				range_size!(MMAP_SCS),
				RegionKind::ReadWrite,
				Box::new(SystemControlSpace::new(num_irq, model.cpuid())),
			)
			.map_err(|err| fail(err.to_string()))?;

		if self.enable_bitband {
			memory.add_bitband(BitBand::sram());
			memory.add_bitband(BitBand::peripheral());
		}

		let topology = InterruptTopology {
			num_irq,
			bitband: self.enable_bitband,
		};

		let mut cpu = CortexM::new(model);
		cpu.attach_interrupt_controller(topology);

		log::debug!("realized {} with {} ({} irq lines)", TYPE_ARMV7M, model, num_irq);

		Ok(Nvic { cpu, topology })
	}
}

/// A realized ARMv7-M container.
pub struct Nvic {
	cpu: CortexM,
	topology: InterruptTopology,
}

impl Nvic {
	/// Number of external interrupt lines.
	pub fn num_irq(&self) -> u32 {
		self.topology.num_irq
	}

	/// Whether the bit-band aliases were mapped.
	pub fn bitband_enabled(&self) -> bool {
		self.topology.bitband
	}

	/// The core the controller is wired into.
	pub fn cpu(&self) -> &CortexM {
		&self.cpu
	}

	/// The core the controller is wired into.
	pub fn cpu_mut(&mut self) -> &mut CortexM {
		&mut self.cpu
	}
}
