// Copyright 2021 Nir H. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

#![deny(missing_docs)]
//! The board composition routine.
//!
//! Each composition stage is a type. A stage is consumed by the transition to the next
//! one, so stages run once, in order, and a failure anywhere ends the composition:
//!
//! ```text
//! Board -> AddressSpaceComposed -> InterruptControllerBound -> ClockScaled -> Machine
//! ```

use core::fmt;
use std::path::PathBuf;

use crate::bus::consts::*;
use crate::bus::region::{MemoryRegion, RegionInfo};
use crate::bus::AddressSpace;
use crate::config::{BoardConfig, MachineConfig};
use crate::cpu::CortexM;
use crate::loader::ImageLoader;
use crate::nvic::{Armv7m, Nvic};
use crate::timing::{ClockScale, TimingContext};
use crate::BoardError;

/// The machine's description.
pub const MACHINE_DESC: &str = "Virtual ARM Cortex-M";

/// Name of the flash region.
pub const FLASH_REGION: &str = "virt_cortex_m.flash";

/// Name of the sram region.
pub const SRAM_REGION: &str = "virt_cortex_m.sram";

/// Guest accesses to unmapped or read-only memory don't fault on this board.
pub const IGNORE_MEMORY_TRANSACTION_FAILURES: bool = true;

/// The vector table's location out of reset.
pub const RESET_VTOR: u32 = 0;

/// The composition stages, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Stage {
	/// Board properties are set.
	Configured,
	/// Flash and sram are mapped.
	AddressSpaceComposed,
	/// The interrupt controller is realized.
	InterruptControllerBound,
	/// The clock scale is published.
	ClockScaled,
	/// The firmware image is in flash; the machine is ready.
	KernelLoaded,
}

impl fmt::Display for Stage {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let name = match self {
			Stage::Configured => "configured",
			Stage::AddressSpaceComposed => "address space composed",
			Stage::InterruptControllerBound => "interrupt controller bound",
			Stage::ClockScaled => "clock scaled",
			Stage::KernelLoaded => "kernel loaded",
		};

		f.write_str(name)
	}
}

fn transition(from: Stage, to: Stage) {
	log::debug!("{} -> {}", from, to);
}

/// Converts the `flash_kb` property into a byte count.
///
/// Zero is let through; it fails when the region is allocated.
fn flash_size(flash_kb: i64) -> Result<u64, BoardError> {
	if flash_kb < 0 {
		return Err(BoardError::Configuration(format!(
			"flash_kb must not be negative, got {}",
			flash_kb
		)));
	}

	flash_kb
		.checked_mul(1024)
		.map(|size| size as u64)
		.ok_or_else(|| BoardError::Configuration(format!("flash_kb {} is too large", flash_kb)))
}

/// State carried from one stage to the next.
struct Composition {
	config: BoardConfig,
	machine: MachineConfig,
	memory: AddressSpace,
	flash: RegionInfo,
	sram: RegionInfo,
}

/// A configured board, not yet composed.
pub struct Board {
	config: BoardConfig,
	machine: MachineConfig,
}

impl Board {
	/// Create a board from its properties and the machine-level inputs.
	pub fn new(config: BoardConfig, machine: MachineConfig) -> Self {
		Board { config, machine }
	}

	/// The board's properties.
	pub fn config(&self) -> &BoardConfig {
		&self.config
	}

	/// Run every stage and return the ready machine.
	pub fn compose(self, timing: &TimingContext, loader: &dyn ImageLoader) -> Result<Machine, BoardError> {
		self.compose_address_space()?
			.bind_interrupt_controller()?
			.scale_clock(timing)?
			.load_kernel(loader)
	}

	/// Allocate flash and sram and map them at their fixed addresses.
	///
	/// No check keeps a large flash from reaching into sram (a flash of more than
	/// 512 MiB does); the address space only warns about the overlap.
	pub fn compose_address_space(self) -> Result<AddressSpaceComposed, BoardError> {
		let size = flash_size(self.config.flash_kb)?;

		let mut memory = AddressSpace::new();
		memory.set_ignore_transaction_failures(IGNORE_MEMORY_TRANSACTION_FAILURES);

		let flash = memory.add_subregion(FLASH_BASE, MemoryRegion::new_rom(FLASH_REGION, size)?)?;
		let sram = memory.add_subregion(
			SRAM_BASE,
			MemoryRegion::new_ram(SRAM_REGION, self.machine.ram_size)?,
		)?;

		transition(Stage::Configured, Stage::AddressSpaceComposed);

		Ok(AddressSpaceComposed {
			parts: Composition {
				config: self.config,
				machine: self.machine,
				memory,
				flash,
				sram,
			},
		})
	}
}

/// Flash and sram are mapped.
pub struct AddressSpaceComposed {
	parts: Composition,
}

impl AddressSpaceComposed {
	/// The composed address space.
	pub fn memory(&self) -> &AddressSpace {
		&self.parts.memory
	}

	/// The flash region.
	pub fn flash(&self) -> &RegionInfo {
		&self.parts.flash
	}

	/// The sram region.
	pub fn sram(&self) -> &RegionInfo {
		&self.parts.sram
	}

	/// Create the ARMv7-M container, link it to the address space and realize it.
	pub fn bind_interrupt_controller(self) -> Result<InterruptControllerBound, BoardError> {
		let mut parts = self.parts;

		let mut armv7m = Armv7m::new();
		armv7m
			.set_num_irq(parts.config.num_irq)
			.set_cpu_type(&parts.machine.cpu_type)
			.set_enable_bitband(true)
			.link_memory(&mut parts.memory);

		let nvic = armv7m.realize()?;

		transition(Stage::AddressSpaceComposed, Stage::InterruptControllerBound);

		Ok(InterruptControllerBound { parts, nvic })
	}
}

/// The interrupt controller is realized and wired to the core.
pub struct InterruptControllerBound {
	parts: Composition,
	nvic: Nvic,
}

impl InterruptControllerBound {
	/// The composed address space.
	pub fn memory(&self) -> &AddressSpace {
		&self.parts.memory
	}

	/// The realized controller.
	pub fn nvic(&self) -> &Nvic {
		&self.nvic
	}

	/// Derive the clock scale from `freq_mhz` and publish it.
	pub fn scale_clock(self, timing: &TimingContext) -> Result<ClockScaled, BoardError> {
		let clock_scale = ClockScale::from_mhz(self.parts.config.freq_mhz)?;
		timing.set_clock_scale(clock_scale)?;

		transition(Stage::InterruptControllerBound, Stage::ClockScaled);

		Ok(ClockScaled {
			parts: self.parts,
			nvic: self.nvic,
			clock_scale,
		})
	}
}

/// The clock scale is published.
pub struct ClockScaled {
	parts: Composition,
	nvic: Nvic,
	clock_scale: ClockScale,
}

impl ClockScaled {
	/// The published clock scale.
	pub fn clock_scale(&self) -> ClockScale {
		self.clock_scale
	}

	/// Load the firmware image into flash and reset the core from it.
	pub fn load_kernel(self, loader: &dyn ImageLoader) -> Result<Machine, BoardError> {
		let mut parts = self.parts;

		let path = parts.machine.kernel.clone().ok_or_else(|| BoardError::ImageLoad {
			path: PathBuf::new(),
			reason: "guest image must be specified".into(),
		})?;

		let image_size = loader.load(
			&path,
			&mut parts.memory,
			parts.flash.base_address as u32,
			parts.flash.size_bytes,
		)?;

		let mut machine = Machine {
			config: parts.config,
			memory: parts.memory,
			flash: parts.flash,
			sram: parts.sram,
			nvic: self.nvic,
			clock_scale: self.clock_scale,
			image_size,
		};
		machine.reset()?;

		transition(Stage::ClockScaled, Stage::KernelLoaded);
		log::info!(
			"{}: {} KiB flash at {:#010x}, {} KiB sram at {:#010x}, {} irqs, {}",
			MACHINE_DESC,
			machine.flash.size_bytes / 1024,
			machine.flash.base_address,
			machine.sram.size_bytes / 1024,
			machine.sram.base_address,
			machine.nvic.num_irq(),
			machine.clock_scale
		);

		Ok(machine)
	}
}

/// A composed machine, ready to run.
pub struct Machine {
	config: BoardConfig,
	memory: AddressSpace,
	flash: RegionInfo,
	sram: RegionInfo,
	nvic: Nvic,
	clock_scale: ClockScale,
	image_size: u64,
}

impl Machine {
	/// The properties the machine was composed with.
	pub fn config(&self) -> &BoardConfig {
		&self.config
	}

	/// The machine's address space.
	pub fn memory(&self) -> &AddressSpace {
		&self.memory
	}

	/// The machine's address space.
	pub fn memory_mut(&mut self) -> &mut AddressSpace {
		&mut self.memory
	}

	/// The flash region.
	pub fn flash(&self) -> &RegionInfo {
		&self.flash
	}

	/// The sram region.
	pub fn sram(&self) -> &RegionInfo {
		&self.sram
	}

	/// The interrupt controller.
	pub fn nvic(&self) -> &Nvic {
		&self.nvic
	}

	/// The cpu core.
	pub fn cpu(&self) -> &CortexM {
		self.nvic.cpu()
	}

	/// Nanoseconds per cpu tick.
	pub fn clock_scale(&self) -> ClockScale {
		self.clock_scale
	}

	/// Size of the loaded firmware image, in bytes.
	pub fn image_size(&self) -> u64 {
		self.image_size
	}

	/// Reset the core from the vector table.
	pub fn reset(&mut self) -> Result<(), BoardError> {
		self.nvic.cpu_mut().reset(&self.memory, RESET_VTOR)
	}
}
