// Copyright 2021 Nir H. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

#![deny(missing_docs)]
//! Board parameters and the machine-level inputs the board consumes.

use core::fmt;
use core::str::FromStr;
use std::path::PathBuf;

use crate::BoardError;

/// The cpu model selected when the machine doesn't ask for another one.
pub const DEFAULT_CPU_TYPE: &str = "cortex-m3";

/// The ram size given to machines that don't set one (128 MiB).
pub const DEFAULT_RAM_SIZE: u64 = 128 * 1024 * 1024;

/// The board's tunable parameters.
///
/// None of the values are range-checked here; an unusable value fails in the
/// component that consumes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoardConfig {
	/// Flash capacity in kilobytes.
	pub flash_kb: i64,
	/// Cpu clock in MHz.
	pub freq_mhz: i64,
	/// Number of interrupt controller inputs.
	pub num_irq: i64,
}

impl Default for BoardConfig {
	fn default() -> Self {
		BoardConfig {
			flash_kb: 1024,
			freq_mhz: 50,
			num_irq: 64,
		}
	}
}

/// The board's named properties.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Property {
	/// `flash_kb`
	FlashKb,
	/// `freq_mhz`
	FreqMhz,
	/// `num_irq`
	NumIrq,
}

impl Property {
	/// Every property, in registration order.
	pub const ALL: [Property; 3] = [Property::FlashKb, Property::FreqMhz, Property::NumIrq];

	/// The property's name, as accepted on the command line.
	pub fn name(&self) -> &'static str {
		match self {
			Property::FlashKb => "flash_kb",
			Property::FreqMhz => "freq_mhz",
			Property::NumIrq => "num_irq",
		}
	}

	/// A human readable description.
	pub fn description(&self) -> &'static str {
		match self {
			Property::FlashKb => "Flash size in KB",
			Property::FreqMhz => "MCU frequency in MHz",
			Property::NumIrq => "Number of IRQs",
		}
	}
}

impl fmt::Display for Property {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.name())
	}
}

impl FromStr for Property {
	type Err = BoardError;

	fn from_str(name: &str) -> Result<Self, Self::Err> {
		Property::ALL
			.iter()
			.copied()
			.find(|prop| prop.name() == name)
			.ok_or_else(|| BoardError::Configuration(format!("unknown board property '{}'", name)))
	}
}

impl BoardConfig {
	/// Reads a property.
	pub fn get(&self, prop: Property) -> i64 {
		match prop {
			Property::FlashKb => self.flash_kb,
			Property::FreqMhz => self.freq_mhz,
			Property::NumIrq => self.num_irq,
		}
	}

	/// Overrides a property.
	pub fn set(&mut self, prop: Property, value: i64) -> &mut Self {
		match prop {
			Property::FlashKb => self.flash_kb = value,
			Property::FreqMhz => self.freq_mhz = value,
			Property::NumIrq => self.num_irq = value,
		}

		self
	}

	/// Applies a textual `name=value` assignment.
	pub fn apply(&mut self, assignment: &str) -> Result<&mut Self, BoardError> {
		let (name, value) = assignment.split_once('=').ok_or_else(|| {
			BoardError::Configuration(format!("expected 'name=value', got '{}'", assignment))
		})?;

		let prop: Property = name.trim().parse()?;
		let value: i64 = value.trim().parse().map_err(|_| {
			BoardError::Configuration(format!("'{}' expects an integer, got '{}'", prop, value))
		})?;

		Ok(self.set(prop, value))
	}
}

/// Inputs owned by the generic machine layer rather than the board.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MachineConfig {
	/// The cpu model identifier, e.g. `cortex-m4`.
	pub cpu_type: String,
	/// Size of the board's sram, in bytes.
	pub ram_size: u64,
	/// The firmware image to load into flash.
	pub kernel: Option<PathBuf>,
}

impl Default for MachineConfig {
	fn default() -> Self {
		MachineConfig {
			cpu_type: DEFAULT_CPU_TYPE.into(),
			ram_size: DEFAULT_RAM_SIZE,
			kernel: None,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_defaults() {
		let config = BoardConfig::default();

		assert_eq!(1024, config.get(Property::FlashKb));
		assert_eq!(50, config.get(Property::FreqMhz));
		assert_eq!(64, config.get(Property::NumIrq));
	}

	#[test]
	fn test_set_accepts_unusable_values() {
		let mut config = BoardConfig::default();
		config.set(Property::FlashKb, 0).set(Property::NumIrq, -3);

		assert_eq!(0, config.flash_kb);
		assert_eq!(-3, config.num_irq);
		assert_eq!(50, config.freq_mhz);
	}

	#[test]
	fn test_apply_assignment() -> Result<(), BoardError> {
		let mut config = BoardConfig::default();
		config.apply("freq_mhz=8")?.apply(" num_irq = 32 ")?;

		assert_eq!(8, config.freq_mhz);
		assert_eq!(32, config.num_irq);
		Ok(())
	}

	#[test]
	fn test_apply_rejects_garbage() {
		let mut config = BoardConfig::default();

		assert!(matches!(config.apply("flash_kb"), Err(BoardError::Configuration(_))));
		assert!(matches!(config.apply("ram_kb=4"), Err(BoardError::Configuration(_))));
		assert!(matches!(config.apply("flash_kb=lots"), Err(BoardError::Configuration(_))));
		assert_eq!(BoardConfig::default(), config);
	}

	#[test]
	fn test_property_names_round_trip() {
		for prop in Property::ALL.iter() {
			assert_eq!(*prop, prop.name().parse::<Property>().unwrap());
		}
	}
}
