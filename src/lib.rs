// Copyright 2021 Nir H. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

#![deny(missing_docs)]
//! This library composes the hardware topology of a virtual ARM Cortex-M board:
//! flash and SRAM placed in a single address space, an ARMv7-M interrupt controller
//! bound to the cpu core, a clock scaled to the configured frequency, and a firmware
//! image loaded into flash before execution starts.
//!
//! The composition runs once, in a fixed order, through the typestates in [`board`].

use std::path::PathBuf;

use thiserror::Error;

#[macro_use]
pub mod bus;
pub mod board;
pub mod config;
pub mod cpu;
pub mod loader;
pub mod nvic;
pub mod timing;

pub use board::{Board, Machine};
pub use config::{BoardConfig, MachineConfig, Property};

/// Errors raised while composing the board or accessing its address space.
#[derive(Debug, Error)]
pub enum BoardError {
	/// A board parameter cannot be used by the component that needs it.
	#[error("configuration error: {0}")]
	Configuration(String),
	/// The backing storage of a memory region could not be allocated.
	#[error("cannot allocate {size} bytes for region '{region}'")]
	ResourceAllocation {
		/// The region's name.
		region: String,
		/// The requested size, in bytes.
		size: u64,
	},
	/// A device failed to finalize its construction.
	#[error("failed to realize '{device}': {reason}")]
	DeviceRealization {
		/// The device's type name.
		device: &'static str,
		/// What went wrong.
		reason: String,
	},
	/// The firmware image is missing, unreadable or too large.
	#[error("cannot load image {}: {reason}", .path.display())]
	ImageLoad {
		/// The image path as given to the loader.
		path: PathBuf,
		/// What went wrong.
		reason: String,
	},
	/// No region is mapped at the given address.
	#[error("unmapped address {0:#010x}")]
	BadAddress(u64),
	/// A write hit a read-only region.
	#[error("write to read-only address {0:#010x}")]
	ReadOnly(u64),
}
