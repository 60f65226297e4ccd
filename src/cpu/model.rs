// Copyright 2021 Nir H. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! Supported Cortex-M cpu models.

use core::fmt;
use core::str::FromStr;

use crate::BoardError;

/// Suffix the host framework appends to cpu type names.
const CPU_TYPE_SUFFIX: &str = "-arm-cpu";

/// The cpu models an ARMv7-M container can be built around.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CpuModel {
	/// ARMv6-M baseline core.
	CortexM0,
	/// The board's default core.
	CortexM3,
	/// Cortex-M3 with DSP extensions (and an optional FPU).
	CortexM4,
	/// High performance ARMv7E-M core.
	CortexM7,
	/// ARMv8-M mainline core.
	CortexM33,
}

impl CpuModel {
	/// Every supported model.
	pub const ALL: [CpuModel; 5] = [
		CpuModel::CortexM0,
		CpuModel::CortexM3,
		CpuModel::CortexM4,
		CpuModel::CortexM7,
		CpuModel::CortexM33,
	];

	/// The model's short name.
	pub fn name(&self) -> &'static str {
		match self {
			CpuModel::CortexM0 => "cortex-m0",
			CpuModel::CortexM3 => "cortex-m3",
			CpuModel::CortexM4 => "cortex-m4",
			CpuModel::CortexM7 => "cortex-m7",
			CpuModel::CortexM33 => "cortex-m33",
		}
	}

	/// Reset value of the CPUID register.
	pub fn cpuid(&self) -> u32 {
		match self {
			CpuModel::CortexM0 => 0x410C_C200,
			CpuModel::CortexM3 => 0x410F_C231,
			CpuModel::CortexM4 => 0x410F_C240,
			CpuModel::CortexM7 => 0x410F_C270,
			CpuModel::CortexM33 => 0x410F_D213,
		}
	}
}

impl fmt::Display for CpuModel {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.name())
	}
}

impl FromStr for CpuModel {
	type Err = BoardError;

	/// Accepts both `cortex-m4` and the framework's `cortex-m4-arm-cpu`.
	fn from_str(cpu_type: &str) -> Result<Self, Self::Err> {
		let name = cpu_type.strip_suffix(CPU_TYPE_SUFFIX).unwrap_or(cpu_type);

		CpuModel::ALL
			.iter()
			.copied()
			.find(|model| model.name() == name)
			.ok_or_else(|| BoardError::Configuration(format!("unknown cpu type '{}'", cpu_type)))
	}
}
