// Copyright 2021 Nir H. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

#![deny(missing_docs)]
//! Emulated clock scaling.
//!
//! The board computes the number of nanoseconds per cpu tick once, from the configured
//! frequency, and publishes it into a [`TimingContext`] shared with the scheduler.

use core::cell::OnceCell;
use core::fmt;

use crate::BoardError;

/// Nanoseconds in a second.
pub const NANOSECONDS_PER_SECOND: i64 = 1_000_000_000;

/// Nanoseconds per emulated cpu clock tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct ClockScale(u64);

impl ClockScale {
	/// Derive the scale from a frequency in MHz.
	///
	/// The division truncates: frequencies above 1000 MHz give a zero scale.
	pub fn from_mhz(freq_mhz: i64) -> Result<Self, BoardError> {
		if freq_mhz <= 0 {
			return Err(BoardError::Configuration(format!(
				"freq_mhz must be positive, got {}",
				freq_mhz
			)));
		}

		let hz = freq_mhz.checked_mul(1000 * 1000).ok_or_else(|| {
			BoardError::Configuration(format!("freq_mhz {} overflows the clock", freq_mhz))
		})?;

		Ok(ClockScale((NANOSECONDS_PER_SECOND / hz) as u64))
	}

	/// Nanoseconds per tick.
	pub fn nanos_per_tick(&self) -> u64 {
		self.0
	}

	/// Converts a tick count into emulated nanoseconds.
	pub fn ticks_to_nanos(&self, ticks: u64) -> u64 {
		ticks.saturating_mul(self.0)
	}

	/// Converts emulated nanoseconds into whole ticks.
	///
	/// A zero scale saturates: any elapsed time is worth `u64::MAX` ticks.
	pub fn nanos_to_ticks(&self, nanos: u64) -> u64 {
		match nanos.checked_div(self.0) {
			Some(ticks) => ticks,
			None if nanos == 0 => 0,
			None => u64::MAX,
		}
	}
}

impl fmt::Display for ClockScale {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}ns/tick", self.0)
	}
}

/// Timing state read by the emulator's scheduler.
///
/// The clock scale is written once, during board composition.
#[derive(Debug, Default)]
pub struct TimingContext {
	clock_scale: OnceCell<ClockScale>,
}

impl TimingContext {
	/// Create a context with no clock scale.
	pub fn new() -> Self {
		Self::default()
	}

	/// Publish the clock scale.
	pub fn set_clock_scale(&self, scale: ClockScale) -> Result<(), BoardError> {
		self.clock_scale.set(scale).map_err(|_| {
			BoardError::Configuration("the clock scale has already been set".into())
		})
	}

	/// The published clock scale, if any.
	pub fn clock_scale(&self) -> Option<ClockScale> {
		self.clock_scale.get().copied()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_scale() -> Result<(), BoardError> {
		assert_eq!(20, ClockScale::from_mhz(50)?.nanos_per_tick());
		assert_eq!(1000, ClockScale::from_mhz(1)?.nanos_per_tick());
		assert_eq!(15, ClockScale::from_mhz(64)?.nanos_per_tick());
		assert_eq!(1, ClockScale::from_mhz(1000)?.nanos_per_tick());
		assert_eq!(0, ClockScale::from_mhz(1001)?.nanos_per_tick());
		assert_eq!(0, ClockScale::from_mhz(2000)?.nanos_per_tick());
		Ok(())
	}

	#[test]
	fn test_unusable_frequencies() {
		for freq in [0, -50, i64::MIN, i64::MAX].iter() {
			assert!(matches!(ClockScale::from_mhz(*freq), Err(BoardError::Configuration(_))));
		}
	}

	#[test]
	fn test_conversions() -> Result<(), BoardError> {
		let scale = ClockScale::from_mhz(50)?;

		assert_eq!(2000, scale.ticks_to_nanos(100));
		assert_eq!(100, scale.nanos_to_ticks(2019));
		assert_eq!("20ns/tick", scale.to_string());
		Ok(())
	}

	#[test]
	fn test_sub_nanosecond_clock() -> Result<(), BoardError> {
		let scale = ClockScale::from_mhz(2000)?;

		assert_eq!(0, scale.ticks_to_nanos(1_000_000));
		assert_eq!(0, scale.nanos_to_ticks(0));
		assert_eq!(u64::MAX, scale.nanos_to_ticks(1));
		assert_eq!("0ns/tick", scale.to_string());
		Ok(())
	}

	#[test]
	fn test_single_write() -> Result<(), BoardError> {
		let timing = TimingContext::new();
		assert_eq!(None, timing.clock_scale());

		timing.set_clock_scale(ClockScale::from_mhz(50)?)?;
		assert!(timing.set_clock_scale(ClockScale::from_mhz(1)?).is_err());
		assert_eq!(Some(20), timing.clock_scale().map(|s| s.nanos_per_tick()));
		Ok(())
	}
}
