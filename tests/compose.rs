// Copyright 2021 Nir H. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

use std::cell::Cell;
use std::fs;
use std::path::{Path, PathBuf};

use virt_cortex_m::bus::{AddressSpace, Memory};
use virt_cortex_m::loader::{ImageLoader, RawImageLoader};
use virt_cortex_m::timing::TimingContext;
use virt_cortex_m::{Board, BoardConfig, BoardError, MachineConfig, Property};

/// Serves a fixed image from memory and counts how often it was asked to.
struct RecordingLoader {
	image: Vec<u8>,
	calls: Cell<usize>,
}

impl RecordingLoader {
	fn new(image: &[u8]) -> Self {
		RecordingLoader {
			image: image.to_vec(),
			calls: Cell::new(0),
		}
	}
}

impl ImageLoader for RecordingLoader {
	fn load(&self, _path: &Path, memory: &mut AddressSpace, base: u32, max_size: u64) -> Result<u64, BoardError> {
		self.calls.set(self.calls.get() + 1);
		assert!(self.image.len() as u64 <= max_size);

		memory.load(base, &self.image)?;
		Ok(self.image.len() as u64)
	}
}

/// A vector table (sp, reset) followed by a few bytes of code.
fn firmware() -> Vec<u8> {
	let mut image = Vec::new();
	image.extend_from_slice(&0x2000_4000_u32.to_le_bytes());
	image.extend_from_slice(&0x0000_0101_u32.to_le_bytes());
	image.extend_from_slice(&[0xFE, 0xE7, 0x00, 0xBF]);

	image
}

fn temp_image(name: &str, bytes: &[u8]) -> PathBuf {
	let path = std::env::temp_dir().join(format!("virt-cortex-m-it-{}-{}.bin", name, std::process::id()));
	fs::write(&path, bytes).unwrap();

	path
}

fn machine_config(kernel: Option<PathBuf>) -> MachineConfig {
	MachineConfig {
		ram_size: 64 * 1024,
		kernel: Some(kernel.unwrap_or_else(|| PathBuf::from("firmware.bin"))),
		..MachineConfig::default()
	}
}

#[test]
fn test_boot_with_defaults() -> Result<(), BoardError> {
	let image = firmware();
	let path = temp_image("defaults", &image);
	let machine_config = MachineConfig {
		kernel: Some(path.clone()),
		..MachineConfig::default()
	};

	let timing = TimingContext::new();
	let machine = Board::new(BoardConfig::default(), machine_config).compose(&timing, &RawImageLoader)?;

	assert_eq!(image, machine.memory().read_bytes(0, image.len())?);
	assert_eq!(image.len() as u64, machine.image_size());
	assert_eq!(1024 * 1024, machine.flash().size_bytes);
	assert_eq!(0x2000_0000, machine.sram().base_address);
	assert_eq!(64, machine.nvic().num_irq());
	assert_eq!(20, machine.clock_scale().nanos_per_tick());
	assert_eq!(Some(machine.clock_scale()), timing.clock_scale());

	assert_eq!(0x2000_4000, machine.cpu().sp());
	assert_eq!(0x0000_0100, machine.cpu().pc());

	fs::remove_file(path).unwrap();
	Ok(())
}

#[test]
fn test_empty_flash_fails_before_the_controller() {
	let mut config = BoardConfig::default();
	config.set(Property::FlashKb, 0);

	let loader = RecordingLoader::new(&firmware());
	let timing = TimingContext::new();

	match Board::new(config, machine_config(None)).compose(&timing, &loader) {
		Err(BoardError::ResourceAllocation { size, .. }) => assert_eq!(0, size),
		Err(err) => panic!("unexpected error: {}", err),
		Ok(_) => panic!("composed a machine without flash"),
	}

	assert_eq!(None, timing.clock_scale());
	assert_eq!(0, loader.calls.get());
}

#[test]
fn test_zero_frequency_never_loads() {
	let mut config = BoardConfig::default();
	config.set(Property::FreqMhz, 0);

	let loader = RecordingLoader::new(&firmware());
	let timing = TimingContext::new();

	assert!(matches!(
		Board::new(config, machine_config(None)).compose(&timing, &loader),
		Err(BoardError::Configuration(_))
	));
	assert_eq!(None, timing.clock_scale());
	assert_eq!(0, loader.calls.get());
}

#[test]
fn test_bad_irq_count_is_fatal() {
	for num_irq in [0, -8, 497].iter() {
		let mut config = BoardConfig::default();
		config.set(Property::NumIrq, *num_irq);

		let loader = RecordingLoader::new(&firmware());
		let timing = TimingContext::new();

		assert!(matches!(
			Board::new(config, machine_config(None)).compose(&timing, &loader),
			Err(BoardError::DeviceRealization { .. })
		));
		assert_eq!(0, loader.calls.get());
	}
}

#[test]
fn test_unknown_cpu_is_fatal() {
	let machine_config = MachineConfig {
		cpu_type: "cortex-r5".into(),
		..machine_config(None)
	};

	let loader = RecordingLoader::new(&firmware());
	assert!(matches!(
		Board::new(BoardConfig::default(), machine_config).compose(&TimingContext::new(), &loader),
		Err(BoardError::DeviceRealization { .. })
	));
}

#[test]
fn test_image_larger_than_flash() {
	let mut config = BoardConfig::default();
	config.set(Property::FlashKb, 1);
	let path = temp_image("oversized", &[0xA5; 2048]);

	let result = Board::new(config, machine_config(Some(path.clone()))).compose(&TimingContext::new(), &RawImageLoader);
	assert!(matches!(result, Err(BoardError::ImageLoad { .. })));

	fs::remove_file(path).unwrap();
}

#[test]
fn test_irq_lines_are_applied() -> Result<(), BoardError> {
	let mut config = BoardConfig::default();
	config.apply("num_irq=240")?.apply("freq_mhz=8")?;

	let machine = Board::new(config, machine_config(None))
		.compose(&TimingContext::new(), &RecordingLoader::new(&firmware()))?;

	assert_eq!(240, machine.nvic().num_irq());
	assert_eq!(Some(240), machine.cpu().interrupt_topology().map(|t| t.num_irq));
	assert_eq!(125, machine.clock_scale().nanos_per_tick());
	// ICTR.INTLINESNUM: 8 banks of 32 lines.
	assert_eq!(7, machine.memory().read_le::<u32>(0xE000_E004)?);
	Ok(())
}

#[test]
fn test_guest_transactions_do_not_fault() -> Result<(), BoardError> {
	let mut machine = Board::new(BoardConfig::default(), machine_config(None))
		.compose(&TimingContext::new(), &RecordingLoader::new(&firmware()))?;
	let memory = machine.memory_mut();

	// Unmapped.
	assert_eq!(0, memory.read(0x1000_0000)?);
	memory.write(0x1000_0000, 0xFF)?;

	// Flash is read-only to the guest.
	memory.write(0x0, 0xFF)?;
	assert_eq!(0x00, memory.read(0x0)?);
	Ok(())
}

#[test]
fn test_sram_bitband() -> Result<(), BoardError> {
	let mut machine = Board::new(BoardConfig::default(), machine_config(None))
		.compose(&TimingContext::new(), &RecordingLoader::new(&firmware()))?;
	let memory = machine.memory_mut();

	// Bit 5 of 0x2000_0010.
	memory.write_le::<u32>(0x2200_0000 + 0x10 * 32 + 5 * 4, 1)?;

	assert_eq!(0x20, memory.read(0x2000_0010)?);
	assert_eq!(1, memory.read_le::<u32>(0x2200_0000 + 0x10 * 32 + 5 * 4)?);
	Ok(())
}

#[test]
fn test_clock_faster_than_a_nanosecond() -> Result<(), BoardError> {
	let mut config = BoardConfig::default();
	config.set(Property::FreqMhz, 2000);

	let timing = TimingContext::new();
	let machine = Board::new(config, machine_config(None)).compose(&timing, &RecordingLoader::new(&firmware()))?;

	assert_eq!(2000, machine.config().freq_mhz);
	assert_eq!(0, machine.clock_scale().nanos_per_tick());
	assert_eq!(Some(0), timing.clock_scale().map(|s| s.nanos_per_tick()));
	Ok(())
}
