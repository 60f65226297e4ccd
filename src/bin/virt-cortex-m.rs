// Copyright 2021 Nir H. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! Composes a virtual Cortex-M machine from the command line and prints its layout.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;

use virt_cortex_m::board::MACHINE_DESC;
use virt_cortex_m::config::{DEFAULT_CPU_TYPE, DEFAULT_RAM_SIZE};
use virt_cortex_m::loader::RawImageLoader;
use virt_cortex_m::timing::TimingContext;
use virt_cortex_m::{Board, BoardConfig, MachineConfig, Property};

#[derive(Parser, Debug)]
#[command(name = "virt-cortex-m")]
#[command(about = "Compose a virtual ARM Cortex-M board and load its firmware")]
struct Args {
	/// Firmware image, copied verbatim into flash
	#[arg(long)]
	kernel: Option<PathBuf>,

	/// Cpu model, e.g. cortex-m4
	#[arg(long, default_value = DEFAULT_CPU_TYPE)]
	cpu: String,

	/// Sram size; accepts a K, M or G suffix
	#[arg(short = 'm', long)]
	memory: Option<String>,

	/// Board property assignment, e.g. -M flash_kb=512 (repeatable)
	#[arg(short = 'M', long = "machine", value_name = "NAME=VALUE")]
	properties: Vec<String>,

	/// List the board properties and exit
	#[arg(long)]
	list_properties: bool,
}

/// Parses a byte count with an optional binary suffix.
fn parse_size(text: &str) -> Result<u64> {
	let text = text.trim();
	let (digits, shift) = match text.chars().last() {
		Some('k') | Some('K') => (&text[..text.len() - 1], 10),
		Some('m') | Some('M') => (&text[..text.len() - 1], 20),
		Some('g') | Some('G') => (&text[..text.len() - 1], 30),
		_ => (text, 0),
	};

	let value: u64 = digits.parse().with_context(|| format!("invalid size '{}'", text))?;
	match value.checked_mul(1 << shift) {
		Some(size) => Ok(size),
		None => bail!("size '{}' is too large", text),
	}
}

fn main() -> Result<()> {
	env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

	let args = Args::parse();

	if args.list_properties {
		let defaults = BoardConfig::default();
		for prop in Property::ALL.iter() {
			println!("{:<10} {:>6}  {}", prop.name(), defaults.get(*prop), prop.description());
		}
		return Ok(());
	}

	let mut config = BoardConfig::default();
	for assignment in args.properties.iter() {
		config.apply(assignment)?;
	}

	let ram_size = match args.memory.as_deref() {
		Some(text) => parse_size(text)?,
		None => DEFAULT_RAM_SIZE,
	};

	let machine = MachineConfig {
		cpu_type: args.cpu,
		ram_size,
		kernel: args.kernel,
	};

	let timing = TimingContext::new();
	let machine = Board::new(config, machine)
		.compose(&timing, &RawImageLoader)
		.context("machine construction failed")?;

	println!("{}", MACHINE_DESC);
	for region in machine.memory().regions() {
		println!(
			"  {:<24} {:#010x}..={:#010x}  {:?}",
			region.name,
			region.base_address,
			region.end_address(),
			region.kind
		);
	}
	println!("  cpu      {}", machine.cpu().model());
	println!("  irqs     {}", machine.nvic().num_irq());
	println!("  clock    {}", machine.clock_scale());
	println!("  image    {} bytes", machine.image_size());
	println!("  reset    sp={:#010x} pc={:#010x}", machine.cpu().sp(), machine.cpu().pc());

	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_parse_size() -> Result<()> {
		assert_eq!(4096, parse_size("4096")?);
		assert_eq!(64 * 1024, parse_size("64K")?);
		assert_eq!(128 * 1024 * 1024, parse_size("128m")?);
		assert_eq!(1 << 30, parse_size("1G")?);
		assert!(parse_size("lots").is_err());
		assert!(parse_size("").is_err());
		Ok(())
	}
}
