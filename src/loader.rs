// Copyright 2021 Nir H. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

#![deny(missing_docs)]
//! Firmware image loading.

use std::fs;
use std::path::Path;

use crate::bus::AddressSpace;
use crate::BoardError;

/// Places a firmware image into the address space.
pub trait ImageLoader {
	/// Load the image at `path` into `memory`, starting at `base`.
	///
	/// * `max_size` - The image must not exceed this many bytes.
	///
	/// Returns the number of bytes loaded.
	fn load(&self, path: &Path, memory: &mut AddressSpace, base: u32, max_size: u64) -> Result<u64, BoardError>;
}

/// Loads the file's bytes verbatim, without interpreting any image format.
#[derive(Debug, Default, Clone, Copy)]
pub struct RawImageLoader;

impl ImageLoader for RawImageLoader {
	fn load(&self, path: &Path, memory: &mut AddressSpace, base: u32, max_size: u64) -> Result<u64, BoardError> {
		let failed = |reason: String| BoardError::ImageLoad { path: path.into(), reason };

		let image = fs::read(path).map_err(|err| failed(err.to_string()))?;
		let size = image.len() as u64;

		if size > max_size {
			return Err(failed(format!(
				"image is {} bytes, the region only holds {}",
				size, max_size
			)));
		}

		memory.load(base, &image).map_err(|err| failed(err.to_string()))?;

		log::info!("loaded {} ({} bytes) at {:#010x}", path.display(), size, base);
		Ok(size)
	}
}
