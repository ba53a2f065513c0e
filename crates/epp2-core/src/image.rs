//! Fixed-size ROM image assembly
//!
//! Several binaries can be placed into one 64 KiB image before it is
//! converted to S-records and programmed in a single pass. Unused space
//! holds 0xFF, the erased state of an EPROM.

use std::fs;
use std::io;
use std::path::Path;

use crate::address::AddressRange;
use crate::error::{Error, Result};

/// Size of a ROM image in bytes
pub const ROM_SIZE: usize = 0x10000;

/// Value of an unprogrammed EPROM byte
pub const ERASED: u8 = 0xFF;

/// A 64 KiB ROM image
#[derive(Clone)]
pub struct RomImage {
    data: Box<[u8]>,
}

/// What a [`RomImage::merge`] did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MergeStats {
    /// Bytes copied from the binary
    pub copied: usize,
    /// Bytes of the range padded with [`ERASED`]
    pub padded: usize,
}

impl RomImage {
    /// A fresh image with every byte erased
    pub fn erased() -> Self {
        Self {
            data: vec![ERASED; ROM_SIZE].into_boxed_slice(),
        }
    }

    /// Build an image from existing contents
    ///
    /// Shorter input is padded with [`ERASED`]; longer input does not fit.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() > ROM_SIZE {
            return Err(Error::CapacityExceeded { capacity: ROM_SIZE });
        }
        let mut image = Self::erased();
        image.data[..bytes.len()].copy_from_slice(bytes);
        Ok(image)
    }

    /// Load an image file, or start an erased image if it does not exist
    pub fn load_or_erased(path: &Path) -> Result<Self> {
        match fs::read(path) {
            Ok(bytes) => Self::from_bytes(&bytes),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                log::info!("{} not found, starting an erased image", path.display());
                Ok(Self::erased())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Write the whole image to a file
    pub fn save(&self, path: &Path) -> Result<()> {
        fs::write(path, &self.data)?;
        Ok(())
    }

    /// Image contents
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Place `bin` at the start of `range`
    ///
    /// Copies until either the range or the binary runs out, then pads
    /// the rest of the range with [`ERASED`]. Bytes of `bin` that do not fit
    /// in the range are dropped.
    pub fn merge(&mut self, range: AddressRange, bin: &[u8]) -> MergeStats {
        let start = range.start() as usize;
        let copied = bin.len().min(range.len());
        let end = start + range.len();

        // AddressRange never reaches past MAX_ADDRESS, so the range is in bounds
        debug_assert!(end <= self.data.len());

        self.data[start..start + copied].copy_from_slice(&bin[..copied]);
        self.data[start + copied..end].fill(ERASED);

        MergeStats {
            copied,
            padded: range.len() - copied,
        }
    }
}

impl core::fmt::Debug for RomImage {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("RomImage")
            .field("size", &self.data.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_erased_image() {
        let image = RomImage::erased();
        assert_eq!(image.as_bytes().len(), ROM_SIZE);
        assert!(image.as_bytes().iter().all(|&b| b == ERASED));
    }

    #[test]
    fn test_merge_pads_rest_of_range() {
        let mut image = RomImage::from_bytes(&[0u8; ROM_SIZE]).unwrap();
        let range = AddressRange::new(0x100, 0x10F).unwrap();
        let stats = image.merge(range, &[1, 2, 3, 4]);

        assert_eq!(stats, MergeStats { copied: 4, padded: 12 });
        assert_eq!(&image.as_bytes()[0x100..0x104], &[1, 2, 3, 4]);
        assert!(image.as_bytes()[0x104..0x110].iter().all(|&b| b == ERASED));
        // outside the range is untouched
        assert_eq!(image.as_bytes()[0xFF], 0);
        assert_eq!(image.as_bytes()[0x110], 0);
    }

    #[test]
    fn test_merge_truncates_long_binary() {
        let mut image = RomImage::erased();
        let range = AddressRange::new(0xFFFE, 0xFFFF).unwrap();
        let stats = image.merge(range, &[0xAA, 0xBB, 0xCC]);

        assert_eq!(stats, MergeStats { copied: 2, padded: 0 });
        assert_eq!(&image.as_bytes()[0xFFFE..], &[0xAA, 0xBB]);
    }

    #[test]
    fn test_merge_whole_space() {
        let bin: Vec<u8> = (0..ROM_SIZE).map(|i| i as u8).collect();
        let mut image = RomImage::erased();
        let stats = image.merge(AddressRange::full(), &bin);
        assert_eq!(stats.copied, ROM_SIZE);
        assert_eq!(image.as_bytes(), &bin[..]);
    }

    #[test]
    fn test_from_bytes_bounds() {
        let short = RomImage::from_bytes(&[0x12; 16]).unwrap();
        assert_eq!(short.as_bytes()[15], 0x12);
        assert_eq!(short.as_bytes()[16], ERASED);

        let too_long = vec![0u8; ROM_SIZE + 1];
        assert!(matches!(
            RomImage::from_bytes(&too_long),
            Err(Error::CapacityExceeded { capacity: ROM_SIZE })
        ));
    }

    #[test]
    fn test_load_missing_file_is_erased() {
        let path = std::env::temp_dir().join("epp2-core-image-does-not-exist.bin");
        let _ = fs::remove_file(&path);
        let image = RomImage::load_or_erased(&path).unwrap();
        assert!(image.as_bytes().iter().all(|&b| b == ERASED));
    }
}
