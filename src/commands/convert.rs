//! File conversion commands: binary to S-records, ROM image merge

use epp2_core::image::RomImage;
use epp2_core::{srec, AddressRange};
use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Default output name for a converted file: the input name with `.HEX` appended
pub fn default_srec_path(input: &Path) -> PathBuf {
    let mut name = OsString::from(input.as_os_str());
    name.push(".HEX");
    PathBuf::from(name)
}

/// Convert a binary file to a Motorola S-record file
pub fn bin_to_srec(
    start: u32,
    max_address: u32,
    input: &Path,
    output: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    if max_address < start {
        return Err(format!(
            "Maximum address {:X} is below start address {:X}",
            max_address, start
        )
        .into());
    }

    let data = fs::read(input)
        .map_err(|e| format!("Failed to open file for reading: {}: {}", input.display(), e))?;

    let output = output.map_or_else(|| default_srec_path(input), Path::to_path_buf);
    let file = File::create(&output)
        .map_err(|e| format!("Failed to open file for writing: {}: {}", output.display(), e))?;
    let mut writer = BufWriter::new(file);

    let stats = srec::convert(&mut writer, &data, start, max_address)?;
    writer.flush()?;

    if stats.bytes < data.len() {
        log::warn!(
            "{} bytes beyond address {:X} were not converted",
            data.len() - stats.bytes,
            max_address
        );
    }
    println!(
        "Wrote {} records ({} bytes, last address {:08X}) to {}",
        stats.records,
        stats.bytes,
        stats.last_address,
        output.display()
    );

    Ok(())
}

/// Copy a binary file into `[start, end]` of a 64 KiB ROM image
pub fn add_bin(
    rom: &Path,
    start: u16,
    end: u16,
    input: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    let range = AddressRange::new(start, end)?;

    let bin = fs::read(input)
        .map_err(|e| format!("Failed to read BIN file: {}: {}", input.display(), e))?;
    let mut image = RomImage::load_or_erased(rom)?;

    let stats = image.merge(range, &bin);
    if bin.len() > stats.copied {
        log::warn!(
            "{} bytes of {} do not fit in {}",
            bin.len() - stats.copied,
            input.display(),
            range
        );
    }

    image
        .save(rom)
        .map_err(|e| format!("Failed to write ROM file: {}: {}", rom.display(), e))?;

    println!(
        "Added {} bytes at {} to {} ({} bytes padded)",
        stats.copied,
        range,
        rom.display(),
        stats.padded
    );

    Ok(())
}
