//! CLI argument parsing

use clap::{Parser, Subcommand};
use epp2_core::{parse_hex_u16, DeviceCode};
use std::path::PathBuf;

/// Parse a hex address, with or without `0x`; clamps at 0xFFFF
fn parse_address(s: &str) -> Result<u16, String> {
    parse_hex_u16(s).map_err(|e| e.to_string())
}

/// Parse a hex device code, with or without `0x`
fn parse_device(s: &str) -> Result<DeviceCode, String> {
    s.parse::<DeviceCode>().map_err(|e| e.to_string())
}

#[derive(Parser)]
#[command(name = "epp2prog")]
#[command(author, version, about = "EPP-2 EPROM programmer", long_about = None)]
pub struct Cli {
    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Configuration file with SERIAL_PORT= and BAUD_RATE= lines
    #[arg(long, global = true, default_value = "EPP-2_PROG.CFG")]
    pub config: PathBuf,

    /// Serial port, overrides the configuration file
    #[arg(short, long, global = true)]
    pub port: Option<String>,

    /// Baud rate, overrides the configuration file
    #[arg(short, long, global = true)]
    pub baud: Option<String>,

    /// Path to device database directory or file (contains .ron files)
    /// Defaults to looking in ./devices/ and /usr/share/epp2prog/devices/
    #[arg(long, global = true)]
    pub device_db: Option<PathBuf>,

    /// Probe-and-switch rounds before giving up on the programmer
    #[arg(long, global = true, default_value_t = epp2_serial::DEFAULT_SYNC_ATTEMPTS)]
    pub sync_attempts: u32,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Search device codes by manufacturer, device name or code
    #[command(alias = "D")]
    Search {
        /// Text to look for; lists every device when omitted
        query: Option<String>,
    },

    /// Show the programming specification encoded in a device code
    #[command(alias = "S")]
    Spec {
        /// Device code (hex)
        #[arg(value_parser = parse_device)]
        device: DeviceCode,
    },

    /// Check that an address range is erased
    #[command(alias = "E")]
    EmptyCheck {
        /// Device code (hex)
        #[arg(value_parser = parse_device)]
        device: DeviceCode,

        /// Start address (hex)
        #[arg(value_parser = parse_address)]
        start: Option<u16>,

        /// End address (hex)
        #[arg(value_parser = parse_address, requires = "start")]
        end: Option<u16>,
    },

    /// Read an address range as Motorola S-records
    #[command(alias = "R")]
    Read {
        /// Device code (hex)
        #[arg(value_parser = parse_device)]
        device: DeviceCode,

        /// Start address (hex)
        #[arg(value_parser = parse_address)]
        start: Option<u16>,

        /// End address (hex)
        #[arg(value_parser = parse_address, requires = "start")]
        end: Option<u16>,

        /// Write the data to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Program a Motorola S-record file into the device
    #[command(alias = "W")]
    Write {
        /// Device code (hex)
        #[arg(value_parser = parse_device)]
        device: DeviceCode,

        /// Start address (hex)
        #[arg(value_parser = parse_address)]
        start: u16,

        /// Motorola S-record file
        records: PathBuf,
    },

    /// Compare a Motorola S-record file against the device
    #[command(alias = "V")]
    Verify {
        /// Device code (hex)
        #[arg(value_parser = parse_device)]
        device: DeviceCode,

        /// Start address (hex)
        #[arg(value_parser = parse_address)]
        start: u16,

        /// Motorola S-record file
        records: PathBuf,
    },

    /// Convert a binary file to Motorola S-records
    BinToSrec {
        /// Address of the first byte (hex)
        #[arg(value_parser = parse_hex_u32)]
        start: u32,

        /// Highest address to emit, inclusive (hex)
        #[arg(value_parser = parse_hex_u32)]
        max_address: u32,

        /// Binary input file
        input: PathBuf,

        /// Output file, defaults to the input name with .HEX appended
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Copy a binary file into an address range of a 64 KiB ROM image
    AddBin {
        /// ROM image, created filled with 0xFF if it does not exist
        rom: PathBuf,

        /// First address of the range (hex)
        #[arg(value_parser = parse_address)]
        start: u16,

        /// Last address of the range, inclusive (hex)
        #[arg(value_parser = parse_address)]
        end: u16,

        /// Binary input file
        input: PathBuf,
    },
}

/// Parse a hex u32, with or without `0x`
fn parse_hex_u32(s: &str) -> Result<u32, String> {
    let digits = s
        .strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s);
    u32::from_str_radix(digits, 16).map_err(|e| format!("Invalid hex value: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_operation_letters_are_aliases() {
        let cli = Cli::parse_from(["epp2prog", "W", "1A2B3", "0x100", "rom.hex"]);
        match cli.command {
            Commands::Write {
                device,
                start,
                records,
            } => {
                assert_eq!(device.value(), 0x1A2B3);
                assert_eq!(start, 0x100);
                assert_eq!(records, PathBuf::from("rom.hex"));
            }
            _ => panic!("expected write"),
        }

        let cli = Cli::parse_from(["epp2prog", "E", "1A2B3", "0", "1FFFF"]);
        match cli.command {
            Commands::EmptyCheck { start, end, .. } => {
                assert_eq!(start, Some(0));
                assert_eq!(end, Some(0xFFFF));
            }
            _ => panic!("expected empty check"),
        }
    }

    #[test]
    fn test_global_overrides() {
        let cli = Cli::parse_from([
            "epp2prog",
            "read",
            "1A2B3",
            "--port",
            "/dev/ttyS1",
            "--baud",
            "9600",
            "--sync-attempts",
            "2",
        ]);
        assert_eq!(cli.port.as_deref(), Some("/dev/ttyS1"));
        assert_eq!(cli.baud.as_deref(), Some("9600"));
        assert_eq!(cli.sync_attempts, 2);
        assert_eq!(cli.config, PathBuf::from("EPP-2_PROG.CFG"));
    }

    #[test]
    fn test_bad_hex_is_rejected() {
        assert!(Cli::try_parse_from(["epp2prog", "spec", "XYZ"]).is_err());
        assert!(Cli::try_parse_from(["epp2prog", "bin-to-srec", "0", "G", "a.bin"]).is_err());
    }
}
