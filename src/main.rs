//! epp2prog - EPP-2 EPROM programmer front end
//!
//! Drives an EPP-2 over a serial line to empty-check, read, write and
//! verify EPROM/EEPROM devices, and ships the small file tools that go with
//! it: device code search and decoding, binary to Motorola S-record
//! conversion, and 64 KiB ROM image assembly.
//!
//! Programmer chatter (sent commands, replies, status) goes to stderr; only
//! read data goes to stdout, so a read can be redirected straight to a
//! file.

mod cli;
mod commands;
mod config;

use clap::Parser;
use cli::{Cli, Commands};
use config::Config;
use epp2_serial::Operation;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    // Set log level based on verbosity
    match cli.verbose {
        0 => {} // default (info)
        1 => log::set_max_level(log::LevelFilter::Debug),
        _ => log::set_max_level(log::LevelFilter::Trace),
    }

    let config = Config::load(&cli.config)?.with_overrides(cli.port.clone(), cli.baud.clone());

    match cli.command {
        Commands::Search { query } => {
            let db = commands::search::load_database(cli.device_db.as_deref())?;
            log::info!("Loaded {} device definitions", db.len());
            commands::search::run(&db, query.as_deref().unwrap_or(""));
            Ok(())
        }
        Commands::Spec { device } => {
            commands::spec::run(device);
            Ok(())
        }
        Commands::EmptyCheck { device, start, end } => commands::session::run(
            &config,
            cli.sync_attempts,
            device,
            Operation::EmptyCheck { start, end },
            None,
        ),
        Commands::Read {
            device,
            start,
            end,
            output,
        } => commands::session::run(
            &config,
            cli.sync_attempts,
            device,
            Operation::Read { start, end },
            output.as_deref(),
        ),
        Commands::Write {
            device,
            start,
            records,
        } => commands::session::run(
            &config,
            cli.sync_attempts,
            device,
            Operation::Write { start, records },
            None,
        ),
        Commands::Verify {
            device,
            start,
            records,
        } => commands::session::run(
            &config,
            cli.sync_attempts,
            device,
            Operation::Verify { start, records },
            None,
        ),
        Commands::BinToSrec {
            start,
            max_address,
            input,
            output,
        } => commands::convert::bin_to_srec(start, max_address, &input, output.as_deref()),
        Commands::AddBin {
            rom,
            start,
            end,
            input,
        } => commands::convert::add_bin(&rom, start, end, &input),
    }
}
