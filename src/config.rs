//! Configuration file loading
//!
//! The file holds `KEY=value` lines; only `SERIAL_PORT` and `BAUD_RATE`
//! are recognised and everything else is ignored. A missing file is not an
//! error, the defaults are used instead.

use std::fs;
use std::io;
use std::path::Path;

use epp2_core::BaudRate;

/// Serial port used when none is configured
pub const DEFAULT_SERIAL_PORT: &str = "/dev/ttyUSB0";
/// Baud rate used when none is configured
pub const DEFAULT_BAUD_RATE: &str = "19200";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: io::Error,
    },
}

/// Where and how fast to talk to the programmer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub serial_port: String,
    /// Validated when a session starts
    pub baud_rate: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            serial_port: DEFAULT_SERIAL_PORT.to_string(),
            baud_rate: DEFAULT_BAUD_RATE.to_string(),
        }
    }
}

impl Config {
    /// Load from `path`, falling back to defaults when it does not exist
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        match fs::read_to_string(path) {
            Ok(content) => {
                let config = Self::parse(&content);
                log::debug!("Loaded configuration from {}", path.display());
                Ok(config)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                log::warn!(
                    "Using default config values, failed to open config file: {}",
                    path.display()
                );
                Ok(Self::default())
            }
            Err(e) => Err(ConfigError::Read {
                path: path.display().to_string(),
                source: e,
            }),
        }
    }

    /// Parse config file text; later lines win
    pub fn parse(content: &str) -> Self {
        let mut config = Self::default();
        for line in content.lines() {
            let line = line.trim_end_matches(['\r', '\n']);
            if let Some(port) = line.strip_prefix("SERIAL_PORT=") {
                config.serial_port = port.to_string();
            } else if let Some(baud) = line.strip_prefix("BAUD_RATE=") {
                config.baud_rate = baud.to_string();
            }
        }
        config
    }

    /// Apply command line overrides
    pub fn with_overrides(mut self, port: Option<String>, baud: Option<String>) -> Self {
        if let Some(port) = port {
            self.serial_port = port;
        }
        if let Some(baud) = baud {
            self.baud_rate = baud;
        }
        self
    }

    /// The configured baud rate, which must be one the programmer supports
    pub fn baud(&self) -> epp2_core::Result<BaudRate> {
        self.baud_rate.parse()
    }
}
