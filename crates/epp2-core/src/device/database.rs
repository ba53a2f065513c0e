//! Device database for runtime loading and search
//!
//! Device definitions live in RON files, one per manufacturer:
//!
//! ```ron
//! (
//!     manufacturer: "ACME",
//!     devices: [
//!         (name: "27C256", code: "1A2B3"),
//!     ],
//! )
//! ```

use std::fs;
use std::path::Path;

use super::DeviceCode;
use crate::error::Result;

/// One searchable device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceEntry {
    /// Manufacturer name as written in the database
    pub manufacturer: String,
    /// Device part name
    pub name: String,
    /// Programmer device code
    pub code: DeviceCode,
}

#[derive(Debug, Clone, serde::Deserialize)]
struct DeviceDef {
    name: String,
    code: String,
}

#[derive(Debug, Clone, serde::Deserialize)]
struct ManufacturerDef {
    manufacturer: String,
    devices: Vec<DeviceDef>,
}

/// Runtime device database
#[derive(Debug, Clone, Default)]
pub struct DeviceDatabase {
    devices: Vec<DeviceEntry>,
}

impl DeviceDatabase {
    /// Create an empty database
    pub fn new() -> Self {
        Self {
            devices: Vec::new(),
        }
    }

    /// Load device definitions from a single RON file
    pub fn load_file(&mut self, path: &Path) -> Result<usize> {
        let content = fs::read_to_string(path)?;
        self.load_ron(&content)
    }

    /// Load device definitions from a RON string
    pub fn load_ron(&mut self, content: &str) -> Result<usize> {
        let def: ManufacturerDef = ron::from_str(content)?;
        let count = def.devices.len();

        for device in def.devices {
            let code = device.code.parse::<DeviceCode>()?;
            self.devices.push(DeviceEntry {
                manufacturer: def.manufacturer.clone(),
                name: device.name,
                code,
            });
        }

        Ok(count)
    }

    /// Load all RON files from a directory
    pub fn load_dir(&mut self, dir: &Path) -> Result<usize> {
        let mut total = 0;

        let mut paths: Vec<_> = fs::read_dir(dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.extension().is_some_and(|ext| ext == "ron"))
            .collect();
        paths.sort();

        for path in paths {
            total += self.load_file(&path)?;
        }

        Ok(total)
    }

    /// All devices in load order
    pub fn devices(&self) -> &[DeviceEntry] {
        &self.devices
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    /// Case-insensitive substring search over manufacturer, name and code
    ///
    /// An empty query matches every device.
    pub fn search(&self, query: &str) -> Vec<&DeviceEntry> {
        let needle = query.trim().to_uppercase();
        self.devices
            .iter()
            .filter(|d| {
                needle.is_empty()
                    || d.manufacturer.to_uppercase().contains(&needle)
                    || d.name.to_uppercase().contains(&needle)
                    || d.code.to_string().contains(&needle)
            })
            .collect()
    }
}
