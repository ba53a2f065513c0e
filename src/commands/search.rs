//! Device search command

use epp2_core::device::{DeviceDatabase, DeviceEntry};
use std::path::Path;

/// Directories searched, in order, when no database path is given
pub const DEFAULT_DEVICE_DIRS: [&str; 2] = ["devices", "/usr/share/epp2prog/devices"];

/// Load the device database
///
/// An explicit `path` may be a directory of `.ron` files or a single file,
/// and must load. Without one, every default directory that exists is
/// loaded; an unreadable one is skipped with a warning.
pub fn load_database(path: Option<&Path>) -> Result<DeviceDatabase, Box<dyn std::error::Error>> {
    let mut db = DeviceDatabase::new();

    if let Some(path) = path {
        let loaded = if path.is_dir() {
            db.load_dir(path)
        } else {
            db.load_file(path)
        };
        loaded.map_err(|e| format!("Device database {}: {}", path.display(), e))?;
        return Ok(db);
    }

    let dirs: Vec<&Path> = DEFAULT_DEVICE_DIRS
        .iter()
        .map(Path::new)
        .filter(|dir| dir.is_dir())
        .collect();
    if dirs.is_empty() {
        log::warn!("No device database in {}", DEFAULT_DEVICE_DIRS.join(" or "));
    }
    for dir in dirs {
        match db.load_dir(dir) {
            Ok(count) => log::debug!("Loaded {} devices from {}", count, dir.display()),
            Err(e) => log::warn!("Skipping device database {}: {}", dir.display(), e),
        }
    }

    Ok(db)
}

/// Print every device matching `query` as a `CODE : MANUFACTURER DEVICE` table
pub fn run(db: &DeviceDatabase, query: &str) {
    let matches = db.search(query);
    if matches.is_empty() {
        log::warn!("No devices match {:?}", query);
    }

    println!();
    for line in format_table(&matches) {
        println!("{}", line);
    }
    println!();
}

fn format_table(entries: &[&DeviceEntry]) -> Vec<String> {
    let mut lines = vec![
        format!("{:<6} : {:<20} {:<20}", "CODE", "MANUFACTURER", "DEVICE"),
        format!("{} : {} {}", "=".repeat(6), "=".repeat(20), "=".repeat(20)),
    ];
    lines.extend(entries.iter().map(|entry| {
        format!(
            "{:<6} : {:<20} {:<20}",
            entry.code.to_string(),
            entry.manufacturer,
            entry.name
        )
    }));
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    const ACME: &str = r#"(manufacturer: "ACME", devices: [(name: "27C256", code: "1A2B3")])"#;

    #[test]
    fn test_load_database_from_file_and_dir() {
        let dir = std::env::temp_dir().join(format!("epp2prog-devices-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let file = dir.join("acme.ron");
        fs::write(&file, ACME).unwrap();
        fs::write(dir.join("notes.txt"), "not a device file").unwrap();

        assert_eq!(load_database(Some(&file)).unwrap().len(), 1);
        let db = load_database(Some(&dir)).unwrap();
        assert_eq!(db.len(), 1);
        assert_eq!(db.search("acme").len(), 1);

        fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn test_missing_database_path_is_error() {
        let err = load_database(Some(Path::new("/nonexistent/epp2prog/devices.ron"))).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/epp2prog/devices.ron"));
    }

    #[test]
    fn test_table_layout() {
        let mut db = DeviceDatabase::new();
        db.load_ron(r#"(manufacturer: "ACME", devices: [(name: "27C256", code: "1A2B3")])"#)
            .unwrap();
        let lines = format_table(&db.search("27c"));

        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("CODE   : MANUFACTURER"));
        assert!(lines[2].starts_with("01A2B3 : ACME "));
        assert!(lines[2].trim_end().ends_with("27C256"));
    }
}
