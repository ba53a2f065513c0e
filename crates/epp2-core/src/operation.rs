//! Operations the application can perform

use core::fmt;

/// What the user asked for
///
/// `Search` and `Spec` work purely from local data; the others open a
/// session with the programmer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    /// Device/manufacturer name search in the device database
    Search,
    /// Decode a device code into its programming specification
    Spec,
    /// Check that an address range is erased
    EmptyCheck,
    /// Read an address range
    Read,
    /// Program S-records into the device
    Write,
    /// Compare S-records against the device
    Verify,
}

impl OperationKind {
    /// Look up an operation by its single-letter code (`D S E R W V`)
    pub fn from_letter(c: char) -> Option<Self> {
        match c.to_ascii_uppercase() {
            'D' => Some(Self::Search),
            'S' => Some(Self::Spec),
            'E' => Some(Self::EmptyCheck),
            'R' => Some(Self::Read),
            'W' => Some(Self::Write),
            'V' => Some(Self::Verify),
            _ => None,
        }
    }

    /// The single-letter code for this operation
    pub const fn letter(self) -> char {
        match self {
            Self::Search => 'D',
            Self::Spec => 'S',
            Self::EmptyCheck => 'E',
            Self::Read => 'R',
            Self::Write => 'W',
            Self::Verify => 'V',
        }
    }

    /// Whether this operation talks to the programmer
    pub const fn needs_device(self) -> bool {
        !matches!(self, Self::Search | Self::Spec)
    }

    /// Whether this operation streams S-records to the device
    ///
    /// These take a start address but never an end address.
    pub const fn sends_records(self) -> bool {
        matches!(self, Self::Write | Self::Verify)
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Search => "search",
            Self::Spec => "spec",
            Self::EmptyCheck => "empty check",
            Self::Read => "read",
            Self::Write => "write",
            Self::Verify => "verify",
        };
        f.write_str(name)
    }
}
