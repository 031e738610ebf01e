//! DHCP option overload module.

use std::{fmt, ops::Range};

use crate::v4::constants::*;

/// DHCP option overload values (RFC 2132 §9.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Overload {
    Undefined = 0,
    File = 1,
    Sname = 2,
    Both = 3,
}

impl Overload {
    /// The header fields holding extra options, in the order they are parsed.
    ///
    /// `file` always goes before `sname`.
    pub fn regions(self) -> &'static [Range<usize>] {
        const FILE: &[Range<usize>] = &[OFFSET_BOOT_FILENAME..OFFSET_MAGIC_COOKIE];
        const SNAME: &[Range<usize>] = &[OFFSET_SERVER_NAME..OFFSET_BOOT_FILENAME];
        const BOTH: &[Range<usize>] = &[
            OFFSET_BOOT_FILENAME..OFFSET_MAGIC_COOKIE,
            OFFSET_SERVER_NAME..OFFSET_BOOT_FILENAME,
        ];

        match self {
            Overload::File => FILE,
            Overload::Sname => SNAME,
            Overload::Both => BOTH,
            Overload::Undefined => &[],
        }
    }

    /// Whether the `file` field carries options instead of a boot file name.
    pub fn covers_file(self) -> bool {
        match self {
            Overload::File | Overload::Both => true,
            _ => false,
        }
    }
}

impl fmt::Display for Overload {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use self::Overload::*;
        match self {
            File => write!(f, "FILE"),
            Sname => write!(f, "SNAME"),
            Both => write!(f, "BOTH"),

            Undefined => write!(f, "UNDEFINED"),
        }
    }
}

impl From<u8> for Overload {
    fn from(value: u8) -> Self {
        use self::Overload::*;
        match value {
            1 => File,
            2 => Sname,
            3 => Both,

            _ => Undefined,
        }
    }
}
