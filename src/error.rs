use std::fmt;

/// Errors observable at the core boundary.
///
/// The core never panics on guest behavior (bad opcodes, out-of-range
/// reads, writes to ROM); those are all defined and handled inline.
/// `GbError` only covers the boundary between the host and the core:
/// loading a ROM, and recognizing its mapper.
#[derive(Debug)]
pub enum GbError {
    /// ROM byte vector too short to contain a header, or a declared
    /// ROM size that disagrees with the buffer length.
    InvalidRom(String),

    /// Cartridge type byte (0x0147) not in the recognized set.
    UnsupportedMapper(u8),

    /// Only raised at the host boundary when loading a ROM from disk.
    IoError(std::io::Error),
}

impl fmt::Display for GbError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GbError::InvalidRom(msg) => write!(f, "invalid ROM: {msg}"),
            GbError::UnsupportedMapper(byte) => {
                write!(f, "unsupported cartridge type: {byte:#04x}")
            }
            GbError::IoError(e) => write!(f, "I/O error: {e}"),
        }
    }
}

impl std::error::Error for GbError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            GbError::IoError(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for GbError {
    fn from(e: std::io::Error) -> Self {
        GbError::IoError(e)
    }
}
