//! Positional register and whole-file read primitives
//!
//! Every call opens the backing file, performs a single read and drops the
//! handle before returning, so no descriptor outlives the call on any path.
//! Paths are supplied by the caller; this module knows nothing about where
//! the kernel exposes a given device.

use std::fs::File;
use std::io::Read;
use std::os::unix::fs::FileExt;
use std::path::{Path, PathBuf};

pub type Result<T> = std::result::Result<T, RawError>;

/// Errors that can occur during raw device and file access
#[derive(Debug, thiserror::Error)]
pub enum RawError {
    #[error("Failed to open {}: {source}", path.display())]
    OpenFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to read offset 0x{offset:X} of {}: {source}", path.display())]
    ReadFailed {
        path: PathBuf,
        offset: u64,
        source: std::io::Error,
    },
}

impl RawError {
    /// The underlying OS error, for callers that classify by errno
    pub fn io_error(&self) -> &std::io::Error {
        match self {
            RawError::OpenFailed { source, .. } | RawError::ReadFailed { source, .. } => source,
        }
    }

    pub fn into_io_error(self) -> std::io::Error {
        match self {
            RawError::OpenFailed { source, .. } | RawError::ReadFailed { source, .. } => source,
        }
    }
}

/// Read a 64-bit little-endian value at byte `offset` of a register device
///
/// For `/dev/cpu/N/msr` style devices the offset is the register address.
///
/// # Errors
///
/// Returns an error if:
/// - The device cannot be opened (module not loaded, or missing CAP_SYS_RAWIO)
/// - The register is not readable at that offset
///
/// # Example
///
/// ```ignore
/// use esmi_raw::msr::read_u64_at;
///
/// let unit = read_u64_at("/dev/cpu/0/msr", 0xC001_0299)?;
/// ```
pub fn read_u64_at(path: impl AsRef<Path>, offset: u64) -> Result<u64> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| RawError::OpenFailed {
        path: path.to_path_buf(),
        source: e,
    })?;

    let mut buffer = [0u8; 8];
    file.read_exact_at(&mut buffer, offset)
        .map_err(|e| RawError::ReadFailed {
            path: path.to_path_buf(),
            offset,
            source: e,
        })?;

    Ok(u64::from_le_bytes(buffer))
}

/// Read the whole content of a small sysfs-style file
pub fn read_all(path: impl AsRef<Path>) -> Result<Vec<u8>> {
    let path = path.as_ref();
    let mut file = File::open(path).map_err(|e| RawError::OpenFailed {
        path: path.to_path_buf(),
        source: e,
    })?;

    let mut buffer = Vec::new();
    file.read_to_end(&mut buffer)
        .map_err(|e| RawError::ReadFailed {
            path: path.to_path_buf(),
            offset: 0,
            source: e,
        })?;

    Ok(buffer)
}
