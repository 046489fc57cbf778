use std::io;
use thiserror::Error;

use esmi_raw::HsmpMessageId;

#[derive(Error, Debug)]
pub enum EsmiError {
    #[error("Energy counter driver (amd_energy) not present")]
    EnergyDriverAbsent,

    #[error("MSR driver (msr_safe/msr) not present")]
    RegisterDriverAbsent,

    #[error("HSMP driver not present")]
    MailboxDriverAbsent,

    #[error("Neither energy nor HSMP driver present")]
    NoDriver,

    #[error("File or entry not found: {0}")]
    FileNotFound(#[source] io::Error),

    #[error("Device not present: {0}")]
    DeviceNotPresent(String),

    #[error("Device busy: {0}")]
    DeviceBusy(#[source] io::Error),

    #[error("Permission denied: {0}")]
    PermissionDenied(#[source] io::Error),

    #[error("Not supported on this input: {0}")]
    NotSupported(String),

    #[error("File error: {0}")]
    FileError(#[source] io::Error),

    #[error("Interrupted: {0}")]
    Interrupted(#[source] io::Error),

    #[error("IO error: {0}")]
    Io(#[source] io::Error),

    #[error("Unexpected size: expected {expected} bytes, got {actual}")]
    UnexpectedSize { expected: usize, actual: usize },

    #[error("Unknown error: {0}")]
    Unknown(String),

    #[error("Null or empty argument: {0}")]
    NullArgument(&'static str),

    #[error("Out of memory")]
    OutOfMemory,

    #[error("Library not initialized")]
    NotInitialized,

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("HSMP mailbox timed out")]
    MailboxTimeout,

    #[error("{0} not supported by platform firmware")]
    UnsupportedCommand(HsmpMessageId),

    #[error("Unsupported platform: {0}")]
    UnsupportedPlatform(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Mailbox loop-back mismatch: expected {expected}, got {actual}")]
    LoopbackMismatch { expected: u32, actual: u32 },
}

impl From<io::Error> for EsmiError {
    fn from(e: io::Error) -> Self {
        let Some(errno) = e.raw_os_error() else {
            return EsmiError::Io(e);
        };

        match errno {
            libc::ENOENT => EsmiError::FileNotFound(e),
            libc::ENODEV | libc::ENXIO | libc::ENODATA => EsmiError::DeviceNotPresent(e.to_string()),
            libc::EBUSY | libc::EAGAIN => EsmiError::DeviceBusy(e),
            libc::EACCES | libc::EPERM => EsmiError::PermissionDenied(e),
            libc::EOPNOTSUPP | libc::ENOSYS => EsmiError::NotSupported(e.to_string()),
            libc::EINTR => EsmiError::Interrupted(e),
            libc::ETIMEDOUT => EsmiError::MailboxTimeout,
            libc::ENOMEM => EsmiError::OutOfMemory,
            libc::EINVAL => EsmiError::InvalidInput(e.to_string()),
            libc::EIO | libc::EBADMSG => EsmiError::Io(e),
            _ => EsmiError::FileError(e),
        }
    }
}

impl From<esmi_raw::RawError> for EsmiError {
    fn from(e: esmi_raw::RawError) -> Self {
        EsmiError::from(e.into_io_error())
    }
}

impl EsmiError {
    /// Caller-facing status for this error
    pub fn status(&self) -> EsmiStatus {
        match self {
            EsmiError::EnergyDriverAbsent => EsmiStatus::EnergyDriverAbsent,
            EsmiError::RegisterDriverAbsent => EsmiStatus::RegisterDriverAbsent,
            EsmiError::MailboxDriverAbsent => EsmiStatus::MailboxDriverAbsent,
            EsmiError::NoDriver => EsmiStatus::NoDriver,
            EsmiError::FileNotFound(_) | EsmiError::DeviceNotPresent(_) => EsmiStatus::FileNotFound,
            EsmiError::DeviceBusy(_) => EsmiStatus::DeviceBusy,
            EsmiError::PermissionDenied(_) => EsmiStatus::PermissionDenied,
            EsmiError::NotSupported(_) | EsmiError::UnsupportedPlatform(_) => {
                EsmiStatus::NotSupported
            }
            EsmiError::FileError(_) | EsmiError::ParseError(_) => EsmiStatus::FileError,
            EsmiError::Interrupted(_) => EsmiStatus::Interrupted,
            EsmiError::Io(_)
            | EsmiError::UnexpectedSize { .. }
            | EsmiError::LoopbackMismatch { .. } => EsmiStatus::IoError,
            EsmiError::Unknown(_) => EsmiStatus::Unknown,
            EsmiError::NullArgument(_) => EsmiStatus::NullArgument,
            EsmiError::OutOfMemory => EsmiStatus::OutOfMemory,
            EsmiError::NotInitialized => EsmiStatus::NotInitialized,
            EsmiError::InvalidInput(_) => EsmiStatus::InvalidInput,
            EsmiError::MailboxTimeout => EsmiStatus::MailboxTimeout,
            EsmiError::UnsupportedCommand(_) => EsmiStatus::UnsupportedCommand,
        }
    }

    /// True for the "device not present" condition batch reads tolerate
    pub fn is_not_present(&self) -> bool {
        matches!(self, EsmiError::DeviceNotPresent(_))
    }
}

/// Status codes surfaced to callers, with a fixed message per code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum EsmiStatus {
    Success = 0,
    EnergyDriverAbsent = 1,
    RegisterDriverAbsent = 2,
    MailboxDriverAbsent = 3,
    NoDriver = 4,
    FileNotFound = 5,
    DeviceBusy = 6,
    PermissionDenied = 7,
    NotSupported = 8,
    FileError = 9,
    Interrupted = 10,
    IoError = 11,
    Unknown = 12,
    NullArgument = 13,
    OutOfMemory = 14,
    NotInitialized = 15,
    InvalidInput = 16,
    MailboxTimeout = 17,
    UnsupportedCommand = 18,
}

impl EsmiStatus {
    pub fn code(self) -> u32 {
        self as u32
    }

    pub fn message(self) -> &'static str {
        match self {
            EsmiStatus::Success => "Success",
            EsmiStatus::EnergyDriverAbsent => "Energy driver not present",
            EsmiStatus::RegisterDriverAbsent => "MSR driver not present",
            EsmiStatus::MailboxDriverAbsent => "HSMP driver not present",
            EsmiStatus::NoDriver => "Neither energy nor HSMP driver present",
            EsmiStatus::FileNotFound => "Entry or file not found",
            EsmiStatus::DeviceBusy => "Device busy",
            EsmiStatus::PermissionDenied => "Permission denied, run as root",
            EsmiStatus::NotSupported => "Not supported on this platform or input",
            EsmiStatus::FileError => "Error reading or parsing file",
            EsmiStatus::Interrupted => "Operation interrupted",
            EsmiStatus::IoError => "Unexpected size or I/O error",
            EsmiStatus::Unknown => "Unknown error",
            EsmiStatus::NullArgument => "Invalid null or empty argument",
            EsmiStatus::OutOfMemory => "Out of memory",
            EsmiStatus::NotInitialized => "Library not initialized",
            EsmiStatus::InvalidInput => "Input value is invalid",
            EsmiStatus::MailboxTimeout => "HSMP message timed out",
            EsmiStatus::UnsupportedCommand => "HSMP message or feature not supported",
        }
    }
}

impl std::fmt::Display for EsmiStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.message())
    }
}

/// Status for a result: `Success` on `Ok`, the error's status otherwise
pub fn status_of<T>(result: &Result<T>) -> EsmiStatus {
    match result {
        Ok(_) => EsmiStatus::Success,
        Err(e) => e.status(),
    }
}

pub type Result<T> = std::result::Result<T, EsmiError>;
