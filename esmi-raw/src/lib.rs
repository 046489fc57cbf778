//! # esmi-raw
//!
//! Hardware definitions for the AMD EPYC system management interfaces.
//!
//! This crate provides type-safe descriptions of the pieces the kernel
//! exposes to user space, without any policy about when to use them:
//!
//! - [`hsmp`] - HSMP mailbox message ids, the ioctl message structure,
//!   packed argument/response word layouts and the metrics table
//! - [`energy`] - energy reporting MSR addresses and the power unit layout
//! - [`msr`] - positional register reads and whole-file reads
//!
//! ## Usage
//!
//! ```ignore
//! use esmi_raw::energy::{msr, PowerUnit};
//! use esmi_raw::{read_u64_at, RegisterLayout};
//!
//! let unit = PowerUnit::from_raw(read_u64_at("/dev/cpu/0/msr", msr::MSR_RAPL_POWER_UNIT)?);
//! let raw = read_u64_at("/dev/cpu/0/msr", msr::MSR_PKG_ENERGY_STATUS)?;
//! let uj = esmi_raw::energy::counter_to_microjoules(raw, unit.energy_units as u32);
//! ```

pub mod energy;
pub mod hsmp;
pub mod msr;
pub mod register;

// Re-export for convenience
pub use hsmp::{HsmpMessage, HsmpMessageId, HSMP_MAX_MSG_LEN};
pub use msr::{read_all, read_u64_at, RawError, Result};
pub use register::RegisterLayout;
