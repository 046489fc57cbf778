//! Typed telemetry and control operations on [`crate::Esmi`]
//!
//! Each operation validates its arguments against the context, builds a
//! single mailbox request (or energy read), and decodes the response.

pub mod boost;
pub mod energy;
pub mod fabric;
pub mod memory;
pub mod metrics;
pub mod power;
pub mod system;

pub use boost::{FreqLimitSource, FrequencyLimit};
pub use fabric::BandwidthType;
pub use power::PowerCapUpdate;
pub use system::ClockFrequencies;

use crate::error::{EsmiError, Result};

/// Largest LCLK DPM level
pub const MAX_DPM_LEVEL: u8 = 3;

/// Largest NBIO tile index
pub const MAX_NBIO_ID: u8 = 3;

/// Largest PCIe link rate control mode (0 auto, 1 Gen4, 2 Gen5)
pub const MAX_PCIE_RATE: u8 = 2;

/// `min <= max` with both bounds under `limit`
pub(crate) fn check_range(what: &str, min: u8, max: u8, limit: u8) -> Result<()> {
    if min > max {
        return Err(EsmiError::InvalidInput(format!(
            "{what}: min {min} greater than max {max}"
        )));
    }
    if max > limit {
        return Err(EsmiError::InvalidInput(format!(
            "{what}: max {max} exceeds platform limit {limit}"
        )));
    }
    Ok(())
}

pub(crate) fn check_limit(what: &str, value: u32, limit: u32) -> Result<()> {
    if value > limit {
        return Err(EsmiError::InvalidInput(format!(
            "{what} {value} exceeds limit {limit}"
        )));
    }
    Ok(())
}

#[cfg(test)]
pub(crate) mod testing {
    use crate::host::fake::FakeHost;
    use crate::state::Esmi;

    /// Initialized context over `host`
    pub fn esmi(host: FakeHost) -> Esmi<FakeHost> {
        let mut esmi = Esmi::new(host);
        esmi.init().unwrap();
        esmi
    }

    /// Two-socket Genoa, 16 logical CPUs, protocol 5
    pub fn genoa(host: impl FnOnce(FakeHost) -> FakeHost) -> Esmi<FakeHost> {
        esmi(host(FakeHost::epyc(2, 8, 2, 0x11, 5)))
    }
}
