//! Energy reporting register definitions for AMD family 17h/19h/1Ah
//!
//! Energy is accumulated per core and per package in free-running counters.
//! The counters count in units of `1 / 2^ESU` joules, where ESU comes from
//! the power unit register.
//!
//! ## References
//!
//! - AMD Processor Programming Reference (PPR), Core::X86::Msr::RAPL_PWR_UNIT
//! - AMD PPR, Core::X86::Msr::CORE_ENERGY_STAT / PKG_ENERGY_STAT

use crate::register::RegisterLayout;

/// MSR addresses for energy reporting
pub mod msr {
    /// Power unit register - energy, power and time units
    pub const MSR_RAPL_POWER_UNIT: u64 = 0xC001_0299;

    /// Core energy status - per physical core accumulator
    pub const MSR_CORE_ENERGY_STATUS: u64 = 0xC001_029A;

    /// Package energy status - per socket accumulator, readable from any of its cores
    pub const MSR_PKG_ENERGY_STATUS: u64 = 0xC001_029B;
}

/// Power Unit Register layout
///
/// ## Register Format
///
/// | Bits   | Field        | Description                    |
/// |--------|--------------|--------------------------------|
/// | 0-3    | power_units  | Power units (1/2^PU watts)     |
/// | 4-7    | reserved     |                                |
/// | 8-12   | energy_units | Energy units (1/2^ESU joules)  |
/// | 13-15  | reserved     |                                |
/// | 16-19  | time_units   | Time units (1/2^TU seconds)    |
/// | 20-63  | reserved     |                                |
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PowerUnit {
    pub power_units: u8,
    pub energy_units: u8,
    pub time_units: u8,
}

impl RegisterLayout for PowerUnit {
    type Raw = u64;

    fn to_raw(&self) -> u64 {
        (self.power_units as u64 & 0x0F)
            | ((self.energy_units as u64 & 0x1F) << 8)
            | ((self.time_units as u64 & 0x0F) << 16)
    }

    fn from_raw(value: u64) -> Self {
        Self {
            power_units: (value & 0x0F) as u8,
            energy_units: ((value >> 8) & 0x1F) as u8,
            time_units: ((value >> 16) & 0x0F) as u8,
        }
    }

    fn validate(&self) -> Result<(), &'static str> {
        if self.power_units > 15 {
            return Err("Power units must be <= 15 (4 bits)");
        }
        if self.energy_units > 31 {
            return Err("Energy units must be <= 31 (5 bits)");
        }
        if self.time_units > 15 {
            return Err("Time units must be <= 15 (4 bits)");
        }
        Ok(())
    }
}

/// Convert a raw energy counter value to microjoules
///
/// `raw * 0.5^energy_unit_shift * 1e6`, truncated toward zero.
pub fn counter_to_microjoules(raw: u64, energy_unit_shift: u32) -> u64 {
    let joules = raw as f64 * 0.5f64.powi(energy_unit_shift as i32);
    (joules * 1_000_000.0) as u64
}
