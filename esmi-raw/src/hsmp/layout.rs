//! Packed argument and response word layouts for HSMP messages
//!
//! Each struct documents the bit ranges of one 32-bit word. Decoding is pure;
//! range checking against platform limits is the caller's job.

use crate::register::RegisterLayout;

/// Threshold at and above which a DIMM sensor reading is negative
pub const DIMM_THERMAL_NEGATIVE_THRESHOLD: u32 = 0x400;

/// Offset subtracted from negative DIMM sensor readings (11-bit two's complement)
pub const DIMM_THERMAL_SIGN_OFFSET: i32 = 0x800;

/// DIMM sensor resolution in degrees Celsius per LSB
pub const DIMM_THERMAL_RESOLUTION: f64 = 0.25;

/// SMU firmware version (`HSMP_GET_SMU_VER` response)
///
/// | Bits  | Field |
/// |-------|-------|
/// | 0-7   | debug |
/// | 8-15  | minor |
/// | 16-23 | major |
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SmuVersion {
    pub major: u8,
    pub minor: u8,
    pub debug: u8,
}

impl RegisterLayout for SmuVersion {
    type Raw = u32;

    fn to_raw(&self) -> u32 {
        ((self.major as u32) << 16) | ((self.minor as u32) << 8) | self.debug as u32
    }

    fn from_raw(value: u32) -> Self {
        Self {
            major: ((value >> 16) & 0xFF) as u8,
            minor: ((value >> 8) & 0xFF) as u8,
            debug: (value & 0xFF) as u8,
        }
    }
}

/// Frequency plus limiting-source bitmask (`HSMP_GET_SOCKET_FREQ_LIMIT` response)
///
/// | Bits  | Field        |
/// |-------|--------------|
/// | 0-15  | source_mask  |
/// | 16-31 | freq_mhz     |
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FreqLimit {
    pub freq_mhz: u16,
    pub source_mask: u16,
}

impl RegisterLayout for FreqLimit {
    type Raw = u32;

    fn to_raw(&self) -> u32 {
        ((self.freq_mhz as u32) << 16) | self.source_mask as u32
    }

    fn from_raw(value: u32) -> Self {
        Self {
            freq_mhz: (value >> 16) as u16,
            source_mask: (value & 0xFFFF) as u16,
        }
    }
}

/// Socket frequency range (`HSMP_GET_SOCKET_FMAX_FMIN` response)
///
/// | Bits  | Field    |
/// |-------|----------|
/// | 0-15  | fmin_mhz |
/// | 16-31 | fmax_mhz |
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FreqRange {
    pub fmax_mhz: u16,
    pub fmin_mhz: u16,
}

impl RegisterLayout for FreqRange {
    type Raw = u32;

    fn to_raw(&self) -> u32 {
        ((self.fmax_mhz as u32) << 16) | self.fmin_mhz as u32
    }

    fn from_raw(value: u32) -> Self {
        Self {
            fmax_mhz: (value >> 16) as u16,
            fmin_mhz: (value & 0xFFFF) as u16,
        }
    }
}

/// DDR bandwidth (`HSMP_GET_DDR_BANDWIDTH` response)
///
/// | Bits  | Field             |
/// |-------|-------------------|
/// | 0-7   | utilized_percent  |
/// | 8-19  | utilized_gbps     |
/// | 20-31 | max_gbps          |
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DdrBandwidth {
    pub max_gbps: u16,
    pub utilized_gbps: u16,
    pub utilized_percent: u8,
}

impl RegisterLayout for DdrBandwidth {
    type Raw = u32;

    fn to_raw(&self) -> u32 {
        ((self.max_gbps as u32 & 0xFFF) << 20)
            | ((self.utilized_gbps as u32 & 0xFFF) << 8)
            | self.utilized_percent as u32
    }

    fn from_raw(value: u32) -> Self {
        Self {
            max_gbps: ((value >> 20) & 0xFFF) as u16,
            utilized_gbps: ((value >> 8) & 0xFFF) as u16,
            utilized_percent: (value & 0xFF) as u8,
        }
    }

    fn validate(&self) -> Result<(), &'static str> {
        if self.max_gbps > 0xFFF || self.utilized_gbps > 0xFFF {
            return Err("Bandwidth fields must be <= 0xFFF (12 bits)");
        }
        Ok(())
    }
}

/// Socket temperature (`HSMP_GET_TEMP_MONITOR` response)
///
/// | Bits  | Field                         |
/// |-------|-------------------------------|
/// | 18-20 | fraction (1/8 degree steps)   |
/// | 21-31 | integer degrees Celsius       |
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SocketTemperature {
    pub degrees: u16,
    pub eighths: u8,
}

impl SocketTemperature {
    pub fn millidegrees(&self) -> u32 {
        self.degrees as u32 * 1000 + self.eighths as u32 * 125
    }
}

impl RegisterLayout for SocketTemperature {
    type Raw = u32;

    fn to_raw(&self) -> u32 {
        ((self.degrees as u32 & 0x7FF) << 21) | ((self.eighths as u32 & 0x7) << 18)
    }

    fn from_raw(value: u32) -> Self {
        Self {
            degrees: ((value >> 21) & 0x7FF) as u16,
            eighths: ((value >> 18) & 0x7) as u8,
        }
    }
}

/// DIMM temperature range and refresh rate (`HSMP_GET_DIMM_TEMP_RANGE` response)
///
/// | Bits | Field   |
/// |------|---------|
/// | 0-2  | range   |
/// | 3    | refresh |
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DimmTempRange {
    pub range: u8,
    /// 0 = 1x refresh, 1 = 2x refresh
    pub refresh_rate: u8,
}

impl RegisterLayout for DimmTempRange {
    type Raw = u32;

    fn to_raw(&self) -> u32 {
        (self.range as u32 & 0x7) | ((self.refresh_rate as u32 & 0x1) << 3)
    }

    fn from_raw(value: u32) -> Self {
        Self {
            range: (value & 0x7) as u8,
            refresh_rate: ((value >> 3) & 0x1) as u8,
        }
    }
}

/// DIMM power (`HSMP_GET_DIMM_POWER` response)
///
/// | Bits  | Field          |
/// |-------|----------------|
/// | 0-7   | dimm_address   |
/// | 8-16  | update_rate_ms |
/// | 17-31 | power_mw       |
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DimmPower {
    pub power_mw: u16,
    pub update_rate_ms: u16,
    pub dimm_address: u8,
}

impl RegisterLayout for DimmPower {
    type Raw = u32;

    fn to_raw(&self) -> u32 {
        ((self.power_mw as u32 & 0x7FFF) << 17)
            | ((self.update_rate_ms as u32 & 0x1FF) << 8)
            | self.dimm_address as u32
    }

    fn from_raw(value: u32) -> Self {
        Self {
            power_mw: ((value >> 17) & 0x7FFF) as u16,
            update_rate_ms: ((value >> 8) & 0x1FF) as u16,
            dimm_address: (value & 0xFF) as u8,
        }
    }

    fn validate(&self) -> Result<(), &'static str> {
        if self.power_mw > 0x7FFF {
            return Err("DIMM power must be <= 0x7FFF (15 bits)");
        }
        if self.update_rate_ms > 0x1FF {
            return Err("DIMM update rate must be <= 0x1FF (9 bits)");
        }
        Ok(())
    }
}

/// DIMM thermal sensor (`HSMP_GET_DIMM_THERMAL` response)
///
/// | Bits  | Field          |
/// |-------|----------------|
/// | 0-7   | dimm_address   |
/// | 8-16  | update_rate_ms |
/// | 21-31 | sensor (11-bit, 0.25 C/LSB, two's complement) |
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DimmThermal {
    pub sensor: u16,
    pub update_rate_ms: u16,
    pub dimm_address: u8,
}

impl DimmThermal {
    /// Signed temperature in degrees Celsius
    pub fn celsius(&self) -> f64 {
        decode_dimm_temperature(self.sensor as u32)
    }
}

impl RegisterLayout for DimmThermal {
    type Raw = u32;

    fn to_raw(&self) -> u32 {
        ((self.sensor as u32 & 0x7FF) << 21)
            | ((self.update_rate_ms as u32 & 0x1FF) << 8)
            | self.dimm_address as u32
    }

    fn from_raw(value: u32) -> Self {
        Self {
            sensor: ((value >> 21) & 0x7FF) as u16,
            update_rate_ms: ((value >> 8) & 0x1FF) as u16,
            dimm_address: (value & 0xFF) as u8,
        }
    }
}

/// Decode an 11-bit DIMM sensor field into degrees Celsius
pub fn decode_dimm_temperature(raw: u32) -> f64 {
    let raw = (raw & 0x7FF) as i32;
    let signed = if raw as u32 >= DIMM_THERMAL_NEGATIVE_THRESHOLD {
        raw - DIMM_THERMAL_SIGN_OFFSET
    } else {
        raw
    };
    signed as f64 * DIMM_THERMAL_RESOLUTION
}

/// LCLK DPM level range of one NBIO
///
/// Response of `HSMP_GET_NBIO_DPM_LEVEL` uses bits 0-15; the request of
/// `HSMP_SET_NBIO_DPM_LEVEL` additionally carries the NBIO id.
///
/// | Bits  | Field   |
/// |-------|---------|
/// | 0-7   | min     |
/// | 8-15  | max     |
/// | 16-23 | nbio_id |
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DpmLevel {
    pub nbio_id: u8,
    pub max: u8,
    pub min: u8,
}

impl RegisterLayout for DpmLevel {
    type Raw = u32;

    fn to_raw(&self) -> u32 {
        ((self.nbio_id as u32) << 16) | ((self.max as u32) << 8) | self.min as u32
    }

    fn from_raw(value: u32) -> Self {
        Self {
            nbio_id: ((value >> 16) & 0xFF) as u8,
            max: ((value >> 8) & 0xFF) as u8,
            min: (value & 0xFF) as u8,
        }
    }
}

/// Link width range request (`HSMP_SET_XGMI_LINK_WIDTH`, `HSMP_SET_GMI3_WIDTH`)
///
/// | Bits | Field |
/// |------|-------|
/// | 0-7  | max   |
/// | 8-15 | min   |
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LinkWidthRange {
    pub min: u8,
    pub max: u8,
}

impl RegisterLayout for LinkWidthRange {
    type Raw = u32;

    fn to_raw(&self) -> u32 {
        ((self.min as u32) << 8) | self.max as u32
    }

    fn from_raw(value: u32) -> Self {
        Self {
            min: ((value >> 8) & 0xFF) as u8,
            max: (value & 0xFF) as u8,
        }
    }
}

/// Data fabric P-state range request (`HSMP_SET_PSTATE_MAX_MIN`)
///
/// Lower P-state index means higher performance, so a valid range has
/// `max <= min`.
///
/// | Bits | Field |
/// |------|-------|
/// | 0-7  | min   |
/// | 8-15 | max   |
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PstateRange {
    pub max: u8,
    pub min: u8,
}

impl RegisterLayout for PstateRange {
    type Raw = u32;

    fn to_raw(&self) -> u32 {
        ((self.max as u32) << 8) | self.min as u32
    }

    fn from_raw(value: u32) -> Self {
        Self {
            max: ((value >> 8) & 0xFF) as u8,
            min: (value & 0xFF) as u8,
        }
    }

    fn validate(&self) -> Result<(), &'static str> {
        if self.max > self.min {
            return Err("P-state max must not exceed min");
        }
        Ok(())
    }
}

/// Per-core boost limit request (`HSMP_SET_BOOST_LIMIT`)
///
/// | Bits  | Field    |
/// |-------|----------|
/// | 0-15  | freq_mhz |
/// | 16-31 | apic_id  |
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BoostLimitRequest {
    pub apic_id: u16,
    pub freq_mhz: u16,
}

impl RegisterLayout for BoostLimitRequest {
    type Raw = u32;

    fn to_raw(&self) -> u32 {
        ((self.apic_id as u32) << 16) | self.freq_mhz as u32
    }

    fn from_raw(value: u32) -> Self {
        Self {
            apic_id: (value >> 16) as u16,
            freq_mhz: (value & 0xFFFF) as u16,
        }
    }
}

/// Link bandwidth request (`HSMP_GET_IOLINK_BANDWIDTH`, `HSMP_GET_XGMI_BANDWIDTH`)
///
/// | Bits | Field            |
/// |------|------------------|
/// | 0-7  | bandwidth_type   |
/// | 8-31 | link encoding    |
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LinkBandwidthRequest {
    pub link: u32,
    pub bandwidth_type: u8,
}

impl RegisterLayout for LinkBandwidthRequest {
    type Raw = u32;

    fn to_raw(&self) -> u32 {
        ((self.link & 0x00FF_FFFF) << 8) | self.bandwidth_type as u32
    }

    fn from_raw(value: u32) -> Self {
        Self {
            link: value >> 8,
            bandwidth_type: (value & 0xFF) as u8,
        }
    }

    fn validate(&self) -> Result<(), &'static str> {
        if self.link > 0x00FF_FFFF {
            return Err("Link encoding must fit in 24 bits");
        }
        Ok(())
    }
}
