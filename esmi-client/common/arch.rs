// Platform detection from CPU family/model

use crate::common::topology::CpuIdentity;
use crate::error::{EsmiError, Result};

pub const AMD_VENDOR_ID: &str = "AuthenticAMD";

/// Oldest family with an HSMP mailbox (Zen 2)
pub const MIN_SUPPORTED_FAMILY: u32 = 0x17;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Rome,
    Milan,
    Genoa,
    Mi300,
    Turin,
    Unknown,
}

impl Platform {
    pub fn name(&self) -> &'static str {
        match self {
            Platform::Rome => "Rome",
            Platform::Milan => "Milan",
            Platform::Genoa => "Genoa",
            Platform::Mi300 => "MI300",
            Platform::Turin => "Turin",
            Platform::Unknown => "Unknown",
        }
    }

    pub fn from_family_model(family: u32, model: u32) -> Self {
        match (family, model) {
            (0x17, 0x30..=0x3F) => Platform::Rome,
            (0x19, 0x00..=0x0F) => Platform::Milan,
            (0x19, 0x10..=0x1F) | (0x19, 0xA0..=0xAF) => Platform::Genoa,
            (0x19, 0x90..=0x9F) => Platform::Mi300,
            (0x1A, 0x00..=0x1F) => Platform::Turin,
            _ => Platform::Unknown,
        }
    }
}

/// Classify the processors, rejecting anything without an HSMP-capable SMU
pub fn detect_platform(identity: &CpuIdentity) -> Result<Platform> {
    if identity.vendor != AMD_VENDOR_ID {
        return Err(EsmiError::UnsupportedPlatform(format!(
            "vendor {:?}",
            identity.vendor
        )));
    }

    if identity.family < MIN_SUPPORTED_FAMILY {
        return Err(EsmiError::UnsupportedPlatform(format!(
            "family 0x{:X}",
            identity.family
        )));
    }

    let platform = Platform::from_family_model(identity.family, identity.model);

    tracing::info!(
        "CPU: Family {:X}h, Model {:X}h ({})",
        identity.family,
        identity.model,
        platform.name()
    );

    if platform == Platform::Unknown {
        tracing::warn!("Unknown AMD model, relying on the firmware protocol version alone");
    }

    Ok(platform)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity(vendor: &str, family: u32, model: u32) -> CpuIdentity {
        CpuIdentity {
            vendor: vendor.to_string(),
            family,
            model,
        }
    }

    #[test]
    fn test_platform_classification() {
        assert_eq!(Platform::from_family_model(0x17, 0x31), Platform::Rome);
        assert_eq!(Platform::from_family_model(0x19, 0x01), Platform::Milan);
        assert_eq!(Platform::from_family_model(0x19, 0x11), Platform::Genoa);
        assert_eq!(Platform::from_family_model(0x19, 0xA0), Platform::Genoa);
        assert_eq!(Platform::from_family_model(0x19, 0x90), Platform::Mi300);
        assert_eq!(Platform::from_family_model(0x1A, 0x02), Platform::Turin);
        assert_eq!(Platform::from_family_model(0x19, 0x50), Platform::Unknown);
    }

    #[test]
    fn test_rejects_other_vendors_and_old_families() {
        assert!(matches!(
            detect_platform(&identity("GenuineIntel", 6, 0x55)),
            Err(EsmiError::UnsupportedPlatform(_))
        ));
        assert!(matches!(
            detect_platform(&identity(AMD_VENDOR_ID, 0x15, 0x01)),
            Err(EsmiError::UnsupportedPlatform(_))
        ));
        assert_eq!(
            detect_platform(&identity(AMD_VENDOR_ID, 0x19, 0x11)).unwrap(),
            Platform::Genoa
        );
    }
}
