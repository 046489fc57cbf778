//! Per-protocol-version command sets, limits and link encodings

use esmi_raw::HsmpMessageId;

const TABLE_LEN: usize = HsmpMessageId::COUNT;

const fn table(ranges: &[(u32, u32)], excluded: &[u32]) -> [bool; TABLE_LEN] {
    let mut t = [false; TABLE_LEN];
    let mut i = 0;
    while i < ranges.len() {
        let (lo, hi) = ranges[i];
        let mut id = lo;
        while id <= hi {
            t[id as usize] = true;
            id += 1;
        }
        i += 1;
    }
    let mut j = 0;
    while j < excluded.len() {
        t[excluded[j] as usize] = false;
        j += 1;
    }
    t
}

static V2_COMMANDS: [bool; TABLE_LEN] = table(&[(0x01, 0x13)], &[]);
static V4_COMMANDS: [bool; TABLE_LEN] = table(&[(0x01, 0x14)], &[]);
static V5_COMMANDS: [bool; TABLE_LEN] = table(&[(0x01, 0x22)], &[]);
// MI300 has no DIMM sideband
static V6_COMMANDS: [bool; TABLE_LEN] = table(&[(0x01, 0x25)], &[0x16, 0x17, 0x18]);
static V7_COMMANDS: [bool; TABLE_LEN] = table(&[(0x01, 0x25)], &[]);

static LINKS_PCIE_XGMI4: [(&str, u32); 8] = [
    ("P0", 0x01),
    ("P1", 0x02),
    ("P2", 0x04),
    ("P3", 0x08),
    ("G0", 0x10),
    ("G1", 0x20),
    ("G2", 0x40),
    ("G3", 0x80),
];

static LINKS_MI300: [(&str, u32); 10] = [
    ("P2", 0x04),
    ("P3", 0x08),
    ("G0", 0x10),
    ("G1", 0x20),
    ("G2", 0x40),
    ("G3", 0x80),
    ("G4", 0x100),
    ("G5", 0x200),
    ("G6", 0x400),
    ("G7", 0x800),
];

/// HSMP protocol generations with distinct command sets and decode rules
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolVersion {
    /// Versions 1-3 (Rome)
    Version2,
    /// Milan
    Version4,
    /// Genoa
    Version5,
    /// MI300
    Version6,
    /// Turin and later; carries the reported number
    Version7Plus(u32),
}

impl ProtocolVersion {
    /// Classify a reported version; 0 means no usable mailbox
    pub fn from_raw(raw: u32) -> Option<Self> {
        match raw {
            0 => None,
            1..=3 => Some(ProtocolVersion::Version2),
            4 => Some(ProtocolVersion::Version4),
            5 => Some(ProtocolVersion::Version5),
            6 => Some(ProtocolVersion::Version6),
            n => Some(ProtocolVersion::Version7Plus(n)),
        }
    }

    pub fn raw(&self) -> u32 {
        match self {
            ProtocolVersion::Version2 => 2,
            ProtocolVersion::Version4 => 4,
            ProtocolVersion::Version5 => 5,
            ProtocolVersion::Version6 => 6,
            ProtocolVersion::Version7Plus(n) => *n,
        }
    }

    pub fn capabilities(&self) -> CapabilityTable {
        let supported: &'static [bool] = match self {
            ProtocolVersion::Version2 => &V2_COMMANDS,
            ProtocolVersion::Version4 => &V4_COMMANDS,
            ProtocolVersion::Version5 => &V5_COMMANDS,
            ProtocolVersion::Version6 => &V6_COMMANDS,
            ProtocolVersion::Version7Plus(_) => &V7_COMMANDS,
        };
        CapabilityTable { supported }
    }

    pub fn limits(&self) -> PlatformLimits {
        match self {
            ProtocolVersion::Version2 | ProtocolVersion::Version4 => PlatformLimits {
                max_link_width: 2,
                max_df_pstate: 2,
                max_efficiency_mode: 0,
            },
            ProtocolVersion::Version5 => PlatformLimits {
                max_link_width: 2,
                max_df_pstate: 2,
                max_efficiency_mode: 2,
            },
            ProtocolVersion::Version6 => PlatformLimits {
                max_link_width: 2,
                max_df_pstate: 3,
                max_efficiency_mode: 3,
            },
            ProtocolVersion::Version7Plus(_) => PlatformLimits {
                max_link_width: 2,
                max_df_pstate: 3,
                max_efficiency_mode: 5,
            },
        }
    }

    pub fn link_table(&self) -> LinkTable {
        let links: &'static [(&'static str, u32)] = match self {
            ProtocolVersion::Version2 | ProtocolVersion::Version4 => &[],
            ProtocolVersion::Version5 | ProtocolVersion::Version7Plus(_) => &LINKS_PCIE_XGMI4,
            ProtocolVersion::Version6 => &LINKS_MI300,
        };
        LinkTable { links }
    }

    /// Whether `HSMP_SET_POWER_MODE` accepts the read flag in bit 31
    pub fn can_read_power_mode(&self) -> bool {
        matches!(
            self,
            ProtocolVersion::Version6 | ProtocolVersion::Version7Plus(_)
        )
    }
}

/// A command id with its support flag for the active protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CapabilityEntry {
    pub id: HsmpMessageId,
    pub supported: bool,
}

/// Dense support table indexed by message id
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CapabilityTable {
    supported: &'static [bool],
}

impl CapabilityTable {
    /// Table with every command unsupported (no mailbox)
    pub fn empty() -> Self {
        Self { supported: &[] }
    }

    pub fn is_supported(&self, id: u32) -> bool {
        self.supported.get(id as usize).copied().unwrap_or(false)
    }

    pub fn supports(&self, id: HsmpMessageId) -> bool {
        self.is_supported(id.id())
    }

    pub fn entries(&self) -> impl Iterator<Item = CapabilityEntry> + '_ {
        HsmpMessageId::ALL.iter().map(|&id| CapabilityEntry {
            id,
            supported: self.supports(id),
        })
    }
}

/// Per-platform upper bounds for set operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PlatformLimits {
    /// Highest link width class (0 = x4/quarter, 2 = x16/full)
    pub max_link_width: u8,
    /// Highest data fabric P-state index
    pub max_df_pstate: u8,
    /// Highest power efficiency mode
    pub max_efficiency_mode: u8,
}

/// Symbolic link names to their HSMP encodings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkTable {
    links: &'static [(&'static str, u32)],
}

impl LinkTable {
    pub fn empty() -> Self {
        Self { links: &[] }
    }

    pub fn encoding(&self, name: &str) -> Option<u32> {
        self.links
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, enc)| *enc)
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.links.iter().map(|(n, _)| *n)
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_classification() {
        assert_eq!(ProtocolVersion::from_raw(0), None);
        assert_eq!(ProtocolVersion::from_raw(1), Some(ProtocolVersion::Version2));
        assert_eq!(ProtocolVersion::from_raw(3), Some(ProtocolVersion::Version2));
        assert_eq!(ProtocolVersion::from_raw(5), Some(ProtocolVersion::Version5));
        assert_eq!(
            ProtocolVersion::from_raw(9),
            Some(ProtocolVersion::Version7Plus(9))
        );
        assert_eq!(ProtocolVersion::Version7Plus(9).raw(), 9);
    }

    #[test]
    fn test_version_tables() {
        let v2 = ProtocolVersion::Version2.capabilities();
        assert!(v2.supports(HsmpMessageId::Test));
        assert!(v2.supports(HsmpMessageId::GetNbioDpmLevel));
        assert!(!v2.supports(HsmpMessageId::GetDdrBandwidth));

        let v4 = ProtocolVersion::Version4.capabilities();
        assert!(v4.supports(HsmpMessageId::GetDdrBandwidth));
        assert!(!v4.supports(HsmpMessageId::GetDimmPower));

        let v5 = ProtocolVersion::Version5.capabilities();
        assert!(v5.supports(HsmpMessageId::GetDimmThermal));
        assert!(v5.supports(HsmpMessageId::SetPstateMaxMin));
        assert!(!v5.supports(HsmpMessageId::GetMetricTable));

        let v6 = ProtocolVersion::Version6.capabilities();
        assert!(!v6.supports(HsmpMessageId::GetDimmPower));
        assert!(v6.supports(HsmpMessageId::GetMetricTable));

        let v7 = ProtocolVersion::Version7Plus(7).capabilities();
        assert!(HsmpMessageId::ALL.iter().all(|&id| v7.supports(id)));
    }

    #[test]
    fn test_out_of_range_ids_are_unsupported() {
        let v7 = ProtocolVersion::Version7Plus(7).capabilities();
        assert!(!v7.is_supported(0));
        assert!(!v7.is_supported(HsmpMessageId::COUNT as u32));
        assert!(!v7.is_supported(u32::MAX));
        assert!(!CapabilityTable::empty().supports(HsmpMessageId::Test));
    }

    #[test]
    fn test_entries_cover_every_command() {
        let v6 = ProtocolVersion::Version6.capabilities();
        let entries: Vec<_> = v6.entries().collect();
        assert_eq!(entries.len(), HsmpMessageId::ALL.len());
        assert_eq!(entries.iter().filter(|e| !e.supported).count(), 3);
    }

    #[test]
    fn test_link_tables() {
        let genoa = ProtocolVersion::Version5.link_table();
        assert_eq!(genoa.encoding("P0"), Some(0x01));
        assert_eq!(genoa.encoding("g3"), Some(0x80));
        assert_eq!(genoa.encoding("G7"), None);

        let mi300 = ProtocolVersion::Version6.link_table();
        assert_eq!(mi300.encoding("G7"), Some(0x800));
        assert_eq!(mi300.encoding("P0"), None);

        assert!(ProtocolVersion::Version4.link_table().is_empty());
    }
}
