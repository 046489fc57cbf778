//! HSMP (Host System Management Port) mailbox definitions
//!
//! The kernel `amd_hsmp` driver exposes the system management unit mailbox
//! through a single ioctl on `/dev/hsmp`. A request carries a message id, the
//! target socket, up to [`HSMP_MAX_MSG_LEN`] 32-bit arguments and the number
//! of response words expected; the response overwrites the argument array.
//!
//! ## References
//!
//! - Linux `arch/x86/include/uapi/asm/amd_hsmp.h`
//! - AMD EPYC HSMP interface specification

pub mod layout;
pub mod metrics;

/// Maximum number of argument/response words in one message
pub const HSMP_MAX_MSG_LEN: usize = 8;

/// ioctl type byte for `HSMP_IOCTL_CMD`
pub const HSMP_BASE_IOCTL_NR: u8 = 0xF8;

/// ioctl sequence number for `HSMP_IOCTL_CMD`
pub const HSMP_IOCTL_CMD_NR: u8 = 0;

/// Mailbox message identifiers
///
/// Identifiers are sequential, which lets capability tables be dense arrays
/// indexed by id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u32)]
pub enum HsmpMessageId {
    Test = 0x01,
    GetSmuVersion = 0x02,
    GetProtoVersion = 0x03,
    GetSocketPower = 0x04,
    SetSocketPowerLimit = 0x05,
    GetSocketPowerLimit = 0x06,
    GetSocketPowerLimitMax = 0x07,
    SetBoostLimit = 0x08,
    SetBoostLimitSocket = 0x09,
    GetBoostLimit = 0x0A,
    GetProcHot = 0x0B,
    SetXgmiLinkWidth = 0x0C,
    SetDfPstate = 0x0D,
    SetAutoDfPstate = 0x0E,
    GetFclkMclk = 0x0F,
    GetCclkThrottleLimit = 0x10,
    GetC0Percent = 0x11,
    SetNbioDpmLevel = 0x12,
    GetNbioDpmLevel = 0x13,
    GetDdrBandwidth = 0x14,
    GetTempMonitor = 0x15,
    GetDimmTempRange = 0x16,
    GetDimmPower = 0x17,
    GetDimmThermal = 0x18,
    GetSocketFreqLimit = 0x19,
    GetCclkCoreLimit = 0x1A,
    GetRailsSvi = 0x1B,
    GetSocketFmaxFmin = 0x1C,
    GetIoLinkBandwidth = 0x1D,
    GetXgmiBandwidth = 0x1E,
    SetGmi3Width = 0x1F,
    SetPciRate = 0x20,
    SetPowerMode = 0x21,
    SetPstateMaxMin = 0x22,
    GetMetricTableVersion = 0x23,
    GetMetricTable = 0x24,
    GetMetricTableDramAddr = 0x25,
}

impl HsmpMessageId {
    /// One past the highest known message id
    pub const COUNT: usize = 0x26;

    pub const ALL: [HsmpMessageId; Self::COUNT - 1] = [
        HsmpMessageId::Test,
        HsmpMessageId::GetSmuVersion,
        HsmpMessageId::GetProtoVersion,
        HsmpMessageId::GetSocketPower,
        HsmpMessageId::SetSocketPowerLimit,
        HsmpMessageId::GetSocketPowerLimit,
        HsmpMessageId::GetSocketPowerLimitMax,
        HsmpMessageId::SetBoostLimit,
        HsmpMessageId::SetBoostLimitSocket,
        HsmpMessageId::GetBoostLimit,
        HsmpMessageId::GetProcHot,
        HsmpMessageId::SetXgmiLinkWidth,
        HsmpMessageId::SetDfPstate,
        HsmpMessageId::SetAutoDfPstate,
        HsmpMessageId::GetFclkMclk,
        HsmpMessageId::GetCclkThrottleLimit,
        HsmpMessageId::GetC0Percent,
        HsmpMessageId::SetNbioDpmLevel,
        HsmpMessageId::GetNbioDpmLevel,
        HsmpMessageId::GetDdrBandwidth,
        HsmpMessageId::GetTempMonitor,
        HsmpMessageId::GetDimmTempRange,
        HsmpMessageId::GetDimmPower,
        HsmpMessageId::GetDimmThermal,
        HsmpMessageId::GetSocketFreqLimit,
        HsmpMessageId::GetCclkCoreLimit,
        HsmpMessageId::GetRailsSvi,
        HsmpMessageId::GetSocketFmaxFmin,
        HsmpMessageId::GetIoLinkBandwidth,
        HsmpMessageId::GetXgmiBandwidth,
        HsmpMessageId::SetGmi3Width,
        HsmpMessageId::SetPciRate,
        HsmpMessageId::SetPowerMode,
        HsmpMessageId::SetPstateMaxMin,
        HsmpMessageId::GetMetricTableVersion,
        HsmpMessageId::GetMetricTable,
        HsmpMessageId::GetMetricTableDramAddr,
    ];

    pub fn from_u32(id: u32) -> Option<Self> {
        Self::ALL.iter().copied().find(|m| *m as u32 == id)
    }

    pub fn id(self) -> u32 {
        self as u32
    }

    /// Whether the driver classifies the message as a write
    ///
    /// These are only accepted on a descriptor opened for writing. The
    /// loop-back test is one of them.
    pub fn is_set(self) -> bool {
        matches!(
            self,
            HsmpMessageId::Test
                | HsmpMessageId::SetSocketPowerLimit
                | HsmpMessageId::SetBoostLimit
                | HsmpMessageId::SetBoostLimitSocket
                | HsmpMessageId::SetXgmiLinkWidth
                | HsmpMessageId::SetDfPstate
                | HsmpMessageId::SetAutoDfPstate
                | HsmpMessageId::SetNbioDpmLevel
                | HsmpMessageId::SetGmi3Width
                | HsmpMessageId::SetPciRate
                | HsmpMessageId::SetPowerMode
                | HsmpMessageId::SetPstateMaxMin
        )
    }

    pub fn name(self) -> &'static str {
        match self {
            HsmpMessageId::Test => "HSMP_TEST",
            HsmpMessageId::GetSmuVersion => "HSMP_GET_SMU_VER",
            HsmpMessageId::GetProtoVersion => "HSMP_GET_PROTO_VER",
            HsmpMessageId::GetSocketPower => "HSMP_GET_SOCKET_POWER",
            HsmpMessageId::SetSocketPowerLimit => "HSMP_SET_SOCKET_POWER_LIMIT",
            HsmpMessageId::GetSocketPowerLimit => "HSMP_GET_SOCKET_POWER_LIMIT",
            HsmpMessageId::GetSocketPowerLimitMax => "HSMP_GET_SOCKET_POWER_LIMIT_MAX",
            HsmpMessageId::SetBoostLimit => "HSMP_SET_BOOST_LIMIT",
            HsmpMessageId::SetBoostLimitSocket => "HSMP_SET_BOOST_LIMIT_SOCKET",
            HsmpMessageId::GetBoostLimit => "HSMP_GET_BOOST_LIMIT",
            HsmpMessageId::GetProcHot => "HSMP_GET_PROC_HOT",
            HsmpMessageId::SetXgmiLinkWidth => "HSMP_SET_XGMI_LINK_WIDTH",
            HsmpMessageId::SetDfPstate => "HSMP_SET_DF_PSTATE",
            HsmpMessageId::SetAutoDfPstate => "HSMP_SET_AUTO_DF_PSTATE",
            HsmpMessageId::GetFclkMclk => "HSMP_GET_FCLK_MCLK",
            HsmpMessageId::GetCclkThrottleLimit => "HSMP_GET_CCLK_THROTTLE_LIMIT",
            HsmpMessageId::GetC0Percent => "HSMP_GET_C0_PERCENT",
            HsmpMessageId::SetNbioDpmLevel => "HSMP_SET_NBIO_DPM_LEVEL",
            HsmpMessageId::GetNbioDpmLevel => "HSMP_GET_NBIO_DPM_LEVEL",
            HsmpMessageId::GetDdrBandwidth => "HSMP_GET_DDR_BANDWIDTH",
            HsmpMessageId::GetTempMonitor => "HSMP_GET_TEMP_MONITOR",
            HsmpMessageId::GetDimmTempRange => "HSMP_GET_DIMM_TEMP_RANGE",
            HsmpMessageId::GetDimmPower => "HSMP_GET_DIMM_POWER",
            HsmpMessageId::GetDimmThermal => "HSMP_GET_DIMM_THERMAL",
            HsmpMessageId::GetSocketFreqLimit => "HSMP_GET_SOCKET_FREQ_LIMIT",
            HsmpMessageId::GetCclkCoreLimit => "HSMP_GET_CCLK_CORE_LIMIT",
            HsmpMessageId::GetRailsSvi => "HSMP_GET_RAILS_SVI",
            HsmpMessageId::GetSocketFmaxFmin => "HSMP_GET_SOCKET_FMAX_FMIN",
            HsmpMessageId::GetIoLinkBandwidth => "HSMP_GET_IOLINK_BANDWIDTH",
            HsmpMessageId::GetXgmiBandwidth => "HSMP_GET_XGMI_BANDWIDTH",
            HsmpMessageId::SetGmi3Width => "HSMP_SET_GMI3_WIDTH",
            HsmpMessageId::SetPciRate => "HSMP_SET_PCI_RATE",
            HsmpMessageId::SetPowerMode => "HSMP_SET_POWER_MODE",
            HsmpMessageId::SetPstateMaxMin => "HSMP_SET_PSTATE_MAX_MIN",
            HsmpMessageId::GetMetricTableVersion => "HSMP_GET_METRIC_TABLE_VER",
            HsmpMessageId::GetMetricTable => "HSMP_GET_METRIC_TABLE",
            HsmpMessageId::GetMetricTableDramAddr => "HSMP_GET_METRIC_TABLE_DRAM_ADDR",
        }
    }
}

impl std::fmt::Display for HsmpMessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} (0x{:02X})", self.name(), self.id())
    }
}

/// Kernel `struct hsmp_message`
///
/// Layout must match the uapi header byte for byte; the driver copies it in
/// and out of user space as a whole.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HsmpMessage {
    /// Message id
    pub msg_id: u32,
    /// Number of valid words in `args` on input
    pub num_args: u16,
    /// Number of words the driver writes back into `args`
    pub response_sz: u16,
    /// Arguments on input, response words on output
    pub args: [u32; HSMP_MAX_MSG_LEN],
    /// Target socket index
    pub sock_ind: u16,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_ids_are_dense() {
        for (i, id) in HsmpMessageId::ALL.iter().enumerate() {
            assert_eq!(id.id() as usize, i + 1);
            assert_eq!(HsmpMessageId::from_u32(id.id()), Some(*id));
        }
        assert_eq!(HsmpMessageId::from_u32(0), None);
        assert_eq!(HsmpMessageId::from_u32(HsmpMessageId::COUNT as u32), None);
    }

    #[test]
    fn test_hsmp_message_layout() {
        // u32 + 2*u16 + 8*u32 + u16, padded to 4-byte alignment
        assert_eq!(std::mem::size_of::<HsmpMessage>(), 44);
        assert_eq!(std::mem::align_of::<HsmpMessage>(), 4);
    }

    #[test]
    fn test_set_commands() {
        assert!(HsmpMessageId::SetSocketPowerLimit.is_set());
        assert!(HsmpMessageId::SetAutoDfPstate.is_set());
        assert!(!HsmpMessageId::GetSocketPower.is_set());
        assert!(HsmpMessageId::Test.is_set());
    }
}
