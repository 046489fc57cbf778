//! HSMP metrics table
//!
//! On platforms with protocol version 6 and later the SMU periodically
//! publishes a fixed-size binary table per socket. The driver exposes it as
//! `metrics_bin`; the byte stream is the little-endian, unpadded field
//! sequence below, read as a whole.

/// Exact size of the metrics table in bytes
pub const METRICS_TABLE_SIZE: usize = 1372;

/// Number of per-core frequency accumulators
pub const NUM_CCLK_ACC: usize = 96;

/// Number of graphics complex frequency accumulators
pub const NUM_GFXCLK_ACC: usize = 8;

/// Number of xGMI link bandwidth accumulators
pub const NUM_XGMI_LINKS: usize = 8;

/// Number of instances of the per-block clocks (SOCCLK, VCLK, DCLK, LCLK)
pub const NUM_CLK_INSTANCES: usize = 4;

/// Number of PCIe bandwidth accumulators
pub const NUM_PCIE_ACC: usize = 4;

/// Decoded metrics table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricsTable {
    pub accumulation_counter: u32,

    // Temperatures (Q10 fixed point, degrees Celsius)
    pub max_socket_temperature: u32,
    pub max_vr_temperature: u32,
    pub max_hbm_temperature: u32,
    pub max_socket_temperature_acc: u64,
    pub max_vr_temperature_acc: u64,
    pub max_hbm_temperature_acc: u64,

    // Power (Q10 fixed point, watts)
    pub socket_power_limit: u32,
    pub max_socket_power_limit: u32,
    pub socket_power: u32,

    // Energy (Q16 fixed point, joules)
    pub timestamp: u64,
    pub socket_energy_acc: u64,
    pub ccd_energy_acc: u64,
    pub xcd_energy_acc: u64,
    pub aid_energy_acc: u64,
    pub hbm_energy_acc: u64,

    // Frequency (MHz)
    pub cclk_frequency_limit: u32,
    pub gfxclk_frequency_limit: u32,
    pub fclk_frequency: u32,
    pub uclk_frequency: u32,
    pub socclk_frequency: [u32; NUM_CLK_INSTANCES],
    pub vclk_frequency: [u32; NUM_CLK_INSTANCES],
    pub dclk_frequency: [u32; NUM_CLK_INSTANCES],
    pub lclk_frequency: [u32; NUM_CLK_INSTANCES],
    pub gfxclk_frequency_acc: [u64; NUM_GFXCLK_ACC],
    pub cclk_frequency_acc: [u64; NUM_CCLK_ACC],

    // Frequency range (MHz)
    pub max_cclk_frequency: u32,
    pub min_cclk_frequency: u32,
    pub max_gfxclk_frequency: u32,
    pub min_gfxclk_frequency: u32,
    pub fclk_frequency_table: [u32; NUM_CLK_INSTANCES],
    pub uclk_frequency_table: [u32; NUM_CLK_INSTANCES],
    pub socclk_frequency_table: [u32; NUM_CLK_INSTANCES],
    pub vclk_frequency_table: [u32; NUM_CLK_INSTANCES],
    pub dclk_frequency_table: [u32; NUM_CLK_INSTANCES],
    pub lclk_frequency_table: [u32; NUM_CLK_INSTANCES],
    pub max_lclk_dpm_range: u32,
    pub min_lclk_dpm_range: u32,

    // xGMI
    pub xgmi_width: u32,
    pub xgmi_bitrate: u32,
    pub xgmi_read_bandwidth_acc: [u64; NUM_XGMI_LINKS],
    pub xgmi_write_bandwidth_acc: [u64; NUM_XGMI_LINKS],

    // Activity
    pub socket_c0_residency: u32,
    pub socket_gfx_busy: u32,
    pub dram_bandwidth_utilization: u32,
    pub socket_c0_residency_acc: u64,
    pub socket_gfx_busy_acc: u64,
    pub dram_bandwidth_acc: u64,
    pub max_dram_bandwidth: u32,
    pub dram_bandwidth_utilization_acc: u64,
    pub pcie_bandwidth_acc: [u64; NUM_PCIE_ACC],

    // Throttlers
    pub prochot_residency_acc: u32,
    pub ppt_residency_acc: u32,
    pub socket_thm_residency_acc: u32,
    pub vr_thm_residency_acc: u32,
    pub hbm_thm_residency_acc: u32,
    pub spare: u32,
}

/// Little-endian field cursor over an exactly-sized buffer
struct FieldReader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> FieldReader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    fn u32(&mut self) -> u32 {
        let mut word = [0u8; 4];
        word.copy_from_slice(&self.bytes[self.pos..self.pos + 4]);
        self.pos += 4;
        u32::from_le_bytes(word)
    }

    fn u64(&mut self) -> u64 {
        let mut word = [0u8; 8];
        word.copy_from_slice(&self.bytes[self.pos..self.pos + 8]);
        self.pos += 8;
        u64::from_le_bytes(word)
    }

    fn u32_array<const N: usize>(&mut self) -> [u32; N] {
        let mut out = [0u32; N];
        for slot in out.iter_mut() {
            *slot = self.u32();
        }
        out
    }

    fn u64_array<const N: usize>(&mut self) -> [u64; N] {
        let mut out = [0u64; N];
        for slot in out.iter_mut() {
            *slot = self.u64();
        }
        out
    }
}

impl MetricsTable {
    /// Decode a table from its exact byte image
    ///
    /// Returns `None` if `bytes` is not exactly [`METRICS_TABLE_SIZE`] long.
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.len() != METRICS_TABLE_SIZE {
            return None;
        }

        let mut r = FieldReader::new(bytes);
        let table = Self {
            accumulation_counter: r.u32(),
            max_socket_temperature: r.u32(),
            max_vr_temperature: r.u32(),
            max_hbm_temperature: r.u32(),
            max_socket_temperature_acc: r.u64(),
            max_vr_temperature_acc: r.u64(),
            max_hbm_temperature_acc: r.u64(),
            socket_power_limit: r.u32(),
            max_socket_power_limit: r.u32(),
            socket_power: r.u32(),
            timestamp: r.u64(),
            socket_energy_acc: r.u64(),
            ccd_energy_acc: r.u64(),
            xcd_energy_acc: r.u64(),
            aid_energy_acc: r.u64(),
            hbm_energy_acc: r.u64(),
            cclk_frequency_limit: r.u32(),
            gfxclk_frequency_limit: r.u32(),
            fclk_frequency: r.u32(),
            uclk_frequency: r.u32(),
            socclk_frequency: r.u32_array(),
            vclk_frequency: r.u32_array(),
            dclk_frequency: r.u32_array(),
            lclk_frequency: r.u32_array(),
            gfxclk_frequency_acc: r.u64_array(),
            cclk_frequency_acc: r.u64_array(),
            max_cclk_frequency: r.u32(),
            min_cclk_frequency: r.u32(),
            max_gfxclk_frequency: r.u32(),
            min_gfxclk_frequency: r.u32(),
            fclk_frequency_table: r.u32_array(),
            uclk_frequency_table: r.u32_array(),
            socclk_frequency_table: r.u32_array(),
            vclk_frequency_table: r.u32_array(),
            dclk_frequency_table: r.u32_array(),
            lclk_frequency_table: r.u32_array(),
            max_lclk_dpm_range: r.u32(),
            min_lclk_dpm_range: r.u32(),
            xgmi_width: r.u32(),
            xgmi_bitrate: r.u32(),
            xgmi_read_bandwidth_acc: r.u64_array(),
            xgmi_write_bandwidth_acc: r.u64_array(),
            socket_c0_residency: r.u32(),
            socket_gfx_busy: r.u32(),
            dram_bandwidth_utilization: r.u32(),
            socket_c0_residency_acc: r.u64(),
            socket_gfx_busy_acc: r.u64(),
            dram_bandwidth_acc: r.u64(),
            max_dram_bandwidth: r.u32(),
            dram_bandwidth_utilization_acc: r.u64(),
            pcie_bandwidth_acc: r.u64_array(),
            prochot_residency_acc: r.u32(),
            ppt_residency_acc: r.u32(),
            socket_thm_residency_acc: r.u32(),
            vr_thm_residency_acc: r.u32(),
            hbm_thm_residency_acc: r.u32(),
            spare: r.u32(),
        };
        debug_assert_eq!(r.pos, METRICS_TABLE_SIZE);

        Some(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_wrong_size() {
        assert!(MetricsTable::from_bytes(&[0u8; METRICS_TABLE_SIZE - 1]).is_none());
        assert!(MetricsTable::from_bytes(&[0u8; METRICS_TABLE_SIZE + 4]).is_none());
    }

    #[test]
    fn test_field_offsets() {
        let mut bytes = vec![0u8; METRICS_TABLE_SIZE];
        bytes[0..4].copy_from_slice(&7u32.to_le_bytes());
        // socket_power sits after 4 u32, 3 u64 and 2 u32
        bytes[48..52].copy_from_slice(&250_000u32.to_le_bytes());
        // spare is the final word
        bytes[METRICS_TABLE_SIZE - 4..].copy_from_slice(&0xDEAD_BEEFu32.to_le_bytes());

        let table = MetricsTable::from_bytes(&bytes).unwrap();
        assert_eq!(table.accumulation_counter, 7);
        assert_eq!(table.socket_power, 250_000);
        assert_eq!(table.spare, 0xDEAD_BEEF);
        assert_eq!(table.cclk_frequency_acc.len(), NUM_CCLK_ACC);
    }
}
