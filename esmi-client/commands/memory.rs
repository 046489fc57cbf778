use esmi_raw::hsmp::layout::{DdrBandwidth, DimmPower, DimmTempRange, DimmThermal};
use esmi_raw::{HsmpMessageId, RegisterLayout};

use crate::error::Result;
use crate::host::HostOs;
use crate::mailbox::MailboxRequest;
use crate::state::Esmi;

impl<H: HostOs> Esmi<H> {
    /// Theoretical max and utilized DDR bandwidth of a socket
    pub fn ddr_bandwidth(&self, socket: u32) -> Result<DdrBandwidth> {
        self.check_socket(socket)?;
        let response = self
            .mailbox()?
            .submit(MailboxRequest::new(HsmpMessageId::GetDdrBandwidth, socket).response_words(1))?;
        Ok(DdrBandwidth::from_raw(response.word(0)))
    }

    fn dimm_word(&self, id: HsmpMessageId, socket: u32, dimm_address: u8) -> Result<u32> {
        self.check_socket(socket)?;
        let response = self.mailbox()?.submit(
            MailboxRequest::new(id, socket)
                .arg(dimm_address as u32)
                .response_words(1),
        )?;
        Ok(response.word(0))
    }

    pub fn dimm_temp_range_and_refresh_rate(
        &self,
        socket: u32,
        dimm_address: u8,
    ) -> Result<DimmTempRange> {
        let word = self.dimm_word(HsmpMessageId::GetDimmTempRange, socket, dimm_address)?;
        Ok(DimmTempRange::from_raw(word))
    }

    pub fn dimm_power(&self, socket: u32, dimm_address: u8) -> Result<DimmPower> {
        let word = self.dimm_word(HsmpMessageId::GetDimmPower, socket, dimm_address)?;
        Ok(DimmPower::from_raw(word))
    }

    /// DIMM thermal sensor; [`DimmThermal::celsius`] gives the signed reading
    pub fn dimm_thermal(&self, socket: u32, dimm_address: u8) -> Result<DimmThermal> {
        let word = self.dimm_word(HsmpMessageId::GetDimmThermal, socket, dimm_address)?;
        Ok(DimmThermal::from_raw(word))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::testing::{esmi, genoa};
    use crate::error::EsmiError;
    use crate::host::fake::FakeHost;

    #[test]
    fn test_ddr_bandwidth() {
        // max 230 Gbps, 57 Gbps used, 24%
        let word = (230 << 20) | (57 << 8) | 24;
        let esmi = genoa(|host| host.respond(HsmpMessageId::GetDdrBandwidth, &[word]));

        let bw = esmi.ddr_bandwidth(0).unwrap();
        assert_eq!((bw.max_gbps, bw.utilized_gbps, bw.utilized_percent), (230, 57, 24));
    }

    #[test]
    fn test_dimm_thermal_negative_fixup() {
        // 0x7F8 is at/above the threshold: (0x7F8 - 0x800) * 0.25 = -2.0
        let negative = (0x7F8 << 21) | (100 << 8) | 0x80;
        // 0x0B4 * 0.25 = 45.0
        let positive = (0x0B4 << 21) | (100 << 8) | 0x81;
        let esmi = genoa(|host| host.respond(HsmpMessageId::GetDimmThermal, &[negative]));

        let reading = esmi.dimm_thermal(0, 0x80).unwrap();
        assert_eq!(reading.dimm_address, 0x80);
        assert_eq!(reading.update_rate_ms, 100);
        assert_eq!(reading.celsius(), (0x7F8 as f64 - 0x800 as f64) * 0.25);
        assert_eq!(esmi.host().commands()[0].args[0], 0x80);

        assert_eq!(DimmThermal::from_raw(positive).celsius(), 45.0);
    }

    #[test]
    fn test_dimm_power_and_range() {
        let power = (4_500 << 17) | (10 << 8) | 0x90;
        let esmi = genoa(|host| {
            host.respond(HsmpMessageId::GetDimmPower, &[power])
                .respond(HsmpMessageId::GetDimmTempRange, &[0b1011])
        });

        let p = esmi.dimm_power(1, 0x90).unwrap();
        assert_eq!((p.power_mw, p.update_rate_ms, p.dimm_address), (4_500, 10, 0x90));

        let range = esmi.dimm_temp_range_and_refresh_rate(1, 0x90).unwrap();
        assert_eq!((range.range, range.refresh_rate), (3, 1));
    }

    #[test]
    fn test_dimm_commands_gated_on_mi300() {
        let esmi = esmi(FakeHost::epyc(1, 8, 2, 0x90, 6));
        assert!(matches!(
            esmi.dimm_power(0, 0x80),
            Err(EsmiError::UnsupportedCommand(HsmpMessageId::GetDimmPower))
        ));
        assert!(esmi.host().commands().is_empty());
        assert!(esmi.ddr_bandwidth(0).is_ok());
    }
}
