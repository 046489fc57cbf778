//! Data fabric, NBIO and interconnect link control

use esmi_raw::hsmp::layout::{DpmLevel, LinkBandwidthRequest, LinkWidthRange, PstateRange};
use esmi_raw::{HsmpMessageId, RegisterLayout};

use crate::commands::{check_limit, check_range, MAX_DPM_LEVEL, MAX_NBIO_ID, MAX_PCIE_RATE};
use crate::error::{EsmiError, Result};
use crate::host::HostOs;
use crate::mailbox::MailboxRequest;
use crate::state::Esmi;

enum_with_data! {
    /// Link bandwidth counter selector
    pub enum BandwidthType: u8 {
        Aggregate => ("aggregate", 1),
        Read => ("read", 2),
        Write => ("write", 4),
    }
    impl encoding -> u8
}

impl BandwidthType {
    pub fn from_name(name: &str) -> Option<Self> {
        Self::all()
            .into_iter()
            .find(|t| t.name().eq_ignore_ascii_case(name))
    }
}

impl<H: HostOs> Esmi<H> {
    fn link_encoding(&self, link: &str) -> Result<u32> {
        self.link_table()?
            .encoding(link)
            .ok_or_else(|| EsmiError::InvalidInput(format!("unknown link name {link:?}")))
    }

    fn check_pstate(&self, id: HsmpMessageId, pstate: u8) -> Result<()> {
        let limit = self.limits_for(id)?.max_df_pstate;
        check_limit("DF P-state", pstate as u32, limit as u32)
    }

    /// Constrain xGMI link width on every socket
    pub fn set_xgmi_width(&self, min: u8, max: u8) -> Result<()> {
        let limit = self
            .limits_for(HsmpMessageId::SetXgmiLinkWidth)?
            .max_link_width;
        check_range("xGMI link width", min, max, limit)?;

        let mailbox = self.mailbox()?;
        let width = LinkWidthRange { min, max }.to_raw();
        for socket in 0..self.number_of_sockets()? {
            mailbox.submit(MailboxRequest::new(HsmpMessageId::SetXgmiLinkWidth, socket).arg(width))?;
        }
        Ok(())
    }

    pub fn set_gmi3_link_width(&self, socket: u32, min: u8, max: u8) -> Result<()> {
        self.check_socket(socket)?;
        let limit = self.limits_for(HsmpMessageId::SetGmi3Width)?.max_link_width;
        check_range("GMI3 link width", min, max, limit)?;

        let width = LinkWidthRange { min, max }.to_raw();
        self.mailbox()?
            .submit(MailboxRequest::new(HsmpMessageId::SetGmi3Width, socket).arg(width))?;
        Ok(())
    }

    /// Force a data fabric P-state, disabling automatic selection
    pub fn set_df_pstate(&self, socket: u32, pstate: u8) -> Result<()> {
        self.check_socket(socket)?;
        self.check_pstate(HsmpMessageId::SetDfPstate, pstate)?;

        self.mailbox()?
            .submit(MailboxRequest::new(HsmpMessageId::SetDfPstate, socket).arg(pstate as u32))?;
        Ok(())
    }

    pub fn enable_auto_df_pstate(&self, socket: u32) -> Result<()> {
        self.check_socket(socket)?;
        self.mailbox()?
            .submit(MailboxRequest::new(HsmpMessageId::SetAutoDfPstate, socket))?;
        Ok(())
    }

    /// Limit DF P-state selection to `max..=min` (P0 is the fastest)
    pub fn set_df_pstate_range(&self, socket: u32, max: u8, min: u8) -> Result<()> {
        self.check_socket(socket)?;
        let range = PstateRange { max, min };
        range
            .validate()
            .map_err(|e| EsmiError::InvalidInput(e.to_string()))?;
        self.check_pstate(HsmpMessageId::SetPstateMaxMin, min)?;

        self.mailbox()?.submit(
            MailboxRequest::new(HsmpMessageId::SetPstateMaxMin, socket).arg(range.to_raw()),
        )?;
        Ok(())
    }

    pub fn set_lclk_dpm_level(&self, socket: u32, nbio_id: u8, min: u8, max: u8) -> Result<()> {
        self.check_socket(socket)?;
        check_limit("NBIO id", nbio_id as u32, MAX_NBIO_ID as u32)?;
        check_range("LCLK DPM level", min, max, MAX_DPM_LEVEL)?;

        let level = DpmLevel { nbio_id, max, min };
        self.mailbox()?.submit(
            MailboxRequest::new(HsmpMessageId::SetNbioDpmLevel, socket).arg(level.to_raw()),
        )?;
        Ok(())
    }

    pub fn lclk_dpm_level(&self, socket: u32, nbio_id: u8) -> Result<DpmLevel> {
        self.check_socket(socket)?;
        check_limit("NBIO id", nbio_id as u32, MAX_NBIO_ID as u32)?;

        let response = self.mailbox()?.submit(
            MailboxRequest::new(HsmpMessageId::GetNbioDpmLevel, socket)
                .arg((nbio_id as u32) << 16)
                .response_words(1),
        )?;
        let level = DpmLevel::from_raw(response.word(0) & 0xFFFF);
        Ok(DpmLevel { nbio_id, ..level })
    }

    /// Set PCIe link rate control; returns the mode that was active before
    pub fn set_pcie_link_rate(&self, socket: u32, mode: u8) -> Result<u8> {
        self.check_socket(socket)?;
        check_limit("PCIe rate mode", mode as u32, MAX_PCIE_RATE as u32)?;

        let response = self.mailbox()?.submit(
            MailboxRequest::new(HsmpMessageId::SetPciRate, socket)
                .arg(mode as u32)
                .response_words(1),
        )?;
        Ok(response.word(0) as u8)
    }

    /// IO link bandwidth in Mbps; only the aggregate counter exists
    pub fn io_link_bandwidth(
        &self,
        socket: u32,
        link: &str,
        bandwidth_type: BandwidthType,
    ) -> Result<u32> {
        self.check_socket(socket)?;
        if bandwidth_type != BandwidthType::Aggregate {
            return Err(EsmiError::InvalidInput(format!(
                "IO link bandwidth has no {} counter",
                bandwidth_type.name()
            )));
        }
        self.link_bandwidth(HsmpMessageId::GetIoLinkBandwidth, socket, link, bandwidth_type)
    }

    /// xGMI link bandwidth in Mbps
    pub fn xgmi_bandwidth(
        &self,
        socket: u32,
        link: &str,
        bandwidth_type: BandwidthType,
    ) -> Result<u32> {
        self.check_socket(socket)?;
        self.link_bandwidth(HsmpMessageId::GetXgmiBandwidth, socket, link, bandwidth_type)
    }

    fn link_bandwidth(
        &self,
        id: HsmpMessageId,
        socket: u32,
        link: &str,
        bandwidth_type: BandwidthType,
    ) -> Result<u32> {
        let request = LinkBandwidthRequest {
            link: self.link_encoding(link)?,
            bandwidth_type: bandwidth_type.encoding(),
        };
        request
            .validate()
            .map_err(|e| EsmiError::InvalidInput(e.to_string()))?;

        let response = self.mailbox()?.submit(
            MailboxRequest::new(id, socket)
                .arg(request.to_raw())
                .response_words(1),
        )?;
        Ok(response.word(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::testing::{esmi, genoa};
    use crate::host::fake::FakeHost;

    #[test]
    fn test_xgmi_width_applies_to_every_socket() {
        let esmi = genoa(|host| host);
        esmi.set_xgmi_width(1, 2).unwrap();

        let sent = esmi.host().commands();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].args[0], 0x0102);
        assert_eq!((sent[0].sock_ind, sent[1].sock_ind), (0, 1));
    }

    #[test]
    fn test_link_width_range_validation() {
        let esmi = genoa(|host| host);

        assert!(matches!(esmi.set_xgmi_width(2, 1), Err(EsmiError::InvalidInput(_))));
        assert!(matches!(esmi.set_xgmi_width(0, 3), Err(EsmiError::InvalidInput(_))));
        assert!(matches!(
            esmi.set_gmi3_link_width(0, 2, 0),
            Err(EsmiError::InvalidInput(_))
        ));
        assert!(matches!(
            esmi.set_gmi3_link_width(0, 0, 3),
            Err(EsmiError::InvalidInput(_))
        ));
        assert!(esmi.host().commands().is_empty());

        esmi.set_gmi3_link_width(1, 0, 2).unwrap();
        assert_eq!(esmi.host().commands()[0].args[0], 0x0002);
    }

    #[test]
    fn test_lclk_dpm_level_validation() {
        let esmi = genoa(|host| host);

        assert!(matches!(
            esmi.set_lclk_dpm_level(0, 0, 3, 1),
            Err(EsmiError::InvalidInput(_))
        ));
        assert!(matches!(
            esmi.set_lclk_dpm_level(0, 0, 0, 4),
            Err(EsmiError::InvalidInput(_))
        ));
        assert!(matches!(
            esmi.set_lclk_dpm_level(0, 4, 0, 1),
            Err(EsmiError::InvalidInput(_))
        ));
        assert!(esmi.host().commands().is_empty());

        esmi.set_lclk_dpm_level(0, 2, 1, 3).unwrap();
        assert_eq!(esmi.host().commands()[0].args[0], 0x0002_0301);
    }

    #[test]
    fn test_lclk_dpm_level_read() {
        let esmi = genoa(|host| host.respond(HsmpMessageId::GetNbioDpmLevel, &[0x0000_0201]));

        let level = esmi.lclk_dpm_level(1, 3).unwrap();
        assert_eq!((level.nbio_id, level.max, level.min), (3, 2, 1));
        assert_eq!(esmi.host().commands()[0].args[0], 0x0003_0000);
    }

    #[test]
    fn test_df_pstate_limits_follow_protocol() {
        let genoa = genoa(|host| host);
        assert!(genoa.set_df_pstate(0, 2).is_ok());
        assert!(matches!(genoa.set_df_pstate(0, 3), Err(EsmiError::InvalidInput(_))));

        let mi300 = esmi(FakeHost::epyc(1, 8, 2, 0x90, 6));
        assert!(mi300.set_df_pstate(0, 3).is_ok());

        genoa.enable_auto_df_pstate(1).unwrap();
        assert_eq!(
            genoa.host().commands().last().unwrap().msg_id,
            HsmpMessageId::SetAutoDfPstate.id()
        );
    }

    #[test]
    fn test_df_pstate_range_requires_max_not_above_min() {
        let esmi = genoa(|host| host);

        assert!(matches!(
            esmi.set_df_pstate_range(0, 2, 0),
            Err(EsmiError::InvalidInput(_))
        ));
        assert!(matches!(
            esmi.set_df_pstate_range(0, 0, 3),
            Err(EsmiError::InvalidInput(_))
        ));
        assert!(esmi.host().commands().is_empty());

        esmi.set_df_pstate_range(0, 0, 2).unwrap();
        assert_eq!(esmi.host().commands()[0].args[0], 0x0002);
    }

    #[test]
    fn test_pcie_rate_returns_previous_mode() {
        let esmi = genoa(|host| host.respond(HsmpMessageId::SetPciRate, &[1]));

        assert_eq!(esmi.set_pcie_link_rate(0, 2).unwrap(), 1);
        assert!(matches!(
            esmi.set_pcie_link_rate(0, 3),
            Err(EsmiError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_link_bandwidth_requests() {
        let esmi = genoa(|host| {
            host.respond(HsmpMessageId::GetXgmiBandwidth, &[48_000])
                .respond(HsmpMessageId::GetIoLinkBandwidth, &[12_000])
        });

        assert_eq!(esmi.xgmi_bandwidth(0, "G2", BandwidthType::Read).unwrap(), 48_000);
        assert_eq!(
            esmi.io_link_bandwidth(1, "p1", BandwidthType::Aggregate).unwrap(),
            12_000
        );

        let sent = esmi.host().commands();
        assert_eq!(sent[0].args[0], (0x40 << 8) | 2);
        assert_eq!(sent[1].args[0], (0x02 << 8) | 1);
    }

    #[test]
    fn test_link_bandwidth_validation() {
        let esmi = genoa(|host| host);

        assert!(matches!(
            esmi.io_link_bandwidth(0, "P0", BandwidthType::Write),
            Err(EsmiError::InvalidInput(_))
        ));
        assert!(matches!(
            esmi.xgmi_bandwidth(0, "G7", BandwidthType::Aggregate),
            Err(EsmiError::InvalidInput(_))
        ));
        assert!(esmi.host().commands().is_empty());
        assert_eq!(BandwidthType::from_name("WRITE"), Some(BandwidthType::Write));
    }
}
