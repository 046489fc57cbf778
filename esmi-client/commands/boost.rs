use esmi_raw::hsmp::layout::{BoostLimitRequest, FreqLimit, FreqRange};
use esmi_raw::{HsmpMessageId, RegisterLayout};

use crate::error::{EsmiError, Result};
use crate::host::HostOs;
use crate::mailbox::MailboxRequest;
use crate::state::Esmi;

enum_with_data! {
    /// Causes that can cap the socket frequency, in bitmask order
    pub enum FreqLimitSource: u16 {
        CHtcActive => ("cHTC-Active", 1 << 0),
        Prochot => ("PROCHOT", 1 << 1),
        TdcLimit => ("TDC limit", 1 << 2),
        PptLimit => ("PPT Limit", 1 << 3),
        OpnMax => ("OPN Max", 1 << 4),
        ReliabilityLimit => ("Reliability Limit", 1 << 5),
        ApmlAgent => ("APML Agent", 1 << 6),
        HsmpAgent => ("HSMP Agent", 1 << 7),
    }
    impl bit -> u16
}

impl FreqLimitSource {
    /// Sources whose bit is set in `mask`, lowest bit first
    pub fn from_mask(mask: u16) -> Vec<FreqLimitSource> {
        Self::all()
            .into_iter()
            .filter(|source| mask & source.bit() != 0)
            .collect()
    }
}

/// Current socket frequency limit and what imposes it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrequencyLimit {
    pub freq_mhz: u16,
    pub sources: Vec<FreqLimitSource>,
}

impl FrequencyLimit {
    pub fn source_names(&self) -> Vec<&'static str> {
        self.sources.iter().map(|s| s.name()).collect()
    }
}

impl<H: HostOs> Esmi<H> {
    fn core_apic(&self, core: u32) -> Result<(u32, u32)> {
        self.check_core(core)?;
        let mapping = *self
            .topology()?
            .core(core)
            .ok_or_else(|| EsmiError::InvalidInput(format!("core {core} out of range")))?;
        if mapping.degraded {
            tracing::warn!("Core {core} has no topology record, addressing socket 0 APIC 0");
        }
        Ok((mapping.socket, mapping.apic_id))
    }

    fn check_boost_freq(freq_mhz: u32) -> Result<u16> {
        u16::try_from(freq_mhz).map_err(|_| {
            EsmiError::InvalidInput(format!("boost limit {freq_mhz} MHz exceeds 65535"))
        })
    }

    /// Per-core boost limit in MHz
    pub fn core_boostlimit(&self, core: u32) -> Result<u32> {
        let (socket, apic) = self.core_apic(core)?;
        let response = self.mailbox()?.submit(
            MailboxRequest::new(HsmpMessageId::GetBoostLimit, socket)
                .arg(apic)
                .response_words(1),
        )?;
        Ok(response.word(0))
    }

    pub fn set_core_boostlimit(&self, core: u32, freq_mhz: u32) -> Result<()> {
        let (socket, apic) = self.core_apic(core)?;
        let freq_mhz = Self::check_boost_freq(freq_mhz)?;
        let request = BoostLimitRequest {
            apic_id: apic as u16,
            freq_mhz,
        };

        self.mailbox()?.submit(
            MailboxRequest::new(HsmpMessageId::SetBoostLimit, socket).arg(request.to_raw()),
        )?;
        Ok(())
    }

    /// Boost limit for every core of a socket
    pub fn set_socket_boostlimit(&self, socket: u32, freq_mhz: u32) -> Result<()> {
        self.check_socket(socket)?;
        let freq_mhz = Self::check_boost_freq(freq_mhz)?;

        self.mailbox()?.submit(
            MailboxRequest::new(HsmpMessageId::SetBoostLimitSocket, socket).arg(freq_mhz as u32),
        )?;
        Ok(())
    }

    /// CCLK frequency limit of one core in MHz
    pub fn core_clock_limit(&self, core: u32) -> Result<u32> {
        let (socket, apic) = self.core_apic(core)?;
        let response = self.mailbox()?.submit(
            MailboxRequest::new(HsmpMessageId::GetCclkCoreLimit, socket)
                .arg(apic)
                .response_words(1),
        )?;
        Ok(response.word(0))
    }

    /// Socket-wide CCLK throttle limit in MHz
    pub fn cclk_limit(&self, socket: u32) -> Result<u32> {
        self.check_socket(socket)?;
        let response = self.mailbox()?.submit(
            MailboxRequest::new(HsmpMessageId::GetCclkThrottleLimit, socket).response_words(1),
        )?;
        Ok(response.word(0))
    }

    pub fn current_freq_limit(&self, socket: u32) -> Result<FrequencyLimit> {
        self.check_socket(socket)?;
        let response = self.mailbox()?.submit(
            MailboxRequest::new(HsmpMessageId::GetSocketFreqLimit, socket).response_words(1),
        )?;
        let limit = FreqLimit::from_raw(response.word(0));

        Ok(FrequencyLimit {
            freq_mhz: limit.freq_mhz,
            sources: FreqLimitSource::from_mask(limit.source_mask),
        })
    }

    pub fn socket_freq_range(&self, socket: u32) -> Result<FreqRange> {
        self.check_socket(socket)?;
        let response = self.mailbox()?.submit(
            MailboxRequest::new(HsmpMessageId::GetSocketFmaxFmin, socket).response_words(1),
        )?;
        Ok(FreqRange::from_raw(response.word(0)))
    }
}
