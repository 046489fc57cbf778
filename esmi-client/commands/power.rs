use esmi_raw::HsmpMessageId;

use crate::error::{EsmiError, Result};
use crate::host::HostOs;
use crate::mailbox::MailboxRequest;
use crate::state::Esmi;

/// Result of a power cap request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PowerCapUpdate {
    pub requested_mw: u32,
    /// Value actually submitted, clamped to the socket maximum
    pub effective_mw: u32,
}

impl PowerCapUpdate {
    pub fn clamped(&self) -> bool {
        self.effective_mw != self.requested_mw
    }
}

impl<H: HostOs> Esmi<H> {
    fn read_socket_word(&self, id: HsmpMessageId, socket: u32) -> Result<u32> {
        self.check_socket(socket)?;
        let response = self
            .mailbox()?
            .submit(MailboxRequest::new(id, socket).response_words(1))?;
        Ok(response.word(0))
    }

    /// Current socket power in milliwatts
    pub fn socket_power(&self, socket: u32) -> Result<u32> {
        self.read_socket_word(HsmpMessageId::GetSocketPower, socket)
    }

    pub fn power_cap(&self, socket: u32) -> Result<u32> {
        self.read_socket_word(HsmpMessageId::GetSocketPowerLimit, socket)
    }

    pub fn power_cap_max(&self, socket: u32) -> Result<u32> {
        self.read_socket_word(HsmpMessageId::GetSocketPowerLimitMax, socket)
    }

    /// SVI telemetry of all rails in milliwatts
    pub fn svi_rail_power(&self, socket: u32) -> Result<u32> {
        self.read_socket_word(HsmpMessageId::GetRailsSvi, socket)
    }

    /// Set the socket power cap, clamping to the firmware maximum
    pub fn set_power_cap(&self, socket: u32, cap_mw: u32) -> Result<PowerCapUpdate> {
        self.check_socket(socket)?;
        let mailbox = self.mailbox()?;
        mailbox.gate(HsmpMessageId::SetSocketPowerLimit)?;

        let max = self.power_cap_max(socket)?;
        let update = PowerCapUpdate {
            requested_mw: cap_mw,
            effective_mw: cap_mw.min(max),
        };
        if update.clamped() {
            tracing::info!(
                "Socket {socket}: power cap {cap_mw} mW exceeds max {max} mW, clamping"
            );
        }

        mailbox.submit(
            MailboxRequest::new(HsmpMessageId::SetSocketPowerLimit, socket)
                .arg(update.effective_mw),
        )?;
        Ok(update)
    }

    /// Set the power efficiency mode (platform-specific range)
    pub fn set_pwr_efficiency_mode(&self, socket: u32, mode: u8) -> Result<()> {
        self.check_socket(socket)?;
        let limit = self
            .limits_for(HsmpMessageId::SetPowerMode)?
            .max_efficiency_mode;
        if mode > limit {
            return Err(EsmiError::InvalidInput(format!(
                "efficiency mode {mode} exceeds platform maximum {limit}"
            )));
        }

        self.mailbox()?
            .submit(MailboxRequest::new(HsmpMessageId::SetPowerMode, socket).arg(mode as u32))?;
        Ok(())
    }

    /// Current power efficiency mode; needs protocol 6 or later
    pub fn pwr_efficiency_mode(&self, socket: u32) -> Result<u8> {
        const READ_MODE: u32 = 1 << 31;

        self.check_socket(socket)?;
        self.mailbox()?.gate(HsmpMessageId::SetPowerMode)?;
        if !self.protocol_version()?.can_read_power_mode() {
            return Err(EsmiError::UnsupportedCommand(HsmpMessageId::SetPowerMode));
        }

        let response = self.mailbox()?.submit(
            MailboxRequest::new(HsmpMessageId::SetPowerMode, socket)
                .arg(READ_MODE)
                .response_words(1),
        )?;
        Ok((response.word(0) & 0x7) as u8)
    }
}
