use esmi_raw::hsmp::layout::{SmuVersion, SocketTemperature};
use esmi_raw::{HsmpMessageId, RegisterLayout};

use crate::error::{EsmiError, Result};
use crate::host::HostOs;
use crate::mailbox::MailboxRequest;
use crate::state::Esmi;

/// Data fabric and memory clocks of a socket
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClockFrequencies {
    pub fclk_mhz: u32,
    pub mclk_mhz: u32,
}

impl<H: HostOs> Esmi<H> {
    fn socket_query(&self, id: HsmpMessageId, socket: u32, words: usize) -> Result<[u32; 2]> {
        self.check_socket(socket)?;
        let response = self
            .mailbox()?
            .submit(MailboxRequest::new(id, socket).response_words(words))?;
        Ok([response.word(0), response.word(1)])
    }

    /// Loop-back test: firmware must answer `value + 1`
    pub fn test_mailbox(&self, socket: u32, value: u32) -> Result<u32> {
        self.check_socket(socket)?;
        let response = self.mailbox()?.submit(
            MailboxRequest::new(HsmpMessageId::Test, socket)
                .arg(value)
                .response_words(1),
        )?;

        let expected = value.wrapping_add(1);
        let actual = response.word(0);
        if actual != expected {
            tracing::warn!("Socket {socket} loop-back returned {actual}, expected {expected}");
            return Err(EsmiError::LoopbackMismatch { expected, actual });
        }
        Ok(actual)
    }

    pub fn smu_firmware_version(&self, socket: u32) -> Result<SmuVersion> {
        let [word, _] = self.socket_query(HsmpMessageId::GetSmuVersion, socket, 1)?;
        Ok(SmuVersion::from_raw(word))
    }

    /// True while PROCHOT is asserted on the socket
    pub fn prochot_status(&self, socket: u32) -> Result<bool> {
        let [word, _] = self.socket_query(HsmpMessageId::GetProcHot, socket, 1)?;
        Ok(word & 0x1 != 0)
    }

    pub fn fclk_mclk(&self, socket: u32) -> Result<ClockFrequencies> {
        let [fclk_mhz, mclk_mhz] = self.socket_query(HsmpMessageId::GetFclkMclk, socket, 2)?;
        Ok(ClockFrequencies { fclk_mhz, mclk_mhz })
    }

    /// Average C0 residency across the socket's cores, in percent
    pub fn c0_residency(&self, socket: u32) -> Result<u32> {
        let [word, _] = self.socket_query(HsmpMessageId::GetC0Percent, socket, 1)?;
        Ok(word)
    }

    /// Socket temperature in millidegrees Celsius
    pub fn socket_temperature(&self, socket: u32) -> Result<u32> {
        let [word, _] = self.socket_query(HsmpMessageId::GetTempMonitor, socket, 1)?;
        Ok(SocketTemperature::from_raw(word).millidegrees())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::testing::genoa;
    use crate::error::EsmiStatus;

    #[test]
    fn test_loopback() {
        let esmi = genoa(|host| host);
        assert_eq!(esmi.test_mailbox(0, 41).unwrap(), 42);

        let sent = esmi.host().commands();
        assert_eq!(sent[0].msg_id, HsmpMessageId::Test.id());
        assert_eq!(sent[0].args[0], 41);
    }

    #[test]
    fn test_loopback_mismatch_is_reported() {
        let esmi = genoa(|mut host| {
            host.loopback_offset = 2;
            host
        });

        let err = esmi.test_mailbox(1, 41).unwrap_err();
        assert!(matches!(
            err,
            EsmiError::LoopbackMismatch {
                expected: 42,
                actual: 43
            }
        ));
        assert_eq!(err.status(), EsmiStatus::IoError);
    }

    #[test]
    fn test_socket_queries() {
        // 54 degrees + 5/8
        let temp = (54 << 21) | (5 << 18);
        let esmi = genoa(|host| {
            host.respond(HsmpMessageId::GetSmuVersion, &[0x0045_3A02])
                .respond(HsmpMessageId::GetProcHot, &[1])
                .respond(HsmpMessageId::GetFclkMclk, &[1600, 2400])
                .respond(HsmpMessageId::GetC0Percent, &[37])
                .respond(HsmpMessageId::GetTempMonitor, &[temp])
        });

        let smu = esmi.smu_firmware_version(0).unwrap();
        assert_eq!((smu.major, smu.minor, smu.debug), (0x45, 0x3A, 0x02));
        assert!(esmi.prochot_status(0).unwrap());
        assert_eq!(
            esmi.fclk_mclk(1).unwrap(),
            ClockFrequencies {
                fclk_mhz: 1600,
                mclk_mhz: 2400
            }
        );
        assert_eq!(esmi.c0_residency(0).unwrap(), 37);
        assert_eq!(esmi.socket_temperature(0).unwrap(), 54_625);
    }
}
