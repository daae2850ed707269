use crate::domain::model::{ProbeOutcome, ProbeReport};
use crate::domain::ports::{PortOpener, SerialLink};
use crate::utils::error::{Result, UartError};
use rand::Rng;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::time::{sleep, timeout};

/// 兩個運算元都必須小於 30
pub const MAX_OPERAND: u8 = 29;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeSettings {
    /// 每送出一個運算元後等待 FPGA 閃燈確認
    pub ack_delay: Duration,
    pub read_timeout: Duration,
}

impl Default for ProbeSettings {
    fn default() -> Self {
        Self {
            ack_delay: Duration::from_secs(5),
            read_timeout: Duration::from_secs(1),
        }
    }
}

pub fn random_operands() -> (u8, u8) {
    let mut rng = rand::rng();
    (
        rng.random_range(0..=MAX_OPERAND),
        rng.random_range(0..=MAX_OPERAND),
    )
}

/// UART 連線的冒煙測試：送兩個數字，讀回一個位元組的和
pub struct AdderProbe<O: PortOpener> {
    opener: O,
    settings: ProbeSettings,
}

impl<O: PortOpener> AdderProbe<O> {
    pub fn new(opener: O, settings: ProbeSettings) -> Self {
        Self { opener, settings }
    }

    pub async fn run(&self, first: u8, second: u8) -> Result<ProbeReport> {
        for (field, value) in [("first", first), ("second", second)] {
            if value > MAX_OPERAND {
                return Err(UartError::InvalidConfigValueError {
                    field: field.to_string(),
                    value: value.to_string(),
                    reason: format!("Operand must be between 0 and {}", MAX_OPERAND),
                });
            }
        }

        let mut link = self.opener.open().await?;
        let outcome = self.exchange(&mut link, first, second).await;

        if let Err(e) = link.shutdown().await {
            tracing::debug!("Shutdown of {} failed: {}", self.opener.port_name(), e);
        }
        drop(link);

        Ok(ProbeReport {
            first,
            second,
            outcome: outcome?,
        })
    }

    async fn exchange(&self, link: &mut O::Link, first: u8, second: u8) -> Result<ProbeOutcome> {
        link.discard_input()?;
        link.discard_output()?;

        println!("Sending num1: {}", first);
        link.write_all(&[first]).await?;
        link.flush().await?;
        sleep(self.settings.ack_delay).await;

        link.discard_input()?;
        println!("Sending num2: {}", second);
        link.write_all(&[second]).await?;
        link.flush().await?;
        sleep(self.settings.ack_delay).await;

        println!("Waiting for result...");
        let mut buf = [0u8; 1];
        match timeout(self.settings.read_timeout, link.read(&mut buf)).await {
            Ok(Ok(1)) => {
                tracing::debug!("Probe result byte: {}", buf[0]);
                Ok(ProbeOutcome::Result(buf[0]))
            }
            Ok(Ok(_)) | Err(_) => Ok(ProbeOutcome::NoResponse),
            Ok(Err(e)) => Err(UartError::IoError(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::DuplexStream;

    struct DuplexOpener {
        link: std::sync::Mutex<Option<DuplexStream>>,
    }

    impl PortOpener for DuplexOpener {
        type Link = DuplexStream;

        fn port_name(&self) -> &str {
            "duplex"
        }

        async fn open(&self) -> Result<DuplexStream> {
            self.link
                .lock()
                .unwrap()
                .take()
                .ok_or_else(|| UartError::PortUnavailable {
                    port: "duplex".to_string(),
                    reason: "already opened".to_string(),
                })
        }
    }

    fn probe_with_device() -> (AdderProbe<DuplexOpener>, DuplexStream) {
        let (host, device) = tokio::io::duplex(16);
        let probe = AdderProbe::new(
            DuplexOpener {
                link: std::sync::Mutex::new(Some(host)),
            },
            ProbeSettings::default(),
        );
        (probe, device)
    }

    #[tokio::test(start_paused = true)]
    async fn test_adder_round_trip() {
        let (probe, mut device) = probe_with_device();
        let fpga = tokio::spawn(async move {
            let mut operands = [0u8; 2];
            device.read_exact(&mut operands).await.unwrap();
            device.write_all(&[operands[0] + operands[1]]).await.unwrap();
            device
        });

        let report = probe.run(12, 29).await.unwrap();
        assert_eq!(report.outcome, ProbeOutcome::Result(41));
        assert!(report.matches_sum());
        drop(fpga.await.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_silent_device_reports_no_response() {
        let (probe, device) = probe_with_device();

        let report = probe.run(1, 2).await.unwrap();
        assert_eq!(report.outcome, ProbeOutcome::NoResponse);
        drop(device);
    }

    #[tokio::test]
    async fn test_operand_out_of_range() {
        let (probe, _device) = probe_with_device();
        assert!(probe.run(30, 0).await.is_err());
    }

    #[test]
    fn test_random_operands_below_thirty() {
        for _ in 0..100 {
            let (a, b) = random_operands();
            assert!(a <= MAX_OPERAND && b <= MAX_OPERAND);
        }
    }
}
