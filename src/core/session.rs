use crate::core::protocol;
use crate::domain::model::{Matrix, MatrixSize, TransferOutcome, WordWidth};
use crate::domain::ports::{ConfigProvider, MatrixTransfer, PortOpener, SerialLink};
use crate::utils::error::{Result, UartError};
use crate::utils::monitor::SessionTimer;
use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::time::{sleep, timeout_at, Instant};

/// 與 FPGA 的一次請求/回應交換：開埠、送 header 與兩個矩陣、等待結果、關埠
pub struct SerialSession<O: PortOpener, C: ConfigProvider> {
    opener: O,
    config: C,
}

impl<O: PortOpener, C: ConfigProvider> SerialSession<O, C> {
    pub fn new(opener: O, config: C) -> Self {
        Self { opener, config }
    }

    pub fn config(&self) -> &C {
        &self.config
    }

    async fn write_byte(link: &mut O::Link, value: u8) -> Result<()> {
        link.write_all(&[value]).await?;
        link.flush().await?;
        Ok(())
    }

    async fn send_request(
        &self,
        link: &mut O::Link,
        size: MatrixSize,
        a: &Matrix<u8>,
        b: &Matrix<u8>,
    ) -> Result<()> {
        let frame = protocol::encode_request(size, a, b);
        let (header, operands) = frame.split_at(1);

        tracing::info!("📤 Sending matrix size: {}", size);
        Self::write_byte(link, header[0]).await?;
        // 協定沒有 ACK，只能等 FPGA 自己鎖存 header
        sleep(self.config.settle_delay()).await;

        let byte_delay = self.config.byte_delay();
        for (label, matrix) in ["A", "B"].into_iter().zip(operands.chunks(size.cells())) {
            tracing::info!("📤 Sending Matrix {} ({} values)", label, matrix.len());
            for &value in matrix {
                tracing::info!("Sending value: {}", value);
                Self::write_byte(link, value).await?;
                sleep(byte_delay).await;
            }
        }

        Ok(())
    }

    async fn receive_response(&self, link: &mut O::Link, expected: usize) -> Result<Vec<u8>> {
        let policy = self.config.receive_policy();
        if !policy.is_bounded() {
            return Err(UartError::ConfigValidationError {
                field: "timing".to_string(),
                message: "receive needs a deadline or a per-byte timeout".to_string(),
            });
        }

        let deadline = policy.deadline.map(|d| Instant::now() + d);
        let mut received = Vec::with_capacity(expected);
        let mut chunk = vec![0u8; expected];

        while received.len() < expected {
            let now = Instant::now();
            if deadline.is_some_and(|d| now >= d) {
                tracing::warn!("⏰ Receive deadline reached after {} bytes", received.len());
                break;
            }

            let wait_until = [deadline, policy.byte_timeout.map(|t| now + t)]
                .into_iter()
                .flatten()
                .min()
                .unwrap_or(now);

            // 只讀剩餘需要的量，多出的位元組留在通道內
            let remaining = expected - received.len();
            match timeout_at(wait_until, link.read(&mut chunk[..remaining])).await {
                Ok(Ok(0)) => {
                    tracing::warn!("🔌 Link closed after {} bytes", received.len());
                    break;
                }
                Ok(Ok(n)) => {
                    for &value in &chunk[..n] {
                        received.push(value);
                        tracing::info!("Received byte {}/{}: {}", received.len(), expected, value);
                    }
                }
                Ok(Err(e)) => return Err(UartError::IoError(e)),
                Err(_) => {
                    tracing::warn!(
                        "⏰ Timeout or no data received at byte {}",
                        received.len() + 1
                    );
                    break;
                }
            }
        }

        Ok(received)
    }

    async fn exchange(
        &self,
        link: &mut O::Link,
        size: MatrixSize,
        a: &Matrix<u8>,
        b: &Matrix<u8>,
        timer: &mut SessionTimer,
    ) -> Result<TransferOutcome> {
        link.discard_input()?;
        self.send_request(link, size, a, b).await?;
        timer.log_stats("Send phase");

        let width = self.config.word_width();
        let expected = protocol::response_len(size, width);
        tracing::info!("📥 Receiving result matrix ({} bytes expected)...", expected);

        timer.mark_receive_start();
        let received = self.receive_response(link, expected).await;
        timer.mark_receive_end();

        let bytes = received?;
        if width == WordWidth::Word {
            tracing::debug!("8-bit bytes received: {:?}", bytes);
        }
        Ok(protocol::assemble_response(size, width, bytes))
    }
}

#[async_trait]
impl<O: PortOpener, C: ConfigProvider> MatrixTransfer for SerialSession<O, C> {
    fn port_name(&self) -> &str {
        self.opener.port_name()
    }

    fn word_width(&self) -> WordWidth {
        self.config.word_width()
    }

    async fn transfer(
        &self,
        a: &Matrix<u8>,
        b: &Matrix<u8>,
        timer: &mut SessionTimer,
    ) -> Result<TransferOutcome> {
        let size = MatrixSize::new(a.size() as i64)?;
        if b.size() != a.size() {
            return Err(UartError::ConfigValidationError {
                field: "matrix_b".to_string(),
                message: format!("expected {}x{}, got {}x{}", a.size(), a.size(), b.size(), b.size()),
            });
        }

        let mut link = self.opener.open().await?;
        tracing::info!(
            "🔌 Opened {} at {} baud",
            self.opener.port_name(),
            self.config.baud_rate()
        );

        let outcome = self.exchange(&mut link, size, a, b, timer).await;

        // 任何結果都要釋放埠
        if let Err(e) = link.shutdown().await {
            tracing::debug!("Shutdown of {} failed: {}", self.opener.port_name(), e);
        }
        drop(link);
        tracing::info!("🔌 Closed {}", self.opener.port_name());

        outcome
    }
}
