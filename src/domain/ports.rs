use crate::domain::model::{Matrix, TransferOutcome, WordWidth};
use crate::utils::error::Result;
use crate::utils::monitor::SessionTimer;
use async_trait::async_trait;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};

/// 已開啟的位元組通道 (實體 UART、TCP 橋接或測試用的記憶體管線)
pub trait SerialLink: AsyncRead + AsyncWrite + Unpin + Send {
    /// 丟棄尚未讀取的輸入
    fn discard_input(&mut self) -> Result<()> {
        Ok(())
    }

    /// 丟棄尚未送出的輸出
    fn discard_output(&mut self) -> Result<()> {
        Ok(())
    }
}

pub trait PortOpener: Send + Sync {
    type Link: SerialLink;

    /// 埠的名稱，用於日誌與報告
    fn port_name(&self) -> &str;

    fn open(&self) -> impl std::future::Future<Output = Result<Self::Link>> + Send;
}

/// 接收階段的結束條件；至少要設定其中一個
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReceivePolicy {
    pub deadline: Option<Duration>,
    pub byte_timeout: Option<Duration>,
}

impl ReceivePolicy {
    pub fn overall(deadline: Duration) -> Self {
        Self {
            deadline: Some(deadline),
            byte_timeout: None,
        }
    }

    pub fn per_byte(byte_timeout: Duration) -> Self {
        Self {
            deadline: None,
            byte_timeout: Some(byte_timeout),
        }
    }

    pub fn is_bounded(&self) -> bool {
        self.deadline.is_some() || self.byte_timeout.is_some()
    }
}

pub trait ConfigProvider: Send + Sync {
    fn port_name(&self) -> &str;
    fn baud_rate(&self) -> u32;
    fn word_width(&self) -> WordWidth;
    fn settle_delay(&self) -> Duration;
    fn byte_delay(&self) -> Duration;
    fn receive_policy(&self) -> ReceivePolicy;
}

#[async_trait]
pub trait MatrixTransfer: Send + Sync {
    fn port_name(&self) -> &str;
    fn word_width(&self) -> WordWidth;

    async fn transfer(
        &self,
        a: &Matrix<u8>,
        b: &Matrix<u8>,
        timer: &mut SessionTimer,
    ) -> Result<TransferOutcome>;
}
