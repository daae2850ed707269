#[cfg(feature = "cli")]
pub mod cli;
pub mod serial;
pub mod toml_config;

use crate::domain::model::{MatrixSize, WordWidth};
use crate::domain::ports::{ConfigProvider, ReceivePolicy};
use crate::utils::error::{Result, UartError};
use crate::utils::validation::{self, Validate};
use std::time::Duration;

pub const DEFAULT_BAUD_RATE: u32 = 9600;
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_millis(500);
pub const DEFAULT_BYTE_DELAY: Duration = Duration::from_millis(100);
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(1);
pub const DEFAULT_RECEIVE_DEADLINE: Duration = Duration::from_secs(10);
pub const DEFAULT_WORD_BYTE_TIMEOUT: Duration = Duration::from_secs(5);

#[cfg(windows)]
pub const DEFAULT_PORT: &str = "COM3";
#[cfg(not(windows))]
pub const DEFAULT_PORT: &str = "/dev/ttyUSB0";

/// 合併預設值、TOML 與命令列之後的最終設定
#[derive(Debug, Clone, PartialEq)]
pub struct TransferSettings {
    pub port: String,
    pub baud_rate: u32,
    pub read_timeout: Duration,
    pub word_width: WordWidth,
    pub settle_delay: Duration,
    pub byte_delay: Duration,
    pub receive_policy: ReceivePolicy,
    pub size: Option<u8>,
    pub seed: Option<u64>,
    pub verify: bool,
    pub timing: bool,
    pub report_path: Option<String>,
}

impl TransferSettings {
    pub fn default_policy(width: WordWidth) -> ReceivePolicy {
        match width {
            WordWidth::Byte => ReceivePolicy::overall(DEFAULT_RECEIVE_DEADLINE),
            WordWidth::Word => ReceivePolicy::per_byte(DEFAULT_WORD_BYTE_TIMEOUT),
        }
    }

    /// 切換模式時一併換成該模式的預設接收策略
    pub fn set_word_width(&mut self, width: WordWidth) {
        if self.word_width != width {
            self.word_width = width;
            self.receive_policy = Self::default_policy(width);
        }
    }

    pub fn matrix_size(&self) -> Option<Result<MatrixSize>> {
        self.size.map(|s| MatrixSize::new(s as i64))
    }
}

impl Default for TransferSettings {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT.to_string(),
            baud_rate: DEFAULT_BAUD_RATE,
            read_timeout: DEFAULT_READ_TIMEOUT,
            word_width: WordWidth::Byte,
            settle_delay: DEFAULT_SETTLE_DELAY,
            byte_delay: DEFAULT_BYTE_DELAY,
            receive_policy: Self::default_policy(WordWidth::Byte),
            size: None,
            seed: None,
            verify: false,
            timing: false,
            report_path: None,
        }
    }
}

impl ConfigProvider for TransferSettings {
    fn port_name(&self) -> &str {
        &self.port
    }

    fn baud_rate(&self) -> u32 {
        self.baud_rate
    }

    fn word_width(&self) -> WordWidth {
        self.word_width
    }

    fn settle_delay(&self) -> Duration {
        self.settle_delay
    }

    fn byte_delay(&self) -> Duration {
        self.byte_delay
    }

    fn receive_policy(&self) -> ReceivePolicy {
        self.receive_policy
    }
}

impl Validate for TransferSettings {
    fn validate(&self) -> Result<()> {
        validation::validate_port_name("port", &self.port)?;
        validation::validate_positive_number("baud_rate", self.baud_rate as usize, 1)?;

        if !self.receive_policy.is_bounded() {
            return Err(UartError::ConfigValidationError {
                field: "timing".to_string(),
                message: "set receive_deadline_ms or byte_timeout_ms, otherwise reception never ends"
                    .to_string(),
            });
        }

        if let Some(size) = self.size {
            validation::validate_range("transfer.size", size, 2, 10)?;
        }

        if let Some(path) = &self.report_path {
            validation::validate_path("report.output", path)?;
        }

        Ok(())
    }
}
