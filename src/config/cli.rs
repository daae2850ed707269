use crate::config::toml_config::TomlConfig;
use crate::config::TransferSettings;
use crate::domain::model::WordWidth;
use crate::utils::error::Result;
use crate::utils::validation::Validate;
use clap::{Parser, ValueEnum};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum LogFormat {
    #[default]
    Compact,
    Json,
}

#[derive(Debug, Clone, Parser)]
#[command(name = "uart-matmul")]
#[command(about = "Send random test matrices to the FPGA multiplier over UART and read back the product")]
pub struct CliConfig {
    /// Matrix size N (2-10); prompts interactively when omitted
    #[arg(short, long, allow_negative_numbers = true)]
    pub size: Option<i64>,

    /// Serial port (COM3, /dev/ttyUSB0) or tcp://host:port bridge
    #[arg(short, long)]
    pub port: Option<String>,

    #[arg(long)]
    pub baud: Option<u32>,

    /// Result width returned by the device: 8bit or 16bit
    #[arg(long)]
    pub mode: Option<WordWidth>,

    /// Pause after the size header
    #[arg(long)]
    pub settle_ms: Option<u64>,

    /// Pause after every matrix byte
    #[arg(long)]
    pub byte_delay_ms: Option<u64>,

    /// Overall deadline for the response
    #[arg(long)]
    pub deadline_ms: Option<u64>,

    /// Give up when no byte arrives for this long
    #[arg(long)]
    pub byte_timeout_ms: Option<u64>,

    #[arg(long)]
    pub read_timeout_ms: Option<u64>,

    /// Seed for reproducible test matrices
    #[arg(long)]
    pub seed: Option<u64>,

    /// Compare the device result with A×B computed on the host
    #[arg(long)]
    pub verify: bool,

    /// Print the timing report
    #[arg(long)]
    pub timing: bool,

    /// Write the session report as JSON to this path
    #[arg(long)]
    pub report: Option<String>,

    /// Path to TOML configuration file
    #[arg(short, long)]
    pub config: Option<String>,

    /// List available serial ports and exit
    #[arg(long)]
    pub list_ports: bool,

    #[arg(long, value_enum, default_value_t = LogFormat::Compact)]
    pub log_format: LogFormat,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,
}

impl CliConfig {
    /// 預設值 → TOML 檔 → 命令列
    pub fn resolve_settings(&self) -> Result<TransferSettings> {
        let mut settings = match &self.config {
            Some(path) => {
                tracing::info!("📁 Loading configuration from: {}", path);
                let file = TomlConfig::from_file(path)?;
                file.validate()?;
                file.to_settings_with_mode(self.mode)?
            }
            None => TransferSettings::default(),
        };

        self.apply_overrides(&mut settings);
        settings.validate()?;
        Ok(settings)
    }

    pub fn apply_overrides(&self, settings: &mut TransferSettings) {
        if let Some(mode) = self.mode {
            settings.set_word_width(mode);
        }
        if let Some(port) = &self.port {
            settings.port = port.clone();
        }
        if let Some(baud) = self.baud {
            settings.baud_rate = baud;
        }
        if let Some(ms) = self.read_timeout_ms {
            settings.read_timeout = Duration::from_millis(ms);
        }
        if let Some(ms) = self.settle_ms {
            settings.settle_delay = Duration::from_millis(ms);
        }
        if let Some(ms) = self.byte_delay_ms {
            settings.byte_delay = Duration::from_millis(ms);
        }
        if let Some(ms) = self.deadline_ms {
            settings.receive_policy.deadline = Some(Duration::from_millis(ms));
        }
        if let Some(ms) = self.byte_timeout_ms {
            settings.receive_policy.byte_timeout = Some(Duration::from_millis(ms));
        }
        if self.seed.is_some() {
            settings.seed = self.seed;
        }
        if self.report.is_some() {
            settings.report_path = self.report.clone();
        }
        settings.verify |= self.verify;
        settings.timing |= self.timing;
    }

    /// 命令列優先，其次是設定檔中的 size
    pub fn requested_size(&self, settings: &TransferSettings) -> Option<i64> {
        self.size.or(settings.size.map(i64::from))
    }
}
