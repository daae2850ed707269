use crate::config::TransferSettings;
use crate::domain::model::WordWidth;
use crate::utils::error::{Result, UartError};
use crate::utils::validation::{self, Validate};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::OnceLock;
use std::time::Duration;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TomlConfig {
    pub port: Option<PortConfig>,
    pub timing: Option<TimingConfig>,
    pub transfer: Option<TransferConfig>,
    pub report: Option<ReportConfig>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PortConfig {
    pub path: Option<String>,
    pub baud_rate: Option<u32>,
    pub read_timeout_ms: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TimingConfig {
    pub settle_ms: Option<u64>,
    pub byte_delay_ms: Option<u64>,
    pub receive_deadline_ms: Option<u64>,
    pub byte_timeout_ms: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TransferConfig {
    pub mode: Option<String>,
    pub size: Option<u8>,
    pub seed: Option<u64>,
    pub verify: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReportConfig {
    pub timing: Option<bool>,
    pub save: Option<bool>,
    pub output: Option<String>,
}

impl TomlConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(UartError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content);

        toml::from_str(&processed_content).map_err(|e| UartError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${UART_PORT})，未設定的保持原樣
    fn substitute_env_vars(content: &str) -> String {
        static ENV_VAR: OnceLock<regex::Regex> = OnceLock::new();
        let re = ENV_VAR.get_or_init(|| {
            regex::Regex::new(r"\$\{([^}]+)\}").expect("env var pattern is valid")
        });

        re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        })
        .to_string()
    }

    pub fn word_width(&self) -> Result<Option<WordWidth>> {
        let Some(mode) = self.transfer.as_ref().and_then(|t| t.mode.as_deref()) else {
            return Ok(None);
        };
        mode.parse()
            .map(Some)
            .map_err(|reason| UartError::InvalidConfigValueError {
                field: "transfer.mode".to_string(),
                value: mode.to_string(),
                reason,
            })
    }

    /// 把檔案內容疊加到既有設定上
    pub fn apply_to(&self, settings: &mut TransferSettings) -> Result<()> {
        // 先套用模式，後面的 timing 才會覆蓋該模式的預設值
        if let Some(width) = self.word_width()? {
            settings.set_word_width(width);
        }
        self.apply_fields(settings);
        Ok(())
    }

    /// 模式以外的欄位，模式必須已經決定好
    fn apply_fields(&self, settings: &mut TransferSettings) {
        if let Some(port) = &self.port {
            if let Some(path) = &port.path {
                settings.port = path.clone();
            }
            if let Some(baud) = port.baud_rate {
                settings.baud_rate = baud;
            }
            if let Some(ms) = port.read_timeout_ms {
                settings.read_timeout = Duration::from_millis(ms);
            }
        }

        if let Some(timing) = &self.timing {
            if let Some(ms) = timing.settle_ms {
                settings.settle_delay = Duration::from_millis(ms);
            }
            if let Some(ms) = timing.byte_delay_ms {
                settings.byte_delay = Duration::from_millis(ms);
            }
            if let Some(ms) = timing.receive_deadline_ms {
                settings.receive_policy.deadline = Some(Duration::from_millis(ms));
            }
            if let Some(ms) = timing.byte_timeout_ms {
                settings.receive_policy.byte_timeout = Some(Duration::from_millis(ms));
            }
        }

        if let Some(transfer) = &self.transfer {
            if transfer.size.is_some() {
                settings.size = transfer.size;
            }
            if transfer.seed.is_some() {
                settings.seed = transfer.seed;
            }
            if let Some(verify) = transfer.verify {
                settings.verify = verify;
            }
        }

        if let Some(report) = &self.report {
            if let Some(timing) = report.timing {
                settings.timing = timing;
            }
            if report.output.is_some() {
                settings.report_path = report.output.clone();
            }
        }
    }

    pub fn to_settings(&self) -> Result<TransferSettings> {
        self.to_settings_with_mode(None)
    }

    /// 命令列指定的模式優先於檔案中的 mode，檔案的 timing 疊加在最終模式的預設策略上
    pub fn to_settings_with_mode(&self, mode: Option<WordWidth>) -> Result<TransferSettings> {
        let file_mode = self.word_width()?;
        let mut settings = TransferSettings::default();
        settings.set_word_width(mode.or(file_mode).unwrap_or(WordWidth::Byte));
        self.apply_fields(&mut settings);
        Ok(settings)
    }

    /// 驗證配置的合理性
    pub fn validate_config(&self) -> Result<()> {
        self.word_width()?;

        if let Some(path) = self.port.as_ref().and_then(|p| p.path.as_deref()) {
            validation::validate_port_name("port.path", path)?;
        }

        if let Some(baud) = self.port.as_ref().and_then(|p| p.baud_rate) {
            validation::validate_positive_number("port.baud_rate", baud as usize, 1)?;
        }

        if let Some(size) = self.transfer.as_ref().and_then(|t| t.size) {
            validation::validate_range("transfer.size", size, 2, 10)?;
        }

        if let Some(report) = &self.report {
            if report.save.unwrap_or(false) {
                let output = validation::validate_required_field("report.output", &report.output)?;
                validation::validate_path("report.output", output)?;
            }
        }

        Ok(())
    }
}

impl Validate for TomlConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::ReceivePolicy;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_parse_basic_toml_config() {
        let toml_content = r#"
[port]
path = "COM4"
baud_rate = 115200

[timing]
settle_ms = 250
byte_delay_ms = 20

[transfer]
mode = "8bit"
size = 3
verify = true
"#;

        let config = TomlConfig::from_toml_str(toml_content).unwrap();
        assert!(config.validate().is_ok());

        let settings = config.to_settings().unwrap();
        assert_eq!(settings.port, "COM4");
        assert_eq!(settings.baud_rate, 115200);
        assert_eq!(settings.settle_delay, Duration::from_millis(250));
        assert_eq!(settings.byte_delay, Duration::from_millis(20));
        assert_eq!(settings.size, Some(3));
        assert!(settings.verify);
    }

    #[test]
    fn test_word_mode_then_timing_override() {
        let toml_content = r#"
[transfer]
mode = "16bit"

[timing]
receive_deadline_ms = 30000
"#;

        let settings = TomlConfig::from_toml_str(toml_content)
            .unwrap()
            .to_settings()
            .unwrap();
        assert_eq!(settings.word_width, WordWidth::Word);
        assert_eq!(
            settings.receive_policy,
            ReceivePolicy {
                deadline: Some(Duration::from_secs(30)),
                byte_timeout: Some(Duration::from_secs(5)),
            }
        );
    }

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("UART_MATMUL_TEST_PORT", "/dev/ttyACM1");

        let toml_content = r#"
[port]
path = "${UART_MATMUL_TEST_PORT}"
"#;

        let config = TomlConfig::from_toml_str(toml_content).unwrap();
        assert_eq!(
            config.port.unwrap().path.as_deref(),
            Some("/dev/ttyACM1")
        );

        std::env::remove_var("UART_MATMUL_TEST_PORT");
    }

    #[test]
    fn test_config_validation() {
        let bad_mode = TomlConfig::from_toml_str("[transfer]\nmode = \"32bit\"\n").unwrap();
        assert!(bad_mode.validate().is_err());

        let bad_size = TomlConfig::from_toml_str("[transfer]\nsize = 12\n").unwrap();
        assert!(bad_size.validate().is_err());

        let missing_output = TomlConfig::from_toml_str("[report]\nsave = true\n").unwrap();
        assert!(matches!(
            missing_output.validate(),
            Err(UartError::MissingConfigError { .. })
        ));
    }

    #[test]
    fn test_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();

        let toml_content = r#"
[port]
path = "tcp://127.0.0.1:7000"

[report]
timing = true
"#;

        temp_file.write_all(toml_content.as_bytes()).unwrap();

        let settings = TomlConfig::from_file(temp_file.path())
            .unwrap()
            .to_settings()
            .unwrap();
        assert_eq!(settings.port, "tcp://127.0.0.1:7000");
        assert!(settings.timing);
    }
}
