use crate::domain::model::MatrixSize;
use crate::utils::error::{Result, UartError};

pub trait Validate {
    fn validate(&self) -> Result<()>;
}

pub const TCP_PORT_PREFIX: &str = "tcp://";

/// 序列埠名稱，或 `tcp://host:port` 形式的橋接位址
pub fn validate_port_name(field_name: &str, port: &str) -> Result<()> {
    validate_non_empty_string(field_name, port)?;

    if port.contains('\0') {
        return Err(UartError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: port.to_string(),
            reason: "Port name contains null bytes".to_string(),
        });
    }

    if let Some(address) = port.strip_prefix(TCP_PORT_PREFIX) {
        let valid = address
            .rsplit_once(':')
            .map(|(host, tcp_port)| !host.is_empty() && tcp_port.parse::<u16>().is_ok())
            .unwrap_or(false);
        if !valid {
            return Err(UartError::InvalidConfigValueError {
                field: field_name.to_string(),
                value: port.to_string(),
                reason: "TCP bridge must look like tcp://host:port".to_string(),
            });
        }
    }

    Ok(())
}

pub fn validate_path(field_name: &str, path: &str) -> Result<()> {
    if path.is_empty() {
        return Err(UartError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: path.to_string(),
            reason: "Path cannot be empty".to_string(),
        });
    }

    if path.contains('\0') {
        return Err(UartError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: path.to_string(),
            reason: "Path contains null bytes".to_string(),
        });
    }

    Ok(())
}

pub fn validate_positive_number(field_name: &str, value: usize, min_value: usize) -> Result<()> {
    if value < min_value {
        return Err(UartError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: format!("Value must be at least {}", min_value),
        });
    }
    Ok(())
}

pub fn validate_required_field<'a, T>(field_name: &str, value: &'a Option<T>) -> Result<&'a T> {
    value.as_ref().ok_or_else(|| UartError::MissingConfigError {
        field: field_name.to_string(),
    })
}

pub fn validate_non_empty_string(field_name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(UartError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: "Value cannot be empty or whitespace-only".to_string(),
        });
    }
    Ok(())
}

pub fn validate_range<T: PartialOrd + std::fmt::Display + Copy>(
    field_name: &str,
    value: T,
    min: T,
    max: T,
) -> Result<()> {
    if value < min || value > max {
        return Err(UartError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: format!("Value must be between {} and {}", min, max),
        });
    }
    Ok(())
}

/// 解析互動輸入的矩陣大小
pub fn parse_matrix_size(input: &str) -> Result<MatrixSize> {
    let trimmed = input.trim();
    let size: i64 = trimmed.parse().map_err(|_| UartError::InvalidInput {
        input: trimmed.to_string(),
    })?;
    MatrixSize::new(size)
}
