use crate::config::TransferSettings;
use crate::domain::ports::{PortOpener, SerialLink};
use crate::utils::error::{Result, UartError};
use crate::utils::validation::TCP_PORT_PREFIX;
use std::time::Duration;
use tokio::io::DuplexStream;
use tokio::net::TcpStream;
use tokio_serial::{
    ClearBuffer, DataBits, FlowControl, Parity, SerialPort, SerialPortBuilderExt,
    SerialPortType, SerialStream, StopBits,
};

impl SerialLink for SerialStream {
    fn discard_input(&mut self) -> Result<()> {
        self.clear(ClearBuffer::Input).map_err(std::io::Error::from)?;
        Ok(())
    }

    fn discard_output(&mut self) -> Result<()> {
        self.clear(ClearBuffer::Output).map_err(std::io::Error::from)?;
        Ok(())
    }
}

impl SerialLink for TcpStream {}

/// 記憶體內的管線，給模擬裝置使用
impl SerialLink for DuplexStream {}

impl SerialLink for Box<dyn SerialLink> {
    fn discard_input(&mut self) -> Result<()> {
        (**self).discard_input()
    }

    fn discard_output(&mut self) -> Result<()> {
        (**self).discard_output()
    }
}

/// 依名稱開啟實體序列埠 (8N1，無流量控制) 或 `tcp://host:port` 橋接
#[derive(Debug, Clone)]
pub struct DeviceOpener {
    port: String,
    baud_rate: u32,
    read_timeout: Duration,
}

impl DeviceOpener {
    pub fn new(port: impl Into<String>, baud_rate: u32, read_timeout: Duration) -> Self {
        Self {
            port: port.into(),
            baud_rate,
            read_timeout,
        }
    }

    pub fn from_settings(settings: &TransferSettings) -> Self {
        Self::new(settings.port.clone(), settings.baud_rate, settings.read_timeout)
    }

    pub fn is_tcp_bridge(&self) -> bool {
        self.port.starts_with(TCP_PORT_PREFIX)
    }

    fn unavailable(&self, reason: impl ToString) -> UartError {
        UartError::PortUnavailable {
            port: self.port.clone(),
            reason: reason.to_string(),
        }
    }

    fn open_serial(&self) -> Result<SerialStream> {
        tokio_serial::new(&self.port, self.baud_rate)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .flow_control(FlowControl::None)
            .timeout(self.read_timeout)
            .open_native_async()
            .map_err(|e| self.unavailable(e))
    }

    async fn open_tcp(&self, address: &str) -> Result<TcpStream> {
        let stream = TcpStream::connect(address)
            .await
            .map_err(|e| self.unavailable(e))?;
        stream.set_nodelay(true)?;
        Ok(stream)
    }
}

impl PortOpener for DeviceOpener {
    type Link = Box<dyn SerialLink>;

    fn port_name(&self) -> &str {
        &self.port
    }

    async fn open(&self) -> Result<Box<dyn SerialLink>> {
        match self.port.strip_prefix(TCP_PORT_PREFIX) {
            Some(address) => {
                tracing::debug!("Connecting to TCP bridge {}", address);
                Ok(Box::new(self.open_tcp(address).await?))
            }
            None => {
                tracing::debug!(
                    "Opening serial port {} ({} baud, read timeout {:?})",
                    self.port,
                    self.baud_rate,
                    self.read_timeout
                );
                Ok(Box::new(self.open_serial()?))
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortDescription {
    pub name: String,
    pub kind: String,
}

/// 列出系統上可用的序列埠
pub fn list_ports() -> Result<Vec<PortDescription>> {
    let ports = tokio_serial::available_ports().map_err(std::io::Error::from)?;
    Ok(ports
        .into_iter()
        .map(|info| {
            let kind = match info.port_type {
                SerialPortType::UsbPort(usb) => format!(
                    "USB {:04x}:{:04x}{}",
                    usb.vid,
                    usb.pid,
                    usb.product.map(|p| format!(" {}", p)).unwrap_or_default()
                ),
                SerialPortType::PciPort => "PCI".to_string(),
                SerialPortType::BluetoothPort => "Bluetooth".to_string(),
                SerialPortType::Unknown => "unknown".to_string(),
            };
            PortDescription {
                name: info.port_name,
                kind,
            }
        })
        .collect())
}
