pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::cli::CliConfig;

pub use config::serial::DeviceOpener;
pub use config::TransferSettings;
pub use crate::core::{
    engine::MatmulEngine, generator::MatrixGenerator, probe::AdderProbe, session::SerialSession,
};
pub use utils::error::{Result, UartError};
