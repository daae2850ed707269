pub mod engine;
pub mod generator;
pub mod probe;
pub mod protocol;
pub mod session;

pub use crate::domain::model::{Matrix, MatrixSize, TransferOutcome, WordWidth};
pub use crate::domain::ports::{ConfigProvider, MatrixTransfer, PortOpener, SerialLink};
pub use crate::utils::error::Result;
