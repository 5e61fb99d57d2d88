#![forbid(unsafe_code)]

pub mod bus;
pub mod config;
pub mod decode;
pub mod error;
pub mod execute;
pub mod fields;
pub mod hart;
pub mod instruction;
pub mod loader;
pub mod memory;
pub mod peripheral;
pub mod registers;
pub mod sim_control;
pub mod word;

pub use bus::SystemBus;
pub use config::MemoryMap;
pub use error::{BusError, ConfigError, DecodeError, HartFault};
pub use hart::{Hart, HartState};
pub use loader::LoaderError;
pub use registers::RegisterFile;
