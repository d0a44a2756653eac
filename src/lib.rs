//! rollsafe: compliance document vault with a PIN-gated inspection mode.

pub mod cli;
pub mod config;
pub mod display;
pub mod error;
pub mod gate;
pub mod interactive;
pub mod location;
pub mod logging;
pub mod models;
pub mod operations;
pub mod pin;
pub mod search;
pub mod service;
pub mod status;
pub mod store;
pub mod utils;

// Re-export commonly used types
pub use error::{Result, RollSafeError};
pub use models::{Document, VaultState};
pub use operations::VaultOperations;
pub use store::VaultStore;
