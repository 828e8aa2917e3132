//! `fleet-domain`: shared configuration, error and trace types for the fleet SDK.

pub mod config;
pub mod error;
pub mod trace;

pub use config::SdkConfig;
pub use error::{Error, Result};
