//! chaosvm
//!
//! Chaos actions against Azure virtual machines. Candidates come from an Azure
//! Resource Graph query; delete, stop and restart hit one of them at random,
//! start brings back every stopped one.
//!
//! # Example
//!
//! ```ignore
//! use chaosvm::{Configuration, Secrets};
//!
//! let configuration = Configuration::new("my-subscription");
//! let secrets = Secrets::from_env()?;
//! chaosvm::stop_machine(Some("where resourceGroup=~'chaos-rg'"), &configuration, &secrets).await?;
//! ```

pub mod azure;
pub mod config;
pub mod error;
pub mod machine;
pub mod resource;

pub use config::{Configuration, Secrets};
pub use error::{ChaosError, ConfigError};
pub use machine::{delete_machine, restart_machine, start_machine, stop_machine};
