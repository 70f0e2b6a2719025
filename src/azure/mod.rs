//! Azure API interaction module
//!
//! # Module Structure
//!
//! - [`auth`] - token acquisition and the scoped credential
//! - [`client`] - compute client and the [`VirtualMachines`](client::VirtualMachines) seam
//! - [`http`] - HTTP utilities for REST API calls
//!
//! # Example
//!
//! ```ignore
//! use chaosvm::azure::{AzureAuthenticator, AzureClientProvider, AzureHttpClient};
//!
//! let http = AzureHttpClient::new()?;
//! let provider = AzureClientProvider::new(http.clone(), AzureAuthenticator::new(http));
//! let client = provider.client(&secrets, &configuration).await?;
//! client.power_off("rg1", "vm-a").await?;
//! ```

pub mod auth;
pub mod client;
pub mod http;

pub use auth::{Authenticator, AzureAuthenticator, CredentialScope};
pub use client::{AzureClientProvider, ClientProvider, ComputeClient, VirtualMachines};
pub use http::{format_azure_error, AzureHttpClient};
