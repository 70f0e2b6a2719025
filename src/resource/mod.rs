//! Resource lookup
//!
//! Candidates for chaos actions are resolved through a [`ResourceFetcher`].
//! The production fetcher, [`ResourceGraph`], forwards the filter expression to
//! Azure Resource Graph untouched and returns the matching rows.

mod fetcher;
mod graph;

pub use fetcher::{ResourceDescriptor, ResourceFetcher};
pub use graph::{build_query, ResourceGraph, RESOURCE_GRAPH_API_VERSION};

/// Resource type tag of Azure virtual machines
pub const RES_TYPE_VM: &str = "Microsoft.Compute/virtualMachines";
