//! Virtual machine chaos actions
//!
//! - [`actions`] - delete, stop, restart and start dispatch
//! - [`select`] - injectable random choice
//! - [`status`] - power state parsing for the start path

pub mod actions;
pub mod select;
pub mod status;

pub use actions::{
    delete_machine, restart_machine, start_machine, stop_machine, AzureMachineActions,
    MachineAction, MachineActions,
};
pub use select::{RandomSource, SeededRandom, ThreadRandom};
pub use status::InstanceStatus;
