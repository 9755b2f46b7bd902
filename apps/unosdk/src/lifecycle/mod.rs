//! Lifecycle operations on top of the inventory and environment layers.
//!
//! ## Module Structure
//!
//! - [`orchestrator`] - Install, switch and uninstall
//! - [`layout`] - PATH directories and home variables per toolchain kind
//! - [`health`] - Consistency checks for `doctor`

pub mod health;
pub mod layout;
pub mod orchestrator;

pub use orchestrator::{EnvironmentReport, InstallOptions, Orchestrator, is_active};
