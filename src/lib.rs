//! Resolve SSM-registered EC2 instances by name, hostname or IP address and
//! open an interactive session to them.

pub mod aws;
pub mod decode;
pub mod error;
pub mod inventory;
pub mod listing;
pub mod logging;
pub mod resolver;
pub mod session;

#[cfg(test)]
mod test_support;

pub use error::SsmError;
pub use inventory::{InstanceDirectory, InstanceRecord, InventorySource};
pub use logging::{Level, Logger};
