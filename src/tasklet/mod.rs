//! Ethernet bootstrap tasklet
//!
//! Bridges the lifecycle events of an IPv6 network stack to a connect /
//! disconnect API with a single connectivity callback. The tasklet is a
//! passive reactor: everything past `connect` happens inside the event handler
//! it registers with the dispatcher.

use std::time::Duration;

pub mod dispatcher;
pub mod enet;
pub mod stack;
pub mod types;

#[cfg(test)]
pub(crate) mod testing;

pub use dispatcher::{EventDispatcher, EventHandler};
pub use enet::EnetTasklet;
pub use stack::NetworkStack;
pub use types::{StatusCallback, TaskletData, TaskletState};

/// Name the tasklet registers its handler under
pub const TASKLET_NAME: &str = "enet_tasklet";

/// Default interface name handed to the stack
pub const INTERFACE_NAME: &str = "eth0";

/// Longest textual IPv6 address (39) plus a terminator
pub const MIN_ADDRESS_BUFFER_LEN: usize = 40;

/// Fixed delay between failed bootstrap attempts
pub const BOOTSTRAP_RETRY_DELAY: Duration = Duration::from_millis(5000);
