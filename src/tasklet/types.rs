//! Tasklet state record

use std::{fmt, sync::Arc};

use common::{ConnectionStatus, HandlerId, InterfaceId, INVALID_INTERFACE_ID};

/// Application listener notified about connectivity changes
pub type StatusCallback = Arc<dyn Fn(ConnectionStatus) + Send + Sync>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TaskletState {
    /// Record allocated, no handler registered yet
    Created,
    /// `connect` has run, waiting for the stack
    Initialized,
    BootstrapStarted,
    /// Last bootstrap attempt failed, a retry is scheduled
    BootstrapFailed,
    /// Interface is up with an address
    BootstrapReady,
}

/// The single state record of the tasklet. Reused across reconnects.
#[derive(Clone)]
pub struct TaskletData {
    pub callback: Option<StatusCallback>,
    pub state: TaskletState,
    /// Receiver id handed over by the dispatcher's init event, owns the
    /// retry timer
    pub node_main_tasklet_id: HandlerId,
    pub interface_id: InterfaceId,
    /// Handler id returned by the dispatcher on registration
    pub tasklet_id: HandlerId,
}

impl TaskletData {
    pub fn new() -> Self {
        Self {
            callback: None,
            state: TaskletState::Created,
            node_main_tasklet_id: 0,
            interface_id: INVALID_INTERFACE_ID,
            tasklet_id: 0,
        }
    }

    pub fn has_interface(&self) -> bool {
        self.interface_id != INVALID_INTERFACE_ID
    }
}

impl Default for TaskletData {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for TaskletData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskletData")
            .field("callback", &self.callback.is_some())
            .field("state", &self.state)
            .field("node_main_tasklet_id", &self.node_main_tasklet_id)
            .field("interface_id", &self.interface_id)
            .field("tasklet_id", &self.tasklet_id)
            .finish()
    }
}
