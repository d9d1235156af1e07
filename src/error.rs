use thiserror::Error;

/// Failures surfaced by the bootstrap tasklet API.
///
/// Every variant maps to the status code the stack-facing API reports, see
/// [`TaskletError::code`]. Bootstrap failures are not errors: they only show up
/// as tasklet state and a scheduled retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TaskletError {
    #[error("tasklet has not been initialized")]
    NotInitialized,
    /// The dispatcher refused to register the handler. -1 means the handler
    /// name is taken, -2 means the dispatcher ran out of handler slots.
    #[error("event handler registration failed ({0})")]
    Registration(i8),
    #[error("no active network interface")]
    NoActiveInterface,
    #[error("address buffer of {len} bytes is too small")]
    BufferTooSmall { len: usize },
    #[error("no global IPv6 address assigned")]
    AddressUnavailable,
    #[error("ethernet MAC driver could not be created")]
    MacUnavailable,
    #[error("network stack call failed ({0})")]
    Stack(i8),
}

impl TaskletError {
    pub fn code(&self) -> i8 {
        match self {
            TaskletError::Registration(code) | TaskletError::Stack(code) => *code,
            _ => -1,
        }
    }
}

/// Collapse a tasklet result into the stack's status code convention.
pub fn status_code<T>(result: &Result<T, TaskletError>) -> i8 {
    match result {
        Ok(_) => 0,
        Err(e) => e.code(),
    }
}
