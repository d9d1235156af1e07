/// Logging utilities with automatic file:line injection
///
/// These wrap the log crate macros and prefix every message with the source
/// location so a log line can be traced back to the tasklet code that emitted
/// it.
///
/// Format: [file:line] message
///
/// Example:
/// ```text
/// info!("tasklet: IPv6 bootstrap ready");
/// // Output: [src/tasklet/enet.rs:337] tasklet: IPv6 bootstrap ready
/// ```

/// Info-level log with automatic file:line prefix
macro_rules! info {
    ($($arg:tt)*) => {
        {
            const LOC: &str = concat!("[", file!(), ":", line!(), "]");
            ::log::info!("{} {}", LOC, format_args!($($arg)*))
        }
    };
}

/// Warning-level log with automatic file:line prefix
macro_rules! warn {
    ($($arg:tt)*) => {
        {
            const LOC: &str = concat!("[", file!(), ":", line!(), "]");
            ::log::warn!("{} {}", LOC, format_args!($($arg)*))
        }
    };
}

/// Error-level log with automatic file:line prefix
macro_rules! error {
    ($($arg:tt)*) => {
        {
            const LOC: &str = concat!("[", file!(), ":", line!(), "]");
            ::log::error!("{} {}", LOC, format_args!($($arg)*))
        }
    };
}

/// Debug-level log with automatic file:line prefix
macro_rules! debug {
    ($($arg:tt)*) => {
        {
            const LOC: &str = concat!("[", file!(), ":", line!(), "]");
            ::log::debug!("{} {}", LOC, format_args!($($arg)*))
        }
    };
}

/// Trace-level log with automatic file:line prefix
macro_rules! trace {
    ($($arg:tt)*) => {
        {
            const LOC: &str = concat!("[", file!(), ":", line!(), "]");
            ::log::trace!("{} {}", LOC, format_args!($($arg)*))
        }
    };
}

/// Install env_logger as the global logger.
///
/// `RUST_LOG` wins over `default_filter` when it is set. Calling this twice is
/// harmless, the second logger is simply not installed.
pub fn init(default_filter: &str) {
    let env = env_logger::Env::default().default_filter_or(default_filter);
    if env_logger::Builder::from_env(env)
        .format_timestamp_millis()
        .try_init()
        .is_err()
    {
        ::log::debug!("logger already initialized");
    }
}
