//! Logging macros gated on a module-level `ENABLE_LOGS: bool` const.
//!
//! Modules with chatty diagnostics (per-row scan output and the like)
//! declare the const and use these instead of calling `log::*` directly,
//! so the noise can be switched off per module without touching call
//! sites. Exported at the crate root.

#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => {
        if ENABLE_LOGS {
            log::info!($($arg)*);
        }
    };
}

#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)*) => {
        if ENABLE_LOGS {
            log::warn!($($arg)*);
        }
    };
}

#[macro_export]
macro_rules! log_error {
    ($($arg:tt)*) => {
        if ENABLE_LOGS {
            log::error!($($arg)*);
        }
    };
}
