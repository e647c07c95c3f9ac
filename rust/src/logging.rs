//! Verbosity-gated logging for the engine passes.
//!
//! Every pass takes the verbosity from its config and logs through the macros
//! below; a disabled level costs one integer comparison.
//! Levels:
//! - 0: SILENT (config default)
//! - 1: CHANGES (cycles found, blockage counts, project end shifts, layout size)
//! - 2: CHECKS (dropped references, per-node blockage and delay decisions)
//! - 3: DEBUG (per-node forward/backward pass, propagation and layout values)

pub const VERBOSITY_SILENT: u8 = 0;
pub const VERBOSITY_CHANGES: u8 = 1;
pub const VERBOSITY_CHECKS: u8 = 2;
pub const VERBOSITY_DEBUG: u8 = 3;

/// Whether a message at `level` is emitted under `verbosity`.
#[inline]
pub fn enabled(verbosity: u8, level: u8) -> bool {
    level > VERBOSITY_SILENT && verbosity >= level
}

/// Summary-level event (verbosity >= 1).
#[macro_export]
macro_rules! log_changes {
    ($verbosity:expr, $($arg:tt)*) => {
        if $crate::logging::enabled($verbosity, $crate::logging::VERBOSITY_CHANGES) {
            eprintln!("[interdep] {}", format_args!($($arg)*));
        }
    };
}

/// Per-node decision (verbosity >= 2).
#[macro_export]
macro_rules! log_checks {
    ($verbosity:expr, $($arg:tt)*) => {
        if $crate::logging::enabled($verbosity, $crate::logging::VERBOSITY_CHECKS) {
            eprintln!("[interdep] {}", format_args!($($arg)*));
        }
    };
}

/// Pass internals (verbosity >= 3).
#[macro_export]
macro_rules! log_debug {
    ($verbosity:expr, $($arg:tt)*) => {
        if $crate::logging::enabled($verbosity, $crate::logging::VERBOSITY_DEBUG) {
            eprintln!("[interdep] {}", format_args!($($arg)*));
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;

    #[test]
    fn test_default_config_is_silent() {
        let verbosity = EngineConfig::default().verbosity;
        assert_eq!(verbosity, VERBOSITY_SILENT);
        assert!(!enabled(verbosity, VERBOSITY_CHANGES));
        assert!(!enabled(verbosity, VERBOSITY_DEBUG));
    }

    #[test]
    fn test_levels_are_cumulative() {
        assert!(enabled(VERBOSITY_CHECKS, VERBOSITY_CHANGES));
        assert!(enabled(VERBOSITY_CHECKS, VERBOSITY_CHECKS));
        assert!(!enabled(VERBOSITY_CHECKS, VERBOSITY_DEBUG));
        // Nothing is ever logged at the silent level itself
        assert!(!enabled(VERBOSITY_DEBUG, VERBOSITY_SILENT));
    }

    #[test]
    fn test_log_macros_expand() {
        let verbosity = VERBOSITY_SILENT;
        log_changes!(verbosity, "cycle through {:?}", ["a", "b"]);
        log_checks!(verbosity, "edge {} -> {}", "a", "b");
        log_debug!(verbosity, "forward {}: ES={}", "a", 0.0);
    }
}
