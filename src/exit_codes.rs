/// Exit codes for fishlint
///
/// These let scripts and CI tell "your fish code has problems" apart from
/// "fishlint itself could not do its job".
/// Success - No syntax errors found, or every file already formatted
pub const SUCCESS: i32 = 0;

/// Problems found - Syntax errors reported, or files that need formatting
pub const VIOLATIONS_FOUND: i32 = 1;

/// Tool error - Configuration error, missing fish binaries, or unreadable files
pub const TOOL_ERROR: i32 = 2;

/// Helper functions for consistent exit behavior
pub mod exit {
    use super::{SUCCESS, TOOL_ERROR, VIOLATIONS_FOUND};

    /// Exit with success code (0)
    pub fn success() -> ! {
        std::process::exit(SUCCESS);
    }

    /// Exit with violations found code (1)
    pub fn violations_found() -> ! {
        std::process::exit(VIOLATIONS_FOUND);
    }

    /// Exit with tool error code (2)
    pub fn tool_error() -> ! {
        std::process::exit(TOOL_ERROR);
    }
}
