//! Process exit codes of the `kabo` binary.

pub const SUCCESS: i32 = 0;

/// Bad arguments, bad configuration or an engine failure.
pub const ERROR: i32 = 2;

/// `sim` stopped early; the games completed so far were still written.
pub const INTERRUPTED: i32 = 130;
