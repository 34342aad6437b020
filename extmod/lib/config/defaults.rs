//--------------------------------------------------------------------------------------------------
// Constants
//--------------------------------------------------------------------------------------------------

/// How long a load may stay pending before the slow-load spinner is shown, in milliseconds.
pub const DEFAULT_SLOW_LOAD_THRESHOLD_MS: u64 = 1000;

/// The number of times a transient HTTP failure is retried when fetching a bundle.
pub const DEFAULT_HTTP_MAX_RETRIES: u32 = 3;

/// The name of the configuration file looked up by the CLI when none is given.
pub const DEFAULT_CONFIG_FILENAME: &str = "extmod.toml";
