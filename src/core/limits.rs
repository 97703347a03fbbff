/*!
 * Storage Limits and Constants
 *
 * Centralized location for the fixed names, intervals and thresholds used by
 * the path layer, the backends and the Keyva engine.
 */

use std::time::Duration;

// =============================================================================
// PATHS
// =============================================================================

/// Separator used by the POSIX path algorithms and by most backends
pub const DEFAULT_SEPARATOR: &str = "/";

/// Root marker; also the canonical single component of the root address
pub const ROOT: &str = "/";

/// Directory entries that are platform noise and never reported to callers
pub const NOISE_FILENAMES: &[&str] = &[".DS_Store"];

// =============================================================================
// WATCHING
// =============================================================================

/// Debounce passed to the desktop watch plugin (milliseconds)
pub const DESKTOP_WATCH_DELAY_MS: u64 = 2000;

/// Event channel prefix; the watch id is appended
pub const DESKTOP_WATCH_CHANNEL_PREFIX: &str = "watcher://raw-event/";

/// Desktop plugin commands
pub const DESKTOP_WATCH_COMMAND: &str = "plugin:fs-watch|watch";
pub const DESKTOP_UNWATCH_COMMAND: &str = "plugin:fs-watch|unwatch";
pub const DESKTOP_METADATA_COMMAND: &str = "plugin:fs-extra|metadata";

// =============================================================================
// KEYVA
// =============================================================================

/// Prefix added to every database name created by Keyva
pub const KEYVA_NAME_PREFIX: &str = "-keyva-";

/// Interval between capability polls while warming up a stalled engine
pub const KEYVA_WARM_UP_INTERVAL: Duration = Duration::from_millis(50);

/// Upper bound on reopen-at-version+1 cycles during index reconciliation
pub const MAX_SCHEMA_MIGRATIONS: u32 = 8;

/// File extension of persisted database snapshots
pub const KEYVA_SNAPSHOT_EXTENSION: &str = "keyva";

// =============================================================================
// EMBEDDED BACKEND
// =============================================================================

/// Name of the Keyva store that holds the virtual filesystem
pub const EMBEDDED_STORE_NAME: &str = "fila";

/// Working directory of the embedded backend
pub const EMBEDDED_CWD: &str = "/";

/// Temporary directory of the embedded backend
pub const EMBEDDED_TEMP: &str = "/__temp/";

// =============================================================================
// MOBILE BACKEND
// =============================================================================

/// Working directory of the mobile backend (a plugin directory name)
pub const MOBILE_CWD: &str = "DATA";

/// Temporary directory of the mobile backend (a plugin directory name)
pub const MOBILE_TEMP: &str = "CACHE";
