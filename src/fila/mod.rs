/*!
 * Fila
 *
 * Path-addressed storage. A `Fila` is an immutable absolute address bound
 * to a registry; every operation on it is forwarded to the registry's
 * backend (native, mobile plugin, desktop webview, or embedded Keyva).
 */

pub mod address;
pub mod desktop;
pub mod embedded;
pub mod init;
pub mod mobile;
pub mod native;
pub mod paths;
pub mod registry;
pub mod traits;
pub mod types;
pub mod watch;

pub use address::Fila;
pub use desktop::DesktopBackend;
pub use embedded::EmbeddedBackend;
pub use init::init_storage;
pub use mobile::MobileBackend;
pub use native::NativeBackend;
pub use registry::{Registry, RegistryBuilder};
pub use traits::Backend;
pub use types::{FilaError, FilaResult, PluginError, Stat, WriteOptions};
pub use watch::{EventKind, EventSink, StorageEvent, Unwatch, WatchSubscription};
