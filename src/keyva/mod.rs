/*!
 * Keyva
 *
 * Transactional key/value stores with secondary indexes, over a pluggable
 * engine. Declared indexes are reconciled against the stored schema every
 * time a store opens.
 */

pub mod engine;
pub mod errors;
pub mod key;
pub mod range;
pub mod schema;
pub mod store;
pub mod value;
pub mod warm_up;

pub use engine::{Connection, DatabaseInfo, Engine, MemoryEngine, Upgrade};
pub use errors::{KeyvaError, KeyvaResult};
pub use key::Key;
pub use range::KeyRange;
pub use schema::{Schema, SchemaState};
pub use store::{prefixed_name, Keyva, KeyvaOptions, Query};
pub use value::Value;
