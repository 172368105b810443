//! Persistent result cache and session history for smartsort.
//!
//! Cached file results are keyed by path and a metadata fingerprint
//! derived from size and modification time. The table is append-only:
//! each store adds a row, and lookups read the newest matching one.
//!
//! Sessions, their per-file records and their duplicate groups are kept
//! alongside for later inspection.

mod error;
mod queries;
mod store;

pub use error::{CacheError, Result};
pub use queries::metadata_fingerprint;
pub use store::ResultCache;
