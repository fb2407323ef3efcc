//! Time-bounded caching of the remote inventory table.
//!
//! The table is small and read constantly, so a whole-table snapshot is held
//! for a short TTL and replaced wholesale on refresh. Writes invalidate it.

mod layer;
mod traits;

pub use layer::{DataCache, DEFAULT_TTL_SECS};
pub use traits::{CacheResult, CacheSource};
