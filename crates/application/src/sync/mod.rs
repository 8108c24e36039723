//! Guarded execution of the mutating sync operation.

mod guard;

pub use guard::{SyncGuard, REQUIRED_WRITE_SCOPE};
