//! Run persistence
//!
//! This module provides the stored form of a run and the storage trait.
//! The file-backed store is available with the `checkpoint` feature.

mod state;
mod store;

pub use state::*;
pub use store::*;

/// Prelude for checkpoint module
pub mod prelude {
    pub use super::state::PersistedRun;
    pub use super::store::RunStore;
    #[cfg(feature = "checkpoint")]
    pub use super::store::FileRunStore;
}
