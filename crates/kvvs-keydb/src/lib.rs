//! # kvvs-keydb
//!
//! Networked commit store for kv-vs on a KeyDB or Redis server.
//!
//! Writes are optimistic: each attempt WATCHes the keys it read, computes the
//! new state, and submits it in one MULTI/EXEC. A concurrent writer aborts the
//! transaction and the whole attempt runs again, up to a configured ceiling.

mod error;
mod keys;
mod retry;
mod store;

pub use error::{Error, Result};
pub use store::KeyDbStore;
