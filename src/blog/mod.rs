//! Users and posts over a small JSON API.

pub mod handlers;
pub mod model;
pub mod store;

pub use store::{BlogStore, MemoryStore, StoreError};
