//! In-process shared state for the gist viewer.
//!
//! Provides a [`KeyedCache`] memoizing rendered pages by their source URL and
//! a [`ViewCounter`] holding the live viewer count of every watched page.
//! Both are process-lifetime structures owned by `AppState`.

pub mod memo;
pub mod views;

pub use memo::KeyedCache;
pub use views::ViewCounter;
