//! Live "viewers watching this page" channel.
//!
//! [`hub`] keeps rooms and counts; [`socket`] adapts axum websockets to it.

pub mod hub;
pub mod socket;

pub use hub::ViewerHub;
