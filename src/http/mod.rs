//! HTTP layer.
//!
//! The axum router serving example pages, stylesheets, the live viewer
//! websocket, the blog API and the operational endpoints, plus the
//! path-parameter guard used by the blog routes.

pub mod handler;
pub mod param_expr;
