//! Quarry Server - HTTP surface for the data source connector
//!
//! Callers are identified by the `x-quarry-user` header, which the
//! authenticating proxy in front of this service sets to the caller's
//! e-mail address.

pub mod config;
mod error;
mod handlers;
pub mod logging;
mod routes;

pub use error::{ApiError, ErrorBody};
pub use routes::{AppState, CALLER_HEADER, router};
