//! Quarry driver integration suite
//!
//! Runs the connector against real PostgreSQL and MySQL servers started in
//! Docker with testcontainers. Every backend gets the same two fixture tables
//! and the same parameterized tests via rstest.
//!
//! # Usage
//!
//! ```bash
//! # Docker-backed tests are ignored by default
//! cargo test -p quarry-driver-tests -- --include-ignored
//! ```

pub mod fixtures;
pub mod test_containers;

#[cfg(test)]
mod connector_tests;
