//! Quarry Store - the directory of organizations, members and data sources
//!
//! [`SqliteDirectory`] keeps everything in one SQLite file and implements the
//! connector's [`DirectoryStore`](quarry_connector::DirectoryStore) lookups.

mod models;
mod storage;

pub use models::*;
pub use storage::SqliteDirectory;
