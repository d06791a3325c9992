//! Data layer module
//!
//! Handles all data persistence:
//! - SQLite database operations (actors, followers, posts, kv)
//! - Entity models

mod database;
mod models;

pub use database::Database;
pub use models::*;
