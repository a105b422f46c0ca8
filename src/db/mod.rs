// Database module
// This module handles SQLite database operations

pub mod connection;
pub mod migrations;
pub mod models;
pub mod operations;
pub mod store;

pub use connection::DatabaseConnection;
pub use store::LibraryStore;
