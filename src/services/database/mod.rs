// Database service module
// SQLite connection and schema for the reference event store

mod connection;
mod schema;

pub use connection::Database;
