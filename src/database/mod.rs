pub mod setup;
pub mod sqlite;
