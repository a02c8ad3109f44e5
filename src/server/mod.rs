pub mod error;
pub mod myresponse;
pub mod server;
