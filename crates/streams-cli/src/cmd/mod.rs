pub mod config;
pub mod entry;
pub mod form;
pub mod init;
pub mod schema;
