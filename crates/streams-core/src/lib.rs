pub mod assignment;
pub mod binder;
pub mod config;
pub mod context;
pub mod entry_store;
pub mod error;
pub mod events;
pub mod field_type;
pub mod field_types;
pub mod io;
pub mod lang;
pub mod markup;
pub mod notify;
pub mod orchestrator;
pub mod pagination;
pub mod paths;
pub mod record;
pub mod redirect;
pub mod rules;
pub mod schema;
pub mod types;
pub mod validation;

pub use error::{Result, StreamsError};
