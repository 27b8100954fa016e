//! Request mapping library: virtual host, application, version and handler
//! resolution for a web server.

pub mod config;
pub mod mapping;
pub mod observability;

pub use config::schema::MapperConfig;
pub use mapping::{Mapper, MappingResult};
