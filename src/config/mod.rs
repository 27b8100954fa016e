//! Deployment descriptor subsystem.
//!
//! # Data Flow
//! ```text
//! descriptor file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → MapperConfig (validated, immutable)
//!     → deploy.rs (hosts, applications, handlers)
//!     → Mapper ready for lookups
//! ```
//!
//! # Design Decisions
//! - All fields have defaults to allow minimal descriptors
//! - Validation separates syntactic (serde) from semantic checks
//! - Validation rejects anything the mapper would refuse, so deploying a
//!   validated descriptor cannot fail halfway

pub mod deploy;
pub mod loader;
pub mod schema;
pub mod validation;

pub use deploy::build_mapper;
pub use loader::{load_config, ConfigError};
pub use schema::{ApplicationConfig, HandlerConfig, HostConfig, MapperConfig};
