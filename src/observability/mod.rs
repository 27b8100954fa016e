//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Mapper and descriptor code produce:
//!     → tracing events (debug on registration, error on conflicts,
//!       trace on the lookup path)
//!
//! Consumers:
//!     → logging.rs subscriber (stderr, pretty or JSON)
//! ```
//!
//! # Design Decisions
//! - Structured logging (JSON) for machine parsing
//! - The lookup path only emits `trace` events, which the default filter drops

pub mod logging;

pub use logging::init_logging;
