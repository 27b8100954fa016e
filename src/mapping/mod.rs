//! Request mapping subsystem.
//!
//! # Data Flow
//! ```text
//! (host, uri, version)
//!     → host table (exact, then wildcard, then default host)
//!     → application list (longest mount path on a `/` boundary)
//!     → version (requested, else greatest)
//!     → handler set: exact → path wildcard → extension → welcome files → default
//!     → MappingResult (targets, path split, redirect)
//! ```
//!
//! # Design Decisions
//! - Every level is a sorted table searched by binary search
//! - Tables are immutable once published; writers build a copy and swap it in
//! - Targets are opaque `Arc<T>` values compared by identity

pub mod application;
pub mod error;
pub mod handler;
pub mod host;
pub mod mapper;
pub mod pattern;
pub mod resources;
pub mod result;
pub mod table;

pub use application::{ApplicationDeployment, ApplicationSettings, ApplicationVersion};
pub use error::{MapperError, MapperResult, Registration};
pub use handler::{HandlerFlags, HandlerMapping};
pub use mapper::{Mapper, VersionRef};
pub use pattern::HandlerPattern;
pub use resources::{FsResources, ResourceKind, ResourceProbe};
pub use result::{MappingResult, MatchKind};
