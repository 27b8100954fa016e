//! Handler pattern shapes.
//!
//! A pattern is one of:
//! - `""`: the application root, matched exactly as `/`
//! - `"/"`: the default handler
//! - `"/prefix/*"`: a path wildcard, stored without the trailing `/*`
//! - `"*.ext"`: an extension wildcard, stored without the leading `*.`
//! - anything else starting with `/`: an exact path

use std::fmt;

use crate::mapping::error::MapperError;

/// A parsed handler pattern.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum HandlerPattern {
    ApplicationRoot,
    Default,
    Prefix(String),
    Extension(String),
    Exact(String),
}

impl HandlerPattern {
    /// Parse and validate a pattern as registered by an application.
    pub fn parse(pattern: &str) -> Result<Self, MapperError> {
        let invalid = |reason: &'static str| MapperError::InvalidPattern {
            pattern: pattern.to_string(),
            reason,
        };

        if pattern.contains(['\n', '\r']) {
            return Err(invalid("contains a line break"));
        }
        if pattern.is_empty() {
            return Ok(Self::ApplicationRoot);
        }
        if let Some(extension) = pattern.strip_prefix("*.") {
            if extension.contains('/') {
                return Err(invalid("extension pattern contains '/'"));
            }
            if extension.is_empty() {
                return Err(invalid("extension pattern has no extension"));
            }
            warn_if_unusual(pattern);
            return Ok(Self::Extension(extension.to_string()));
        }
        if !pattern.starts_with('/') {
            return Err(invalid("must start with '/' or '*.'"));
        }
        if pattern.contains("*.") {
            return Err(invalid("extension wildcard inside a path pattern"));
        }
        if pattern == "/" {
            return Ok(Self::Default);
        }
        if let Some(prefix) = pattern.strip_suffix("/*") {
            return Ok(Self::Prefix(prefix.to_string()));
        }
        warn_if_unusual(pattern);
        Ok(Self::Exact(pattern.to_string()))
    }

    /// The name this pattern is stored under in its handler table.
    pub fn key(&self) -> &str {
        match self {
            Self::ApplicationRoot => "/",
            Self::Default => "",
            Self::Prefix(prefix) => prefix,
            Self::Extension(extension) => extension,
            Self::Exact(path) => path,
        }
    }
}

impl fmt::Display for HandlerPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ApplicationRoot => Ok(()),
            Self::Default => f.write_str("/"),
            Self::Prefix(prefix) => write!(f, "{prefix}/*"),
            Self::Extension(extension) => write!(f, "*.{extension}"),
            Self::Exact(path) => f.write_str(path),
        }
    }
}

/// Patterns like `/foo*` or `*.a*` are legal but almost never what was meant.
fn warn_if_unusual(pattern: &str) {
    if pattern.ends_with('*') && (pattern.len() < 2 || !pattern.ends_with("/*")) {
        tracing::warn!(pattern = %pattern, "Handler pattern ends with '*' but is not a path wildcard; it will match literally");
    }
}
