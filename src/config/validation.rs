//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check referential integrity (default host names a defined host)
//! - Detect duplicate host names and duplicate application versions
//! - Reject handler patterns the mapper would refuse
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: MapperConfig → Result<(), Vec<ValidationError>>
//! - Runs before a descriptor is deployed

use std::collections::HashSet;

use thiserror::Error;

use crate::config::schema::{ApplicationConfig, MapperConfig};
use crate::mapping::host::normalize_host_name;
use crate::mapping::pattern::HandlerPattern;

/// A single semantic problem in a descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("host name is empty")]
    EmptyHostName,

    #[error("host name {0:?} is defined more than once")]
    DuplicateHost(String),

    #[error("application path {path:?} on host {host:?} must be empty or start with '/' and not end with '/'")]
    InvalidApplicationPath { host: String, path: String },

    #[error("application {path:?} version {version:?} is defined more than once on host {host:?}")]
    DuplicateApplication {
        host: String,
        path: String,
        version: String,
    },

    #[error("handler {handler:?} in application {path:?} has no patterns")]
    NoPatterns { path: String, handler: String },

    #[error("handler {handler:?} in application {path:?}: {reason}")]
    InvalidPattern {
        path: String,
        handler: String,
        reason: String,
    },

    #[error("welcome file {name:?} in application {path:?} must be a non-empty relative name")]
    InvalidWelcomeFile { path: String, name: String },

    #[error("default host {0:?} is not defined")]
    UnknownDefaultHost(String),
}

/// Validate a parsed descriptor, collecting every problem found.
pub fn validate_config(config: &MapperConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();
    let mut names = HashSet::new();

    for host in &config.hosts {
        if host.name.trim().is_empty() {
            errors.push(ValidationError::EmptyHostName);
        }
        for name in std::iter::once(&host.name).chain(&host.aliases) {
            if !names.insert(normalize_host_name(name)) {
                errors.push(ValidationError::DuplicateHost(name.clone()));
            }
        }

        let mut deployed = HashSet::new();
        for app in &host.applications {
            if !is_valid_mount_path(&app.path) {
                errors.push(ValidationError::InvalidApplicationPath {
                    host: host.name.clone(),
                    path: app.path.clone(),
                });
            }
            if !deployed.insert((app.path.as_str(), app.version.as_str())) {
                errors.push(ValidationError::DuplicateApplication {
                    host: host.name.clone(),
                    path: app.path.clone(),
                    version: app.version.clone(),
                });
            }
            validate_application(app, &mut errors);
        }
    }

    if let Some(default_host) = &config.default_host {
        if !names.contains(&normalize_host_name(default_host)) {
            errors.push(ValidationError::UnknownDefaultHost(default_host.clone()));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn is_valid_mount_path(path: &str) -> bool {
    path.is_empty() || (path.starts_with('/') && !path.ends_with('/'))
}

fn validate_application(app: &ApplicationConfig, errors: &mut Vec<ValidationError>) {
    for handler in &app.handlers {
        if handler.patterns.is_empty() {
            errors.push(ValidationError::NoPatterns {
                path: app.path.clone(),
                handler: handler.name.clone(),
            });
        }
        for pattern in &handler.patterns {
            if let Err(e) = HandlerPattern::parse(pattern) {
                errors.push(ValidationError::InvalidPattern {
                    path: app.path.clone(),
                    handler: handler.name.clone(),
                    reason: e.to_string(),
                });
            }
        }
    }

    for name in &app.welcome_files {
        if name.is_empty() || name.starts_with('/') {
            errors.push(ValidationError::InvalidWelcomeFile {
                path: app.path.clone(),
                name: name.clone(),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::{HandlerConfig, HostConfig};

    fn host(name: &str, aliases: &[&str]) -> HostConfig {
        HostConfig {
            name: name.to_string(),
            aliases: aliases.iter().map(|a| a.to_string()).collect(),
            applications: Vec::new(),
        }
    }

    fn app(path: &str) -> ApplicationConfig {
        ApplicationConfig {
            path: path.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_valid_config_passes() {
        let mut h = host("example.com", &["www.example.com"]);
        let mut root = app("");
        root.welcome_files = vec!["index.html".into()];
        root.handlers.push(HandlerConfig {
            name: "default".into(),
            patterns: vec!["/".into(), "*.jsp".into()],
            template: false,
            resource_only: false,
        });
        h.applications = vec![root, app("/app")];
        let config = MapperConfig {
            default_host: Some("Example.com".into()),
            hosts: vec![h],
            ..Default::default()
        };
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_collects_all_errors() {
        let mut h = host("example.com", &["EXAMPLE.com"]);
        let mut bad = app("/app/");
        bad.welcome_files = vec!["/index.html".into(), String::new()];
        bad.handlers.push(HandlerConfig {
            name: "broken".into(),
            patterns: vec!["noslash".into()],
            template: false,
            resource_only: false,
        });
        bad.handlers.push(HandlerConfig {
            name: "empty".into(),
            patterns: Vec::new(),
            template: false,
            resource_only: false,
        });
        h.applications = vec![app("/x"), app("/x"), bad];
        let config = MapperConfig {
            default_host: Some("missing".into()),
            hosts: vec![h, host(" ", &[])],
            ..Default::default()
        };

        let errors = validate_config(&config).unwrap_err();
        assert!(errors.contains(&ValidationError::DuplicateHost("EXAMPLE.com".into())));
        assert!(errors.contains(&ValidationError::EmptyHostName));
        assert!(errors.contains(&ValidationError::UnknownDefaultHost("missing".into())));
        assert!(errors.iter().any(|e| matches!(e, ValidationError::InvalidApplicationPath { .. })));
        assert!(errors.iter().any(|e| matches!(e, ValidationError::DuplicateApplication { .. })));
        assert!(errors.iter().any(|e| matches!(e, ValidationError::InvalidPattern { .. })));
        assert!(errors.iter().any(|e| matches!(e, ValidationError::NoPatterns { .. })));
        assert_eq!(
            errors
                .iter()
                .filter(|e| matches!(e, ValidationError::InvalidWelcomeFile { .. }))
                .count(),
            2
        );
    }
}
