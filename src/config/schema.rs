//! Deployment descriptor schema.
//!
//! Describes hosts, their applications and each application's handlers.
//! All types derive Serde traits for deserialization from TOML files.

use serde::{Deserialize, Serialize};

/// Root of a deployment descriptor.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct MapperConfig {
    /// Host used when a request names none or an unknown one.
    pub default_host: Option<String>,

    /// Logging settings.
    pub observability: ObservabilityConfig,

    /// Virtual hosts.
    pub hosts: Vec<HostConfig>,
}

impl MapperConfig {
    /// Every application across all hosts, paired with its host.
    pub fn applications(&self) -> impl Iterator<Item = (&HostConfig, &ApplicationConfig)> {
        self.hosts
            .iter()
            .flat_map(|host| host.applications.iter().map(move |app| (host, app)))
    }
}

/// Virtual host definition.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HostConfig {
    /// Host name; `*.example.com` matches any subdomain of `example.com`.
    pub name: String,

    /// Other names that resolve to this host.
    #[serde(default)]
    pub aliases: Vec<String>,

    /// Applications mounted on this host.
    #[serde(default)]
    pub applications: Vec<ApplicationConfig>,
}

/// One deployed application version.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ApplicationConfig {
    /// Mount path: empty for the root application, otherwise `/`-prefixed.
    pub path: String,

    /// Version label; empty for unversioned deployments.
    pub version: String,

    /// Directory probed for welcome files and directory redirects.
    pub document_root: Option<String>,

    /// Welcome file names, tried in order.
    pub welcome_files: Vec<String>,

    /// Redirect a request for the bare mount path to the path plus `/`.
    pub root_redirect: bool,

    /// Redirect a request naming a directory to the path plus `/`.
    pub directory_redirect: bool,

    /// Deploy the version paused (mid-reload).
    pub paused: bool,

    /// Handler definitions.
    pub handlers: Vec<HandlerConfig>,
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        Self {
            path: String::new(),
            version: String::new(),
            document_root: None,
            welcome_files: Vec::new(),
            root_redirect: true,
            directory_redirect: false,
            paused: false,
            handlers: Vec::new(),
        }
    }
}

/// A handler and the patterns it serves.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HandlerConfig {
    /// Handler identifier reported in mapping results.
    pub name: String,

    /// Patterns mapped to this handler.
    pub patterns: Vec<String>,

    /// Processes path templates (see welcome-file handling).
    #[serde(default)]
    pub template: bool,

    /// Only chosen by extension when a backing file exists.
    #[serde(default)]
    pub resource_only: bool,
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format.
    pub log_format: LogFormat,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
        }
    }
}
