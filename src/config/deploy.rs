//! Build a routing table from a validated descriptor.
//!
//! # Data Flow
//! ```text
//! MapperConfig
//!     → one add_host per [[hosts]] (aliases included)
//!     → one add_application_version per [[hosts.applications]]
//!     → pause for versions marked paused
//!     → Mapper<String, String, String>
//! ```
//!
//! Targets are the descriptor's own labels: the host name, the application
//! label and the handler name. Every pattern of one handler shares a single
//! target, so they count as the same handler.

use std::sync::Arc;

use crate::config::schema::{ApplicationConfig, MapperConfig};
use crate::mapping::{
    ApplicationDeployment, ApplicationSettings, FsResources, HandlerFlags, HandlerMapping,
    Mapper, MapperResult, ResourceProbe, VersionRef,
};

/// Routing table whose targets are descriptor labels.
pub type ConfiguredMapper = Mapper<String, String, String>;

/// Label identifying an application version in mapping results.
pub fn application_label(path: &str, version: &str) -> String {
    let path = if path.is_empty() { "/" } else { path };
    if version.is_empty() {
        path.to_string()
    } else {
        format!("{path} (version {version})")
    }
}

/// Deploy every host and application in `config` into a new mapper.
pub fn build_mapper(config: &MapperConfig) -> MapperResult<ConfiguredMapper> {
    let mapper = Mapper::new();
    mapper.set_default_host_name(config.default_host.as_deref());

    for host in &config.hosts {
        let target = Arc::new(host.name.clone());
        let aliases: Vec<&str> = host.aliases.iter().map(String::as_str).collect();
        mapper.add_host(&host.name, &aliases, target.clone());

        for app in &host.applications {
            mapper.add_application_version(&host.name, target.clone(), deployment(app))?;
            if app.paused {
                let at = VersionRef::new(&host.name, &app.path, &app.version);
                let deployed = mapper.find_application_version(at)?;
                mapper.pause_application_version(at, deployed.target());
            }
        }
    }

    tracing::info!(
        hosts = config.hosts.len(),
        applications = config.applications().count(),
        default_host = ?config.default_host,
        "Descriptor deployed"
    );
    Ok(mapper)
}

fn deployment(app: &ApplicationConfig) -> ApplicationDeployment<String, String> {
    let settings = ApplicationSettings {
        resources: app
            .document_root
            .as_ref()
            .map(|root| Arc::new(FsResources::new(root)) as Arc<dyn ResourceProbe>),
        welcome_files: app.welcome_files.clone(),
        root_redirect: app.root_redirect,
        directory_redirect: app.directory_redirect,
    };

    let mut deployment = ApplicationDeployment::new(
        app.path.clone(),
        Arc::new(application_label(&app.path, &app.version)),
    )
    .version(app.version.clone())
    .settings(settings);

    for handler in &app.handlers {
        let target = Arc::new(handler.name.clone());
        let flags = HandlerFlags {
            template: handler.template,
            resource_only: handler.resource_only,
        };
        for pattern in &handler.patterns {
            deployment = deployment
                .handler(HandlerMapping::new(pattern.clone(), target.clone()).with_flags(flags));
        }
    }
    deployment
}
