//! Shared utilities for mapper integration tests.

use std::collections::HashSet;
use std::sync::Arc;

use request_mapper::mapping::{
    ApplicationDeployment, ApplicationSettings, HandlerFlags, HandlerMapping, Mapper,
    MappingResult, ResourceKind, ResourceProbe,
};

pub type TestMapper = Mapper<String, String, String>;
#[allow(dead_code)]
pub type TestResult = MappingResult<String, String, String>;

/// In-memory document root. Directories are implied by file paths.
#[derive(Debug, Default)]
pub struct MemoryResources {
    files: HashSet<String>,
    dirs: HashSet<String>,
}

impl MemoryResources {
    pub fn new(files: &[&str]) -> Self {
        let mut resources = Self::default();
        resources.dirs.insert("/".to_string());
        for file in files {
            resources.files.insert(file.to_string());
            let mut end = file.len();
            while let Some(slash) = file[..end].rfind('/') {
                if slash == 0 {
                    break;
                }
                resources.dirs.insert(file[..slash].to_string());
                end = slash;
            }
        }
        resources
    }
}

impl ResourceProbe for MemoryResources {
    fn probe(&self, path: &str) -> ResourceKind {
        let trimmed = if path.len() > 1 { path.trim_end_matches('/') } else { path };
        if self.files.contains(trimmed) {
            ResourceKind::File
        } else if self.dirs.contains(trimmed) {
            ResourceKind::Directory
        } else {
            ResourceKind::Missing
        }
    }
}

/// A target labelled `name`.
pub fn target(name: &str) -> Arc<String> {
    Arc::new(name.to_string())
}

/// Builds one application deployment.
pub struct App {
    deployment: ApplicationDeployment<String, String>,
}

#[allow(dead_code)]
impl App {
    pub fn new(path: &str) -> Self {
        Self::with_target(path, target(if path.is_empty() { "ROOT" } else { path }))
    }

    pub fn with_target(path: &str, app: Arc<String>) -> Self {
        Self {
            deployment: ApplicationDeployment::new(path, app),
        }
    }

    pub fn version(mut self, version: &str) -> Self {
        self.deployment = self.deployment.version(version);
        self
    }

    pub fn handler(mut self, pattern: &str, handler: &Arc<String>) -> Self {
        self.deployment = self
            .deployment
            .handler(HandlerMapping::new(pattern, handler.clone()));
        self
    }

    pub fn flagged(mut self, pattern: &str, handler: &Arc<String>, flags: HandlerFlags) -> Self {
        self.deployment = self
            .deployment
            .handler(HandlerMapping::new(pattern, handler.clone()).with_flags(flags));
        self
    }

    pub fn welcome(mut self, names: &[&str]) -> Self {
        self.deployment.settings.welcome_files = names.iter().map(|n| n.to_string()).collect();
        self
    }

    pub fn resources(mut self, files: &[&str]) -> Self {
        self.deployment.settings.resources = Some(Arc::new(MemoryResources::new(files)));
        self
    }

    pub fn root_redirect(mut self, enabled: bool) -> Self {
        self.deployment.settings.root_redirect = enabled;
        self
    }

    pub fn directory_redirect(mut self, enabled: bool) -> Self {
        self.deployment.settings.directory_redirect = enabled;
        self
    }

    pub fn settings(&mut self) -> &mut ApplicationSettings {
        &mut self.deployment.settings
    }

    /// Deploy on `host`, creating it if needed, and return the application target.
    pub fn deploy(self, mapper: &TestMapper, host: &str) -> Arc<String> {
        let app = self.deployment.target.clone();
        mapper
            .add_application_version(host, target(host), self.deployment)
            .unwrap();
        app
    }
}

/// Label of an optional target, for assertions.
#[allow(dead_code)]
pub fn label(target: &Option<Arc<String>>) -> Option<&str> {
    target.as_deref().map(String::as_str)
}
