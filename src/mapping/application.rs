//! Applications and their deployed versions.
//!
//! # Responsibilities
//! - `ApplicationVersion`: one deployed unit with its handlers, welcome files
//!   and redirect policy
//! - `MappedApplication`: a mount path and its sorted versions
//! - `ApplicationList`: a host's sorted mount paths plus their nesting bound
//!
//! # Design Decisions
//! - Every collection a reader walks sits behind an `ArcSwap` and is
//!   replaced whole; writers serialise on the owning node's mutex
//! - `paused` is the only in-place mutable state and is a plain atomic flag

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use arc_swap::{ArcSwap, Guard};

use crate::mapping::error::Registration;
use crate::mapping::handler::{HandlerFlags, HandlerMapping, HandlerSet, Insertion};
use crate::mapping::pattern::HandlerPattern;
use crate::mapping::resources::ResourceProbe;
use crate::mapping::table::{self, Named};

/// Deployment-time settings of an application version.
#[derive(Debug, Clone)]
pub struct ApplicationSettings {
    /// Probe used for welcome files and directory redirects.
    pub resources: Option<Arc<dyn ResourceProbe>>,
    /// Welcome file names, tried in order.
    pub welcome_files: Vec<String>,
    /// Redirect a request for the bare mount path to the path plus `/`.
    pub root_redirect: bool,
    /// Redirect a request naming a directory to the path plus `/`.
    pub directory_redirect: bool,
}

impl Default for ApplicationSettings {
    fn default() -> Self {
        Self {
            resources: None,
            welcome_files: Vec::new(),
            root_redirect: true,
            directory_redirect: false,
        }
    }
}

/// Everything needed to register one application version.
pub struct ApplicationDeployment<A, W> {
    pub path: String,
    pub version: String,
    pub target: Arc<A>,
    pub settings: ApplicationSettings,
    pub handlers: Vec<HandlerMapping<W>>,
}

impl<A, W> ApplicationDeployment<A, W> {
    /// An unversioned deployment at `path` with default settings.
    pub fn new(path: impl Into<String>, target: Arc<A>) -> Self {
        Self {
            path: path.into(),
            version: String::new(),
            target,
            settings: ApplicationSettings::default(),
            handlers: Vec::new(),
        }
    }

    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    pub fn settings(mut self, settings: ApplicationSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn handler(mut self, mapping: HandlerMapping<W>) -> Self {
        self.handlers.push(mapping);
        self
    }
}

/// One deployed version of an application.
pub struct ApplicationVersion<A, W> {
    version: String,
    path: String,
    slash_count: usize,
    target: Arc<A>,
    resources: Option<Arc<dyn ResourceProbe>>,
    welcome_files: ArcSwap<Vec<String>>,
    handlers: ArcSwap<HandlerSet<W>>,
    paused: AtomicBool,
    root_redirect: bool,
    directory_redirect: bool,
    write_lock: Mutex<()>,
}

impl<A, W> ApplicationVersion<A, W> {
    /// Build a version from validated handler patterns.
    pub(crate) fn new(
        path: String,
        version: String,
        target: Arc<A>,
        settings: ApplicationSettings,
        handlers: HandlerSet<W>,
    ) -> Self {
        Self {
            slash_count: table::slash_count(&path),
            version,
            path,
            target,
            resources: settings.resources,
            welcome_files: ArcSwap::from_pointee(settings.welcome_files),
            handlers: ArcSwap::from_pointee(handlers),
            paused: AtomicBool::new(false),
            root_redirect: settings.root_redirect,
            directory_redirect: settings.directory_redirect,
            write_lock: Mutex::new(()),
        }
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn slash_count(&self) -> usize {
        self.slash_count
    }

    pub fn target(&self) -> &Arc<A> {
        &self.target
    }

    pub fn resources(&self) -> Option<&dyn ResourceProbe> {
        self.resources.as_deref()
    }

    pub fn root_redirect(&self) -> bool {
        self.root_redirect
    }

    pub fn directory_redirect(&self) -> bool {
        self.directory_redirect
    }

    /// Current handler snapshot.
    pub fn handlers(&self) -> Guard<Arc<HandlerSet<W>>> {
        self.handlers.load()
    }

    /// Current welcome file snapshot.
    pub fn welcome_files(&self) -> Guard<Arc<Vec<String>>> {
        self.welcome_files.load()
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::Acquire)
    }

    /// Mark the version as mid-reload: it still resolves as an application
    /// but no handler is selected.
    pub(crate) fn pause(&self) {
        self.paused.store(true, Ordering::Release);
    }

    fn lock(&self) -> MutexGuard<'_, ()> {
        self.write_lock.lock().expect("application version mutex poisoned")
    }

    /// Register a handler and publish the updated set.
    pub(crate) fn add_handler(
        &self,
        pattern: &HandlerPattern,
        target: Arc<W>,
        flags: HandlerFlags,
    ) -> Registration {
        let _guard = self.lock();
        let current = self.handlers.load_full();
        match current.with_handler(pattern, target, flags) {
            Insertion::Changed(set) => {
                self.handlers.store(Arc::new(set));
                Registration::Added
            }
            Insertion::Unchanged => Registration::Unchanged,
            Insertion::Conflict => Registration::Rejected,
        }
    }

    /// Remove the handler registered for `pattern`. Returns whether one was.
    pub(crate) fn remove_handler(&self, pattern: &HandlerPattern) -> bool {
        let _guard = self.lock();
        let current = self.handlers.load_full();
        match current.without_handler(pattern) {
            Some(set) => {
                self.handlers.store(Arc::new(set));
                true
            }
            None => false,
        }
    }

    /// Append a welcome file. Returns false if it was already listed.
    pub(crate) fn add_welcome_file(&self, name: &str) -> bool {
        let _guard = self.lock();
        let current = self.welcome_files.load_full();
        if current.iter().any(|w| w == name) {
            return false;
        }
        let mut files = Vec::with_capacity(current.len() + 1);
        files.extend(current.iter().cloned());
        files.push(name.to_string());
        self.welcome_files.store(Arc::new(files));
        true
    }

    /// Remove a welcome file. Returns false if it was not listed.
    pub(crate) fn remove_welcome_file(&self, name: &str) -> bool {
        let _guard = self.lock();
        let current = self.welcome_files.load_full();
        let Some(at) = current.iter().position(|w| w == name) else {
            return false;
        };
        let mut files = current.as_ref().clone();
        files.remove(at);
        self.welcome_files.store(Arc::new(files));
        true
    }

    pub(crate) fn clear_welcome_files(&self) {
        let _guard = self.lock();
        self.welcome_files.store(Arc::new(Vec::new()));
    }
}

impl<A, W> Named for ApplicationVersion<A, W> {
    fn name(&self) -> &str {
        &self.version
    }
}

impl<A, W> fmt::Debug for ApplicationVersion<A, W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApplicationVersion")
            .field("path", &self.path)
            .field("version", &self.version)
            .field("paused", &self.is_paused())
            .field("handlers", &**self.handlers.load())
            .finish_non_exhaustive()
    }
}

/// An application mount path and its deployed versions, sorted by version.
pub struct MappedApplication<A, W> {
    path: String,
    versions: ArcSwap<Vec<Arc<ApplicationVersion<A, W>>>>,
}

impl<A, W> MappedApplication<A, W> {
    pub(crate) fn new(version: Arc<ApplicationVersion<A, W>>) -> Self {
        Self {
            path: version.path.clone(),
            versions: ArcSwap::from_pointee(vec![version]),
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Current version snapshot. Never empty while the application is
    /// reachable from a published list.
    pub fn versions(&self) -> Guard<Arc<Vec<Arc<ApplicationVersion<A, W>>>>> {
        self.versions.load()
    }

    /// Caller must hold the owning host's lock.
    pub(crate) fn publish_versions(&self, versions: Vec<Arc<ApplicationVersion<A, W>>>) {
        self.versions.store(Arc::new(versions));
    }
}

impl<A, W> Named for MappedApplication<A, W> {
    fn name(&self) -> &str {
        &self.path
    }
}

impl<A, W> fmt::Debug for MappedApplication<A, W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MappedApplication")
            .field("path", &self.path)
            .field("versions", &**self.versions.load())
            .finish()
    }
}

/// The applications mounted under one host. Immutable once published.
pub struct ApplicationList<A, W> {
    applications: Vec<Arc<MappedApplication<A, W>>>,
    /// Greatest slash count among mount paths.
    nesting: usize,
}

impl<A, W> Default for ApplicationList<A, W> {
    fn default() -> Self {
        Self {
            applications: Vec::new(),
            nesting: 0,
        }
    }
}

impl<A, W> ApplicationList<A, W> {
    pub fn applications(&self) -> &[Arc<MappedApplication<A, W>>] {
        &self.applications
    }

    pub fn nesting(&self) -> usize {
        self.nesting
    }

    pub fn get(&self, path: &str) -> Option<&Arc<MappedApplication<A, W>>> {
        table::exact_find(&self.applications, path)
    }

    /// A new list with `application` mounted, or `None` if its path is taken.
    pub(crate) fn with_application(&self, application: Arc<MappedApplication<A, W>>) -> Option<Self> {
        let nesting = self.nesting.max(table::slash_count(application.path()));
        Some(Self {
            applications: table::insert(&self.applications, application)?,
            nesting,
        })
    }

    /// A new list without the application at `path`, or `None` if there is
    /// none. Nesting is recomputed from the survivors.
    pub(crate) fn without_application(&self, path: &str) -> Option<Self> {
        let applications = table::remove(&self.applications, path)?;
        let nesting = applications
            .iter()
            .map(|a| table::slash_count(a.path()))
            .max()
            .unwrap_or(0);
        Some(Self {
            applications,
            nesting,
        })
    }
}

impl<A, W> fmt::Debug for ApplicationList<A, W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApplicationList")
            .field("applications", &self.applications)
            .field("nesting", &self.nesting)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn version(path: &str, version: &str) -> Arc<ApplicationVersion<(), ()>> {
        Arc::new(ApplicationVersion::new(
            path.to_string(),
            version.to_string(),
            Arc::new(()),
            ApplicationSettings::default(),
            HandlerSet::default(),
        ))
    }

    fn mounted(path: &str) -> Arc<MappedApplication<(), ()>> {
        Arc::new(MappedApplication::new(version(path, "")))
    }

    #[test]
    fn test_list_tracks_nesting() {
        let list = ApplicationList::default()
            .with_application(mounted("/app"))
            .unwrap()
            .with_application(mounted("/app/sub/deep"))
            .unwrap();
        assert_eq!(list.nesting(), 3);
        assert!(list.with_application(mounted("/app")).is_none());

        let list = list.without_application("/app/sub/deep").unwrap();
        assert_eq!(list.nesting(), 1);
        assert!(list.without_application("/nope").is_none());
        assert_eq!(list.applications().len(), 1);
    }

    #[test]
    fn test_welcome_files() {
        let v = version("/app", "");
        assert!(v.add_welcome_file("index.html"));
        assert!(v.add_welcome_file("index.do"));
        assert!(!v.add_welcome_file("index.html"));
        assert_eq!(**v.welcome_files(), vec!["index.html", "index.do"]);

        assert!(v.remove_welcome_file("index.html"));
        assert!(!v.remove_welcome_file("index.html"));
        assert_eq!(**v.welcome_files(), vec!["index.do"]);

        v.clear_welcome_files();
        assert!(v.welcome_files().is_empty());
    }

    #[test]
    fn test_pause() {
        let v = version("", "1");
        assert!(!v.is_paused());
        v.pause();
        assert!(v.is_paused());
        assert_eq!(v.slash_count(), 0);
    }
}
