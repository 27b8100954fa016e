//! Virtual hosts and aliases.
//!
//! # Responsibilities
//! - Own the application list of a real host
//! - Keep every alias's cached copy of that list in step with the owner
//! - Normalise host names (ASCII lower case, `*.` wildcard prefix)
//!
//! # Design Decisions
//! - An alias is a separate table entry holding a weak back-reference to its
//!   real host; the real host owns the aliases, so there is no `Arc` cycle
//! - The real host's alias mutex doubles as its write lock: whoever publishes
//!   a new application list holds it, so aliases cannot miss an update

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, Weak};

use arc_swap::{ArcSwap, Guard};

use crate::mapping::application::ApplicationList;
use crate::mapping::table::Named;

/// Normalise a host or alias name for storage and lookup.
///
/// `*.example.com` becomes `.example.com`, which is what a request host
/// looks like once everything before its first dot is dropped.
pub fn normalize_host_name(name: &str) -> String {
    let name = name.to_ascii_lowercase();
    match name.strip_prefix('*') {
        Some(rest) if rest.starts_with('.') => rest.to_string(),
        _ => name,
    }
}

/// A host or alias entry in the host table.
pub struct MappedHost<H, A, W> {
    name: String,
    target: Arc<H>,
    /// Set on aliases only.
    real: Option<Weak<MappedHost<H, A, W>>>,
    applications: ArcSwap<ApplicationList<A, W>>,
    aliases: Mutex<Vec<Arc<MappedHost<H, A, W>>>>,
}

impl<H, A, W> MappedHost<H, A, W> {
    /// A real host with no applications.
    pub(crate) fn new(name: String, target: Arc<H>) -> Self {
        Self {
            name,
            target,
            real: None,
            applications: ArcSwap::from_pointee(ApplicationList::default()),
            aliases: Mutex::new(Vec::new()),
        }
    }

    /// An alias of `real`, sharing its target and its current applications.
    pub(crate) fn alias(name: String, real: &Arc<Self>) -> Self {
        Self {
            name,
            target: real.target.clone(),
            real: Some(Arc::downgrade(real)),
            applications: ArcSwap::new(real.applications.load_full()),
            aliases: Mutex::new(Vec::new()),
        }
    }

    pub fn target(&self) -> &Arc<H> {
        &self.target
    }

    pub fn is_alias(&self) -> bool {
        self.real.is_some()
    }

    /// The host that owns this entry's applications.
    pub fn real_host(self: &Arc<Self>) -> Option<Arc<Self>> {
        match &self.real {
            Some(real) => real.upgrade(),
            None => Some(self.clone()),
        }
    }

    /// Whether this entry is `host` or one of its aliases.
    pub(crate) fn belongs_to(self: &Arc<Self>, host: &Arc<Self>) -> bool {
        match &self.real {
            Some(real) => std::ptr::eq(real.as_ptr(), Arc::as_ptr(host)),
            None => Arc::ptr_eq(self, host),
        }
    }

    /// Name of the real host behind this entry, for diagnostics.
    pub fn real_name(self: &Arc<Self>) -> String {
        self.real_host()
            .map(|h| h.name.clone())
            .unwrap_or_else(|| self.name.clone())
    }

    /// Current application snapshot.
    pub fn applications(&self) -> Guard<Arc<ApplicationList<A, W>>> {
        self.applications.load()
    }

    /// Names of the aliases of a real host.
    pub fn alias_names(&self) -> Vec<String> {
        self.lock().iter().map(|a| a.name.clone()).collect()
    }

    /// Take the host's write lock. The guard exposes the alias list.
    pub(crate) fn lock(&self) -> MutexGuard<'_, Vec<Arc<Self>>> {
        self.aliases.lock().expect("host alias mutex poisoned")
    }

    /// Publish a new application list to the host and all of its aliases.
    pub(crate) fn publish_applications(&self, aliases: &[Arc<Self>], list: ApplicationList<A, W>) {
        let list = Arc::new(list);
        self.applications.store(list.clone());
        for alias in aliases {
            alias.applications.store(list.clone());
        }
    }

    /// Start propagating updates to `alias`.
    pub(crate) fn attach_alias(&self, alias: &Arc<Self>) {
        let mut aliases = self.lock();
        alias.applications.store(self.applications.load_full());
        aliases.push(alias.clone());
    }

    pub(crate) fn detach_alias(&self, alias: &Arc<Self>) {
        self.lock().retain(|a| !Arc::ptr_eq(a, alias));
    }
}

impl<H, A, W> Named for MappedHost<H, A, W> {
    fn name(&self) -> &str {
        &self.name
    }
}

impl<H, A, W> fmt::Debug for MappedHost<H, A, W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MappedHost")
            .field("name", &self.name)
            .field("alias", &self.is_alias())
            .field("applications", &**self.applications.load())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::application::{ApplicationSettings, ApplicationVersion, MappedApplication};
    use crate::mapping::handler::HandlerSet;

    type Host = MappedHost<(), (), ()>;

    fn application(path: &str) -> Arc<MappedApplication<(), ()>> {
        Arc::new(MappedApplication::new(Arc::new(ApplicationVersion::new(
            path.to_string(),
            String::new(),
            Arc::new(()),
            ApplicationSettings::default(),
            HandlerSet::default(),
        ))))
    }

    #[test]
    fn test_normalize_host_name() {
        assert_eq!(normalize_host_name("Example.COM"), "example.com");
        assert_eq!(normalize_host_name("*.Example.com"), ".example.com");
        assert_eq!(normalize_host_name("*example.com"), "*example.com");
    }

    #[test]
    fn test_alias_follows_real_host() {
        let real = Arc::new(Host::new("example.com".into(), Arc::new(())));
        let alias = Arc::new(Host::alias("www.example.com".into(), &real));
        real.attach_alias(&alias);

        assert!(alias.is_alias());
        assert!(alias.belongs_to(&real));
        assert!(real.belongs_to(&real));
        assert_eq!(alias.real_name(), "example.com");
        assert_eq!(real.alias_names(), vec!["www.example.com"]);

        {
            let aliases = real.lock();
            let list = real.applications().with_application(application("/app")).unwrap();
            real.publish_applications(&aliases, list);
        }
        assert_eq!(alias.applications().applications().len(), 1);
        assert!(Arc::ptr_eq(&real.applications.load_full(), &alias.applications.load_full()));

        real.detach_alias(&alias);
        {
            let aliases = real.lock();
            let list = real.applications().without_application("/app").unwrap();
            real.publish_applications(&aliases, list);
        }
        assert_eq!(alias.applications().applications().len(), 1);
        assert!(real.applications().applications().is_empty());
    }
}
