//! The routing table: host, application and handler resolution plus the
//! administrative calls that keep it current.
//!
//! # Responsibilities
//! - `resolve`: host → application → version → handler in one pass
//! - Add/remove hosts, aliases, application versions, handlers, welcome files
//! - Index versions by target for `resolve_within_application`
//!
//! # Design Decisions
//! - Readers only load `ArcSwap` snapshots; they never take a lock
//! - Host-table writers serialise on the mapper's mutex, application-list
//!   writers on the owning host's, handler writers on the version's
//! - Lock order is mapper → host → version; nothing acquires them backwards
//! - Conflicts are logged and reported as [`Registration::Rejected`], never
//!   raised, so one bad redeploy cannot disturb unrelated routes

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

use arc_swap::{ArcSwap, ArcSwapOption};
use dashmap::DashMap;

use crate::mapping::application::{ApplicationDeployment, ApplicationVersion, MappedApplication};
use crate::mapping::error::{MapperError, MapperResult, Registration};
use crate::mapping::handler::{HandlerFlags, HandlerSet, Insertion, MappedHandler};
use crate::mapping::host::{normalize_host_name, MappedHost};
use crate::mapping::pattern::HandlerPattern;
use crate::mapping::resources::ResourceKind;
use crate::mapping::result::{assign, MappingResult, MatchKind};
use crate::mapping::table::{self, Named};

type HostTable<H, A, W> = Vec<Arc<MappedHost<H, A, W>>>;

/// Identity of a target `Arc`, used to find a version from its target.
///
/// The index holds the version, and the version holds the target, so the
/// address cannot be reused while the key is present.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct TargetKey(usize);

impl TargetKey {
    fn of<T>(target: &Arc<T>) -> Self {
        Self(Arc::as_ptr(target) as *const () as usize)
    }
}

/// Coordinates of one application version.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VersionRef<'a> {
    pub host: &'a str,
    pub path: &'a str,
    pub version: &'a str,
}

impl<'a> VersionRef<'a> {
    pub fn new(host: &'a str, path: &'a str, version: &'a str) -> Self {
        Self {
            host,
            path,
            version,
        }
    }
}

/// Maps (host, path, version) to host, application and handler targets.
pub struct Mapper<H, A, W> {
    hosts: ArcSwap<HostTable<H, A, W>>,
    default_host: ArcSwapOption<String>,
    versions_by_target: DashMap<TargetKey, Arc<ApplicationVersion<A, W>>>,
    write_lock: Mutex<()>,
}

impl<H, A, W> Default for Mapper<H, A, W> {
    fn default() -> Self {
        Self {
            hosts: ArcSwap::from_pointee(Vec::new()),
            default_host: ArcSwapOption::empty(),
            versions_by_target: DashMap::new(),
            write_lock: Mutex::new(()),
        }
    }
}

impl<H, A, W> fmt::Debug for Mapper<H, A, W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mapper")
            .field("default_host", &self.default_host.load().as_deref())
            .field("hosts", &**self.hosts.load())
            .finish_non_exhaustive()
    }
}

impl<H, A, W> Mapper<H, A, W> {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, ()> {
        self.write_lock.lock().expect("mapper mutex poisoned")
    }

    fn exact_host(&self, name: &str) -> Option<Arc<MappedHost<H, A, W>>> {
        table::exact_find(&self.hosts.load(), name).cloned()
    }

    /// Snapshot of the host table, aliases included.
    pub fn hosts(&self) -> Arc<HostTable<H, A, W>> {
        self.hosts.load_full()
    }

    /// Names of real hosts, sorted.
    pub fn host_names(&self) -> Vec<String> {
        self.hosts
            .load()
            .iter()
            .filter(|h| !h.is_alias())
            .map(|h| h.name().to_string())
            .collect()
    }

    pub fn default_host_name(&self) -> Option<String> {
        self.default_host.load().as_deref().cloned()
    }

    /// Host used when the request names none, or one that is not registered.
    pub fn set_default_host_name(&self, name: Option<&str>) {
        let name = name.map(|n| Arc::new(normalize_host_name(n)));
        tracing::debug!(default_host = ?name.as_deref(), "Default host set");
        self.default_host.store(name);
    }

    // --- Hosts ---

    /// Register a host and its aliases.
    ///
    /// Re-registering a host with the same target is a no-op apart from
    /// adding any new aliases. A different target is rejected and none of
    /// the aliases are added.
    pub fn add_host(&self, name: &str, aliases: &[&str], target: Arc<H>) -> Registration {
        let name = normalize_host_name(name);
        let _guard = self.lock();
        let hosts = self.hosts.load_full();

        let (host, outcome) = match table::exact_find(&hosts, &name) {
            Some(existing) if !existing.is_alias() && Arc::ptr_eq(existing.target(), &target) => {
                tracing::debug!(host = %name, "Host already registered");
                (existing.clone(), Registration::Unchanged)
            }
            Some(existing) => {
                tracing::error!(
                    host = %name,
                    existing = %existing.real_name(),
                    "Duplicate host registration rejected"
                );
                return Registration::Rejected;
            }
            None => {
                let host = Arc::new(MappedHost::new(name.clone(), target));
                if let Some(updated) = table::insert(&hosts, host.clone()) {
                    self.hosts.store(Arc::new(updated));
                }
                tracing::debug!(host = %name, "Host registered");
                (host, Registration::Added)
            }
        };

        for alias in aliases {
            self.insert_alias(&host, normalize_host_name(alias));
        }
        outcome
    }

    /// Remove a real host together with all of its aliases.
    pub fn remove_host(&self, name: &str) -> bool {
        let name = normalize_host_name(name);
        let _guard = self.lock();
        let hosts = self.hosts.load_full();
        let Some(host) = table::exact_find(&hosts, &name).filter(|h| !h.is_alias()).cloned() else {
            return false;
        };

        let remaining: HostTable<H, A, W> =
            hosts.iter().filter(|h| !h.belongs_to(&host)).cloned().collect();
        self.hosts.store(Arc::new(remaining));

        for application in host.applications().applications() {
            for version in application.versions().iter() {
                self.forget(version);
            }
        }
        tracing::debug!(host = %name, "Host removed");
        true
    }

    /// Register `alias` for the real host `host`.
    pub fn add_host_alias(&self, host: &str, alias: &str) -> MapperResult<Registration> {
        let host_name = normalize_host_name(host);
        let _guard = self.lock();
        let real = self
            .exact_host(&host_name)
            .ok_or_else(|| MapperError::UnknownHost(host_name.clone()))?;
        let real = real
            .real_host()
            .ok_or_else(|| MapperError::UnknownHost(host_name.clone()))?;
        Ok(self.insert_alias(&real, normalize_host_name(alias)))
    }

    /// Caller must hold the mapper lock.
    fn insert_alias(&self, real: &Arc<MappedHost<H, A, W>>, name: String) -> Registration {
        let alias = Arc::new(MappedHost::alias(name, real));
        // Attach first so the alias never becomes visible with a stale list.
        real.attach_alias(&alias);

        let hosts = self.hosts.load_full();
        if let Some(updated) = table::insert(&hosts, alias.clone()) {
            self.hosts.store(Arc::new(updated));
            tracing::debug!(alias = %alias.name(), host = %real.name(), "Host alias registered");
            return Registration::Added;
        }

        real.detach_alias(&alias);
        match table::exact_find(&hosts, alias.name()) {
            Some(duplicate) if duplicate.belongs_to(real) => {
                tracing::debug!(alias = %alias.name(), host = %real.name(), "Host alias already registered");
                Registration::Unchanged
            }
            duplicate => {
                tracing::error!(
                    alias = %alias.name(),
                    host = %real.name(),
                    existing = ?duplicate.map(|d| d.real_name()),
                    "Duplicate host alias rejected"
                );
                Registration::Rejected
            }
        }
    }

    /// Remove an alias. Real hosts are left alone.
    pub fn remove_host_alias(&self, alias: &str) -> bool {
        let name = normalize_host_name(alias);
        let _guard = self.lock();
        let hosts = self.hosts.load_full();
        let Some(entry) = table::exact_find(&hosts, &name).filter(|h| h.is_alias()).cloned() else {
            return false;
        };
        let Some(updated) = table::remove(&hosts, &name) else {
            return false;
        };
        self.hosts.store(Arc::new(updated));
        if let Some(real) = entry.real_host() {
            real.detach_alias(&entry);
        }
        tracing::debug!(alias = %name, "Host alias removed");
        true
    }

    // --- Applications ---

    /// Deploy an application version, creating the host if it is unknown.
    ///
    /// All handler patterns are validated before anything is published. A
    /// version already deployed with the same target is left as it is,
    /// runtime handlers and pause flag included; with a different target the
    /// call is rejected.
    pub fn add_application_version(
        &self,
        host: &str,
        host_target: Arc<H>,
        deployment: ApplicationDeployment<A, W>,
    ) -> MapperResult<Registration> {
        let ApplicationDeployment {
            path,
            version,
            target,
            settings,
            handlers,
        } = deployment;
        let host_name = normalize_host_name(host);

        let mut set = HandlerSet::default();
        for mapping in handlers {
            let pattern = HandlerPattern::parse(&mapping.pattern)?;
            match set.with_handler(&pattern, mapping.target, mapping.flags) {
                Insertion::Changed(next) => set = next,
                Insertion::Unchanged => {}
                Insertion::Conflict => tracing::error!(
                    pattern = %pattern,
                    application = %path,
                    "Pattern mapped to two handlers in one deployment; keeping the first"
                ),
            }
        }

        let host = match self.exact_host(&host_name) {
            Some(host) => host,
            None => {
                self.add_host(&host_name, &[], host_target);
                self.exact_host(&host_name)
                    .ok_or_else(|| MapperError::UnknownHost(host_name.clone()))?
            }
        };
        if host.is_alias() {
            return Err(MapperError::HostIsAlias(host_name));
        }

        let deployed = Arc::new(ApplicationVersion::new(
            path.clone(),
            version.clone(),
            target,
            settings,
            set,
        ));

        let aliases = host.lock();
        let list = host.applications();
        let outcome = match list.get(&path) {
            Some(application) => self.merge_version(application, &deployed),
            None => {
                let application = Arc::new(MappedApplication::new(deployed.clone()));
                if let Some(updated) = list.with_application(application) {
                    host.publish_applications(&aliases, updated);
                }
                Registration::Added
            }
        };
        drop(list);
        drop(aliases);

        match outcome {
            Registration::Added => {
                self.versions_by_target
                    .insert(TargetKey::of(deployed.target()), deployed.clone());
                tracing::debug!(host = %host_name, path = %path, version = %version, "Application version registered");
            }
            Registration::Unchanged => {
                tracing::debug!(host = %host_name, path = %path, version = %version, "Application version already deployed")
            }
            Registration::Rejected => tracing::error!(
                host = %host_name,
                path = %path,
                version = %version,
                "Application version already deployed for a different target"
            ),
        }
        Ok(outcome)
    }

    /// Caller must hold the owning host's lock.
    fn merge_version(
        &self,
        application: &MappedApplication<A, W>,
        deployed: &Arc<ApplicationVersion<A, W>>,
    ) -> Registration {
        let versions = application.versions();
        if let Some(updated) = table::insert(&versions, deployed.clone()) {
            application.publish_versions(updated);
            return Registration::Added;
        }
        match table::exact_find(&versions, deployed.version()) {
            Some(existing) if Arc::ptr_eq(existing.target(), deployed.target()) => Registration::Unchanged,
            _ => Registration::Rejected,
        }
    }

    /// Undeploy a version; the application goes with its last version.
    pub fn remove_application_version(&self, at: VersionRef<'_>) -> bool {
        let host_name = normalize_host_name(at.host);
        let Some(host) = self.exact_host(&host_name).filter(|h| !h.is_alias()) else {
            return false;
        };

        let aliases = host.lock();
        let list = host.applications();
        let Some(application) = list.get(at.path) else {
            return false;
        };
        let versions = application.versions();
        let Some(removed) = table::exact_find(&versions, at.version).cloned() else {
            return false;
        };
        let Some(remaining) = table::remove(&versions, at.version) else {
            return false;
        };

        if remaining.is_empty() {
            if let Some(updated) = list.without_application(at.path) {
                host.publish_applications(&aliases, updated);
            }
        } else {
            application.publish_versions(remaining);
        }
        self.forget(&removed);
        tracing::debug!(
            host = %host_name,
            path = %at.path,
            version = %at.version,
            "Application version removed"
        );
        true
    }

    fn forget(&self, version: &Arc<ApplicationVersion<A, W>>) {
        self.versions_by_target
            .remove_if(&TargetKey::of(version.target()), |_, indexed| Arc::ptr_eq(indexed, version));
    }

    /// Look up a deployed version by its coordinates.
    pub fn find_application_version(
        &self,
        at: VersionRef<'_>,
    ) -> MapperResult<Arc<ApplicationVersion<A, W>>> {
        let host_name = normalize_host_name(at.host);
        let host = self
            .exact_host(&host_name)
            .ok_or_else(|| MapperError::UnknownHost(host_name.clone()))?;
        if host.is_alias() {
            return Err(MapperError::HostIsAlias(host_name));
        }
        let list = host.applications();
        let application = list.get(at.path).ok_or_else(|| MapperError::UnknownApplication {
            host: host_name.clone(),
            path: at.path.to_string(),
        })?;
        let versions = application.versions();
        table::exact_find(&versions, at.version)
            .cloned()
            .ok_or_else(|| MapperError::UnknownVersion {
                host: host_name,
                path: at.path.to_string(),
                version: at.version.to_string(),
            })
    }

    /// Pause a version that is about to be reloaded. Only the version
    /// deployed for `target` is paused; anything else is ignored.
    pub fn pause_application_version(&self, at: VersionRef<'_>, target: &Arc<A>) -> bool {
        match self.find_application_version(at) {
            Ok(version) if Arc::ptr_eq(version.target(), target) => {
                version.pause();
                tracing::debug!(host = %at.host, path = %at.path, version = %at.version, "Application version paused");
                true
            }
            _ => false,
        }
    }

    // --- Handlers ---

    /// Map `pattern` to `target` in the given version.
    pub fn add_handler(
        &self,
        at: VersionRef<'_>,
        pattern: &str,
        target: Arc<W>,
        flags: HandlerFlags,
    ) -> MapperResult<Registration> {
        let pattern = HandlerPattern::parse(pattern)?;
        let version = self.find_application_version(at)?;
        let outcome = version.add_handler(&pattern, target, flags);
        match outcome {
            Registration::Rejected => tracing::error!(
                path = %at.path,
                version = %at.version,
                pattern = %pattern,
                "Handler pattern already mapped to a different handler"
            ),
            _ => tracing::debug!(
                path = %at.path,
                version = %at.version,
                pattern = %pattern,
                outcome = ?outcome,
                "Handler registered"
            ),
        }
        Ok(outcome)
    }

    /// Unmap `pattern`. Returns whether it was mapped.
    pub fn remove_handler(&self, at: VersionRef<'_>, pattern: &str) -> MapperResult<bool> {
        let pattern = HandlerPattern::parse(pattern)?;
        let removed = self.find_application_version(at)?.remove_handler(&pattern);
        if removed {
            tracing::debug!(path = %at.path, version = %at.version, pattern = %pattern, "Handler removed");
        }
        Ok(removed)
    }

    // --- Welcome files ---

    /// Append a welcome file name, relative to the requested directory.
    pub fn add_welcome_file(&self, at: VersionRef<'_>, name: &str) -> MapperResult<Registration> {
        if name.is_empty() || name.starts_with('/') {
            return Err(MapperError::InvalidWelcomeFile(name.to_string()));
        }
        let added = self.find_application_version(at)?.add_welcome_file(name);
        Ok(if added {
            Registration::Added
        } else {
            Registration::Unchanged
        })
    }

    pub fn remove_welcome_file(&self, at: VersionRef<'_>, name: &str) -> MapperResult<bool> {
        Ok(self.find_application_version(at)?.remove_welcome_file(name))
    }

    pub fn clear_welcome_files(&self, at: VersionRef<'_>) -> MapperResult<()> {
        self.find_application_version(at)?.clear_welcome_files();
        Ok(())
    }

    // --- Resolution ---

    /// Resolve a request into `result`.
    ///
    /// An empty `host` means the default host. `version` selects among
    /// concurrently deployed versions; without it, or when it is unknown, the
    /// greatest version wins. Nothing found is reported through unset fields.
    pub fn resolve(
        &self,
        host: &str,
        uri: &str,
        version: Option<&str>,
        result: &mut MappingResult<H, A, W>,
    ) {
        result.recycle();

        let default_host = self.default_host.load();
        let host_name = if host.is_empty() {
            match default_host.as_deref() {
                Some(name) => name.as_str(),
                None => return,
            }
        } else {
            host
        };

        let hosts = self.hosts.load();
        let Some(mapped_host) = find_host(&hosts, host_name)
            .or_else(|| default_host.as_deref().and_then(|d| table::exact_find(&hosts, d)))
        else {
            tracing::trace!(host = %host_name, "No host matched");
            return;
        };
        result.host = Some(mapped_host.target().clone());

        let list = mapped_host.applications();
        let applications = list.applications();
        let found = table::find_prefix(applications, uri, list.nesting())
            .map(|pos| &applications[pos])
            .or_else(|| applications.first().filter(|a| a.path().is_empty()));
        let Some(application) = found else {
            tracing::trace!(host = %host_name, uri = %uri, "No application matched");
            return;
        };
        result.application_path.push_str(application.path());

        let versions = application.versions();
        let mut selected = None;
        if versions.len() > 1 {
            result
                .applications
                .extend(versions.iter().map(|v| v.target().clone()));
            selected = version.and_then(|v| table::exact_find(&versions, v));
        }
        let Some(selected) = selected.or_else(|| versions.last()) else {
            return;
        };
        result.application = Some(selected.target().clone());
        result.application_slash_count = selected.slash_count();

        if selected.is_paused() {
            tracing::trace!(path = %application.path(), version = %selected.version(), "Application version paused");
            return;
        }
        map_handler(selected, uri, result);
    }

    /// Resolve into a freshly allocated result.
    pub fn lookup(&self, host: &str, uri: &str, version: Option<&str>) -> MappingResult<H, A, W> {
        let mut result = MappingResult::new();
        self.resolve(host, uri, version, &mut result);
        result
    }

    /// Resolve a handler inside the version deployed for `application`.
    ///
    /// `uri` still includes the application path. Host and version selection
    /// are skipped, and so is the paused check: the caller already holds the
    /// application.
    pub fn resolve_within_application(
        &self,
        application: &Arc<A>,
        uri: &str,
        result: &mut MappingResult<H, A, W>,
    ) {
        result.recycle();
        let Some(version) = self
            .versions_by_target
            .get(&TargetKey::of(application))
            .map(|entry| entry.value().clone())
        else {
            return;
        };
        result.application = Some(version.target().clone());
        result.application_slash_count = version.slash_count();
        result.application_path.push_str(version.path());
        map_handler(&version, uri, result);
    }
}

/// Case-insensitive host lookup, then the wildcard entry for the part of
/// the name from its first dot.
fn find_host<'a, H, A, W>(
    hosts: &'a [Arc<MappedHost<H, A, W>>],
    name: &str,
) -> Option<&'a Arc<MappedHost<H, A, W>>> {
    table::exact_find_ignore_case(hosts, name).or_else(|| {
        let dot = name.find('.')?;
        table::exact_find_ignore_case(hosts, &name[dot..])
    })
}

/// Select a handler for `uri` within `version`.
fn map_handler<H, A, W>(
    version: &ApplicationVersion<A, W>,
    uri: &str,
    result: &mut MappingResult<H, A, W>,
) {
    let Some(path) = uri.strip_prefix(version.path()) else {
        return;
    };
    let at_root = path.is_empty();
    let directory = uri.ends_with('/');
    let handlers = version.handlers();

    map_exact(&handlers.exact, path, result);

    // A template processor reached by wildcard on a directory request defers
    // to the welcome files, which it will most likely match itself.
    let mut template_welcome = false;
    if result.handler.is_none() {
        map_wildcard(&handlers.wildcard, handlers.nesting, path, result);
        if result.handler.is_some() && result.template_match {
            if directory {
                result.clear_handler();
                template_welcome = true;
            } else {
                assign(&mut result.handler_path, path);
                result.extra_path.clear();
            }
        }
    }

    if result.handler.is_none() && at_root && version.root_redirect() {
        result.redirect_path = Some(format!("{uri}/"));
        return;
    }

    if result.handler.is_none() && !template_welcome {
        map_extension(&handlers.extension, path, result, true);
    }

    if result.handler.is_none() && (template_welcome || directory) {
        map_welcome_files(version, &handlers, path, result);
    }

    if result.handler.is_none() && !template_welcome {
        if let Some(default) = &handlers.default {
            result.set_handler(default.target(), MatchKind::Default, path, path);
        }
        if !directory && version.directory_redirect() {
            if let Some(resources) = version.resources() {
                let probed = if path.is_empty() { "/" } else { path };
                if resources.probe(probed) == ResourceKind::Directory {
                    result.clear_handler();
                    result.redirect_path = Some(format!("{uri}/"));
                }
            }
        }
    }
}

/// Try each welcome file appended to the directory `path`.
///
/// The first pass accepts exact and wildcard matches, then extension or
/// default matches for files that exist. The second pass accepts extension
/// matches for names with no backing file, for handlers that generate
/// content, unless the handler is resource-only.
fn map_welcome_files<H, A, W>(
    version: &ApplicationVersion<A, W>,
    handlers: &HandlerSet<W>,
    path: &str,
    result: &mut MappingResult<H, A, W>,
) {
    let welcome_files = version.welcome_files();
    let mut candidate = String::with_capacity(path.len() + 16);

    for welcome in welcome_files.iter() {
        assign(&mut candidate, path);
        candidate.push_str(welcome);

        map_exact(&handlers.exact, &candidate, result);
        if result.handler.is_none() {
            map_wildcard(&handlers.wildcard, handlers.nesting, &candidate, result);
        }
        if result.handler.is_none() {
            let is_file = version
                .resources()
                .is_some_and(|r| r.probe(&candidate) == ResourceKind::File);
            if is_file {
                map_extension(&handlers.extension, &candidate, result, true);
                if result.handler.is_none() {
                    if let Some(default) = &handlers.default {
                        result.set_handler(default.target(), MatchKind::Default, &candidate, &candidate);
                    }
                }
            }
        }
        if result.handler.is_some() {
            return;
        }
    }

    for welcome in welcome_files.iter() {
        assign(&mut candidate, path);
        candidate.push_str(welcome);
        map_extension(&handlers.extension, &candidate, result, false);
        if result.handler.is_some() {
            return;
        }
    }
}

fn map_exact<H, A, W>(
    handlers: &[Arc<MappedHandler<W>>],
    path: &str,
    result: &mut MappingResult<H, A, W>,
) {
    let Some(handler) = table::exact_find(handlers, path) else {
        return;
    };
    if path == "/" {
        // The application root reports an empty application path and `/`
        // as extra path, so handler-relative arithmetic downstream still adds up.
        result.set_handler(handler.target(), MatchKind::ApplicationRoot, handler.name(), "");
        assign(&mut result.extra_path, "/");
        result.application_path.clear();
    } else {
        result.set_handler(handler.target(), MatchKind::Exact, handler.name(), handler.name());
    }
}

fn map_wildcard<H, A, W>(
    handlers: &[Arc<MappedHandler<W>>],
    nesting: usize,
    path: &str,
    result: &mut MappingResult<H, A, W>,
) {
    let Some(pos) = table::find_prefix(handlers, path, nesting) else {
        return;
    };
    let handler = &handlers[pos];
    result.set_handler(handler.target(), MatchKind::Path, path, handler.name());
    assign(&mut result.extra_path, &path[handler.name().len()..]);
    result.template_match = handler.flags().template;
}

fn map_extension<H, A, W>(
    handlers: &[Arc<MappedHandler<W>>],
    path: &str,
    result: &mut MappingResult<H, A, W>,
    resource_expected: bool,
) {
    let Some(slash) = path.rfind('/') else {
        return;
    };
    let file = &path[slash + 1..];
    let Some(dot) = file.rfind('.') else {
        return;
    };
    let Some(handler) = table::exact_find(handlers, &file[dot + 1..]) else {
        return;
    };
    if resource_expected || !handler.flags().resource_only {
        result.set_handler(handler.target(), MatchKind::Extension, path, path);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::application::ApplicationSettings;
    use crate::mapping::handler::HandlerMapping;

    type TestMapper = Mapper<&'static str, &'static str, &'static str>;

    fn deploy(mapper: &TestMapper, host: &Arc<&'static str>, path: &str, app: &Arc<&'static str>) {
        let outcome = mapper
            .add_application_version("example.com", host.clone(), ApplicationDeployment::new(path, app.clone()))
            .unwrap();
        assert_eq!(outcome, Registration::Added);
    }

    #[test]
    fn test_add_host_idempotence_and_conflict() {
        let mapper = TestMapper::new();
        let h1 = Arc::new("h1");
        let h2 = Arc::new("h2");
        assert_eq!(mapper.add_host("Example.com", &[], h1.clone()), Registration::Added);
        assert_eq!(mapper.add_host("example.com", &["www.example.com"], h1.clone()), Registration::Unchanged);
        assert_eq!(mapper.add_host("example.com", &["other.example.com"], h2), Registration::Rejected);

        assert_eq!(mapper.host_names(), vec!["example.com"]);
        assert_eq!(mapper.hosts().len(), 2);
        let result = mapper.lookup("other.example.com", "/", None);
        assert!(result.host.is_none());
    }

    #[test]
    fn test_alias_lifecycle() {
        let mapper = TestMapper::new();
        let host = Arc::new("host");
        mapper.add_host("example.com", &[], host.clone());

        assert_eq!(mapper.add_host_alias("example.com", "www.example.com").unwrap(), Registration::Added);
        assert_eq!(mapper.add_host_alias("example.com", "www.example.com").unwrap(), Registration::Unchanged);
        assert_eq!(mapper.add_host_alias("example.com", "example.com").unwrap(), Registration::Unchanged);
        assert!(matches!(
            mapper.add_host_alias("nope.com", "x.com"),
            Err(MapperError::UnknownHost(_))
        ));

        mapper.add_host("other.com", &[], Arc::new("other"));
        assert_eq!(mapper.add_host_alias("other.com", "www.example.com").unwrap(), Registration::Rejected);

        assert!(!mapper.remove_host_alias("example.com"));
        assert!(mapper.remove_host_alias("www.example.com"));
        assert!(mapper.lookup("www.example.com", "/", None).host.is_none());
        assert!(mapper.lookup("example.com", "/", None).host.is_some());
    }

    #[test]
    fn test_remove_host_takes_aliases() {
        let mapper = TestMapper::new();
        mapper.add_host("example.com", &["www.example.com", "*.example.net"], Arc::new("h"));
        assert!(!mapper.remove_host("www.example.com"));
        assert!(mapper.remove_host("EXAMPLE.com"));
        assert!(mapper.hosts().is_empty());
        assert!(!mapper.remove_host("example.com"));
    }

    #[test]
    fn test_application_under_alias_is_refused() {
        let mapper = TestMapper::new();
        let host = Arc::new("h");
        mapper.add_host("example.com", &["www.example.com"], host.clone());
        let err = mapper
            .add_application_version("www.example.com", host, ApplicationDeployment::new("/app", Arc::new("a")))
            .unwrap_err();
        assert_eq!(err, MapperError::HostIsAlias("www.example.com".into()));
    }

    #[test]
    fn test_version_registration_outcomes() {
        let mapper = TestMapper::new();
        let host = Arc::new("h");
        let app = Arc::new("a");
        deploy(&mapper, &host, "/app", &app);

        let again = mapper
            .add_application_version("example.com", host.clone(), ApplicationDeployment::new("/app", app.clone()))
            .unwrap();
        assert_eq!(again, Registration::Unchanged);

        let clash = mapper
            .add_application_version("example.com", host.clone(), ApplicationDeployment::new("/app", Arc::new("b")))
            .unwrap();
        assert_eq!(clash, Registration::Rejected);
        let result = mapper.lookup("example.com", "/app/x", None);
        assert!(Arc::ptr_eq(result.application.as_ref().unwrap(), &app));
    }

    #[test]
    fn test_invalid_pattern_blocks_deployment() {
        let mapper = TestMapper::new();
        let deployment = ApplicationDeployment::new("/app", Arc::new("a"))
            .handler(HandlerMapping::new("/ok", Arc::new("w")))
            .handler(HandlerMapping::new("bad", Arc::new("w")));
        let err = mapper
            .add_application_version("example.com", Arc::new("h"), deployment)
            .unwrap_err();
        assert!(matches!(err, MapperError::InvalidPattern { .. }));
        assert!(mapper.hosts().is_empty());
    }

    #[test]
    fn test_find_application_version_errors() {
        let mapper = TestMapper::new();
        deploy(&mapper, &Arc::new("h"), "/app", &Arc::new("a"));

        assert!(mapper.find_application_version(VersionRef::new("example.com", "/app", "")).is_ok());
        assert!(matches!(
            mapper.find_application_version(VersionRef::new("nope", "/app", "")),
            Err(MapperError::UnknownHost(_))
        ));
        assert!(matches!(
            mapper.find_application_version(VersionRef::new("example.com", "/other", "")),
            Err(MapperError::UnknownApplication { .. })
        ));
        assert!(matches!(
            mapper.find_application_version(VersionRef::new("example.com", "/app", "9")),
            Err(MapperError::UnknownVersion { .. })
        ));
    }

    #[test]
    fn test_remove_last_version_unmounts_application() {
        let mapper = TestMapper::new();
        let host = Arc::new("h");
        deploy(&mapper, &host, "", &Arc::new("root"));
        deploy(&mapper, &host, "/app/sub", &Arc::new("sub"));

        let result = mapper.lookup("example.com", "/app/sub/x", None);
        assert_eq!(result.application_path, "/app/sub");

        assert!(mapper.remove_application_version(VersionRef::new("example.com", "/app/sub", "")));
        assert!(!mapper.remove_application_version(VersionRef::new("example.com", "/app/sub", "")));
        let result = mapper.lookup("example.com", "/app/sub/x", None);
        assert_eq!(result.application_path, "");

        let host = mapper.exact_host("example.com").unwrap();
        assert_eq!(host.applications().nesting(), 0);
    }

    #[test]
    fn test_resolve_within_application() {
        let mapper = TestMapper::new();
        let app = Arc::new("a");
        let worker = Arc::new("worker");
        let deployment = ApplicationDeployment::new("/app", app.clone())
            .handler(HandlerMapping::new("/worker/*", worker.clone()));
        mapper.add_application_version("example.com", Arc::new("h"), deployment).unwrap();

        let mut result = MappingResult::new();
        mapper.resolve_within_application(&app, "/app/worker/x", &mut result);
        assert!(Arc::ptr_eq(result.handler.as_ref().unwrap(), &worker));
        assert_eq!(result.extra_path, "/x");
        assert!(result.host.is_none());

        mapper.resolve_within_application(&Arc::new("unknown"), "/app/worker/x", &mut result);
        assert!(result.handler.is_none());

        mapper.remove_application_version(VersionRef::new("example.com", "/app", ""));
        mapper.resolve_within_application(&app, "/app/worker/x", &mut result);
        assert!(result.application.is_none());
    }

    #[test]
    fn test_welcome_file_admin() {
        let mapper = TestMapper::new();
        deploy(&mapper, &Arc::new("h"), "/app", &Arc::new("a"));
        let at = VersionRef::new("example.com", "/app", "");

        assert_eq!(mapper.add_welcome_file(at, "index.html").unwrap(), Registration::Added);
        assert_eq!(mapper.add_welcome_file(at, "index.html").unwrap(), Registration::Unchanged);
        assert!(mapper.remove_welcome_file(at, "index.html").unwrap());
        assert!(!mapper.remove_welcome_file(at, "index.html").unwrap());
        mapper.add_welcome_file(at, "a").unwrap();
        mapper.clear_welcome_files(at).unwrap();
        assert!(mapper.find_application_version(at).unwrap().welcome_files().is_empty());
        assert!(mapper.clear_welcome_files(VersionRef::new("x", "/", "")).is_err());

        for bad in ["", "/index.html"] {
            assert_eq!(
                mapper.add_welcome_file(at, bad),
                Err(MapperError::InvalidWelcomeFile(bad.to_string()))
            );
        }
        assert!(mapper.find_application_version(at).unwrap().welcome_files().is_empty());
    }

    #[test]
    fn test_redeploy_keeps_runtime_state() {
        let mapper = TestMapper::new();
        let host = Arc::new("h");
        let app = Arc::new("a");
        let hello = Arc::new("hello");
        deploy(&mapper, &host, "/app", &app);
        let at = VersionRef::new("example.com", "/app", "");
        mapper.add_handler(at, "/hello", hello.clone(), HandlerFlags::default()).unwrap();
        mapper.add_welcome_file(at, "index.html").unwrap();
        let before = mapper.find_application_version(at).unwrap();

        let again = mapper
            .add_application_version(
                "example.com",
                host.clone(),
                ApplicationDeployment::new("/app", app.clone()).handler(HandlerMapping::new("/other", Arc::new("o"))),
            )
            .unwrap();
        assert_eq!(again, Registration::Unchanged);

        let after = mapper.find_application_version(at).unwrap();
        assert!(Arc::ptr_eq(&before, &after));
        assert_eq!(after.welcome_files().to_vec(), vec!["index.html".to_string()]);
        let result = mapper.lookup("example.com", "/app/hello", None);
        assert!(Arc::ptr_eq(result.handler.as_ref().unwrap(), &hello));
        assert!(mapper.lookup("example.com", "/app/other", None).handler.is_none());

        // The indexed version is still the published one.
        let mut within = MappingResult::new();
        mapper.resolve_within_application(&app, "/app/hello", &mut within);
        assert!(Arc::ptr_eq(within.handler.as_ref().unwrap(), &hello));
    }

    #[test]
    fn test_redeploy_keeps_pause() {
        let mapper = TestMapper::new();
        let host = Arc::new("h");
        let app = Arc::new("a");
        deploy(&mapper, &host, "/app", &app);
        let at = VersionRef::new("example.com", "/app", "");
        assert!(mapper.pause_application_version(at, &app));

        mapper
            .add_application_version("example.com", host, ApplicationDeployment::new("/app", app.clone()))
            .unwrap();
        assert!(mapper.find_application_version(at).unwrap().is_paused());
    }

    #[test]
    fn test_default_handler_conflict_keeps_first() {
        let mapper = TestMapper::new();
        let app = Arc::new("a");
        let fallback = Arc::new("fallback");
        let deployment = ApplicationDeployment::new("/app", app).handler(HandlerMapping::new("/", fallback.clone()));
        mapper.add_application_version("example.com", Arc::new("h"), deployment).unwrap();
        let at = VersionRef::new("example.com", "/app", "");

        let outcome = mapper
            .add_handler(at, "/", Arc::new("intruder"), HandlerFlags::default())
            .unwrap();
        assert_eq!(outcome, Registration::Rejected);
        let result = mapper.lookup("example.com", "/app/zzz", None);
        assert!(Arc::ptr_eq(result.handler.as_ref().unwrap(), &fallback));
    }

    #[test]
    fn test_default_host_name_is_normalised() {
        let mapper = TestMapper::new();
        mapper.set_default_host_name(Some("LocalHost"));
        assert_eq!(mapper.default_host_name().as_deref(), Some("localhost"));
        mapper.set_default_host_name(None);
        assert!(mapper.default_host_name().is_none());

        let settings = ApplicationSettings::default();
        assert!(settings.root_redirect);
        assert!(!settings.directory_redirect);
    }
}
