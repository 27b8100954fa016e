//! Handler sets.
//!
//! # Responsibilities
//! - Hold the four handler categories of one application version
//! - Produce updated copies on add/remove (the set itself is immutable)
//! - Track wildcard nesting so prefix narrowing knows where to start

use std::fmt;
use std::sync::Arc;

use crate::mapping::pattern::HandlerPattern;
use crate::mapping::table::{self, Named};

/// Per-handler behaviour flags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HandlerFlags {
    /// A path-template processor: a directory request that reaches it only
    /// through a path wildcard falls through to welcome-file handling.
    pub template: bool,
    /// Never chosen through an extension match on a welcome file unless a
    /// backing resource exists.
    pub resource_only: bool,
}

/// A handler registered under one name in one handler table.
pub struct MappedHandler<W> {
    name: String,
    target: Arc<W>,
    flags: HandlerFlags,
}

impl<W> MappedHandler<W> {
    pub fn new(name: impl Into<String>, target: Arc<W>, flags: HandlerFlags) -> Self {
        Self {
            name: name.into(),
            target,
            flags,
        }
    }

    pub fn target(&self) -> &Arc<W> {
        &self.target
    }

    pub fn flags(&self) -> HandlerFlags {
        self.flags
    }
}

impl<W> Named for MappedHandler<W> {
    fn name(&self) -> &str {
        &self.name
    }
}

impl<W> fmt::Debug for MappedHandler<W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MappedHandler")
            .field("name", &self.name)
            .field("flags", &self.flags)
            .finish_non_exhaustive()
    }
}

/// A handler to register together with its pattern.
pub struct HandlerMapping<W> {
    pub pattern: String,
    pub target: Arc<W>,
    pub flags: HandlerFlags,
}

impl<W> HandlerMapping<W> {
    pub fn new(pattern: impl Into<String>, target: Arc<W>) -> Self {
        Self {
            pattern: pattern.into(),
            target,
            flags: HandlerFlags::default(),
        }
    }

    pub fn with_flags(mut self, flags: HandlerFlags) -> Self {
        self.flags = flags;
        self
    }
}

/// Outcome of adding a handler to a set.
pub(crate) enum Insertion<W> {
    /// The updated set to publish.
    Changed(HandlerSet<W>),
    /// Same name, same target.
    Unchanged,
    /// Same name, different target.
    Conflict,
}

/// The handlers of one application version.
pub struct HandlerSet<W> {
    pub(crate) exact: Vec<Arc<MappedHandler<W>>>,
    pub(crate) wildcard: Vec<Arc<MappedHandler<W>>>,
    pub(crate) extension: Vec<Arc<MappedHandler<W>>>,
    pub(crate) default: Option<Arc<MappedHandler<W>>>,
    /// Greatest slash count among wildcard prefixes.
    pub(crate) nesting: usize,
}

impl<W> Default for HandlerSet<W> {
    fn default() -> Self {
        Self {
            exact: Vec::new(),
            wildcard: Vec::new(),
            extension: Vec::new(),
            default: None,
            nesting: 0,
        }
    }
}

// Manual impl: deriving would demand `W: Clone` although only `Arc`s are copied.
impl<W> Clone for HandlerSet<W> {
    fn clone(&self) -> Self {
        Self {
            exact: self.exact.clone(),
            wildcard: self.wildcard.clone(),
            extension: self.extension.clone(),
            default: self.default.clone(),
            nesting: self.nesting,
        }
    }
}

impl<W> fmt::Debug for HandlerSet<W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names = |t: &[Arc<MappedHandler<W>>]| t.iter().map(|h| h.name.clone()).collect::<Vec<_>>();
        f.debug_struct("HandlerSet")
            .field("exact", &names(&self.exact))
            .field("wildcard", &names(&self.wildcard))
            .field("extension", &names(&self.extension))
            .field("default", &self.default.is_some())
            .field("nesting", &self.nesting)
            .finish()
    }
}

impl<W> HandlerSet<W> {
    pub fn is_empty(&self) -> bool {
        self.exact.is_empty()
            && self.wildcard.is_empty()
            && self.extension.is_empty()
            && self.default.is_none()
    }

    /// The handler registered for `pattern`, if any.
    pub fn get(&self, pattern: &HandlerPattern) -> Option<&Arc<MappedHandler<W>>> {
        match pattern {
            HandlerPattern::Default => self.default.as_ref(),
            HandlerPattern::Prefix(_) => table::exact_find(&self.wildcard, pattern.key()),
            HandlerPattern::Extension(_) => table::exact_find(&self.extension, pattern.key()),
            HandlerPattern::ApplicationRoot | HandlerPattern::Exact(_) => {
                table::exact_find(&self.exact, pattern.key())
            }
        }
    }

    /// A copy of this set with `target` registered under `pattern`.
    pub(crate) fn with_handler(
        &self,
        pattern: &HandlerPattern,
        target: Arc<W>,
        flags: HandlerFlags,
    ) -> Insertion<W> {
        if let Some(existing) = self.get(pattern) {
            return if Arc::ptr_eq(&existing.target, &target) {
                Insertion::Unchanged
            } else {
                Insertion::Conflict
            };
        }

        let handler = Arc::new(MappedHandler::new(pattern.key(), target, flags));
        let mut set = self.clone();
        match pattern {
            HandlerPattern::Default => set.default = Some(handler),
            HandlerPattern::Prefix(prefix) => {
                if let Some(wildcard) = table::insert(&self.wildcard, handler) {
                    set.wildcard = wildcard;
                    set.nesting = set.nesting.max(table::slash_count(prefix));
                }
            }
            HandlerPattern::Extension(_) => {
                if let Some(extension) = table::insert(&self.extension, handler) {
                    set.extension = extension;
                }
            }
            HandlerPattern::ApplicationRoot | HandlerPattern::Exact(_) => {
                if let Some(exact) = table::insert(&self.exact, handler) {
                    set.exact = exact;
                }
            }
        }
        Insertion::Changed(set)
    }

    /// A copy of this set without `pattern`, or `None` if it is not registered.
    pub(crate) fn without_handler(&self, pattern: &HandlerPattern) -> Option<HandlerSet<W>> {
        let mut set = self.clone();
        match pattern {
            HandlerPattern::Default => {
                set.default.take()?;
            }
            HandlerPattern::Prefix(_) => {
                set.wildcard = table::remove(&self.wildcard, pattern.key())?;
                set.nesting = set
                    .wildcard
                    .iter()
                    .map(|h| table::slash_count(&h.name))
                    .max()
                    .unwrap_or(0);
            }
            HandlerPattern::Extension(_) => {
                set.extension = table::remove(&self.extension, pattern.key())?;
            }
            HandlerPattern::ApplicationRoot | HandlerPattern::Exact(_) => {
                set.exact = table::remove(&self.exact, pattern.key())?;
            }
        }
        Some(set)
    }
}
