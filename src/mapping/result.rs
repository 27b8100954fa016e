//! Per-request mapping output.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;

/// How the handler in a [`MappingResult`] was chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchKind {
    /// Exact match on the application root (`""` pattern).
    ApplicationRoot,
    /// Exact path pattern.
    Exact,
    /// Path wildcard (`/prefix/*`).
    Path,
    /// Extension wildcard (`*.ext`).
    Extension,
    /// Default handler (`/`).
    Default,
}

/// Output of [`Mapper::resolve`](crate::mapping::Mapper::resolve).
///
/// Owned by the caller and reused across requests: `resolve` recycles it
/// first, and string fields keep their allocations between uses. Any field
/// left unset means resolution stopped before reaching it.
pub struct MappingResult<H, A, W> {
    pub host: Option<Arc<H>>,
    pub application: Option<Arc<A>>,
    /// Targets of every version of the application, when there is more than one.
    pub applications: Vec<Arc<A>>,
    pub application_slash_count: usize,
    pub handler: Option<Arc<W>>,
    /// The handler was reached through a path wildcard and processes templates.
    pub template_match: bool,
    pub match_kind: Option<MatchKind>,
    pub application_path: String,
    /// Path relative to the application that the handler will see.
    pub request_path: String,
    /// The part of the request path the handler pattern consumed.
    pub handler_path: String,
    /// The remainder after `handler_path`.
    pub extra_path: String,
    /// When set, the caller must redirect here instead of dispatching.
    pub redirect_path: Option<String>,
}

impl<H, A, W> Default for MappingResult<H, A, W> {
    fn default() -> Self {
        Self {
            host: None,
            application: None,
            applications: Vec::new(),
            application_slash_count: 0,
            handler: None,
            template_match: false,
            match_kind: None,
            application_path: String::new(),
            request_path: String::new(),
            handler_path: String::new(),
            extra_path: String::new(),
            redirect_path: None,
        }
    }
}

impl<H, A, W> MappingResult<H, A, W> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear every field, keeping string capacity.
    pub fn recycle(&mut self) {
        self.host = None;
        self.application = None;
        self.applications.clear();
        self.application_slash_count = 0;
        self.handler = None;
        self.template_match = false;
        self.match_kind = None;
        self.application_path.clear();
        self.request_path.clear();
        self.handler_path.clear();
        self.extra_path.clear();
        self.redirect_path = None;
    }

    pub fn is_redirect(&self) -> bool {
        self.redirect_path.is_some()
    }

    /// Forget the handler selection but keep host and application.
    pub(crate) fn clear_handler(&mut self) {
        self.handler = None;
        self.template_match = false;
        self.match_kind = None;
        self.request_path.clear();
        self.handler_path.clear();
        self.extra_path.clear();
    }

    pub(crate) fn set_handler(&mut self, handler: &Arc<W>, kind: MatchKind, request_path: &str, handler_path: &str) {
        self.handler = Some(handler.clone());
        self.match_kind = Some(kind);
        assign(&mut self.request_path, request_path);
        assign(&mut self.handler_path, handler_path);
    }
}

/// Overwrite a reusable string field in place.
pub(crate) fn assign(field: &mut String, value: &str) {
    field.clear();
    field.push_str(value);
}

impl<H, A, W> fmt::Debug for MappingResult<H, A, W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MappingResult")
            .field("host", &self.host.is_some())
            .field("application", &self.application.is_some())
            .field("versions", &self.applications.len())
            .field("handler", &self.handler.is_some())
            .field("match_kind", &self.match_kind)
            .field("application_path", &self.application_path)
            .field("request_path", &self.request_path)
            .field("handler_path", &self.handler_path)
            .field("extra_path", &self.extra_path)
            .field("redirect_path", &self.redirect_path)
            .finish()
    }
}
