//! Resource-existence probes.
//!
//! Welcome-file resolution and directory redirects need to know whether an
//! application-relative path names a file, a directory, or nothing. The
//! mapper only asks; it never reads content.

use std::fmt;
use std::path::{Component, Path, PathBuf};

/// What a probed path denotes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    Missing,
    File,
    Directory,
}

/// Capability to check whether an application-relative path exists.
pub trait ResourceProbe: Send + Sync + fmt::Debug {
    /// `path` is relative to the application and starts with `/`.
    fn probe(&self, path: &str) -> ResourceKind;
}

/// Probe backed by a directory on the local filesystem.
#[derive(Debug, Clone)]
pub struct FsResources {
    root: PathBuf,
}

impl FsResources {
    /// Create a probe rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Join `path` onto the root, refusing anything that would climb out.
    fn locate(&self, path: &str) -> Option<PathBuf> {
        let relative = Path::new(path.trim_start_matches('/'));
        let mut located = self.root.clone();
        for component in relative.components() {
            match component {
                Component::Normal(part) => located.push(part),
                Component::CurDir => {}
                Component::ParentDir | Component::RootDir | Component::Prefix(_) => return None,
            }
        }
        Some(located)
    }
}

impl ResourceProbe for FsResources {
    fn probe(&self, path: &str) -> ResourceKind {
        let Some(located) = self.locate(path) else {
            tracing::trace!(path = %path, "Refusing to probe path outside the document root");
            return ResourceKind::Missing;
        };
        match std::fs::metadata(&located) {
            Ok(meta) if meta.is_dir() => ResourceKind::Directory,
            Ok(_) => ResourceKind::File,
            Err(_) => ResourceKind::Missing,
        }
    }
}
