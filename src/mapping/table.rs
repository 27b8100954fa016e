//! Sorted name tables.
//!
//! # Responsibilities
//! - Binary search for the greatest entry `<=` a key (case-sensitive and
//!   ASCII case-insensitive)
//! - Copy-on-write insert/remove that never touch the input slice
//! - Slash arithmetic used by the prefix-narrowing searches
//!
//! # Design Decisions
//! - Pure functions over slices: a published table is never mutated, so
//!   readers can walk an old snapshot while a writer builds the next one
//! - Byte-wise ordering (same as `str::cmp`), so a prefix sorts before every
//!   longer name that extends it

use std::cmp::Ordering;
use std::sync::Arc;

/// An entry that can live in a sorted name table.
pub trait Named {
    fn name(&self) -> &str;
}

impl<T: Named + ?Sized> Named for Arc<T> {
    fn name(&self) -> &str {
        (**self).name()
    }
}

/// Compare two names byte-wise, folding ASCII upper case to lower case.
pub fn cmp_ignore_case(a: &str, b: &str) -> Ordering {
    a.bytes()
        .map(|c| c.to_ascii_lowercase())
        .cmp(b.bytes().map(|c| c.to_ascii_lowercase()))
}

/// Index of the greatest entry whose name is `<= key`, or `None` if `key`
/// sorts before every entry.
pub fn find<E: Named>(entries: &[E], key: &str) -> Option<usize> {
    entries
        .partition_point(|e| e.name() <= key)
        .checked_sub(1)
}

/// Case-insensitive variant of [`find`]. Entries must be sorted by their
/// lower-cased names.
pub fn find_ignore_case<E: Named>(entries: &[E], key: &str) -> Option<usize> {
    entries
        .partition_point(|e| cmp_ignore_case(e.name(), key) != Ordering::Greater)
        .checked_sub(1)
}

/// The entry named exactly `key`.
pub fn exact_find<'a, E: Named>(entries: &'a [E], key: &str) -> Option<&'a E> {
    let entry = &entries[find(entries, key)?];
    (entry.name() == key).then_some(entry)
}

/// The entry whose name equals `key` ignoring ASCII case.
pub fn exact_find_ignore_case<'a, E: Named>(entries: &'a [E], key: &str) -> Option<&'a E> {
    let entry = &entries[find_ignore_case(entries, key)?];
    entry.name().eq_ignore_ascii_case(key).then_some(entry)
}

/// A new table with `entry` at its sorted position, or `None` if an entry
/// with the same name is already present.
pub fn insert<E: Named + Clone>(entries: &[E], entry: E) -> Option<Vec<E>> {
    let at = match find(entries, entry.name()) {
        Some(pos) if entries[pos].name() == entry.name() => return None,
        Some(pos) => pos + 1,
        None => 0,
    };
    let mut table = Vec::with_capacity(entries.len() + 1);
    table.extend_from_slice(&entries[..at]);
    table.push(entry);
    table.extend_from_slice(&entries[at..]);
    Some(table)
}

/// A new table without the entry named `name`, or `None` if there is no
/// such entry.
pub fn remove<E: Named + Clone>(entries: &[E], name: &str) -> Option<Vec<E>> {
    let at = find(entries, name).filter(|&pos| entries[pos].name() == name)?;
    let mut table = Vec::with_capacity(entries.len() - 1);
    table.extend_from_slice(&entries[..at]);
    table.extend_from_slice(&entries[at + 1..]);
    Some(table)
}

/// Number of `/` characters in `name`.
pub fn slash_count(name: &str) -> usize {
    name.bytes().filter(|&c| c == b'/').count()
}

/// Position of the `n`th `/` in `path`, or `path.len()` if there are fewer.
pub fn nth_slash(path: &str, n: usize) -> usize {
    path.bytes()
        .enumerate()
        .filter(|&(_, c)| c == b'/')
        .nth(n.saturating_sub(1))
        .map_or(path.len(), |(pos, _)| pos)
}

/// Position of the last `/` in `path`, or 0 if there is none.
pub fn last_slash(path: &str) -> usize {
    path.rfind('/').unwrap_or(0)
}

/// Find the most specific entry that is `path` itself or a prefix of `path`
/// ending on a `/` boundary.
///
/// The first retry truncates `path` at its `nesting + 1`th slash, since no
/// entry has more segments than that; later retries drop one segment at a
/// time. The loop therefore runs at most once per path segment.
pub fn find_prefix<E: Named>(entries: &[E], path: &str, nesting: usize) -> Option<usize> {
    let mut end = path.len();
    let mut narrowed = false;
    let mut pos = find(entries, path)?;
    loop {
        let candidate = &path[..end];
        let name = entries[pos].name();
        if candidate.starts_with(name)
            && (candidate.len() == name.len() || candidate.as_bytes()[name.len()] == b'/')
        {
            return Some(pos);
        }
        end = if narrowed {
            last_slash(candidate)
        } else {
            narrowed = true;
            nth_slash(candidate, nesting + 1)
        };
        pos = find(entries, &path[..end])?;
    }
}
