//! Keyed collections with range-based prefix queries.
//!
//! Keys sort by stack, then path, then hunk header, so the entries of a
//! stack, a file, or a directory are one contiguous run of the map. A prefix
//! query seeks to the first possible key and stops at the first miss.

use crate::model::{CompositeKey, StackId};
use std::collections::BTreeMap;

/// Which paths of a stack a [`KeyPrefix`] selects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathMatch {
    /// Every path
    Any,
    /// Exactly this path
    Exact(String),
    /// Paths starting with this string, which ends in a separator
    Under(String),
}

/// A `(stack)`, `(stack, file)` or `(stack, directory)` prefix of [`CompositeKey`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyPrefix {
    pub stack_id: Option<StackId>,
    pub path: PathMatch,
}

impl KeyPrefix {
    pub fn stack(stack_id: Option<&StackId>) -> Self {
        Self {
            stack_id: stack_id.cloned(),
            path: PathMatch::Any,
        }
    }

    pub fn file(stack_id: Option<&StackId>, path: &str) -> Self {
        Self {
            stack_id: stack_id.cloned(),
            path: PathMatch::Exact(path.to_string()),
        }
    }

    /// Every path below `dir`. An empty `dir` is the whole stack.
    ///
    /// Matching stops at segment boundaries: `a/b` does not cover `a/b2.txt`.
    pub fn dir(stack_id: Option<&StackId>, dir: &str, separator: char) -> Self {
        let dir = dir.trim_end_matches(separator);
        let path = if dir.is_empty() {
            PathMatch::Any
        } else {
            PathMatch::Under(format!("{dir}{separator}"))
        };
        Self {
            stack_id: stack_id.cloned(),
            path,
        }
    }

    pub fn matches(&self, key: &CompositeKey) -> bool {
        key.stack_id == self.stack_id
            && match &self.path {
                PathMatch::Any => true,
                PathMatch::Exact(path) => key.path == *path,
                PathMatch::Under(dir) => key.path.starts_with(dir.as_str()),
            }
    }

    /// The smallest key this prefix can match.
    fn lower_bound(&self) -> CompositeKey {
        let path = match &self.path {
            PathMatch::Any => "",
            PathMatch::Exact(path) | PathMatch::Under(path) => path,
        };
        CompositeKey::new(self.stack_id.clone(), path, None)
    }
}

/// A normalized collection keyed by [`CompositeKey`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registry<T> {
    entries: BTreeMap<CompositeKey, T>,
}

impl<T> Default for Registry<T> {
    fn default() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }
}

impl<T> Registry<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &CompositeKey) -> Option<&T> {
        self.entries.get(key)
    }

    pub fn contains_key(&self, key: &CompositeKey) -> bool {
        self.entries.contains_key(key)
    }

    pub fn insert(&mut self, key: CompositeKey, value: T) -> Option<T> {
        self.entries.insert(key, value)
    }

    pub fn remove(&mut self, key: &CompositeKey) -> Option<T> {
        self.entries.remove(key)
    }

    /// Entries under `prefix`, in key order.
    pub fn scan<'a>(
        &'a self,
        prefix: &KeyPrefix,
    ) -> impl Iterator<Item = (&'a CompositeKey, &'a T)> + use<'a, T> {
        let prefix = prefix.clone();
        self.entries
            .range(prefix.lower_bound()..)
            .take_while(move |(key, _)| prefix.matches(key))
    }

    pub fn keys_under(&self, prefix: &KeyPrefix) -> Vec<CompositeKey> {
        self.scan(prefix).map(|(key, _)| key.clone()).collect()
    }

    pub fn remove_under(&mut self, prefix: &KeyPrefix) -> usize {
        let keys = self.keys_under(prefix);
        for key in &keys {
            self.entries.remove(key);
        }
        keys.len()
    }

    /// Drop every entry and load `entries`. Later duplicates win.
    pub fn replace_all(&mut self, entries: impl IntoIterator<Item = (CompositeKey, T)>) {
        self.entries = entries.into_iter().collect();
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&CompositeKey, &T)> {
        self.entries.iter()
    }

    pub fn values(&self) -> impl Iterator<Item = &T> {
        self.entries.values()
    }
}

impl<T> IntoIterator for Registry<T> {
    type Item = (CompositeKey, T);
    type IntoIter = std::collections::btree_map::IntoIter<CompositeKey, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl<T> FromIterator<(CompositeKey, T)> for Registry<T> {
    fn from_iter<I: IntoIterator<Item = (CompositeKey, T)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::header::HunkHeader;
    use similar_asserts::assert_eq;

    fn key(stack: Option<&str>, path: &str, old_start: u32) -> CompositeKey {
        CompositeKey::new(
            stack.map(StackId::from),
            path,
            Some(HunkHeader::new(old_start, 1, old_start, 1)),
        )
    }

    fn registry() -> Registry<&'static str> {
        [
            (key(Some("S1"), "a/b.txt", 1), "b1"),
            (key(Some("S1"), "a/b.txt", 9), "b9"),
            (key(Some("S1"), "a/b2.txt", 1), "b2"),
            (key(Some("S1"), "a/b/c.txt", 1), "c"),
            (key(Some("S1"), "a::b.txt", 1), "colons"),
            (key(Some("S2"), "a/b.txt", 1), "other stack"),
            (key(None, "a/b.txt", 1), "unassigned"),
            (CompositeKey::new(Some(StackId::from("S1")), "bin.png", None), "binary"),
        ]
        .into_iter()
        .collect()
    }

    fn values(registry: &Registry<&'static str>, prefix: &KeyPrefix) -> Vec<&'static str> {
        registry.scan(prefix).map(|(_, v)| *v).collect()
    }

    #[test]
    fn file_prefix_respects_path_boundaries() {
        let registry = registry();
        let s1 = StackId::from("S1");
        assert_eq!(
            values(&registry, &KeyPrefix::file(Some(&s1), "a/b.txt")),
            vec!["b1", "b9"]
        );
    }

    #[test]
    fn dir_prefix_stops_at_segment_boundary() {
        let registry = registry();
        let s1 = StackId::from("S1");
        assert_eq!(
            values(&registry, &KeyPrefix::dir(Some(&s1), "a/b", '/')),
            vec!["c"]
        );
        assert_eq!(
            values(&registry, &KeyPrefix::dir(Some(&s1), "a/", '/')),
            vec!["b1", "b9", "c", "b2"]
        );
    }

    #[test]
    fn empty_dir_is_whole_stack() {
        let registry = registry();
        let s1 = StackId::from("S1");
        assert_eq!(
            KeyPrefix::dir(Some(&s1), "", '/'),
            KeyPrefix::stack(Some(&s1))
        );
        assert_eq!(values(&registry, &KeyPrefix::stack(Some(&s1))).len(), 6);
    }

    #[test]
    fn unassigned_lane_is_its_own_stack() {
        let registry = registry();
        assert_eq!(
            values(&registry, &KeyPrefix::stack(None)),
            vec!["unassigned"]
        );
    }

    #[test]
    fn paths_with_key_separator_stay_distinct() {
        let registry = registry();
        let s1 = StackId::from("S1");
        assert_eq!(
            values(&registry, &KeyPrefix::file(Some(&s1), "a::b.txt")),
            vec!["colons"]
        );
    }

    fn keys_of_file<'a>(registry: &'a Registry<&'static str>, path: &str) -> Vec<&'a CompositeKey> {
        let prefix = KeyPrefix::file(Some(&StackId::from("S1")), path);
        registry.scan(&prefix).map(|(key, _)| key).collect()
    }

    #[test]
    fn scan_results_outlive_the_prefix() {
        let registry = registry();
        let keys = keys_of_file(&registry, "a/b2.txt");
        assert_eq!(keys, vec![&key(Some("S1"), "a/b2.txt", 1)]);
    }

    #[test]
    fn remove_under_only_touches_prefix() {
        let mut registry = registry();
        let s1 = StackId::from("S1");
        assert_eq!(registry.remove_under(&KeyPrefix::file(Some(&s1), "a/b.txt")), 2);
        assert_eq!(registry.len(), 6);
        assert!(registry.contains_key(&key(Some("S1"), "a/b2.txt", 1)));
    }

    #[test]
    fn replace_all_drops_old_entries() {
        let mut registry = registry();
        registry.replace_all([(key(None, "x", 1), "x")]);
        assert_eq!(registry.values().copied().collect::<Vec<_>>(), vec!["x"]);
    }
}
