//! Version history listing

use super::store::VersionedStore;
use super::version::{Version, VersionId};
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Filtered, ordered listing of versions
///
/// Built by `VersionedStore::versions()`. Each call to `iter` starts a new
/// pass bounded by the head at that moment, so versions committed during
/// iteration are not visited.
#[derive(Clone)]
pub struct VersionQuery<'a> {
    store: &'a VersionedStore,
    oldest_first: bool,
    created_after: Option<DateTime<Utc>>,
    created_before: Option<DateTime<Utc>>,
    message_contains: Option<String>,
    limit: Option<usize>,
}

impl<'a> VersionQuery<'a> {
    pub(crate) fn new(store: &'a VersionedStore) -> Self {
        Self {
            store,
            oldest_first: false,
            created_after: None,
            created_before: None,
            message_contains: None,
            limit: None,
        }
    }

    pub fn oldest_first(mut self) -> Self {
        self.oldest_first = true;
        self
    }

    /// Newest version first (default)
    pub fn newest_first(mut self) -> Self {
        self.oldest_first = false;
        self
    }

    /// Only versions created at or after `ts`
    pub fn created_after(mut self, ts: DateTime<Utc>) -> Self {
        self.created_after = Some(ts);
        self
    }

    /// Only versions created strictly before `ts`
    pub fn created_before(mut self, ts: DateTime<Utc>) -> Self {
        self.created_before = Some(ts);
        self
    }

    /// Only versions whose message contains `needle` (case-insensitive)
    pub fn message_contains(mut self, needle: impl Into<String>) -> Self {
        self.message_contains = Some(needle.into().to_lowercase());
        self
    }

    pub fn limit(mut self, n: usize) -> Self {
        self.limit = Some(n);
        self
    }

    pub fn iter(&self) -> VersionIter<'a> {
        let head = self.store.head_id().map_or(0, |id| id.as_u64());
        let next = if self.oldest_first { 1 } else { head };
        VersionIter {
            query: self.clone(),
            next,
            head,
            remaining: self.limit,
        }
    }

    fn matches(&self, version: &Version) -> bool {
        if let Some(after) = self.created_after {
            if version.created_at() < after {
                return false;
            }
        }
        if let Some(before) = self.created_before {
            if version.created_at() >= before {
                return false;
            }
        }
        if let Some(needle) = &self.message_contains {
            match version.message() {
                Some(message) if message.to_lowercase().contains(needle.as_str()) => {}
                _ => return false,
            }
        }
        true
    }
}

impl<'a> IntoIterator for VersionQuery<'a> {
    type Item = Arc<Version>;
    type IntoIter = VersionIter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'a> IntoIterator for &VersionQuery<'a> {
    type Item = Arc<Version>;
    type IntoIter = VersionIter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Lazy iterator over a `VersionQuery`
///
/// Takes the store's read lock only for the duration of each `next` call.
pub struct VersionIter<'a> {
    query: VersionQuery<'a>,
    /// Next id to visit; 0 or `head + 1` means exhausted
    next: u64,
    head: u64,
    remaining: Option<usize>,
}

impl<'a> Iterator for VersionIter<'a> {
    type Item = Arc<Version>;

    fn next(&mut self) -> Option<Self::Item> {
        while self.remaining != Some(0) && self.next >= 1 && self.next <= self.head {
            let id = VersionId::new(self.next);
            if self.query.oldest_first {
                self.next += 1;
            } else {
                self.next -= 1;
            }

            let version = self.query.store.version(id)?;
            if self.query.matches(&version) {
                if let Some(remaining) = self.remaining.as_mut() {
                    *remaining -= 1;
                }
                return Some(version);
            }
        }
        None
    }
}

impl VersionedStore {
    /// Query over the version history, newest first by default
    pub fn versions(&self) -> VersionQuery<'_> {
        VersionQuery::new(self)
    }
}

#[cfg(test)]
mod tests {
    use crate::rdf::{Literal, NamedNode, Quad, RdfPredicate};
    use crate::versioning::{Operation, VersionedStore};
    use chrono::Utc;

    fn commit(store: &VersionedStore, n: u32, message: Option<&str>) {
        let quad = Quad::triple(
            NamedNode::new(&format!("http://example.org/s{n}")).unwrap(),
            RdfPredicate::new("http://example.org/p").unwrap(),
            Literal::new_simple_literal(n.to_string()),
        );
        store.commit(vec![Operation::add([quad])], message).unwrap();
    }

    fn ids<I: IntoIterator<Item = std::sync::Arc<crate::versioning::Version>>>(iter: I) -> Vec<u64> {
        iter.into_iter().map(|v| v.id().as_u64()).collect()
    }

    #[test]
    fn test_ordering_and_limit() {
        let store = VersionedStore::in_memory();
        for n in 1..=4 {
            commit(&store, n, None);
        }
        assert_eq!(ids(store.versions()), vec![4, 3, 2, 1]);
        assert_eq!(ids(store.versions().oldest_first()), vec![1, 2, 3, 4]);
        assert_eq!(ids(store.versions().limit(2)), vec![4, 3]);
        assert_eq!(ids(store.versions().oldest_first().limit(0)), Vec::<u64>::new());
    }

    #[test]
    fn test_message_filter() {
        let store = VersionedStore::in_memory();
        commit(&store, 1, Some("Add Alice"));
        commit(&store, 2, None);
        commit(&store, 3, Some("Change ALICE's mailbox"));
        assert_eq!(ids(store.versions().message_contains("alice")), vec![3, 1]);
    }

    #[test]
    fn test_time_filters() {
        let store = VersionedStore::in_memory();
        commit(&store, 1, None);
        let future = Utc::now() + chrono::Duration::hours(1);
        assert!(ids(store.versions().created_after(future)).is_empty());
        assert_eq!(ids(store.versions().created_before(future)), vec![1]);
    }

    #[test]
    fn test_iteration_is_bounded_and_restartable() {
        let store = VersionedStore::in_memory();
        commit(&store, 1, None);
        commit(&store, 2, None);

        let query = store.versions().oldest_first();
        let mut iter = query.iter();
        assert_eq!(iter.next().unwrap().id().as_u64(), 1);
        commit(&store, 3, None);
        assert_eq!(iter.next().unwrap().id().as_u64(), 2);
        assert!(iter.next().is_none());

        assert_eq!(ids(&query), vec![1, 2, 3]);
    }
}
