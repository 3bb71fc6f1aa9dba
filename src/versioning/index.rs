//! Version index: head tracking, tags and version references

use super::version::VersionId;
use super::{VersionError, VersionResult};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use tracing::warn;

/// Maps version ids to log positions and tag names to versions
#[derive(Debug, Default, Clone)]
pub struct VersionIndex {
    head: Option<VersionId>,
    tags: BTreeMap<String, VersionId>,
}

impl VersionIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn head(&self) -> Option<VersionId> {
        self.head
    }

    /// Record a newly appended version as head
    pub(crate) fn advance(&mut self, id: VersionId) {
        debug_assert_eq!(
            id,
            self.head.map(|h| h.next()).unwrap_or(VersionId::FIRST),
            "head must advance by one"
        );
        self.head = Some(id);
    }

    /// Ensure the id names a committed version
    pub fn check(&self, id: VersionId) -> VersionResult<VersionId> {
        match self.head {
            Some(head) if id.as_u64() >= 1 && id <= head => Ok(id),
            _ => Err(VersionError::UnknownVersion(id)),
        }
    }

    /// Log position of a version
    pub fn position(&self, id: VersionId) -> VersionResult<usize> {
        self.check(id).map(|id| id.index())
    }

    /// Walk `offset` versions backward (negative) or forward (positive)
    pub fn relative(&self, id: VersionId, offset: i64) -> VersionResult<VersionId> {
        let id = self.check(id)?;
        let head = self.head.ok_or(VersionError::EmptyHistory)?;
        let target = id.as_u64() as i128 + offset as i128;
        if target < 1 || target > head.as_u64() as i128 {
            return Err(VersionError::OutOfRange {
                version: id,
                offset,
                head,
            });
        }
        Ok(VersionId::new(target as u64))
    }

    /// Resolve a tag name
    pub fn resolve(&self, tag: &str) -> VersionResult<VersionId> {
        self.tags
            .get(tag)
            .copied()
            .ok_or_else(|| VersionError::UnknownTag(tag.to_string()))
    }

    /// Resolve a textual reference against the current head
    pub fn resolve_ref(&self, reference: &VersionRef) -> VersionResult<VersionId> {
        match reference {
            VersionRef::Head => self.head.ok_or(VersionError::EmptyHistory),
            VersionRef::HeadMinus(back) => {
                let head = self.head.ok_or(VersionError::EmptyHistory)?;
                let offset = i64::try_from(*back).map_err(|_| VersionError::OutOfRange {
                    version: head,
                    offset: i64::MIN,
                    head,
                })?;
                self.relative(head, -offset)
            }
            VersionRef::Id(id) => self.check(*id),
            VersionRef::Tag(name) => self.resolve(name),
        }
    }

    /// Bind a new tag. Fails if the name is already bound.
    pub fn create_tag(&mut self, name: &str, id: VersionId) -> VersionResult<()> {
        validate_tag_name(name)?;
        let id = self.check(id)?;
        if self.tags.contains_key(name) {
            return Err(VersionError::TagExists(name.to_string()));
        }
        self.tags.insert(name.to_string(), id);
        Ok(())
    }

    /// Rebind an existing tag, returning its previous version
    pub fn move_tag(&mut self, name: &str, id: VersionId) -> VersionResult<VersionId> {
        let id = self.check(id)?;
        match self.tags.get_mut(name) {
            Some(bound) => Ok(std::mem::replace(bound, id)),
            None => Err(VersionError::UnknownTag(name.to_string())),
        }
    }

    /// Remove a tag, returning the version it pointed to
    pub fn delete_tag(&mut self, name: &str) -> VersionResult<VersionId> {
        self.tags
            .remove(name)
            .ok_or_else(|| VersionError::UnknownTag(name.to_string()))
    }

    /// All tags sorted by name
    pub fn tags(&self) -> Vec<(String, VersionId)> {
        self.tags.iter().map(|(n, v)| (n.clone(), *v)).collect()
    }

    /// Tags bound to one version
    pub fn tags_of(&self, id: VersionId) -> Vec<String> {
        self.tags
            .iter()
            .filter(|(_, v)| **v == id)
            .map(|(n, _)| n.clone())
            .collect()
    }

    /// Load tags recovered from disk, dropping any past head
    pub(crate) fn restore_tags(&mut self, tags: impl IntoIterator<Item = (String, VersionId)>) {
        for (name, id) in tags {
            if self.check(id).is_ok() {
                self.tags.insert(name, id);
            } else {
                warn!("Dropping tag '{}' pointing at missing version {}", name, id);
            }
        }
    }
}

fn validate_tag_name(name: &str) -> VersionResult<()> {
    if name.trim().is_empty() {
        return Err(VersionError::ValidationFailure(
            "tag name must not be blank".to_string(),
        ));
    }
    Ok(())
}

/// A textual reference to a version
///
/// Accepted forms: `HEAD`, `HEAD^`, `HEAD~N`, a version number, `tag:NAME`,
/// or any other string taken as a tag name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionRef {
    Head,
    /// N versions before head
    HeadMinus(u64),
    Id(VersionId),
    Tag(String),
}

impl FromStr for VersionRef {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(VersionError::InvalidReference(s.to_string()));
        }
        if let Some(name) = s.strip_prefix("tag:") {
            return Ok(VersionRef::Tag(name.to_string()));
        }
        if s.eq_ignore_ascii_case("head") {
            return Ok(VersionRef::Head);
        }
        let head_suffix = s
            .get(..4)
            .filter(|h| h.eq_ignore_ascii_case("head"))
            .and_then(|_| s.get(4..));
        if let Some(rest) = head_suffix {
            if rest.chars().all(|c| c == '^') {
                return Ok(VersionRef::HeadMinus(rest.len() as u64));
            }
            if let Some(n) = rest.strip_prefix('~') {
                return n
                    .parse::<u64>()
                    .map(VersionRef::HeadMinus)
                    .map_err(|_| VersionError::InvalidReference(s.to_string()));
            }
        }
        if let Ok(n) = s.parse::<u64>() {
            return Ok(VersionRef::Id(VersionId::new(n)));
        }
        Ok(VersionRef::Tag(s.to_string()))
    }
}

impl fmt::Display for VersionRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VersionRef::Head => write!(f, "HEAD"),
            VersionRef::HeadMinus(n) => write!(f, "HEAD~{}", n),
            VersionRef::Id(id) => write!(f, "{}", id),
            VersionRef::Tag(name) => write!(f, "tag:{}", name),
        }
    }
}
