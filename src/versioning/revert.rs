//! Revert engine
//!
//! A revert never rewinds the log. It commits, as a new version, the inverse
//! of the diff between a target version and a later source version.

use super::store::VersionedStore;
use super::version::{Version, VersionId};
use super::{VersionError, VersionResult};
use std::sync::Arc;
use tracing::info;

impl VersionedStore {
    /// Undo the changes made between `target` and `source`
    ///
    /// Commits the inverse of `diff(target, source)`. When `source` is head
    /// the store content afterwards equals `target`'s content. Requires
    /// `target <= source`; an empty range commits an empty version.
    pub fn revert(
        &self,
        target: VersionId,
        source: VersionId,
        message: Option<&str>,
    ) -> VersionResult<Arc<Version>> {
        if target > source {
            return Err(VersionError::InvalidRange {
                from: target,
                to: source,
            });
        }

        // diff and commit under one writer lock so no commit lands in between
        let _writer = self.acquire_writer()?;
        let diff = self.diff(target, source)?;
        let removed = diff.additions().len();
        let restored = diff.removals().len();

        let message = message
            .map(str::to_string)
            .unwrap_or_else(|| format!("Revert to version {}", target));
        let version = self.commit_locked(diff.inverse().into_operations(), Some(message))?;

        info!(
            "Reverted versions {}..{} as version {}: {} quads removed, {} restored",
            target,
            source,
            version.id(),
            removed,
            restored
        );
        Ok(version)
    }

    /// Restore head content to `target`
    pub fn revert_to(&self, target: VersionId, message: Option<&str>) -> VersionResult<Arc<Version>> {
        let head = self.head_id().ok_or(VersionError::EmptyHistory)?;
        self.revert(target, head, message)
    }
}
