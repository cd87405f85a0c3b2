//! Model conversion from gateway records to host-facing types.

use crate::gateway::{RepoRecord, TeamRecord};
use crate::model::{RepoSummary, RepoTeam, Team, Visibility};

/// Determine visibility from a repository record.
///
/// Older payloads omit `visibility`; those fall back to the `private` flag,
/// which cannot express `internal`.
fn repo_visibility(record: &RepoRecord) -> Visibility {
    record
        .visibility
        .unwrap_or_else(|| Visibility::from_private_flag(record.private))
}

impl From<&RepoRecord> for RepoSummary {
    fn from(record: &RepoRecord) -> Self {
        Self {
            name: record.name.clone(),
            full_name: record.full_name.clone(),
            url: record.html_url.clone(),
            topics: record.topics.clone(),
            archived: record.archived,
            public: !record.private,
            visibility: repo_visibility(record),
            is_fork: record.fork,
            default_branch: record.default_branch.clone(),
            can_manage: record.permissions.is_some_and(|p| p.can_manage()),
        }
    }
}

impl From<&TeamRecord> for Team {
    fn from(record: &TeamRecord) -> Self {
        Self {
            name: record.name.clone(),
            slug: record.slug.clone(),
            url: record.html_url.clone(),
            member_count: record.members_count.unwrap_or(0),
        }
    }
}

impl From<&TeamRecord> for RepoTeam {
    fn from(record: &TeamRecord) -> Self {
        Self {
            name: record.name.clone(),
            slug: record.slug.clone(),
            permission: record.permission.clone().unwrap_or_default(),
        }
    }
}
