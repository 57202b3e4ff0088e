// SPDX-License-Identifier: MPL-2.0
use chrono::{DateTime, Utc};

use crate::{
    request::ReportRequest,
    scanner::{scan_revisions, AuthorAggregate},
    scoring::rank_authors,
    store::{RevisionStore, StoreError, UserStatusStore},
};

#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("failed to read revision history or user status")]
    Store(#[from] StoreError),
}

/// Computes the ranked contribution report for `request` as of now.
///
/// Entries are ordered by descending score. Ranks are positional, the first entry is rank 1.
/// Nothing is cached between calls: every call reads the stores again.
pub fn compute_report<S: RevisionStore, U: UserStatusStore>(
    request: &ReportRequest,
    revisions: &S,
    users: &U,
) -> Result<Vec<AuthorAggregate>, ReportError> {
    compute_report_at(request, Utc::now(), revisions, users)
}

/// Like [`compute_report`], with the end of the window given explicitly.
pub fn compute_report_at<S: RevisionStore, U: UserStatusStore>(
    request: &ReportRequest,
    now: DateTime<Utc>,
    revisions: &S,
    users: &U,
) -> Result<Vec<AuthorAggregate>, ReportError> {
    let aggregates = scan_revisions(request, now, revisions, users)?;
    let mut report = rank_authors(aggregates, request.limit);
    if request.use_real_name {
        resolve_real_names(&mut report, users)?;
    }
    Ok(report)
}

// only ranked authors are looked up
fn resolve_real_names<U: UserStatusStore>(
    report: &mut [AuthorAggregate],
    users: &U,
) -> Result<(), StoreError> {
    for author in report {
        match users.real_name(author.author_id)? {
            Some(real_name) if !real_name.is_empty() => author.display_name = real_name,
            _ => {}
        }
    }
    Ok(())
}
