// SPDX-License-Identifier: MPL-2.0
//! Per-author aggregation of revision events.
use chrono::{DateTime, Utc};
use compact_str::CompactString;
use rustc_hash::{FxHashMap, FxHashSet};
use tracing::instrument;

use crate::{
    request::ReportRequest,
    store::{RevisionStore, StoreError, UserStatusStore},
};

/// Contribution statistics of one author over the requested window.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthorAggregate {
    pub author_id: i32,
    pub author_name: CompactString,
    /// Name to show for the author. The real name if the request asks for it and the author set
    /// one, `author_name` otherwise.
    pub display_name: CompactString,
    /// Number of distinct pages edited.
    pub page_count: u64,
    pub edit_count: u64,
    /// Net change in bytes, always `pos_diff + neg_diff`.
    pub size_diff: i64,
    pub pos_diff: i64,
    pub neg_diff: i64,
    /// Composite ranking value, `0.0` until scored by [`crate::scoring`].
    pub score: f64,
}

#[derive(Debug)]
struct Accumulator {
    author_name: CompactString,
    pages: FxHashSet<i32>,
    edit_count: u64,
    pos_diff: i64,
    neg_diff: i64,
}

impl Accumulator {
    fn new(author_name: CompactString) -> Self {
        Self {
            author_name,
            pages: FxHashSet::default(),
            edit_count: 0,
            pos_diff: 0,
            neg_diff: 0,
        }
    }

    fn add(&mut self, page_id: i32, delta: i64) {
        self.pages.insert(page_id);
        self.edit_count += 1;
        if delta > 0 {
            self.pos_diff = self.pos_diff.saturating_add(delta);
        } else if delta < 0 {
            self.neg_diff = self.neg_diff.saturating_add(delta);
        }
    }

    fn finish(self, author_id: i32) -> AuthorAggregate {
        AuthorAggregate {
            author_id,
            display_name: self.author_name.clone(),
            author_name: self.author_name,
            page_count: self.pages.len() as u64,
            edit_count: self.edit_count,
            // can't overflow, the signs differ
            size_diff: self.pos_diff + self.neg_diff,
            pos_diff: self.pos_diff,
            neg_diff: self.neg_diff,
            score: 0.0,
        }
    }
}

fn is_excluded(
    request: &ReportRequest,
    users: &impl UserStatusStore,
    author_id: i32,
) -> Result<bool, StoreError> {
    Ok((request.exclude_blocked && users.is_blocked(author_id)?)
        || (request.exclude_bots && users.is_bot(author_id)?))
}

/// Aggregates the qualifying edits of `request` per author.
///
/// An edit qualifies if it lies inside the window ending at `now`, its page is in an accepted
/// namespace, it was made by a registered user and that user is not excluded as a bot or as
/// blocked. Authors without qualifying edits are not part of the result. The result is unscored
/// and ordered by author id.
#[instrument(skip(revisions, users), err)]
pub fn scan_revisions<S: RevisionStore, U: UserStatusStore>(
    request: &ReportRequest,
    now: DateTime<Utc>,
    revisions: &S,
    users: &U,
) -> Result<Vec<AuthorAggregate>, StoreError> {
    let query = request.revision_query(now);
    let events = revisions.revisions(&query)?;

    let mut authors: FxHashMap<i32, Accumulator> = FxHashMap::default();
    let mut excluded_authors: FxHashMap<i32, bool> = FxHashMap::default();
    let mut anonymous_edits = 0usize;
    let mut excluded_edits = 0usize;

    for event in &events {
        if !query.accepts(event) {
            continue;
        }
        let Some(author_id) = event.author_id else {
            anonymous_edits += 1;
            continue;
        };

        let excluded = match excluded_authors.get(&author_id) {
            Some(&excluded) => excluded,
            None => {
                let excluded = is_excluded(request, users, author_id)?;
                excluded_authors.insert(author_id, excluded);
                excluded
            }
        };
        if excluded {
            excluded_edits += 1;
            continue;
        }

        let accumulator = authors
            .entry(author_id)
            .or_insert_with(|| Accumulator::new(event.author_name.clone()));
        // user names aren't unique over time (renames), pick the greatest one like the wiki does
        if event.author_name > accumulator.author_name {
            accumulator.author_name = event.author_name.clone();
        }
        accumulator.add(event.page_id, event.size_delta());
    }

    let mut aggregates: Vec<AuthorAggregate> = authors
        .into_iter()
        .map(|(author_id, accumulator)| accumulator.finish(author_id))
        .collect();
    aggregates.sort_unstable_by_key(|aggregate| aggregate.author_id);

    tracing::debug!(
        message = "scanned revisions",
        events = events.len(),
        authors = aggregates.len(),
        anonymous_edits,
        excluded_edits
    );

    Ok(aggregates)
}
