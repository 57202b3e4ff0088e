// SPDX-License-Identifier: MPL-2.0
//! Composite score, candidate selection and final ordering.
//!
//! The ranking does not rely on the composite score alone. The top authors by number of pages and
//! the top authors by number of edits are collected first (each cut at the limit), and only that
//! union is ordered by score. An author leading one of the two single-dimension rankings is thereby
//! always a candidate, even when the shape of the score would push them out.
use std::cmp::Ordering;

use rustc_hash::FxHashSet;
use tracing::instrument;

use crate::{request::positive_limit, scanner::AuthorAggregate};

/// `page_count + 2·sqrt(edit_count - page_count)`
///
/// Breadth counts linearly, repeated edits of already touched pages with diminishing returns.
pub fn composite_score(page_count: u64, edit_count: u64) -> f64 {
    // an author can't have touched more pages than they made edits
    let repeated_edits = edit_count.saturating_sub(page_count);
    page_count as f64 + (repeated_edits as f64).sqrt() * 2.0
}

fn by_score(a: &AuthorAggregate, b: &AuthorAggregate) -> Ordering {
    b.score
        .total_cmp(&a.score)
        .then_with(|| a.author_id.cmp(&b.author_id))
}

fn top_author_ids<K: Ord>(
    aggregates: &[AuthorAggregate],
    limit: Option<usize>,
    key: impl Fn(&AuthorAggregate) -> K,
) -> Vec<i32> {
    let mut ranking: Vec<&AuthorAggregate> = aggregates.iter().collect();
    // descending by key, ties by ascending author id
    ranking.sort_by(|a, b| {
        key(*b)
            .cmp(&key(*a))
            .then_with(|| a.author_id.cmp(&b.author_id))
    });
    if let Some(limit) = limit {
        ranking.truncate(limit);
    }
    ranking.into_iter().map(|a| a.author_id).collect()
}

/// Authors ranked by number of distinct pages, cut at `limit` if it is positive.
pub fn top_by_page_count(aggregates: &[AuthorAggregate], limit: i64) -> Vec<i32> {
    top_author_ids(aggregates, positive_limit(limit), |a| a.page_count)
}

/// Authors ranked by number of edits, cut at `limit` if it is positive.
pub fn top_by_edit_count(aggregates: &[AuthorAggregate], limit: i64) -> Vec<i32> {
    top_author_ids(aggregates, positive_limit(limit), |a| a.edit_count)
}

/// Ids of all authors that make it into either single-dimension ranking, in order of first
/// appearance (edit ranking first).
pub fn candidate_union(aggregates: &[AuthorAggregate], limit: i64) -> Vec<i32> {
    let mut seen = FxHashSet::default();
    top_by_edit_count(aggregates, limit)
        .into_iter()
        .chain(top_by_page_count(aggregates, limit))
        .filter(|id| seen.insert(*id))
        .collect()
}

/// Scores `aggregates` and returns the ranked report.
///
/// The result is ordered by descending score, ties by ascending author id, and holds at most
/// `limit` entries if `limit` is positive. Scores are not rounded.
#[instrument(skip(aggregates), fields(authors = aggregates.len()))]
pub fn rank_authors(mut aggregates: Vec<AuthorAggregate>, limit: i64) -> Vec<AuthorAggregate> {
    for aggregate in &mut aggregates {
        aggregate.score = composite_score(aggregate.page_count, aggregate.edit_count);
    }

    let candidates: FxHashSet<i32> = candidate_union(&aggregates, limit).into_iter().collect();
    let mut ranked: Vec<AuthorAggregate> = aggregates
        .into_iter()
        .filter(|aggregate| candidates.contains(&aggregate.author_id))
        .collect();

    ranked.sort_by(by_score);
    if let Some(limit) = positive_limit(limit) {
        ranked.truncate(limit);
    }

    tracing::debug!(
        message = "ranked authors",
        candidates = candidates.len(),
        ranked = ranked.len()
    );
    ranked
}
