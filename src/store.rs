// SPDX-License-Identifier: MPL-2.0
//! Access to the revision history and to the current status of users.
//!
//! The report engine only ever reads through the [`RevisionStore`] and [`UserStatusStore`] traits.
//! [`MemoryRevisionStore`] and [`MemoryUserStatus`] are the in-process implementations, the former
//! is usually filled from an XML dump via [`MemoryRevisionStore::from_dump`].
use std::io::BufRead;

use chrono::{DateTime, Utc};
use compact_str::CompactString;
use rustc_hash::{FxHashMap, FxHashSet};

use crate::dump_parser::{DumpParser, Page, ParsingError};

/// Namespace holding the personal pages of users.
pub const USER_NAMESPACE: i32 = 2;

/// Namespaces that never count, regardless of the request.
pub const EXCLUDED_NAMESPACES: &[i32] = &[3002];

/// One edit of one page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevisionEvent {
    pub revision_id: i32,
    /// `None` for anonymous edits and suppressed contributors.
    pub author_id: Option<i32>,
    pub author_name: CompactString,
    pub page_id: i32,
    pub namespace: i32,
    pub timestamp: DateTime<Utc>,
    /// Size of the page content after this edit in bytes.
    pub length: u64,
    /// Size of the previous revision of the same page, `None` if this edit created the page.
    pub parent_length: Option<u64>,
}

impl RevisionEvent {
    /// Change in page size caused by this edit. A missing parent counts as an empty page.
    ///
    /// Saturates at the bounds of `i64`, lengths beyond `i64::MAX` count as `i64::MAX`.
    pub fn size_delta(&self) -> i64 {
        let length = i64::try_from(self.length).unwrap_or(i64::MAX);
        let parent_length = i64::try_from(self.parent_length.unwrap_or(0)).unwrap_or(i64::MAX);
        length.saturating_sub(parent_length)
    }
}

/// Which namespaces count towards a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NamespaceFilter {
    /// Only count even (non-talk) namespaces and skip [`EXCLUDED_NAMESPACES`].
    pub content_only: bool,
    /// Count [`USER_NAMESPACE`] even if `content_only` is set.
    pub include_user_namespace: bool,
}

impl NamespaceFilter {
    pub const ALL: NamespaceFilter = NamespaceFilter {
        content_only: false,
        include_user_namespace: true,
    };

    pub fn accepts(&self, namespace: i32) -> bool {
        if !self.content_only {
            return true;
        }

        // talk namespaces mirror their subject namespace at +1
        namespace.rem_euclid(2) == 0
            && !EXCLUDED_NAMESPACES.contains(&namespace)
            && (self.include_user_namespace || namespace != USER_NAMESPACE)
    }
}

/// Selection of events a report is interested in.
///
/// Stores may use it to narrow down what they return, the scanner applies it again either way.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RevisionQuery {
    /// Only events strictly after this instant, `None` for the whole history.
    pub since: Option<DateTime<Utc>>,
    pub namespaces: NamespaceFilter,
}

impl RevisionQuery {
    pub fn accepts(&self, event: &RevisionEvent) -> bool {
        self.since.map_or(true, |since| event.timestamp > since)
            && self.namespaces.accepts(event.namespace)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("failed to parse XML dump")]
    Dump(#[from] ParsingError),
    #[error("I/O error")]
    Io(#[from] std::io::Error),
}

pub trait RevisionStore {
    /// Returns (at least) every event matching `query`, in no particular order.
    fn revisions(&self, query: &RevisionQuery) -> Result<Vec<RevisionEvent>, StoreError>;
}

/// Current status of registered users. Answers reflect the status now, not at the time of an edit.
pub trait UserStatusStore {
    fn is_blocked(&self, author_id: i32) -> Result<bool, StoreError>;
    fn is_bot(&self, author_id: i32) -> Result<bool, StoreError>;
    /// The real name a user has set in their preferences, `None` (or empty) if there is none.
    fn real_name(&self, author_id: i32) -> Result<Option<CompactString>, StoreError>;
}

impl<T: RevisionStore + ?Sized> RevisionStore for &T {
    fn revisions(&self, query: &RevisionQuery) -> Result<Vec<RevisionEvent>, StoreError> {
        (**self).revisions(query)
    }
}

impl<T: UserStatusStore + ?Sized> UserStatusStore for &T {
    fn is_blocked(&self, author_id: i32) -> Result<bool, StoreError> {
        (**self).is_blocked(author_id)
    }

    fn is_bot(&self, author_id: i32) -> Result<bool, StoreError> {
        (**self).is_bot(author_id)
    }

    fn real_name(&self, author_id: i32) -> Result<Option<CompactString>, StoreError> {
        (**self).real_name(author_id)
    }
}

/// Revision history held in memory. Immutable once built, so it can be shared between threads.
#[derive(Debug, Clone, Default)]
pub struct MemoryRevisionStore {
    events: Vec<RevisionEvent>,
}

impl MemoryRevisionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a store from events whose `parent_length` is already resolved.
    pub fn from_events(events: Vec<RevisionEvent>) -> Self {
        Self { events }
    }

    pub fn from_pages<'a>(pages: impl IntoIterator<Item = &'a Page>) -> Self {
        let mut store = Self::new();
        for page in pages {
            store.add_page(page);
        }
        store
    }

    /// Reads every remaining page of `parser` into a new store.
    pub fn from_dump<R: BufRead>(parser: &mut DumpParser<R>) -> Result<Self, StoreError> {
        let mut store = Self::new();
        let mut pages = 0usize;

        while let Some(page) = parser.parse_page()? {
            store.add_page(&page);
            pages += 1;
        }

        tracing::info!(
            message = "loaded revision history",
            pages,
            revisions = store.events.len()
        );
        Ok(store)
    }

    /// Adds all revisions of `page`, resolving the size of each revision's parent.
    ///
    /// The parent is looked up by `parent_id`. If a revision has none, or it points to a revision
    /// that is not part of the page (e.g. deleted from the dump), the chronologically previous
    /// revision is used instead.
    pub fn add_page(&mut self, page: &Page) {
        let mut revisions: Vec<_> = page.revisions.iter().collect();
        revisions.sort_by_key(|revision| (revision.timestamp, revision.id));

        let lengths: FxHashMap<i32, u64> = revisions
            .iter()
            .map(|revision| (revision.id, revision.length))
            .collect();

        let mut previous_length = None;
        for revision in revisions {
            let parent_length = match revision.parent_id {
                Some(parent_id) => match lengths.get(&parent_id) {
                    Some(&length) => Some(length),
                    None => {
                        tracing::debug!(
                            message = "parent revision missing, using previous revision",
                            page = page.title.as_str(),
                            revision = revision.id,
                            parent_id
                        );
                        previous_length
                    }
                },
                None => previous_length,
            };

            self.events.push(RevisionEvent {
                revision_id: revision.id,
                author_id: revision.contributor.id,
                author_name: revision.contributor.username.clone(),
                page_id: page.id,
                namespace: page.namespace,
                timestamp: revision.timestamp,
                length: revision.length,
                parent_length,
            });
            previous_length = Some(revision.length);
        }
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn events(&self) -> &[RevisionEvent] {
        &self.events
    }
}

impl RevisionStore for MemoryRevisionStore {
    fn revisions(&self, query: &RevisionQuery) -> Result<Vec<RevisionEvent>, StoreError> {
        Ok(self
            .events
            .iter()
            .filter(|event| query.accepts(event))
            .cloned()
            .collect())
    }
}

/// Blocked users, members of the bot group and real names, kept in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryUserStatus {
    blocked: FxHashSet<i32>,
    bots: FxHashSet<i32>,
    real_names: FxHashMap<i32, CompactString>,
}

impl MemoryUserStatus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_blocked(mut self, ids: impl IntoIterator<Item = i32>) -> Self {
        self.blocked.extend(ids);
        self
    }

    pub fn with_bots(mut self, ids: impl IntoIterator<Item = i32>) -> Self {
        self.bots.extend(ids);
        self
    }

    pub fn with_real_names(
        mut self,
        names: impl IntoIterator<Item = (i32, CompactString)>,
    ) -> Self {
        self.real_names.extend(names);
        self
    }
}

impl UserStatusStore for MemoryUserStatus {
    fn is_blocked(&self, author_id: i32) -> Result<bool, StoreError> {
        Ok(self.blocked.contains(&author_id))
    }

    fn is_bot(&self, author_id: i32) -> Result<bool, StoreError> {
        Ok(self.bots.contains(&author_id))
    }

    fn real_name(&self, author_id: i32) -> Result<Option<CompactString>, StoreError> {
        Ok(self.real_names.get(&author_id).cloned())
    }
}

/// Reads a list of user ids, one per line. Empty lines and lines starting with `#` are skipped.
pub fn read_user_ids<R: BufRead>(reader: R) -> Result<FxHashSet<i32>, StoreError> {
    let mut ids = FxHashSet::default();

    for (line_number, line) in reader.lines().enumerate() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        match line.parse() {
            Ok(id) => {
                ids.insert(id);
            }
            Err(_) => tracing::warn!(
                message = "Ignoring invalid user id",
                line = line_number + 1,
                value = line
            ),
        }
    }

    Ok(ids)
}

/// Reads real names, one `id<TAB>name` pair per line. Empty lines and lines starting with `#` are
/// skipped.
pub fn read_real_names<R: BufRead>(
    reader: R,
) -> Result<FxHashMap<i32, CompactString>, StoreError> {
    let mut names = FxHashMap::default();

    for (line_number, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() || line.starts_with('#') {
            continue;
        }

        let parsed = line
            .split_once('\t')
            .and_then(|(id, name)| Some((id.trim().parse().ok()?, name.trim())));
        match parsed {
            Some((id, name)) => {
                names.insert(id, CompactString::from(name));
            }
            None => tracing::warn!(
                message = "Ignoring invalid real name entry",
                line = line_number + 1,
                value = line.as_str()
            ),
        }
    }

    Ok(names)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{dummy_revision, event, page_with_revisions};

    #[test]
    fn namespace_filter() {
        let content = NamespaceFilter {
            content_only: true,
            include_user_namespace: false,
        };
        assert!(content.accepts(0));
        assert!(content.accepts(4));
        assert!(content.accepts(-2));
        assert!(!content.accepts(1));
        assert!(!content.accepts(-1));
        assert!(!content.accepts(3));
        assert!(!content.accepts(USER_NAMESPACE));
        assert!(!content.accepts(3002));

        let with_user = NamespaceFilter {
            include_user_namespace: true,
            ..content
        };
        assert!(with_user.accepts(USER_NAMESPACE));
        assert!(!with_user.accepts(3002));

        assert!(NamespaceFilter::ALL.accepts(3));
        assert!(NamespaceFilter::ALL.accepts(3002));
    }

    #[test]
    fn resolves_parent_lengths() {
        let page = page_with_revisions(
            1,
            0,
            vec![
                dummy_revision(10, None, 0, 100),
                dummy_revision(11, Some(10), 1, 70),
                dummy_revision(12, Some(11), 2, 90),
            ],
        );
        let store = MemoryRevisionStore::from_pages([&page]);

        let parents: Vec<_> = store.events().iter().map(|e| e.parent_length).collect();
        assert_eq!(parents, vec![None, Some(100), Some(70)]);

        let deltas: Vec<_> = store.events().iter().map(RevisionEvent::size_delta).collect();
        assert_eq!(deltas, vec![100, -30, 20]);
    }

    #[test]
    fn size_delta_saturates() {
        let mut creation = event(1, 1, 0, 0, 9_300_000_000_000_000_000, None);
        assert_eq!(creation.size_delta(), i64::MAX);

        creation.parent_length = Some(u64::MAX);
        assert_eq!(creation.size_delta(), 0);

        let blanked = event(1, 1, 0, 0, 0, Some(u64::MAX));
        assert_eq!(blanked.size_delta(), -i64::MAX);
    }

    #[test]
    fn missing_parent_falls_back_to_previous_revision() {
        // revisions arrive out of order and 12 points to a revision that is not in the dump
        let page = page_with_revisions(
            1,
            0,
            vec![
                dummy_revision(12, Some(99), 2, 40),
                dummy_revision(10, None, 0, 100),
                dummy_revision(11, None, 1, 70),
            ],
        );
        let store = MemoryRevisionStore::from_pages([&page]);

        let by_id: FxHashMap<_, _> = store
            .events()
            .iter()
            .map(|e| (e.revision_id, e.parent_length))
            .collect();
        assert_eq!(by_id[&10], None);
        assert_eq!(by_id[&11], Some(100));
        assert_eq!(by_id[&12], Some(70));
    }

    #[test]
    fn query_filters_by_time_and_namespace() {
        let pages = [
            page_with_revisions(1, 0, vec![dummy_revision(1, None, 0, 10)]),
            page_with_revisions(2, 1, vec![dummy_revision(2, None, 100, 10)]),
            page_with_revisions(3, 0, vec![dummy_revision(3, None, 100, 10)]),
        ];
        let store = MemoryRevisionStore::from_pages(&pages);

        let query = RevisionQuery {
            since: Some(DateTime::from_timestamp(50, 0).unwrap()),
            namespaces: NamespaceFilter {
                content_only: true,
                include_user_namespace: false,
            },
        };
        let events = store.revisions(&query).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].revision_id, 3);

        let everything = RevisionQuery {
            since: None,
            namespaces: NamespaceFilter::ALL,
        };
        assert_eq!(store.revisions(&everything).unwrap().len(), 3);
    }

    #[test]
    fn reads_user_id_lists() {
        let input = "# bots\n12\n\n  7 \nnot-a-number\n12\n";
        let ids = read_user_ids(input.as_bytes()).unwrap();

        assert_eq!(ids.len(), 2);
        assert!(ids.contains(&12));
        assert!(ids.contains(&7));
    }

    #[test]
    fn reads_real_name_lists() {
        let input = "# id\tname\n7\tAda Lovelace\n8\t\nbroken line\nx\tNobody\n";
        let names = read_real_names(input.as_bytes()).unwrap();

        assert_eq!(names.len(), 2);
        assert_eq!(names[&7], "Ada Lovelace");
        assert_eq!(names[&8], "");
    }

    #[test]
    fn memory_user_status() {
        let status = MemoryUserStatus::new()
            .with_bots([1])
            .with_blocked([2])
            .with_real_names([(3, CompactString::from("Ada"))]);

        assert!(status.is_bot(1).unwrap());
        assert!(!status.is_blocked(1).unwrap());
        assert!(status.is_blocked(2).unwrap());
        assert!(!status.is_bot(3).unwrap());
        assert_eq!(status.real_name(3).unwrap().as_deref(), Some("Ada"));
        assert_eq!(status.real_name(1).unwrap(), None);
    }
}
