// SPDX-License-Identifier: MPL-2.0
//! What a report is computed over.
//!
//! A [`ReportRequest`] is a plain value handed to [`crate::report::compute_report`]. Requests coming
//! from free-form input (the `"limit/days/options"` include parameters) are normalized once here,
//! the engine itself never rejects a request.
use chrono::{DateTime, TimeDelta, Utc};

use crate::store::{NamespaceFilter, RevisionQuery};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportRequest {
    /// Only count edits of the last `window_days` days, `0` (or less) for the whole history.
    pub window_days: i64,
    /// Maximum number of ranked authors, `0` (or less) for no limit.
    pub limit: i64,
    pub exclude_bots: bool,
    pub exclude_blocked: bool,
    /// Count edits of personal user pages.
    pub include_user_namespace: bool,
    /// Only count edits of content namespaces. When disabled every namespace counts, including
    /// talk pages and `include_user_namespace` has no effect.
    pub content_namespaces_only: bool,
    /// Show the real name of ranked authors instead of their user name, where one is set.
    pub use_real_name: bool,
}

impl ReportRequest {
    pub fn new(
        window_days: i64,
        limit: i64,
        exclude_bots: bool,
        exclude_blocked: bool,
        include_user_namespace: bool,
    ) -> Self {
        Self {
            window_days,
            limit,
            exclude_bots,
            exclude_blocked,
            include_user_namespace,
            content_namespaces_only: true,
            use_real_name: false,
        }
    }

    /// The limit as a length, `None` if unbounded.
    pub fn max_len(&self) -> Option<usize> {
        positive_limit(self.limit)
    }

    /// Edits at or before this instant are outside the window. `None` for the whole history, also
    /// if the window reaches further back than representable.
    pub fn window_start(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        if self.window_days <= 0 {
            return None;
        }
        TimeDelta::try_days(self.window_days).and_then(|window| now.checked_sub_signed(window))
    }

    pub fn namespace_filter(&self) -> NamespaceFilter {
        NamespaceFilter {
            content_only: self.content_namespaces_only,
            include_user_namespace: self.include_user_namespace,
        }
    }

    pub fn revision_query(&self, now: DateTime<Utc>) -> RevisionQuery {
        RevisionQuery {
            since: self.window_start(now),
            namespaces: self.namespace_filter(),
        }
    }

    /// Parses include parameters of the form `limit/days/options`.
    ///
    /// Every part is optional. A missing, unparseable or out of range limit becomes
    /// `defaults.limit`, a missing, unparseable or negative number of days becomes
    /// `defaults.window_days`. Garbage such as `"abc"` therefore does not select the whole history,
    /// only an explicit `0` does. Options are a comma separated list, see [`ReportOption`].
    /// Unknown options are ignored.
    pub fn from_include_params(
        params: &str,
        defaults: &ReportDefaults,
    ) -> (Self, PresentationOptions) {
        let mut parts = params.split('/');
        let limit = parts.next().and_then(parse_number);
        let days = parts.next().and_then(parse_number);
        let options = parts.next().unwrap_or_default();

        let limit = match limit {
            Some(limit) if (1..=defaults.max_include_limit).contains(&limit) => limit,
            _ => defaults.limit,
        };
        let window_days = match days {
            Some(days) if days >= 0 => days,
            _ => defaults.window_days,
        };

        let mut request = defaults.request(window_days, limit);
        let mut presentation = PresentationOptions::default();

        for option in options.split(',').map(str::trim).filter(|o| !o.is_empty()) {
            match ReportOption::parse(option) {
                Some(option) => option.apply(&mut request, &mut presentation),
                None => tracing::debug!(message = "Ignoring unknown report option", option),
            }
        }

        (request, presentation)
    }
}

fn parse_number(part: &str) -> Option<i64> {
    part.trim().parse().ok()
}

pub(crate) fn positive_limit(limit: i64) -> Option<usize> {
    if limit > 0 {
        Some(usize::try_from(limit).unwrap_or(usize::MAX))
    } else {
        None
    }
}

/// Site-wide settings, used wherever a request leaves something open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportDefaults {
    pub limit: i64,
    pub window_days: i64,
    /// Largest limit accepted from include parameters.
    pub max_include_limit: i64,
    pub exclude_bots: bool,
    pub exclude_blocked: bool,
    pub use_real_name: bool,
}

impl Default for ReportDefaults {
    fn default() -> Self {
        Self {
            limit: 10,
            window_days: 7,
            max_include_limit: 50,
            exclude_bots: false,
            exclude_blocked: false,
            use_real_name: false,
        }
    }
}

impl ReportDefaults {
    /// A request with the site-wide exclusions. Windowed reports count user pages, full-history
    /// reports don't.
    pub fn request(&self, window_days: i64, limit: i64) -> ReportRequest {
        ReportRequest {
            use_real_name: self.use_real_name,
            ..ReportRequest::new(
                window_days,
                limit,
                self.exclude_bots,
                self.exclude_blocked,
                window_days > 0,
            )
        }
    }

    /// Reports shown when nothing else is configured: the last week, the last month and the top 50
    /// of all time.
    pub fn default_reports(&self) -> Vec<ReportRequest> {
        [(7, -1), (30, -1), (0, 50)]
            .into_iter()
            .map(|(window_days, limit)| self.request(window_days, limit))
            .collect()
    }
}

/// How the consumer should present the report. The engine does not look at these.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PresentationOptions {
    pub show_title: bool,
    pub sortable: bool,
    pub show_user_tools: bool,
}

impl Default for PresentationOptions {
    fn default() -> Self {
        Self {
            show_title: true,
            sortable: true,
            show_user_tools: true,
        }
    }
}

/// A single flag of the include parameters' option list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportOption {
    NoTitle,
    NoSort,
    NoTools,
    NoBots,
    NoBlocked,
    UserNamespace,
    NoUserNamespace,
    AllNamespaces,
}

impl ReportOption {
    pub fn parse(option: &str) -> Option<Self> {
        match option.to_ascii_lowercase().as_str() {
            "notitle" => Some(Self::NoTitle),
            "nosort" => Some(Self::NoSort),
            "notools" => Some(Self::NoTools),
            "nobots" => Some(Self::NoBots),
            "noblocked" => Some(Self::NoBlocked),
            "userns" => Some(Self::UserNamespace),
            "nouserns" => Some(Self::NoUserNamespace),
            "allns" => Some(Self::AllNamespaces),
            _ => None,
        }
    }

    fn apply(self, request: &mut ReportRequest, presentation: &mut PresentationOptions) {
        match self {
            Self::NoTitle => presentation.show_title = false,
            Self::NoSort => presentation.sortable = false,
            Self::NoTools => presentation.show_user_tools = false,
            Self::NoBots => request.exclude_bots = true,
            Self::NoBlocked => request.exclude_blocked = true,
            Self::UserNamespace => request.include_user_namespace = true,
            Self::NoUserNamespace => request.include_user_namespace = false,
            Self::AllNamespaces => request.content_namespaces_only = false,
        }
    }
}
