// SPDX-License-Identifier: MPL-2.0
//! # contribscores
//!
//! Ranks the contributors of a wiki by what they did over a period of time.
//!
//! ## Overview
//!
//! For every registered user with at least one edit in the requested window, `contribscores`
//! collects
//!
//! - the number of distinct pages they edited,
//! - the number of edits they made,
//! - the net change in page size caused by their edits, plus the sum of all additions and the sum
//!   of all removals.
//!
//! From the number of pages and edits a composite score is derived:
//! `pages + 2·sqrt(edits - pages)`. Touching many pages counts fully, editing the same pages again
//! and again still counts but with diminishing returns.
//!
//! The top authors by pages and the top authors by edits (each cut at the requested limit) are
//! merged, ordered by score and cut at the limit again. That way the leader of either dimension is
//! always considered, even if the score alone would leave them out.
//!
//! ## Getting Started
//!
//! Load the history of a MediaWiki XML dump into memory and compute the report of the last week:
//!
//! ```rust,no_run
//! use contribscores::dump_parser::DumpParser;
//! use contribscores::report::compute_report;
//! use contribscores::request::ReportRequest;
//! use contribscores::store::{MemoryRevisionStore, MemoryUserStatus};
//! use std::fs::File;
//! use std::io::BufReader;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let xml_dump = File::open("dewiktionary-20240901-pages-meta-history.xml")?;
//!     let mut parser = DumpParser::new(BufReader::new(xml_dump))?;
//!     let revisions = MemoryRevisionStore::from_dump(&mut parser)?;
//!
//!     // last 7 days, top 10, bots and blocked users count, user pages don't
//!     let request = ReportRequest::new(7, 10, false, false, false);
//!     let report = compute_report(&request, &revisions, &MemoryUserStatus::new())?;
//!
//!     for (rank, author) in report.iter().enumerate() {
//!         println!("{:>3} {:>6.0} {}", rank + 1, author.score, author.author_name);
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! Only `pages-meta-history` dumps contain every revision. A `pages-meta-current` dump yields one
//! revision per page, so every page looks like it was created by its last editor.
//!
//! ## Modules and API
//!
//! ### `dump_parser` Module
//!
//! Streams pages out of a Wikimedia XML dump, one at a time. Revision text is measured but not
//! kept.
//!
//! ### `store` Module
//!
//! The [`store::RevisionStore`] and [`store::UserStatusStore`] traits are all the engine reads
//! from. Implement them to compute reports from a database replica or any other source. The
//! in-memory implementations resolve the size of each revision's parent while loading.
//!
//! ### `request` Module
//!
//! [`request::ReportRequest`] holds everything a single report depends on. There is no global
//! configuration: site-wide settings live in [`request::ReportDefaults`] and are copied into each
//! request. Include parameters (`"limit/days/options"`) are parsed and normalized here.
//!
//! ### `scanner` and `scoring` Modules
//!
//! The two halves of the engine: [`scanner::scan_revisions`] aggregates the qualifying edits per
//! author, [`scoring::rank_authors`] scores, merges and orders them.
//!
//! ### `report` Module
//!
//! [`report::compute_report`] runs both halves.
//!
//! ## Concurrency
//!
//! Computing a report has no side effects and keeps no state between calls. The in-memory stores
//! are immutable once built, share them between threads (e.g. behind an `Arc`) to compute several
//! reports at once.
//!
//! ## Logging and Error Handling
//!
//! - Uses the `tracing` crate for logging. Nothing is logged above `debug` level during a report.
//! - The parser recovers from malformed revisions by skipping them. Enable the `strict` feature to
//!   make the parser terminate upon encountering errors instead.
//! - A failing store aborts the report, there are no partial results.
//!
//! ## Dependencies
//!
//! - **`compact_str`**: Used in the public API for user names and page titles.
//! - **`chrono`**: Used in the public API for timestamps.

pub mod dump_parser;
pub mod report;
pub mod request;
pub mod scanner;
pub mod scoring;
pub mod store;
#[cfg(test)]
mod test_support;

pub use report::{compute_report, compute_report_at, ReportError};
pub use request::ReportRequest;
pub use scanner::AuthorAggregate;
