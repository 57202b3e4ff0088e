//! Fixtures shared by the unit and integration tests.
use chrono::{DateTime, Utc};
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use std::io::Cursor;

use crate::{
    dump_parser::{Contributor, Page, Revision},
    scanner::AuthorAggregate,
    store::RevisionEvent,
};

pub mod prelude {
    pub(crate) use super::proptest as proptest_support;
    pub(crate) use super::{contributor, dummy_revision, page_with_revisions, pages_to_dump, ts};
    pub(crate) use proptest::prelude::*;
}

pub fn ts(seconds: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(seconds, 0).unwrap()
}

pub fn contributor(id: i32, username: &str) -> Contributor {
    Contributor {
        username: username.into(),
        id: Some(id),
    }
}

pub fn dummy_revision(id: i32, parent_id: Option<i32>, seconds: i64, length: u64) -> Revision {
    Revision {
        id,
        parent_id,
        timestamp: ts(seconds),
        contributor: contributor(1, "Dummy"),
        length,
    }
}

pub fn page_with_revisions(id: i32, namespace: i32, revisions: Vec<Revision>) -> Page {
    Page {
        id,
        title: format!("Page {id}").into(),
        namespace,
        revisions,
    }
}

pub fn event(
    author_id: i32,
    page_id: i32,
    namespace: i32,
    seconds: i64,
    length: u64,
    parent_length: Option<u64>,
) -> RevisionEvent {
    RevisionEvent {
        revision_id: 0,
        author_id: Some(author_id),
        author_name: format!("User{author_id}").into(),
        page_id,
        namespace,
        timestamp: ts(seconds),
        length,
        parent_length,
    }
}

pub fn aggregate(author_id: i32, page_count: u64, edit_count: u64) -> AuthorAggregate {
    AuthorAggregate {
        author_id,
        author_name: format!("User{author_id}").into(),
        display_name: format!("User{author_id}").into(),
        page_count,
        edit_count,
        size_diff: 0,
        pos_diff: 0,
        neg_diff: 0,
        score: 0.0,
    }
}

type XmlWriter<'a> = quick_xml::Writer<Cursor<&'a mut Vec<u8>>>;

fn write_element(writer: &mut XmlWriter<'_>, name: &str, text: &str) {
    writer
        .write_event(Event::Start(BytesStart::new(name)))
        .unwrap();
    writer
        .write_event(Event::Text(BytesText::new(text)))
        .unwrap();
    writer.write_event(Event::End(BytesEnd::new(name))).unwrap();
}

fn write_revision(writer: &mut XmlWriter<'_>, revision: &Revision) {
    // Source: https://github.com/mediawiki-utilities/python-mwtypes/blob/523a93f98fe1372938fc15872b5abb1f267cc643/mwtypes/timestamp.py#L12
    const TIMESTAMP_FORMAT_LONG: &str = "%Y-%m-%dT%H:%M:%SZ";

    writer
        .write_event(Event::Start(BytesStart::new("revision")))
        .unwrap();
    write_element(writer, "id", &revision.id.to_string());
    if let Some(parent_id) = revision.parent_id {
        write_element(writer, "parentid", &parent_id.to_string());
    }
    write_element(
        writer,
        "timestamp",
        &revision.timestamp.format(TIMESTAMP_FORMAT_LONG).to_string(),
    );

    writer
        .write_event(Event::Start(BytesStart::new("contributor")))
        .unwrap();
    match revision.contributor.id {
        Some(id) => {
            write_element(writer, "username", &revision.contributor.username);
            write_element(writer, "id", &id.to_string());
        }
        None => write_element(writer, "ip", &revision.contributor.username),
    }
    writer
        .write_event(Event::End(BytesEnd::new("contributor")))
        .unwrap();

    let bytes = revision.length.to_string();
    let attributes = vec![("xml:space", "preserve"), ("bytes", bytes.as_str())];
    writer
        .write_event(Event::Start(
            BytesStart::new("text").with_attributes(attributes.into_iter()),
        ))
        .unwrap();
    // the content is not read back when the size is given, keep the dump small
    writer
        .write_event(Event::Text(BytesText::new("...")))
        .unwrap();
    writer
        .write_event(Event::End(BytesEnd::new("text")))
        .unwrap();

    writer
        .write_event(Event::End(BytesEnd::new("revision")))
        .unwrap();
}

/// Serializes `pages` as a complete MediaWiki XML dump.
pub fn pages_to_dump(pages: &[Page]) -> String {
    const HEADER: &str = r#"<mediawiki xmlns="http://www.mediawiki.org/xml/export-0.11/" version="0.11" xml:lang="en">
  <siteinfo>
    <sitename>Testwiki</sitename>
    <dbname>testwiki</dbname>
    <namespaces>
      <namespace key="0" case="first-letter" />
      <namespace key="1" case="first-letter">Talk</namespace>
      <namespace key="2" case="first-letter">User</namespace>
      <namespace key="3" case="first-letter">User talk</namespace>
      <namespace key="4" case="first-letter">Project</namespace>
      <namespace key="3002" case="first-letter">Auxiliary</namespace>
    </namespaces>
  </siteinfo>
"#;
    const FOOTER: &str = "</mediawiki>\n";

    let mut xml = Vec::new();
    let mut writer = quick_xml::Writer::new(Cursor::new(&mut xml));

    for page in pages {
        writer
            .write_event(Event::Start(BytesStart::new("page")))
            .unwrap();
        write_element(&mut writer, "title", &page.title);
        write_element(&mut writer, "ns", &page.namespace.to_string());
        write_element(&mut writer, "id", &page.id.to_string());
        for revision in &page.revisions {
            write_revision(&mut writer, revision);
        }
        writer
            .write_event(Event::End(BytesEnd::new("page")))
            .unwrap();
    }

    let pages_xml = String::from_utf8(xml).unwrap();
    format!("{HEADER}{pages_xml}{FOOTER}")
}

pub mod proptest {
    use proptest::prelude::*;

    use super::ts;
    use crate::dump_parser::{Contributor, Page, Revision};

    pub const NAMESPACES: &[i32] = &[0, 0, 0, 1, 2, 3, 4, 3002];

    pub fn contributor() -> impl Strategy<Value = Contributor> {
        prop_oneof![
            9 => (1..=8i32).prop_map(|id| Contributor {
                username: format!("User{id}").into(),
                id: Some(id),
            }),
            1 => Just(Contributor {
                username: "192.0.2.1".into(),
                id: None,
            }),
        ]
    }

    prop_compose! {
        /// A page whose revisions form a chain: each one names the previous as its parent.
        pub fn page(id: i32)
                (namespace in proptest::sample::select(NAMESPACES),
                 revisions in proptest::collection::vec(
                     (contributor(), 0..5000u64, 1..200_000i64), 1..12))
        -> Page {
            let mut timestamp = 0;
            let revisions = revisions
                .into_iter()
                .enumerate()
                .map(|(index, (contributor, length, gap))| {
                    timestamp += gap;
                    let revision_id = id * 100 + index as i32;
                    Revision {
                        id: revision_id,
                        parent_id: (index > 0).then_some(revision_id - 1),
                        timestamp: ts(timestamp),
                        contributor,
                        length,
                    }
                })
                .collect();

            Page {
                id,
                title: format!("Page {id}").into(),
                namespace,
                revisions,
            }
        }
    }

    pub fn history(max_pages: i32) -> impl Strategy<Value = Vec<Page>> {
        (1..=max_pages).prop_flat_map(|num_pages| {
            (1..=num_pages).map(page).collect::<Vec<_>>()
        })
    }
}
