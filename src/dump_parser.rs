// SPDX-License-Identifier: MPL-2.0
//! Streaming reader for MediaWiki XML history dumps.
//!
//! Only the parts of a dump that matter for contribution statistics are kept: page identity and
//! namespace, and for every revision its id, parent id, timestamp, contributor and byte length.
//! Revision text is never stored, only measured.
use std::{
    any::type_name_of_val,
    borrow::Cow,
    collections::HashMap,
    fmt::Debug,
    io::BufRead,
};

use compact_str::CompactString;
use quick_xml::events::{BytesEnd, BytesStart, Event};
use rand::Rng;

// we normally don't retrieve the value of the tags, so this is the most efficient backend
type TagStringInterner = string_interner::StringInterner<string_interner::backend::BucketBackend>;

// tags we need a value of, plus their parents
#[derive(PartialEq, Eq)]
enum Tag {
    MediaWiki,  // <mediawiki version="0.11" ...>
    SiteInfo,   // <siteinfo><dbname>...</dbname><namespaces>...</namespaces></siteinfo>
    DbName,     // <dbname>dewiktionary</dbname>
    Namespaces, // <namespaces><namespace key="0" />...</namespaces>
    Namespace(String), // <namespace key="1">Diskussion</namespace>
    Page,       // <page><title/><ns/><id/><revision/>...</page>
    Title,      // <title>blah</title>
    Ns,         // <ns>0</ns>
    Id,         // <id>500</id>, both for pages, revisions and contributors
    Revision,   // <revision>...</revision>
    ParentId,   // <parentid>499</parentid>
    Timestamp,  // <timestamp>2003-12-05T06:41:50Z</timestamp>
    Contributor, // <contributor><username>blah</username><id>500</id></contributor> or <contributor deleted="deleted" />
    Username,   // <username>blah</username>
    Ip,         // <ip>127.0.0.1</ip>, anonymous contributors
    Text(TextAttributes), // <text bytes="20" sha1="...">blah</text> or <text bytes="20" deleted="deleted" />
    Unknown(string_interner::DefaultSymbol),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct TextAttributes {
    bytes: Option<u64>,
    deleted: bool,
}

impl Debug for Tag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Tag::MediaWiki => write!(f, "<mediawiki>"),
            Tag::SiteInfo => write!(f, "<siteinfo>"),
            Tag::DbName => write!(f, "<dbname>"),
            Tag::Namespaces => write!(f, "<namespaces>"),
            Tag::Namespace(key) => write!(f, "<namespace key={}>", key),
            Tag::Page => write!(f, "<page>"),
            Tag::Title => write!(f, "<title>"),
            Tag::Ns => write!(f, "<ns>"),
            Tag::Id => write!(f, "<id>"),
            Tag::Revision => write!(f, "<revision>"),
            Tag::ParentId => write!(f, "<parentid>"),
            Tag::Timestamp => write!(f, "<timestamp>"),
            Tag::Contributor => write!(f, "<contributor>"),
            Tag::Username => write!(f, "<username>"),
            Tag::Ip => write!(f, "<ip>"),
            Tag::Text(attributes) => {
                write!(f, "<text")?;
                if let Some(bytes) = attributes.bytes {
                    write!(f, " bytes={}", bytes)?;
                }
                if attributes.deleted {
                    write!(f, " deleted")?;
                }
                write!(f, ">")
            }
            Tag::Unknown(tag) => write!(f, "<unknown tag - interned symbol: {:?}>", tag),
        }
    }
}

impl Tag {
    fn from_start_bytes(
        e: &BytesStart,
        tag_interner: &mut TagStringInterner,
    ) -> Result<Self, quick_xml::Error> {
        match e.name().as_ref() {
            b"mediawiki" => Ok(Tag::MediaWiki),
            b"siteinfo" => Ok(Tag::SiteInfo),
            b"dbname" => Ok(Tag::DbName),
            b"namespaces" => Ok(Tag::Namespaces),
            b"namespace" => {
                for attr in e.attributes() {
                    let attr = attr.map_err(quick_xml::Error::from)?;
                    if attr.key.as_ref() == b"key" {
                        return Ok(Tag::Namespace(attr.unescape_value()?.into_owned()));
                    }
                }
                tracing::warn!(message = "namespace without key attribute, ignoring it");
                Ok(Tag::Namespace("ignored".to_string()))
            }
            b"page" => Ok(Tag::Page),
            b"title" => Ok(Tag::Title),
            b"ns" => Ok(Tag::Ns),
            b"id" => Ok(Tag::Id),
            b"revision" => Ok(Tag::Revision),
            b"parentid" => Ok(Tag::ParentId),
            b"timestamp" => Ok(Tag::Timestamp),
            b"contributor" => Ok(Tag::Contributor),
            b"username" => Ok(Tag::Username),
            b"ip" => Ok(Tag::Ip),
            b"text" => {
                let mut attributes = TextAttributes {
                    bytes: None,
                    deleted: false,
                };

                for attr in e.attributes() {
                    let attr = attr.map_err(quick_xml::Error::from)?;
                    match attr.key.as_ref() {
                        b"bytes" => {
                            let value = attr.unescape_value()?;
                            attributes.bytes = value.parse().ok();
                            if attributes.bytes.is_none() {
                                tracing::warn!(
                                    message = "Found invalid text size, measuring the text instead",
                                    bytes = value.as_ref()
                                );
                            }
                        }
                        b"deleted" => attributes.deleted = true,
                        _ => {}
                    }
                }

                Ok(Tag::Text(attributes))
            }
            _ => {
                let name = String::from_utf8_lossy(e.name().into_inner());
                Ok(Tag::Unknown(tag_interner.get_or_intern(name.as_ref())))
            }
        }
    }

    fn matches_end_bytes(&self, e: &BytesEnd, tag_interner: &mut TagStringInterner) -> bool {
        match (self, e.name().as_ref()) {
            (Tag::MediaWiki, b"mediawiki")
            | (Tag::SiteInfo, b"siteinfo")
            | (Tag::DbName, b"dbname")
            | (Tag::Namespaces, b"namespaces")
            | (Tag::Namespace(_), b"namespace")
            | (Tag::Page, b"page")
            | (Tag::Title, b"title")
            | (Tag::Ns, b"ns")
            | (Tag::Id, b"id")
            | (Tag::Revision, b"revision")
            | (Tag::ParentId, b"parentid")
            | (Tag::Timestamp, b"timestamp")
            | (Tag::Contributor, b"contributor")
            | (Tag::Username, b"username")
            | (Tag::Ip, b"ip")
            | (Tag::Text(_), b"text") => true,
            (Tag::Unknown(expected_tag), tag_name) => {
                let name = String::from_utf8_lossy(tag_name);
                tag_interner.get_or_intern(name.as_ref()) == *expected_tag
            }
            _ => false,
        }
    }
}

/// The author of a revision.
///
/// Registered users have an `id`. Anonymous edits carry the IP address as `username` and no id,
/// suppressed contributors have neither.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Contributor {
    pub username: CompactString,
    pub id: Option<i32>,
}

impl Contributor {
    pub fn is_registered(&self) -> bool {
        self.id.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Revision {
    pub id: i32,
    pub parent_id: Option<i32>,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub contributor: Contributor,
    /// Size of the page content after this revision in bytes.
    pub length: u64,
}

#[derive(Debug, Default)]
struct RevisionBuilder {
    id: Option<i32>,
    parent_id: Option<i32>,
    timestamp: Option<chrono::DateTime<chrono::Utc>>,
    contributor_name: Option<CompactString>,
    contributor_id: Option<i32>,
    length: Option<u64>,
}

#[derive(Debug, thiserror::Error)]
#[error("missing mandatory field: {0}")]
struct BuildRevisionError(&'static str, Box<RevisionBuilder>);

impl RevisionBuilder {
    fn try_build(self) -> Result<Revision, BuildRevisionError> {
        let (Some(id), Some(timestamp), Some(contributor_name), Some(length)) = (
            self.id,
            self.timestamp,
            self.contributor_name.clone(),
            self.length,
        ) else {
            let missing = if self.id.is_none() {
                "id"
            } else if self.timestamp.is_none() {
                "timestamp"
            } else if self.contributor_name.is_none() {
                "contributor"
            } else {
                "text"
            };
            return Err(BuildRevisionError(missing, Box::new(self)));
        };

        Ok(Revision {
            id,
            parent_id: self.parent_id,
            timestamp,
            contributor: Contributor {
                username: contributor_name,
                id: self.contributor_id,
            },
            length,
        })
    }

    fn start_text(&mut self, attributes: &TextAttributes) {
        self.length = Some(attributes.bytes.unwrap_or(0));
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Page {
    pub id: i32,
    pub title: CompactString,
    pub namespace: i32,
    pub revisions: Vec<Revision>,
}

#[derive(Clone, PartialEq, Eq, Hash, Default)]
pub enum Namespace {
    #[default]
    Default,
    Named(CompactString),
}

impl Debug for Namespace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Namespace::Default => write!(f, "Default"),
            Namespace::Named(name) => write!(f, "{:?}", name),
        }
    }
}

#[derive(Debug, Default)]
pub struct SiteInfo {
    pub dbname: CompactString,
    pub namespaces: HashMap<i32, Namespace>,
}

#[derive(Debug, thiserror::Error)]
pub enum ParsingError {
    #[error("XML error")]
    XmlError(#[from] quick_xml::Error),
    #[error("unexpected end of file")]
    Eof,
    #[error("aborted parsing: {0}")]
    Aborted(&'static str),
}

pub struct DumpParser<R: BufRead> {
    tag_interner: TagStringInterner,
    xml_parser: quick_xml::Reader<R>,
    buf: Vec<u8>,
    current_path: Vec<Tag>,
    site_info: SiteInfo,
}

impl<R: BufRead> Debug for DumpParser<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DumpParser")
            .field("xml_parser", &type_name_of_val(&self.xml_parser))
            .field("buf.len", &self.buf.len())
            .field("buf.capacity", &self.buf.capacity())
            .field("current_path", &self.current_path)
            .field("site_info", &self.site_info)
            .finish()
    }
}

// Source: https://github.com/mediawiki-utilities/python-mwtypes/blob/523a93f98fe1372938fc15872b5abb1f267cc643/mwtypes/timestamp.py#L12
const TIMESTAMP_FORMAT_LONG: &str = "%Y-%m-%dT%H:%M:%SZ";
const TIMESTAMP_FORMAT_SHORT: &str = "%Y%m%d%H%M%S";

pub(crate) fn parse_timestamp(text: &str) -> Option<chrono::DateTime<chrono::Utc>> {
    chrono::NaiveDateTime::parse_from_str(text, TIMESTAMP_FORMAT_SHORT)
        .or_else(|_| chrono::NaiveDateTime::parse_from_str(text, TIMESTAMP_FORMAT_LONG))
        .map(|dt| chrono::DateTime::from_naive_utc_and_offset(dt, chrono::Utc))
        .ok()
}

fn normalize_title(title: &str) -> Cow<'_, str> {
    if title.contains('_') {
        title.replace('_', " ").into()
    } else {
        title.into()
    }
}

/// Title without its namespace prefix. Titles in the main namespace have none, a colon there is
/// part of the title.
fn page_title(full_title: &str, namespace: i32) -> CompactString {
    let title = match namespace {
        0 => full_title,
        _ => full_title.split_once(':').map_or(full_title, |(_, title)| title),
    };
    CompactString::from(normalize_title(title))
}

impl<R: BufRead> DumpParser<R> {
    pub fn new(reader: R) -> Result<Self, ParsingError> {
        // expand_empty_elements not set, take care to handle empty elements!
        let xml_parser = quick_xml::Reader::from_reader(reader);

        let mut new = Self {
            tag_interner: TagStringInterner::new(),
            xml_parser,
            // pages are small without their text, 64 KiB is plenty
            buf: Vec::with_capacity(64 * 1024),
            current_path: Vec::new(),
            site_info: SiteInfo::default(),
        };

        new.parse_site_info()?;

        Ok(new)
    }

    pub fn site_info(&self) -> &SiteInfo {
        &self.site_info
    }

    // debugging aid for format changes
    fn check_known_tags_in_unexpected_location(&self, is_empty: bool) {
        if let Some(tag) = self.current_path.last() {
            if !matches!(tag, Tag::Unknown(_)) {
                tracing::debug!(
                    message = "found known tag in unexpected location",
                    tag = ?tag,
                    path = ?self.current_path,
                    is_empty
                );
            }
        }
    }

    /// Pops the innermost open tag and checks that `e` closes it.
    // takes the fields separately, `e` still borrows the read buffer
    fn close_tag(
        e: &BytesEnd,
        current_path: &mut Vec<Tag>,
        tag_interner: &mut TagStringInterner,
        position: u64,
    ) -> Result<Option<Tag>, ParsingError> {
        let Some(tag) = current_path.pop() else {
            tracing::error!(
                message = "Unexpected end tag",
                tag = String::from_utf8_lossy(e.name().into_inner()).as_ref(),
                position
            );
            if cfg!(feature = "strict") {
                return Err(ParsingError::Aborted("unexpected end tag"));
            }
            tracing::warn!("Ignoring unexpected end tag. This may lead to incorrect results.");
            return Ok(None);
        };

        if !tag.matches_end_bytes(e, tag_interner) {
            tracing::error!(
                message = "Mismatched tags",
                expected = ?tag,
                actual = String::from_utf8_lossy(e.name().as_ref()).as_ref(),
                current_path = ?current_path,
                position
            );
            if cfg!(feature = "strict") {
                return Err(ParsingError::Aborted("mismatched tags"));
            }
            // can't tell a missing opening tag from a typo or an unclosed tag, so just carry on
            tracing::warn!("Ignoring mismatched tag. This may lead to incorrect results.");
        }

        Ok(Some(tag))
    }

    fn parse_site_info(&mut self) -> Result<(), ParsingError> {
        let mut site_info = SiteInfo::default();

        loop {
            match self.xml_parser.read_event_into(&mut self.buf)? {
                Event::Start(ref e) => {
                    let tag = Tag::from_start_bytes(e, &mut self.tag_interner)?;
                    self.current_path.push(tag);
                }
                Event::Empty(ref e) => {
                    let tag = Tag::from_start_bytes(e, &mut self.tag_interner)?;

                    use Tag::*;

                    if let [MediaWiki, SiteInfo, Namespaces] = self.current_path.as_slice() {
                        if let Namespace(key) = &tag {
                            match key.parse() {
                                Ok(key) => {
                                    site_info.namespaces.insert(key, self::Namespace::Default);
                                }
                                Err(_) => tracing::warn!(
                                    message = "Ignoring namespace with invalid id",
                                    id = key.as_str()
                                ),
                            }
                        }
                    }
                }
                Event::Text(e) => {
                    let text = e.unescape()?;

                    use Tag::*;

                    match self.current_path.as_slice() {
                        [MediaWiki, SiteInfo, DbName] => {
                            site_info.dbname = CompactString::from(text.as_ref());
                        }
                        [MediaWiki, SiteInfo, Namespaces, Namespace(key)] => match key.parse() {
                            Ok(key) => {
                                site_info.namespaces.insert(
                                    key,
                                    self::Namespace::Named(CompactString::from(text.as_ref())),
                                );
                            }
                            Err(_) if key == "ignored" => {}
                            Err(_) => tracing::warn!(
                                message = "Ignoring namespace with invalid id",
                                id = key.as_str(),
                                name = text.as_ref()
                            ),
                        },
                        _ => self.check_known_tags_in_unexpected_location(false),
                    }
                }
                Event::End(ref e) => {
                    let position = self.xml_parser.buffer_position() as u64;
                    let tag = Self::close_tag(
                        e,
                        &mut self.current_path,
                        &mut self.tag_interner,
                        position,
                    )?;
                    if tag == Some(Tag::SiteInfo) {
                        break;
                    }
                }
                Event::Eof => {
                    tracing::error!(
                        partial_site_info = ?site_info,
                        current_path = ?self.current_path
                    );
                    return Err(ParsingError::Eof);
                }
                _ => {}
            }
            self.buf.clear();
        }
        self.buf.clear();

        self.site_info = site_info;
        Ok(())
    }

    fn finish_revision(
        &self,
        builder: RevisionBuilder,
        page: &mut Page,
    ) -> Result<(), ParsingError> {
        match builder.try_build() {
            Ok(revision) => {
                page.revisions.push(revision);
                Ok(())
            }
            Err(BuildRevisionError(field, partial_revision)) => {
                tracing::error!(
                    message = "Missing mandatory field in revision",
                    field,
                    partial_revision = ?partial_revision,
                    position = self.xml_parser.buffer_position()
                );
                if cfg!(feature = "strict") {
                    Err(ParsingError::Aborted("revision is missing a mandatory field"))
                } else {
                    tracing::warn!("Ignoring revision with missing mandatory field");
                    Ok(())
                }
            }
        }
    }

    /// Reads the next `<page>` element. Returns `Ok(None)` once the dump is exhausted.
    pub fn parse_page(&mut self) -> Result<Option<Page>, ParsingError> {
        let span = tracing::span!(
            tracing::Level::DEBUG,
            "parse_page",
            title = tracing::field::Empty
        );
        let _entered = span.enter();

        let mut page = Page {
            id: 0,
            title: CompactString::default(),
            namespace: 0,
            revisions: Vec::new(),
        };
        let mut started_page = false;
        let mut revision_builder: Option<RevisionBuilder> = None;

        loop {
            match self.xml_parser.read_event_into(&mut self.buf)? {
                Event::Start(ref e) => {
                    let tag = Tag::from_start_bytes(e, &mut self.tag_interner)?;

                    match &tag {
                        Tag::Page => started_page = true,
                        Tag::Revision => revision_builder = Some(RevisionBuilder::default()),
                        Tag::Text(attributes) => {
                            if let Some(builder) = &mut revision_builder {
                                builder.start_text(attributes);
                            }
                        }
                        _ => {}
                    }

                    self.current_path.push(tag);
                }
                Event::Empty(ref e) => {
                    let tag = Tag::from_start_bytes(e, &mut self.tag_interner)?;

                    use Tag::*;

                    let in_revision =
                        matches!(self.current_path.as_slice(), [MediaWiki, Page, Revision]);
                    match tag {
                        Text(attributes) if in_revision => {
                            if let Some(builder) = &mut revision_builder {
                                builder.start_text(&attributes);
                            }
                        }
                        Contributor if in_revision => {
                            // <contributor deleted="deleted" />
                            if let Some(builder) = &mut revision_builder {
                                builder.contributor_name = Some(CompactString::default());
                                builder.contributor_id = None;
                            }
                        }
                        tag => {
                            self.current_path.push(tag);
                            self.check_known_tags_in_unexpected_location(true);
                            self.current_path.pop();
                        }
                    }
                }
                Event::Text(e) => {
                    let text = e.unescape()?;

                    use Tag::*;

                    match self.current_path.as_slice() {
                        [MediaWiki, Page, Title] => {
                            // prefix is stripped once <ns> is known
                            page.title = CompactString::from(text.as_ref());
                            span.record("title", page.title.as_str());
                        }
                        [MediaWiki, Page, Ns] => {
                            page.namespace = text.parse().unwrap_or_else(|_| {
                                tracing::warn!(
                                    message = "Found invalid namespace id, defaulting to 0",
                                    ns = text.as_ref(),
                                    position = self.xml_parser.buffer_position()
                                );
                                0
                            });
                        }
                        [MediaWiki, Page, Id] => {
                            page.id = text.parse().unwrap_or_else(|_| {
                                tracing::warn!(
                                    message = "Found invalid page id, defaulting to 0",
                                    id = text.as_ref(),
                                    position = self.xml_parser.buffer_position()
                                );
                                0
                            });
                        }
                        [MediaWiki, Page, Revision, Id] => {
                            if let Some(builder) = &mut revision_builder {
                                builder.id = Some(text.parse().unwrap_or_else(|_| {
                                    tracing::info!(
                                        message = "Found invalid revision id, generating a random id",
                                        id = text.as_ref(),
                                        position = self.xml_parser.buffer_position()
                                    );
                                    // always use negative ids for invalid ids
                                    rand::thread_rng().gen_range(i32::MIN..-100)
                                }));
                            }
                        }
                        [MediaWiki, Page, Revision, ParentId] => {
                            if let Some(builder) = &mut revision_builder {
                                builder.parent_id = text.parse().ok();
                                if builder.parent_id.is_none() {
                                    tracing::warn!(
                                        message = "Found invalid parent id",
                                        parent_id = text.as_ref(),
                                        position = self.xml_parser.buffer_position()
                                    );
                                }
                            }
                        }
                        [MediaWiki, Page, Revision, Timestamp] => {
                            if let Some(builder) = &mut revision_builder {
                                builder.timestamp = parse_timestamp(text.as_ref());
                                if builder.timestamp.is_none() {
                                    tracing::warn!(
                                        message = "Found invalid revision timestamp",
                                        timestamp = text.as_ref(),
                                        position = self.xml_parser.buffer_position()
                                    );
                                }
                            }
                        }
                        [MediaWiki, Page, Revision, Contributor, Username]
                        | [MediaWiki, Page, Revision, Contributor, Ip] => {
                            if let Some(builder) = &mut revision_builder {
                                builder.contributor_name = Some(CompactString::from(text.as_ref()));
                            }
                        }
                        [MediaWiki, Page, Revision, Contributor, Id] => {
                            if let Some(builder) = &mut revision_builder {
                                builder.contributor_id = text.parse().ok();
                                if builder.contributor_id.is_none() {
                                    tracing::warn!(
                                        message = "Found invalid contributor id",
                                        id = text.as_ref(),
                                        position = self.xml_parser.buffer_position()
                                    );
                                }
                            }
                        }
                        [MediaWiki, Page, Revision, Text(attributes)] => {
                            // without a bytes attribute the text has to be measured
                            if attributes.bytes.is_none() && !attributes.deleted {
                                if let Some(builder) = &mut revision_builder {
                                    *builder.length.get_or_insert(0) += text.len() as u64;
                                }
                            }
                        }
                        _ => self.check_known_tags_in_unexpected_location(false),
                    }
                }
                Event::End(ref e) => {
                    let position = self.xml_parser.buffer_position() as u64;
                    let tag = Self::close_tag(
                        e,
                        &mut self.current_path,
                        &mut self.tag_interner,
                        position,
                    )?;

                    if tag == Some(Tag::Revision) {
                        if let Some(builder) = revision_builder.take() {
                            self.finish_revision(builder, &mut page)?;
                        }
                    }

                    if tag == Some(Tag::Page) {
                        page.title = page_title(&page.title, page.namespace);
                        break;
                    }
                }
                Event::Eof => {
                    if started_page {
                        tracing::error!(partial_page = ?page, current_path = ?self.current_path);
                        return Err(ParsingError::Eof);
                    } else {
                        return Ok(None);
                    }
                }
                _ => {}
            }
            self.buf.clear();
        }
        self.buf.clear();

        Ok(Some(page))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const HEADER: &str = r#"<mediawiki xmlns="http://www.mediawiki.org/xml/export-0.11/" version="0.11" xml:lang="de">
  <siteinfo>
    <sitename>Wiktionary</sitename>
    <dbname>dewiktionary</dbname>
    <namespaces>
      <namespace key="0" case="case-sensitive" />
      <namespace key="1" case="case-sensitive">Diskussion</namespace>
      <namespace key="2" case="first-letter">Benutzer</namespace>
    </namespaces>
  </siteinfo>
"#;

    fn parser(pages: &str) -> DumpParser<Cursor<Vec<u8>>> {
        let xml = format!("{HEADER}{pages}</mediawiki>");
        DumpParser::new(Cursor::new(xml.into_bytes())).unwrap()
    }

    #[test]
    fn reads_site_info() {
        let parser = parser("");
        let site_info = parser.site_info();

        assert_eq!(site_info.dbname, "dewiktionary");
        assert_eq!(site_info.namespaces[&0], Namespace::Default);
        assert_eq!(
            site_info.namespaces[&2],
            Namespace::Named("Benutzer".into())
        );
    }

    #[test]
    fn reads_page_and_revisions() {
        let mut parser = parser(
            r#"<page>
    <title>Benutzer:Some_Page</title>
    <ns>2</ns>
    <id>42</id>
    <revision>
      <id>100</id>
      <timestamp>2024-09-01T10:00:00Z</timestamp>
      <contributor><username>Alice</username><id>7</id></contributor>
      <text bytes="11" xml:space="preserve">hello world</text>
    </revision>
    <revision>
      <id>101</id>
      <parentid>100</parentid>
      <timestamp>2024-09-02T10:00:00Z</timestamp>
      <contributor><ip>192.0.2.1</ip></contributor>
      <minor />
      <text bytes="5" xml:space="preserve">hello</text>
    </revision>
  </page>
"#,
        );

        let page = parser.parse_page().unwrap().unwrap();
        assert_eq!(page.id, 42);
        assert_eq!(page.namespace, 2);
        assert_eq!(page.title, "Some Page");
        assert_eq!(page.revisions.len(), 2);

        let first = &page.revisions[0];
        assert_eq!(first.id, 100);
        assert_eq!(first.parent_id, None);
        assert_eq!(first.length, 11);
        assert_eq!(first.contributor.id, Some(7));
        assert_eq!(first.contributor.username, "Alice");

        let second = &page.revisions[1];
        assert_eq!(second.parent_id, Some(100));
        assert_eq!(second.length, 5);
        assert!(!second.contributor.is_registered());
        assert_eq!(second.contributor.username, "192.0.2.1");

        assert!(parser.parse_page().unwrap().is_none());
    }

    #[test]
    fn keeps_colons_in_main_namespace_titles() {
        let mut parser = parser(
            r#"<page><title>Foo:_Bar</title><ns>0</ns><id>1</id></page>
  <page><title>Diskussion:Foo:_Bar</title><ns>1</ns><id>2</id></page>
"#,
        );

        assert_eq!(parser.parse_page().unwrap().unwrap().title, "Foo: Bar");
        assert_eq!(parser.parse_page().unwrap().unwrap().title, "Foo: Bar");
        assert_eq!(page_title("Page_without_prefix", 4), "Page without prefix");
    }

    #[test]
    fn measures_text_without_bytes_attribute() {
        let mut parser = parser(
            r#"<page><title>A</title><ns>0</ns><id>1</id>
    <revision><id>1</id><timestamp>20240901100000</timestamp>
      <contributor><username>Bob</username><id>3</id></contributor>
      <text>f&amp;o</text></revision>
    <revision><id>2</id><parentid>1</parentid><timestamp>20240902100000</timestamp>
      <contributor><username>Bob</username><id>3</id></contributor>
      <text bytes="0" /></revision>
  </page>"#,
        );

        let page = parser.parse_page().unwrap().unwrap();
        assert_eq!(page.revisions[0].length, 3);
        assert_eq!(page.revisions[1].length, 0);
    }

    #[test]
    fn keeps_size_of_deleted_text_and_contributor() {
        let mut parser = parser(
            r#"<page><title>A</title><ns>0</ns><id>1</id>
    <revision><id>1</id><timestamp>2024-09-01T10:00:00Z</timestamp>
      <contributor deleted="deleted" />
      <text bytes="250" deleted="deleted" /></revision>
  </page>"#,
        );

        let page = parser.parse_page().unwrap().unwrap();
        let revision = &page.revisions[0];
        assert_eq!(revision.length, 250);
        assert_eq!(revision.contributor.username, "");
        assert_eq!(revision.contributor.id, None);
    }

    #[cfg(not(feature = "strict"))]
    #[test]
    fn skips_revision_without_timestamp() {
        let mut parser = parser(
            r#"<page><title>A</title><ns>0</ns><id>1</id>
    <revision><id>1</id><timestamp>yesterday</timestamp>
      <contributor><username>Bob</username><id>3</id></contributor>
      <text bytes="3">abc</text></revision>
    <revision><id>2</id><timestamp>2024-09-01T10:00:00Z</timestamp>
      <contributor><username>Bob</username><id>3</id></contributor>
      <text bytes="4">abcd</text></revision>
  </page>"#,
        );

        let page = parser.parse_page().unwrap().unwrap();
        assert_eq!(page.revisions.len(), 1);
        assert_eq!(page.revisions[0].id, 2);
    }

    #[test]
    fn truncated_page_is_an_error() {
        let xml = format!("{HEADER}<page><title>A</title><ns>0</ns>");
        let mut parser = DumpParser::new(Cursor::new(xml.into_bytes())).unwrap();

        // either our own check or the XML reader notices the missing end tags
        assert!(parser.parse_page().is_err());
    }
}
