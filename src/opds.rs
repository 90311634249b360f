//! OPDS catalog documents.

use crate::error::{AppError, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use serde::{Deserialize, Serialize};
use std::io::Cursor;

/// Media type of a navigation feed.
pub const NAVIGATION_TYPE: &str = "application/atom+xml;profile=opds-catalog;kind=navigation";
/// Media type of an acquisition feed.
pub const ACQUISITION_TYPE: &str = "application/atom+xml;profile=opds-catalog;kind=acquisition";

const ATOM_NS: &str = "http://www.w3.org/2005/Atom";
const DC_NS: &str = "http://purl.org/dc/terms/";
const OPDS_NS: &str = "http://opds-spec.org/2010/catalog";

/// Whether a feed lists sub-catalogs or downloadable content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FeedKind {
    /// Entries link to other feeds.
    Navigation,
    /// Entries link to content files.
    Acquisition,
}

impl FeedKind {
    /// `Content-Type` for a feed of this kind.
    pub fn media_type(&self) -> &'static str {
        match self {
            FeedKind::Navigation => NAVIGATION_TYPE,
            FeedKind::Acquisition => ACQUISITION_TYPE,
        }
    }
}

/// Atom link relation used for catalog entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Relation {
    /// A navigable sub-catalog.
    Subsection,
    /// Downloadable content.
    Acquisition,
    /// A cover-sized image.
    Thumbnail,
}

impl Relation {
    /// The `rel` attribute value.
    pub fn as_str(&self) -> &'static str {
        match self {
            Relation::Subsection => "subsection",
            Relation::Acquisition => "http://opds-spec.org/acquisition",
            Relation::Thumbnail => "http://opds-spec.org/image/thumbnail",
        }
    }
}

/// OPDS feed link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    /// Link relation type (e.g., "self", "subsection", "acquisition").
    pub rel: String,
    /// URL of the linked resource.
    pub href: String,
    /// MIME type of the linked resource.
    pub link_type: String,
    /// Optional title for the link.
    pub title: Option<String>,
}

/// Feed author. Empty fields are not written.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    /// Display name.
    pub name: String,
    /// Contact address.
    pub email: String,
    /// Home page.
    pub uri: String,
}

impl Author {
    fn is_empty(&self) -> bool {
        self.name.is_empty() && self.email.is_empty() && self.uri.is_empty()
    }
}

/// OPDS feed entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    /// Unique identifier for the entry.
    pub id: String,
    /// Entry title.
    pub title: String,
    /// Last update timestamp.
    pub updated: DateTime<Utc>,
    /// Publication timestamp.
    pub published: DateTime<Utc>,
    /// The entry's only link.
    pub link: Link,
}

/// A complete catalog document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Feed {
    /// Feed identifier (the request path).
    pub id: String,
    /// Feed title.
    pub title: String,
    /// Service identity.
    pub author: Author,
    /// Last update timestamp.
    pub updated: DateTime<Utc>,
    /// Feed-level links (`self`, `start`).
    pub links: Vec<Link>,
    /// Entries in presentation order.
    pub entries: Vec<Entry>,
}

impl Feed {
    /// Serialize as an indented UTF-8 document with an XML declaration.
    ///
    /// Acquisition feeds additionally declare the `dc` and `opds` namespaces.
    pub fn to_xml(&self, kind: FeedKind) -> Result<String> {
        let mut writer = Writer::new_with_indent(Cursor::new(Vec::new()), b' ', 2);

        writer
            .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
            .map_err(write_error)?;

        let mut feed = BytesStart::new("feed");
        feed.push_attribute(("xmlns", ATOM_NS));
        if kind == FeedKind::Acquisition {
            feed.push_attribute(("xmlns:dc", DC_NS));
            feed.push_attribute(("xmlns:opds", OPDS_NS));
        }
        writer.write_event(Event::Start(feed)).map_err(write_error)?;

        write_text_element(&mut writer, "id", &self.id)?;
        write_text_element(&mut writer, "title", &self.title)?;

        if !self.author.is_empty() {
            writer
                .write_event(Event::Start(BytesStart::new("author")))
                .map_err(write_error)?;
            for (name, value) in [
                ("name", &self.author.name),
                ("email", &self.author.email),
                ("uri", &self.author.uri),
            ] {
                if !value.is_empty() {
                    write_text_element(&mut writer, name, value)?;
                }
            }
            writer
                .write_event(Event::End(BytesEnd::new("author")))
                .map_err(write_error)?;
        }

        write_text_element(&mut writer, "updated", &timestamp(&self.updated))?;

        for link in &self.links {
            write_link(&mut writer, link)?;
        }

        for entry in &self.entries {
            write_entry(&mut writer, entry)?;
        }

        writer
            .write_event(Event::End(BytesEnd::new("feed")))
            .map_err(write_error)?;

        String::from_utf8(writer.into_inner().into_inner())
            .map_err(|e| AppError::Serialization(e.to_string()))
    }

    /// Parse a document produced by [`Feed::to_xml`].
    pub fn parse(xml: &str) -> Result<(Feed, FeedKind)> {
        let doc = roxmltree::Document::parse(xml)?;
        let root = doc.root_element();

        if root.tag_name().name() != "feed" || root.tag_name().namespace() != Some(ATOM_NS) {
            return Err(AppError::Serialization(format!(
                "expected Atom feed, found <{}>",
                root.tag_name().name()
            )));
        }

        let kind = if root.lookup_namespace_uri(Some("opds")) == Some(OPDS_NS) {
            FeedKind::Acquisition
        } else {
            FeedKind::Navigation
        };

        let mut feed = Feed {
            id: String::new(),
            title: String::new(),
            author: Author::default(),
            updated: DateTime::<Utc>::default(),
            links: Vec::new(),
            entries: Vec::new(),
        };

        for node in root.children().filter(|n| n.is_element()) {
            match node.tag_name().name() {
                "id" => feed.id = text_of(node),
                "title" => feed.title = text_of(node),
                "updated" => feed.updated = parse_timestamp(&text_of(node))?,
                "author" => {
                    for field in node.children().filter(|n| n.is_element()) {
                        match field.tag_name().name() {
                            "name" => feed.author.name = text_of(field),
                            "email" => feed.author.email = text_of(field),
                            "uri" => feed.author.uri = text_of(field),
                            _ => {}
                        }
                    }
                }
                "link" => feed.links.push(parse_link(node)),
                "entry" => feed.entries.push(parse_entry(node)?),
                _ => {}
            }
        }

        Ok((feed, kind))
    }
}

fn write_error(e: impl std::fmt::Display) -> AppError {
    AppError::Serialization(e.to_string())
}

fn timestamp(instant: &DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn parse_timestamp(text: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(text)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| AppError::Serialization(format!("invalid timestamp {:?}: {}", text, e)))
}

/// XML 1.0 `Char` production.
fn is_xml_char(c: char) -> bool {
    matches!(c,
        '\t' | '\n' | '\r'
        | '\u{20}'..='\u{D7FF}'
        | '\u{E000}'..='\u{FFFD}'
        | '\u{10000}'..='\u{10FFFF}')
}

fn check_text(text: &str) -> Result<()> {
    match text.chars().find(|c| !is_xml_char(*c)) {
        Some(c) => Err(AppError::Serialization(format!(
            "character U+{:04X} is not allowed in XML: {:?}",
            c as u32, text
        ))),
        None => Ok(()),
    }
}

/// Write a simple text element.
fn write_text_element<W: std::io::Write>(
    writer: &mut Writer<W>,
    name: &str,
    text: &str,
) -> Result<()> {
    check_text(text)?;
    writer
        .write_event(Event::Start(BytesStart::new(name)))
        .map_err(write_error)?;
    writer
        .write_event(Event::Text(BytesText::new(text)))
        .map_err(write_error)?;
    writer
        .write_event(Event::End(BytesEnd::new(name)))
        .map_err(write_error)?;
    Ok(())
}

/// Write a link element.
fn write_link<W: std::io::Write>(writer: &mut Writer<W>, link: &Link) -> Result<()> {
    let mut elem = BytesStart::new("link");
    elem.push_attribute(("rel", link.rel.as_str()));
    check_text(&link.href)?;
    elem.push_attribute(("href", link.href.as_str()));
    elem.push_attribute(("type", link.link_type.as_str()));
    if let Some(title) = &link.title {
        check_text(title)?;
        elem.push_attribute(("title", title.as_str()));
    }
    writer.write_event(Event::Empty(elem)).map_err(write_error)?;
    Ok(())
}

/// Write an entry element.
fn write_entry<W: std::io::Write>(writer: &mut Writer<W>, entry: &Entry) -> Result<()> {
    writer
        .write_event(Event::Start(BytesStart::new("entry")))
        .map_err(write_error)?;

    write_text_element(writer, "id", &entry.id)?;
    write_text_element(writer, "title", &entry.title)?;
    write_text_element(writer, "updated", &timestamp(&entry.updated))?;
    write_text_element(writer, "published", &timestamp(&entry.published))?;
    write_link(writer, &entry.link)?;

    writer
        .write_event(Event::End(BytesEnd::new("entry")))
        .map_err(write_error)?;
    Ok(())
}

fn text_of(node: roxmltree::Node) -> String {
    node.text().unwrap_or_default().to_string()
}

fn parse_link(node: roxmltree::Node) -> Link {
    Link {
        rel: node.attribute("rel").unwrap_or_default().to_string(),
        href: node.attribute("href").unwrap_or_default().to_string(),
        link_type: node.attribute("type").unwrap_or_default().to_string(),
        title: node.attribute("title").map(str::to_string),
    }
}

fn parse_entry(node: roxmltree::Node) -> Result<Entry> {
    let mut id = String::new();
    let mut title = String::new();
    let mut updated = None;
    let mut published = None;
    let mut link = None;

    for child in node.children().filter(|n| n.is_element()) {
        match child.tag_name().name() {
            "id" => id = text_of(child),
            "title" => title = text_of(child),
            "updated" => updated = Some(parse_timestamp(&text_of(child))?),
            "published" => published = Some(parse_timestamp(&text_of(child))?),
            "link" if link.is_none() => link = Some(parse_link(child)),
            _ => {}
        }
    }

    let link =
        link.ok_or_else(|| AppError::Serialization(format!("entry {:?} has no link", id)))?;
    let updated = updated.unwrap_or_default();

    Ok(Entry {
        id,
        title,
        updated,
        published: published.unwrap_or(updated),
        link,
    })
}
