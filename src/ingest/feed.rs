// src/ingest/feed.rs
//! RSS 2.0 / RSS 1.0 (RDF) / Atom 1.0 parsing into [`FeedEntry`] values.
//!
//! Items are walked event by event. Only unprefixed direct children of an
//! item are read (plus `dc:date`), first occurrence wins, so extension
//! elements such as `media:title` or `atom:link` never clash with the core
//! fields. A document that is not well-formed is an error; entries with
//! missing fields come back with empty strings / `None` and are filtered by
//! the worker.

use chrono::{DateTime, Utc};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use time::format_description::well_known::{Rfc2822, Rfc3339};
use time::OffsetDateTime;

use crate::ingest::clean_text;
use crate::ingest::error::ParseError;
use crate::ingest::types::FeedEntry;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FeedKind {
    Rss,
    Rdf,
    Atom,
}

impl FeedKind {
    fn from_root(local: &[u8]) -> Option<Self> {
        match local {
            b"rss" => Some(FeedKind::Rss),
            b"RDF" => Some(FeedKind::Rdf),
            b"feed" => Some(FeedKind::Atom),
            _ => None,
        }
    }

    fn entry_tag(self) -> &'static [u8] {
        match self {
            FeedKind::Rss | FeedKind::Rdf => b"item",
            FeedKind::Atom => b"entry",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Title,
    Link,
    Summary,
    Content,
    PubDate,
    DcDate,
    Published,
    Updated,
}

impl Field {
    fn of(e: &BytesStart<'_>) -> Option<Self> {
        let name = e.name();
        let local = name.local_name();
        match (name.prefix().map(|p| p.as_ref().to_vec()), local.as_ref()) {
            (None, b"title") => Some(Field::Title),
            (None, b"link") => Some(Field::Link),
            (None, b"description") | (None, b"summary") => Some(Field::Summary),
            (None, b"content") => Some(Field::Content),
            (None, b"pubDate") => Some(Field::PubDate),
            (Some(p), b"date") if p == b"dc" => Some(Field::DcDate),
            (None, b"published") => Some(Field::Published),
            (None, b"updated") => Some(Field::Updated),
            _ => None,
        }
    }
}

/// Raw field values of one item, before cleaning.
#[derive(Debug, Default)]
struct EntryFields {
    title: Option<String>,
    link: Option<String>,
    // (href, rel) of Atom-style links
    hrefs: Vec<(String, Option<String>)>,
    summary: Option<String>,
    content: Option<String>,
    pub_date: Option<String>,
    dc_date: Option<String>,
    published: Option<String>,
    updated: Option<String>,
}

impl EntryFields {
    fn slot(&mut self, field: Field) -> &mut Option<String> {
        match field {
            Field::Title => &mut self.title,
            Field::Link => &mut self.link,
            Field::Summary => &mut self.summary,
            Field::Content => &mut self.content,
            Field::PubDate => &mut self.pub_date,
            Field::DcDate => &mut self.dc_date,
            Field::Published => &mut self.published,
            Field::Updated => &mut self.updated,
        }
    }

    /// First occurrence wins.
    fn set(&mut self, field: Field, value: String) {
        let slot = self.slot(field);
        if slot.is_none() {
            *slot = Some(value);
        }
    }

    /// `rel="alternate"` (or no rel) wins; otherwise the first href.
    fn best_href(&self) -> Option<&str> {
        self.hrefs
            .iter()
            .find(|(_, rel)| matches!(rel.as_deref(), None | Some("alternate")))
            .or_else(|| self.hrefs.first())
            .map(|(href, _)| href.as_str())
    }

    fn finish(self, kind: FeedKind) -> FeedEntry {
        let text_link = normalize_link(self.link.as_deref());
        let href_link = normalize_link(self.best_href());
        let link = match kind {
            FeedKind::Atom => href_link.or(text_link),
            FeedKind::Rss | FeedKind::Rdf => text_link.or(href_link),
        };

        let published = self
            .pub_date
            .as_deref()
            .and_then(parse_rfc2822)
            .or_else(|| self.dc_date.as_deref().and_then(parse_rfc3339))
            .or_else(|| self.published.as_deref().and_then(parse_rfc3339))
            .or_else(|| self.updated.as_deref().and_then(parse_rfc3339));

        FeedEntry {
            title: clean_text(self.title.as_deref().unwrap_or_default()),
            link,
            summary: clean_text(
                self.summary
                    .as_deref()
                    .or(self.content.as_deref())
                    .unwrap_or_default(),
            ),
            published,
        }
    }
}

/// Item being read: its depth, and the field (with its depth) whose text is
/// being collected.
struct OpenEntry {
    depth: usize,
    fields: EntryFields,
    capture: Option<(Field, usize, String)>,
}

impl OpenEntry {
    fn open_child(&mut self, e: &BytesStart<'_>, depth: usize) {
        if depth != self.depth + 1 || self.capture.is_some() {
            return;
        }
        let Some(field) = Field::of(e) else {
            return;
        };
        if field == Field::Link {
            if let Some(href) = attr(e, b"href") {
                self.fields.hrefs.push((href, attr(e, b"rel")));
            }
        }
        self.capture = Some((field, depth, String::new()));
    }

    fn close_child(&mut self, depth: usize) {
        if matches!(self.capture, Some((_, d, _)) if d == depth) {
            if let Some((field, _, text)) = self.capture.take() {
                self.fields.set(field, text);
            }
        }
    }

    fn push_text(&mut self, text: &str) {
        if let Some((_, _, buf)) = self.capture.as_mut() {
            buf.push_str(text);
        }
    }
}

fn attr(e: &BytesStart<'_>, key: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|a| a.key.as_ref() == key)
        .map(|a| decode(&a.value))
}

fn decode(raw: &[u8]) -> String {
    html_escape::decode_html_entities(&String::from_utf8_lossy(raw)).into_owned()
}

/// Parse a feed body. Entries keep document order.
pub fn parse_feed(body: &str) -> Result<Vec<FeedEntry>, ParseError> {
    let xml = scrub_html_entities_for_xml(body.trim_start_matches('\u{feff}'));
    let mut reader = Reader::from_str(&xml);

    let mut kind: Option<FeedKind> = None;
    let mut depth = 0usize;
    let mut open: Option<OpenEntry> = None;
    let mut entries = Vec::new();

    loop {
        let event = reader
            .read_event()
            .map_err(|e| ParseError::Xml(e.to_string()))?;
        match event {
            Event::Start(e) => {
                depth += 1;
                start_element(&e, depth, &mut kind, &mut open)?;
            }
            Event::Empty(e) => {
                start_element(&e, depth + 1, &mut kind, &mut open)?;
                end_element(depth + 1, kind, &mut open, &mut entries);
            }
            Event::End(_) => {
                end_element(depth, kind, &mut open, &mut entries);
                depth = depth.saturating_sub(1);
            }
            Event::Text(t) => {
                if let Some(entry) = open.as_mut() {
                    entry.push_text(&decode(&t));
                }
            }
            Event::CData(c) => {
                if let Some(entry) = open.as_mut() {
                    entry.push_text(&String::from_utf8_lossy(&c));
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if kind.is_none() {
        return Err(ParseError::Empty);
    }
    if depth != 0 {
        return Err(ParseError::Xml("unexpected end of document".into()));
    }
    Ok(entries)
}

fn start_element(
    e: &BytesStart<'_>,
    depth: usize,
    kind: &mut Option<FeedKind>,
    open: &mut Option<OpenEntry>,
) -> Result<(), ParseError> {
    let Some(feed) = *kind else {
        let local = e.local_name();
        let found = FeedKind::from_root(local.as_ref()).ok_or_else(|| {
            ParseError::UnknownRoot(String::from_utf8_lossy(local.as_ref()).into_owned())
        })?;
        *kind = Some(found);
        return Ok(());
    };

    match open {
        Some(entry) => entry.open_child(e, depth),
        None => {
            let name = e.name();
            if name.prefix().is_none() && name.local_name().as_ref() == feed.entry_tag() {
                *open = Some(OpenEntry {
                    depth,
                    fields: EntryFields::default(),
                    capture: None,
                });
            }
        }
    }
    Ok(())
}

fn end_element(
    depth: usize,
    kind: Option<FeedKind>,
    open: &mut Option<OpenEntry>,
    entries: &mut Vec<FeedEntry>,
) {
    let Some(entry) = open.as_mut() else {
        return;
    };
    if entry.depth == depth {
        if let (Some(done), Some(kind)) = (open.take(), kind) {
            entries.push(done.fields.finish(kind));
        }
    } else {
        entry.close_child(depth);
    }
}

fn normalize_link(raw: Option<&str>) -> Option<String> {
    raw.map(str::trim).filter(|l| !l.is_empty()).map(str::to_string)
}

fn to_chrono(dt: OffsetDateTime) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(dt.unix_timestamp(), dt.nanosecond())
}

fn parse_rfc2822(ts: &str) -> Option<DateTime<Utc>> {
    OffsetDateTime::parse(ts.trim(), &Rfc2822).ok().and_then(to_chrono)
}

fn parse_rfc3339(ts: &str) -> Option<DateTime<Utc>> {
    OffsetDateTime::parse(ts.trim(), &Rfc3339).ok().and_then(to_chrono)
}

/// HTML named entities are not defined in XML; feeds leak them anyway.
fn scrub_html_entities_for_xml(s: &str) -> String {
    s.replace("&nbsp;", " ")
        .replace("&ndash;", "-")
        .replace("&mdash;", "-")
        .replace("&ldquo;", "\"")
        .replace("&rdquo;", "\"")
        .replace("&lsquo;", "'")
        .replace("&rsquo;", "'")
        .replace("&hellip;", "...")
        .replace("&copy;", "(c)")
}
