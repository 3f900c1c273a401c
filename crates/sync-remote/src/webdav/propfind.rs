use crate::{Error, Result};
use chrono::{DateTime, NaiveDateTime, Utc};
use quick_xml::events::Event;
use quick_xml::reader::Reader;
use std::str;

/// Request body for directory listings.
pub(crate) const LISTING_BODY: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<D:propfind xmlns:D="DAV:">
    <D:prop>
        <D:resourcetype/>
        <D:getcontentlength/>
        <D:getlastmodified/>
    </D:prop>
</D:propfind>"#;

/// One `<response>` of a multistatus body.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub(crate) struct PropfindEntry {
    /// The `<href>` text, entity-unescaped but still percent-encoded.
    pub href: String,
    pub is_collection: bool,
    pub content_length: Option<u64>,
    pub last_modified: Option<DateTime<Utc>>,
}

/// Parse a `207 Multi-Status` body.
///
/// Responses without any successful status are dropped.
pub(crate) fn parse_multistatus(xml: &str) -> Result<Vec<PropfindEntry>> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut entries = Vec::new();
    let mut current: Option<PropfindEntry> = None;
    let mut current_ok = false;
    let mut in_resourcetype = false;
    let mut element = String::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                let name = local_name(e.name().local_name().as_ref())?;
                match name.as_str() {
                    "response" => {
                        current = Some(PropfindEntry::default());
                        current_ok = false;
                    }
                    "resourcetype" => in_resourcetype = true,
                    "collection" if in_resourcetype => mark_collection(&mut current),
                    _ => {}
                }
                element = name;
            }
            Ok(Event::Empty(e)) => {
                let name = local_name(e.name().local_name().as_ref())?;
                if name == "collection" && in_resourcetype {
                    mark_collection(&mut current);
                }
            }
            Ok(Event::Text(e)) => {
                let text = e
                    .unescape()
                    .map_err(|e| Error::Xml(e.to_string()))?;
                let text = text.trim();
                if let Some(entry) = current.as_mut() {
                    match element.as_str() {
                        "href" => entry.href = text.to_string(),
                        "getcontentlength" => entry.content_length = text.parse().ok(),
                        "getlastmodified" => entry.last_modified = parse_http_date(text),
                        "status" if status_is_success(text) => current_ok = true,
                        _ => {}
                    }
                }
            }
            Ok(Event::End(e)) => {
                let name = local_name(e.name().local_name().as_ref())?;
                match name.as_str() {
                    "response" => {
                        if let Some(entry) = current.take() {
                            if current_ok && !entry.href.is_empty() {
                                entries.push(entry);
                            }
                        }
                    }
                    "resourcetype" => in_resourcetype = false,
                    _ => {}
                }
                element.clear();
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(Error::Xml(format!(
                    "at position {}: {}",
                    reader.buffer_position(),
                    e
                )))
            }
            _ => {}
        }
    }

    Ok(entries)
}

fn mark_collection(current: &mut Option<PropfindEntry>) {
    if let Some(entry) = current.as_mut() {
        entry.is_collection = true;
    }
}

fn local_name(bytes: &[u8]) -> Result<String> {
    str::from_utf8(bytes)
        .map(str::to_string)
        .map_err(|e| Error::Xml(format!("invalid UTF-8 in element name: {}", e)))
}

/// `HTTP/1.1 200 OK` and friends.
fn status_is_success(text: &str) -> bool {
    text.split_whitespace()
        .nth(1)
        .and_then(|code| code.parse::<u16>().ok())
        .is_some_and(|code| (200..300).contains(&code))
}

fn parse_http_date(text: &str) -> Option<DateTime<Utc>> {
    if text.is_empty() {
        return None;
    }
    DateTime::parse_from_rfc2822(text)
        .or_else(|_| DateTime::parse_from_rfc3339(text))
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(text, "%a, %d %b %Y %H:%M:%S GMT")
                .ok()
                .map(|naive| naive.and_utc())
        })
}
