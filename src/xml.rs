//! XML parsing with entity resolution left on.
//!
//! Declarations in the internal DTD subset are honoured: `SYSTEM` entities
//! are fetched (local files, `file://` and `http(s)://` URLs) and internal
//! entities are taken verbatim, then every reference in text and attribute
//! values is expanded.

use std::collections::HashMap;

use quick_xml::escape::resolve_predefined_entity;
use quick_xml::events::{BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use regex::Regex;

#[derive(thiserror::Error, Debug)]
pub enum XmlError {
    #[error("xml: {0}")]
    Parse(#[from] quick_xml::Error),
    #[error("xml escape: {0}")]
    Escape(#[from] quick_xml::escape::EscapeError),
    #[error("entity {name}: {source}")]
    Entity { name: String, source: std::io::Error },
    #[error("entity {name}: {source}")]
    Fetch { name: String, source: reqwest::Error },
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("output is not utf-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

#[derive(Debug, Clone, PartialEq)]
pub enum EntityDecl {
    Internal(String),
    External(String),
}

fn entity_pattern() -> Regex {
    Regex::new(r#"<!ENTITY\s+([^\s%]+)\s+(?:(SYSTEM|PUBLIC\s+["'][^"']*["'])\s+)?["']([^"']*)["']\s*>"#)
        .expect("static entity pattern")
}

/// Entity declarations from the document's DOCTYPE, in declaration order.
pub fn declared_entities(xml: &str) -> Result<Vec<(String, EntityDecl)>, XmlError> {
    let mut reader = Reader::from_str(xml);
    let re = entity_pattern();
    loop {
        match reader.read_event()? {
            Event::DocType(dt) => {
                let subset = String::from_utf8_lossy(&dt).into_owned();
                return Ok(re
                    .captures_iter(&subset)
                    .map(|c| {
                        let name = c[1].to_string();
                        let value = c[3].to_string();
                        let decl = if c.get(2).is_some() { EntityDecl::External(value) } else { EntityDecl::Internal(value) };
                        (name, decl)
                    })
                    .collect());
            }
            Event::Start(_) | Event::Empty(_) | Event::Eof => return Ok(Vec::new()),
            _ => {}
        }
    }
}

async fn fetch_entity(name: &str, uri: &str) -> Result<String, XmlError> {
    if uri.starts_with("http://") || uri.starts_with("https://") {
        let fetched = async { reqwest::get(uri).await?.text().await }.await;
        return fetched.map_err(|source| XmlError::Fetch { name: name.to_string(), source });
    }
    let path = uri.strip_prefix("file://").unwrap_or(uri);
    tokio::fs::read_to_string(path)
        .await
        .map_err(|source| XmlError::Entity { name: name.to_string(), source })
}

pub async fn resolve_entities(xml: &str) -> Result<HashMap<String, String>, XmlError> {
    let mut resolved = HashMap::new();
    for (name, decl) in declared_entities(xml)? {
        let value = match decl {
            EntityDecl::Internal(v) => v,
            EntityDecl::External(uri) => fetch_entity(&name, &uri).await?,
        };
        resolved.insert(name, value);
    }
    Ok(resolved)
}

/// Declared entities shadow the five predefined ones.
fn lookup<'a>(entities: &'a HashMap<String, String>, name: &str) -> Option<&'a str> {
    entities.get(name).map(String::as_str).or_else(|| resolve_predefined_entity(name))
}

fn expand_attributes(start: &BytesStart, entities: &HashMap<String, String>) -> Result<BytesStart<'static>, XmlError> {
    let mut out = BytesStart::new(String::from_utf8_lossy(start.name().as_ref()).into_owned());
    for attr in start.attributes() {
        let attr = attr.map_err(quick_xml::Error::from)?;
        let value = attr.unescape_value_with(|name| lookup(entities, name))?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        out.push_attribute((key.as_str(), value.as_ref()));
    }
    Ok(out)
}

/// Re-serialize the document with entities expanded. Prolog, DOCTYPE,
/// comments and processing instructions are dropped.
pub fn expand(xml: &str, entities: &HashMap<String, String>) -> Result<String, XmlError> {
    let mut reader = Reader::from_str(xml);
    let mut writer = Writer::new(Vec::new());
    loop {
        match reader.read_event()? {
            Event::Eof => break,
            Event::Decl(_) | Event::DocType(_) | Event::Comment(_) | Event::PI(_) => {}
            Event::Text(t) => {
                let text = t.unescape_with(|name| lookup(entities, name))?;
                writer.write_event(Event::Text(BytesText::new(&text)))?;
            }
            Event::Start(e) => writer.write_event(Event::Start(expand_attributes(&e, entities)?))?,
            Event::Empty(e) => writer.write_event(Event::Empty(expand_attributes(&e, entities)?))?,
            other => writer.write_event(other)?,
        }
    }
    Ok(String::from_utf8(writer.into_inner())?)
}

pub async fn parse_untrusted(xml: &str) -> Result<String, XmlError> {
    let entities = resolve_entities(xml).await?;
    expand(xml, &entities)
}
