//! Health-topic XML parser
//!
//! Streams the feed with quick-xml and turns every `health-topic` element,
//! at any depth, into a flat record. The `full-summary` child is written back
//! out as markup from the parsed events, so entity and character references
//! come out resolved and only `&`, `<` and `>` are escaped in text.

use std::borrow::Cow;

use quick_xml::escape::partial_escape;
use quick_xml::events::{BytesCData, BytesStart, BytesText, Event};
use quick_xml::Reader;
use tracing::debug;

use crate::error::{IngestError, Result};
use crate::models::{RawRecord, SynonymField, CATEGORY_CONDITION};

const TOPIC: &[u8] = b"health-topic";
const ALSO_CALLED: &[u8] = b"also-called";
const FULL_SUMMARY: &[u8] = b"full-summary";

/// Language assumed when a topic carries no `language` attribute
const DEFAULT_LANGUAGE: &str = "English";

/// Topic being assembled while its element is open
#[derive(Debug, Default)]
struct TopicBuilder {
    /// Element depth of the `health-topic` start tag
    depth: usize,
    /// Output position, reserved at the start tag; `None` for skipped topics
    slot: Option<usize>,
    id: Option<String>,
    title: Option<String>,
    url: Option<String>,
    synonyms: Vec<String>,
    /// Text of the `also-called` child currently open
    also_called: Option<String>,
    /// Markup of the `full-summary` child currently open
    summary: Option<String>,
    raw_text: Option<String>,
}

impl TopicBuilder {
    fn from_start(start: &BytesStart<'_>, depth: usize) -> Result<(Self, bool)> {
        let mut topic = Self {
            depth,
            ..Self::default()
        };
        let mut language = None;

        for attr in start.attributes() {
            let attr = attr?;
            let value = attr.unescape_value()?.into_owned();
            match attr.key.as_ref() {
                b"id" => topic.id = Some(value),
                b"title" => topic.title = Some(value),
                b"url" => topic.url = Some(value),
                b"language" => language = Some(value),
                _ => {},
            }
        }

        let language = language.unwrap_or_else(|| DEFAULT_LANGUAGE.to_string());
        Ok((topic, language.to_lowercase() == "english"))
    }

    fn is_child_depth(&self, depth: usize) -> bool {
        depth == self.depth + 1
    }

    /// Whether `depth` is directly inside a child element of the topic
    fn is_child_content_depth(&self, depth: usize) -> bool {
        depth == self.depth + 2
    }

    fn wants_summary(&self) -> bool {
        self.summary.is_none() && self.raw_text.is_none()
    }

    fn finish(self) -> RawRecord {
        let synonyms = if self.synonyms.is_empty() {
            None
        } else {
            Some(SynonymField::Delimited(self.synonyms.join("; ")))
        };

        RawRecord {
            doc_id: self.id.map(|id| format!("medline_{}", id)),
            category: Some(CATEGORY_CONDITION.to_string()),
            title: self.title,
            synonyms,
            url: self.url,
            raw_text: self.raw_text,
            meta_json: None,
        }
    }
}

fn text_content<'a>(e: &'a BytesText<'_>) -> Cow<'a, str> {
    match e.unescape() {
        Ok(text) => text,
        Err(_) => String::from_utf8_lossy(e),
    }
}

fn escape_attribute(value: &str) -> String {
    partial_escape(value)
        .replace('"', "&quot;")
        .replace('\r', "&#13;")
        .replace('\n', "&#10;")
        .replace('\t', "&#09;")
}

/// Opening tag without its closing `>`
fn write_open_tag(out: &mut String, start: &BytesStart<'_>) -> Result<()> {
    out.push('<');
    out.push_str(&String::from_utf8_lossy(start.name().as_ref()));
    for attr in start.attributes() {
        let attr = attr?;
        out.push(' ');
        out.push_str(&String::from_utf8_lossy(attr.key.as_ref()));
        out.push_str("=\"");
        out.push_str(&escape_attribute(&attr.unescape_value()?));
        out.push('"');
    }
    Ok(())
}

fn write_text(out: &mut String, e: &BytesText<'_>) {
    match e.unescape() {
        Ok(text) => out.push_str(&partial_escape(text.as_ref())),
        // Unknown entities are passed through as written
        Err(_) => out.push_str(&String::from_utf8_lossy(e)),
    }
}

fn write_cdata(out: &mut String, e: &BytesCData<'_>) {
    out.push_str(&partial_escape(String::from_utf8_lossy(e).as_ref()));
}

/// Parse every English-language `health-topic` element in `data`
///
/// Records come out in document order. Topics missing optional attributes
/// still produce a record with those fields unset.
pub fn parse_topics(data: &[u8]) -> Result<Vec<RawRecord>> {
    let mut reader = Reader::from_reader(data);
    let mut slots: Vec<Option<RawRecord>> = Vec::new();
    let mut open: Vec<TopicBuilder> = Vec::new();
    let mut depth = 0usize;
    let mut skipped = 0usize;

    loop {
        match reader.read_event()? {
            Event::Start(ref e) => {
                let name = e.name();
                if name.as_ref() == TOPIC {
                    let (mut topic, keep) = TopicBuilder::from_start(e, depth)?;
                    if keep {
                        topic.slot = Some(slots.len());
                        slots.push(None);
                    }
                    open.push(topic);
                } else if let Some(topic) = open.last_mut() {
                    if let Some(summary) = topic.summary.as_mut() {
                        write_open_tag(summary, e)?;
                        summary.push('>');
                    } else if topic.is_child_depth(depth) {
                        if name.as_ref() == ALSO_CALLED {
                            topic.also_called = Some(String::new());
                        } else if name.as_ref() == FULL_SUMMARY && topic.wants_summary() {
                            let mut summary = String::new();
                            write_open_tag(&mut summary, e)?;
                            summary.push('>');
                            topic.summary = Some(summary);
                        }
                    }
                }
                depth += 1;
            },
            Event::Empty(ref e) => {
                let name = e.name();
                if name.as_ref() == TOPIC {
                    let (topic, keep) = TopicBuilder::from_start(e, depth)?;
                    if keep {
                        slots.push(Some(topic.finish()));
                    } else {
                        skipped += 1;
                    }
                } else if let Some(topic) = open.last_mut() {
                    if let Some(summary) = topic.summary.as_mut() {
                        write_open_tag(summary, e)?;
                        summary.push_str(" />");
                    } else if topic.is_child_depth(depth)
                        && name.as_ref() == FULL_SUMMARY
                        && topic.wants_summary()
                    {
                        let mut summary = String::new();
                        write_open_tag(&mut summary, e)?;
                        summary.push_str(" />");
                        topic.raw_text = Some(summary);
                    }
                }
            },
            Event::Text(ref e) => {
                if let Some(topic) = open.last_mut() {
                    if let Some(summary) = topic.summary.as_mut() {
                        write_text(summary, e);
                    } else if topic.is_child_content_depth(depth) {
                        if let Some(text) = topic.also_called.as_mut() {
                            text.push_str(&text_content(e));
                        }
                    }
                }
            },
            Event::CData(ref e) => {
                if let Some(topic) = open.last_mut() {
                    if let Some(summary) = topic.summary.as_mut() {
                        write_cdata(summary, e);
                    } else if topic.is_child_content_depth(depth) {
                        if let Some(text) = topic.also_called.as_mut() {
                            text.push_str(&String::from_utf8_lossy(e));
                        }
                    }
                }
            },
            Event::End(ref e) => {
                depth = depth.saturating_sub(1);
                let name = e.name();

                if name.as_ref() == TOPIC && open.last().is_some_and(|t| t.depth == depth) {
                    if let Some(topic) = open.pop() {
                        match topic.slot {
                            Some(slot) => slots[slot] = Some(topic.finish()),
                            None => skipped += 1,
                        }
                    }
                } else if let Some(topic) = open.last_mut() {
                    let closes_child = topic.is_child_depth(depth);
                    if let Some(summary) = topic.summary.as_mut() {
                        summary.push_str("</");
                        summary.push_str(&String::from_utf8_lossy(name.as_ref()));
                        summary.push('>');
                        if closes_child {
                            topic.raw_text = topic.summary.take();
                        }
                    } else if closes_child && name.as_ref() == ALSO_CALLED {
                        // Text that is only whitespace still counts as an entry
                        if let Some(text) = topic.also_called.take() {
                            if !text.is_empty() {
                                topic.synonyms.push(text.trim().to_string());
                            }
                        }
                    }
                }
            },
            Event::Eof => break,
            _ => {},
        }
    }

    if !open.is_empty() {
        return Err(IngestError::Parse(format!(
            "document ended inside {} open health-topic element(s)",
            open.len()
        )));
    }

    let records: Vec<RawRecord> = slots.into_iter().flatten().collect();
    debug!(
        parsed = records.len(),
        skipped, "Parsed MedlinePlus health topics"
    );
    Ok(records)
}
