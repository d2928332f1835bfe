//! Support for Android `strings.xml` resource files.
//!
//! The document keeps everything it does not understand. `<string>` items are
//! addressable by name and can be updated or appended; any other child of
//! `<resources>` (`<plurals>`, `<string-array>`, comments, ...) is kept as the
//! raw event sequence it was read from and written back in place.
//!
//! Output is tab indented and stable: writing a parsed document and parsing
//! it again yields the same bytes on the next write.

use std::{
    collections::HashMap,
    io::{BufRead, Write},
};

use quick_xml::{
    Reader, Writer,
    escape::partial_escape,
    events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event},
};

use crate::{error::Error, traits::Parser, transform::Pipeline, types::StringMap};

/// A parsed `strings.xml`.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    /// Comments, doctype and processing instructions before `<resources>`.
    pub prolog: Vec<Event<'static>>,
    /// Attributes of `<resources>`, e.g. `xmlns:tools`.
    pub root_attributes: Vec<(String, String)>,
    pub items: Vec<Item>,
}

/// One child of `<resources>`.
#[derive(Debug, Clone, PartialEq)]
pub enum Item {
    String(StringResource),
    /// Anything else, kept verbatim.
    Other(Vec<Event<'static>>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct StringResource {
    pub name: String,
    /// Every attribute except `name`, in source order.
    pub attributes: Vec<(String, String)>,
    pub value: StringValue,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StringValue {
    /// Unescaped character data.
    Text(String),
    /// Mixed content (`<b>`, `<xliff:g>`, CDATA), written back untouched.
    Markup(Vec<Event<'static>>),
}

impl StringResource {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        StringResource {
            name: name.into(),
            attributes: Vec::new(),
            value: StringValue::Text(value.into()),
        }
    }

    /// The plain value, `None` for mixed content.
    pub fn text(&self) -> Option<&str> {
        match &self.value {
            StringValue::Text(text) => Some(text),
            StringValue::Markup(_) => None,
        }
    }

    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// What [`Document::merge`] did.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct MergeStats {
    pub inserted: usize,
    pub updated: usize,
    pub unchanged: usize,
}

impl Document {
    /// An empty `<resources>` skeleton.
    pub fn new() -> Self {
        Document {
            prolog: Vec::new(),
            root_attributes: Vec::new(),
            items: Vec::new(),
        }
    }

    /// Iterates over the `<string>` items in document order.
    pub fn strings(&self) -> impl Iterator<Item = &StringResource> {
        self.items.iter().filter_map(|item| match item {
            Item::String(sr) => Some(sr),
            Item::Other(_) => None,
        })
    }

    pub fn get(&self, name: &str) -> Option<&StringResource> {
        self.strings().find(|sr| sr.name == name)
    }

    /// Merges `strings` into the document after running each value through `pipeline`.
    ///
    /// Existing items with the same name get the new value in place and keep
    /// their attributes; unknown names are appended in the map's order.
    pub fn merge(&mut self, strings: &StringMap, pipeline: &Pipeline) -> MergeStats {
        let mut index: HashMap<String, Vec<usize>> = HashMap::new();
        for (position, item) in self.items.iter().enumerate() {
            if let Item::String(sr) = item {
                index.entry(sr.name.clone()).or_default().push(position);
            }
        }

        let mut stats = MergeStats::default();
        for (name, raw_value) in strings {
            let value = pipeline.apply(raw_value);
            match index.get(name) {
                Some(positions) => {
                    let mut changed = false;
                    for &position in positions {
                        if let Item::String(sr) = &mut self.items[position] {
                            if sr.text() != Some(value.as_str()) {
                                sr.value = StringValue::Text(value.clone());
                                changed = true;
                            }
                        }
                    }
                    if changed {
                        stats.updated += 1;
                    } else {
                        stats.unchanged += 1;
                    }
                }
                None => {
                    index.insert(name.clone(), vec![self.items.len()]);
                    self.items
                        .push(Item::String(StringResource::new(name.clone(), value)));
                    stats.inserted += 1;
                }
            }
        }
        stats
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReadState {
    Prolog,
    Root,
    Epilog,
}

impl Parser for Document {
    /// Parse from any reader. An empty input yields an empty skeleton.
    fn from_reader<R: BufRead>(reader: R) -> Result<Self, Error> {
        let mut xml_reader = Reader::from_reader(reader);
        let mut buf = Vec::new();
        let mut document = Document::new();
        let mut state = ReadState::Prolog;

        loop {
            let event = xml_reader.read_event_into(&mut buf)?.into_owned();
            buf.clear();

            match (state, event) {
                (_, Event::Eof) => break,
                (ReadState::Prolog, Event::Start(e)) if e.name().as_ref() == b"resources" => {
                    document.root_attributes = read_attributes(&e)?;
                    state = ReadState::Root;
                }
                (ReadState::Prolog, Event::Empty(e)) if e.name().as_ref() == b"resources" => {
                    document.root_attributes = read_attributes(&e)?;
                    state = ReadState::Epilog;
                }
                (ReadState::Prolog, Event::Start(e) | Event::Empty(e)) => {
                    return Err(Error::InvalidResource(format!(
                        "expected <resources> root, found <{}>",
                        String::from_utf8_lossy(e.name().as_ref())
                    )));
                }
                (ReadState::Prolog, ev @ (Event::Comment(_) | Event::DocType(_) | Event::PI(_))) => {
                    document.prolog.push(ev);
                }
                (ReadState::Prolog, _) => {}
                (ReadState::Root, Event::End(_)) => state = ReadState::Epilog,
                (ReadState::Root, Event::Start(e)) if e.name().as_ref() == b"string" => {
                    let sr = parse_string_resource(&e, &mut xml_reader)?;
                    document.items.push(Item::String(sr));
                }
                (ReadState::Root, Event::Empty(e)) if e.name().as_ref() == b"string" => {
                    let (name, attributes) = split_name(&e)?;
                    document.items.push(Item::String(StringResource {
                        name,
                        attributes,
                        value: StringValue::Text(String::new()),
                    }));
                }
                (ReadState::Root, Event::Start(e)) => {
                    let events = collect_subtree(e, &mut xml_reader)?;
                    document.items.push(Item::Other(events));
                }
                (ReadState::Root, Event::Text(t)) if is_blank(&t) => {}
                (ReadState::Root, ev) => document.items.push(Item::Other(vec![ev])),
                (ReadState::Epilog, _) => {}
            }
        }

        if state == ReadState::Root {
            return Err(Error::InvalidResource(
                "unexpected end of file inside <resources>".to_string(),
            ));
        }
        Ok(document)
    }

    /// Write to any writer (file, memory, etc.).
    fn to_writer<W: Write>(&self, mut writer: W) -> Result<(), Error> {
        let mut xml_writer = Writer::new_with_indent(&mut writer, b'\t', 1);

        xml_writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))?;
        for event in &self.prolog {
            xml_writer.write_event(event.clone())?;
        }

        let mut resources_start = BytesStart::new("resources");
        for (key, value) in &self.root_attributes {
            resources_start.push_attribute((key.as_str(), value.as_str()));
        }
        xml_writer.write_event(Event::Start(resources_start))?;

        for item in &self.items {
            match item {
                Item::String(sr) => {
                    let mut elem = BytesStart::new("string");
                    elem.push_attribute(("name", sr.name.as_str()));
                    for (key, value) in &sr.attributes {
                        elem.push_attribute((key.as_str(), value.as_str()));
                    }
                    let content = match &sr.value {
                        StringValue::Text(text) => partial_escape(text.as_str()).into_owned(),
                        StringValue::Markup(events) => raw_markup(events)?,
                    };

                    xml_writer.write_event(Event::Start(elem))?;
                    // Always emit the text, even when empty, so the end tag
                    // stays on the same line.
                    xml_writer.write_event(Event::Text(BytesText::from_escaped(content)))?;
                    xml_writer.write_event(Event::End(BytesEnd::new("string")))?;
                }
                Item::Other(events) => {
                    for event in events {
                        xml_writer.write_event(event.clone())?;
                    }
                }
            }
        }

        xml_writer.write_event(Event::End(BytesEnd::new("resources")))?;
        xml_writer.get_mut().write_all(b"\n")?;
        Ok(())
    }
}

fn is_blank(text: &BytesText) -> bool {
    text.iter().all(u8::is_ascii_whitespace)
}

fn read_attributes(e: &BytesStart) -> Result<Vec<(String, String)>, Error> {
    let mut attributes = Vec::new();
    for attr in e.attributes().with_checks(false) {
        let attr = attr.map_err(|e| Error::InvalidResource(e.to_string()))?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).to_string();
        let value = attr.unescape_value()?.to_string();
        attributes.push((key, value));
    }
    Ok(attributes)
}

fn split_name(e: &BytesStart) -> Result<(String, Vec<(String, String)>), Error> {
    let mut attributes = read_attributes(e)?;
    let position = attributes
        .iter()
        .position(|(key, _)| key == "name")
        .ok_or_else(|| Error::InvalidResource("string tag missing 'name'".to_string()))?;
    let (_, name) = attributes.remove(position);
    Ok((name, attributes))
}

fn parse_string_resource<R: BufRead>(
    e: &BytesStart,
    xml_reader: &mut Reader<R>,
) -> Result<StringResource, Error> {
    let (name, attributes) = split_name(e)?;

    let mut buf = Vec::new();
    let mut inner = Vec::new();
    let mut depth = 0usize;
    loop {
        let event = xml_reader.read_event_into(&mut buf)?.into_owned();
        buf.clear();
        match &event {
            Event::Start(_) => depth += 1,
            Event::End(_) if depth == 0 => break,
            Event::End(_) => depth -= 1,
            Event::Eof => {
                return Err(Error::InvalidResource(format!(
                    "unexpected end of file inside <string name=\"{}\">",
                    name
                )));
            }
            _ => {}
        }
        inner.push(event);
    }

    Ok(StringResource {
        name,
        attributes,
        value: string_value(inner),
    })
}

// Plain text when every inner event is character data that unescapes cleanly.
fn string_value(inner: Vec<Event<'static>>) -> StringValue {
    let mut text = String::new();
    for event in &inner {
        match event {
            Event::Text(t) => match t.unescape() {
                Ok(unescaped) => text.push_str(&unescaped),
                Err(_) => return StringValue::Markup(inner),
            },
            _ => return StringValue::Markup(inner),
        }
    }
    StringValue::Text(text)
}

// Reads up to the end tag matching `start`; blank text between tags is dropped
// because the indenting writer lays it out again.
fn collect_subtree<R: BufRead>(
    start: BytesStart<'static>,
    xml_reader: &mut Reader<R>,
) -> Result<Vec<Event<'static>>, Error> {
    let mut events = vec![Event::Start(start)];
    let mut buf = Vec::new();
    let mut depth = 1usize;
    while depth > 0 {
        let event = xml_reader.read_event_into(&mut buf)?.into_owned();
        buf.clear();
        match &event {
            Event::Start(_) => depth += 1,
            Event::End(_) => depth -= 1,
            Event::Text(t) if is_blank(t) => continue,
            Event::Eof => {
                return Err(Error::InvalidResource(
                    "unexpected end of file inside <resources>".to_string(),
                ));
            }
            _ => {}
        }
        events.push(event);
    }
    Ok(events)
}

fn raw_markup(events: &[Event<'static>]) -> Result<String, Error> {
    let mut writer = Writer::new(Vec::new());
    for event in events {
        writer.write_event(event.clone())?;
    }
    String::from_utf8(writer.into_inner()).map_err(|e| Error::InvalidResource(e.to_string()))
}
