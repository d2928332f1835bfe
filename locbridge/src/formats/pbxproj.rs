//! Old-style (OpenStep) ASCII property lists, as used by Xcode's `project.pbxproj`.
//!
//! The model keeps what Xcode itself round-trips: the raw spelling and quoting
//! of every string, and the `/* comment */` that follows an object reference.
//! Writing uses Xcode's layout (tab indentation, `objects` split into
//! `/* Begin <isa> section */` blocks, `PBXBuildFile` and `PBXFileReference`
//! objects on one line), so a file Xcode wrote comes back byte for byte.

use std::collections::BTreeMap;

use indexmap::IndexMap;

use crate::error::Error;

/// Object types Xcode writes on a single line.
const INLINE_ISAS: &[&str] = &["PBXBuildFile", "PBXFileReference"];

/// A string token, with its original spelling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Text {
    raw: String,
    quoted: bool,
    comment: Option<String>,
}

impl Text {
    /// Creates a token for `value`, quoting and escaping it when needed.
    pub fn new(value: &str) -> Self {
        let quoted = value.is_empty() || !value.chars().all(is_unquoted_char);
        let raw = if quoted { escape(value) } else { value.to_string() };
        Text {
            raw,
            quoted,
            comment: None,
        }
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    /// The text between the quotes, escapes left in place.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// The unescaped value.
    pub fn value(&self) -> String {
        if self.quoted {
            unescape(&self.raw)
        } else {
            self.raw.clone()
        }
    }

    pub fn comment(&self) -> Option<&str> {
        self.comment.as_deref()
    }

    fn write(&self, out: &mut String) {
        if self.quoted {
            out.push('"');
            out.push_str(&self.raw);
            out.push('"');
        } else {
            out.push_str(&self.raw);
        }
        if let Some(comment) = &self.comment {
            out.push_str(" /* ");
            out.push_str(comment);
            out.push_str(" */");
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Text(Text),
    /// `<hex bytes>`, kept verbatim.
    Data(String),
    Array(Vec<Value>),
    Dict(Dict),
}

impl Value {
    pub fn text(value: &str) -> Self {
        Value::Text(Text::new(value))
    }

    pub fn as_text(&self) -> Option<&Text> {
        match self {
            Value::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&Vec<Value>> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_array_mut(&mut self) -> Option<&mut Vec<Value>> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_dict(&self) -> Option<&Dict> {
        match self {
            Value::Dict(dict) => Some(dict),
            _ => None,
        }
    }

    pub fn as_dict_mut(&mut self) -> Option<&mut Dict> {
        match self {
            Value::Dict(dict) => Some(dict),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DictEntry {
    pub key: Text,
    pub value: Value,
}

/// An ordered dictionary keyed by the raw key text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Dict {
    entries: IndexMap<String, DictEntry>,
}

impl Dict {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key).map(|entry| &entry.value)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut Value> {
        self.entries.get_mut(key).map(|entry| &mut entry.value)
    }

    /// The unescaped string stored under `key`.
    pub fn get_str(&self, key: &str) -> Option<String> {
        self.get(key).and_then(Value::as_text).map(Text::value)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Inserts or replaces; a replaced entry keeps its position.
    pub fn insert(&mut self, key: Text, value: Value) {
        self.entries
            .insert(key.raw().to_string(), DictEntry { key, value });
    }

    /// Builder-style [`Dict::insert`] for a plain key.
    pub fn with(mut self, key: &str, value: Value) -> Self {
        self.insert(Text::new(key), value);
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &DictEntry)> {
        self.entries.iter().map(|(k, e)| (k.as_str(), e))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A whole property list file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Plist {
    /// First-line marker such as `// !$*UTF8*$!`.
    pub header: Option<String>,
    pub root: Dict,
}

impl Plist {
    pub fn parse(source: &str) -> Result<Self, Error> {
        let mut lexer = Lexer::new(source);
        let header = source
            .lines()
            .next()
            .filter(|line| line.trim_start().starts_with("//"))
            .map(|line| line.trim_end().to_string());

        match lexer.value()? {
            Value::Dict(root) => {
                lexer.skip_trivia()?;
                if lexer.peek().is_some() {
                    return Err(lexer.error("unexpected content after the root dictionary"));
                }
                Ok(Plist { header, root })
            }
            _ => Err(lexer.error("the root value must be a dictionary")),
        }
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        if let Some(header) = &self.header {
            out.push_str(header);
            out.push('\n');
        }
        out.push_str("{\n");
        for (raw_key, entry) in self.root.iter() {
            indent(&mut out, 1);
            entry.key.write(&mut out);
            out.push_str(" = ");
            match (&entry.value, raw_key) {
                (Value::Dict(objects), "objects") => write_objects(&mut out, objects),
                (value, _) => write_value(&mut out, value, 1, false),
            }
            out.push_str(";\n");
        }
        out.push_str("}\n");
        out
    }
}

fn write_objects(out: &mut String, objects: &Dict) {
    let mut sections: BTreeMap<String, Vec<&DictEntry>> = BTreeMap::new();
    for (_, entry) in objects.iter() {
        let isa = entry
            .value
            .as_dict()
            .and_then(|dict| dict.get_str("isa"))
            .unwrap_or_default();
        sections.entry(isa).or_default().push(entry);
    }

    out.push_str("{\n");
    for (isa, entries) in &sections {
        let inline = INLINE_ISAS.contains(&isa.as_str());
        out.push_str(&format!("\n/* Begin {} section */\n", isa));
        for entry in entries {
            indent(out, 2);
            entry.key.write(out);
            out.push_str(" = ");
            write_value(out, &entry.value, 2, inline);
            out.push_str(";\n");
        }
        out.push_str(&format!("/* End {} section */\n", isa));
    }
    indent(out, 1);
    out.push('}');
}

fn write_value(out: &mut String, value: &Value, level: usize, inline: bool) {
    match value {
        Value::Text(text) => text.write(out),
        Value::Data(data) => {
            out.push('<');
            out.push_str(data);
            out.push('>');
        }
        Value::Array(items) if inline => {
            out.push('(');
            for item in items {
                write_value(out, item, level, true);
                out.push_str(", ");
            }
            out.push(')');
        }
        Value::Array(items) => {
            out.push_str("(\n");
            for item in items {
                indent(out, level + 1);
                write_value(out, item, level + 1, false);
                out.push_str(",\n");
            }
            indent(out, level);
            out.push(')');
        }
        Value::Dict(dict) if inline => {
            out.push('{');
            for (_, entry) in dict.iter() {
                entry.key.write(out);
                out.push_str(" = ");
                write_value(out, &entry.value, level, true);
                out.push_str("; ");
            }
            out.push('}');
        }
        Value::Dict(dict) => {
            out.push_str("{\n");
            for (_, entry) in dict.iter() {
                indent(out, level + 1);
                entry.key.write(out);
                out.push_str(" = ");
                write_value(out, &entry.value, level + 1, false);
                out.push_str(";\n");
            }
            indent(out, level);
            out.push('}');
        }
    }
}

fn indent(out: &mut String, level: usize) {
    for _ in 0..level {
        out.push('\t');
    }
}

fn is_unquoted_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '$' | '/' | ':' | '.')
}

fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            _ => out.push(c),
        }
    }
    out
}

fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

struct Lexer<'a> {
    src: &'a str,
    pos: usize,
    line: usize,
}

impl<'a> Lexer<'a> {
    fn new(src: &'a str) -> Self {
        Lexer { src, pos: 0, line: 1 }
    }

    fn error(&self, message: impl Into<String>) -> Error {
        Error::PbxParse {
            line: self.line,
            message: message.into(),
        }
    }

    fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        if c == '\n' {
            self.line += 1;
        }
        Some(c)
    }

    fn expect(&mut self, expected: char) -> Result<(), Error> {
        self.skip_trivia()?;
        match self.bump() {
            Some(c) if c == expected => Ok(()),
            Some(c) => Err(self.error(format!("expected `{}`, found `{}`", expected, c))),
            None => Err(self.error(format!("expected `{}`, found end of file", expected))),
        }
    }

    /// Skips whitespace, `/* */` and `//` comments.
    fn skip_trivia(&mut self) -> Result<(), Error> {
        loop {
            match self.peek() {
                Some(c) if c.is_whitespace() => {
                    self.bump();
                }
                Some('/') if self.rest().starts_with("/*") => {
                    self.block_comment()?;
                }
                Some('/') if self.rest().starts_with("//") => {
                    while let Some(c) = self.bump() {
                        if c == '\n' {
                            break;
                        }
                    }
                }
                _ => return Ok(()),
            }
        }
    }

    fn block_comment(&mut self) -> Result<String, Error> {
        let start_line = self.line;
        self.pos += 2;
        match self.rest().find("*/") {
            Some(end) => {
                let body = &self.rest()[..end];
                self.line += body.matches('\n').count();
                self.pos += end + 2;
                Ok(body.trim().to_string())
            }
            None => Err(Error::PbxParse {
                line: start_line,
                message: "unterminated comment".to_string(),
            }),
        }
    }

    // A `/* comment */` on the same line right after a string belongs to it.
    fn trailing_comment(&mut self) -> Result<Option<String>, Error> {
        let horizontal = self
            .rest()
            .len()
            .saturating_sub(self.rest().trim_start_matches([' ', '\t']).len());
        if self.rest()[horizontal..].starts_with("/*") {
            self.pos += horizontal;
            return self.block_comment().map(Some);
        }
        Ok(None)
    }

    fn value(&mut self) -> Result<Value, Error> {
        self.skip_trivia()?;
        match self.peek() {
            Some('{') => self.dict().map(Value::Dict),
            Some('(') => self.array().map(Value::Array),
            Some('<') => self.data(),
            Some(_) => self.text().map(Value::Text),
            None => Err(self.error("unexpected end of file")),
        }
    }

    fn dict(&mut self) -> Result<Dict, Error> {
        self.expect('{')?;
        let mut dict = Dict::new();
        loop {
            self.skip_trivia()?;
            if self.peek() == Some('}') {
                self.bump();
                return Ok(dict);
            }
            let key = self.text()?;
            self.expect('=')?;
            let value = self.value()?;
            self.expect(';')?;
            dict.insert(key, value);
        }
    }

    fn array(&mut self) -> Result<Vec<Value>, Error> {
        self.expect('(')?;
        let mut items = Vec::new();
        loop {
            self.skip_trivia()?;
            if self.peek() == Some(')') {
                self.bump();
                return Ok(items);
            }
            items.push(self.value()?);
            self.skip_trivia()?;
            match self.peek() {
                Some(',') => {
                    self.bump();
                }
                Some(')') => {}
                Some(c) => return Err(self.error(format!("expected `,` or `)`, found `{}`", c))),
                None => return Err(self.error("unterminated array")),
            }
        }
    }

    fn data(&mut self) -> Result<Value, Error> {
        self.bump();
        match self.rest().find('>') {
            Some(end) => {
                let data = self.rest()[..end].to_string();
                self.pos += end + 1;
                Ok(Value::Data(data))
            }
            None => Err(self.error("unterminated data")),
        }
    }

    fn text(&mut self) -> Result<Text, Error> {
        self.skip_trivia()?;
        let (raw, quoted) = if self.peek() == Some('"') {
            self.bump();
            let start = self.pos;
            let mut escaped = false;
            loop {
                match self.bump() {
                    Some('\\') if !escaped => escaped = true,
                    Some('"') if !escaped => break,
                    Some(_) => escaped = false,
                    None => return Err(self.error("unterminated string")),
                }
            }
            (self.src[start..self.pos - 1].to_string(), true)
        } else {
            let start = self.pos;
            while let Some(c) = self.peek() {
                if c.is_whitespace() || matches!(c, '{' | '}' | '(' | ')' | '=' | ';' | ',' | '"')
                {
                    break;
                }
                self.bump();
            }
            if self.pos == start {
                return Err(match self.peek() {
                    Some(c) => self.error(format!("unexpected `{}`", c)),
                    None => self.error("unexpected end of file"),
                });
            }
            (self.src[start..self.pos].to_string(), false)
        };
        let comment = self.trailing_comment()?;
        Ok(Text {
            raw,
            quoted,
            comment,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;

    const SAMPLE: &str = indoc! {r#"
        // !$*UTF8*$!
        {
        	archiveVersion = 1;
        	classes = {
        	};
        	objectVersion = 46;
        	objects = {

        /* Begin PBXBuildFile section */
        		1D3623260D0F684500981E51 /* AppDelegate.m in Sources */ = {isa = PBXBuildFile; fileRef = 1D3623250D0F684500981E51 /* AppDelegate.m */; };
        		AA0000000000000000000001 /* Weak.framework in Frameworks */ = {isa = PBXBuildFile; fileRef = AA0000000000000000000002 /* Weak.framework */; settings = {ATTRIBUTES = (Weak, ); }; };
        /* End PBXBuildFile section */

        /* Begin PBXGroup section */
        		29B97317FDCFA39411CA2CEA /* Resources */ = {
        			isa = PBXGroup;
        			children = (
        				308D052E1370CCF300D202BF /* icons */,
        			);
        			name = Resources;
        			path = "Hello World/Resources";
        			sourceTree = "<group>";
        		};
        /* End PBXGroup section */
        	};
        	rootObject = 29B97313FDCFA39411CA2CEA /* Project object */;
        }
    "#};

    #[test]
    fn test_round_trip_is_byte_identical() {
        let plist = Plist::parse(SAMPLE).unwrap();
        assert_eq!(plist.render(), SAMPLE);
    }

    #[test]
    fn test_values_and_comments() {
        let plist = Plist::parse(SAMPLE).unwrap();
        assert_eq!(plist.header.as_deref(), Some("// !$*UTF8*$!"));
        assert_eq!(plist.root.get_str("objectVersion").as_deref(), Some("46"));

        let root_object = plist.root.get("rootObject").unwrap().as_text().unwrap();
        assert_eq!(root_object.raw(), "29B97313FDCFA39411CA2CEA");
        assert_eq!(root_object.comment(), Some("Project object"));

        let objects = plist.root.get("objects").unwrap().as_dict().unwrap();
        let group = objects
            .get("29B97317FDCFA39411CA2CEA")
            .unwrap()
            .as_dict()
            .unwrap();
        assert_eq!(group.get_str("path").as_deref(), Some("Hello World/Resources"));
        assert_eq!(group.get_str("sourceTree").as_deref(), Some("<group>"));
        let children = group.get("children").unwrap().as_array().unwrap();
        assert_eq!(children.len(), 1);
    }

    #[test]
    fn test_new_text_quotes_when_needed() {
        let mut out = String::new();
        Text::new("en.lproj/Localizable.strings").write(&mut out);
        assert_eq!(out, "en.lproj/Localizable.strings");

        let mut out = String::new();
        Text::new("<group>").write(&mut out);
        assert_eq!(out, "\"<group>\"");

        let mut out = String::new();
        Text::new("pt-BR").write(&mut out);
        assert_eq!(out, "\"pt-BR\"");

        let mut out = String::new();
        Text::new("zh-Hans.lproj/Localizable.strings").write(&mut out);
        assert_eq!(out, "\"zh-Hans.lproj/Localizable.strings\"");

        let mut out = String::new();
        Text::new("say \"hi\"").with_comment("greeting").write(&mut out);
        assert_eq!(out, "\"say \\\"hi\\\"\" /* greeting */");
        assert_eq!(Text::new("say \"hi\"").value(), "say \"hi\"");
    }

    #[test]
    fn test_new_objects_go_to_their_section() {
        let mut plist = Plist::parse(SAMPLE).unwrap();
        let objects = plist.root.get_mut("objects").unwrap().as_dict_mut().unwrap();
        objects.insert(
            Text::new("BB0000000000000000000001").with_comment("en"),
            Value::Dict(
                Dict::new()
                    .with("isa", Value::text("PBXFileReference"))
                    .with("name", Value::text("en"))
                    .with("sourceTree", Value::text("<group>")),
            ),
        );
        let out = plist.render();
        assert!(out.contains(indoc! {r#"
            /* Begin PBXFileReference section */
            		BB0000000000000000000001 /* en */ = {isa = PBXFileReference; name = en; sourceTree = "<group>"; };
            /* End PBXFileReference section */
        "#}));
        assert_eq!(Plist::parse(&out).unwrap(), plist);
    }

    #[test]
    fn test_parse_errors_report_line() {
        let err = Plist::parse("{\n\ta = b;\n\tc = ;\n}").unwrap_err();
        match err {
            Error::PbxParse { line, .. } => assert_eq!(line, 3),
            other => panic!("unexpected error {:?}", other),
        }
        assert!(Plist::parse("( a, b )").is_err());
        assert!(Plist::parse("{ a = \"open; }").is_err());
    }

    #[test]
    fn test_data_values() {
        let plist = Plist::parse("{ blob = <0fbd777 1c2735ae>; }").unwrap();
        assert_eq!(
            plist.root.get("blob"),
            Some(&Value::Data("0fbd777 1c2735ae".to_string()))
        );
    }
}
