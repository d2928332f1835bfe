//! Support for Apple `.strings` files (`Localizable.strings`, `InfoPlist.strings`).
//!
//! Values are stored exactly as they appear between the quotes, i.e. already
//! escaped. Use [`Pipeline::apple_strings`] to escape raw text first.
//!
//! The hook only writes these files. The reader exists to check written output
//! (and files edited by hand, which may be UTF-16 with a BOM); it is not part
//! of a hook run.

use std::{fs::File, io::Read, path::Path};

use indoc::indoc;

use crate::{error::Error, traits::Parser, transform::Pipeline, types::StringMap};

/// Represents an Apple `.strings` localization file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Format {
    /// Language code for this resource, taken from the `//: Language:` header if present.
    pub language: String,
    /// All key-value pairs (and optional comments) in the file.
    pub pairs: Vec<Pair>,
}

impl Format {
    /// Builds a file from an ordered map, escaping every value with `pipeline`.
    pub fn from_map(language: impl Into<String>, strings: &StringMap, pipeline: &Pipeline) -> Self {
        Format {
            language: language.into(),
            pairs: strings
                .iter()
                .map(|(key, value)| Pair {
                    key: pipeline.apply(key),
                    value: pipeline.apply(value),
                    comment: None,
                })
                .collect(),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|pair| pair.key == key)
            .map(|pair| pair.value.as_str())
    }

    /// The rendered file as UTF-8 bytes.
    pub fn to_utf8_bytes(&self) -> Result<Vec<u8>, Error> {
        Ok(self.to_text()?.into_bytes())
    }
}

impl Parser for Format {
    fn from_reader<R: std::io::BufRead>(reader: R) -> Result<Self, Error> {
        let lines = reader.lines().collect::<Result<Vec<_>, _>>()?;

        let mut language = String::new();
        let mut last_comment: Option<String> = None;
        let mut pairs = Vec::new();

        for line in &lines {
            let trimmed = line.trim();
            if let Some(header) = trimmed.strip_prefix("//:") {
                // Example: "//: Language: English"
                if let Some((key, value)) = header.split_once(':') {
                    if key.trim() == "Language" {
                        language = value.trim().to_string();
                    }
                }
                continue;
            }
            if trimmed.is_empty() {
                continue;
            }
            if trimmed.starts_with("/*") || trimmed.starts_with("//") {
                last_comment = Some(trimmed.to_string());
                continue;
            }
            if let Some((key, value)) = parse_pair(trimmed) {
                pairs.push(Pair {
                    key,
                    value,
                    comment: last_comment.take(),
                });
            }
        }

        Ok(Format { language, pairs })
    }

    fn to_writer<W: std::io::Write>(&self, mut writer: W) -> Result<(), Error> {
        let mut content = format!(
            indoc! {"
            // This file is generated by locbridge from the JSON translations.
            // Do not edit it manually, as your changes will be overwritten.
            //
            //: Language: {}
            //

            "},
            self.language
        );

        for pair in &self.pairs {
            content.push_str(&pair.to_string());
            content.push('\n');
        }

        writer.write_all(content.as_bytes()).map_err(Error::Io)
    }

    /// Override default file reading to support BOM-aware decoding (e.g., UTF-16 Apple .strings)
    fn read_from<P: AsRef<Path>>(path: P) -> Result<Self, Error>
    where
        Self: Sized,
    {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| Error::reading(path, e))?;
        // Auto-detect BOM, decode to UTF-8; passthrough UTF-8
        let mut decoder = encoding_rs_io::DecodeReaderBytesBuilder::new()
            .bom_override(true)
            .build(file);

        let mut decoded = String::new();
        decoder
            .read_to_string(&mut decoded)
            .map_err(|e| Error::reading(path, e))?;

        Self::from_str(&decoded)
    }
}

/// A single key-value pair in a `.strings` file, possibly with an associated comment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pair {
    pub key: String,
    pub value: String,
    /// Comment line immediately preceding the pair, marker included.
    pub comment: Option<String>,
}

impl std::fmt::Display for Pair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(comment) = &self.comment {
            writeln!(f, "{}", comment)?;
        }
        write!(f, "\"{}\" = \"{}\";", self.key, self.value)
    }
}

// Parses `"key" = "value";`, honoring backslash escapes inside the quotes.
fn parse_pair(line: &str) -> Option<(String, String)> {
    let (key, rest) = quoted(line)?;
    let rest = rest.trim_start().strip_prefix('=')?;
    let (value, rest) = quoted(rest.trim_start())?;
    rest.trim_start().starts_with(';').then_some((key, value))
}

fn quoted(input: &str) -> Option<(String, &str)> {
    let body = input.strip_prefix('"')?;
    let mut escaped = false;
    for (i, c) in body.char_indices() {
        match c {
            '\\' if !escaped => escaped = true,
            '"' if !escaped => return Some((body[..i].to_string(), &body[i + 1..])),
            _ => escaped = false,
        }
    }
    None
}
