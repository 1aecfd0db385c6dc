//! Event reading over the XML parts of an xlsx package.

use crate::error::SweeperError;
use quick_xml::escape::resolve_xml_entity;
use quick_xml::events::BytesRef;
use quick_xml::events::BytesStart;
use quick_xml::events::Event;
use quick_xml::name::QName;
use quick_xml::Reader;
use std::io::BufRead;
use std::str::FromStr;
use thiserror::Error;

const TAG_TEXT: QName = QName(b"t");
const TAG_PHONETIC: QName = QName(b"rPh");

#[derive(Error, Debug)]
pub enum XmlError {
    #[error("Unknown entity '&{0};'")]
    UnknownEntity(String),

    #[error("Invalid character reference '&{0};'")]
    InvalidCharacterReference(String),

    #[error("Attribute '{name}' has invalid value '{value}'")]
    InvalidAttribute { name: String, value: String },
}

/// Pull reader over one part of the package.
///
/// Empty elements are reported as a start and an end event, so `<c r="A1"/>`
/// and `<c r="A1"></c>` read the same.
pub(crate) struct PartReader<R: BufRead> {
    reader: Reader<R>,
    buffer: Vec<u8>,
}

impl<R: BufRead> PartReader<R> {
    pub(crate) fn new(source: R) -> Self {
        let mut reader = Reader::from_reader(source);
        let config = reader.config_mut();
        config.expand_empty_elements = true;
        config.check_end_names = false;
        config.trim_text(false);
        PartReader {
            reader,
            buffer: Vec::with_capacity(1024),
        }
    }

    /// Next event, `None` once the part is exhausted.
    pub(crate) fn next(&mut self) -> Result<Option<Event<'_>>, SweeperError> {
        self.buffer.clear();
        match self.reader.read_event_into(&mut self.buffer)? {
            Event::Eof => Ok(None),
            event => Ok(Some(event)),
        }
    }

    /// Collects a string value up to the closing `end` tag.
    ///
    /// Rich text runs (`<t>`) are concatenated, phonetic runs (`<rPh>`) are
    /// skipped. With `bare` set, text directly inside the element belongs to
    /// the value as well, as in `<v>42</v>`.
    pub(crate) fn read_text(&mut self, end: QName, bare: bool) -> Result<String, SweeperError> {
        let mut text = String::new();
        let mut phonetic = 0usize;
        let mut in_run = false;
        while let Some(event) = self.next()? {
            let collecting = phonetic == 0 && (bare || in_run);
            match event {
                Event::End(tag) if tag.name() == end => break,
                Event::Start(tag) if tag.name() == TAG_PHONETIC => phonetic += 1,
                Event::End(tag) if tag.name() == TAG_PHONETIC => phonetic = phonetic.saturating_sub(1),
                Event::Start(tag) if tag.name() == TAG_TEXT => in_run = true,
                Event::End(tag) if tag.name() == TAG_TEXT => in_run = false,
                Event::Text(content) if collecting => text.push_str(&content.xml_content()?),
                Event::CData(content) if collecting => text.push_str(&content.xml_content()?),
                Event::GeneralRef(reference) if collecting => push_reference(&mut text, &reference)?,
                _ => (),
            }
        }
        Ok(text)
    }
}

/// Unescaped value of the attribute with the given local name (`r:id` matches `id`).
pub(crate) fn attribute(tag: &BytesStart, name: &str) -> Result<Option<String>, SweeperError> {
    for attribute in tag.attributes() {
        let attribute = attribute?;
        if attribute.key.local_name().as_ref() == name.as_bytes() {
            return Ok(Some(attribute.unescape_value()?.into_owned()));
        }
    }
    Ok(None)
}

/// Parses an attribute value, `None` when the attribute is absent.
pub(crate) fn parse_attribute<T: FromStr>(tag: &BytesStart, name: &str) -> Result<Option<T>, SweeperError> {
    match attribute(tag, name)? {
        Some(value) => match value.trim().parse() {
            Ok(parsed) => Ok(Some(parsed)),
            Err(_) => Err(XmlError::InvalidAttribute {
                name: name.to_owned(),
                value,
            }
            .into()),
        },
        None => Ok(None),
    }
}

/// Appends a predefined entity (`&amp;`) or a character reference (`&#65;`, `&#x42;`).
fn push_reference(text: &mut String, reference: &BytesRef) -> Result<(), SweeperError> {
    let name = reference.xml_content()?;
    if let Some(entity) = resolve_xml_entity(&name) {
        text.push_str(entity);
        return Ok(());
    }
    let Some(number) = name.strip_prefix('#') else {
        return Err(XmlError::UnknownEntity(name.into_owned()).into());
    };
    let code = match number.strip_prefix(['x', 'X']) {
        Some(hex) => u32::from_str_radix(hex, 16).ok(),
        None => number.parse::<u32>().ok(),
    };
    match code.and_then(char::from_u32) {
        Some(character) => {
            text.push(character);
            Ok(())
        }
        None => Err(XmlError::InvalidCharacterReference(name.into_owned()).into()),
    }
}
