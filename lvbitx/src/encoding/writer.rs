use std::io::Write;

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use thiserror::Error;

/// XML stream writer specialized for producing LVBITX documents.
///
/// Output is indented. The FPGA driver does not care about the exact
/// whitespace, but stable output keeps golden-file comparisons useful.
pub struct XmlStreamWriter<T> {
    writer: quick_xml::Writer<T>,
}

#[derive(Debug, Error)]
/// Error returned when writing XML.
pub enum XmlWriteError {
    #[error("{0}")]
    /// Invalid XML input.
    Xml(#[from] quick_xml::Error),
    #[error("Failed to write to stream: {0}")]
    /// Failed to write XML to stream.
    Io(#[from] std::io::Error),
    #[error("Generated document is not valid UTF-8: {0}")]
    /// The buffer the document was written to does not hold UTF-8.
    Utf8(#[from] std::string::FromUtf8Error),
}

impl<T: Write> XmlStreamWriter<T> {
    /// Create a new writer with the given inner Write implementation.
    pub fn new(writer: T) -> Self {
        Self {
            writer: quick_xml::Writer::new_with_indent(writer, b' ', 2),
        }
    }

    /// Write the XML declaration.
    pub fn write_declaration(&mut self) -> Result<(), XmlWriteError> {
        self.writer
            .write_event(Event::Decl(BytesDecl::new("1.0", None, None)))?;
        Ok(())
    }

    /// Write a start tag to the stream.
    pub fn write_start(&mut self, tag: &str) -> Result<(), XmlWriteError> {
        self.writer
            .write_event(Event::Start(BytesStart::new(tag)))?;
        Ok(())
    }

    /// Write a start tag carrying the given attributes.
    pub fn write_start_with_attributes(
        &mut self,
        tag: &str,
        attributes: &[(&str, &str)],
    ) -> Result<(), XmlWriteError> {
        let mut start = BytesStart::new(tag);
        for (name, value) in attributes {
            start.push_attribute((*name, *value));
        }
        self.writer.write_event(Event::Start(start))?;
        Ok(())
    }

    /// Write an end tag to the stream.
    pub fn write_end(&mut self, tag: &str) -> Result<(), XmlWriteError> {
        self.writer.write_event(Event::End(BytesEnd::new(tag)))?;
        Ok(())
    }

    /// Write an empty tag to the stream.
    pub fn write_empty(&mut self, tag: &str) -> Result<(), XmlWriteError> {
        self.writer
            .write_event(Event::Empty(BytesStart::new(tag)))?;
        Ok(())
    }

    /// Write an empty tag carrying the given attributes.
    pub fn write_empty_with_attributes(
        &mut self,
        tag: &str,
        attributes: &[(&str, &str)],
    ) -> Result<(), XmlWriteError> {
        let mut empty = BytesStart::new(tag);
        for (name, value) in attributes {
            empty.push_attribute((*name, *value));
        }
        self.writer.write_event(Event::Empty(empty))?;
        Ok(())
    }

    /// Write node contents to the stream.
    pub fn write_text(&mut self, text: &str) -> Result<(), XmlWriteError> {
        self.writer.write_event(Event::Text(BytesText::new(text)))?;
        Ok(())
    }

    /// Write an element holding plain text content.
    pub fn write_text_element(&mut self, tag: &str, text: &str) -> Result<(), XmlWriteError> {
        self.write_start(tag)?;
        self.write_text(text)?;
        self.write_end(tag)?;
        Ok(())
    }
}
