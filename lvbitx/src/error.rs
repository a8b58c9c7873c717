use std::{
    num::{ParseFloatError, ParseIntError},
    ops::Range,
};

use roxmltree::Node;
use thiserror::Error;

#[derive(Error, Debug, Clone)]
/// Inner error variant of an error decoding an LVBITX document.
pub enum XmlErrorInner {
    #[error("Failed to load XML: {0}")]
    /// The document itself could not be parsed.
    Xml(#[from] roxmltree::Error),
    #[error("Expected child: {0}")]
    /// Required element was missing.
    MissingField(String),
    #[error("Expected attribute: {0}")]
    /// Required attribute was missing.
    MissingAttribute(String),
    #[error("Failed to parse {0} as integer.")]
    /// Failed to parse content as integer.
    ParseInt(String, ParseIntError),
    #[error("Failed to parse {0} as float.")]
    /// Failed to parse content as float.
    ParseFloat(String, ParseFloatError),
    #[error("Unknown {0} value: {1}")]
    /// Text or numeric code not present in a fixed lookup table.
    UnknownEnumValue(&'static str, String),
    #[error("Missing node content")]
    /// Missing required content.
    MissingContent,
    #[error("{0}")]
    /// Some other error.
    Other(String),
}

#[derive(Error, Debug, Clone)]
#[error("{error} at {span:?}")]
/// Error returned from decoding an LVBITX document.
pub struct XmlError {
    /// Where in the document the node that caused the issue is found.
    pub span: Range<usize>,
    /// The inner error variant.
    pub error: XmlErrorInner,
}

impl From<roxmltree::Error> for XmlError {
    fn from(value: roxmltree::Error) -> Self {
        Self {
            span: 0..0,
            error: XmlErrorInner::Xml(value),
        }
    }
}

impl XmlError {
    /// Create an error for a node with a missing child element with name `name`.
    pub fn missing_field(node: &Node<'_, '_>, name: &str) -> Self {
        Self {
            span: node.range(),
            error: XmlErrorInner::MissingField(name.to_owned()),
        }
    }

    /// Create an error for a node with a missing attribute with name `name`.
    pub fn missing_attribute(node: &Node<'_, '_>, name: &str) -> Self {
        Self {
            span: node.range(),
            error: XmlErrorInner::MissingAttribute(name.to_owned()),
        }
    }

    /// Create an error for some other, general error.
    pub fn other(node: &Node<'_, '_>, info: &str) -> Self {
        Self {
            span: node.range(),
            error: XmlErrorInner::Other(info.to_owned()),
        }
    }

    /// Create an error for failing to parse a string as an integer.
    pub fn parse_int(node: &Node<'_, '_>, attr: &str, err: ParseIntError) -> Self {
        Self {
            span: node.range(),
            error: XmlErrorInner::ParseInt(attr.to_owned(), err),
        }
    }

    /// Create an error for failing to parse a string as a float.
    pub fn parse_float(node: &Node<'_, '_>, attr: &str, err: ParseFloatError) -> Self {
        Self {
            span: node.range(),
            error: XmlErrorInner::ParseFloat(attr.to_owned(), err),
        }
    }

    /// Create an error for text not present in the lookup table named `table`.
    pub fn unknown_enum(node: &Node<'_, '_>, table: &'static str, value: &str) -> Self {
        Self {
            span: node.range(),
            error: XmlErrorInner::UnknownEnumValue(table, value.to_owned()),
        }
    }

    /// Create an error for a numeric code not present in the lookup table named `table`.
    pub fn unknown_enum_code(table: &'static str, code: u8) -> Self {
        Self {
            span: 0..0,
            error: XmlErrorInner::UnknownEnumValue(table, code.to_string()),
        }
    }

    /// Create an error indicating that `node` does not have the necessary content.
    pub fn missing_content(node: &Node<'_, '_>) -> Self {
        Self {
            span: node.range(),
            error: XmlErrorInner::MissingContent,
        }
    }
}

#[derive(Error, Debug)]
/// Error returned from loading an LVBITX file from disk.
pub enum LoadError {
    #[error("{0}: {1}")]
    /// Failed to read the file.
    Io(String, std::io::Error),
    #[error("Failed to load XML: {0}")]
    /// Failed to parse or decode the document.
    Xml(#[from] XmlError),
}
