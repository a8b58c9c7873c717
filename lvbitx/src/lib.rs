#![warn(missing_docs)]

//! Reading and generation of LabVIEW FPGA bitfile containers (LVBITX).
//!
//! An LVBITX file is an XML document carrying the metadata of a compiled
//! FPGA design: the register map, DMA channel allocations, register blocks,
//! base clocks, the VI icon, and the compiled bitstream itself as a
//! base64-encoded payload.
//!
//! - [`schema::bitfile`] maps the document onto typed descriptor records.
//! - [`generate`] builds a schema-conformant document back from descriptors,
//!   with the element ordering the FPGA driver expects.
//!
//! The signature strings embedded in a bitfile are carried verbatim in both
//! directions. This crate never recomputes them; the driver only checks that
//! the signature it is handed on load matches the one in the file, so the
//! caller is responsible for keeping them consistent.
//!
//! XML parsing is done with the `roxmltree` crate; output is produced with
//! `quick-xml`.

use roxmltree::Node;

mod encoding;
mod error;
mod ext;
pub mod generate;
pub mod schema;

pub use encoding::{XmlStreamWriter, XmlWriteError};
pub use error::{LoadError, XmlError, XmlErrorInner};
pub use generate::{generate_bitfile, generate_bitfile_at};
pub use schema::bitfile::{load_bitfile, load_bitfile_file, Bitfile};

/// Trait for types that can be loaded from an XML node.
pub trait XmlLoad<'input>: Sized {
    /// Load Self from an XML node.
    fn load(node: &Node<'_, 'input>) -> Result<Self, XmlError>;
}

/// Trait for types that can be loaded from an XML node body.
pub trait FromValue: Sized {
    /// Load Self from the body of a node. `v` is the value being parsed,
    /// `attr` and `node` are given for context and error handling.
    fn from_value(node: &Node<'_, '_>, attr: &str, v: &str) -> Result<Self, XmlError>;
}

macro_rules! from_int {
    ($ty:ident) => {
        impl FromValue for $ty {
            fn from_value(node: &Node<'_, '_>, attr: &str, v: &str) -> Result<Self, XmlError> {
                // Pretty-printed documents may pad the content with
                // whitespace, which the schema treats as insignificant
                // for numbers.
                v.trim().parse().map_err(|e| XmlError::parse_int(node, attr, e))
            }
        }
    };
}

from_int!(u32);
from_int!(i32);

impl FromValue for String {
    fn from_value(_node: &Node<'_, '_>, _attr: &str, v: &str) -> Result<Self, XmlError> {
        Ok(v.to_owned())
    }
}

impl FromValue for f64 {
    fn from_value(node: &Node<'_, '_>, attr: &str, v: &str) -> Result<Self, XmlError> {
        v.trim().parse().map_err(|e| XmlError::parse_float(node, attr, e))
    }
}

impl FromValue for bool {
    fn from_value(_node: &Node<'_, '_>, _attr: &str, v: &str) -> Result<Self, XmlError> {
        // The schema writes booleans as the literal "true"/"false";
        // anything other than "true" reads as false.
        Ok(v == "true")
    }
}

impl<'input, T> XmlLoad<'input> for T
where
    T: FromValue + Default,
{
    fn load(node: &Node<'_, 'input>) -> Result<Self, XmlError> {
        T::from_value(node, "content", node.text().unwrap_or_default())
    }
}
