//! Low-level XML output.

mod writer;

pub use writer::{XmlStreamWriter, XmlWriteError};
