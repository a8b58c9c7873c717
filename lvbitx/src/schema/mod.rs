//! The LVBITX document schema.

pub mod bitfile;
