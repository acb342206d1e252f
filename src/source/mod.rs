//! Source dataset readers.
//!
//! A reader turns a geospatial file into a declared attribute field list plus
//! a forward-only stream of [`crate::record::Record`]s, resolving raw values
//! into [`crate::record::FieldValue`] exactly once at read time.

pub mod geojson;
