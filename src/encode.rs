//! Record encoding: one [`Record`] into one row of staging-format tokens.
//!
//! Canonical renderings, chosen to match what the generated COPY statement
//! declares:
//!
//! - integers and floats via `Display` (locale-independent; `f64` `Display`
//!   never produces scientific notation)
//! - booleans as `t` / `f`
//! - dates `%Y-%m-%d`, times `%H:%M:%S`, timestamps `%Y-%m-%dT%H:%M:%S`
//!   (the COPY `TIMEFORMAT`)
//! - null or absent values as empty tokens
//! - geometry as lowercase-hex EWKB, or an empty token when null
//!
//! Quoting and delimiter escaping are the staging writer's concern; tokens
//! leave here verbatim.

use crate::{
    ewkb,
    record::{FieldValue, Record},
    schema::Schema,
};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Geometry that cannot be expressed in the staging encoding. Carries the
    /// 1-based position of the offending record so a million-row run fails
    /// with something actionable.
    #[error("record {row}: {source}")]
    Geometry {
        row: usize,
        #[source]
        source: ewkb::Error,
    },
}

/// Stateless encoder for one dataset: schema order plus the dataset SRID.
pub struct RecordEncoder<'a> {
    schema: &'a Schema,
    srid: Option<i32>,
}

impl<'a> RecordEncoder<'a> {
    pub fn new(schema: &'a Schema, srid: Option<i32>) -> Self {
        Self { schema, srid }
    }

    /// Encode one record into `schema.column_count()` tokens, attributes in
    /// schema order and geometry last. `row` is the 1-based record position.
    pub fn encode(&self, row: usize, record: &Record) -> Result<Vec<String>, Error> {
        let mut tokens = Vec::with_capacity(self.schema.column_count());
        for column in &self.schema.attributes {
            tokens.push(render_value(record.value(&column.name)));
        }
        let geometry = match &record.geometry {
            Some(geometry) => ewkb::encode_hex(geometry, self.srid)
                .map_err(|source| Error::Geometry { row, source })?,
            None => String::new(),
        };
        tokens.push(geometry);
        Ok(tokens)
    }
}

fn render_value(value: &FieldValue) -> String {
    match value {
        FieldValue::Integer(value) => value.to_string(),
        FieldValue::Float(value) => value.to_string(),
        FieldValue::Text(value) => value.clone(),
        FieldValue::Date(value) => value.format("%Y-%m-%d").to_string(),
        FieldValue::Time(value) => value.format("%H:%M:%S").to_string(),
        FieldValue::Timestamp(value) => value.format("%Y-%m-%dT%H:%M:%S").to_string(),
        FieldValue::Boolean(value) => if *value { "t" } else { "f" }.to_string(),
        FieldValue::Null => String::new(),
    }
}
