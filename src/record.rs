use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use geo_types::Geometry;
use indexmap::IndexMap;

/// One attribute value, resolved to a concrete type at read time.
///
/// Readers branch on the raw source representation exactly once; everything
/// downstream matches on this variant.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Integer(i64),
    Float(f64),
    Text(String),
    Date(NaiveDate),
    Time(NaiveTime),
    Timestamp(NaiveDateTime),
    Boolean(bool),
    Null,
}

impl FieldValue {
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

/// One feature from the source dataset: an optional geometry plus the
/// attribute map. Consumed exactly once by the record encoder.
#[derive(Debug, Clone)]
pub struct Record {
    pub geometry: Option<Geometry<f64>>,
    pub properties: IndexMap<String, FieldValue>,
}

impl Record {
    pub fn new(geometry: Option<Geometry<f64>>) -> Self {
        Self {
            geometry,
            properties: IndexMap::new(),
        }
    }

    /// Attribute lookup; absent fields read as null.
    pub fn value(&self, field: &str) -> &FieldValue {
        self.properties.get(field).unwrap_or(&FieldValue::Null)
    }
}
