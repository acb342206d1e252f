//! Streaming GeoJSON reader.
//!
//! GeoJSON carries no schema, so the field list is inferred from the first
//! feature's properties, the same way OGR's GeoJSON driver does. The feature
//! stream is re-opened for the transform pass; memory stays constant in the
//! number of features.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use geojson::FeatureReader;
use tracing::debug;

use crate::record::{FieldValue, Record};
use crate::schema::{SourceField, SourceType};

/// RFC 7946 fixes the GeoJSON reference system to WGS84.
pub const GEOJSON_SRID: i32 = 4326;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("open {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("feature {index}: {source}")]
    Parse {
        index: usize,
        #[source]
        source: geojson::Error,
    },
    #[error("feature {index}: unrepresentable geometry: {source}")]
    Geometry {
        index: usize,
        #[source]
        source: geojson::Error,
    },
    /// Nothing to infer a field list from.
    #[error("dataset has no features")]
    Empty,
}

#[derive(Debug)]
pub struct GeoJsonSource {
    path: PathBuf,
    fields: Vec<SourceField>,
}

impl GeoJsonSource {
    /// Open the dataset and infer its field list from the first feature.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, Error> {
        let path = path.into();
        let first = feature_reader(&path)?
            .features()
            .next()
            .ok_or(Error::Empty)?
            .map_err(|source| Error::Parse { index: 1, source })?;
        let fields = infer_fields(&first);
        debug!(path = %path.display(), fields = fields.len(), "inferred source fields");
        Ok(Self { path, fields })
    }

    pub fn fields(&self) -> &[SourceField] {
        &self.fields
    }

    pub fn srid(&self) -> Option<i32> {
        Some(GEOJSON_SRID)
    }

    /// Stream the dataset's features as records, in file order.
    pub fn records(&self) -> Result<impl Iterator<Item = Result<Record, Error>> + use<>, Error> {
        let features = feature_reader(&self.path)?.features();
        Ok(features.enumerate().map(|(index, feature)| {
            let index = index + 1;
            let feature = feature.map_err(|source| Error::Parse { index, source })?;
            let geometry = feature
                .geometry
                .map(|geometry| {
                    geo_types::Geometry::<f64>::try_from(geometry.value)
                        .map_err(|source| Error::Geometry { index, source })
                })
                .transpose()?;
            let mut record = Record::new(geometry);
            if let Some(properties) = feature.properties {
                for (name, value) in properties {
                    record.properties.insert(name, field_value(value));
                }
            }
            Ok(record)
        }))
    }
}

fn feature_reader(path: &Path) -> Result<FeatureReader<BufReader<File>>, Error> {
    let file = File::open(path).map_err(|source| Error::Open {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(FeatureReader::from_reader(BufReader::new(file)))
}

fn infer_fields(feature: &geojson::Feature) -> Vec<SourceField> {
    feature
        .properties
        .iter()
        .flatten()
        .map(|(name, value)| SourceField::new(name.clone(), source_type(value)))
        .collect()
}

fn source_type(value: &serde_json::Value) -> SourceType {
    use serde_json::Value;
    match value {
        Value::Bool(_) => SourceType::Boolean,
        Value::Number(number) if number.is_i64() || number.is_u64() => SourceType::Integer,
        Value::Number(_) => SourceType::Float,
        Value::String(text) => classify_text(text),
        // A null carries no type information; text holds anything.
        Value::Null => SourceType::Text { width: None },
        Value::Array(_) => SourceType::Other("array".into()),
        Value::Object(_) => SourceType::Other("object".into()),
    }
}

fn classify_text(text: &str) -> SourceType {
    if parse_timestamp(text).is_some() {
        SourceType::Datetime
    } else if NaiveDate::parse_from_str(text, "%Y-%m-%d").is_ok() {
        SourceType::Date
    } else if NaiveTime::parse_from_str(text, "%H:%M:%S").is_ok() {
        SourceType::Time
    } else {
        SourceType::Text { width: None }
    }
}

fn parse_timestamp(text: &str) -> Option<NaiveDateTime> {
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
}

fn field_value(value: serde_json::Value) -> FieldValue {
    use serde_json::Value;
    match value {
        Value::Null => FieldValue::Null,
        Value::Bool(value) => FieldValue::Boolean(value),
        Value::Number(number) => {
            if let Some(value) = number.as_i64() {
                FieldValue::Integer(value)
            } else if let Some(value) = number.as_f64() {
                FieldValue::Float(value)
            } else {
                FieldValue::Text(number.to_string())
            }
        }
        Value::String(text) => {
            if let Some(timestamp) = parse_timestamp(&text) {
                FieldValue::Timestamp(timestamp)
            } else if let Ok(date) = NaiveDate::parse_from_str(&text, "%Y-%m-%d") {
                FieldValue::Date(date)
            } else if let Ok(time) = NaiveTime::parse_from_str(&text, "%H:%M:%S") {
                FieldValue::Time(time)
            } else {
                FieldValue::Text(text)
            }
        }
        // Arrays and objects ride along as compact JSON text.
        other => FieldValue::Text(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo_types::Geometry;
    use std::io::Write as _;

    const DATASET: &str = r#"{
        "type": "FeatureCollection",
        "features": [
            {
                "type": "Feature",
                "geometry": {"type": "Point", "coordinates": [2.35, 48.86]},
                "properties": {
                    "id": 1,
                    "name": "mairie",
                    "height": 12.5,
                    "listed": true,
                    "built": "1907-06-01",
                    "surveyed": "2021-03-14T09:26:53",
                    "tags": ["a", "b"]
                }
            },
            {
                "type": "Feature",
                "geometry": null,
                "properties": {"id": 2, "name": null}
            }
        ]
    }"#;

    fn write_dataset(content: &str) -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.geojson");
        let mut file = File::create(&path).unwrap();
        file.write_all(content.as_bytes()).unwrap();
        (dir, path)
    }

    #[test]
    fn infers_fields_from_first_feature() {
        let (_dir, path) = write_dataset(DATASET);
        let source = GeoJsonSource::open(&path).unwrap();
        let types: Vec<_> = source
            .fields()
            .iter()
            .map(|field| (field.name.as_str(), field.ty.clone()))
            .collect();
        assert_eq!(
            types,
            [
                ("id", SourceType::Integer),
                ("name", SourceType::Text { width: None }),
                ("height", SourceType::Float),
                ("listed", SourceType::Boolean),
                ("built", SourceType::Date),
                ("surveyed", SourceType::Datetime),
                ("tags", SourceType::Other("array".into())),
            ]
        );
        assert_eq!(source.srid(), Some(4326));
    }

    #[test]
    fn streams_records_with_resolved_values() {
        let (_dir, path) = write_dataset(DATASET);
        let source = GeoJsonSource::open(&path).unwrap();
        let records: Vec<_> = source.records().unwrap().collect::<Result<_, _>>().unwrap();
        assert_eq!(records.len(), 2);
        assert!(matches!(
            records[0].geometry,
            Some(Geometry::Point(_))
        ));
        assert_eq!(records[0].value("id"), &FieldValue::Integer(1));
        assert_eq!(
            records[0].value("tags"),
            &FieldValue::Text(r#"["a","b"]"#.into())
        );
        assert!(matches!(
            records[0].value("surveyed"),
            FieldValue::Timestamp(_)
        ));
        assert!(records[1].geometry.is_none());
        assert!(records[1].value("name").is_null());
        // Absent field reads as null too.
        assert!(records[1].value("height").is_null());
    }

    #[test]
    fn empty_dataset_is_rejected() {
        let (_dir, path) = write_dataset(r#"{"type": "FeatureCollection", "features": []}"#);
        assert!(matches!(GeoJsonSource::open(&path), Err(Error::Empty)));
    }

    #[test]
    fn missing_file_reports_path() {
        let err = GeoJsonSource::open("/nonexistent/data.geojson").unwrap_err();
        assert!(err.to_string().contains("/nonexistent/data.geojson"));
    }
}
