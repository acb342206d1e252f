use std::borrow::Cow;

/// Schema inference never fails; unknown source types degrade to text
/// columns. The enum is kept so callers have a stable error slot should a
/// future source format carry constraints worth rejecting.
#[derive(Debug, thiserror::Error)]
pub enum Error {}

/// Type tag declared (or inferred) by the source dataset reader.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceType {
    Integer,
    Float,
    /// Text with an optional declared maximum width.
    Text {
        width: Option<u32>,
    },
    Date,
    Time,
    Datetime,
    Boolean,
    /// Anything the reader could not classify. Preserved as text, never
    /// dropped.
    Other(String),
}

/// One attribute field as declared by the source dataset.
#[derive(Debug, Clone)]
pub struct SourceField {
    pub name: String,
    pub ty: SourceType,
}

impl SourceField {
    pub fn new(name: impl Into<String>, ty: SourceType) -> Self {
        Self {
            name: name.into(),
            ty,
        }
    }
}

/// Warehouse column type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnType {
    BigInt,
    DoublePrecision,
    Varchar(Option<u32>),
    Date,
    Time,
    Timestamp,
    Boolean,
    Geometry,
}

impl ColumnType {
    /// SQL spelling used in the CREATE TABLE statement.
    pub fn sql(&self) -> Cow<'static, str> {
        match self {
            Self::BigInt => "BIGINT".into(),
            Self::DoublePrecision => "DOUBLE PRECISION".into(),
            Self::Varchar(Some(width)) => format!("VARCHAR({width})").into(),
            Self::Varchar(None) => "VARCHAR(MAX)".into(),
            Self::Date => "DATE".into(),
            Self::Time => "TIME".into(),
            Self::Timestamp => "TIMESTAMP".into(),
            Self::Boolean => "BOOLEAN".into(),
            Self::Geometry => "GEOMETRY".into(),
        }
    }
}

fn warehouse_type(source: &SourceType) -> ColumnType {
    match source {
        SourceType::Integer => ColumnType::BigInt,
        SourceType::Float => ColumnType::DoublePrecision,
        SourceType::Text { width } => ColumnType::Varchar(*width),
        SourceType::Date => ColumnType::Date,
        SourceType::Time => ColumnType::Time,
        SourceType::Datetime => ColumnType::Timestamp,
        SourceType::Boolean => ColumnType::Boolean,
        SourceType::Other(_) => ColumnType::Varchar(None),
    }
}

#[derive(Debug, Clone)]
pub struct Column {
    pub name: String,
    pub ty: ColumnType,
}

/// Target table schema: attribute columns in source order, then one geometry
/// column. Field names are unique and the order is shared with every encoded
/// row.
#[derive(Debug, Clone)]
pub struct Schema {
    pub attributes: Vec<Column>,
    pub geometry_column: String,
}

impl Schema {
    /// Derive the table schema from the source's declared field list.
    ///
    /// Total: every source type has a warehouse mapping, with unrecognized
    /// types preserved as `VARCHAR(MAX)`. The geometry column is always
    /// appended last.
    pub fn infer(fields: &[SourceField], geometry_column: impl Into<String>) -> Self {
        let attributes = fields
            .iter()
            .map(|field| Column {
                name: field.name.clone(),
                ty: warehouse_type(&field.ty),
            })
            .collect();
        Self {
            attributes,
            geometry_column: geometry_column.into(),
        }
    }

    /// Attribute columns plus the geometry column.
    pub fn column_count(&self) -> usize {
        self.attributes.len() + 1
    }

    /// Column names in row order, geometry last. Used for the staging header.
    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.attributes
            .iter()
            .map(|column| column.name.as_str())
            .chain(std::iter::once(self.geometry_column.as_str()))
    }
}
