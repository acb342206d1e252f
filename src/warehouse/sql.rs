//! Statement builders for the load.

use std::fmt::Write as _;

use crate::schema::Schema;

fn generate_create_table(out: &mut String, table: &str, schema: &Schema) -> std::fmt::Result {
    write!(out, "CREATE TABLE {table} (")?;
    for column in &schema.attributes {
        write!(out, "{} {}, ", column.name, column.ty.sql())?;
    }
    write!(out, "{} GEOMETRY)", schema.geometry_column)?;
    Ok(())
}

pub fn create_table(table: &str, schema: &Schema) -> String {
    let mut out = String::new();
    generate_create_table(&mut out, table, schema).unwrap();
    out
}

/// COPY the staged object into the table. The format clauses mirror the
/// staging writer's grammar: CSV with a header line, timestamps rendered as
/// `YYYY-MM-DDTHH:MI:SS`.
pub fn copy_from(table: &str, location: &str, iam_role: &str) -> String {
    format!(
        "COPY {table} FROM '{location}' \
         IAM_ROLE '{iam_role}' \
         FORMAT CSV IGNOREHEADER 1 \
         TIMEFORMAT 'YYYY-MM-DDTHH:MI:SS'"
    )
}

/// Existence probe: succeeds iff the table exists, reads no rows.
pub fn probe(table: &str) -> String {
    format!("SELECT 1 FROM {table} WHERE 1 = 0")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{SourceField, SourceType};

    #[test]
    fn create_table_lists_columns_in_order_geometry_last() {
        let schema = Schema::infer(
            &[
                SourceField::new("id", SourceType::Integer),
                SourceField::new("name", SourceType::Text { width: Some(40) }),
                SourceField::new("height", SourceType::Float),
            ],
            "geom",
        );
        assert_eq!(
            create_table("public.buildings", &schema),
            "CREATE TABLE public.buildings (\
             id BIGINT, name VARCHAR(40), height DOUBLE PRECISION, geom GEOMETRY)"
        );
    }

    #[test]
    fn copy_declares_the_staging_grammar() {
        assert_eq!(
            copy_from(
                "buildings",
                "s3://lake/buildings/paris.geojson.csv",
                "arn:aws:iam::123456789012:role/redshift-copy"
            ),
            "COPY buildings FROM 's3://lake/buildings/paris.geojson.csv' \
             IAM_ROLE 'arn:aws:iam::123456789012:role/redshift-copy' \
             FORMAT CSV IGNOREHEADER 1 \
             TIMEFORMAT 'YYYY-MM-DDTHH:MI:SS'"
        );
    }

    #[test]
    fn probe_reads_no_rows() {
        assert_eq!(probe("buildings"), "SELECT 1 FROM buildings WHERE 1 = 0");
    }
}
