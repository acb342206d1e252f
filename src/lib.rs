//! Import geospatial vector data into Amazon Redshift.
//!
//! The pipeline streams a GeoJSON dataset into a CSV staging file whose
//! geometry column carries lowercase-hex EWKB, uploads the file to S3, then
//! creates the target table and drives an asynchronous COPY through the
//! Redshift Data API. Object storage and the warehouse are reached through
//! narrow collaborator traits ([`transfer::Client`], [`warehouse::Client`])
//! so the whole flow runs against in-memory fakes in tests.

pub mod config;
pub mod encode;
pub mod ewkb;
pub mod pipeline;
pub mod progress;
pub mod record;
pub mod schema;
pub mod source;
pub mod staging;
pub mod transfer;
pub mod warehouse;

#[cfg(test)]
mod tests;
