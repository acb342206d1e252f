//! Staging artifact writer.
//!
//! Streams encoded rows into a local CSV file: delimiter `,`, quote `"`
//! (doubled to escape), `\n` terminators, quoting only where needed, one
//! header line of column names. The COPY statement built in
//! [`crate::warehouse::sql`] declares the matching grammar.
//!
//! The writer is the sole owner of the file handle. Until [`finish`] runs the
//! artifact counts as incomplete and is unlinked on drop, so an error
//! mid-stream never leaves a partial file that looks like a finished export.
//!
//! [`finish`]: StagingWriter::finish

use std::fs::File;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::{
    encode::{self, RecordEncoder},
    record::Record,
    schema::Schema,
};

#[derive(Debug, thiserror::Error)]
pub enum Error<E> {
    #[error("source: {0}")]
    Source(E),
    #[error(transparent)]
    Encode(encode::Error),
    #[error("staging write: {0}")]
    Write(#[from] csv::Error),
}

pub struct StagingWriter {
    writer: csv::Writer<File>,
    path: PathBuf,
    rows: usize,
    finished: bool,
}

impl StagingWriter {
    /// Open the artifact and write the header row.
    pub fn create(path: impl Into<PathBuf>, schema: &Schema) -> Result<Self, csv::Error> {
        let path = path.into();
        let mut writer = csv::WriterBuilder::new()
            .delimiter(b',')
            .quote(b'"')
            .terminator(csv::Terminator::Any(b'\n'))
            .quote_style(csv::QuoteStyle::Necessary)
            .from_path(&path)?;
        writer.write_record(schema.column_names())?;
        Ok(Self {
            writer,
            path,
            rows: 0,
            finished: false,
        })
    }

    /// Append one encoded row.
    pub fn write_row(&mut self, tokens: &[String]) -> Result<(), csv::Error> {
        self.writer.write_record(tokens)?;
        self.rows += 1;
        Ok(())
    }

    /// Flush and seal the artifact, returning the data row count (the header
    /// is not counted).
    pub fn finish(mut self) -> Result<usize, csv::Error> {
        self.writer.flush()?;
        self.finished = true;
        debug!(path = %self.path.display(), rows = self.rows, "staging artifact sealed");
        Ok(self.rows)
    }
}

impl Drop for StagingWriter {
    fn drop(&mut self) {
        if !self.finished {
            let _ = std::fs::remove_file(&self.path);
        }
    }
}

/// Stream a fallible record sequence into a staging artifact.
///
/// Records are processed exactly once, in order, one row in memory at a time.
/// The first error aborts the run and discards the partial artifact, so a
/// completed file always holds exactly one row per source record.
pub fn stage_dataset<I, E>(
    path: &Path,
    schema: &Schema,
    srid: Option<i32>,
    records: I,
) -> Result<usize, Error<E>>
where
    I: IntoIterator<Item = Result<Record, E>>,
{
    let encoder = RecordEncoder::new(schema, srid);
    let mut writer = StagingWriter::create(path, schema)?;
    let mut row = 0usize;
    for record in records {
        let record = record.map_err(Error::Source)?;
        row += 1;
        let tokens = encoder.encode(row, &record).map_err(Error::Encode)?;
        writer.write_row(&tokens)?;
    }
    Ok(writer.finish()?)
}
