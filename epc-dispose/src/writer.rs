use std::ffi::OsString;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::PipelineError;
use crate::record::{EventRecord, HEADER};

const DISPOSE_PREFIX: &str = "dispose";

/// Sibling of `input` with the file name prefixed by `dispose`.
pub fn dispose_path(input: &Path) -> PathBuf {
    let mut name = OsString::from(DISPOSE_PREFIX);
    if let Some(file_name) = input.file_name() {
        name.push(file_name);
    }
    input.with_file_name(name)
}

/// Write `records` to `path`, replacing anything already there.
pub fn write_records(path: &Path, records: &[EventRecord]) -> Result<(), PipelineError> {
    let file = File::create(path)?;
    write_to(file, records)
}

pub fn write_to<W: Write>(wtr: W, records: &[EventRecord]) -> Result<(), PipelineError> {
    let mut writer = csv::WriterBuilder::new()
        .quote_style(csv::QuoteStyle::Never)
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(wtr);

    writer.write_record(HEADER)?;
    for record in records {
        writer.write_record(record.to_fields())?;
    }
    writer.flush()?;

    Ok(())
}
