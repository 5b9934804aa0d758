use std::fs::File;
use std::io::Read;
use std::path::Path;

use tracing::debug;

use crate::error::PipelineError;
use crate::record::{parse_timestamp, EventRecord, FIELD_COUNT};

/// Why a row of the processed-events file was skipped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DropReason {
    TooFewFields(usize),
    UnparsableTimestamp(String),
    Unreadable(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DroppedRow {
    /// 1-based line number in the source file.
    pub line: u64,
    pub reason: DropReason,
}

/// Records that parsed, plus a diagnostic entry for every row that didn't.
#[derive(Debug, Default)]
pub struct ParsedRecords {
    pub records: Vec<EventRecord>,
    pub dropped: Vec<DroppedRow>,
}

/// A comma-splitting reader with no quote or escape handling. Every comma is a delimiter.
pub(crate) fn delimited_reader<R: Read>(rdr: R) -> csv::Reader<R> {
    csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .quoting(false)
        .from_reader(rdr)
}

pub fn read_records(path: &Path) -> Result<ParsedRecords, PipelineError> {
    let file = File::open(path)?;
    parse_records(file)
}

/// Parse the processed-events file. The header line is skipped. Rows with fewer than
/// [`FIELD_COUNT`] fields, or whose timestamp matches none of the accepted layouts,
/// are dropped and reported in [`ParsedRecords::dropped`].
pub fn parse_records<R: Read>(rdr: R) -> Result<ParsedRecords, PipelineError> {
    let mut reader = delimited_reader(rdr);
    let mut parsed = ParsedRecords::default();

    for result in reader.records() {
        let row = match result {
            Ok(row) => row,
            Err(e) if e.is_io_error() => return Err(e.into()),
            Err(e) => {
                let line = e.position().map(|p| p.line()).unwrap_or_default();
                debug!(line, error = %e, "dropping unreadable row");
                parsed.dropped.push(DroppedRow {
                    line,
                    reason: DropReason::Unreadable(e.to_string()),
                });
                continue;
            }
        };
        let line = row.position().map(|p| p.line()).unwrap_or_default();

        match parse_row(&row) {
            Ok(record) => parsed.records.push(record),
            Err(reason) => {
                debug!(line, ?reason, "dropping malformed row");
                parsed.dropped.push(DroppedRow { line, reason });
            }
        }
    }

    Ok(parsed)
}

fn parse_row(row: &csv::StringRecord) -> Result<EventRecord, DropReason> {
    if row.len() < FIELD_COUNT {
        return Err(DropReason::TooFewFields(row.len()));
    }

    let field = |i: usize| row[i].to_owned();
    let timestamp = parse_timestamp(&row[10])
        .ok_or_else(|| DropReason::UnparsableTimestamp(row[10].to_owned()))?;

    Ok(EventRecord {
        sequence: field(0),
        barcode: field(1),
        epc: field(2),
        tid: field(3),
        user_memory: field(4),
        access_password: field(5),
        write_success: field(6),
        read_success: field(7),
        lock_status: field(8),
        strength: field(9),
        timestamp,
        count: field(11),
    })
}
