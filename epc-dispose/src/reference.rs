//! Loading the independent set of expected EPCs used for reconciliation.
//!
//! The reference file is either a delimited text export, where the EPC is the third
//! column, or a spreadsheet, where the EPC is column D of the first sheet. Which reader
//! is used depends only on the file extension.
use std::borrow::Cow;
use std::collections::HashSet;
use std::fs::{self, File};
use std::io::Cursor;
use std::path::Path;

use calamine::{open_workbook_auto_from_rs, Data, Reader};
use tracing::warn;

use crate::error::PipelineError;
use crate::parse::delimited_reader;

/// 0-based column holding the EPC in a delimited reference file.
const DELIMITED_EPC_COLUMN: usize = 2;
/// 0-based column holding the EPC in a spreadsheet reference file (column D).
const SPREADSHEET_EPC_COLUMN: u32 = 3;

/// Anything that can produce the set of expected EPCs from a file.
pub trait IdentifierSource {
    fn load(&self, path: &Path) -> Result<HashSet<String>, PipelineError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceFormat {
    Delimited,
    Spreadsheet,
}

const FORMATS: [(&str, ReferenceFormat); 6] = [
    ("csv", ReferenceFormat::Delimited),
    ("xlsx", ReferenceFormat::Spreadsheet),
    ("xlsm", ReferenceFormat::Spreadsheet),
    ("xlsb", ReferenceFormat::Spreadsheet),
    ("xls", ReferenceFormat::Spreadsheet),
    ("ods", ReferenceFormat::Spreadsheet),
];

impl ReferenceFormat {
    /// Pick a format from the (case-insensitive) file extension.
    pub fn from_path(path: &Path) -> Result<Self, PipelineError> {
        let extension = path
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_default();

        FORMATS
            .iter()
            .find(|(ext, _)| *ext == extension)
            .map(|(_, format)| *format)
            .ok_or_else(|| PipelineError::UnsupportedFormat {
                path: path.to_path_buf(),
                extension,
            })
    }

    pub fn source(&self) -> &'static dyn IdentifierSource {
        match self {
            ReferenceFormat::Delimited => &DelimitedReference,
            ReferenceFormat::Spreadsheet => &SpreadsheetReference,
        }
    }
}

/// Load the expected EPCs from `path`, choosing a reader by extension.
pub fn load_reference(path: &Path) -> Result<HashSet<String>, PipelineError> {
    ReferenceFormat::from_path(path)?.source().load(path)
}

pub struct DelimitedReference;

impl IdentifierSource for DelimitedReference {
    fn load(&self, path: &Path) -> Result<HashSet<String>, PipelineError> {
        let mut reader = delimited_reader(File::open(path)?);
        let mut identifiers = HashSet::new();

        // Only the EPC column is decoded, so other columns in a non-UTF-8 export
        // (GBK names, barcodes) never cost us an identifier.
        for result in reader.byte_records() {
            let row = result?;
            let Some(field) = row.get(DELIMITED_EPC_COLUMN) else {
                continue;
            };

            let value = String::from_utf8_lossy(field);
            if value.trim().is_empty() {
                continue;
            }
            if matches!(value, Cow::Owned(_)) {
                warn!(
                    line = row.position().map(|p| p.line()),
                    epc = %value,
                    "reference epc is not valid utf-8"
                );
            }
            identifiers.insert(value.into_owned());
        }

        Ok(identifiers)
    }
}

pub struct SpreadsheetReference;

impl IdentifierSource for SpreadsheetReference {
    fn load(&self, path: &Path) -> Result<HashSet<String>, PipelineError> {
        let spreadsheet_error = |reason: String| PipelineError::Spreadsheet {
            path: path.to_path_buf(),
            reason,
        };

        // The format is sniffed from the content, so upper-case extensions open too.
        let bytes = fs::read(path)?;
        let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes))
            .map_err(|e| spreadsheet_error(e.to_string()))?;
        let range = workbook
            .worksheet_range_at(0)
            .ok_or_else(|| spreadsheet_error("workbook has no sheets".to_string()))?
            .map_err(|e| spreadsheet_error(e.to_string()))?;

        let mut identifiers = HashSet::new();
        let Some((last_row, _)) = range.end() else {
            return Ok(identifiers);
        };

        // Row 0 is the header. Positions are absolute, independent of where the used range starts.
        for row in 1..=last_row {
            let value = match range.get_value((row, SPREADSHEET_EPC_COLUMN)) {
                None | Some(Data::Empty) => continue,
                Some(cell) => cell.to_string(),
            };
            if !value.trim().is_empty() {
                identifiers.insert(value);
            }
        }

        Ok(identifiers)
    }
}
