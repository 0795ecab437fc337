//! Delimited-text reading shared by every report format.

use crate::error::NormalizeError;

/// A non-empty row with the 1-based source line it starts on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Row {
    pub record: usize,
    pub cells: Vec<String>,
}

impl Row {
    pub fn cell(&self, index: usize) -> &str {
        self.cells.get(index).map(String::as_str).unwrap_or("")
    }

    pub fn is_blank(&self) -> bool {
        self.cells.iter().all(|c| c.is_empty())
    }
}

/// Pick `;` when the first non-empty line has more of them than commas.
pub(crate) fn sniff_delimiter(content: &str) -> u8 {
    let line = content
        .lines()
        .find(|l| !l.trim().is_empty())
        .unwrap_or("");
    let semicolons = line.matches(';').count();
    let commas = line.matches(',').count();
    if semicolons > commas {
        b';'
    } else {
        b','
    }
}

/// Read every record, trimming cells and dropping fully empty rows.
///
/// Record numbers are source lines, counted from the byte offset of each
/// record so that skipped blank lines are included.
pub(crate) fn read_rows(content: &str) -> Result<Vec<Row>, NormalizeError> {
    let body = content.trim_start_matches('\u{feff}');
    let bytes = body.as_bytes();

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(sniff_delimiter(body))
        .from_reader(bytes);

    let mut rows = Vec::new();
    let mut line = 1usize;
    let mut scanned = 0usize;

    for record in reader.records() {
        let record = record?;

        // The reported offset may sit on the line breaks before the record.
        let mut start = record
            .position()
            .map(|p| p.byte() as usize)
            .unwrap_or(scanned)
            .clamp(scanned, bytes.len());
        while start < bytes.len() && matches!(bytes[start], b'\r' | b'\n') {
            start += 1;
        }
        line += bytes[scanned..start].iter().filter(|&&b| b == b'\n').count();
        scanned = start;

        let row = Row {
            record: line,
            cells: record.iter().map(|c| c.trim().to_string()).collect(),
        };
        if !row.is_blank() {
            rows.push(row);
        }
    }
    Ok(rows)
}

/// Position of each wanted header name in a header row (case-insensitive).
pub(crate) fn column_index(header: &Row, name: &str) -> Option<usize> {
    header
        .cells
        .iter()
        .position(|c| c.eq_ignore_ascii_case(name))
}
