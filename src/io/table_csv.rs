//! Assignment table CSV format.
//!
//! ```text
//! Instance,T1,T2.1,T2.2,T3,T4
//! 1,JVG,GTR,MDS,PGR,HJR
//! 2,HYV,LPG,RGB,PGR,MFE
//! ```
//!
//! Empty slots are written as [`UNASSIGNED_SENTINEL`]. On reading, an
//! empty cell becomes an empty slot and the sentinel is kept verbatim,
//! so the validator's configuration check rejects it.

use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use tracing::debug;

use super::IoError;
use crate::models::{AssignmentTable, InstanceRow, UNASSIGNED_SENTINEL};

/// Name of the ordinal column.
pub const INSTANCE_COLUMN: &str = "Instance";

/// Writes `table` as CSV.
pub fn write_table<W: Write>(table: &AssignmentTable, writer: W) -> Result<(), IoError> {
    let mut csv_writer = csv::Writer::from_writer(writer);

    let mut header = vec![INSTANCE_COLUMN];
    header.extend(table.tasks.iter().map(String::as_str));
    csv_writer.write_record(&header)?;

    for row in &table.rows {
        let mut record = vec![row.ordinal.to_string()];
        record.extend(
            row.cells
                .iter()
                .map(|c| c.clone().unwrap_or_else(|| UNASSIGNED_SENTINEL.to_string())),
        );
        csv_writer.write_record(&record)?;
    }

    csv_writer
        .flush()
        .map_err(|e| IoError::Csv(csv::Error::from(e)))?;
    Ok(())
}

/// Reads a CSV table.
///
/// The first column holds ordinals whatever its header says; the other
/// headers are the task ids. Rows may be ragged; width is checked by the
/// validator.
pub fn read_table<R: Read>(reader: R) -> Result<AssignmentTable, IoError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(reader);

    let headers = csv_reader.headers()?.clone();
    if headers.is_empty() {
        return Err(IoError::MissingHeader);
    }
    let mut table = AssignmentTable::new(headers.iter().skip(1).map(str::to_string).collect());

    for record in csv_reader.records() {
        let record = record?;
        let line = record.position().map_or(0, |p| p.line());
        let raw = record.get(0).unwrap_or_default();
        let ordinal = raw.parse::<usize>().map_err(|_| IoError::Ordinal {
            line,
            value: raw.to_string(),
        })?;
        let cells = record
            .iter()
            .skip(1)
            .map(|cell| (!cell.is_empty()).then(|| cell.to_string()))
            .collect();
        table.rows.push(InstanceRow::new(ordinal, cells));
    }

    debug!(rows = table.instance_count(), columns = table.tasks.len(), "read table");
    Ok(table)
}

/// Writes `table` to a CSV file.
pub fn save_table(table: &AssignmentTable, path: &Path) -> Result<(), IoError> {
    let file = File::create(path).map_err(|source| IoError::File {
        path: path.to_path_buf(),
        source,
    })?;
    write_table(table, file)
}

/// Reads a CSV file.
pub fn load_table(path: &Path) -> Result<AssignmentTable, IoError> {
    let file = File::open(path).map_err(|source| IoError::File {
        path: path.to_path_buf(),
        source,
    })?;
    read_table(file)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_uses_sentinel() {
        let mut table = AssignmentTable::new(vec!["T1".into(), "T2".into()]);
        table.push_row(vec![Some("a".into()), None]);

        let mut buf = Vec::new();
        write_table(&table, &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert_eq!(text, "Instance,T1,T2\n1,a,ERROR_NO_ASIGNADO\n");
    }

    #[test]
    fn test_read_trims_and_keeps_sentinel() {
        let text = "Instancia,T1,T2\n1, a ,\n2,b,ERROR_NO_ASIGNADO\n";
        let table = read_table(text.as_bytes()).unwrap();

        assert_eq!(table.tasks, vec!["T1", "T2"]);
        assert_eq!(table.rows[0].cells, vec![Some("a".to_string()), None]);
        assert_eq!(table.get(1, "T2"), Some(UNASSIGNED_SENTINEL));
        assert_eq!(table.rows[1].ordinal, 2);
    }

    #[test]
    fn test_read_ragged_rows() {
        let table = read_table("Instance,T1,T2\n1,a\n".as_bytes()).unwrap();
        assert_eq!(table.rows[0].cells.len(), 1);
    }

    #[test]
    fn test_bad_ordinal() {
        let err = read_table("Instance,T1\nfirst,a\n".as_bytes()).unwrap_err();
        assert!(matches!(err, IoError::Ordinal { ref value, .. } if value == "first"));
    }

    #[test]
    fn test_missing_file() {
        let err = load_table(Path::new("/nonexistent/table.csv")).unwrap_err();
        assert!(matches!(err, IoError::File { .. }));
    }
}
