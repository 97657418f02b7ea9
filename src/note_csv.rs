use crate::model::note::NoteTable;
use crate::normalize::{ColumnMap, NormalizeOptions, RawNoteTable, REQUIRED_COLUMNS, pre_process_with};
use anyhow::{Context, Result};
use log::debug;
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

/// Read note rows from CSV text.
///
/// A first row whose cells name every required column is taken as a header. Anything else is
/// header-less data laid out by `columns`.
pub fn read_raw_notes<R: Read>(input: R, columns: ColumnMap) -> Result<RawNoteTable> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(input);

    let mut records: Vec<Vec<String>> = Vec::new();
    for record in reader.records() {
        let record = record.context("Malformed CSV record..!")?;
        records.push(record.iter().map(str::to_string).collect());
    }

    let headed = records
        .first()
        .is_some_and(|first| REQUIRED_COLUMNS.iter().all(|col| first.iter().any(|cell| cell == col)));

    if headed {
        let headers = records.remove(0);
        return Ok(RawNoteTable { headers, records });
    }

    Ok(RawNoteTable::from_headerless(records, columns))
}

/// Load and normalize one note CSV file.
pub fn import_note_csv<P: AsRef<Path>>(path: P, options: NormalizeOptions) -> Result<NoteTable> {
    let path = path.as_ref();
    let file = File::open(path).with_context(|| format!("Failed to open note CSV {}", path.display()))?;

    let raw = read_raw_notes(file, ColumnMap::default())
        .with_context(|| format!("Failed to read note CSV {}", path.display()))?;
    let table = pre_process_with(&raw, options).with_context(|| format!("Invalid note CSV {}", path.display()))?;

    debug!("Loaded {} notes from {}..!", table.len(), path.display());
    Ok(table)
}

/// Write a table as headed `onset,track,pitch,dur` CSV.
pub fn write_notes<W: Write>(table: &NoteTable, output: W) -> Result<()> {
    let mut writer = csv::Writer::from_writer(output);
    writer.write_record(REQUIRED_COLUMNS)?;
    for note in table {
        writer.serialize((note.onset, note.track, note.pitch, note.dur))?;
    }
    writer.flush()?;
    Ok(())
}

pub fn export_note_csv<P: AsRef<Path>>(table: &NoteTable, path: P) -> Result<()> {
    let path = path.as_ref();
    let file = File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
    write_notes(table, file).with_context(|| format!("Failed to write notes to {}", path.display()))
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::model::note::Note;
    use crate::normalize::pre_process;
    use pretty_assertions::assert_eq;

    #[test]
    fn headerless_rows_use_the_column_map() {
        let raw = read_raw_notes("0,5,60,100\n100.7,7,62,50.2\n".as_bytes(), ColumnMap::default()).unwrap();
        let table = pre_process(&raw, true).unwrap();

        assert_eq!(table, NoteTable::new(vec![Note::new(0, 0, 60, 100), Note::new(100, 1, 62, 50)]));
    }

    #[test]
    fn header_row_is_detected() {
        let text = "pitch,dur,onset,track,velocity\n60,100,0,1,90\n62,100,100,1,80\n";
        let raw = read_raw_notes(text.as_bytes(), ColumnMap::default()).unwrap();

        assert_eq!(raw.headers.len(), 5);
        assert_eq!(raw.records.len(), 2);
        let table = pre_process(&raw, true).unwrap();
        assert_eq!(table.notes()[1], Note::new(100, 0, 62, 100));
    }

    #[test]
    fn written_csv_reads_back() {
        let table = NoteTable::new(vec![Note::new(0, 0, 60, 100), Note::new(50, 1, 64, 25)]);

        let mut out = Vec::new();
        write_notes(&table, &mut out).unwrap();
        assert_eq!(String::from_utf8(out.clone()).unwrap(), "onset,track,pitch,dur\n0,0,60,100\n50,1,64,25\n");

        let raw = read_raw_notes(out.as_slice(), ColumnMap::default()).unwrap();
        assert_eq!(pre_process(&raw, false).unwrap(), table);
    }

    #[test]
    fn files_on_disk() {
        env_logger::try_init().unwrap_or(());
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("piece.csv");

        std::fs::write(&path, "0,0,60,100\n-5,0,61,100\n100,0,62,0\n200,0,64,100\n").unwrap();
        let table = import_note_csv(&path, NormalizeOptions::default()).unwrap();
        assert_eq!(table.len(), 2);

        let copy = dir.path().join("copy.csv");
        export_note_csv(&table, &copy).unwrap();
        assert_eq!(import_note_csv(&copy, NormalizeOptions::default()).unwrap(), table);

        assert!(import_note_csv(dir.path().join("missing.csv"), NormalizeOptions::default()).is_err());
    }
}
