use crate::error::SchemaError;
use crate::model::note::{Note, NoteTable};
use log::{debug, warn};

pub const REQUIRED_COLUMNS: [&str; 4] = ["onset", "track", "pitch", "dur"];

/// Untyped tabular input, one string cell per field, as read from disk.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawNoteTable {
    pub headers: Vec<String>,
    pub records: Vec<Vec<String>>,
}

/// Column positions used when the input carries no header row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnMap {
    pub onset: usize,
    pub track: usize,
    pub pitch: usize,
    pub dur: usize,
}

impl Default for ColumnMap {
    fn default() -> Self {
        Self {
            onset: 0,
            track: 1,
            pitch: 2,
            dur: 3,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NormalizeOptions {
    /// Sort rows by (onset, track, pitch, dur).
    pub sort: bool,
    /// Reject tables where two notes on the same track overlap.
    pub check_overlaps: bool,
}

impl RawNoteTable {
    pub fn new<S: Into<String>>(headers: impl IntoIterator<Item = S>) -> Self {
        Self {
            headers: headers.into_iter().map(Into::into).collect(),
            records: Vec::new(),
        }
    }

    /// Build a headed table from header-less records, naming the columns with `columns`.
    /// Cells outside of the mapped columns are discarded.
    pub fn from_headerless(records: Vec<Vec<String>>, columns: ColumnMap) -> Self {
        let positions = [columns.onset, columns.track, columns.pitch, columns.dur];
        let records = records
            .into_iter()
            .map(|record| {
                positions
                    .iter()
                    .map(|&p| record.get(p).cloned().unwrap_or_default())
                    .collect()
            })
            .collect();

        Self {
            headers: REQUIRED_COLUMNS.iter().map(|c| c.to_string()).collect(),
            records,
        }
    }

    pub fn push<S: ToString>(&mut self, record: impl IntoIterator<Item = S>) {
        self.records
            .push(record.into_iter().map(|cell| cell.to_string()).collect());
    }

    fn column(&self, name: &'static str) -> Result<usize, SchemaError> {
        self.headers
            .iter()
            .position(|h| h.trim() == name)
            .ok_or(SchemaError::MissingColumn(name))
    }
}

/// Canonicalize raw input into a [`NoteTable`].
///
/// Only the `onset`, `track`, `pitch` and `dur` columns are kept. Numeric values are truncated
/// toward zero; rows with an unparseable onset/pitch/dur (or a negative onset, or a non-positive
/// duration) are dropped with a warning. Track values are re-encoded into a dense `0..K` range in
/// order of first appearance. A missing column or a non-numeric track is a hard error.
pub fn pre_process(raw: &RawNoteTable, sort: bool) -> Result<NoteTable, SchemaError> {
    pre_process_with(
        raw,
        NormalizeOptions {
            sort,
            check_overlaps: false,
        },
    )
}

pub fn pre_process_with(
    raw: &RawNoteTable,
    options: NormalizeOptions,
) -> Result<NoteTable, SchemaError> {
    let onset_col = raw.column("onset")?;
    let track_col = raw.column("track")?;
    let pitch_col = raw.column("pitch")?;
    let dur_col = raw.column("dur")?;

    // Raw track values in order of first appearance, compared by their numeric value.
    let mut track_codes: Vec<f64> = Vec::new();
    let mut notes: Vec<Note> = Vec::with_capacity(raw.records.len());
    let mut dropped = 0usize;

    for (row, record) in raw.records.iter().enumerate() {
        let track_cell = cell(record, track_col);
        let Some(track_value) = parse_numeric(track_cell) else {
            return Err(SchemaError::NonNumericTrack {
                row,
                value: track_cell.to_string(),
            });
        };

        let (Some(onset), Some(pitch), Some(dur)) = (
            parse_numeric(cell(record, onset_col)).and_then(truncate),
            parse_numeric(cell(record, pitch_col))
                .and_then(truncate)
                .and_then(|pitch| i32::try_from(pitch).ok()),
            parse_numeric(cell(record, dur_col)).and_then(truncate),
        ) else {
            warn!("Dropping row {} with a non-numeric or out of range onset, pitch or dur: {:?}..!", row, record);
            dropped += 1;
            continue;
        };

        if onset < 0 || dur <= 0 {
            warn!(
                "Dropping row {} with onset {} and duration {} (onset must be >= 0, duration > 0)..!",
                row, onset, dur
            );
            dropped += 1;
            continue;
        }

        if onset.checked_add(dur).is_none() {
            warn!("Dropping row {} whose offset ({} + {}) is out of range..!", row, onset, dur);
            dropped += 1;
            continue;
        }

        let track = match track_codes.iter().position(|&t| t == track_value) {
            Some(code) => code,
            None => {
                track_codes.push(track_value);
                track_codes.len() - 1
            }
        };

        notes.push(Note {
            onset,
            track: track as u32,
            pitch,
            dur,
        });
    }

    if dropped > 0 {
        debug!("Dropped {} of {} rows during pre-processing..!", dropped, raw.records.len());
    }

    let mut table = NoteTable::new(notes);
    if options.sort {
        table.sort();
    }

    if options.check_overlaps
        && let Some((index, track)) = table.first_overlap()
    {
        return Err(SchemaError::Overlap { index, track });
    }

    Ok(table)
}

/// Re-derive canonical ordering and indexing for an already processed table.
pub fn post_process(table: &NoteTable, sort: bool) -> NoteTable {
    let mut processed = table.clone();
    if sort {
        processed.sort();
    }
    processed
}

/// Whether the note at `index` overlaps any other note on the same track.
///
/// Intervals are half-open, so a note ending exactly where another begins does not overlap it.
/// An out-of-range index never overlaps.
pub fn overlaps(table: &NoteTable, index: usize) -> bool {
    let Some(note) = table.get(index) else {
        return false;
    };

    table
        .iter()
        .enumerate()
        .any(|(i, other)| i != index && note.overlaps(other))
}

fn cell(record: &[String], col: usize) -> &str {
    record.get(col).map(|c| c.trim()).unwrap_or("")
}

fn parse_numeric(cell: &str) -> Option<f64> {
    cell.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Truncate toward zero, or `None` when the result does not fit an `i64`.
fn truncate(value: f64) -> Option<i64> {
    let value = value.trunc();
    (value >= i64::MIN as f64 && value < i64::MAX as f64).then_some(value as i64)
}
