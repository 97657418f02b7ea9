use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::hash::Hash;

/// A single note event. Times are in milliseconds.
///
/// Field order matters: the derived `Ord` sorts by (onset, track, pitch, dur), which is the
/// canonical ordering of a sorted [`NoteTable`].
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Note {
    pub onset: i64,
    pub track: u32,
    pub pitch: i32,
    pub dur: i64,
}

impl Note {
    pub fn new(onset: i64, track: u32, pitch: i32, dur: i64) -> Self {
        Self {
            onset,
            track,
            pitch,
            dur,
        }
    }

    pub fn offset(&self) -> i64 {
        self.onset + self.dur
    }

    /// Whether the half-open intervals `[onset, offset)` of two notes on the same track intersect.
    pub fn overlaps(&self, other: &Note) -> bool {
        self.track == other.track && self.onset < other.offset() && other.onset < self.offset()
    }
}

/// An owned table of notes. The row index of a note is its position in the table.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct NoteTable {
    notes: Vec<Note>,
}

impl NoteTable {
    pub fn new(notes: Vec<Note>) -> Self {
        Self { notes }
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    pub fn notes(&self) -> &[Note] {
        &self.notes
    }

    pub fn get(&self, index: usize) -> Option<&Note> {
        self.notes.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Note> {
        self.notes.iter()
    }

    pub fn into_notes(self) -> Vec<Note> {
        self.notes
    }

    pub(crate) fn notes_mut(&mut self) -> &mut Vec<Note> {
        &mut self.notes
    }

    /// Sort in place by (onset, track, pitch, dur).
    pub fn sort(&mut self) {
        self.notes.sort();
    }

    /// The latest offset in the table, or 0 for an empty table.
    pub fn end_time(&self) -> i64 {
        self.notes.iter().map(Note::offset).max().unwrap_or(0)
    }

    /// The earliest onset in the table, or 0 for an empty table.
    pub fn start_time(&self) -> i64 {
        self.notes.iter().map(|n| n.onset).min().unwrap_or(0)
    }

    pub fn unique_onsets(&self) -> Vec<i64> {
        unique_by(&self.notes, |n| n.onset)
    }

    pub fn unique_durations(&self) -> Vec<i64> {
        unique_by(&self.notes, |n| n.dur)
    }

    pub fn unique_pitches(&self) -> Vec<i32> {
        unique_by(&self.notes, |n| n.pitch)
    }

    pub fn unique_tracks(&self) -> Vec<u32> {
        unique_by(&self.notes, |n| n.track)
    }

    /// Index and track of a note that overlaps another note on its track, preferring low indices.
    /// `None` when every track is overlap-free.
    pub fn first_overlap(&self) -> Option<(usize, u32)> {
        let mut by_track: BTreeMap<u32, Vec<usize>> = BTreeMap::new();
        for (i, note) in self.notes.iter().enumerate() {
            by_track.entry(note.track).or_default().push(i);
        }

        let mut first: Option<usize> = None;
        for indices in by_track.into_values() {
            let mut sorted = indices;
            sorted.sort_by_key(|&i| (self.notes[i].onset, i));

            // Sweep in onset order, remembering the note that reaches furthest so far.
            let mut reach: Option<usize> = None;
            for &i in sorted.iter() {
                if let Some(r) = reach {
                    if self.notes[i].onset < self.notes[r].offset() {
                        let hit = i.min(r);
                        first = Some(first.map_or(hit, |f| f.min(hit)));
                    }
                    if self.notes[i].offset() > self.notes[r].offset() {
                        reach = Some(i);
                    }
                } else {
                    reach = Some(i);
                }
            }
        }

        first.map(|i| (i, self.notes[i].track))
    }

    pub fn has_overlaps(&self) -> bool {
        self.first_overlap().is_some()
    }
}

impl From<Vec<Note>> for NoteTable {
    fn from(notes: Vec<Note>) -> Self {
        Self::new(notes)
    }
}

impl FromIterator<Note> for NoteTable {
    fn from_iter<I: IntoIterator<Item = Note>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a NoteTable {
    type Item = &'a Note;
    type IntoIter = std::slice::Iter<'a, Note>;

    fn into_iter(self) -> Self::IntoIter {
        self.notes.iter()
    }
}

fn unique_by<T: Copy + Eq + Hash>(notes: &[Note], key: impl Fn(&Note) -> T) -> Vec<T> {
    let mut seen = HashSet::new();
    notes
        .iter()
        .map(key)
        .filter(|value| seen.insert(*value))
        .collect()
}

#[cfg(test)]
mod test {
    use super::*;

    fn table() -> NoteTable {
        NoteTable::new(vec![
            Note::new(0, 0, 10, 100),
            Note::new(100, 1, 20, 100),
            Note::new(200, 0, 30, 100),
            Note::new(200, 1, 40, 100),
        ])
    }

    #[test]
    fn end_and_start_time() {
        assert_eq!(table().end_time(), 300);
        assert_eq!(table().start_time(), 0);
        assert_eq!(NoteTable::default().end_time(), 0);
    }

    #[test]
    fn unique_values_keep_first_appearance() {
        assert_eq!(table().unique_onsets(), vec![0, 100, 200]);
        assert_eq!(table().unique_tracks(), vec![0, 1]);
        assert_eq!(table().unique_durations(), vec![100]);
    }

    #[test]
    fn touching_notes_do_not_overlap() {
        assert!(!table().has_overlaps());
    }

    #[test]
    fn overlap_is_reported_at_lowest_index() {
        let mut notes = table().into_notes();
        notes[3].onset = 150;
        let table = NoteTable::new(notes);

        assert_eq!(table.first_overlap(), Some((1, 1)));
    }

    #[test]
    fn nested_notes_overlap() {
        let table = NoteTable::new(vec![
            Note::new(0, 0, 10, 1000),
            Note::new(100, 0, 20, 10),
            Note::new(500, 0, 30, 10),
        ]);

        assert_eq!(table.first_overlap(), Some((0, 0)));
    }
}
