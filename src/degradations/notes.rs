use super::Outcome;
use crate::model::note::{Note, NoteTable};
use crate::model::params::{AddNoteParams, RemoveNoteParams};
use log::warn;
use rand::Rng;
use rand::seq::IndexedRandom;

pub const NO_NOTES_TO_REMOVE: &str = "No notes to remove";
pub const INVALID_PITCH_BOUNDS: &str = "min_pitch is greater than max_pitch";
pub const INVALID_DURATION_BOUNDS: &str = "min_duration is greater than max_duration";

pub fn remove_note<R: Rng + ?Sized>(
    excerpt: &NoteTable,
    _params: &RemoveNoteParams,
    rng: &mut R,
) -> Outcome {
    if excerpt.is_empty() {
        return Outcome::infeasible(NO_NOTES_TO_REMOVE);
    }

    let mut degraded = excerpt.clone();
    degraded.notes_mut().remove(rng.random_range(0..excerpt.len()));
    Outcome::Degraded(degraded)
}

/// Add one note to the excerpt.
///
/// The note ends no later than the excerpt's current last offset, unless `min_duration` is longer
/// than the whole excerpt, in which case it starts at 0 and lasts `min_duration`. Aligned draws
/// that find no fitting value fall back to unaligned ones, so only invalid bounds can fail.
pub fn add_note<R: Rng + ?Sized>(excerpt: &NoteTable, params: &AddNoteParams, rng: &mut R) -> Outcome {
    if params.min_pitch > params.max_pitch {
        return Outcome::infeasible(INVALID_PITCH_BOUNDS);
    }

    let min_dur = params.min_duration.max(1);
    let max_dur = params.max_duration.unwrap_or(i64::MAX);
    if min_dur > max_dur {
        return Outcome::infeasible(INVALID_DURATION_BOUNDS);
    }

    let pitch = add_pitch(excerpt, params, rng);
    let (onset, dur) = add_timing(excerpt, params.align_time, min_dur, max_dur, rng);
    let track = excerpt.unique_tracks().choose(rng).copied().unwrap_or(0);

    let mut degraded = excerpt.clone();
    degraded.notes_mut().push(Note::new(onset, track, pitch, dur));
    Outcome::Degraded(degraded)
}

fn add_pitch<R: Rng + ?Sized>(excerpt: &NoteTable, params: &AddNoteParams, rng: &mut R) -> i32 {
    let range = params.min_pitch..=params.max_pitch;

    if params.align_pitch {
        let pitches: Vec<i32> = excerpt
            .unique_pitches()
            .into_iter()
            .filter(|p| range.contains(p))
            .collect();

        if let Some(pitch) = pitches.choose(rng) {
            return *pitch;
        }
        warn!("No existing pitch between min_pitch and max_pitch, adding an unaligned pitch..!");
    }

    rng.random_range(range)
}

fn add_timing<R: Rng + ?Sized>(
    excerpt: &NoteTable,
    align: bool,
    min_dur: i64,
    max_dur: i64,
    rng: &mut R,
) -> (i64, i64) {
    let end_time = excerpt.end_time();
    if min_dur > end_time {
        return (0, min_dur);
    }

    let latest = end_time - min_dur;
    let earliest = match excerpt.start_time() {
        start if start > latest => 0,
        start => start,
    };

    if align {
        let durations = excerpt.unique_durations();
        let pairs: Vec<(i64, i64)> = excerpt
            .unique_onsets()
            .into_iter()
            .filter(|onset| (earliest..=latest).contains(onset))
            .flat_map(|onset| {
                let longest = (end_time - onset).min(max_dur);
                durations
                    .iter()
                    .filter(move |dur| (min_dur..=longest).contains(*dur))
                    .map(move |dur| (onset, *dur))
            })
            .collect();

        if let Some(pair) = pairs.choose(rng) {
            return *pair;
        }
        warn!("No existing onset and duration fit the excerpt, adding unaligned timing..!");
    }

    let onset = rng.random_range(earliest..=latest);
    let dur = rng.random_range(min_dur..=(end_time - onset).min(max_dur));
    (onset, dur)
}
