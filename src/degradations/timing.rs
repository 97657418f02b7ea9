use super::Outcome;
use crate::model::note::NoteTable;
use crate::model::params::{OffsetShiftParams, OnsetShiftParams, TimeShiftParams};
use crate::sampling::{any_nonempty, in_ranges, split_range_sample_int};
use rand::Rng;
use rand::seq::IndexedRandom;

pub const NO_VALID_TIME_SHIFT: &str = "No valid notes to time shift";
pub const NO_VALID_ONSET_SHIFT: &str = "No valid notes to onset shift";
pub const NO_VALID_OFFSET_SHIFT: &str = "No valid notes to offset shift";

/// A note that admits at least one new value, and the closed ranges that value may come from.
struct Candidate {
    index: usize,
    ranges: [(i64, i64); 2],
    /// Existing table values inside `ranges`, when the edit must align to them.
    aligned: Option<Vec<i64>>,
}

impl Candidate {
    fn new(index: usize, ranges: [(i64, i64); 2], aligned: Option<Vec<i64>>) -> Option<Self> {
        let aligned = aligned.map(|values| {
            values
                .into_iter()
                .filter(|v| in_ranges(&ranges, *v))
                .collect::<Vec<_>>()
        });

        let feasible = match &aligned {
            Some(values) => !values.is_empty(),
            None => any_nonempty(&ranges),
        };

        feasible.then_some(Self {
            index,
            ranges,
            aligned,
        })
    }

    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<i64> {
        match &self.aligned {
            Some(values) => values.choose(rng).copied(),
            None => split_range_sample_int(&self.ranges, rng).ok(),
        }
    }
}

/// Pick one candidate uniformly and draw its new value.
fn pick<R: Rng + ?Sized>(candidates: &[Candidate], rng: &mut R) -> Option<(usize, i64)> {
    let candidate = candidates.choose(rng)?;
    candidate.sample(rng).map(|value| (candidate.index, value))
}

/// Shifts are at least 1ms so the edited note always differs from the original.
fn shift_bounds(min_shift: i64, max_shift: Option<i64>) -> (i64, i64) {
    (min_shift.max(1), max_shift.unwrap_or(i64::MAX))
}

fn duration_bounds(min_duration: i64, max_duration: Option<i64>) -> (i64, i64) {
    (min_duration.max(1), max_duration.unwrap_or(i64::MAX))
}

/// Move one note earlier or later, keeping its duration.
///
/// The shifted note stays within `[0, end]` where `end` is the excerpt's last offset.
pub fn time_shift<R: Rng + ?Sized>(
    excerpt: &NoteTable,
    params: &TimeShiftParams,
    rng: &mut R,
) -> Outcome {
    let (min_shift, max_shift) = shift_bounds(params.min_shift, params.max_shift);
    let end_time = excerpt.end_time();
    let onsets = params.align_onset.then(|| excerpt.unique_onsets());

    let candidates: Vec<Candidate> = excerpt
        .iter()
        .enumerate()
        .filter_map(|(index, note)| {
            let onset = note.onset;
            let earlier = (onset.saturating_sub(max_shift).max(0), onset - min_shift);
            let later = (
                onset.saturating_add(min_shift),
                onset.saturating_add(max_shift.min(end_time - note.offset())),
            );

            Candidate::new(index, [earlier, later], onsets.clone())
        })
        .collect();

    let Some((index, onset)) = pick(&candidates, rng) else {
        return Outcome::infeasible(NO_VALID_TIME_SHIFT);
    };

    let mut degraded = excerpt.clone();
    degraded.notes_mut()[index].onset = onset;
    Outcome::Degraded(degraded)
}

/// Move one note's onset, keeping its offset, so its duration grows or shrinks.
pub fn onset_shift<R: Rng + ?Sized>(
    excerpt: &NoteTable,
    params: &OnsetShiftParams,
    rng: &mut R,
) -> Outcome {
    let (min_shift, max_shift) = shift_bounds(params.min_shift, params.max_shift);
    let (min_dur, max_dur) = duration_bounds(params.min_duration, params.max_duration);
    let onsets = excerpt.unique_onsets();
    let durations = excerpt.unique_durations();

    let candidates: Vec<Candidate> = excerpt
        .iter()
        .enumerate()
        .filter_map(|(index, note)| {
            let (onset, offset) = (note.onset, note.offset());

            let lengthened = (
                offset
                    .saturating_sub(max_dur)
                    .max(onset.saturating_sub(max_shift))
                    .max(0),
                (onset - min_shift).min(offset - min_dur),
            );
            let shortened = (
                onset.saturating_add(min_shift).max(offset.saturating_sub(max_dur)),
                (offset - min_dur).min(onset.saturating_add(max_shift)),
            );

            let aligned = match (params.align_onset, params.align_dur) {
                (false, false) => None,
                (true, false) => Some(onsets.clone()),
                (false, true) => Some(durations.iter().map(|d| offset - d).collect()),
                (true, true) => Some(
                    onsets
                        .iter()
                        .copied()
                        .filter(|o| durations.contains(&(offset - o)))
                        .collect(),
                ),
            };

            Candidate::new(index, [lengthened, shortened], aligned)
        })
        .collect();

    let Some((index, onset)) = pick(&candidates, rng) else {
        return Outcome::infeasible(NO_VALID_ONSET_SHIFT);
    };

    let mut degraded = excerpt.clone();
    let note = &mut degraded.notes_mut()[index];
    note.dur = note.offset() - onset;
    note.onset = onset;
    Outcome::Degraded(degraded)
}

/// Change one note's duration, keeping its onset.
///
/// The new offset never passes the excerpt's last offset before the edit.
pub fn offset_shift<R: Rng + ?Sized>(
    excerpt: &NoteTable,
    params: &OffsetShiftParams,
    rng: &mut R,
) -> Outcome {
    let (min_shift, max_shift) = shift_bounds(params.min_shift, params.max_shift);
    let (min_dur, max_dur) = duration_bounds(params.min_duration, params.max_duration);
    let end_time = excerpt.end_time();
    let durations = params.align_dur.then(|| excerpt.unique_durations());

    let candidates: Vec<Candidate> = excerpt
        .iter()
        .enumerate()
        .filter_map(|(index, note)| {
            let dur = note.dur;

            let lengthened = (
                dur.saturating_add(min_shift).max(min_dur),
                dur.saturating_add(max_shift)
                    .min(end_time - note.onset)
                    .min(max_dur),
            );
            let shortened = (
                dur.saturating_sub(max_shift).max(min_dur),
                (dur - min_shift).min(max_dur),
            );

            Candidate::new(index, [shortened, lengthened], durations.clone())
        })
        .collect();

    let Some((index, dur)) = pick(&candidates, rng) else {
        return Outcome::infeasible(NO_VALID_OFFSET_SHIFT);
    };

    let mut degraded = excerpt.clone();
    degraded.notes_mut()[index].dur = dur;
    Outcome::Degraded(degraded)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::degradations::test_support::*;
    use crate::model::note::Note;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    fn changed_note(before: &NoteTable, after: &NoteTable) -> (Note, Note) {
        let (removed, added) = diff(before, after);
        assert_eq!(removed.len(), 1, "expected exactly one changed note: {after:?}");
        assert_eq!(added.len(), 1, "expected exactly one changed note: {after:?}");
        (removed[0], added[0])
    }

    fn align_df() -> NoteTable {
        table(&[(0, 0, 10, 100), (50, 1, 20, 100), (100, 0, 25, 50), (150, 0, 30, 150), (200, 1, 40, 100)])
    }

    #[test]
    fn empty_tables_are_infeasible() {
        env_logger::try_init().unwrap_or(());
        let mut rng = Pcg32::seed_from_u64(1);

        assert_eq!(
            time_shift(&empty(), &TimeShiftParams::default(), &mut rng).reason(),
            Some(NO_VALID_TIME_SHIFT)
        );
        assert_eq!(
            onset_shift(&empty(), &OnsetShiftParams::default(), &mut rng).reason(),
            Some(NO_VALID_ONSET_SHIFT)
        );
        assert_eq!(
            offset_shift(&empty(), &OffsetShiftParams::default(), &mut rng).reason(),
            Some(NO_VALID_OFFSET_SHIFT)
        );
    }

    #[test]
    fn time_shift_respects_bounds() {
        let mut rng = Pcg32::seed_from_u64(10);

        for i in 0..10 {
            let params = TimeShiftParams {
                min_shift: 10 * i,
                max_shift: Some(10 * (i + 1)),
                align_onset: false,
            };

            let res = time_shift(&basic(), &params, &mut rng).into_option().unwrap();
            let (before, after) = changed_note(&basic(), &res);

            assert_eq!((before.track, before.pitch, before.dur), (after.track, after.pitch, after.dur));
            let shift = (after.onset - before.onset).abs();
            assert!((params.min_shift.max(1)..=10 * (i + 1)).contains(&shift), "shift {shift}");
            assert!(after.onset >= 0 && after.offset() <= basic().end_time());
        }
    }

    #[test]
    fn time_shift_aligns_onsets() {
        env_logger::try_init().unwrap_or(());
        let mut rng = Pcg32::seed_from_u64(11);

        for i in 0..10 {
            let (min_shift, max_shift) = (10 * i, 10 * (i + 1));
            let params = TimeShiftParams {
                min_shift,
                max_shift: Some(max_shift),
                align_onset: true,
            };
            let res = time_shift(&basic(), &params, &mut rng);

            if min_shift <= 200 && max_shift >= 100 {
                let (before, after) = changed_note(&basic(), &res.into_option().unwrap());
                assert!(basic().unique_onsets().contains(&after.onset));
                assert!((min_shift..=max_shift).contains(&(after.onset - before.onset).abs()));
            } else {
                assert_eq!(res.reason(), Some(NO_VALID_TIME_SHIFT));
            }
        }
    }

    #[test]
    fn time_shift_range_edges() {
        env_logger::try_init().unwrap_or(());
        let mut rng = Pcg32::seed_from_u64(12);

        let too_far = TimeShiftParams {
            min_shift: 201,
            max_shift: Some(202),
            align_onset: false,
        };
        assert_eq!(time_shift(&basic(), &too_far, &mut rng).reason(), Some(NO_VALID_TIME_SHIFT));

        let just_fits = TimeShiftParams {
            min_shift: 200,
            max_shift: Some(201),
            align_onset: false,
        };
        assert!(time_shift(&basic(), &just_fits, &mut rng).is_degraded());
    }

    fn check_onset_shift(df: &NoteTable, res: &NoteTable, params: &OnsetShiftParams) {
        let (before, after) = changed_note(df, res);
        let max_shift = params.max_shift.unwrap_or(i64::MAX);
        let max_dur = params.max_duration.unwrap_or(i64::MAX);

        assert!(params.min_duration <= after.dur && after.dur <= max_dur);
        let shift = (after.onset - before.onset).abs();
        assert!(params.min_shift <= shift && shift <= max_shift);
        assert_eq!((before.pitch, before.track), (after.pitch, after.track));
        assert_eq!(before.offset(), after.offset());
        assert!(after.onset >= 0);
    }

    #[test]
    fn onset_shift_respects_bounds() {
        env_logger::try_init().unwrap_or(());
        let mut rng = Pcg32::seed_from_u64(20);

        // Stops before max_shift reaches a note's full duration, which would ask for a 0ms note.
        for i in 0..9 {
            let (min_shift, max_shift) = (i * 10, (i + 1) * 10);
            let params = |min_duration: i64, max_duration: Option<i64>| OnsetShiftParams {
                min_shift,
                max_shift: Some(max_shift),
                min_duration,
                max_duration,
                ..Default::default()
            };

            for ok in [
                params(100 - min_shift - 5, Some(100 + min_shift + 5)),
                params(0, Some(100 - max_shift)),
                params(100 + max_shift, None),
                params(0, Some(100 - min_shift - 5)),
                params(100 + min_shift + 5, None),
            ] {
                let res = onset_shift(&basic(), &ok, &mut rng).into_option().unwrap();
                check_onset_shift(&basic(), &res, &ok);
            }

            for infeasible in [params(0, Some(100 - max_shift - 1)), params(100 + max_shift + 1, None)] {
                let res = onset_shift(&basic(), &infeasible, &mut rng);
                assert_eq!(res.reason(), Some(NO_VALID_ONSET_SHIFT));
            }
        }

        let too_far = OnsetShiftParams {
            min_shift: 300,
            ..Default::default()
        };
        assert_eq!(onset_shift(&basic(), &too_far, &mut rng).reason(), Some(NO_VALID_ONSET_SHIFT));
    }

    #[test]
    fn onset_shift_alignment() {
        env_logger::try_init().unwrap_or(());
        let mut rng = Pcg32::seed_from_u64(21);
        let df = align_df();

        for (align_onset, align_dur) in [(false, true), (true, false), (true, true)] {
            let params = OnsetShiftParams {
                align_onset,
                align_dur,
                ..Default::default()
            };

            for _ in 0..10 {
                let res = onset_shift(&df, &params, &mut rng).into_option().unwrap();
                check_onset_shift(&df, &res, &params);

                let (_, after) = changed_note(&df, &res);
                if align_dur {
                    assert!(df.unique_durations().contains(&after.dur));
                }
                if align_onset {
                    assert!(df.unique_onsets().contains(&after.onset));
                }
            }

            for bad in [
                OnsetShiftParams { min_shift: 201, ..params.clone() },
                OnsetShiftParams { max_shift: Some(49), ..params.clone() },
                OnsetShiftParams { min_duration: 301, ..params.clone() },
                OnsetShiftParams { max_duration: Some(49), ..params.clone() },
            ] {
                assert_eq!(onset_shift(&df, &bad, &mut rng).reason(), Some(NO_VALID_ONSET_SHIFT));
            }
        }
    }

    fn check_offset_shift(df: &NoteTable, res: &NoteTable, params: &OffsetShiftParams) {
        let (before, after) = changed_note(df, res);
        let max_shift = params.max_shift.unwrap_or(i64::MAX);
        let max_dur = params.max_duration.unwrap_or(i64::MAX);

        assert!(params.min_duration <= after.dur && after.dur <= max_dur);
        let shift = (after.dur - before.dur).abs();
        assert!(params.min_shift <= shift && shift <= max_shift);
        assert_eq!((before.onset, before.pitch, before.track), (after.onset, after.pitch, after.track));
        assert!(after.offset() <= df.end_time());
    }

    #[test]
    fn offset_shift_respects_bounds() {
        env_logger::try_init().unwrap_or(());
        let mut rng = Pcg32::seed_from_u64(30);

        for i in 0..9 {
            let (min_shift, max_shift) = (i * 10, (i + 1) * 10);
            let params = |min_duration: i64, max_duration: Option<i64>| OffsetShiftParams {
                min_shift,
                max_shift: Some(max_shift),
                min_duration,
                max_duration,
                align_dur: false,
            };

            for ok in [
                params(100 - min_shift - 5, Some(100 + min_shift + 5)),
                params(0, Some(100 - max_shift)),
                params(100 + max_shift, None),
                params(0, Some(100 - min_shift - 5)),
                params(100 + min_shift + 5, None),
            ] {
                let res = offset_shift(&basic(), &ok, &mut rng).into_option().unwrap();
                check_offset_shift(&basic(), &res, &ok);
            }

            for infeasible in [params(0, Some(100 - max_shift - 1)), params(100 + max_shift + 1, None)] {
                let res = offset_shift(&basic(), &infeasible, &mut rng);
                assert_eq!(res.reason(), Some(NO_VALID_OFFSET_SHIFT));
            }
        }

        let too_far = OffsetShiftParams {
            min_shift: 300,
            ..Default::default()
        };
        assert_eq!(offset_shift(&basic(), &too_far, &mut rng).reason(), Some(NO_VALID_OFFSET_SHIFT));
    }

    #[test]
    fn offset_shift_alignment() {
        env_logger::try_init().unwrap_or(());
        let mut rng = Pcg32::seed_from_u64(31);

        let single_duration = OffsetShiftParams {
            align_dur: true,
            ..Default::default()
        };
        assert_eq!(
            offset_shift(&basic(), &single_duration, &mut rng).reason(),
            Some(NO_VALID_OFFSET_SHIFT)
        );

        let mut notes = basic().into_notes();
        notes[0].dur = 150;
        let df = NoteTable::new(notes);

        for _ in 0..10 {
            let res = offset_shift(&df, &single_duration, &mut rng).into_option().unwrap();
            let mut durs: Vec<i64> = res.iter().map(|n| n.dur).collect();
            durs.sort();
            assert!(durs == vec![100, 100, 150, 150] || durs == vec![100, 100, 100, 100], "{durs:?}");
        }
    }
}
