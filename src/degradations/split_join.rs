use super::Outcome;
use crate::model::note::{Note, NoteTable};
use crate::model::params::{JoinNotesParams, SplitNoteParams};
use rand::Rng;
use rand::seq::IndexedRandom;

pub const NO_NOTES_TO_SPLIT: &str = "No notes to split";
pub const NO_VALID_SPLIT: &str = "No valid notes to split";
pub const NO_NOTES_TO_JOIN: &str = "No notes to join";
pub const NO_VALID_JOIN: &str = "No valid notes to join";

/// Split one note into `num_splits + 1` back-to-back notes of the same pitch and track.
///
/// Pieces differ in length by at most 1ms, the longer ones first, and each lasts at least
/// `min_duration`. The pieces take the original note's place in the table.
pub fn split_note<R: Rng + ?Sized>(
    excerpt: &NoteTable,
    params: &SplitNoteParams,
    rng: &mut R,
) -> Outcome {
    if excerpt.is_empty() {
        return Outcome::infeasible(NO_NOTES_TO_SPLIT);
    }

    let pieces = match params.num_splits {
        0 => None,
        n => i64::try_from(n).ok().and_then(|n| n.checked_add(1)),
    };
    let Some(pieces) = pieces else {
        return Outcome::infeasible(NO_VALID_SPLIT);
    };
    let shortest = params.min_duration.max(1).saturating_mul(pieces);

    let candidates: Vec<usize> = excerpt
        .iter()
        .enumerate()
        .filter(|(_, note)| note.dur >= shortest)
        .map(|(index, _)| index)
        .collect();

    let Some(&index) = candidates.choose(rng) else {
        return Outcome::infeasible(NO_VALID_SPLIT);
    };

    let original = excerpt.notes()[index];
    let (base, extra) = (original.dur / pieces, original.dur % pieces);

    let mut onset = original.onset;
    let replacement: Vec<Note> = (0..pieces)
        .map(|piece| {
            let dur = base + i64::from(piece < extra);
            let note = Note { onset, dur, ..original };
            onset += dur;
            note
        })
        .collect();

    let mut degraded = excerpt.clone();
    degraded.notes_mut().splice(index..=index, replacement);
    Outcome::Degraded(degraded)
}

/// Merge a chain of notes into one note spanning the chain.
///
/// A chain links each note to the next note of the same track and pitch in canonical order, as
/// long as the silence between them is at most `max_gap`. Chains hold at most `max_notes` notes
/// and never share a note; with `only_first` only a chain starting at the canonically first note
/// is considered.
pub fn join_notes<R: Rng + ?Sized>(
    excerpt: &NoteTable,
    params: &JoinNotesParams,
    rng: &mut R,
) -> Outcome {
    if excerpt.is_empty() {
        return Outcome::infeasible(NO_NOTES_TO_JOIN);
    }

    if params.max_notes < 2 {
        return Outcome::infeasible(NO_VALID_JOIN);
    }

    let chains = find_chains(excerpt.notes(), params);
    let Some(chain) = chains.choose(rng) else {
        return Outcome::infeasible(NO_VALID_JOIN);
    };

    let notes = excerpt.notes();
    let (first, last) = (notes[chain[0]], notes[chain[chain.len() - 1]]);
    let joined = Note {
        dur: last.offset() - first.onset,
        ..first
    };

    let mut degraded = excerpt.clone();
    let mut doomed = chain[1..].to_vec();
    doomed.sort_unstable_by(|a, b| b.cmp(a));

    let table = degraded.notes_mut();
    table[chain[0]] = joined;
    for index in doomed {
        table.remove(index);
    }

    Outcome::Degraded(degraded)
}

fn find_chains(notes: &[Note], params: &JoinNotesParams) -> Vec<Vec<usize>> {
    let mut order: Vec<usize> = (0..notes.len()).collect();
    order.sort_by_key(|&i| notes[i]);

    let mut used = vec![false; notes.len()];
    let mut chains = Vec::new();

    for (pos, &start) in order.iter().enumerate() {
        if params.only_first && pos > 0 {
            break;
        }
        if used[start] {
            continue;
        }

        let mut chain = vec![start];
        for &next in &order[pos + 1..] {
            if chain.len() >= params.max_notes {
                break;
            }

            let (current, candidate) = (notes[chain[chain.len() - 1]], notes[next]);
            if candidate.track != current.track || candidate.pitch != current.pitch {
                continue;
            }

            let gap = candidate.onset - current.offset();
            if used[next] || !(0..=params.max_gap).contains(&gap) {
                break;
            }
            chain.push(next);
        }

        if chain.len() >= 2 {
            for &i in &chain {
                used[i] = true;
            }
            chains.push(chain);
        }
    }

    chains
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::degradations::test_support::*;
    use pretty_assertions::assert_eq;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    fn legato() -> NoteTable {
        table(&[(0, 0, 60, 100), (100, 0, 60, 100), (250, 0, 60, 100), (0, 1, 60, 100)])
    }

    #[test]
    fn split_note_empty_and_invalid() {
        env_logger::try_init().unwrap_or(());
        let mut rng = Pcg32::seed_from_u64(1);

        let res = split_note(&empty(), &SplitNoteParams::default(), &mut rng);
        assert_eq!(res.reason(), Some(NO_NOTES_TO_SPLIT));

        let too_long = SplitNoteParams {
            min_duration: 34,
            num_splits: 2,
        };
        assert_eq!(split_note(&basic(), &too_long, &mut rng).reason(), Some(NO_VALID_SPLIT));

        let no_splits = SplitNoteParams {
            num_splits: 0,
            ..Default::default()
        };
        assert_eq!(split_note(&basic(), &no_splits, &mut rng).reason(), Some(NO_VALID_SPLIT));
    }

    #[test]
    fn split_note_with_huge_split_counts() {
        let mut rng = Pcg32::seed_from_u64(9);
        let single = table(&[(0, 0, 60, 100)]);

        for num_splits in [usize::MAX, 1 << 63, i64::MAX as usize] {
            let params = SplitNoteParams {
                min_duration: 50,
                num_splits,
            };
            assert_eq!(split_note(&single, &params, &mut rng).reason(), Some(NO_VALID_SPLIT));
        }
    }

    #[test]
    fn split_note_conserves_duration() {
        let mut rng = Pcg32::seed_from_u64(2);
        let params = SplitNoteParams {
            min_duration: 33,
            num_splits: 2,
        };

        for _ in 0..10 {
            let res = split_note(&basic(), &params, &mut rng).into_option().unwrap();
            let (removed, mut added) = diff(&basic(), &res);
            assert_eq!(removed.len(), 1);
            assert_eq!(added.len(), 3);

            let original = removed[0];
            added.sort_by_key(|n| n.onset);
            assert_eq!(added.iter().map(|n| n.dur).collect::<Vec<_>>(), vec![34, 33, 33]);
            assert_eq!(added[0].onset, original.onset);
            assert_eq!(added[2].offset(), original.offset());
            for pair in added.windows(2) {
                assert_eq!(pair[0].offset(), pair[1].onset);
            }
            assert!(added.iter().all(|n| (n.track, n.pitch) == (original.track, original.pitch)));
        }
    }

    #[test]
    fn split_note_replaces_in_place() {
        let mut rng = Pcg32::seed_from_u64(3);
        let single = table(&[(0, 0, 10, 100)]);

        let res = split_note(&single, &SplitNoteParams::default(), &mut rng).into_option().unwrap();
        assert_eq!(res, table(&[(0, 0, 10, 50), (50, 0, 10, 50)]));
    }

    #[test]
    fn join_notes_empty_and_invalid() {
        env_logger::try_init().unwrap_or(());
        let mut rng = Pcg32::seed_from_u64(4);

        assert_eq!(
            join_notes(&empty(), &JoinNotesParams::default(), &mut rng).reason(),
            Some(NO_NOTES_TO_JOIN)
        );
        assert_eq!(
            join_notes(&basic(), &JoinNotesParams::default(), &mut rng).reason(),
            Some(NO_VALID_JOIN)
        );

        let one = JoinNotesParams {
            max_notes: 1,
            ..Default::default()
        };
        assert_eq!(join_notes(&legato(), &one, &mut rng).reason(), Some(NO_VALID_JOIN));
    }

    #[test]
    fn join_notes_follows_gap_and_count_limits() {
        let mut rng = Pcg32::seed_from_u64(5);

        let res = join_notes(&legato(), &JoinNotesParams::default(), &mut rng).into_option().unwrap();
        assert_eq!(res, table(&[(0, 0, 60, 350), (0, 1, 60, 100)]));

        let tight = JoinNotesParams {
            max_gap: 49,
            ..Default::default()
        };
        let res = join_notes(&legato(), &tight, &mut rng).into_option().unwrap();
        assert_eq!(res, table(&[(0, 0, 60, 200), (250, 0, 60, 100), (0, 1, 60, 100)]));

        let pair = JoinNotesParams {
            max_notes: 2,
            ..Default::default()
        };
        let res = join_notes(&legato(), &pair, &mut rng).into_option().unwrap();
        assert_eq!(res, table(&[(0, 0, 60, 200), (250, 0, 60, 100), (0, 1, 60, 100)]));
    }

    #[test]
    fn overlapping_notes_never_join() {
        env_logger::try_init().unwrap_or(());
        let mut rng = Pcg32::seed_from_u64(6);

        let res = join_notes(&table(&[(0, 0, 60, 100), (50, 0, 60, 100)]), &JoinNotesParams::default(), &mut rng);
        assert_eq!(res.reason(), Some(NO_VALID_JOIN));
    }

    #[test]
    fn join_notes_only_first() {
        env_logger::try_init().unwrap_or(());
        let mut rng = Pcg32::seed_from_u64(7);
        let params = JoinNotesParams {
            only_first: true,
            ..Default::default()
        };

        let res = join_notes(&legato(), &params, &mut rng).into_option().unwrap();
        assert_eq!(res.notes()[0], Note::new(0, 0, 60, 350));

        let late_chain = table(&[(0, 0, 50, 100), (100, 0, 60, 100), (200, 0, 60, 100)]);
        assert_eq!(join_notes(&late_chain, &params, &mut rng).reason(), Some(NO_VALID_JOIN));
    }

    #[test]
    fn join_notes_picks_among_disjoint_chains() {
        let excerpt = table(&[(0, 0, 60, 100), (0, 1, 70, 100), (100, 0, 60, 100), (100, 1, 70, 100)]);
        let mut joined_pitches = std::collections::BTreeSet::new();

        for seed in 0..32 {
            let mut rng = Pcg32::seed_from_u64(seed);
            let res = join_notes(&excerpt, &JoinNotesParams::default(), &mut rng).into_option().unwrap();
            let (removed, added) = diff(&excerpt, &res);

            assert_eq!((removed.len(), added.len()), (2, 1));
            assert_eq!(added[0].dur, 200);
            assert_eq!(added[0].onset, 0);
            joined_pitches.insert(added[0].pitch);
        }

        assert_eq!(joined_pitches.into_iter().collect::<Vec<_>>(), vec![60, 70]);
    }
}
