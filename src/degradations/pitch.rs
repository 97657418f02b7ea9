use super::Outcome;
use crate::model::note::NoteTable;
use crate::model::params::PitchShiftParams;
use rand::Rng;
use rand::distr::Distribution;
use rand::distr::weighted::WeightedIndex;
use rand::seq::IndexedRandom;

/// How many uniform draws may reproduce the original pitch before giving up.
pub const PITCH_SHIFT_TRIES: usize = 10;

pub const TRIES_WARN_MSG: &str = "Generated an unchanged pitch too many times while pitch shifting";
pub const NO_NOTES_TO_PITCH_SHIFT: &str = "No notes to pitch shift";
pub const NO_VALID_PITCHES: &str = "No valid pitches to shift given min_pitch and max_pitch";
pub const ZERO_DISTRIBUTION: &str =
    "distribution contains only 0s after setting distribution[zero_idx] value to 0";
pub const INVALID_DISTRIBUTION: &str = "distribution must contain finite, non-negative values";

/// Shift the pitch of one note.
///
/// Without a distribution the new pitch is uniform in `[min_pitch, max_pitch]`. With one,
/// `distribution[i]` weighs a shift of `i - len / 2` semitones; the centre entry and any pitch
/// outside the bounds get weight 0 and the rest is renormalized. Only notes with at least one
/// reachable pitch are candidates.
pub fn pitch_shift<R: Rng + ?Sized>(
    excerpt: &NoteTable,
    params: &PitchShiftParams,
    rng: &mut R,
) -> Outcome {
    if excerpt.is_empty() {
        return Outcome::infeasible(NO_NOTES_TO_PITCH_SHIFT);
    }

    if params.min_pitch > params.max_pitch {
        return Outcome::infeasible(NO_VALID_PITCHES);
    }

    let pitch_range = params.min_pitch..=params.max_pitch;
    let mut degraded = excerpt.clone();

    let Some(distribution) = params.distribution.as_deref() else {
        let index = rng.random_range(0..excerpt.len());
        let original = excerpt.notes()[index].pitch;

        for _ in 0..PITCH_SHIFT_TRIES {
            let pitch = rng.random_range(pitch_range.clone());
            if pitch != original {
                degraded.notes_mut()[index].pitch = pitch;
                return Outcome::Degraded(degraded);
            }
        }

        return Outcome::infeasible(TRIES_WARN_MSG);
    };

    if distribution.iter().any(|w| !w.is_finite() || *w < 0.0) {
        return Outcome::infeasible(INVALID_DISTRIBUTION);
    }

    let middle = distribution.len() / 2;
    if distribution
        .iter()
        .enumerate()
        .all(|(i, w)| i == middle || *w == 0.0)
    {
        return Outcome::infeasible(ZERO_DISTRIBUTION);
    }

    let candidates: Vec<(usize, Vec<(i32, f64)>)> = excerpt
        .iter()
        .enumerate()
        .filter_map(|(index, note)| {
            let options: Vec<(i32, f64)> = distribution
                .iter()
                .enumerate()
                .filter(|&(i, w)| i != middle && *w > 0.0)
                .map(|(i, w)| (note.pitch + i as i32 - middle as i32, *w))
                .filter(|(pitch, _)| pitch_range.contains(pitch))
                .collect();

            (!options.is_empty()).then_some((index, options))
        })
        .collect();

    let Some((index, options)) = candidates.choose(rng) else {
        return Outcome::infeasible(NO_VALID_PITCHES);
    };

    let Ok(weights) = WeightedIndex::new(options.iter().map(|(_, w)| *w)) else {
        return Outcome::infeasible(ZERO_DISTRIBUTION);
    };

    degraded.notes_mut()[*index].pitch = options[weights.sample(rng)].0;
    Outcome::Degraded(degraded)
}
