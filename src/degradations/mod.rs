//! Randomized, constraint-respecting edits of a note table.
//!
//! Every operator borrows its input, works on a private copy, and reports either the degraded
//! copy or the reason no edit was possible. Infeasibility is an expected outcome, so it is a
//! variant of [`Outcome`] rather than an error.

mod notes;
mod pitch;
mod split_join;
mod timing;

pub use notes::*;
pub use pitch::*;
pub use split_join::*;
pub use timing::*;

use crate::error::UnknownDegradation;
use crate::model::note::{Note, NoteTable};
use crate::model::params::DegradationParams;
use crate::normalize::{overlaps, post_process};
use log::{debug, warn};
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

pub const OVERLAP_WARN_MSG: &str = "Degradation introduced an overlapping note";

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum DegradationKind {
    PitchShift,
    TimeShift,
    OnsetShift,
    OffsetShift,
    RemoveNote,
    AddNote,
    SplitNote,
    JoinNotes,
}

impl DegradationKind {
    pub const ALL: [DegradationKind; 8] = [
        DegradationKind::PitchShift,
        DegradationKind::TimeShift,
        DegradationKind::OnsetShift,
        DegradationKind::OffsetShift,
        DegradationKind::RemoveNote,
        DegradationKind::AddNote,
        DegradationKind::SplitNote,
        DegradationKind::JoinNotes,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            DegradationKind::PitchShift => "pitch_shift",
            DegradationKind::TimeShift => "time_shift",
            DegradationKind::OnsetShift => "onset_shift",
            DegradationKind::OffsetShift => "offset_shift",
            DegradationKind::RemoveNote => "remove_note",
            DegradationKind::AddNote => "add_note",
            DegradationKind::SplitNote => "split_note",
            DegradationKind::JoinNotes => "join_notes",
        }
    }
}

impl fmt::Display for DegradationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DegradationKind {
    type Err = UnknownDegradation;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim().to_lowercase();
        DegradationKind::ALL
            .into_iter()
            .find(|kind| kind.name() == name)
            .ok_or_else(|| UnknownDegradation {
                name: s.to_string(),
                valid: DegradationKind::ALL
                    .iter()
                    .map(DegradationKind::name)
                    .collect::<Vec<_>>()
                    .join(", "),
            })
    }
}

/// The result of a single degradation attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// A freshly owned, edited copy of the input.
    Degraded(NoteTable),
    /// No edit satisfied the operator's constraints.
    Infeasible(String),
}

impl Outcome {
    /// Log `reason` as a warning and wrap it.
    pub fn infeasible(reason: impl Into<String>) -> Self {
        let reason = reason.into();
        warn!("{}. No degradation performed..!", reason);
        Outcome::Infeasible(reason)
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, Outcome::Degraded(_))
    }

    pub fn into_option(self) -> Option<NoteTable> {
        match self {
            Outcome::Degraded(table) => Some(table),
            Outcome::Infeasible(_) => None,
        }
    }

    pub fn reason(&self) -> Option<&str> {
        match self {
            Outcome::Degraded(_) => None,
            Outcome::Infeasible(reason) => Some(reason),
        }
    }
}

/// Run one operator directly with the caller's generator.
pub fn degrade<R: Rng + ?Sized>(
    kind: DegradationKind,
    excerpt: &NoteTable,
    params: &DegradationParams,
    rng: &mut R,
) -> Outcome {
    match kind {
        DegradationKind::PitchShift => pitch_shift(excerpt, &params.pitch_shift, rng),
        DegradationKind::TimeShift => time_shift(excerpt, &params.time_shift, rng),
        DegradationKind::OnsetShift => onset_shift(excerpt, &params.onset_shift, rng),
        DegradationKind::OffsetShift => offset_shift(excerpt, &params.offset_shift, rng),
        DegradationKind::RemoveNote => remove_note(excerpt, &params.remove_note, rng),
        DegradationKind::AddNote => add_note(excerpt, &params.add_note, rng),
        DegradationKind::SplitNote => split_note(excerpt, &params.split_note, rng),
        DegradationKind::JoinNotes => join_notes(excerpt, &params.join_notes, rng),
    }
}

/// Owns the random source and the normalization policy shared by every degradation call.
#[derive(Debug, Clone)]
pub struct Degrader<R: Rng = Pcg32> {
    rng: R,
    sort: bool,
    forbid_overlaps: bool,
}

impl Degrader<Pcg32> {
    pub fn seeded(seed: u64) -> Self {
        Self::new(Pcg32::seed_from_u64(seed))
    }

    pub fn from_entropy() -> Self {
        Self::new(Pcg32::from_rng(&mut rand::rng()))
    }
}

impl<R: Rng> Degrader<R> {
    pub fn new(rng: R) -> Self {
        Self {
            rng,
            sort: true,
            forbid_overlaps: false,
        }
    }

    /// Canonically sort each excerpt before editing it, and each result after.
    pub fn with_sort(mut self, sort: bool) -> Self {
        self.sort = sort;
        self
    }

    /// Reject results where a new or changed note overlaps another note on its track.
    pub fn with_forbid_overlaps(mut self, forbid: bool) -> Self {
        self.forbid_overlaps = forbid;
        self
    }

    pub fn rng_mut(&mut self) -> &mut R {
        &mut self.rng
    }

    /// Apply one degradation to `excerpt`.
    ///
    /// With `Some(seed)` the call draws from a generator seeded for this call only, so the
    /// degrader's own generator is left untouched.
    pub fn apply(
        &mut self,
        kind: DegradationKind,
        excerpt: &NoteTable,
        params: &DegradationParams,
        seed: Option<u64>,
    ) -> Outcome {
        let input = post_process(excerpt, self.sort);

        let outcome = match seed {
            Some(seed) => degrade(kind, &input, params, &mut Pcg32::seed_from_u64(seed)),
            None => degrade(kind, &input, params, &mut self.rng),
        };

        match outcome {
            Outcome::Degraded(table) => {
                if self.forbid_overlaps && edit_overlaps(&input, &table) {
                    return Outcome::infeasible(OVERLAP_WARN_MSG);
                }

                debug!("Applied {} ({} -> {} notes)..!", kind, input.len(), table.len());
                Outcome::Degraded(post_process(&table, self.sort))
            }
            Outcome::Infeasible(reason) => {
                debug!("{} was infeasible: {}", kind, reason);
                Outcome::Infeasible(reason)
            }
        }
    }
}

/// Whether a note of `edited` that was not carried over unchanged from `input` overlaps another.
fn edit_overlaps(input: &NoteTable, edited: &NoteTable) -> bool {
    let mut kept: HashMap<Note, usize> = HashMap::new();
    for note in input {
        *kept.entry(*note).or_default() += 1;
    }

    edited.iter().enumerate().any(|(index, note)| match kept.get_mut(note) {
        Some(count) if *count > 0 => {
            *count -= 1;
            false
        }
        _ => overlaps(edited, index),
    })
}
