use crate::model::note::NoteTable;
use crate::normalize::{NormalizeOptions, RawNoteTable, REQUIRED_COLUMNS, pre_process_with};
use anyhow::{Context, Result, anyhow, bail};
use log::{debug, warn};
use midly::{MetaMessage, MidiMessage, Smf, Timing, TrackEventKind};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

const DEFAULT_MPQN: u32 = 500_000;

/// Notes still sounding, keyed by (track, channel, key), with their start ticks.
type OpenNotes = HashMap<(usize, u8, u8), Vec<u64>>;

struct NoteInterval {
    track: usize,
    key: u8,
    start_tick: u64,
    end_tick: u64,
}

#[derive(Debug, Clone)]
struct TempoSegment {
    mpqn: u32,
    start_tick: u64,
    ms_at_start: f64,
}

/// Read a standard MIDI file into a note table.
///
/// Onsets and durations are in milliseconds, following the file's tempo map; the track of each
/// note is the index of the MIDI track it came from, re-encoded densely like any other input.
pub fn import_midi_file<P: AsRef<Path>>(path: P, options: NormalizeOptions) -> Result<NoteTable> {
    let path = path.as_ref();
    let bytes = fs::read(path).with_context(|| format!("Failed to read MIDI file {}", path.display()))?;

    let raw = midi_bytes_to_raw(&bytes).with_context(|| format!("Failed to import {}", path.display()))?;
    pre_process_with(&raw, options).with_context(|| format!("Invalid notes in {}", path.display()))
}

pub fn midi_bytes_to_raw(bytes: &[u8]) -> Result<RawNoteTable> {
    let smf = Smf::parse(bytes).map_err(|e| anyhow!("Failed to parse MIDI: {:?}", e))?;

    let ticks_per_quarter = match smf.header.timing {
        Timing::Metrical(t) => t.as_int() as u64,
        Timing::Timecode(_fps, _subframe) => {
            bail!("SMPTE timecode midi timing is not currently supported..!");
        }
    };

    debug!(
        "MIDI format: {:?}, tracks: {}, ticks per quarter note: {}",
        smf.header.format,
        smf.tracks.len(),
        ticks_per_quarter
    );

    // ~120bpm until a tempo meta event appears
    let mut tempo_changes: Vec<(u64, u32)> = vec![(0, DEFAULT_MPQN)];
    let mut intervals: Vec<NoteInterval> = Vec::new();
    let mut open_notes: OpenNotes = HashMap::new();

    for (track, events) in smf.tracks.iter().enumerate() {
        let mut abs_tick: u64 = 0;
        for event in events.iter() {
            abs_tick = abs_tick.saturating_add(event.delta.as_int() as u64);

            match &event.kind {
                TrackEventKind::Meta(MetaMessage::Tempo(micro)) => {
                    tempo_changes.push((abs_tick, micro.as_int()));
                    debug!("Tempo change at tick {} -> {} us/qn (track {})", abs_tick, micro.as_int(), track);
                }
                TrackEventKind::Midi { channel, message } => {
                    let ch = channel.as_int();

                    match message {
                        MidiMessage::NoteOn { key, vel } if vel.as_int() > 0 => {
                            open_notes
                                .entry((track, ch, key.as_int()))
                                .or_default()
                                .push(abs_tick);
                        }
                        MidiMessage::NoteOn { key, .. } | MidiMessage::NoteOff { key, .. } => {
                            close_note(&mut open_notes, &mut intervals, (track, ch, key.as_int()), abs_tick);
                        }
                        _ => {}
                    }
                }
                _ => {}
            }
        }
    }

    let last_tick_estimate = intervals
        .iter()
        .map(|interval| interval.end_tick)
        .chain(tempo_changes.iter().map(|(tick, _)| *tick))
        .max()
        .unwrap_or(0);

    for ((track, ch, key), stack) in open_notes.into_iter() {
        for start_tick in stack {
            let end_tick = if last_tick_estimate > start_tick {
                last_tick_estimate
            } else {
                start_tick + ticks_per_quarter
            };

            warn!(
                "Unclosed NoteOn for {}, track: {}, channel: {} at tick: {} auto-closing at: {}..!",
                key, track, ch, start_tick, end_tick
            );
            intervals.push(NoteInterval {
                track,
                key,
                start_tick,
                end_tick,
            });
        }
    }

    let segments = tempo_segments(tempo_changes, ticks_per_quarter);
    let ticks_to_ms = |tick: u64| -> f64 {
        let segment = segments
            .iter()
            .rfind(|seg| seg.start_tick <= tick)
            .unwrap_or(&segments[0]);

        let delta_ticks = tick.saturating_sub(segment.start_tick) as f64;
        segment.ms_at_start + delta_ticks * (segment.mpqn as f64) / (ticks_per_quarter as f64) / 1000.0
    };

    intervals.sort_unstable_by_key(|interval| (interval.start_tick, interval.track, interval.key, interval.end_tick));

    let mut raw = RawNoteTable::new(REQUIRED_COLUMNS);
    for interval in intervals {
        let onset = ticks_to_ms(interval.start_tick).round() as i64;
        let offset = ticks_to_ms(interval.end_tick).round() as i64;

        if offset <= onset {
            debug!(
                "Skipping zero length midi note {} on track {} at {}ms..!",
                interval.key, interval.track, onset
            );
            continue;
        }

        raw.push([onset, interval.track as i64, interval.key as i64, offset - onset]);
    }

    Ok(raw)
}

/// Accumulate the tempo map into segments that know their start time in ms.
fn tempo_segments(mut tempo_changes: Vec<(u64, u32)>, ticks_per_quarter: u64) -> Vec<TempoSegment> {
    tempo_changes.sort_by_key(|(tick, _)| *tick);

    let mut last_tick: u64 = 0;
    let mut last_mpqn: u32 = DEFAULT_MPQN;
    let mut ms_accum: f64 = 0.0;
    let mut segments: Vec<TempoSegment> = Vec::with_capacity(tempo_changes.len());

    for (tick, mpqn) in tempo_changes {
        if tick > last_tick {
            ms_accum += (tick - last_tick) as f64 * (last_mpqn as f64) / (ticks_per_quarter as f64) / 1000.0;
        }

        segments.push(TempoSegment {
            mpqn,
            start_tick: tick,
            ms_at_start: ms_accum,
        });

        last_tick = tick;
        last_mpqn = mpqn;
    }

    segments
}

fn close_note(open_notes: &mut OpenNotes, intervals: &mut Vec<NoteInterval>, id: (usize, u8, u8), abs_tick: u64) {
    let (track, ch, key) = id;

    let Some(start_tick) = open_notes.get_mut(&id).and_then(|stack| stack.pop()) else {
        debug!("Orphaned NoteOff for {} track {} ch{} at tick {}..!", key, track, ch, abs_tick);
        return;
    };

    intervals.push(NoteInterval {
        track,
        key,
        start_tick,
        end_tick: abs_tick,
    });
}
