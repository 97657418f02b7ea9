use crate::balance::{Balancer, Label, select_degradation};
use crate::degradations::Degrader;
use crate::error::ConfigError;
use crate::midi_importer::import_midi_file;
use crate::model::note::NoteTable;
use crate::model::params::DegradationParams;
use crate::normalize::NormalizeOptions;
use crate::note_csv::{export_note_csv, import_note_csv};
use crate::util::normalize_proportions;
use anyhow::{Context, Result};
use log::{debug, info, warn};
use rand::Rng;
use rand::seq::SliceRandom;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

/// How many random start notes are tried before a piece is skipped.
pub const EXCERPT_TRIES: usize = 10;

const LOAD_OPTIONS: NormalizeOptions = NormalizeOptions {
    sort: true,
    check_overlaps: false,
};

/// One source piece, named after the directory it came from and its file stem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Composition {
    pub dataset: String,
    pub name: String,
    pub notes: NoteTable,
}

impl Composition {
    /// Path of the excerpt file under `clean/` or `altered/`, relative to the output directory.
    fn relative_path(&self, kind: &str) -> String {
        format!("{}/{}/{}.csv", kind, self.dataset, self.name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Split {
    Train,
    Test,
    Valid,
}

impl Split {
    pub fn name(&self) -> &'static str {
        match self {
            Split::Train => "train",
            Split::Test => "test",
            Split::Valid => "valid",
        }
    }

    /// The split for a sample at relative position `prop` in `[0, 1)` of the dataset.
    pub fn at(prop: f64, splits: &[f64; 3]) -> Self {
        if prop < splits[0] {
            Split::Train
        } else if prop < splits[0] + splits[1] {
            Split::Test
        } else {
            Split::Valid
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DatasetOptions {
    /// Length in ms of the window of onsets that makes up an excerpt.
    pub excerpt_length: i64,
    pub min_notes: usize,
    /// Relative sizes of the train, test and valid splits.
    pub splits: [f64; 3],
}

impl Default for DatasetOptions {
    fn default() -> Self {
        Self {
            excerpt_length: 5000,
            min_notes: 10,
            splits: [0.8, 0.1, 0.1],
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DatasetSummary {
    pub written: usize,
    pub skipped: usize,
    pub counts: Vec<(Label, u64)>,
}

#[derive(Serialize)]
struct MetadataRow<'a> {
    altered_path: &'a str,
    deg_binary: u8,
    deg_num: usize,
    clean_path: &'a str,
    split: &'static str,
}

#[derive(Serialize)]
struct LabelRow {
    index: usize,
    name: &'static str,
}

/// Load every `.csv` file from `csv_dirs` and every `.mid`/`.midi` file from `midi_dirs`.
///
/// Files that fail to load are skipped with a warning; an unreadable directory is an error.
pub fn load_compositions(csv_dirs: &[PathBuf], midi_dirs: &[PathBuf]) -> Result<Vec<Composition>> {
    let mut compositions = Vec::new();

    for dir in csv_dirs {
        for path in files_with_extension(dir, &["csv"])? {
            match import_note_csv(&path, LOAD_OPTIONS) {
                Ok(notes) => compositions.push(composition(dir, &path, notes)),
                Err(e) => warn!("Skipping {}: {:#}..!", path.display(), e),
            }
        }
    }

    for dir in midi_dirs {
        for path in files_with_extension(dir, &["mid", "midi"])? {
            match import_midi_file(&path, LOAD_OPTIONS) {
                Ok(notes) => compositions.push(composition(dir, &path, notes)),
                Err(e) => warn!("Skipping {}: {:#}..!", path.display(), e),
            }
        }
    }

    info!("Loaded {} compositions..!", compositions.len());
    Ok(compositions)
}

fn files_with_extension(dir: &Path, extensions: &[&str]) -> Result<Vec<PathBuf>> {
    let entries = fs::read_dir(dir).with_context(|| format!("Failed to read directory {}", dir.display()))?;

    let mut paths = Vec::new();
    for entry in entries {
        let path = entry?.path();
        let matches = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| extensions.iter().any(|e| ext.eq_ignore_ascii_case(e)));

        if path.is_file() && matches {
            paths.push(path);
        }
    }

    // read_dir order is platform dependent
    paths.sort();
    Ok(paths)
}

fn composition(dir: &Path, path: &Path, notes: NoteTable) -> Composition {
    let name_of = |p: Option<&std::ffi::OsStr>| p.map(|s| s.to_string_lossy().into_owned()).unwrap_or_default();

    Composition {
        dataset: name_of(dir.file_name()),
        name: name_of(path.file_stem()),
        notes,
    }
}

/// Pick an excerpt: every note whose onset lies within `excerpt_length` ms of a random start note.
///
/// Start notes are drawn from all but the last `min_notes - 1` notes. An excerpt with fewer than
/// `min_notes` notes is redrawn, up to [`EXCERPT_TRIES`] times. `notes` must be sorted by onset.
pub fn select_excerpt<R: Rng + ?Sized>(
    notes: &NoteTable,
    options: &DatasetOptions,
    rng: &mut R,
) -> Option<NoteTable> {
    let min_notes = options.min_notes.max(1);
    if notes.len() < min_notes {
        return None;
    }

    let last_start = notes.len() - min_notes;
    for _ in 0..EXCERPT_TRIES {
        let start = notes.notes()[rng.random_range(0..=last_start)].onset;
        let end = start.saturating_add(options.excerpt_length);

        let excerpt: NoteTable = notes
            .iter()
            .filter(|note| (start..end).contains(&note.onset))
            .copied()
            .collect();

        if excerpt.len() >= min_notes {
            return Some(excerpt);
        }
    }

    None
}

/// Write a labelled dataset of clean and altered excerpts under `output_dir`.
///
/// Creates `clean/<dataset>/`, `altered/<dataset>/`, `labels.csv` and `metadata.csv`. Compositions
/// are shuffled first, so splits are handed out in order over the pieces that yield an excerpt.
pub fn make_dataset<R: Rng>(
    compositions: &mut [Composition],
    output_dir: &Path,
    balancer: &mut Balancer,
    degrader: &mut Degrader<R>,
    params: &DegradationParams,
    options: &DatasetOptions,
) -> Result<DatasetSummary> {
    let splits: [f64; 3] = normalize_proportions(&options.splits)
        .map_err(|_| ConfigError::InvalidSplits)?
        .try_into()
        .map_err(|_| ConfigError::InvalidSplits)?;

    compositions.shuffle(degrader.rng_mut());

    for composition in compositions.iter() {
        for kind in ["clean", "altered"] {
            let dir = output_dir.join(kind).join(&composition.dataset);
            fs::create_dir_all(&dir).with_context(|| format!("Failed to create {}", dir.display()))?;
        }
    }
    fs::create_dir_all(output_dir).with_context(|| format!("Failed to create {}", output_dir.display()))?;

    let mut labels = csv::Writer::from_path(output_dir.join("labels.csv")).context("Failed to create labels.csv")?;
    for (index, label) in balancer.labels().iter().enumerate() {
        labels.serialize(LabelRow {
            index,
            name: label.name(),
        })?;
    }
    labels.flush()?;

    let mut metadata =
        csv::Writer::from_path(output_dir.join("metadata.csv")).context("Failed to create metadata.csv")?;

    let total = compositions.len();
    let mut excerpts: Vec<(&Composition, NoteTable)> = Vec::with_capacity(total);
    for composition in compositions.iter() {
        match select_excerpt(&composition.notes, options, degrader.rng_mut()) {
            Some(excerpt) => excerpts.push((composition, excerpt)),
            None => warn!(
                "Unable to find a valid excerpt in {}/{}, skipping..!",
                composition.dataset, composition.name
            ),
        }
    }

    let mut skipped = total - excerpts.len();
    let mut unlabelled = 0usize;

    for (i, (composition, excerpt)) in excerpts.iter().enumerate() {
        let prop = (i - unlabelled) as f64 / (excerpts.len() - unlabelled) as f64;
        let split = Split::at(prop, &splits);

        let Some(selection) = select_degradation(balancer, degrader, excerpt, params) else {
            warn!(
                "Unable to degrade the excerpt from {}/{} and no clean excerpts are wanted, skipping..!",
                composition.dataset, composition.name
            );
            unlabelled += 1;
            continue;
        };

        let clean_path = composition.relative_path("clean");
        export_note_csv(excerpt, output_dir.join(&clean_path))?;

        let altered_path = match selection.label {
            Label::Clean => clean_path.clone(),
            Label::Degraded(_) => {
                let path = composition.relative_path("altered");
                export_note_csv(&selection.altered, output_dir.join(&path))?;
                path
            }
        };

        debug!("{} -> {} ({})..!", clean_path, altered_path, selection.label);
        metadata.serialize(MetadataRow {
            altered_path: &altered_path,
            deg_binary: u8::from(selection.label != Label::Clean),
            deg_num: balancer.index_of(selection.label).unwrap_or(0),
            clean_path: &clean_path,
            split: split.name(),
        })?;
    }
    metadata.flush()?;
    skipped += unlabelled;

    Ok(DatasetSummary {
        written: total - skipped,
        skipped,
        counts: balancer
            .labels()
            .iter()
            .copied()
            .zip(balancer.counts().iter().copied())
            .collect(),
    })
}
