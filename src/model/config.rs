use crate::DegradationKind;
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "ACME",
    about = "Make datasets of Altered and Corrupted MIDI Excerpts!"
)]
pub struct Args {
    /// The directory to write the dataset to.
    #[arg(short, long, default_value = "acme")]
    pub output_dir: PathBuf,

    /// Directories containing note CSV files (onset,track,pitch,dur) to include in the dataset.
    #[arg(long = "csv-dirs", value_name = "CSV_DIR", num_args = 1..)]
    pub csv_dirs: Vec<PathBuf>,

    /// Directories containing MIDI files to include in the dataset.
    #[arg(long = "midi-dirs", value_name = "MIDI_DIR", num_args = 1..)]
    pub midi_dirs: Vec<PathBuf>,

    /// Degradations to use on the data. Uses all of them by default.
    #[arg(long, value_name = "DEG_NAME", num_args = 1..)]
    pub degradations: Vec<DegradationKind>,

    /// Relative probability of each degradation, in the same order as `--degradations`.
    #[arg(long, value_name = "RELATIVE_PROBABILITY", num_args = 1..)]
    pub degradation_dist: Option<Vec<f64>>,

    /// JSON object of degradation keyword arguments, keyed `<degradation>__<kwarg>`.
    /// e.g. '{"pitch_shift__min_pitch": 5, "split_note__num_splits": 2}'
    #[arg(long, value_name = "JSON_STRING", conflicts_with = "degradation_kwarg_json")]
    pub degradation_kwargs: Option<String>,

    /// A file containing keyword arguments as described for `--degradation-kwargs`.
    #[arg(long, value_name = "JSON_FILE")]
    pub degradation_kwarg_json: Option<PathBuf>,

    /// The length of each excerpt in ms. An excerpt starts on a note onset and holds every note
    /// whose onset lies within this many ms after it.
    #[arg(long, value_name = "MS", default_value_t = 5000)]
    pub excerpt_length: i64,

    /// The minimum number of notes required for an excerpt to be valid.
    #[arg(long, value_name = "N", default_value_t = 10)]
    pub min_notes: usize,

    /// The proportion of excerpts in the final dataset that should be clean.
    #[arg(long, default_value_t = 1.0 / 9.0)]
    pub clean_prop: f64,

    /// The relative sizes of the train, test and validation sets.
    #[arg(long, num_args = 3, value_names = ["TRAIN", "TEST", "VALID"], default_values_t = [0.8, 0.1, 0.1])]
    pub splits: Vec<f64>,

    /// Seed for every random choice, for reproducible datasets.
    #[arg(short, long)]
    pub seed: Option<u64>,

    /// Keep notes in file order instead of sorting excerpts by (onset, track, pitch, dur).
    #[arg(long, default_value_t = false)]
    pub no_sort: bool,

    /// Treat a degradation that creates overlapping notes on a track as failed.
    #[arg(long, default_value_t = false)]
    pub forbid_overlaps: bool,

    /// Prints extra information to the terminal.
    #[arg(short, long)]
    pub verbose: bool,
}

impl Args {
    /// The chosen degradations, or all of them when none were given.
    pub fn degradation_kinds(&self) -> Vec<DegradationKind> {
        if self.degradations.is_empty() {
            DegradationKind::ALL.to_vec()
        } else {
            self.degradations.clone()
        }
    }
}
