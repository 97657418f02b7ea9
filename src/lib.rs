#![allow(non_snake_case)]

mod balance;
mod dataset;
mod degradations;
mod error;
mod midi_importer;
mod model;
mod normalize;
mod note_csv;
mod sampling;
mod util;

pub use balance::*;
pub use dataset::*;
pub use degradations::*;
pub use error::*;
pub use midi_importer::*;
pub use model::config::*;
pub use model::note::*;
pub use model::params::*;
pub use normalize::*;
pub use note_csv::*;
pub use sampling::*;
pub use util::*;
