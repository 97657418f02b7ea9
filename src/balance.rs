use crate::degradations::{DegradationKind, Degrader, Outcome};
use crate::error::ConfigError;
use crate::model::note::NoteTable;
use crate::model::params::DegradationParams;
use crate::util::normalize_proportions;
use log::debug;
use rand::Rng;
use std::fmt;

pub const CLEAN_LABEL: &str = "clean";

/// The label of one dataset sample: left clean, or altered by one degradation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Label {
    Clean,
    Degraded(DegradationKind),
}

impl Label {
    pub fn name(&self) -> &'static str {
        match self {
            Label::Clean => CLEAN_LABEL,
            Label::Degraded(kind) => kind.name(),
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Steers label choice toward a goal distribution.
///
/// Labels are preferred in order of how far their running share lags behind their goal share,
/// so over many samples the produced labels track the goal even when some degradations fail.
#[derive(Debug, Clone)]
pub struct Balancer {
    labels: Vec<Label>,
    goal: Vec<f64>,
    counts: Vec<u64>,
}

impl Balancer {
    /// `dist` holds one relative probability per entry of `kinds` (uniform when `None`). Kinds with
    /// probability 0 are dropped. When `clean_prop > 0` the clean label comes first with that
    /// share, and the degradations share the rest.
    pub fn new(kinds: &[DegradationKind], dist: Option<&[f64]>, clean_prop: f64) -> Result<Self, ConfigError> {
        if !(0.0..=1.0).contains(&clean_prop) {
            return Err(ConfigError::CleanProportion(clean_prop));
        }

        let weights = match dist {
            Some(dist) if dist.len() != kinds.len() => {
                return Err(ConfigError::DistributionLength {
                    expected: kinds.len(),
                    actual: dist.len(),
                });
            }
            Some(dist) => dist.to_vec(),
            None => vec![1.0; kinds.len()],
        };

        let mut labels = Vec::with_capacity(kinds.len() + 1);
        let mut goal = Vec::with_capacity(kinds.len() + 1);

        if clean_prop > 0.0 {
            labels.push(Label::Clean);
            goal.push(clean_prop);
        }

        if !kinds.is_empty() && clean_prop < 1.0 {
            let shares = normalize_proportions(&weights)?;
            for (kind, share) in kinds.iter().zip(shares) {
                if share > 0.0 {
                    labels.push(Label::Degraded(*kind));
                    goal.push(share * (1.0 - clean_prop));
                }
            }
        }

        if labels.is_empty() {
            return Err(ConfigError::NoLabels);
        }

        Ok(Self {
            counts: vec![0; labels.len()],
            labels,
            goal,
        })
    }

    pub fn labels(&self) -> &[Label] {
        &self.labels
    }

    pub fn goal(&self) -> &[f64] {
        &self.goal
    }

    pub fn counts(&self) -> &[u64] {
        &self.counts
    }

    pub fn index_of(&self, label: Label) -> Option<usize> {
        self.labels.iter().position(|l| *l == label)
    }

    /// Labels ordered by descending deficit (goal share minus current share). Before anything has
    /// been recorded the current distribution counts as uniform. Ties keep label order.
    pub fn preference(&self) -> Vec<Label> {
        let total: u64 = self.counts.iter().sum();
        let n = self.labels.len() as f64;

        let mut deficits: Vec<(f64, Label)> = self
            .goal
            .iter()
            .zip(&self.counts)
            .zip(&self.labels)
            .map(|((goal, count), label)| {
                let current = match total {
                    0 => 1.0 / n,
                    total => *count as f64 / total as f64,
                };
                (goal - current, *label)
            })
            .collect();

        deficits.sort_by(|a, b| b.0.total_cmp(&a.0));
        deficits.into_iter().map(|(_, label)| label).collect()
    }

    pub fn record(&mut self, label: Label) {
        if let Some(i) = self.index_of(label) {
            self.counts[i] += 1;
        }
    }
}

/// A labelled sample chosen for one excerpt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub label: Label,
    pub altered: NoteTable,
}

/// Walk the balancer's preference order and keep the first label that works for `excerpt`.
///
/// Clean is always accepted; a degradation is accepted when it succeeds. The chosen label is
/// recorded. `None` means every preferred degradation was infeasible and clean was not an option.
pub fn select_degradation<R: Rng>(
    balancer: &mut Balancer,
    degrader: &mut Degrader<R>,
    excerpt: &NoteTable,
    params: &DegradationParams,
) -> Option<Selection> {
    for label in balancer.preference() {
        let altered = match label {
            Label::Clean => excerpt.clone(),
            Label::Degraded(kind) => match degrader.apply(kind, excerpt, params, None) {
                Outcome::Degraded(altered) => altered,
                Outcome::Infeasible(_) => {
                    debug!("{} failed, trying the next preferred label..!", kind);
                    continue;
                }
            },
        };

        balancer.record(label);
        return Some(Selection { label, altered });
    }

    None
}
