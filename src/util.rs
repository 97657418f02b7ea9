use crate::DegradationKind;
use crate::error::ConfigError;
use crate::model::params::DegradationParams;
use anyhow::{Context, Result, bail};
use log::{info, warn};
use serde_json::{Map, Value};
use std::fs;
use std::path::Path;

/// Group `<degradation>__<kwarg>` keys into per-degradation parameter sets.
///
/// `{"pitch_shift__min_pitch": 5, "join_notes__only_first": true}` sets those two fields and
/// leaves every other parameter at its default.
pub fn parse_degradation_kwargs(kwargs: &Value) -> Result<DegradationParams> {
    let Some(kwargs) = kwargs.as_object() else {
        bail!(ConfigError::KwargObject);
    };

    let mut grouped: Map<String, Value> = Map::new();
    for (key, value) in kwargs {
        let Some((name, kwarg)) = key.split_once("__") else {
            bail!(ConfigError::KwargKey(key.clone()));
        };
        let kind: DegradationKind = name.parse()?;

        let entry = grouped
            .entry(kind.name())
            .or_insert_with(|| Value::Object(Map::new()));
        if let Value::Object(params) = entry {
            params.insert(kwarg.to_string(), value.clone());
        }
    }

    serde_json::from_value(Value::Object(grouped)).context("Invalid degradation keyword arguments..!")
}

/// Read degradation keyword arguments from an inline JSON string or a JSON file, never both.
pub fn load_degradation_kwargs(inline: Option<&str>, file: Option<&Path>) -> Result<DegradationParams> {
    let kwargs: Value = match (inline, file) {
        (Some(_), Some(_)) => bail!(ConfigError::ConflictingKwargs),
        (Some(json), None) => serde_json::from_str(json).context("--degradation-kwargs is not valid JSON..!")?,
        (None, Some(path)) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("Failed to read degradation kwargs from {}", path.display()))?;
            serde_json::from_str(&text)
                .with_context(|| format!("{} does not contain valid JSON..!", path.display()))?
        }
        (None, None) => {
            info!("No degradation kwargs given, using defaults..!");
            return Ok(DegradationParams::default());
        }
    };

    parse_degradation_kwargs(&kwargs)
}

/// Warn about keyword arguments given for degradations that will never run.
pub fn warn_unused_kwargs(params: &DegradationParams, chosen: &[DegradationKind]) {
    let Ok(Value::Object(given)) = serde_json::to_value(params) else {
        return;
    };
    let Ok(Value::Object(defaults)) = serde_json::to_value(DegradationParams::default()) else {
        return;
    };

    for kind in DegradationKind::ALL {
        if !chosen.contains(&kind) && given.get(kind.name()) != defaults.get(kind.name()) {
            warn!("Keyword arguments were given for {}, which is not among the chosen degradations..!", kind);
        }
    }
}

/// Scale non-negative weights so they sum to 1.
pub fn normalize_proportions(weights: &[f64]) -> Result<Vec<f64>, ConfigError> {
    let total: f64 = weights.iter().sum();
    if weights.iter().any(|w| !w.is_finite() || *w < 0.0) || !(total > 0.0) {
        return Err(ConfigError::InvalidDistribution);
    }

    Ok(weights.iter().map(|w| w / total).collect())
}
