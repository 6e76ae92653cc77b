use super::models::metrics::LayoutMetrics;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ScoringError {
    #[error("Unknown objective '{0}'")]
    UnknownObjective(String),
    #[error("Unknown objective preset '{0}'")]
    UnknownPreset(String),
    #[error("Weight for objective '{objective}' must be finite and non-negative, got {weight}")]
    InvalidWeight { objective: Objective, weight: f64 },
    #[error("Normalisation parameter '{name}' must be finite and positive, got {value}")]
    InvalidNormalization { name: &'static str, value: f64 },
}

/// A priority the user can weight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Objective {
    Density,
    StraightRuns,
    Loops,
    OpenEnds,
}

impl Objective {
    pub const ALL: [Objective; 4] = [
        Objective::Density,
        Objective::StraightRuns,
        Objective::Loops,
        Objective::OpenEnds,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Objective::Density => "density",
            Objective::StraightRuns => "straight-runs",
            Objective::Loops => "loops",
            Objective::OpenEnds => "open-ends",
        }
    }
}

impl fmt::Display for Objective {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Objective {
    type Err = ScoringError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Objective::ALL
            .into_iter()
            .find(|o| o.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ScoringError::UnknownObjective(s.to_string()))
    }
}

/// Saturation constants for the unbounded counts.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Normalization {
    /// Loop count at which the loop sub-score reaches one half.
    pub loop_saturation: f64,
    /// Open-end count at which the openness penalty reaches one half.
    pub open_end_saturation: f64,
}

impl Default for Normalization {
    fn default() -> Self {
        Self {
            loop_saturation: 1.0,
            open_end_saturation: 2.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ObjectivePreset {
    weights: BTreeMap<Objective, f64>,
    normalization: Normalization,
}

impl ObjectivePreset {
    pub const NAMES: [&'static str; 4] = ["balanced", "density", "straights", "loops"];

    /// A preset with every weight zero.
    pub fn empty() -> Self {
        Self {
            weights: BTreeMap::new(),
            normalization: Normalization::default(),
        }
    }

    pub fn named(name: &str) -> Result<Self, ScoringError> {
        let weights: &[(Objective, f64)] = match name.trim().to_ascii_lowercase().as_str() {
            "balanced" => &[
                (Objective::Density, 0.4),
                (Objective::StraightRuns, 0.2),
                (Objective::Loops, 0.3),
                (Objective::OpenEnds, 0.1),
            ],
            "density" => &[(Objective::Density, 1.0), (Objective::OpenEnds, 0.1)],
            "straights" => &[
                (Objective::StraightRuns, 1.0),
                (Objective::Density, 0.2),
                (Objective::OpenEnds, 0.1),
            ],
            "loops" => &[
                (Objective::Loops, 1.0),
                (Objective::OpenEnds, 0.5),
                (Objective::Density, 0.1),
            ],
            _ => return Err(ScoringError::UnknownPreset(name.to_string())),
        };
        let mut preset = Self::empty();
        for &(objective, weight) in weights {
            preset = preset.with_weight(objective, weight)?;
        }
        Ok(preset)
    }

    pub fn with_weight(mut self, objective: Objective, weight: f64) -> Result<Self, ScoringError> {
        if !weight.is_finite() || weight < 0.0 {
            return Err(ScoringError::InvalidWeight { objective, weight });
        }
        self.weights.insert(objective, weight);
        Ok(self)
    }

    pub fn with_normalization(mut self, normalization: Normalization) -> Result<Self, ScoringError> {
        for (name, value) in [
            ("loop-saturation", normalization.loop_saturation),
            ("open-end-saturation", normalization.open_end_saturation),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(ScoringError::InvalidNormalization { name, value });
            }
        }
        self.normalization = normalization;
        Ok(self)
    }

    pub fn weight(&self, objective: Objective) -> f64 {
        self.weights.get(&objective).copied().unwrap_or(0.0)
    }

    pub fn weights(&self) -> &BTreeMap<Objective, f64> {
        &self.weights
    }

    pub fn normalization(&self) -> &Normalization {
        &self.normalization
    }
}

impl Default for ObjectivePreset {
    fn default() -> Self {
        Self {
            weights: BTreeMap::from([
                (Objective::Density, 0.4),
                (Objective::StraightRuns, 0.2),
                (Objective::Loops, 0.3),
                (Objective::OpenEnds, 0.1),
            ]),
            normalization: Normalization::default(),
        }
    }
}

/// Anything the scorer can rank: a layout's metrics on a board of known area.
pub trait Scorable {
    fn metrics(&self) -> &LayoutMetrics;
    fn board_area(&self) -> f64;
}

/// Unweighted sub-scores, each in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct ScoreBreakdown {
    pub density: f64,
    pub straight_bias: f64,
    pub loop_bias: f64,
    pub openness: f64,
    pub total: f64,
}

pub fn breakdown(metrics: &LayoutMetrics, board_area: f64, preset: &ObjectivePreset) -> ScoreBreakdown {
    let norm = preset.normalization();
    let density = if board_area > 0.0 {
        (metrics.footprint_area / board_area).clamp(0.0, 1.0)
    } else {
        0.0
    };
    let straight_bias = if metrics.total_length > 0.0 {
        (metrics.straight_length / metrics.total_length).clamp(0.0, 1.0)
    } else {
        0.0
    };
    let loops = metrics.loop_count as f64;
    let loop_bias = loops / (loops + norm.loop_saturation);
    let open = metrics.open_ends as f64;
    let openness = open / (open + norm.open_end_saturation);

    let total = preset.weight(Objective::Density) * density
        + preset.weight(Objective::StraightRuns) * straight_bias
        + preset.weight(Objective::Loops) * loop_bias
        - preset.weight(Objective::OpenEnds) * openness;

    ScoreBreakdown {
        density,
        straight_bias,
        loop_bias,
        openness,
        total,
    }
}

pub fn score<S: Scorable + ?Sized>(candidate: &S, preset: &ObjectivePreset) -> f64 {
    breakdown(candidate.metrics(), candidate.board_area(), preset).total
}

/// Search-only bonus for a layout whose open ends are turning towards each other.
///
/// `closure` is a `[0, 1)` estimate of how nearly a loop closes. The bonus is
/// that fraction of what one more loop would add to the weighted loop
/// sub-score, so actually closing a loop always gains more. Candidate scores
/// never include it.
pub fn closure_bonus(metrics: &LayoutMetrics, closure: f64, preset: &ObjectivePreset) -> f64 {
    let weight = preset.weight(Objective::Loops);
    if weight <= 0.0 {
        return 0.0;
    }
    let saturation = preset.normalization().loop_saturation;
    let loops = metrics.loop_count as f64;
    let next_loop_gain = (loops + 1.0) / (loops + 1.0 + saturation) - loops / (loops + saturation);
    weight * next_loop_gain * closure.clamp(0.0, 1.0)
}

/// Ranking order: higher score, then fewer open ends, then longer track.
pub fn compare_ranked(a: (f64, &LayoutMetrics), b: (f64, &LayoutMetrics)) -> Ordering {
    b.0.total_cmp(&a.0)
        .then_with(|| a.1.open_ends.cmp(&b.1.open_ends))
        .then_with(|| b.1.total_length.total_cmp(&a.1.total_length))
}

/// Sorts candidates best first. Stable, so equal candidates keep their order.
pub fn rank<S: Scorable>(candidates: &mut [S], preset: &ObjectivePreset) {
    candidates.sort_by(|a, b| {
        compare_ranked(
            (score(a, preset), a.metrics()),
            (score(b, preset), b.metrics()),
        )
    });
}
