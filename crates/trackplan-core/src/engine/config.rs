use crate::core::geometry::Tolerances;
use nalgebra::Point2;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Clone)]
pub enum ConfigError {
    #[error("Missing required parameter: {0}")]
    MissingParameter(&'static str),
    #[error("Invalid value for parameter '{name}': {reason}")]
    InvalidParameter { name: &'static str, reason: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchConfig {
    /// Branches kept after each expansion round.
    pub beam_width: usize,
    /// Upper bound on pieces in any candidate.
    pub max_pieces: usize,
    /// Wall-clock limit; `None` searches until the beam is exhausted.
    pub time_budget: Option<Duration>,
    pub num_candidates: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SeedingConfig {
    /// Where the first piece is anchored; the board's interior point when unset.
    pub seed_position: Option<Point2<f64>>,
    pub rotation_step_deg: f64,
}

impl Default for SeedingConfig {
    fn default() -> Self {
        Self {
            seed_position: None,
            rotation_step_deg: 90.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GeneratorConfig {
    pub search: SearchConfig,
    pub seeding: SeedingConfig,
    pub tolerances: Tolerances,
    /// Seed of the random tie-break key.
    pub random_seed: u64,
}

#[derive(Default)]
pub struct GeneratorConfigBuilder {
    beam_width: Option<usize>,
    max_pieces: Option<usize>,
    time_budget: Option<Duration>,
    num_candidates: Option<usize>,
    seed_position: Option<Point2<f64>>,
    rotation_step_deg: Option<f64>,
    tolerances: Option<Tolerances>,
    random_seed: Option<u64>,
}

impl GeneratorConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn beam_width(mut self, width: usize) -> Self {
        self.beam_width = Some(width);
        self
    }
    pub fn max_pieces(mut self, n: usize) -> Self {
        self.max_pieces = Some(n);
        self
    }
    pub fn time_budget(mut self, budget: Option<Duration>) -> Self {
        self.time_budget = budget;
        self
    }
    pub fn num_candidates(mut self, n: usize) -> Self {
        self.num_candidates = Some(n);
        self
    }
    pub fn seed_position(mut self, position: Option<Point2<f64>>) -> Self {
        self.seed_position = position;
        self
    }
    pub fn rotation_step_deg(mut self, step: f64) -> Self {
        self.rotation_step_deg = Some(step);
        self
    }
    pub fn tolerances(mut self, tolerances: Tolerances) -> Self {
        self.tolerances = Some(tolerances);
        self
    }
    pub fn random_seed(mut self, seed: u64) -> Self {
        self.random_seed = Some(seed);
        self
    }

    pub fn build(self) -> Result<GeneratorConfig, ConfigError> {
        let search = SearchConfig {
            beam_width: positive(
                "beam_width",
                self.beam_width
                    .ok_or(ConfigError::MissingParameter("beam_width"))?,
            )?,
            max_pieces: positive(
                "max_pieces",
                self.max_pieces
                    .ok_or(ConfigError::MissingParameter("max_pieces"))?,
            )?,
            time_budget: self.time_budget,
            num_candidates: positive(
                "num_candidates",
                self.num_candidates
                    .ok_or(ConfigError::MissingParameter("num_candidates"))?,
            )?,
        };

        let rotation_step_deg = self.rotation_step_deg.unwrap_or(90.0);
        if !(rotation_step_deg.is_finite() && rotation_step_deg > 0.0 && rotation_step_deg <= 360.0) {
            return Err(ConfigError::InvalidParameter {
                name: "rotation_step_deg",
                reason: format!("{} is not in (0, 360]", rotation_step_deg),
            });
        }
        if let Some(p) = self.seed_position {
            if !(p.x.is_finite() && p.y.is_finite()) {
                return Err(ConfigError::InvalidParameter {
                    name: "seed_position",
                    reason: "coordinates must be finite".into(),
                });
            }
        }

        let tolerances = self.tolerances.unwrap_or_default();
        for (name, value) in [
            ("position_eps_mm", tolerances.position_eps_mm),
            ("angle_eps_deg", tolerances.angle_eps_deg),
            ("overlap_eps_mm", tolerances.overlap_eps_mm),
        ] {
            if !(value.is_finite() && value >= 0.0) {
                return Err(ConfigError::InvalidParameter {
                    name,
                    reason: format!("{} must be finite and non-negative", value),
                });
            }
        }

        Ok(GeneratorConfig {
            search,
            seeding: SeedingConfig {
                seed_position: self.seed_position,
                rotation_step_deg,
            },
            tolerances,
            random_seed: self.random_seed.unwrap_or(0),
        })
    }
}

fn positive(name: &'static str, value: usize) -> Result<usize, ConfigError> {
    if value == 0 {
        Err(ConfigError::InvalidParameter {
            name,
            reason: "must be at least 1".into(),
        })
    } else {
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn complete() -> GeneratorConfigBuilder {
        GeneratorConfigBuilder::new()
            .beam_width(8)
            .max_pieces(20)
            .num_candidates(3)
    }

    #[test]
    fn builder_applies_defaults() {
        let config = complete().build().unwrap();
        assert_eq!(config.search.beam_width, 8);
        assert_eq!(config.search.time_budget, None);
        assert_eq!(config.seeding.rotation_step_deg, 90.0);
        assert_eq!(config.tolerances, Tolerances::default());
        assert_eq!(config.random_seed, 0);
    }

    #[test]
    fn builder_reports_missing_parameters() {
        let err = GeneratorConfigBuilder::new().beam_width(4).max_pieces(3).build();
        assert_eq!(err.unwrap_err(), ConfigError::MissingParameter("num_candidates"));
        let err = GeneratorConfigBuilder::new().build();
        assert_eq!(err.unwrap_err(), ConfigError::MissingParameter("beam_width"));
    }

    #[test]
    fn builder_rejects_invalid_values() {
        assert!(matches!(
            complete().beam_width(0).build(),
            Err(ConfigError::InvalidParameter { name: "beam_width", .. })
        ));
        assert!(matches!(
            complete().rotation_step_deg(0.0).build(),
            Err(ConfigError::InvalidParameter { name: "rotation_step_deg", .. })
        ));
        let tolerances = Tolerances {
            position_eps_mm: -1.0,
            ..Tolerances::default()
        };
        assert!(matches!(
            complete().tolerances(tolerances).build(),
            Err(ConfigError::InvalidParameter { name: "position_eps_mm", .. })
        ));
    }
}
