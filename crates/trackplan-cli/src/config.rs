use crate::cli::{BoardSource, GenerateArgs, ValidateArgs};
use crate::error::{CliError, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use tracing::debug;
use trackplan::core::geometry::{Point2, Tolerances};
use trackplan::core::models::board::BoardOutline;
use trackplan::core::scoring::{Normalization, Objective, ObjectivePreset};
use trackplan::engine::config::{GeneratorConfig, GeneratorConfigBuilder};

mod defaults {
    pub const PRESET: &str = "balanced";
    pub const BEAM_WIDTH: usize = 16;
    pub const MAX_PIECES: usize = 24;
    pub const NUM_CANDIDATES: usize = 3;
    pub const SEED: u64 = 0;
    pub const ROTATION_STEP_DEG: f64 = 90.0;
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct PartialSearchConfig {
    beam_width: Option<usize>,
    max_pieces: Option<usize>,
    num_candidates: Option<usize>,
    /// Seconds.
    time_budget: Option<f64>,
    seed: Option<u64>,
    seed_position: Option<[f64; 2]>,
    rotation_step_deg: Option<f64>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct PartialObjectiveConfig {
    preset: Option<String>,
    weights: Option<BTreeMap<String, f64>>,
    loop_saturation: Option<f64>,
    open_end_saturation: Option<f64>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct PartialTolerancesConfig {
    position_eps_mm: Option<f64>,
    angle_eps_deg: Option<f64>,
    overlap_eps_mm: Option<f64>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct PartialBoardConfig {
    path: Option<PathBuf>,
    description: Option<String>,
    width: Option<f64>,
    height: Option<f64>,
    polygon: Option<Vec<[f64; 2]>>,
    holes: Option<Vec<Vec<[f64; 2]>>>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct PartialCatalogueConfig {
    path: Option<PathBuf>,
    pieces: Option<Vec<String>>,
}

/// Everything a configuration file may set. Every field is optional; missing
/// values fall back to command-line flags and then to built-in defaults.
#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct PartialConfig {
    search: Option<PartialSearchConfig>,
    objective: Option<PartialObjectiveConfig>,
    tolerances: Option<PartialTolerancesConfig>,
    board: Option<PartialBoardConfig>,
    catalogue: Option<PartialCatalogueConfig>,
}

/// How the board should be obtained once all sources are merged.
#[derive(Debug, Clone, PartialEq)]
pub enum BoardInput {
    File(PathBuf),
    Outline(BoardOutline),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CatalogueInput {
    pub path: Option<PathBuf>,
    pub pieces: Vec<String>,
}

#[derive(Debug)]
pub struct GenerateSettings {
    pub generator: GeneratorConfig,
    pub preset: ObjectivePreset,
    pub board: BoardInput,
    pub catalogue: CatalogueInput,
}

#[derive(Debug)]
pub struct ValidateSettings {
    pub tolerances: Tolerances,
    pub board: Option<BoardInput>,
    pub catalogue: CatalogueInput,
}

impl PartialConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        debug!("Loading configuration from file: {:?}", path);
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| CliError::parsing(path, e))
    }

    /// Reads `path` when given, otherwise starts from an empty configuration.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        path.map_or_else(|| Ok(Self::default()), Self::from_file)
    }

    pub fn merge_generate(mut self, args: &GenerateArgs) -> Result<GenerateSettings> {
        self.apply_set_values(&args.set_values)?;

        let search = self.search.take().unwrap_or_default();
        let objective = self.objective.take().unwrap_or_default();
        let tolerances = Self::merge_tolerances(self.tolerances.take())?;
        let board = Self::merge_board(self.board.take(), &args.board)?.ok_or_else(|| {
            CliError::Config(
                "A board is required: pass --board or --rectangle, or set [board] in the config file."
                    .to_string(),
            )
        })?;
        let catalogue = Self::merge_catalogue(self.catalogue.take(), args.catalogue.as_ref(), &args.pieces);

        let time_budget = args
            .time_budget
            .or(search.time_budget)
            .map(|secs| {
                Duration::try_from_secs_f64(secs).map_err(|_| {
                    CliError::Config(format!("Invalid time budget: {} seconds", secs))
                })
            })
            .transpose()?;

        let generator = GeneratorConfigBuilder::new()
            .beam_width(
                args.beam_width
                    .or(search.beam_width)
                    .unwrap_or(defaults::BEAM_WIDTH),
            )
            .max_pieces(
                args.max_pieces
                    .or(search.max_pieces)
                    .unwrap_or(defaults::MAX_PIECES),
            )
            .num_candidates(
                args.num_candidates
                    .or(search.num_candidates)
                    .unwrap_or(defaults::NUM_CANDIDATES),
            )
            .time_budget(time_budget)
            .random_seed(args.seed.or(search.seed).unwrap_or(defaults::SEED))
            .seed_position(search.seed_position.map(|[x, y]| Point2::new(x, y)))
            .rotation_step_deg(
                search
                    .rotation_step_deg
                    .unwrap_or(defaults::ROTATION_STEP_DEG),
            )
            .tolerances(tolerances)
            .build()
            .map_err(|e| CliError::Config(e.to_string()))?;

        let preset = Self::merge_objective(objective, args.preset.as_deref(), &args.weights)?;

        Ok(GenerateSettings {
            generator,
            preset,
            board,
            catalogue,
        })
    }

    pub fn merge_validate(mut self, args: &ValidateArgs) -> Result<ValidateSettings> {
        self.apply_set_values(&args.set_values)?;
        Ok(ValidateSettings {
            tolerances: Self::merge_tolerances(self.tolerances.take())?,
            board: Self::merge_board(self.board.take(), &args.board)?,
            catalogue: Self::merge_catalogue(self.catalogue.take(), args.catalogue.as_ref(), &[]),
        })
    }

    fn merge_tolerances(partial: Option<PartialTolerancesConfig>) -> Result<Tolerances> {
        let partial = partial.unwrap_or_default();
        let base = Tolerances::default();
        let tolerances = Tolerances {
            position_eps_mm: partial.position_eps_mm.unwrap_or(base.position_eps_mm),
            angle_eps_deg: partial.angle_eps_deg.unwrap_or(base.angle_eps_deg),
            overlap_eps_mm: partial.overlap_eps_mm.unwrap_or(base.overlap_eps_mm),
        };
        for (name, value) in [
            ("tolerances.position-eps-mm", tolerances.position_eps_mm),
            ("tolerances.angle-eps-deg", tolerances.angle_eps_deg),
            ("tolerances.overlap-eps-mm", tolerances.overlap_eps_mm),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(CliError::Config(format!(
                    "`{}` must be a non-negative number, got {}",
                    name, value
                )));
            }
        }
        Ok(tolerances)
    }

    /// Command-line sources win over the file; within the file an explicit
    /// path wins over a polygon, which wins over width and height.
    fn merge_board(partial: Option<PartialBoardConfig>, cli: &BoardSource) -> Result<Option<BoardInput>> {
        if let Some(path) = &cli.board {
            return Ok(Some(BoardInput::File(path.clone())));
        }
        if let Some(rect) = &cli.rectangle {
            let (w, h) = parse_rectangle(rect)?;
            return Ok(Some(BoardInput::Outline(BoardOutline::rectangle(w, h))));
        }
        let Some(partial) = partial else {
            return Ok(None);
        };
        if let Some(path) = partial.path {
            return Ok(Some(BoardInput::File(path)));
        }
        let mut outline = match (partial.polygon, partial.width, partial.height) {
            (Some(polygon), _, _) => BoardOutline::new(polygon),
            (None, Some(w), Some(h)) => BoardOutline::rectangle(w, h),
            (None, None, None) => return Ok(None),
            _ => {
                return Err(CliError::Config(
                    "`board.width` and `board.height` must be given together.".to_string(),
                ));
            }
        };
        if let Some(description) = partial.description {
            outline.description = description;
        }
        outline.holes = partial.holes.unwrap_or_default();
        Ok(Some(BoardInput::Outline(outline)))
    }

    fn merge_catalogue(
        partial: Option<PartialCatalogueConfig>,
        cli_path: Option<&PathBuf>,
        cli_pieces: &[String],
    ) -> CatalogueInput {
        let partial = partial.unwrap_or_default();
        let pieces = if cli_pieces.is_empty() {
            partial.pieces.unwrap_or_default()
        } else {
            cli_pieces.to_vec()
        };
        CatalogueInput {
            path: cli_path.cloned().or(partial.path),
            pieces,
        }
    }

    fn merge_objective(
        partial: PartialObjectiveConfig,
        cli_preset: Option<&str>,
        cli_weights: &[String],
    ) -> Result<ObjectivePreset> {
        let to_config = |e: trackplan::core::scoring::ScoringError| CliError::Config(e.to_string());

        let name = cli_preset
            .or(partial.preset.as_deref())
            .unwrap_or(defaults::PRESET);
        let mut preset = ObjectivePreset::named(name).map_err(to_config)?;

        for (objective, weight) in partial.weights.unwrap_or_default() {
            let objective = Objective::from_str(&objective).map_err(to_config)?;
            preset = preset.with_weight(objective, weight).map_err(to_config)?;
        }
        for pair in cli_weights {
            let (key, value) = split_key_value(pair, "--weight")?;
            let objective = Objective::from_str(key).map_err(to_config)?;
            preset = preset
                .with_weight(objective, parse_value(key, value)?)
                .map_err(to_config)?;
        }

        let base = *preset.normalization();
        let normalization = Normalization {
            loop_saturation: partial.loop_saturation.unwrap_or(base.loop_saturation),
            open_end_saturation: partial
                .open_end_saturation
                .unwrap_or(base.open_end_saturation),
        };
        preset.with_normalization(normalization).map_err(to_config)
    }

    fn apply_set_values(&mut self, set_values: &[String]) -> Result<()> {
        for kv_pair in set_values {
            let (key, value) = split_key_value(kv_pair, "--set")?;

            if let Some(objective) = key.strip_prefix("objective.weights.") {
                self.objective
                    .get_or_insert_with(Default::default)
                    .weights
                    .get_or_insert_with(Default::default)
                    .insert(objective.to_string(), parse_value(key, value)?);
                continue;
            }

            match key {
                "search.beam-width" => {
                    self.search.get_or_insert_with(Default::default).beam_width =
                        Some(parse_value(key, value)?);
                }
                "search.max-pieces" => {
                    self.search.get_or_insert_with(Default::default).max_pieces =
                        Some(parse_value(key, value)?);
                }
                "search.num-candidates" => {
                    self.search.get_or_insert_with(Default::default).num_candidates =
                        Some(parse_value(key, value)?);
                }
                "search.time-budget" => {
                    self.search.get_or_insert_with(Default::default).time_budget =
                        Some(parse_value(key, value)?);
                }
                "search.seed" => {
                    self.search.get_or_insert_with(Default::default).seed =
                        Some(parse_value(key, value)?);
                }
                "search.rotation-step-deg" => {
                    self.search
                        .get_or_insert_with(Default::default)
                        .rotation_step_deg = Some(parse_value(key, value)?);
                }
                "objective.preset" => {
                    self.objective.get_or_insert_with(Default::default).preset =
                        Some(value.to_string());
                }
                "objective.loop-saturation" => {
                    self.objective
                        .get_or_insert_with(Default::default)
                        .loop_saturation = Some(parse_value(key, value)?);
                }
                "objective.open-end-saturation" => {
                    self.objective
                        .get_or_insert_with(Default::default)
                        .open_end_saturation = Some(parse_value(key, value)?);
                }
                "tolerances.position-eps-mm" => {
                    self.tolerances
                        .get_or_insert_with(Default::default)
                        .position_eps_mm = Some(parse_value(key, value)?);
                }
                "tolerances.angle-eps-deg" => {
                    self.tolerances
                        .get_or_insert_with(Default::default)
                        .angle_eps_deg = Some(parse_value(key, value)?);
                }
                "tolerances.overlap-eps-mm" => {
                    self.tolerances
                        .get_or_insert_with(Default::default)
                        .overlap_eps_mm = Some(parse_value(key, value)?);
                }
                "board.width" => {
                    self.board.get_or_insert_with(Default::default).width =
                        Some(parse_value(key, value)?);
                }
                "board.height" => {
                    self.board.get_or_insert_with(Default::default).height =
                        Some(parse_value(key, value)?);
                }
                _ => {
                    return Err(CliError::Config(format!(
                        "Unsupported configuration key for --set: '{}'",
                        key
                    )));
                }
            }
        }
        Ok(())
    }
}

fn split_key_value<'a>(pair: &'a str, flag: &str) -> Result<(&'a str, &'a str)> {
    pair.split_once('=')
        .map(|(k, v)| (k.trim(), v.trim()))
        .ok_or_else(|| {
            CliError::Config(format!(
                "Invalid {} format: '{}'. Expected KEY=VALUE.",
                flag, pair
            ))
        })
}

fn parse_value<T: FromStr>(key: &str, value: &str) -> Result<T> {
    value.parse().map_err(|_| {
        CliError::Config(format!("Invalid value for {}: {}", key, value))
    })
}

/// Parses `WIDTHxHEIGHT`, e.g. `1800x1200`.
pub fn parse_rectangle(text: &str) -> Result<(f64, f64)> {
    let invalid = || CliError::Argument(format!("Invalid rectangle '{}'. Expected WIDTHxHEIGHT in mm.", text));
    let (w, h) = text
        .split_once(['x', 'X', '*'])
        .ok_or_else(invalid)?;
    let w: f64 = w.trim().parse().map_err(|_| invalid())?;
    let h: f64 = h.trim().parse().map_err(|_| invalid())?;
    Ok((w, h))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{Cli, Commands};
    use clap::Parser;
    use std::fs;
    use tempfile::tempdir;

    fn generate_args(extra: &[&str]) -> GenerateArgs {
        let mut args = vec!["trackplan", "generate", "-o", "out"];
        args.extend_from_slice(extra);
        match Cli::parse_from(args).command {
            Commands::Generate(args) => args,
            _ => panic!("Expected 'generate' subcommand"),
        }
    }

    fn validate_args(extra: &[&str]) -> ValidateArgs {
        let mut args = vec!["trackplan", "validate", "plan.json"];
        args.extend_from_slice(extra);
        match Cli::parse_from(args).command {
            Commands::Validate(args) => args,
            _ => panic!("Expected 'validate' subcommand"),
        }
    }

    fn parse(content: &str) -> PartialConfig {
        let dir = tempdir().unwrap();
        let path = dir.path().join("trackplan.toml");
        fs::write(&path, content).unwrap();
        PartialConfig::from_file(&path).unwrap()
    }

    #[test]
    fn defaults_apply_when_nothing_is_configured() {
        let settings = PartialConfig::default()
            .merge_generate(&generate_args(&["--rectangle", "1800x1200"]))
            .unwrap();
        assert_eq!(settings.generator.search.beam_width, defaults::BEAM_WIDTH);
        assert_eq!(settings.generator.search.max_pieces, defaults::MAX_PIECES);
        assert_eq!(settings.generator.search.num_candidates, defaults::NUM_CANDIDATES);
        assert_eq!(settings.generator.search.time_budget, None);
        assert_eq!(settings.preset, ObjectivePreset::default());
        assert_eq!(
            settings.board,
            BoardInput::Outline(BoardOutline::rectangle(1800.0, 1200.0))
        );
        assert_eq!(settings.catalogue, CatalogueInput::default());
    }

    #[test]
    fn file_values_are_used_and_cli_flags_override_them() {
        let config = parse(
            r#"
            [search]
            beam-width = 8
            max-pieces = 30
            time-budget = 2.5

            [objective]
            preset = "loops"

            [board]
            width = 2400
            height = 900

            [catalogue]
            pieces = ["R600", "R606"]
            "#,
        );
        let settings = config
            .merge_generate(&generate_args(&["--beam-width", "4", "--pieces", "R600,R8072"]))
            .unwrap();
        assert_eq!(settings.generator.search.beam_width, 4);
        assert_eq!(settings.generator.search.max_pieces, 30);
        assert_eq!(
            settings.generator.search.time_budget,
            Some(Duration::from_millis(2500))
        );
        assert_eq!(settings.preset, ObjectivePreset::named("loops").unwrap());
        assert_eq!(
            settings.board,
            BoardInput::Outline(BoardOutline::rectangle(2400.0, 900.0))
        );
        assert_eq!(settings.catalogue.pieces, vec!["R600", "R8072"]);
    }

    #[test]
    fn set_values_override_file_values() {
        let config = parse(
            r#"
            [search]
            num-candidates = 5

            [board]
            polygon = [[0, 0], [1000, 0], [1000, 800], [0, 800]]
            "#,
        );
        let settings = config
            .merge_generate(&generate_args(&[
                "-S",
                "search.num-candidates=9",
                "-S",
                "objective.weights.loops=0.75",
                "-S",
                "tolerances.position-eps-mm=2",
            ]))
            .unwrap();
        assert_eq!(settings.generator.search.num_candidates, 9);
        assert_eq!(settings.preset.weight(Objective::Loops), 0.75);
        assert_eq!(settings.generator.tolerances.position_eps_mm, 2.0);
    }

    #[test]
    fn weight_flags_adjust_the_named_preset() {
        let settings = PartialConfig::default()
            .merge_generate(&generate_args(&[
                "--rectangle",
                "1000x1000",
                "--preset",
                "density",
                "-w",
                "straight-runs=0.5",
            ]))
            .unwrap();
        assert_eq!(settings.preset.weight(Objective::Density), 1.0);
        assert_eq!(settings.preset.weight(Objective::StraightRuns), 0.5);
    }

    #[test]
    fn missing_board_is_a_configuration_error() {
        let result = PartialConfig::default().merge_generate(&generate_args(&[]));
        assert!(matches!(result, Err(CliError::Config(msg)) if msg.contains("board")));
    }

    #[test]
    fn unknown_keys_and_bad_values_are_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        fs::write(&path, "[search]\nbeam = 3\n").unwrap();
        assert!(matches!(
            PartialConfig::from_file(&path),
            Err(CliError::FileParsing { .. })
        ));

        let unsupported = PartialConfig::default()
            .merge_generate(&generate_args(&["--rectangle", "1x1", "-S", "search.speed=3"]));
        assert!(matches!(unsupported, Err(CliError::Config(_))));

        let bad_number = PartialConfig::default()
            .merge_generate(&generate_args(&["--rectangle", "1x1", "-S", "search.seed=abc"]));
        assert!(matches!(bad_number, Err(CliError::Config(_))));

        let bad_preset = PartialConfig::default()
            .merge_generate(&generate_args(&["--rectangle", "1x1", "--preset", "scenic"]));
        assert!(matches!(bad_preset, Err(CliError::Config(_))));
    }

    #[test]
    fn zero_beam_width_fails_the_builder() {
        let result = PartialConfig::default()
            .merge_generate(&generate_args(&["--rectangle", "1x1", "--beam-width", "0"]));
        assert!(matches!(result, Err(CliError::Config(_))));
    }

    #[test]
    fn validate_board_is_optional_and_tolerances_merge() {
        let settings = PartialConfig::default()
            .merge_validate(&validate_args(&["-S", "tolerances.angle-eps-deg=2.5"]))
            .unwrap();
        assert_eq!(settings.board, None);
        assert_eq!(settings.tolerances.angle_eps_deg, 2.5);
        assert_eq!(
            settings.tolerances.position_eps_mm,
            Tolerances::default().position_eps_mm
        );
    }

    #[test]
    fn rectangles_parse_with_either_separator() {
        assert_eq!(parse_rectangle("1800x1200").unwrap(), (1800.0, 1200.0));
        assert_eq!(parse_rectangle("600 * 400").unwrap(), (600.0, 400.0));
        assert!(parse_rectangle("1800").is_err());
    }
}
