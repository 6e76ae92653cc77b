use crate::config::{BoardInput, CatalogueInput};
use crate::error::{CliError, Result};
use serde::Serialize;
use serde_json::Value;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};
use trackplan::core::catalogue::Catalogue;
use trackplan::core::io::plan::{BoardRecord, Inventory, PlanDocument, normalise_payload};
use trackplan::core::models::board::BoardOutline;

/// Loads the custom catalogue (or the built-in range) and applies the piece filter.
pub fn read_catalogue(input: &CatalogueInput) -> Result<Arc<Catalogue>> {
    let catalogue = match &input.path {
        Some(path) => {
            debug!("Loading catalogue from {:?}", path);
            let content = std::fs::read_to_string(path)?;
            Catalogue::from_toml_str(&content, &path.display().to_string())?
        }
        None => Catalogue::hornby()?,
    };
    let catalogue = if input.pieces.is_empty() {
        catalogue
    } else {
        catalogue.subset(&input.pieces)?
    };
    info!(pieces = catalogue.len(), "Catalogue ready.");
    Ok(Arc::new(catalogue))
}

/// Reads a board from a file holding either a bare board record or a saved plan.
pub fn read_board(input: &BoardInput) -> Result<BoardOutline> {
    let path = match input {
        BoardInput::Outline(outline) => return Ok(outline.clone()),
        BoardInput::File(path) => path,
    };
    debug!("Loading board from {:?}", path);
    let value: Value = serde_json::from_reader(File::open(path)?).map_err(|e| CliError::parsing(path, e))?;

    let record = if value.get("placements").is_some() {
        normalise_payload(&value)
            .map_err(|e| CliError::parsing(path, e))?
            .board
            .ok_or_else(|| CliError::Config(format!("Plan {:?} has no board section.", path)))?
    } else {
        serde_json::from_value::<BoardRecord>(value).map_err(|e| CliError::parsing(path, e))?
    };
    Ok(record.to_outline())
}

pub fn read_plan(path: &Path) -> Result<PlanDocument> {
    debug!("Loading plan from {:?}", path);
    PlanDocument::read_lenient(File::open(path)?).map_err(|e| CliError::parsing(path, e))
}

pub fn write_plan(path: &Path, document: &PlanDocument) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    document
        .write_to(&mut writer)
        .map_err(|e| CliError::writing(path, e))?;
    writer.flush()?;
    Ok(())
}

/// `<dir>/layout-<index>.<extension>`, 1-based.
pub fn layout_path(dir: &Path, index: usize, extension: &str) -> PathBuf {
    dir.join(format!("layout-{}.{}", index, extension))
}

#[derive(Serialize)]
struct BomRow<'a> {
    code: &'a str,
    name: &'a str,
    kind: &'a str,
    count: usize,
    run_length_mm: f64,
}

/// Writes one row per piece code plus a closing total row.
pub fn write_bom(path: &Path, inventory: &Inventory, catalogue: &Catalogue) -> Result<()> {
    let mut writer = csv::Writer::from_path(path).map_err(|e| CliError::writing(path, e))?;
    for (code, &count) in &inventory.counts {
        let piece = catalogue.by_code(code);
        writer
            .serialize(BomRow {
                code,
                name: piece.map_or("(unknown)", |p| p.name.as_str()),
                kind: piece.map_or("", |p| p.kind.as_str()),
                count,
                run_length_mm: piece.map_or(0.0, |p| p.run_length * count as f64),
            })
            .map_err(|e| CliError::writing(path, e))?;
    }
    writer
        .serialize(BomRow {
            code: "TOTAL",
            name: "",
            kind: "",
            count: inventory.total_pieces,
            run_length_mm: inventory.total_run_length,
        })
        .map_err(|e| CliError::writing(path, e))?;
    writer.flush()?;
    Ok(())
}
