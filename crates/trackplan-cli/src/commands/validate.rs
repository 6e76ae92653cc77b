use crate::cli::ValidateArgs;
use crate::config::PartialConfig;
use crate::error::{CliError, Result};
use crate::utils::files;
use tracing::info;
use trackplan::core::io::plan::Inventory;
use trackplan::workflows;

pub fn run(args: ValidateArgs) -> Result<()> {
    let partial_config = PartialConfig::load(args.config.as_deref())?;
    let settings = partial_config.merge_validate(&args)?;

    let plan = files::read_plan(&args.input)?;
    let outline = match (&settings.board, &plan.board) {
        (Some(board), _) => files::read_board(board)?,
        (None, Some(record)) => record.to_outline(),
        (None, None) => {
            return Err(CliError::Config(format!(
                "Plan {:?} has no board; pass --board or --rectangle.",
                args.input
            )));
        }
    };
    let catalogue = files::read_catalogue(&settings.catalogue)?;

    let inventory = Inventory::from_records(&plan.placements, &catalogue);
    println!(
        "{} piece(s), {} distinct, {:.0} mm of track.",
        inventory.total_pieces,
        inventory.unique_items(),
        inventory.total_run_length
    );
    if let Some(bom_path) = &args.bom {
        files::write_bom(bom_path, &inventory, &catalogue)?;
        println!("Bill of materials written to: {}", bom_path.display());
    }

    let report = workflows::validate::run(&outline, &catalogue, &plan.placements, settings.tolerances)?;
    let metrics = &report.metrics;
    info!(
        connections = report.connections.len(),
        loops = metrics.loop_count,
        open_ends = metrics.open_ends,
        "Validation finished."
    );
    println!(
        "{} connection(s), {} loop(s), {} open end(s), longest straight {:.0} mm.",
        report.connections.len(),
        metrics.loop_count,
        metrics.open_ends,
        metrics.longest_straight_run
    );

    if report.is_valid() {
        println!("✓ Layout is valid.");
        return Ok(());
    }

    for violation in &report.violations {
        println!("  ✗ {}", violation);
    }
    Err(CliError::Validation(format!(
        "{} violation(s) found in {}",
        report.violations.len(),
        args.input.display()
    )))
}
