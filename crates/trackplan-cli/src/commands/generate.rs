use crate::cli::GenerateArgs;
use crate::config::PartialConfig;
use crate::error::Result;
use crate::utils::files;
use crate::utils::progress::CliProgressHandler;
use tracing::{info, warn};
use trackplan::core::io::plan::Inventory;
use trackplan::engine::progress::ProgressReporter;
use trackplan::workflows;

pub fn run(args: GenerateArgs) -> Result<()> {
    let partial_config = PartialConfig::load(args.config.as_deref())?;
    info!("Merging configuration from file and CLI arguments...");
    let settings = partial_config.merge_generate(&args)?;

    let outline = files::read_board(&settings.board)?;
    let catalogue = files::read_catalogue(&settings.catalogue)?;

    let progress_handler = CliProgressHandler::new();
    let reporter = ProgressReporter::with_callback(progress_handler.get_callback());

    println!("Generating layouts...");
    info!("Invoking the core generation workflow...");
    let result = workflows::generate::run(
        &outline,
        &catalogue,
        &settings.preset,
        &settings.generator,
        &reporter,
    )?;

    let stats = &result.stats;
    info!(
        candidates = result.candidates.len(),
        rounds = stats.rounds,
        expanded = stats.expanded,
        duplicates = stats.duplicates,
        timed_out = stats.timed_out,
        "Workflow finished."
    );
    if stats.timed_out {
        println!("Time budget reached; keeping the layouts found so far.");
    }

    if result.is_empty() {
        warn!("Workflow completed but found no layout that fits the board.");
        println!("Warning: no layout could be placed on this board with the chosen pieces.");
        return Ok(());
    }

    std::fs::create_dir_all(&args.output)?;
    println!(
        "Search complete. Writing {} layout(s)...",
        result.candidates.len()
    );

    for (i, candidate) in result.candidates.iter().enumerate() {
        let index = i + 1;
        let output_path = files::layout_path(&args.output, index, "json");
        let metrics = candidate.graph().metrics();
        info!(
            index,
            score = candidate.score(),
            pieces = metrics.piece_count,
            loops = metrics.loop_count,
            open_ends = metrics.open_ends,
            "Writing layout to {:?}",
            &output_path
        );
        files::write_plan(&output_path, &candidate.export(None))?;

        if args.bom {
            let bom_path = files::layout_path(&args.output, index, "csv");
            let inventory = Inventory::from_records(&candidate.to_records(), &catalogue);
            files::write_bom(&bom_path, &inventory, &catalogue)?;
        }

        let summary = format!(
            "score {:.3}, {} pieces, {:.0} mm of track, {} loop(s), {} open end(s)",
            candidate.score(),
            metrics.piece_count,
            metrics.total_length,
            metrics.loop_count,
            metrics.open_ends
        );
        if i == 0 {
            println!("✓ Best layout ({}) written to: {}", summary, output_path.display());
        } else {
            println!("  Layout {} ({}) written to: {}", index, summary, output_path.display());
        }
    }

    Ok(())
}
