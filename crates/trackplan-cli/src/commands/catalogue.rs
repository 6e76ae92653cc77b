use crate::cli::CatalogueArgs;
use crate::config::CatalogueInput;
use crate::error::{CliError, Result};
use crate::utils::files;
use tracing::info;

pub fn run(args: CatalogueArgs) -> Result<()> {
    let catalogue = files::read_catalogue(&CatalogueInput {
        path: args.catalogue.clone(),
        pieces: Vec::new(),
    })?;

    if let Some(path) = &args.export {
        let content = catalogue.to_toml_string()?;
        std::fs::write(path, content).map_err(|e| CliError::writing(path, e))?;
        info!("Catalogue exported to {:?}", path);
        println!("Catalogue written to: {}", path.display());
        return Ok(());
    }

    println!("{:<8} {:<10} {:>10}  {}", "CODE", "KIND", "RUN (mm)", "NAME");
    for row in catalogue.rows() {
        println!(
            "{:<8} {:<10} {:>10.1}  {}",
            row.code,
            row.kind.as_str(),
            row.run_length,
            row.name
        );
    }
    println!(
        "{} piece type(s), track width {} mm.",
        catalogue.len(),
        catalogue.track_width()
    );
    Ok(())
}
