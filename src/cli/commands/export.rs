use std::path::Path;

use crate::catalog::ExportDocument;
use crate::state::SharedState;

pub async fn cmd_export(state: &SharedState, out: &Path) -> anyhow::Result<()> {
    let doc = ExportDocument::new(state.catalog.fetch().await?);
    let count = doc.anime.len();
    let path = doc.write_to_dir(out, chrono::Local::now().date_naive())?;

    println!("✓ Data exported successfully! ({count} anime)");
    println!("  {}", path.display());
    Ok(())
}
