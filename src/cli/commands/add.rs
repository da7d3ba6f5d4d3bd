use std::path::Path;

use anyhow::Context;

use crate::domain::events::CatalogEvent;
use crate::form::AnimePayload;
use crate::services::ChildKind;
use crate::state::SharedState;

pub async fn cmd_add_anime(state: &SharedState, file: &Path) -> anyhow::Result<()> {
    let content = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read draft file: {}", file.display()))?;
    let payload: AnimePayload = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse draft file: {}", file.display()))?;

    let form = match payload.into_form() {
        Ok(form) => form,
        Err(e) => {
            println!("Invalid draft: {e}");
            return Ok(());
        }
    };
    if let Err(e) = form.validate() {
        println!("Invalid draft: {e}");
        return Ok(());
    }

    let report = form.submit(state.catalog.as_ref()).await?;

    println!("✓ {}", form.success_message());
    if let Some(anime) = &report.anime {
        println!("  ID: {}", anime.id);
        state.publish(CatalogEvent::AnimeAdded {
            anime_id: anime.id.clone(),
            title: anime.title.clone(),
            failed_children: report.failures().count(),
        });
    }
    println!(
        "  Inserted: {} episodes, {} links, {} subtitles",
        report.inserted_count(ChildKind::Episode),
        report.inserted_count(ChildKind::Link),
        report.inserted_count(ChildKind::Subtitle)
    );

    let failures: Vec<_> = report.failures().collect();
    if !failures.is_empty() {
        println!();
        println!("⚠ {} nested insert(s) failed:", failures.len());
        for outcome in failures {
            println!("  - {:?} at {:?}: {:?}", outcome.kind, outcome.path, outcome.status);
        }
    }

    Ok(())
}
