use crate::domain::AnimeId;
use crate::domain::events::CatalogEvent;
use crate::models::AnimePatch;
use crate::state::SharedState;

pub async fn cmd_update_anime(
    state: &SharedState,
    id: &str,
    patch: AnimePatch,
) -> anyhow::Result<()> {
    if patch.is_empty() {
        println!("Nothing to update. Pass at least one field, e.g. --title or --rating.");
        return Ok(());
    }

    let id = AnimeId::new(id);
    let all = state.catalog.fetch().await?;
    if !all.iter().any(|a| a.id == id) {
        println!("Anime with ID {id} not found.");
        return Ok(());
    }

    state.catalog.update(&id, patch).await?;
    state.publish(CatalogEvent::AnimeUpdated {
        anime_id: id.clone(),
    });

    if let Some(anime) = state
        .catalog
        .snapshot()
        .await
        .into_iter()
        .find(|a| a.id == id)
    {
        println!("✓ Updated: {} (ID: {})", anime.title, anime.id);
    }
    Ok(())
}
