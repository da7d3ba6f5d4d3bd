use crate::domain::AnimeId;
use crate::domain::events::CatalogEvent;
use crate::state::SharedState;

pub async fn cmd_remove_anime(state: &SharedState, id: &str, yes: bool) -> anyhow::Result<()> {
    let id = AnimeId::new(id);
    let all = state.catalog.fetch().await?;

    let Some(anime) = all.iter().find(|a| a.id == id) else {
        println!("Anime with ID {id} not found.");
        println!("Use 'anishelf list' to see IDs.");
        return Ok(());
    };

    if !yes {
        println!("Remove '{}' (ID: {})?", anime.title, anime.id);
        println!("Enter 'y' to confirm, anything else to cancel:");

        let mut input = String::new();
        std::io::stdin().read_line(&mut input)?;

        if !input.trim().eq_ignore_ascii_case("y") {
            println!("Cancelled.");
            return Ok(());
        }
    }

    state.catalog.delete(&id).await?;
    state.publish(CatalogEvent::AnimeDeleted {
        anime_id: id.clone(),
    });
    println!("✓ Removed: {}", anime.title);

    Ok(())
}
