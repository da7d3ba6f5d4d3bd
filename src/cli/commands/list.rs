//! List anime command handler

use crate::catalog::{AnimeFilter, ViewMode};
use crate::domain::AnimeStatus;
use crate::models::Anime;
use crate::state::SharedState;

fn status_indicator(status: AnimeStatus) -> &'static str {
    match status {
        AnimeStatus::Ongoing => "🟢",
        AnimeStatus::Completed => "✓",
        AnimeStatus::Upcoming => "📅",
    }
}

pub async fn cmd_list_anime(
    state: &SharedState,
    filter: &AnimeFilter,
    view: ViewMode,
) -> anyhow::Result<()> {
    let all = state.catalog.fetch().await?;

    if all.is_empty() {
        println!("No anime in the collection.");
        println!();
        println!("Add anime with: anishelf add draft.json");
        return Ok(());
    }

    let shown = filter.apply(&all);
    if shown.is_empty() {
        println!("No anime match the current filters ({} total).", all.len());
        return Ok(());
    }

    println!("Anime Collection ({} of {})", shown.len(), all.len());
    println!("{:-<70}", "");

    for anime in shown {
        match view {
            ViewMode::Grid => print_card(anime),
            ViewMode::List => print_row(anime),
        }
    }

    println!();
    println!("Legend: 🟢 Ongoing | ✓ Completed | 📅 Upcoming");

    Ok(())
}

fn print_card(anime: &Anime) {
    println!(
        "{} {} ({}) ★ {:.1}",
        status_indicator(anime.status),
        anime.title,
        anime.release_year,
        anime.rating
    );
    println!(
        "  ID: {} | Episodes: {} | Links: {}",
        anime.id,
        anime.episodes.len(),
        anime.total_links()
    );
    if !anime.genres.is_empty() {
        let shown: Vec<&str> = anime.genres.iter().take(3).map(String::as_str).collect();
        let more = anime.genres.len().saturating_sub(shown.len());
        if more > 0 {
            println!("  {} +{more}", shown.join(", "));
        } else {
            println!("  {}", shown.join(", "));
        }
    }
}

fn print_row(anime: &Anime) {
    println!(
        "{} {:<32} {:>4} {:>4.1} {:>3} eps  {}",
        status_indicator(anime.status),
        anime.title,
        anime.release_year,
        anime.rating,
        anime.episodes.len(),
        anime.id
    );
}
