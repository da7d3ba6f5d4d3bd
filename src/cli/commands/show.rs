use crate::domain::AnimeId;
use crate::models::{Anime, Episode};
use crate::state::SharedState;

pub async fn cmd_show_anime(state: &SharedState, id: &str) -> anyhow::Result<()> {
    let id = AnimeId::new(id);
    let all = state.catalog.fetch().await?;

    let Some(anime) = all.iter().find(|a| a.id == id) else {
        println!("Anime with ID {id} not found.");
        println!("Use 'anishelf list' to see IDs.");
        return Ok(());
    };

    print_details(anime);
    Ok(())
}

fn print_details(anime: &Anime) {
    println!("Anime Info");
    println!("{:-<60}", "");
    println!("Title:    {}", anime.title);
    println!("ID:       {}", anime.id);
    println!("Status:   {}", anime.status.label());
    println!("Year:     {}", anime.release_year);
    println!("Rating:   {:.1}", anime.rating);
    println!("Episodes: {}", anime.episode_count);
    if let Some(studio) = &anime.studio_name {
        println!("Studio:   {studio}");
    }
    if !anime.genres.is_empty() {
        println!("Genres:   {}", anime.genres.join(", "));
    }
    if !anime.synopsis.is_empty() {
        println!();
        println!("{}", anime.synopsis);
    }

    for episode in &anime.episodes {
        print_episode(episode);
    }
    println!();
}

fn print_episode(episode: &Episode) {
    println!();
    let title = episode.title.as_deref().unwrap_or("");
    println!(
        "S{:02}E{:02} {title} [{}]",
        episode.season, episode.episode_number, episode.language
    );
    if let Some(duration) = &episode.duration {
        println!("  Duration: {duration}");
    }

    if episode.links.is_empty() {
        println!("  No links");
        return;
    }
    for link in &episode.links {
        let quality = link.quality.as_deref().unwrap_or("-");
        let size = link.file_size.as_deref().unwrap_or("-");
        println!("  • {} ({quality}, {size}): {}", link.platform, link.url);
        for sub in &link.subtitles {
            let source = sub
                .url
                .as_deref()
                .or(sub.file_path.as_deref())
                .unwrap_or("?");
            println!("      {} subtitle: {source}", sub.language);
        }
    }
}
