use crate::catalog::CatalogStats;
use crate::state::SharedState;

pub async fn cmd_stats(state: &SharedState) -> anyhow::Result<()> {
    let all = state.catalog.fetch().await?;
    let stats = CatalogStats::compute(&all);

    println!("Collection Statistics ({} backend)", state.catalog.kind());
    println!("{:-<40}", "");
    println!("Total anime:    {}", stats.total_anime);
    println!("Total links:    {}", stats.total_links);
    println!("Completed:      {}", stats.completed_anime);
    println!("Ongoing:        {}", stats.ongoing_anime);
    println!("Average rating: {}", stats.average_rating);
    if stats.top_genres.is_empty() {
        println!("Top genres:     -");
    } else {
        println!("Top genres:     {}", stats.top_genres.join(", "));
    }

    Ok(())
}
