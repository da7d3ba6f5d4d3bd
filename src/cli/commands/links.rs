use crate::domain::AnimeId;
use crate::domain::events::CatalogEvent;
use crate::form::{LinkPayload, LinksPayload};
use crate::services::ChildKind;
use crate::state::SharedState;

/// Parses `platform=url`. The platform may contain spaces, the url may
/// contain further `=` signs.
pub fn parse_link_arg(arg: &str) -> Result<(String, String), String> {
    match arg.split_once('=') {
        Some((platform, url)) if !platform.trim().is_empty() && !url.trim().is_empty() => {
            Ok((platform.trim().to_string(), url.trim().to_string()))
        }
        _ => Err(format!("Invalid link '{arg}'. Expected platform=url")),
    }
}

pub async fn cmd_add_links(
    state: &SharedState,
    anime_id: &str,
    episode_number: Option<u32>,
    links: &[String],
    language: &str,
    quality: Option<&str>,
) -> anyhow::Result<()> {
    let mut parsed = Vec::with_capacity(links.len());
    for arg in links {
        match parse_link_arg(arg) {
            Ok((platform, url)) => parsed.push(LinkPayload {
                platform,
                url,
                quality: quality.unwrap_or_default().to_string(),
                file_size: String::new(),
                subtitles: Vec::new(),
            }),
            Err(e) => {
                println!("{e}");
                return Ok(());
            }
        }
    }

    let anime_id = AnimeId::new(anime_id);
    let payload = LinksPayload {
        episode_number,
        language: Some(language.to_string()),
        links: parsed,
    };
    let mut form = payload.into_form(anime_id.clone());

    let summary = match form.submit(state.catalog.as_ref()).await {
        Ok(summary) => summary,
        Err(e) => {
            println!("Failed to add links: {e}");
            return Ok(());
        }
    };

    println!("✓ {}", summary.message);
    let failed = summary.report.failures().count();
    if failed > 0 {
        println!("⚠ {failed} link or subtitle insert(s) failed");
    }
    state.publish(CatalogEvent::LinksAdded {
        anime_id,
        inserted: summary.report.inserted_count(ChildKind::Link),
        failed,
    });

    Ok(())
}
