use axum::{
    Router,
    extract::{Query, State},
    response::sse::{Event, KeepAlive, Sse},
    routing::get,
};
use futures::stream::{self, Stream};
use serde::Deserialize;
use std::{convert::Infallible, sync::Arc, time::Duration};
use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::api::AppState;
use crate::domain::events::CatalogEvent;

const KEEP_ALIVE: Duration = Duration::from_secs(15);

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/events", get(sse_handler))
}

/// `?only=anime_added,links_added` narrows the stream to those event names.
#[derive(Debug, Default, Deserialize)]
pub struct EventQuery {
    #[serde(default)]
    pub only: Option<String>,
}

impl EventQuery {
    fn names(&self) -> Vec<String> {
        self.only
            .as_deref()
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(str::to_string)
            .collect()
    }
}

fn wanted(names: &[String], event: &CatalogEvent) -> bool {
    names.is_empty() || names.iter().any(|n| n == event.name())
}

fn to_sse(event: &CatalogEvent) -> Event {
    let data = serde_json::to_string(event).unwrap_or_default();
    Event::default().event(event.name()).data(data)
}

/// Streams catalog events as they are published, each named after its
/// variant with the JSON form as data.
async fn sse_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<EventQuery>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let names = query.names();
    debug!(filter = ?names, "Event subscriber connected");
    let rx = state.event_bus().subscribe();

    let stream = stream::unfold((rx, names), |(mut rx, names)| async move {
        loop {
            match rx.recv().await {
                Ok(event) if wanted(&names, &event) => {
                    return Some((Ok(to_sse(&event)), (rx, names)));
                }
                Ok(_) => {}
                Err(broadcast::error::RecvError::Lagged(count)) => {
                    warn!(missed = count, "Event subscriber lagged");
                    let notice = Event::default()
                        .event("lagged")
                        .data(count.to_string());
                    return Some((Ok(notice), (rx, names)));
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    });

    Sse::new(stream).keep_alive(KeepAlive::new().interval(KEEP_ALIVE))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::AnimeId;

    #[test]
    fn only_filter_selects_named_events() {
        let query = EventQuery {
            only: Some(" anime_added, ,links_added".to_string()),
        };
        let names = query.names();
        assert_eq!(names, vec!["anime_added", "links_added"]);

        let deleted = CatalogEvent::AnimeDeleted {
            anime_id: AnimeId::new("a1"),
        };
        assert!(!wanted(&names, &deleted));
        assert!(wanted(&[], &deleted));
        assert!(wanted(
            &names,
            &CatalogEvent::LinksAdded {
                anime_id: AnimeId::new("a1"),
                inserted: 1,
                failed: 0,
            }
        ));
    }
}
