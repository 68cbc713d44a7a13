use std::convert::Infallible;
use std::time::Duration;

use axum::extract::State;
use axum::response::Sse;
use axum::response::sse::{Event, KeepAlive};
use bytes::Bytes;
use futures::stream::Stream;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::BroadcastStream;
use tracing::warn;

use crate::config::SSE_KEEPALIVE_SECS;
use crate::services::tile_watcher;
use crate::state::AppState;

/// `GET /sse`: named `markers` / `settings` events from the tile watcher. Nothing is replayed to
/// a new subscriber; clients fetch current state themselves. A subscriber that lags behind the
/// broadcast buffer is sent the settings and every marker layer again.
pub async fn tile_events(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = state.event_tx.subscribe();
    let root = state.tiles_dir.clone();
    let stream = async_stream::stream! {
        let mut stream = BroadcastStream::new(rx);

        while let Some(result) = stream.next().await {
            match result {
                Ok(push) => {
                    let Some(payload) = event_payload(push.data.as_ref()) else {
                        warn!(event = push.event, "event payload is not valid utf-8; dropping SSE event");
                        continue;
                    };
                    yield Ok(Event::default().event(push.event).data(payload));
                }
                Err(tokio_stream::wrappers::errors::BroadcastStreamRecvError::Lagged(skipped)) => {
                    warn!(
                        skipped_events = skipped,
                        "SSE client lagged behind broadcast buffer; resyncing"
                    );
                    let root = root.clone();
                    let events = tokio::task::spawn_blocking(move || tile_watcher::resync(&root))
                        .await
                        .unwrap_or_default();
                    for (event, data) in events {
                        if let Some(payload) = event_payload(&data) {
                            yield Ok(Event::default().event(event).data(payload));
                        }
                    }
                }
            }
        }
    };

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(SSE_KEEPALIVE_SECS))
            .text("keep-alive"),
    )
}

fn event_payload(bytes: &Bytes) -> Option<&str> {
    std::str::from_utf8(bytes.as_ref()).ok()
}
