use std::path::PathBuf;
use std::sync::Arc;

use bytes::Bytes;
use tokio::sync::broadcast;

use crate::config::sse_broadcast_buffer;

/// A push event serialized once by the watcher and shared by every subscriber.
#[derive(Debug, Clone)]
pub struct PushEvent {
    pub event: &'static str,
    pub data: Arc<Bytes>,
}

#[derive(Clone)]
pub struct AppState {
    pub tiles_dir: PathBuf,
    pub web_root: PathBuf,
    pub event_tx: broadcast::Sender<PushEvent>,
}

impl AppState {
    pub fn new(tiles_dir: PathBuf, web_root: PathBuf) -> Self {
        let (event_tx, _) = broadcast::channel(sse_broadcast_buffer());
        Self {
            tiles_dir,
            web_root,
            event_tx,
        }
    }

    /// Fan an event out to the connected clients. No subscribers is not an error.
    pub fn publish(&self, event: &'static str, data: Bytes) -> usize {
        self.event_tx
            .send(PushEvent {
                event,
                data: Arc::new(data),
            })
            .unwrap_or(0)
    }
}
