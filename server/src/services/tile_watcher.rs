//! Watches the tile tree for changed marker layers and global settings and turns them into push
//! events.

use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use blockmap_shared::{MARKERS_EVENT, MarkersChanged, SETTINGS_EVENT};
use bytes::Bytes;
use notify_debouncer_mini::notify::{RecommendedWatcher, RecursiveMode, Watcher};
use notify_debouncer_mini::{DebounceEventResult, Debouncer, new_debouncer};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::state::AppState;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum Change {
    Settings,
    Markers { world: String, key: String },
}

/// `settings.json` or `<world>/markers/<key>.json`; nothing else is watched.
pub fn classify(relative: &Path) -> Option<Change> {
    let parts: Vec<&str> = relative
        .components()
        .map(|c| c.as_os_str().to_str())
        .collect::<Option<_>>()?;
    match parts.as_slice() {
        ["settings.json"] => Some(Change::Settings),
        [world, "markers", file] => {
            let key = file.strip_suffix(".json")?;
            if key.is_empty() {
                return None;
            }
            Some(Change::Markers {
                world: (*world).to_string(),
                key: key.to_string(),
            })
        }
        _ => None,
    }
}

/// Changes named by one debounced batch of absolute event paths, sorted and deduplicated.
/// Paths outside `root` are ignored.
pub fn changes(root: &Path, paths: &[PathBuf]) -> Vec<Change> {
    let mut changes: Vec<Change> = paths
        .iter()
        .filter_map(|path| path.strip_prefix(root).ok())
        .filter_map(classify)
        .collect();
    changes.sort();
    changes.dedup();
    changes
}

fn source_path(root: &Path, change: &Change) -> PathBuf {
    match change {
        Change::Settings => root.join("settings.json"),
        Change::Markers { world, key } => root.join(world).join("markers").join(format!("{key}.json")),
    }
}

/// Serialized payload for one change. Settings are re-read and compacted. A deleted file yields
/// `None`, and so does a half-written settings file, which the next write event picks up.
pub fn payload(root: &Path, change: &Change) -> Option<(&'static str, Bytes)> {
    let path = source_path(root, change);
    match change {
        Change::Settings => {
            let raw = std::fs::read(&path).ok()?;
            let value: serde_json::Value = match serde_json::from_slice(&raw) {
                Ok(value) => value,
                Err(e) => {
                    warn!(error = %e, "settings.json is not valid JSON; skipping settings event");
                    return None;
                }
            };
            let data = serde_json::to_vec(&value).ok()?;
            Some((SETTINGS_EVENT, Bytes::from(data)))
        }
        Change::Markers { world, key } => {
            if !path.is_file() {
                return None;
            }
            let data = serde_json::to_vec(&MarkersChanged {
                world: world.clone(),
                key: key.clone(),
            })
            .ok()?;
            Some((MARKERS_EVENT, Bytes::from(data)))
        }
    }
}

/// Every event needed to bring a client that missed pushes back in sync: the settings plus one
/// `markers` event per layer file on disk.
pub fn resync(root: &Path) -> Vec<(&'static str, Bytes)> {
    let mut all = vec![Change::Settings];
    if let Ok(worlds) = std::fs::read_dir(root) {
        for world in worlds.flatten() {
            let Ok(files) = std::fs::read_dir(world.path().join("markers")) else {
                continue;
            };
            let world = PathBuf::from(world.file_name());
            all.extend(
                files
                    .flatten()
                    .filter_map(|file| classify(&world.join("markers").join(file.file_name()))),
            );
        }
    }
    all.sort();
    all.iter().filter_map(|change| payload(root, change)).collect()
}

/// Start a recursive debounced watcher on `root`. Each debounced batch arrives on the returned
/// channel as a list of absolute paths; the watcher stops when the `Debouncer` is dropped.
pub fn watch(
    root: &Path,
    debounce: Duration,
) -> io::Result<(
    Debouncer<RecommendedWatcher>,
    PathBuf,
    mpsc::UnboundedReceiver<Vec<PathBuf>>,
)> {
    let root = root.canonicalize()?;
    let (tx, rx) = mpsc::unbounded_channel();
    let mut debouncer = new_debouncer(debounce, move |res: DebounceEventResult| match res {
        Ok(events) => {
            let paths = events.into_iter().map(|event| event.path).collect();
            let _ = tx.send(paths);
        }
        Err(e) => warn!(error = ?e, "tile watcher error"),
    })
    .map_err(io::Error::other)?;
    debouncer
        .watcher()
        .watch(&root, RecursiveMode::Recursive)
        .map_err(io::Error::other)?;
    Ok((debouncer, root, rx))
}

pub async fn run(state: AppState, debounce: Duration) {
    let (_debouncer, root, mut batches) = match watch(&state.tiles_dir, debounce) {
        Ok(watching) => watching,
        Err(e) => {
            warn!(
                error = %e,
                dir = %state.tiles_dir.display(),
                "cannot watch tile tree; push events disabled"
            );
            return;
        }
    };
    info!(
        dir = %root.display(),
        debounce_ms = debounce.as_millis() as u64,
        "Watching tile tree"
    );

    while let Some(paths) = batches.recv().await {
        for change in changes(&root, &paths) {
            let Some((event, data)) = payload(&root, &change) else {
                continue;
            };
            let receivers = state.publish(event, data);
            debug!(?change, receivers, "published tile tree change");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    fn markers(world: &str, key: &str) -> Change {
        Change::Markers {
            world: world.into(),
            key: key.into(),
        }
    }

    fn tree(name: &str) -> PathBuf {
        let root = std::env::temp_dir().join(format!("blockmap-watch-{name}-{}", std::process::id()));
        let _ = fs::remove_dir_all(&root);
        fs::create_dir_all(root.join("world/markers")).unwrap();
        fs::create_dir_all(root.join("world/0/basic")).unwrap();
        fs::write(root.join("settings.json"), "{\n  \"players\": []\n}").unwrap();
        fs::write(root.join("world/markers/spawn.json"), "[]").unwrap();
        fs::write(root.join("world/markers/notes.txt"), "x").unwrap();
        fs::write(root.join("world/0/basic/0_0.png"), "x").unwrap();
        root.canonicalize().unwrap()
    }

    #[test]
    fn classifies_watched_paths() {
        assert_eq!(classify(Path::new("settings.json")), Some(Change::Settings));
        assert_eq!(
            classify(Path::new("world/markers/spawn.json")),
            Some(markers("world", "spawn"))
        );
        assert_eq!(classify(Path::new("world/settings.json")), None);
        assert_eq!(classify(Path::new("world/markers.json")), None);
        assert_eq!(classify(Path::new("world/markers/.json")), None);
        assert_eq!(classify(Path::new("world/0/basic/0_0.png")), None);
    }

    #[test]
    fn batch_is_classified_relative_to_root() {
        let root = Path::new("/srv/tiles");
        let paths = vec![
            root.join("world/markers/spawn.json"),
            root.join("world/markers/spawn.json"),
            root.join("world/0/basic/0_0.png"),
            root.join("settings.json"),
            PathBuf::from("/elsewhere/settings.json"),
            root.join("world_nether/markers/portals.json"),
        ];
        assert_eq!(
            changes(root, &paths),
            vec![
                Change::Settings,
                markers("world", "spawn"),
                markers("world_nether", "portals")
            ]
        );
    }

    #[test]
    fn serializes_payloads() {
        let root = tree("payload");

        let (event, data) = payload(&root, &Change::Settings).unwrap();
        assert_eq!(event, "settings");
        assert_eq!(data.as_ref(), br#"{"players":[]}"#);

        let (event, data) = payload(&root, &markers("world", "spawn")).unwrap();
        assert_eq!(event, "markers");
        assert_eq!(data.as_ref(), br#"{"world":"world","key":"spawn"}"#);

        assert!(payload(&root, &markers("world", "deleted")).is_none());
    }

    #[test]
    fn resync_lists_settings_and_every_layer() {
        let root = tree("resync");
        fs::create_dir_all(root.join("world_nether/markers")).unwrap();
        fs::write(root.join("world_nether/markers/portals.json"), "[]").unwrap();

        let events: Vec<(&str, String)> = resync(&root)
            .into_iter()
            .map(|(event, data)| (event, String::from_utf8(data.to_vec()).unwrap()))
            .collect();
        assert_eq!(
            events,
            vec![
                ("settings", r#"{"players":[]}"#.to_string()),
                ("markers", r#"{"world":"world","key":"spawn"}"#.to_string()),
                ("markers", r#"{"world":"world_nether","key":"portals"}"#.to_string()),
            ]
        );
    }

    #[test]
    fn missing_root_cannot_be_watched() {
        assert!(watch(Path::new("/definitely/not/a/tile/tree"), Duration::from_millis(50)).is_err());
    }

    #[tokio::test]
    async fn rewritten_layer_arrives_as_a_batch() {
        let root = tree("notify");
        let (_debouncer, watched, mut batches) = watch(&root, Duration::from_millis(50)).unwrap();
        assert_eq!(watched, root);

        fs::write(root.join("world/markers/spawn.json"), "[[\"circ\"]]").unwrap();

        let deadline = tokio::time::Instant::now() + Duration::from_secs(10);
        let mut seen = Vec::new();
        while !seen.contains(&markers("world", "spawn")) {
            let batch = tokio::time::timeout_at(deadline, batches.recv())
                .await
                .expect("no watcher event before deadline")
                .unwrap();
            seen.extend(changes(&watched, &batch));
        }
    }
}
