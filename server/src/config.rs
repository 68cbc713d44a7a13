use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_TILES_DIR: &str = "web/tiles";
pub const DEFAULT_WEB_ROOT: &str = "client/dist";
pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_WATCH_DEBOUNCE_MS: u64 = 250;
pub const DEFAULT_BROADCAST_BUFFER: usize = 256;
pub const SSE_KEEPALIVE_SECS: u64 = 15;

fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Root of the on-disk tile tree served under `/tiles`.
pub fn tiles_dir() -> PathBuf {
    non_empty_var("BLOCKMAP_TILES_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_TILES_DIR))
}

/// Built client, served for every path no route claims.
pub fn web_root() -> PathBuf {
    non_empty_var("BLOCKMAP_WEB_ROOT")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_WEB_ROOT))
}

pub fn port() -> u16 {
    std::env::var("BLOCKMAP_PORT")
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .filter(|value| *value > 0)
        .unwrap_or(DEFAULT_PORT)
}

/// Quiet period the tile watcher waits for before reporting a batch of file events.
pub fn watch_debounce() -> Duration {
    std::env::var("BLOCKMAP_WATCH_DEBOUNCE_MS")
        .ok()
        .and_then(|value| value.parse::<u64>().ok())
        .filter(|value| *value > 0)
        .map(Duration::from_millis)
        .unwrap_or_else(|| Duration::from_millis(DEFAULT_WATCH_DEBOUNCE_MS))
}

pub fn sse_broadcast_buffer() -> usize {
    std::env::var("BLOCKMAP_SSE_BUFFER")
        .ok()
        .and_then(|value| value.parse::<usize>().ok())
        .filter(|value| *value > 0)
        .unwrap_or(DEFAULT_BROADCAST_BUFFER)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_when_unset() {
        temp_env::with_vars_unset(
            [
                "BLOCKMAP_TILES_DIR",
                "BLOCKMAP_WEB_ROOT",
                "BLOCKMAP_PORT",
                "BLOCKMAP_WATCH_DEBOUNCE_MS",
                "BLOCKMAP_SSE_BUFFER",
            ],
            || {
                assert_eq!(tiles_dir(), PathBuf::from(DEFAULT_TILES_DIR));
                assert_eq!(web_root(), PathBuf::from(DEFAULT_WEB_ROOT));
                assert_eq!(port(), DEFAULT_PORT);
                assert_eq!(
                    watch_debounce(),
                    Duration::from_millis(DEFAULT_WATCH_DEBOUNCE_MS)
                );
                assert_eq!(sse_broadcast_buffer(), DEFAULT_BROADCAST_BUFFER);
            },
        );
    }

    #[test]
    fn reads_overrides() {
        temp_env::with_vars(
            [
                ("BLOCKMAP_TILES_DIR", Some("/srv/map/tiles")),
                ("BLOCKMAP_PORT", Some("9000")),
                ("BLOCKMAP_WATCH_DEBOUNCE_MS", Some("400")),
                ("BLOCKMAP_SSE_BUFFER", Some("32")),
            ],
            || {
                assert_eq!(tiles_dir(), PathBuf::from("/srv/map/tiles"));
                assert_eq!(port(), 9000);
                assert_eq!(watch_debounce(), Duration::from_millis(400));
                assert_eq!(sse_broadcast_buffer(), 32);
            },
        );
    }

    #[test]
    fn rejects_zero_and_garbage() {
        temp_env::with_vars(
            [
                ("BLOCKMAP_TILES_DIR", Some("  ")),
                ("BLOCKMAP_PORT", Some("0")),
                ("BLOCKMAP_WATCH_DEBOUNCE_MS", Some("soon")),
                ("BLOCKMAP_SSE_BUFFER", Some("-4")),
            ],
            || {
                assert_eq!(tiles_dir(), PathBuf::from(DEFAULT_TILES_DIR));
                assert_eq!(port(), DEFAULT_PORT);
                assert_eq!(
                    watch_debounce(),
                    Duration::from_millis(DEFAULT_WATCH_DEBOUNCE_MS)
                );
                assert_eq!(sse_broadcast_buffer(), DEFAULT_BROADCAST_BUFFER);
            },
        );
    }
}
