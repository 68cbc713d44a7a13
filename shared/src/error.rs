use thiserror::Error;

/// Failure turning a binary sidecar (block-info buffer, palette) into data.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("buffer too short: {len} bytes, header needs {needed}")]
    Truncated { len: usize, needed: usize },
    #[error("gzip stream: {0}")]
    Gzip(#[from] std::io::Error),
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("palette id {0:?} is not a number")]
    PaletteId(String),
}

/// Why one marker of a layer payload was dropped.
#[derive(Debug, Error)]
pub enum MarkerError {
    #[error("marker is not an array")]
    NotAnArray,
    #[error("marker has no kind")]
    MissingKind,
    #[error("unknown marker kind {0:?}")]
    UnknownKind(String),
    #[error("malformed {kind} data: {source}")]
    Data {
        kind: &'static str,
        #[source]
        source: serde_json::Error,
    },
    #[error("malformed marker options: {0}")]
    Options(#[source] serde_json::Error),
    #[error("marker array has {0} elements, expected 2 or 3")]
    Arity(usize),
}
