/// Result alias that carries the custom [`OverlayError`] type.
pub type Result<T> = std::result::Result<T, OverlayError>;

/// Common error type for the core crate.
///
/// Nothing in the overlay is fatal: callers log these and keep running in a
/// degraded state (inert overlay, silent radio).
#[derive(Debug, thiserror::Error)]
pub enum OverlayError {
    /// Free-form message for conditions without a dedicated variant.
    #[error("{0}")]
    Message(String),
    /// Wrapper around standard IO errors.
    #[error("{0}")]
    Io(#[from] std::io::Error),
    /// Configuration or command payload could not be (de)serialized.
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
    /// A location could not be parsed or resolved.
    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),
    /// HTTP client could not be built.
    #[error("http: {0}")]
    Http(#[from] reqwest::Error),
    /// Discovery finished without a single existing asset.
    #[error("no media found for ids {start}..={end} under `{path}`")]
    EmptyCatalog { path: String, start: i64, end: i64 },
    /// The navigation watcher went away while a subscriber was waiting.
    #[error("navigation watcher closed")]
    NavigationClosed,
}

impl OverlayError {
    /// Creates a new error that simply wraps the provided message.
    pub fn msg<T: Into<String>>(msg: T) -> Self {
        Self::Message(msg.into())
    }
}
