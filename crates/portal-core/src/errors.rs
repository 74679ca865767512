/// Why a probe did not produce an accepted response.
///
/// The `Display` text is the reason embedded in `server check failed: <reason>`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProbeError {
    #[error("invalid URL")]
    InvalidUrl(String),
    #[error("network error: {0}")]
    Network(String),
    #[error("server error: {0}")]
    RejectedStatus(u16),
    #[error("invalid response: {0}")]
    MalformedResponse(String),
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("store I/O failure: {0}")]
    Io(#[from] std::io::Error),
    #[error("store contents are not valid JSON: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("store is locked by another process: {0}")]
    Locked(String),
    #[error("store mutex poisoned")]
    Poisoned,
    #[error("store backend failure: {0}")]
    Backend(String),
}
