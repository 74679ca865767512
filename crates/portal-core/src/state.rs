use serde::{Deserialize, Serialize};

/// Persisted decision for one cache key.
///
/// `external_shown` and `app_shown` are never both true: once either is
/// recorded the gate replays it instead of re-deriving a decision.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecisionRecord {
    pub external_shown: bool,
    pub app_shown: bool,
    /// Last resolved external URL; only meaningful when `external_shown`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub saved_url: Option<String>,
    /// Last observed `pathid`, tracked per original URL rather than per cache key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub saved_path_id: Option<String>,
}

impl DecisionRecord {
    /// True once a terminal decision has been recorded.
    pub fn is_decided(&self) -> bool {
        self.external_shown || self.app_shown
    }
}

/// Writes produced by one gate call, flushed together before it returns.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PendingWrites {
    pub external_shown: Option<bool>,
    pub app_shown: Option<bool>,
    pub saved_url: Option<String>,
    pub saved_path_id: Option<String>,
}

impl PendingWrites {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn mark_app(mut self) -> Self {
        self.app_shown = Some(true);
        self
    }

    pub fn mark_external(mut self, url: impl Into<String>) -> Self {
        self.external_shown = Some(true);
        self.saved_url = Some(url.into());
        self
    }

    pub fn saved_url(mut self, url: impl Into<String>) -> Self {
        self.saved_url = Some(url.into());
        self
    }

    pub fn path_id(mut self, path_id: Option<String>) -> Self {
        if path_id.is_some() {
            self.saved_path_id = path_id;
        }
        self
    }
}
