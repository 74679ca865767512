use portal_core::types::{CheckRequest, CheckResult};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    External,
    Native,
}

/// Journal record of one gate call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionEntry {
    pub event_type: String,
    pub cache_key: String,
    pub url: String,
    pub outcome: Outcome,
    pub reason: String,
    pub final_url: String,
    /// True when a cached decision was replayed rather than derived.
    pub replayed: bool,
}

impl DecisionEntry {
    pub fn new(request: &CheckRequest, result: &CheckResult, replayed: bool) -> Self {
        Self {
            event_type: "Decision".to_string(),
            cache_key: request.effective_key().to_string(),
            url: request.url.clone(),
            outcome: if result.should_show_external_content {
                Outcome::External
            } else {
                Outcome::Native
            },
            reason: result.reason.clone(),
            final_url: result.final_url.clone(),
            replayed,
        }
    }
}
