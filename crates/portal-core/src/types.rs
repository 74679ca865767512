use std::fmt;
use std::ops::RangeInclusive;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Status codes treated as an accepted probe response.
///
/// Deliberately wide: 4xx codes up to and including 403 count as acceptance.
pub const ACCEPTED_STATUS: RangeInclusive<u16> = 200..=403;

/// Default probe timeout for a single check.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

pub fn is_accepted_status(status: u16) -> bool {
    ACCEPTED_STATUS.contains(&status)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceClass {
    Phone,
    Tablet,
    Desktop,
    #[default]
    Unknown,
}

impl fmt::Display for DeviceClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceClass::Phone => write!(f, "phone"),
            DeviceClass::Tablet => write!(f, "tablet"),
            DeviceClass::Desktop => write!(f, "desktop"),
            DeviceClass::Unknown => write!(f, "unknown"),
        }
    }
}

/// Diagnostic tag attached to every check result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reason {
    ValidCachedExternal,
    NewUrlWithPathId,
    RefreshFailed,
    CachedApp,
    NoInternet,
    TargetDateNotReached,
    DeviceNotSupported,
    ServerCheckFailed(String),
    AllChecksPassed,
}

impl fmt::Display for Reason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reason::ValidCachedExternal => write!(f, "valid cached external content"),
            Reason::NewUrlWithPathId => write!(f, "new URL with path_id"),
            Reason::RefreshFailed => write!(f, "failed to get new URL, show empty fallback"),
            Reason::CachedApp => write!(f, "cached app content"),
            Reason::NoInternet => write!(f, "no internet connection"),
            Reason::TargetDateNotReached => write!(f, "target date not reached"),
            Reason::DeviceNotSupported => write!(f, "device not supported"),
            Reason::ServerCheckFailed(why) => write!(f, "server check failed: {why}"),
            Reason::AllChecksPassed => write!(f, "all checks passed"),
        }
    }
}

/// Outcome of one availability check, as handed back to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckResult {
    pub should_show_external_content: bool,
    /// Empty when native content is shown or external resolution failed.
    pub final_url: String,
    pub reason: String,
}

impl CheckResult {
    pub fn external(final_url: impl Into<String>, reason: &Reason) -> Self {
        Self {
            should_show_external_content: true,
            final_url: final_url.into(),
            reason: reason.to_string(),
        }
    }

    pub fn native(reason: &Reason) -> Self {
        Self {
            should_show_external_content: false,
            final_url: String::new(),
            reason: reason.to_string(),
        }
    }
}

/// A single availability question: may `url` be shown for this cache key?
#[derive(Debug, Clone)]
pub struct CheckRequest {
    pub url: String,
    pub target_date: DateTime<Utc>,
    pub device_check: bool,
    pub timeout: Duration,
    pub cache_key: Option<String>,
}

impl CheckRequest {
    pub fn new(url: impl Into<String>, target_date: DateTime<Utc>) -> Self {
        Self {
            url: url.into(),
            target_date,
            device_check: true,
            timeout: DEFAULT_TIMEOUT,
            cache_key: None,
        }
    }

    pub fn device_check(mut self, enabled: bool) -> Self {
        self.device_check = enabled;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn cache_key(mut self, key: impl Into<String>) -> Self {
        self.cache_key = Some(key.into());
        self
    }

    /// The key scoping this request's decision record; the URL when unset.
    pub fn effective_key(&self) -> &str {
        self.cache_key.as_deref().unwrap_or(&self.url)
    }
}
