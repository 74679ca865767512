use std::sync::Arc;
use std::time::Duration;

use portal_core::config::GateConfig;
use portal_core::errors::StoreError;
use portal_core::query::path_id_of;
use portal_core::state::{DecisionRecord, PendingWrites};
use portal_core::traits::{Clock, DeviceOracle, HttpTransport, KeyValueStore, Reachability};
use portal_core::types::{CheckRequest, CheckResult, DeviceClass, Reason};

use super::decision::DecisionEntry;
use super::refresh::{resolve_with_path_id, validate_saved_url};
use crate::env::{StaticDevice, SystemClock};
use crate::probe::http::ReqwestTransport;
use crate::probe::reachability::TcpReachability;
use crate::probe::resolve;
use crate::state::cache::DecisionCache;
use crate::state::identity::client_identity;
use crate::state::journal::Journal;
use crate::state::store::FileStore;

const DEFAULT_REACHABILITY_TIMEOUT: Duration = Duration::from_secs(2);

/// Result of one evaluation before it is committed.
struct Verdict {
    result: CheckResult,
    writes: PendingWrites,
    replayed: bool,
}

impl Verdict {
    fn native(reason: Reason) -> Self {
        Self {
            result: CheckResult::native(&reason),
            writes: PendingWrites::default().mark_app(),
            replayed: false,
        }
    }
}

/// Content-availability gate.
///
/// Decides once per cache key whether external content may be shown:
/// 1. Cached external: revalidate the saved URL, else re-resolve with the path id
/// 2. Cached app: replay the native decision
/// 3. Connectivity, target date, device class, then the server probe, in that order
///
/// Every cold evaluation records exactly one terminal flag. Calls sharing a
/// cache key are serialized.
pub struct AvailabilityGate {
    cache: DecisionCache,
    transport: Arc<dyn HttpTransport>,
    reachability: Arc<dyn Reachability>,
    clock: Arc<dyn Clock>,
    device: Arc<dyn DeviceOracle>,
    journal: Option<Arc<Journal>>,
    reachability_timeout: Duration,
}

impl AvailabilityGate {
    pub fn new(
        store: Arc<dyn KeyValueStore>,
        transport: Arc<dyn HttpTransport>,
        reachability: Arc<dyn Reachability>,
    ) -> Self {
        Self {
            cache: DecisionCache::new(store),
            transport,
            reachability,
            clock: Arc::new(SystemClock),
            device: Arc::new(StaticDevice::default()),
            journal: None,
            reachability_timeout: DEFAULT_REACHABILITY_TIMEOUT,
        }
    }

    /// Wire the production collaborators described by `config`.
    pub fn from_config(config: &GateConfig) -> Self {
        let transport = ReqwestTransport::new(config.max_redirects)
            .use_system_proxy(config.use_system_proxy);
        let gate = Self::new(
            Arc::new(FileStore::open(&config.store_path)),
            Arc::new(transport),
            Arc::new(TcpReachability::new(config.reachability_endpoints.clone())),
        )
        .with_device(Arc::new(StaticDevice(config.device_class)))
        .with_reachability_timeout(config.reachability_timeout());

        match &config.journal_path {
            Some(path) => gate.with_journal(Journal::open(path)),
            None => gate,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_device(mut self, device: Arc<dyn DeviceOracle>) -> Self {
        self.device = device;
        self
    }

    pub fn with_journal(mut self, journal: Journal) -> Self {
        self.journal = Some(Arc::new(journal));
        self
    }

    pub fn with_reachability_timeout(mut self, timeout: Duration) -> Self {
        self.reachability_timeout = timeout;
        self
    }

    pub fn cache(&self) -> &DecisionCache {
        &self.cache
    }

    /// Decide, persist, and return the outcome for `request`.
    ///
    /// Probe failures are folded into the result; only store failures propagate.
    pub async fn check_availability(
        &self,
        request: &CheckRequest,
    ) -> Result<CheckResult, StoreError> {
        let key = request.effective_key();
        let _guard = self.cache.lock(key).await?;

        let record = self.cache.load(key, &request.url)?;
        let verdict = if record.external_shown {
            self.replay_external(request, &record).await?
        } else if record.app_shown {
            Verdict {
                result: CheckResult::native(&Reason::CachedApp),
                writes: PendingWrites::default(),
                replayed: true,
            }
        } else {
            self.evaluate(request).await
        };

        self.cache.commit(key, &request.url, verdict.writes).await?;
        tracing::info!(
            cache_key = key,
            external = verdict.result.should_show_external_content,
            reason = %verdict.result.reason,
            replayed = verdict.replayed,
            "availability decided"
        );
        self.journal(request, &verdict.result, verdict.replayed).await;
        Ok(verdict.result)
    }

    async fn replay_external(
        &self,
        request: &CheckRequest,
        record: &DecisionRecord,
    ) -> Result<Verdict, StoreError> {
        let saved_url = record.saved_url.as_deref().unwrap_or(&request.url);
        // The saved URL's own pathid supersedes the stored one.
        let seeded =
            path_id_of(saved_url).filter(|id| record.saved_path_id.as_ref() != Some(id));
        let path_id = seeded.clone().or_else(|| record.saved_path_id.clone());
        let mut writes = PendingWrites::default().path_id(seeded);

        let client_id = client_identity(&**self.cache.store())?;
        let validation =
            validate_saved_url(&*self.transport, saved_url, &client_id, request.timeout).await;
        if validation.valid {
            return Ok(Verdict {
                result: CheckResult::external(validation.final_url, &Reason::ValidCachedExternal),
                writes,
                replayed: true,
            });
        }

        let result = match resolve_with_path_id(
            &*self.transport,
            &request.url,
            path_id.as_deref(),
            request.timeout,
        )
        .await
        {
            Ok(refreshed) => {
                writes = writes
                    .saved_url(refreshed.url.clone())
                    .path_id(refreshed.path_id);
                CheckResult::external(refreshed.url, &Reason::NewUrlWithPathId)
            }
            Err(e) => {
                tracing::warn!(url = %request.url, error = %e, "path id re-resolution failed");
                CheckResult::external("", &Reason::RefreshFailed)
            }
        };
        Ok(Verdict {
            result,
            writes,
            replayed: true,
        })
    }

    async fn evaluate(&self, request: &CheckRequest) -> Verdict {
        if !self.reachability.is_reachable(self.reachability_timeout).await {
            return Verdict::native(Reason::NoInternet);
        }
        tracing::debug!(url = %request.url, "connectivity check passed");

        if self.clock.now() < request.target_date {
            return Verdict::native(Reason::TargetDateNotReached);
        }
        tracing::debug!(target_date = %request.target_date, "date check passed");

        if request.device_check && self.device.device_class() == DeviceClass::Tablet {
            return Verdict::native(Reason::DeviceNotSupported);
        }

        match resolve(&*self.transport, &request.url, request.timeout).await {
            Ok(resolved) => {
                tracing::debug!(status = resolved.status, url = %resolved.url, "server check passed");
                let path_id = path_id_of(&resolved.url);
                Verdict {
                    result: CheckResult::external(resolved.url.clone(), &Reason::AllChecksPassed),
                    writes: PendingWrites::default()
                        .mark_external(resolved.url)
                        .path_id(path_id),
                    replayed: false,
                }
            }
            Err(e) => {
                tracing::warn!(url = %request.url, error = %e, "server check failed");
                Verdict::native(Reason::ServerCheckFailed(e.to_string()))
            }
        }
    }

    async fn journal(&self, request: &CheckRequest, result: &CheckResult, replayed: bool) {
        let Some(journal) = &self.journal else {
            return;
        };
        let entry = DecisionEntry::new(request, result, replayed);
        let value = match serde_json::to_value(&entry) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(error = %e, "journal entry not serializable");
                return;
            }
        };

        // Appends wait on the journal's advisory lock.
        let writer = Arc::clone(journal);
        let appended = tokio::task::spawn_blocking(move || writer.append(&value))
            .await
            .map_err(anyhow::Error::from)
            .and_then(|r| r);
        if let Err(e) = appended {
            let detail = format!("{e:#}");
            tracing::warn!(path = %journal.path().display(), error = %detail, "journal append failed");
        }
    }
}
