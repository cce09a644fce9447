//! Cross-chain transaction (CCTX) completion tracking against the ZetaChain
//! crosschain REST API.

use alloy_primitives::B256;
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

pub const DEFAULT_API_URL: &str = "https://zetachain-athens.blockpi.network/lcd/v1/public";
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(3);
/// Shorter caller timeouts are raised to this.
pub const MIN_TRACK_TIMEOUT: Duration = Duration::from_secs(10);

const OUTBOUND_MINED: &str = "OutboundMined";
const FAILURE_STATUSES: [&str; 2] = ["Aborted", "Reverted"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CctxStatus {
    Pending,
    Completed,
    Failed,
}

impl std::fmt::Display for CctxStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            CctxStatus::Pending => "pending",
            CctxStatus::Completed => "completed",
            CctxStatus::Failed => "failed",
        };
        f.pad(name)
    }
}

/// One CCTX as returned by the API. Only `cctx_status.status` is interpreted;
/// the rest is carried through untouched for display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CctxRecord(pub Value);

impl CctxRecord {
    pub fn status(&self) -> Option<&str> {
        self.0.get("cctx_status")?.get("status")?.as_str()
    }

    pub fn index(&self) -> Option<&str> {
        self.0.get("index")?.as_str()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrackDetails {
    pub cctxs: Vec<CctxRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrackResult {
    pub status: CctxStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<TrackDetails>,
}

impl TrackResult {
    fn new(status: CctxStatus, cctxs: Vec<CctxRecord>) -> Self {
        let details = (!cctxs.is_empty()).then_some(TrackDetails { cctxs });
        Self { status, details }
    }
}

/// Explicit per-client HTTP settings. Nothing here touches process state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackerSettings {
    pub api_url: String,
    pub request_timeout: Duration,
    pub poll_interval: Duration,
    pub proxy: Option<String>,
}

impl Default for TrackerSettings {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
            proxy: None,
        }
    }
}

#[async_trait]
pub trait CctxSource: Send + Sync {
    /// CCTXs spawned by an inbound transaction. Empty when none are indexed yet.
    async fn by_inbound_hash(&self, hash: &str) -> Result<Vec<CctxRecord>>;
    /// A CCTX looked up by its own index hash.
    async fn by_hash(&self, hash: &str) -> Result<Option<CctxRecord>>;
}

#[derive(Debug, Deserialize)]
struct InboundHashResponse {
    #[serde(rename = "CrossChainTxs", default)]
    cross_chain_txs: Value,
}

#[derive(Debug, Deserialize)]
struct CctxResponse {
    #[serde(rename = "CrossChainTx", default)]
    cross_chain_tx: Option<CctxRecord>,
}

#[derive(Debug, Clone)]
pub struct CctxClient {
    base_url: String,
    http: reqwest::Client,
}

impl CctxClient {
    pub fn new(settings: &TrackerSettings) -> Result<Self> {
        let mut builder = reqwest::Client::builder().timeout(settings.request_timeout);
        if let Some(proxy) = settings.proxy.as_deref() {
            let proxy =
                reqwest::Proxy::all(proxy).with_context(|| format!("invalid proxy {proxy}"))?;
            builder = builder.proxy(proxy);
        }
        let http = builder.build().context("failed to build http client")?;
        Ok(Self {
            base_url: settings.api_url.trim_end_matches('/').to_string(),
            http,
        })
    }

    /// GET a crosschain endpoint; 404 and 400 mean "not indexed yet".
    async fn get_json<T: for<'de> Deserialize<'de>>(&self, path: &str) -> Result<Option<T>> {
        let url = format!("{}/zeta-chain/crosschain/{path}", self.base_url);
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .with_context(|| format!("cctx request failed: {url}"))?;
        let status = response.status();
        if status == StatusCode::NOT_FOUND || status == StatusCode::BAD_REQUEST {
            return Ok(None);
        }
        if !status.is_success() {
            anyhow::bail!("cctx api error status {status} for {url}");
        }
        let body = response.json().await.context("cctx decode failed")?;
        Ok(Some(body))
    }
}

#[async_trait]
impl CctxSource for CctxClient {
    async fn by_inbound_hash(&self, hash: &str) -> Result<Vec<CctxRecord>> {
        let response: Option<InboundHashResponse> = self
            .get_json(&format!("inboundHashToCctxData/{hash}"))
            .await?;
        let Some(Value::Array(items)) = response.map(|r| r.cross_chain_txs) else {
            return Ok(Vec::new());
        };
        Ok(items.into_iter().map(CctxRecord).collect())
    }

    async fn by_hash(&self, hash: &str) -> Result<Option<CctxRecord>> {
        let response: Option<CctxResponse> = self.get_json(&format!("cctx/{hash}")).await?;
        Ok(response.and_then(|r| r.cross_chain_tx))
    }
}

/// Monotonic time source for the polling loop.
#[async_trait]
pub trait Clock: Send + Sync {
    fn elapsed(&self) -> Duration;
    async fn sleep(&self, duration: Duration);
}

#[derive(Debug, Clone)]
pub struct TokioClock {
    start: tokio::time::Instant,
}

impl Default for TokioClock {
    fn default() -> Self {
        Self {
            start: tokio::time::Instant::now(),
        }
    }
}

#[async_trait]
impl Clock for TokioClock {
    fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

pub struct Tracker<S, C = TokioClock> {
    source: S,
    clock: C,
    poll_interval: Duration,
}

impl Tracker<CctxClient> {
    pub fn from_settings(settings: &TrackerSettings) -> Result<Self> {
        Ok(Self::new(
            CctxClient::new(settings)?,
            TokioClock::default(),
            settings.poll_interval,
        ))
    }
}

impl<S: CctxSource, C: Clock> Tracker<S, C> {
    pub fn new(source: S, clock: C, poll_interval: Duration) -> Self {
        Self {
            source,
            clock,
            poll_interval,
        }
    }

    /// Poll until the CCTXs for `hash` settle or the deadline passes.
    ///
    /// Returns `pending` on deadline; that result is resumable by tracking the
    /// same hash again. Transport errors other than not-found propagate.
    pub async fn track(&self, hash: &str, timeout: Duration) -> Result<TrackResult> {
        let deadline = self.clock.elapsed() + timeout.max(MIN_TRACK_TIMEOUT);
        let mut last_seen: Vec<CctxRecord> = Vec::new();
        let mut polls = 0u32;

        while self.clock.elapsed() < deadline {
            polls += 1;
            let cctxs = self.source.by_inbound_hash(hash).await?;
            if cctxs.is_empty() {
                if let Some(direct) = self.source.by_hash(hash).await? {
                    last_seen = vec![direct];
                }
            } else {
                last_seen = cctxs;
            }

            if let Some(status) = settled_status(&last_seen) {
                tracing::info!(%hash, %status, polls, "cctx settled");
                return Ok(TrackResult::new(status, last_seen));
            }
            tracing::debug!(%hash, polls, records = last_seen.len(), "cctx still pending");
            self.clock.sleep(self.poll_interval).await;
        }

        tracing::warn!(%hash, polls, "cctx tracking deadline reached");
        Ok(TrackResult::new(CctxStatus::Pending, last_seen))
    }
}

/// Any failure wins; completion needs every reported status to be mined.
fn settled_status(records: &[CctxRecord]) -> Option<CctxStatus> {
    let statuses: Vec<&str> = records.iter().filter_map(CctxRecord::status).collect();
    if statuses
        .iter()
        .any(|status| FAILURE_STATUSES.contains(status))
    {
        return Some(CctxStatus::Failed);
    }
    if !statuses.is_empty() && statuses.iter().all(|status| *status == OUTBOUND_MINED) {
        return Some(CctxStatus::Completed);
    }
    None
}

/// Completion check used by the executor for bridge legs.
#[async_trait]
pub trait BridgeTracker: Send + Sync {
    async fn track_bridge(&self, hash: B256, timeout: Duration) -> Result<TrackResult>;
}

#[async_trait]
impl<S: CctxSource, C: Clock> BridgeTracker for Tracker<S, C> {
    async fn track_bridge(&self, hash: B256, timeout: Duration) -> Result<TrackResult> {
        self.track(&format!("{hash:#x}"), timeout).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const HASH: &str = "0xabc123";

    #[derive(Default)]
    struct ManualState {
        now: Mutex<Duration>,
        sleeps: AtomicUsize,
    }

    /// Sleeping advances the clock instantly.
    #[derive(Clone, Default)]
    struct ManualClock(Arc<ManualState>);

    impl ManualClock {
        fn sleeps(&self) -> usize {
            self.0.sleeps.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Clock for ManualClock {
        fn elapsed(&self) -> Duration {
            *self.0.now.lock().unwrap()
        }

        async fn sleep(&self, duration: Duration) {
            {
                let mut now = self.0.now.lock().unwrap();
                *now += duration;
            }
            self.0.sleeps.fetch_add(1, Ordering::SeqCst);
        }
    }

    /// Replays inbound-hash responses in order, repeating the last one.
    struct ScriptedSource {
        inbound: Mutex<VecDeque<Vec<CctxRecord>>>,
        calls: AtomicUsize,
    }

    impl ScriptedSource {
        fn new(responses: Vec<Vec<CctxRecord>>) -> Self {
            Self {
                inbound: Mutex::new(responses.into()),
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl CctxSource for ScriptedSource {
        async fn by_inbound_hash(&self, _hash: &str) -> Result<Vec<CctxRecord>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut inbound = self.inbound.lock().unwrap();
            if inbound.len() > 1 {
                Ok(inbound.pop_front().unwrap_or_default())
            } else {
                Ok(inbound.front().cloned().unwrap_or_default())
            }
        }

        async fn by_hash(&self, _hash: &str) -> Result<Option<CctxRecord>> {
            Ok(None)
        }
    }

    struct FailingSource;

    #[async_trait]
    impl CctxSource for FailingSource {
        async fn by_inbound_hash(&self, _hash: &str) -> Result<Vec<CctxRecord>> {
            anyhow::bail!("connection reset")
        }

        async fn by_hash(&self, _hash: &str) -> Result<Option<CctxRecord>> {
            Ok(None)
        }
    }

    fn record(status: &str) -> CctxRecord {
        CctxRecord(json!({
            "index": "0x01",
            "cctx_status": { "status": status, "status_message": "" }
        }))
    }

    fn settings(server: &MockServer) -> TrackerSettings {
        TrackerSettings {
            api_url: format!("{}/", server.uri()),
            ..TrackerSettings::default()
        }
    }

    #[tokio::test]
    async fn client_reads_inbound_hash_records() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(format!(
                "/zeta-chain/crosschain/inboundHashToCctxData/{HASH}"
            )))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "CrossChainTxs": [
                    { "index": "0x01", "cctx_status": { "status": "PendingOutbound" } }
                ]
            })))
            .mount(&server)
            .await;

        let client = CctxClient::new(&settings(&server)).unwrap();
        let records = client.by_inbound_hash(HASH).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].status(), Some("PendingOutbound"));
        assert_eq!(records[0].index(), Some("0x01"));
    }

    #[tokio::test]
    async fn client_treats_not_found_as_no_records() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(format!(
                "/zeta-chain/crosschain/inboundHashToCctxData/{HASH}"
            )))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(format!("/zeta-chain/crosschain/cctx/{HASH}")))
            .respond_with(ResponseTemplate::new(400))
            .mount(&server)
            .await;

        let client = CctxClient::new(&settings(&server)).unwrap();
        assert!(client.by_inbound_hash(HASH).await.unwrap().is_empty());
        assert!(client.by_hash(HASH).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn client_propagates_server_errors() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let client = CctxClient::new(&settings(&server)).unwrap();
        assert!(client.by_inbound_hash(HASH).await.is_err());
        assert!(client.by_hash(HASH).await.is_err());
    }

    #[tokio::test]
    async fn client_reads_direct_cctx() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(format!("/zeta-chain/crosschain/cctx/{HASH}")))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "CrossChainTx": { "index": HASH, "cctx_status": { "status": "OutboundMined" } }
            })))
            .mount(&server)
            .await;

        let client = CctxClient::new(&settings(&server)).unwrap();
        let direct = client.by_hash(HASH).await.unwrap().unwrap();
        assert_eq!(direct.status(), Some(OUTBOUND_MINED));
    }

    #[tokio::test]
    async fn completes_after_two_not_found_polls() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(format!(
                "/zeta-chain/crosschain/inboundHashToCctxData/{HASH}"
            )))
            .respond_with(ResponseTemplate::new(404))
            .up_to_n_times(2)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(format!(
                "/zeta-chain/crosschain/inboundHashToCctxData/{HASH}"
            )))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "CrossChainTxs": [
                    { "index": "0x01", "cctx_status": { "status": "OutboundMined" } }
                ]
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(format!("/zeta-chain/crosschain/cctx/{HASH}")))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let clock = ManualClock::default();
        let client = CctxClient::new(&settings(&server)).unwrap();
        let tracker = Tracker::new(client, clock.clone(), DEFAULT_POLL_INTERVAL);
        let result = tracker.track(HASH, Duration::from_secs(30)).await.unwrap();

        assert_eq!(result.status, CctxStatus::Completed);
        assert_eq!(clock.sleeps(), 2);
        assert_eq!(clock.elapsed(), Duration::from_secs(6));
        assert_eq!(result.details.unwrap().cctxs.len(), 1);
    }

    /// Inbound lookups never find the hash; the direct lookup reports `status`.
    async fn direct_only_server(status: &str) -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(format!(
                "/zeta-chain/crosschain/inboundHashToCctxData/{HASH}"
            )))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(format!("/zeta-chain/crosschain/cctx/{HASH}")))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "CrossChainTx": { "index": HASH, "cctx_status": { "status": status } }
            })))
            .expect(1)
            .mount(&server)
            .await;
        server
    }

    #[tokio::test]
    async fn direct_lookup_completes_when_inbound_index_misses() {
        let server = direct_only_server("OutboundMined").await;
        let clock = ManualClock::default();
        let client = CctxClient::new(&settings(&server)).unwrap();
        let tracker = Tracker::new(client, clock.clone(), DEFAULT_POLL_INTERVAL);
        let result = tracker.track(HASH, Duration::from_secs(30)).await.unwrap();

        assert_eq!(result.status, CctxStatus::Completed);
        assert_eq!(clock.sleeps(), 0);
        let cctxs = result.details.unwrap().cctxs;
        assert_eq!(cctxs.len(), 1);
        assert_eq!(cctxs[0].index(), Some(HASH));
    }

    #[tokio::test]
    async fn direct_lookup_reports_reverted_as_failed() {
        let server = direct_only_server("Reverted").await;
        let clock = ManualClock::default();
        let client = CctxClient::new(&settings(&server)).unwrap();
        let tracker = Tracker::new(client, clock.clone(), DEFAULT_POLL_INTERVAL);
        let result = tracker.track(HASH, Duration::from_secs(30)).await.unwrap();

        assert_eq!(result.status, CctxStatus::Failed);
        assert_eq!(clock.sleeps(), 0);
    }

    #[tokio::test]
    async fn any_failure_wins_over_mined_records() {
        let clock = ManualClock::default();
        let source = ScriptedSource::new(vec![vec![record("OutboundMined"), record("Reverted")]]);
        let tracker = Tracker::new(source, clock.clone(), DEFAULT_POLL_INTERVAL);
        let result = tracker.track(HASH, Duration::from_secs(60)).await.unwrap();

        assert_eq!(result.status, CctxStatus::Failed);
        assert_eq!(clock.sleeps(), 0);
        assert_eq!(result.details.unwrap().cctxs.len(), 2);
    }

    #[tokio::test]
    async fn aborted_is_a_failure() {
        let clock = ManualClock::default();
        let source = ScriptedSource::new(vec![
            vec![record("PendingOutbound")],
            vec![record("Aborted")],
        ]);
        let tracker = Tracker::new(source, clock.clone(), DEFAULT_POLL_INTERVAL);
        let result = tracker.track(HASH, Duration::from_secs(60)).await.unwrap();
        assert_eq!(result.status, CctxStatus::Failed);
        assert_eq!(clock.sleeps(), 1);
    }

    #[tokio::test]
    async fn mixed_statuses_stay_pending_until_deadline() {
        let clock = ManualClock::default();
        let source = ScriptedSource::new(vec![vec![
            record("OutboundMined"),
            record("PendingOutbound"),
        ]]);
        let tracker = Tracker::new(source, clock.clone(), DEFAULT_POLL_INTERVAL);
        // below the floor: still polls for ten seconds
        let result = tracker.track(HASH, Duration::from_secs(1)).await.unwrap();

        assert_eq!(result.status, CctxStatus::Pending);
        assert_eq!(tracker.source.calls.load(Ordering::SeqCst), 4);
        assert_eq!(clock.elapsed(), Duration::from_secs(12));
        assert_eq!(result.details.unwrap().cctxs.len(), 2);
    }

    #[tokio::test]
    async fn never_indexed_hash_is_pending_without_details() {
        let clock = ManualClock::default();
        let tracker = Tracker::new(ScriptedSource::new(vec![]), clock.clone(), DEFAULT_POLL_INTERVAL);
        let result = tracker.track(HASH, Duration::from_secs(10)).await.unwrap();
        assert_eq!(result.status, CctxStatus::Pending);
        assert!(result.details.is_none());
        assert_eq!(
            serde_json::to_value(&result).unwrap(),
            json!({ "status": "pending" })
        );
    }

    #[tokio::test]
    async fn records_without_status_do_not_complete() {
        let clock = ManualClock::default();
        let source = ScriptedSource::new(vec![vec![CctxRecord(json!({ "index": "0x1" }))]]);
        let tracker = Tracker::new(source, clock.clone(), DEFAULT_POLL_INTERVAL);
        let result = tracker.track(HASH, Duration::from_secs(10)).await.unwrap();
        assert_eq!(result.status, CctxStatus::Pending);
    }

    #[tokio::test]
    async fn source_errors_propagate() {
        let clock = ManualClock::default();
        let tracker = Tracker::new(FailingSource, clock.clone(), DEFAULT_POLL_INTERVAL);
        let err = tracker.track(HASH, Duration::from_secs(10)).await.unwrap_err();
        assert!(err.to_string().contains("connection reset"));
    }
}
