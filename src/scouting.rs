//! Scouting API client.
//!
//! Profile and report reads are cached per player for the configured TTL
//! (one hour by default). The moderation queue is always fetched fresh. The
//! only write is the review of a pending candidate link, which reports
//! success as a plain `bool`.

use crate::cache::TtlCache;
use crate::cancel::CancelContext;
use crate::error::ScoutingError;
use crate::fetch::Fetch;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Configuration for the scouting client.
#[derive(Debug, Clone)]
pub struct ScoutingClientConfig {
    pub url: String,
    pub api_key: Option<String>,
    pub timeout_seconds: u64,
    pub cache_ttl_seconds: u64,
    pub cache_capacity: usize,
}

impl Default for ScoutingClientConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:8000".to_string(),
            api_key: None,
            timeout_seconds: 10,
            cache_ttl_seconds: 3600,
            cache_capacity: 1024,
        }
    }
}

/// Recruiting profile for a player.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoutingProfile {
    pub player_id: i64,
    pub name: String,
    #[serde(default)]
    pub team: Option<String>,
    #[serde(default)]
    pub position: Option<String>,
    #[serde(default)]
    pub stars: Option<u8>,
    #[serde(default)]
    pub rating: Option<f64>,
    #[serde(default)]
    pub national_rank: Option<u32>,
    #[serde(default)]
    pub hometown: Option<String>,
    #[serde(default)]
    pub high_school: Option<String>,
}

/// Written scouting report for a player.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoutingReport {
    pub player_id: i64,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub strengths: Vec<String>,
    #[serde(default)]
    pub weaknesses: Vec<String>,
    #[serde(default)]
    pub grade: Option<f64>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Moderation state of a candidate link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LinkStatus {
    Pending,
    Approved,
    Rejected,
}

impl fmt::Display for LinkStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LinkStatus::Pending => write!(f, "pending"),
            LinkStatus::Approved => write!(f, "approved"),
            LinkStatus::Rejected => write!(f, "rejected"),
        }
    }
}

/// Decision sent when reviewing a pending link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ReviewDecision {
    Approved,
    Rejected,
}

/// A proposed match between a stats player and a scouting profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingLink {
    pub id: i64,
    pub player_id: i64,
    pub player_name: String,
    pub candidate_name: String,
    #[serde(default)]
    pub candidate_team: Option<String>,
    #[serde(default)]
    pub confidence: Option<f64>,
    pub status: LinkStatus,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
struct ReviewRequest {
    status: ReviewDecision,
}

/// Shared client; clone it per request with [`ScoutingClient::for_request`].
#[derive(Clone)]
pub struct ScoutingClient {
    config: Arc<ScoutingClientConfig>,
    http_client: reqwest::Client,
    profiles: Arc<TtlCache<i64, ScoutingProfile>>,
    reports: Arc<TtlCache<i64, ScoutingReport>>,
    cancel: CancelContext,
}

impl ScoutingClient {
    pub fn new(config: ScoutingClientConfig) -> Result<Self, ScoutingError> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| ScoutingError::Unavailable(format!("failed to create HTTP client: {}", e)))?;

        let ttl = Duration::from_secs(config.cache_ttl_seconds);
        info!(
            "Scouting client for {} (cache TTL {}s)",
            config.url, config.cache_ttl_seconds
        );

        Ok(Self {
            profiles: Arc::new(TtlCache::new(ttl, config.cache_capacity)),
            reports: Arc::new(TtlCache::new(ttl, config.cache_capacity)),
            config: Arc::new(config),
            http_client,
            cancel: CancelContext::none(),
        })
    }

    /// Same client and caches, bound to a request's cancellation context.
    pub fn for_request(&self, cancel: CancelContext) -> Self {
        Self {
            cancel,
            ..self.clone()
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.config.url.trim_end_matches('/'), path)
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.config.api_key {
            Some(ref key) => request.bearer_auth(key),
            None => request,
        }
    }

    fn map_send_error(&self, e: reqwest::Error) -> ScoutingError {
        if e.is_timeout() {
            ScoutingError::Unavailable(format!(
                "request timed out after {}s",
                self.config.timeout_seconds
            ))
        } else if e.is_connect() {
            ScoutingError::Unavailable(format!("cannot connect to {}", self.config.url))
        } else {
            ScoutingError::Unavailable(format!("failed to send request: {}", e))
        }
    }

    /// GET a JSON resource; 404 maps to `Ok(None)`.
    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<Option<T>, ScoutingError> {
        let url = self.url(path);
        debug!("GET {}", url);

        let request = self.authorize(self.http_client.get(&url).query(query));
        let response = self
            .cancel
            .run(async { request.send().await.map_err(|e| self.map_send_error(e)) })
            .await?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(ScoutingError::Status { status, body });
        }

        response
            .json::<T>()
            .await
            .map(Some)
            .map_err(|e| ScoutingError::Decode(e.to_string()))
    }

    /// Recruiting profile, served from cache when fresh.
    pub async fn player_profile(
        &self,
        player_id: i64,
    ) -> Result<Option<ScoutingProfile>, ScoutingError> {
        if let Some(profile) = self.profiles.get(&player_id) {
            debug!("Profile {} served from cache", player_id);
            return Ok(Some(profile));
        }

        let profile: Option<ScoutingProfile> = self
            .get_json(&format!("players/{}/profile", player_id), &[])
            .await?;
        if let Some(ref profile) = profile {
            self.profiles.insert(player_id, profile.clone());
        }
        Ok(profile)
    }

    /// Scouting report, served from cache when fresh.
    pub async fn player_report(
        &self,
        player_id: i64,
    ) -> Result<Option<ScoutingReport>, ScoutingError> {
        if let Some(report) = self.reports.get(&player_id) {
            debug!("Report {} served from cache", player_id);
            return Ok(Some(report));
        }

        let report: Option<ScoutingReport> = self
            .get_json(&format!("players/{}/report", player_id), &[])
            .await?;
        if let Some(ref report) = report {
            self.reports.insert(player_id, report.clone());
        }
        Ok(report)
    }

    /// Drop cached profile and report for a player.
    pub fn invalidate(&self, player_id: i64) {
        self.profiles.invalidate(&player_id);
        self.reports.invalidate(&player_id);
    }

    /// Moderation queue entries with `status`. Never cached.
    pub async fn pending_links(&self, status: LinkStatus) -> Fetch<Vec<PendingLink>> {
        let result = self
            .get_json::<Vec<PendingLink>>("pending-links", &[("status", status.to_string())])
            .await;

        match result {
            Ok(links) => Fetch::from_list(links.unwrap_or_default()),
            Err(e) => {
                warn!("Pending links ({}) failed: {}", status, e);
                Fetch::Failed(e.to_string())
            }
        }
    }

    /// Approve or reject a pending link. `true` only on a 2xx response.
    pub async fn review_pending_link(&self, link_id: i64, decision: ReviewDecision) -> bool {
        let url = self.url(&format!("pending-links/{}/review", link_id));
        let request = self.authorize(
            self.http_client
                .post(&url)
                .json(&ReviewRequest { status: decision }),
        );

        let result = self
            .cancel
            .run(async { request.send().await.map_err(|e| self.map_send_error(e)) })
            .await;

        match result {
            Ok(response) if response.status().is_success() => {
                info!("Pending link {} reviewed: {:?}", link_id, decision);
                true
            }
            Ok(response) => {
                warn!(
                    "Review of pending link {} rejected with {}",
                    link_id,
                    response.status()
                );
                false
            }
            Err(e) => {
                warn!("Review of pending link {} failed: {}", link_id, e);
                false
            }
        }
    }
}
