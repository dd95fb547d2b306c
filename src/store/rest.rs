//! PostgREST store backend.
//!
//! Renders a [`Query`] as URL parameters and issues a single GET per query.

use super::{Row, Store};
use crate::error::StoreError;
use crate::query::Query;
use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

/// Connection settings for the REST store.
#[derive(Debug, Clone)]
pub struct RestStoreConfig {
    /// Base REST URL, e.g. `https://project.supabase.co/rest/v1`.
    pub url: String,
    /// Anonymous API key sent as `apikey` and bearer token.
    pub api_key: Option<String>,
    pub timeout_seconds: u64,
}

pub struct RestStore {
    config: RestStoreConfig,
    http_client: reqwest::Client,
}

impl RestStore {
    pub fn new(config: RestStoreConfig) -> Result<Self, StoreError> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| StoreError::Unavailable(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            config,
            http_client,
        })
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/{}", self.config.url.trim_end_matches('/'), table)
    }
}

#[async_trait]
impl Store for RestStore {
    async fn execute(&self, query: &Query) -> Result<Vec<Row>, StoreError> {
        let url = self.table_url(&query.table);
        let params = query.to_params();

        debug!("GET {} {:?}", url, params);

        let mut request = self.http_client.get(&url).query(&params);
        if let Some(ref key) = self.config.api_key {
            request = request
                .header("apikey", key)
                .header("Authorization", format!("Bearer {}", key));
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                StoreError::Unavailable(format!(
                    "request to {} timed out after {}s",
                    query.table, self.config.timeout_seconds
                ))
            } else if e.is_connect() {
                StoreError::Unavailable(format!("cannot connect to store at {}", self.config.url))
            } else {
                StoreError::Unavailable(format!("failed to send request: {}", e))
            }
        })?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(StoreError::Status { status, body });
        }

        response
            .json::<Vec<Row>>()
            .await
            .map_err(|e| StoreError::Decode(format!("{}: {}", query.table, e)))
    }

    fn backend_type(&self) -> &'static str {
        "rest"
    }
}
