//! Match results service REST client

use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Serialize;
use uuid::Uuid;

use crate::config::Config;

/// Completed-match row, written exactly once per finished match
#[derive(Debug, Clone, Serialize)]
pub struct MatchResult {
    pub match_id: Uuid,
    pub player_1: Uuid,
    pub player_2: Uuid,
    pub player_1_score: u32,
    pub player_2_score: u32,
    pub winner: Uuid,
    pub completed_at: DateTime<Utc>,
}

/// Client for the results persistence service.
/// Uses the service key which bypasses row security - server only!
#[derive(Clone)]
pub struct ResultsClient {
    client: Client,
    base_url: String,
    service_key: String,
}

impl ResultsClient {
    pub fn new(config: &Config) -> Self {
        Self {
            client: Client::new(),
            base_url: config.results_url.clone(),
            service_key: config.results_service_key.clone(),
        }
    }

    fn rest_url(&self) -> String {
        format!("{}/rest/v1/match_results", self.base_url)
    }

    /// Insert one completed-match row
    pub async fn record(&self, result: &MatchResult) -> Result<(), ResultsError> {
        let response = self
            .client
            .post(self.rest_url())
            .header("apikey", &self.service_key)
            .header("Authorization", format!("Bearer {}", self.service_key))
            .header("Content-Type", "application/json")
            .header("Prefer", "return=minimal")
            .json(result)
            .send()
            .await
            .map_err(ResultsError::Request)?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(ResultsError::Api { status, body });
        }

        Ok(())
    }
}

/// Results service errors
#[derive(Debug, thiserror::Error)]
pub enum ResultsError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("API error (status {status}): {body}")]
    Api { status: u16, body: String },
}
