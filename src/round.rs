//! Fetching SPARK rounds from the round API.

use crate::config::RoundSelector;
use crate::error::{Error, Result, RoundError};
use crate::types::Round;
use std::time::Duration;

/// Build the URL of a round.
///
/// - current round: `{base}/rounds/current`
/// - round by number: `{base}/rounds/meridian/{contract}/{round}`
pub fn round_url(base_url: &str, selector: &RoundSelector) -> String {
    let base = base_url.trim_end_matches('/');
    match selector {
        RoundSelector::Current => format!("{base}/rounds/current"),
        RoundSelector::Meridian { contract, round } => {
            format!("{base}/rounds/meridian/{contract}/{round}")
        }
    }
}

/// Client for the SPARK round API
///
/// Issues a single GET per call. Retrying is left to the caller, see
/// [`retry::with_retry`](crate::retry::with_retry).
#[derive(Clone, Debug)]
pub struct RoundSource {
    client: reqwest::Client,
    base_url: String,
}

impl RoundSource {
    /// Create a round source for `base_url` whose requests time out after `timeout`.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(Error::HttpClient)?;

        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }

    /// Fetch and decode a round.
    pub async fn fetch_round(
        &self,
        selector: &RoundSelector,
    ) -> std::result::Result<Round, RoundError> {
        let url = round_url(&self.base_url, selector);
        tracing::info!(url = %url, "Fetching SPARK round");

        let response = self
            .client
            .get(&url)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|source| RoundError::Network {
                url: url.clone(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(RoundError::Status {
                url,
                status: status.as_u16(),
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|source| RoundError::Network {
                url: url.clone(),
                source,
            })?;

        let round: Round =
            serde_json::from_slice(&body).map_err(|source| RoundError::Decode { url, source })?;

        tracing::info!(
            round_id = %round.round_id,
            start_epoch = %round.start_epoch,
            max_tasks_per_node = round.max_tasks_per_node,
            tasks = round.retrieval_tasks.len(),
            "Fetched SPARK round"
        );

        Ok(round)
    }
}
