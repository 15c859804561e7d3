//! Client for a hosted credit-default scoring model
//!
//! The model endpoint takes `{"data": {<feature>: <value>, ...}}` and answers
//! `{"result": {"score": <probability>}}`; some deployments wrap the result
//! in a one-element array.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, instrument};

use crate::client::{truncate, MAX_ERROR_BODY};
use crate::config::ScoringConfig;
use crate::error::ApiError;
use crate::Result;

/// Features the model was trained on, in its column naming
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoringFeatures {
    #[serde(rename = "PAY_0")]
    pub pay_0: i64,
    #[serde(rename = "PAY_2")]
    pub pay_2: i64,
    #[serde(rename = "PAY_3")]
    pub pay_3: i64,
    #[serde(rename = "PAY_4")]
    pub pay_4: i64,
    #[serde(rename = "LIMIT_BAL")]
    pub limit_bal: i64,
    #[serde(rename = "BILL_AMT1")]
    pub bill_amt1: i64,
}

#[derive(Debug, Serialize)]
struct ScoringRequest<'a> {
    data: &'a ScoringFeatures,
}

#[derive(Debug, Deserialize)]
struct ScoreResult {
    score: f64,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ResultPayload {
    Single(ScoreResult),
    Batch(Vec<ScoreResult>),
}

#[derive(Debug, Deserialize)]
struct ScoringResponse {
    result: ResultPayload,
}

/// Scoring endpoint client
#[derive(Debug, Clone)]
pub struct ScoringClient {
    config: ScoringConfig,
    http_client: reqwest::Client,
}

impl ScoringClient {
    pub fn new(config: ScoringConfig) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .user_agent(concat!("govlens/", env!("CARGO_PKG_VERSION")))
            .timeout(config.timeout)
            .build()?;

        Ok(ScoringClient {
            config,
            http_client,
        })
    }

    /// Create client from `SCORING_URL` / `SCORING_KEY`
    pub fn from_env() -> Result<Self> {
        Self::new(ScoringConfig::from_env()?)
    }

    /// Score one application; returns the model's repayment probability.
    #[instrument(level = "debug", skip(self))]
    pub async fn score(&self, features: &ScoringFeatures) -> Result<f64> {
        let endpoint = self.config.endpoint().path().to_string();
        let key = self.config.api_key();

        let response = self
            .http_client
            .post(self.config.endpoint().clone())
            .basic_auth(key, Some(key))
            .json(&ScoringRequest { data: features })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::Status {
                endpoint,
                status: status.as_u16(),
                body: truncate(&body, MAX_ERROR_BODY),
            });
        }

        let bytes = response.bytes().await?;
        let score = parse_score(&bytes).map_err(|source| ApiError::Decode {
            endpoint: endpoint.clone(),
            source,
        })?;
        debug!(endpoint = %endpoint, score = score, "scored application");
        Ok(score)
    }
}

fn parse_score(bytes: &[u8]) -> std::result::Result<f64, serde_json::Error> {
    let body: Value = serde_json::from_slice(bytes)?;
    let response: ScoringResponse = serde_json::from_value(body)?;
    match response.result {
        ResultPayload::Single(result) => Ok(result.score),
        ResultPayload::Batch(results) => results.first().map(|r| r.score).ok_or_else(|| {
            <serde_json::Error as serde::de::Error>::custom("empty result array")
        }),
    }
}
