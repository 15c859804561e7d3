//! HTTP client for the governance, project and model-registry endpoints
//!
//! One GET per call, no retry. Anything but HTTP 200 is an
//! [`ApiError::Status`]; an unreadable body is an [`ApiError::Decode`].

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, instrument, warn};

use crate::config::{ApiConfig, AuthScheme, API_KEY_HEADER};
use crate::error::ApiError;
use crate::schema::{Bundle, Goal, Policy, Project, RegisteredModel};
use crate::source::GovernanceSource;
use crate::Result;

/// Longest error body kept in an [`ApiError::Status`]
pub(crate) const MAX_ERROR_BODY: usize = 512;

/// Where the payload sits in a response body
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyField {
    /// `{"data": ...}`
    Data,
    /// `{"items": ...}`
    Items,
    /// The body itself
    Raw,
}

impl BodyField {
    /// Pull the payload out of a decoded body.
    pub fn extract(self, body: Value) -> std::result::Result<Value, serde_json::Error> {
        let key = match self {
            BodyField::Raw => return Ok(body),
            BodyField::Data => "data",
            BodyField::Items => "items",
        };
        match body {
            Value::Object(mut map) => map.remove(key).ok_or_else(|| {
                <serde_json::Error as serde::de::Error>::custom(format!("missing field `{key}`"))
            }),
            _ => Err(<serde_json::Error as serde::de::Error>::custom(format!(
                "expected an object with field `{key}`"
            ))),
        }
    }
}

/// Governance API client
#[derive(Debug, Clone)]
pub struct GovernanceClient {
    config: ApiConfig,
    http_client: reqwest::Client,
}

impl GovernanceClient {
    /// Create a new client
    pub fn new(config: ApiConfig) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .user_agent(concat!("govlens/", env!("CARGO_PKG_VERSION")))
            .timeout(config.timeout)
            .build()?;

        Ok(GovernanceClient {
            config,
            http_client,
        })
    }

    /// Create client from environment variables
    pub fn from_env() -> Result<Self> {
        Self::new(ApiConfig::from_env()?)
    }

    /// Active configuration
    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        let key = self.config.api_key();
        match self.config.auth {
            AuthScheme::ApiKeyHeader => request.header(API_KEY_HEADER, key),
            AuthScheme::Basic => request.basic_auth(key, Some(key)),
        }
    }

    /// GET `segments` and decode the payload found under `field`.
    #[instrument(level = "debug", skip(self), fields(flavor = %self.config.flavor))]
    pub async fn get<T: DeserializeOwned>(&self, segments: &[&str], field: BodyField) -> Result<T> {
        let url = self.config.endpoint_url(segments)?;
        let endpoint = url.path().to_string();
        debug!(endpoint = %endpoint, "GET");

        let response = self.authorize(self.http_client.get(url)).send().await?;
        let status = response.status();
        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            warn!(endpoint = %endpoint, status = status.as_u16(), "unexpected status");
            return Err(ApiError::Status {
                endpoint,
                status: status.as_u16(),
                body: truncate(&body, MAX_ERROR_BODY),
            });
        }

        let bytes = response.bytes().await?;
        let decoded = serde_json::from_slice::<Value>(&bytes)
            .and_then(|body| field.extract(body))
            .and_then(serde_json::from_value::<T>);

        decoded.map_err(|source| ApiError::Decode { endpoint, source })
    }
}

#[async_trait]
impl GovernanceSource for GovernanceClient {
    async fn fetch_bundles(&self) -> Result<Vec<Bundle>> {
        self.get(self.config.flavor.bundles_path(), BodyField::Data)
            .await
    }

    async fn fetch_policy(&self, policy_id: &str) -> Result<Policy> {
        let mut segments: Vec<&str> = self.config.flavor.policies_path().to_vec();
        segments.push(policy_id);
        self.get(&segments, BodyField::Raw).await
    }

    async fn fetch_projects(&self) -> Result<Vec<Project>> {
        self.get(&["v4", "projects"], BodyField::Raw).await
    }

    async fn fetch_registered_models(&self) -> Result<Vec<RegisteredModel>> {
        self.get(&["api", "registeredmodels", "v1"], BodyField::Items)
            .await
    }

    async fn fetch_project_goals(&self, project_id: &str) -> Result<Vec<Goal>> {
        self.get(
            &["api", "projects", "v1", "projects", project_id, "goals"],
            BodyField::Raw,
        )
        .await
    }
}

pub(crate) fn truncate(body: &str, max: usize) -> String {
    if body.len() <= max {
        return body.to_string();
    }
    let mut end = max;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}…", &body[..end])
}
