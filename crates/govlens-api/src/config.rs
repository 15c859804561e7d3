//! Connection settings for the governance API and the scoring endpoint
//!
//! Both configs are validated when built. Secrets have no literal defaults:
//! a missing key is a startup error, never a silent fallback.

use crate::error::ApiError;
use crate::Result;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use url::Url;

/// Default HTTP request timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Header carrying the API key under [`AuthScheme::ApiKeyHeader`]
pub const API_KEY_HEADER: &str = "X-Domino-Api-Key";

/// How the API key is presented to the server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthScheme {
    /// `X-Domino-Api-Key: <key>`
    #[default]
    ApiKeyHeader,
    /// HTTP Basic auth with the key as both username and password
    Basic,
}

impl FromStr for AuthScheme {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "header" | "api-key" | "apikey" => Ok(AuthScheme::ApiKeyHeader),
            "basic" => Ok(AuthScheme::Basic),
            other => Err(ApiError::InvalidConfig(format!(
                "unknown auth scheme '{other}' (expected 'header' or 'basic')"
            ))),
        }
    }
}

impl fmt::Display for AuthScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthScheme::ApiKeyHeader => write!(f, "header"),
            AuthScheme::Basic => write!(f, "basic"),
        }
    }
}

/// Which family of governance endpoints the server exposes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ApiFlavor {
    /// `/api/governance/v1/...`
    #[default]
    Governance,
    /// Legacy `/guardrails/v1/...`
    Guardrails,
}

impl ApiFlavor {
    /// Path segments of the bundle (deliverable) listing.
    pub fn bundles_path(&self) -> &'static [&'static str] {
        match self {
            ApiFlavor::Governance => &["api", "governance", "v1", "bundles"],
            ApiFlavor::Guardrails => &["guardrails", "v1", "deliverables"],
        }
    }

    /// Path segments of the policy collection; the policy id is appended.
    pub fn policies_path(&self) -> &'static [&'static str] {
        match self {
            ApiFlavor::Governance => &["api", "governance", "v1", "policies"],
            ApiFlavor::Guardrails => &["guardrails", "v1", "policies"],
        }
    }
}

impl FromStr for ApiFlavor {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "governance" => Ok(ApiFlavor::Governance),
            "guardrails" => Ok(ApiFlavor::Guardrails),
            other => Err(ApiError::InvalidConfig(format!(
                "unknown API flavor '{other}' (expected 'governance' or 'guardrails')"
            ))),
        }
    }
}

impl fmt::Display for ApiFlavor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiFlavor::Governance => write!(f, "governance"),
            ApiFlavor::Guardrails => write!(f, "guardrails"),
        }
    }
}

/// Governance API configuration
#[derive(Clone)]
pub struct ApiConfig {
    host: Url,
    api_key: String,
    /// How the key is sent
    pub auth: AuthScheme,
    /// Which endpoint family to call
    pub flavor: ApiFlavor,
    /// Per-request timeout
    pub timeout: Duration,
}

impl ApiConfig {
    /// Create a config for `host`, validating both values.
    pub fn new(host: &str, api_key: &str) -> Result<Self> {
        let host = parse_base_url(host)?;
        let api_key = api_key.trim();
        if api_key.is_empty() {
            return Err(ApiError::MissingConfig("API_KEY"));
        }

        Ok(ApiConfig {
            host,
            api_key: api_key.to_string(),
            auth: AuthScheme::default(),
            flavor: ApiFlavor::default(),
            timeout: DEFAULT_TIMEOUT,
        })
    }

    /// Build from `API_HOST`, `API_KEY`, `GOVLENS_AUTH`, `GOVLENS_API_FLAVOR`
    /// and `GOVLENS_TIMEOUT_SECS`.
    pub fn from_env() -> Result<Self> {
        Self::from_vars(|name| std::env::var(name).ok())
    }

    /// Build from the same variables as [`ApiConfig::from_env`], read through `var`.
    pub fn from_vars(var: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let host = var("API_HOST").ok_or(ApiError::MissingConfig("API_HOST"))?;
        let key = var("API_KEY").ok_or(ApiError::MissingConfig("API_KEY"))?;
        let mut config = Self::new(&host, &key)?;

        if let Some(auth) = var("GOVLENS_AUTH") {
            config.auth = auth.parse()?;
        }
        if let Some(flavor) = var("GOVLENS_API_FLAVOR") {
            config.flavor = flavor.parse()?;
        }
        if let Some(secs) = var("GOVLENS_TIMEOUT_SECS") {
            let secs: u64 = secs.trim().parse().map_err(|_| {
                ApiError::InvalidConfig(format!("GOVLENS_TIMEOUT_SECS is not a number: {secs}"))
            })?;
            config = config.with_timeout(Duration::from_secs(secs))?;
        }

        Ok(config)
    }

    /// Set the auth scheme
    pub fn with_auth(mut self, auth: AuthScheme) -> Self {
        self.auth = auth;
        self
    }

    /// Set the endpoint flavor
    pub fn with_flavor(mut self, flavor: ApiFlavor) -> Self {
        self.flavor = flavor;
        self
    }

    /// Set the request timeout; zero is rejected.
    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self> {
        if timeout.is_zero() {
            return Err(ApiError::InvalidConfig(
                "request timeout must be greater than zero".to_string(),
            ));
        }
        self.timeout = timeout;
        Ok(self)
    }

    /// Base URL of the platform
    pub fn host(&self) -> &Url {
        &self.host
    }

    /// Base URL as a string with no trailing slash
    pub fn host_str(&self) -> &str {
        self.host.as_str().trim_end_matches('/')
    }

    pub(crate) fn api_key(&self) -> &str {
        &self.api_key
    }

    /// Absolute URL for `segments` below the host; each segment is percent-encoded.
    pub fn endpoint_url(&self, segments: &[&str]) -> Result<Url> {
        join_segments(&self.host, segments)
    }
}

impl fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiConfig")
            .field("host", &self.host.as_str())
            .field("api_key", &"<redacted>")
            .field("auth", &self.auth)
            .field("flavor", &self.flavor)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Remote scoring endpoint configuration
#[derive(Clone)]
pub struct ScoringConfig {
    endpoint: Url,
    api_key: String,
    /// Per-request timeout
    pub timeout: Duration,
}

impl ScoringConfig {
    /// Create a config for a full model endpoint URL.
    pub fn new(endpoint: &str, api_key: &str) -> Result<Self> {
        let endpoint = Url::parse(endpoint.trim()).map_err(|e| ApiError::InvalidUrl {
            url: endpoint.to_string(),
            reason: e.to_string(),
        })?;
        if !matches!(endpoint.scheme(), "http" | "https") {
            return Err(ApiError::InvalidUrl {
                url: endpoint.to_string(),
                reason: "scheme must be http or https".to_string(),
            });
        }
        let api_key = api_key.trim();
        if api_key.is_empty() {
            return Err(ApiError::MissingConfig("SCORING_KEY"));
        }

        Ok(ScoringConfig {
            endpoint,
            api_key: api_key.to_string(),
            timeout: DEFAULT_TIMEOUT,
        })
    }

    /// Build from `SCORING_URL` and `SCORING_KEY`.
    pub fn from_env() -> Result<Self> {
        let url =
            std::env::var("SCORING_URL").map_err(|_| ApiError::MissingConfig("SCORING_URL"))?;
        let key =
            std::env::var("SCORING_KEY").map_err(|_| ApiError::MissingConfig("SCORING_KEY"))?;
        Self::new(&url, &key)
    }

    /// Model endpoint URL
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    pub(crate) fn api_key(&self) -> &str {
        &self.api_key
    }
}

impl fmt::Debug for ScoringConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScoringConfig")
            .field("endpoint", &self.endpoint.as_str())
            .field("api_key", &"<redacted>")
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Parse an absolute http(s) base URL.
pub fn parse_base_url(raw: &str) -> Result<Url> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ApiError::MissingConfig("API_HOST"));
    }
    let url = Url::parse(trimmed).map_err(|e| ApiError::InvalidUrl {
        url: trimmed.to_string(),
        reason: e.to_string(),
    })?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ApiError::InvalidUrl {
            url: trimmed.to_string(),
            reason: "scheme must be http or https".to_string(),
        });
    }
    if url.cannot_be_a_base() {
        return Err(ApiError::InvalidUrl {
            url: trimmed.to_string(),
            reason: "URL cannot be used as a base".to_string(),
        });
    }
    Ok(url)
}

/// Append percent-encoded `segments` to the path of `base`.
pub fn join_segments(base: &Url, segments: &[&str]) -> Result<Url> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|_| ApiError::InvalidUrl {
            url: base.to_string(),
            reason: "URL cannot be used as a base".to_string(),
        })?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_config_new() {
        let config = ApiConfig::new("https://gov.example.com/", "secret").unwrap();
        assert_eq!(config.host_str(), "https://gov.example.com");
        assert_eq!(config.auth, AuthScheme::ApiKeyHeader);
        assert_eq!(config.flavor, ApiFlavor::Governance);
        assert_eq!(config.timeout, DEFAULT_TIMEOUT);
    }

    fn vars<'a>(pairs: &'a [(&'a str, &'a str)]) -> impl Fn(&str) -> Option<String> + 'a {
        move |name| {
            pairs
                .iter()
                .find(|(k, _)| *k == name)
                .map(|(_, v)| v.to_string())
        }
    }

    #[test]
    fn test_from_vars_reads_overrides() {
        let config = ApiConfig::from_vars(vars(&[
            ("API_HOST", "https://gov.example.com"),
            ("API_KEY", "k"),
            ("GOVLENS_AUTH", "basic"),
            ("GOVLENS_API_FLAVOR", "guardrails"),
            ("GOVLENS_TIMEOUT_SECS", " 5 "),
        ]))
        .unwrap();
        assert_eq!(config.auth, AuthScheme::Basic);
        assert_eq!(config.flavor, ApiFlavor::Guardrails);
        assert_eq!(config.timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_from_vars_defaults_and_failures() {
        let config =
            ApiConfig::from_vars(vars(&[("API_HOST", "https://gov.example.com"), ("API_KEY", "k")]))
                .unwrap();
        assert_eq!(config.auth, AuthScheme::ApiKeyHeader);
        assert_eq!(config.timeout, DEFAULT_TIMEOUT);

        let err = ApiConfig::from_vars(vars(&[("API_KEY", "k")])).unwrap_err();
        assert!(matches!(err, ApiError::MissingConfig("API_HOST")));

        let err = ApiConfig::from_vars(vars(&[
            ("API_HOST", "https://gov.example.com"),
            ("API_KEY", "k"),
            ("GOVLENS_TIMEOUT_SECS", "soon"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ApiError::InvalidConfig(_)));

        let err = ApiConfig::from_vars(vars(&[
            ("API_HOST", "https://gov.example.com"),
            ("API_KEY", "k"),
            ("GOVLENS_TIMEOUT_SECS", "0"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ApiError::InvalidConfig(_)));
    }

    #[test]
    fn test_api_config_rejects_empty_key() {
        let err = ApiConfig::new("https://gov.example.com", "  ").unwrap_err();
        assert!(matches!(err, ApiError::MissingConfig("API_KEY")));
    }

    #[test]
    fn test_api_config_rejects_non_http_host() {
        let err = ApiConfig::new("ftp://gov.example.com", "secret").unwrap_err();
        assert!(matches!(err, ApiError::InvalidUrl { .. }));

        let err = ApiConfig::new("not a url", "secret").unwrap_err();
        assert!(matches!(err, ApiError::InvalidUrl { .. }));
    }

    #[test]
    fn test_api_config_debug_redacts_key() {
        let config = ApiConfig::new("https://gov.example.com", "top-secret-key").unwrap();
        let debug = format!("{config:?}");
        assert!(!debug.contains("top-secret-key"));
        assert!(debug.contains("<redacted>"));
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let config = ApiConfig::new("https://gov.example.com", "k").unwrap();
        assert!(config.with_timeout(Duration::ZERO).is_err());
    }

    #[test]
    fn test_endpoint_url_encodes_segments() {
        let config = ApiConfig::new("https://gov.example.com/domino/", "k").unwrap();
        let url = config
            .endpoint_url(&["api", "projects", "v1", "projects", "a b/c", "goals"])
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://gov.example.com/domino/api/projects/v1/projects/a%20b%2Fc/goals"
        );
    }

    #[test]
    fn test_auth_scheme_parse() {
        assert_eq!("basic".parse::<AuthScheme>().unwrap(), AuthScheme::Basic);
        assert_eq!(
            "Header".parse::<AuthScheme>().unwrap(),
            AuthScheme::ApiKeyHeader
        );
        assert!("oauth".parse::<AuthScheme>().is_err());
    }

    #[test]
    fn test_flavor_paths() {
        assert_eq!(
            ApiFlavor::Guardrails.bundles_path(),
            &["guardrails", "v1", "deliverables"]
        );
        assert_eq!(
            "governance".parse::<ApiFlavor>().unwrap(),
            ApiFlavor::Governance
        );
    }

    #[test]
    fn test_scoring_config_requires_key() {
        let err = ScoringConfig::new("https://models.example.com/m/1/latest/model", "").unwrap_err();
        assert!(matches!(err, ApiError::MissingConfig("SCORING_KEY")));

        let ok = ScoringConfig::new("https://models.example.com/m/1/latest/model", "k").unwrap();
        assert_eq!(ok.endpoint().path(), "/m/1/latest/model");
    }
}
