// SERP provider client
// Thin HTTP client over the external results API, behind a trait so the
// tracking pipeline can run against a stub in tests.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

use crate::models::keyword_rank::Device;

#[derive(Error, Debug)]
pub enum SerpError {
    #[error("SERP request failed: {0}")]
    RequestFailed(String),

    #[error("SERP provider returned status {0}")]
    BadStatus(u16),

    #[error("Failed to parse SERP response: {0}")]
    ParseError(String),
}

/// What one SERP lookup observed for a keyword
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SerpObservation {
    pub rank_position: Option<i32>,
    pub map_pack_position: Option<i32>,
    pub ranking_url: Option<String>,
    pub has_featured_snippet: bool,
    pub has_people_also_ask: bool,
    pub has_local_pack: bool,
    pub has_knowledge_panel: bool,
    pub has_image_pack: bool,
    pub has_video_carousel: bool,
}

/// A single lookup request against the provider
#[derive(Debug, Clone, Serialize)]
pub struct SerpQuery<'a> {
    pub keyword: &'a str,
    pub location: &'a str,
    pub device: Device,
    pub business_name: &'a str,
}

#[async_trait]
pub trait SerpClient: Send + Sync {
    async fn fetch(&self, query: &SerpQuery<'_>) -> Result<SerpObservation, SerpError>;
}

/// Production client calling the configured SERP API over HTTP
pub struct HttpSerpClient {
    http: reqwest::Client,
    api_url: String,
    api_key: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ProviderResponse {
    rank_position: Option<i32>,
    map_pack_position: Option<i32>,
    ranking_url: Option<String>,
    #[serde(default)]
    has_featured_snippet: bool,
    #[serde(default)]
    has_people_also_ask: bool,
    #[serde(default)]
    has_local_pack: bool,
    #[serde(default)]
    has_knowledge_panel: bool,
    #[serde(default)]
    has_image_pack: bool,
    #[serde(default)]
    has_video_carousel: bool,
}

impl HttpSerpClient {
    pub fn from_env() -> Result<Self, SerpError> {
        let serp = &crate::app_config::config().serp;
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(serp.request_timeout))
            .build()
            .map_err(|e| SerpError::RequestFailed(e.to_string()))?;

        let api_key = if serp.api_key.is_empty() {
            None
        } else {
            Some(serp.api_key.clone())
        };

        Ok(Self {
            http,
            api_url: serp.api_url.clone(),
            api_key,
        })
    }
}

#[async_trait]
impl SerpClient for HttpSerpClient {
    async fn fetch(&self, query: &SerpQuery<'_>) -> Result<SerpObservation, SerpError> {
        let mut request = self
            .http
            .post(&self.api_url)
            .json(&serde_json::json!({
                "q": query.keyword,
                "location": query.location,
                "device": query.device.as_str(),
                "business": query.business_name,
            }));

        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| SerpError::RequestFailed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SerpError::BadStatus(status.as_u16()));
        }

        let body: ProviderResponse = response
            .json()
            .await
            .map_err(|e| SerpError::ParseError(e.to_string()))?;

        Ok(SerpObservation {
            rank_position: body.rank_position,
            map_pack_position: body.map_pack_position,
            ranking_url: body.ranking_url,
            has_featured_snippet: body.has_featured_snippet,
            has_people_also_ask: body.has_people_also_ask,
            has_local_pack: body.has_local_pack,
            has_knowledge_panel: body.has_knowledge_panel,
            has_image_pack: body.has_image_pack,
            has_video_carousel: body.has_video_carousel,
        })
    }
}


#[cfg(test)]
mod tests {
    use super::stub::StubSerpClient;
    use super::*;

    fn query<'a>(keyword: &'a str) -> SerpQuery<'a> {
        SerpQuery {
            keyword,
            location: "Austin, TX",
            device: Device::Desktop,
            business_name: "Atlas Plumbing",
        }
    }

    #[tokio::test]
    async fn test_stub_returns_configured_observation() {
        let client = StubSerpClient::new().with_response(
            "plumber near me",
            SerpObservation {
                rank_position: Some(4),
                map_pack_position: Some(2),
                has_local_pack: true,
                ..Default::default()
            },
        );

        let obs = client
            .fetch(&query("plumber near me"))
            .await
            .expect("stub fetch");
        assert_eq!(obs.rank_position, Some(4));
        assert_eq!(obs.map_pack_position, Some(2));
        assert!(obs.has_local_pack);
    }

    #[tokio::test]
    async fn test_stub_unknown_keyword_is_unranked() {
        let client = StubSerpClient::new();
        let obs = client.fetch(&query("never tracked")).await.expect("stub fetch");
        assert_eq!(obs.rank_position, None);
        assert_eq!(obs.map_pack_position, None);
    }

    #[tokio::test]
    async fn test_stub_failure_injection() {
        let mut client = StubSerpClient::new();
        client.fail_on = Some("bad keyword".to_string());

        assert!(client.fetch(&query("bad keyword")).await.is_err());
        assert!(client.fetch(&query("good keyword")).await.is_ok());
    }
}
