// ============================================================================
// File: src/search_client.rs
// SerpApi Google Flights client
// ============================================================================

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use crate::config::Config;
use crate::error::{PlannerError, PlannerResult};
use crate::models::{FlightSearchResponse, SearchRequest};

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Flight search collaborator
#[async_trait]
pub trait FlightSearch: Send + Sync {
    async fn search(&self, request: &SearchRequest) -> PlannerResult<FlightSearchResponse>;

    /// Repeat `search` with a departure token to obtain booking options.
    async fn search_with_token(
        &self,
        request: &SearchRequest,
        departure_token: &str,
    ) -> PlannerResult<FlightSearchResponse>;
}

pub struct SerpApiClient {
    client: Client,
    base_url: String,
    api_key: String,
    language: String,
}

impl SerpApiClient {
    pub fn new(config: &Config) -> PlannerResult<Self> {
        let client = Client::builder()
            .timeout(config.settings.request_timeout())
            .build()
            .map_err(|e| PlannerError::Configuration(format!("HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.settings.serpapi_url.trim_end_matches('/').to_string(),
            api_key: config.serpapi_api_key.clone(),
            language: config.settings.language.clone(),
        })
    }

    fn query_params(
        &self,
        request: &SearchRequest,
        departure_token: Option<&str>,
    ) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("engine", "google_flights".to_string()),
            ("departure_id", request.origin.clone()),
            ("arrival_id", request.destination.clone()),
            ("outbound_date", request.outbound_date.format(DATE_FORMAT).to_string()),
            ("return_date", request.return_date.format(DATE_FORMAT).to_string()),
            ("currency", request.currency.clone()),
            ("hl", self.language.clone()),
            ("api_key", self.api_key.clone()),
        ];

        if let Some(token) = departure_token {
            params.push(("departure_token", token.to_string()));
        }

        params
    }

    async fn get(
        &self,
        request: &SearchRequest,
        departure_token: Option<&str>,
    ) -> PlannerResult<FlightSearchResponse> {
        let url = format!("{}/search.json", self.base_url);
        debug!(
            origin = %request.origin,
            destination = %request.destination,
            with_token = departure_token.is_some(),
            "Searching flights"
        );

        let http_response = self
            .client
            .get(&url)
            .query(&self.query_params(request, departure_token))
            .send()
            .await?;

        // Check HTTP status
        if !http_response.status().is_success() {
            let status = http_response.status();
            let error_text = http_response.text().await.unwrap_or_default();
            return Err(PlannerError::CollaboratorUnavailable(format!(
                "Search API error: HTTP {}\nResponse: {}",
                status,
                truncate(&error_text, 500)
            )));
        }

        let response_text = http_response.text().await?;
        parse_response(&response_text)
    }
}

#[async_trait]
impl FlightSearch for SerpApiClient {
    async fn search(&self, request: &SearchRequest) -> PlannerResult<FlightSearchResponse> {
        self.get(request, None).await
    }

    async fn search_with_token(
        &self,
        request: &SearchRequest,
        departure_token: &str,
    ) -> PlannerResult<FlightSearchResponse> {
        self.get(request, Some(departure_token)).await
    }
}

/// Decode a search body. An `error` field means the engine refused the query.
fn parse_response(body: &str) -> PlannerResult<FlightSearchResponse> {
    let response: FlightSearchResponse = serde_json::from_str(body).map_err(|e| {
        PlannerError::MalformedResponse(format!(
            "Failed to parse search response as JSON: {}\nRaw response (first 500 chars): {}",
            e,
            truncate(body, 500)
        ))
    })?;

    if let Some(error) = &response.error {
        return Err(PlannerError::CollaboratorUnavailable(format!(
            "Search API reported: {}",
            error
        )));
    }

    Ok(response)
}

fn truncate(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}
