//! Web tools: web_search (SearxNG) and flight_search (AviationStack)

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use super::{Tool, ToolError, ERROR_MARKER};
use crate::blocks::Block;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);
const MAX_SEARCH_RESULTS: usize = 10;
const AVIATIONSTACK_URL: &str = "http://api.aviationstack.com";

#[derive(Deserialize)]
struct SearxResponse {
    #[serde(default)]
    results: Vec<SearxResult>,
}

#[derive(Deserialize)]
struct SearxResult {
    #[serde(default)]
    title: String,
    #[serde(default)]
    url: String,
    #[serde(default)]
    content: String,
}

/// Web search through a SearxNG instance's JSON API
pub struct WebSearch {
    client: reqwest::Client,
    base_url: Option<String>,
}

impl WebSearch {
    pub fn new(base_url: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url
                .filter(|u| !u.trim().is_empty())
                .map(|u| u.trim_end_matches('/').to_string()),
        }
    }

    async fn search(&self, base_url: &str, query: &str) -> Result<String, ToolError> {
        debug!("◆ web search: {}", query);
        let response = self
            .client
            .get(format!("{}/search", base_url))
            .query(&[("q", query), ("format", "json")])
            .header("Accept", "application/json")
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Ok(format!("{}: search returned {}", ERROR_MARKER, status));
        }

        let data: SearxResponse = response.json().await?;
        if data.results.is_empty() {
            return Ok(format!("No results for: {}", query));
        }

        let entries: Vec<String> = data
            .results
            .iter()
            .take(MAX_SEARCH_RESULTS)
            .map(|r| format!("Title: {}\nSnippet: {}\nLink: {}", r.title, r.content, r.url))
            .collect();
        Ok(entries.join("\n\n"))
    }
}

#[async_trait]
impl Tool for WebSearch {
    fn tag(&self) -> &str {
        "web_search"
    }

    fn name(&self) -> &str {
        "Web Search"
    }

    fn description(&self) -> &str {
        "Search the web. Put the query in the block body."
    }

    fn usage(&self) -> String {
        "```web_search\nlatest rust release\n```".to_string()
    }

    async fn execute(&self, blocks: &[Block], _safety: bool) -> String {
        let Some(base_url) = self.base_url.as_deref() else {
            return ToolError::NotConfigured("web search (set SEARXNG_BASE_URL)".to_string())
                .render();
        };

        let mut outputs = Vec::new();
        for block in blocks {
            let query = block.body.trim();
            if query.is_empty() {
                return ToolError::InvalidParam("search query is empty".to_string()).render();
            }
            let output = self
                .search(base_url, query)
                .await
                .unwrap_or_else(|e| e.render());
            if self.execution_failure_check(&output) {
                return output;
            }
            outputs.push(output);
        }
        outputs.join("\n\n")
    }
}

#[derive(Deserialize)]
struct FlightResponse {
    #[serde(default)]
    data: Vec<FlightRecord>,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct FlightRecord {
    flight_status: Option<String>,
    airline: Option<Named>,
    departure: Option<Endpoint>,
    arrival: Option<Endpoint>,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct Named {
    name: Option<String>,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct Endpoint {
    airport: Option<String>,
    iata: Option<String>,
    scheduled: Option<String>,
}

impl Endpoint {
    fn describe(endpoint: Option<&Endpoint>) -> String {
        let Some(e) = endpoint else {
            return "unknown".to_string();
        };
        format!(
            "{} ({}) at {}",
            e.airport.as_deref().unwrap_or("unknown airport"),
            e.iata.as_deref().unwrap_or("?"),
            e.scheduled.as_deref().unwrap_or("unknown time")
        )
    }
}

/// Flight status lookup by IATA flight number
pub struct FlightSearch {
    client: reqwest::Client,
    api_key: Option<String>,
    base_url: String,
}

impl FlightSearch {
    pub fn new(api_key: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            base_url: AVIATIONSTACK_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    async fn lookup(&self, api_key: &str, flight: &str) -> Result<String, ToolError> {
        let flight = flight.to_uppercase();
        debug!("◆ flight lookup: {}", flight);
        let response = self
            .client
            .get(format!("{}/v1/flights", self.base_url))
            .query(&[("access_key", api_key), ("flight_iata", flight.as_str())])
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Ok(format!("{}: flight API returned {}", ERROR_MARKER, status));
        }

        let data: FlightResponse = response.json().await?;
        let Some(record) = data.data.first() else {
            return Ok(format!("{}: no flight found for {}", ERROR_MARKER, flight));
        };

        Ok(format!(
            "Flight: {}\nAirline: {}\nStatus: {}\nDeparture: {}\nArrival: {}",
            flight,
            record
                .airline
                .as_ref()
                .and_then(|a| a.name.as_deref())
                .unwrap_or("unknown"),
            record.flight_status.as_deref().unwrap_or("unknown"),
            Endpoint::describe(record.departure.as_ref()),
            Endpoint::describe(record.arrival.as_ref()),
        ))
    }
}

#[async_trait]
impl Tool for FlightSearch {
    fn tag(&self) -> &str {
        "flight_search"
    }

    fn name(&self) -> &str {
        "Flight Search"
    }

    fn description(&self) -> &str {
        "Look up a flight's status. Put the IATA flight number in the block body."
    }

    fn usage(&self) -> String {
        "```flight_search\nAF1234\n```".to_string()
    }

    async fn execute(&self, blocks: &[Block], _safety: bool) -> String {
        let Some(api_key) = self.api_key.as_deref() else {
            return ToolError::NotConfigured(
                "flight search (set AVIATIONSTACK_API_KEY)".to_string(),
            )
            .render();
        };

        let mut outputs = Vec::new();
        for block in blocks {
            let flight = block.body.trim();
            if flight.is_empty() {
                return ToolError::InvalidParam("flight number is empty".to_string()).render();
            }
            let output = self
                .lookup(api_key, flight)
                .await
                .unwrap_or_else(|e| e.render());
            if self.execution_failure_check(&output) {
                return output;
            }
            outputs.push(output);
        }
        outputs.join("\n\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_search_not_configured() {
        let tool = WebSearch::new(Some("  ".to_string()));
        let output = tool.execute(&[Block::new("web_search", "rust")], false).await;
        assert!(output.starts_with("Error: web search"));
        assert!(output.ends_with("not configured."));
    }

    #[tokio::test]
    async fn test_search_results() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/search")
            .match_query(mockito::Matcher::AllOf(vec![
                mockito::Matcher::UrlEncoded("q".into(), "rust".into()),
                mockito::Matcher::UrlEncoded("format".into(), "json".into()),
            ]))
            .with_status(200)
            .with_body(r#"{"results":[{"title":"Rust","url":"https://www.rust-lang.org","content":"A language"}]}"#)
            .create_async()
            .await;

        let tool = WebSearch::new(Some(server.url()));
        let output = tool.execute(&[Block::new("web_search", "rust")], false).await;
        mock.assert_async().await;
        assert_eq!(
            output,
            "Title: Rust\nSnippet: A language\nLink: https://www.rust-lang.org"
        );
    }

    #[tokio::test]
    async fn test_flight_not_configured() {
        let tool = FlightSearch::new(None);
        let output = tool.execute(&[Block::new("flight_search", "AF1")], false).await;
        assert!(tool.execution_failure_check(&output));
    }

    #[tokio::test]
    async fn test_flight_lookup() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/v1/flights")
            .match_query(mockito::Matcher::UrlEncoded(
                "flight_iata".into(),
                "AF1234".into(),
            ))
            .with_status(200)
            .with_body(
                r#"{"data":[{"flight_status":"active","airline":{"name":"Air France"},
                "departure":{"airport":"Charles de Gaulle","iata":"CDG","scheduled":"2024-01-01T10:00:00"},
                "arrival":{"airport":"JFK","iata":"JFK","scheduled":"2024-01-01T12:00:00"}}]}"#,
            )
            .create_async()
            .await;

        let tool = FlightSearch::new(Some("key".to_string())).with_base_url(server.url());
        let output = tool.execute(&[Block::new("flight_search", "af1234")], false).await;
        assert!(output.starts_with("Flight: AF1234\nAirline: Air France\nStatus: active"));
        assert!(output.contains("Departure: Charles de Gaulle (CDG)"));
    }
}
