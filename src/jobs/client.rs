//! Minimal GraphQL-over-HTTP client used by the scheduled jobs.

use crate::config::Config;
use crate::error::{CrmError, Result};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

#[derive(Debug, Deserialize)]
struct GraphQLResponse<T> {
    data: Option<T>,
    errors: Option<Vec<GraphQLErrorResponse>>,
}

#[derive(Debug, Deserialize)]
struct GraphQLErrorResponse {
    message: String,
}

#[derive(Clone)]
pub struct GraphQLClient {
    http: reqwest::Client,
    url: String,
    retries: u32,
    retry_delay: Duration,
}

impl GraphQLClient {
    pub fn new(config: &Config) -> Result<Self> {
        let api = &config.api;
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(api.timeout_seconds))
            .build()?;
        Ok(Self {
            http,
            url: config.graphql_url(),
            retries: api.retries,
            retry_delay: Duration::from_millis(api.retry_delay_ms),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Execute a query and deserialize its `data`.
    ///
    /// Transport failures are retried `retries` times with a linearly growing
    /// delay. A response carrying GraphQL `errors` is not retried.
    pub async fn execute<T: DeserializeOwned>(
        &self,
        query: &str,
        variables: Option<serde_json::Value>,
    ) -> Result<T> {
        let body = serde_json::json!({
            "query": query,
            "variables": variables.unwrap_or(serde_json::Value::Null)
        });

        let mut attempt = 0;
        let response = loop {
            match self.http.post(&self.url).json(&body).send().await {
                Ok(response) => break response,
                Err(e) if attempt < self.retries => {
                    attempt += 1;
                    warn!("GraphQL request to {} failed (attempt {}): {}", self.url, attempt, e);
                    tokio::time::sleep(self.retry_delay * attempt).await;
                }
                Err(e) => return Err(e.into()),
            }
        };

        let status = response.status();
        if !status.is_success() {
            return Err(CrmError::Status(status.as_u16()));
        }

        let graphql_response: GraphQLResponse<T> = response.json().await?;
        if let Some(errors) = graphql_response.errors {
            if !errors.is_empty() {
                let messages: Vec<String> = errors.into_iter().map(|e| e.message).collect();
                return Err(CrmError::GraphQL(messages.join("; ")));
            }
        }

        debug!("GraphQL request to {} succeeded", self.url);
        graphql_response
            .data
            .ok_or_else(|| CrmError::GraphQL("No data in response".to_string()))
    }
}
