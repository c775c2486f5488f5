//! Quote endpoint client.

use std::time::Duration;

use async_trait::async_trait;
use mockall::automock;
use reqwest::{Client, StatusCode};
use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use crate::{cart::CartLine, schema::ServerQuote};

/// Path of the quoting endpoint, relative to the API base URL.
pub const QUOTE_PATH: &str = "/api/orders/quote";

/// Errors that can occur when requesting a quote.
#[derive(Debug, Error)]
pub enum QuoteServiceError {
    /// An HTTP transport error occurred.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// The backend answered with a non-2xx status.
    #[error("quote request failed with status {status}: {body}")]
    UnexpectedStatus {
        /// Response status
        status: StatusCode,

        /// Response body text, if any
        body: String,
    },

    /// The response body could not be decoded.
    #[error("malformed quote response: {0}")]
    MalformedResponse(#[from] serde_json::Error),
}

/// Source of authoritative cart pricing.
#[automock]
#[async_trait]
pub trait QuoteService: Send + Sync {
    /// Price the given cart lines.
    async fn quote(&self, lines: &[CartLine]) -> Result<ServerQuote, QuoteServiceError>;
}

/// Connection settings for the storefront backend.
#[derive(Debug, Clone)]
pub struct QuoteClientConfig {
    /// API base URL, e.g. `"https://shop.example.com"`.
    pub base_url: String,

    /// Bearer token sent with quote requests, if any.
    pub token: Option<String>,

    /// Per-request timeout.
    pub timeout: Duration,
}

/// [`QuoteService`] backed by the storefront REST API.
#[derive(Debug, Clone)]
pub struct HttpQuoteService {
    config: QuoteClientConfig,
    http: Client,
}

impl HttpQuoteService {
    /// Create a new client from the given configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(config: QuoteClientConfig) -> Result<Self, QuoteServiceError> {
        let http = Client::builder().timeout(config.timeout).build()?;

        Ok(Self { config, http })
    }

    fn url(&self) -> String {
        format!("{}{QUOTE_PATH}", self.config.base_url.trim_end_matches('/'))
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct QuoteRequest<'a> {
    ordered_items: &'a [CartLine],
}

#[async_trait]
impl QuoteService for HttpQuoteService {
    async fn quote(&self, lines: &[CartLine]) -> Result<ServerQuote, QuoteServiceError> {
        let url = self.url();

        debug!(%url, lines = lines.len(), "requesting quote");

        let mut request = self.http.post(&url).json(&QuoteRequest {
            ordered_items: lines,
        });

        if let Some(token) = &self.config.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();

            return Err(QuoteServiceError::UnexpectedStatus { status, body });
        }

        let body = response.text().await?;

        Ok(ServerQuote::parse(&body)?)
    }
}
