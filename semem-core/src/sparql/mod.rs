//! SPARQL endpoint access
//!
//! The engine talks to a standard SPARQL 1.1 Query+Update service over
//! HTTP POST with Basic auth and JSON results. The [`SparqlEndpoint`] trait
//! is the seam test doubles implement.

pub mod builder;
pub mod results;

use async_trait::async_trait;
use std::time::Duration;

use crate::constants::defaults;
use crate::error::{Error, Result};
use crate::retry::{RetryConfig, RetryPolicy};

pub use results::{Binding, RdfTerm, SparqlResults};

/// A SPARQL 1.1 Query+Update service
#[async_trait]
pub trait SparqlEndpoint: Send + Sync {
    /// Execute a SELECT query and parse the JSON results.
    ///
    /// # Errors
    ///
    /// Returns `Error::Http`/`Error::Timeout` for transport failures and
    /// `Error::Protocol` for malformed result documents.
    async fn select(&self, query: &str) -> Result<SparqlResults>;

    /// Execute an UPDATE.
    ///
    /// # Errors
    ///
    /// Returns `Error::Http`/`Error::Timeout` for transport failures.
    async fn update(&self, update: &str) -> Result<()>;

    /// The query endpoint URL, used for cache-key derivation
    fn endpoint_url(&self) -> &str;

    /// Probe the service with a trivial query under the short health
    /// deadline.
    async fn health_check(&self) -> bool {
        self.select("SELECT ?s WHERE { ?s ?p ?o } LIMIT 1")
            .await
            .is_ok()
    }
}

/// HTTP client for a SPARQL endpoint pair
pub struct HttpSparqlClient {
    client: reqwest::Client,
    query_url: String,
    update_url: String,
    user: Option<String>,
    password: Option<String>,
    retry: RetryPolicy,
}

impl HttpSparqlClient {
    /// Create a client with the default request deadline.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` when the HTTP client cannot be constructed.
    pub fn new(
        query_url: String,
        update_url: String,
        user: Option<String>,
        password: Option<String>,
    ) -> Result<Self> {
        Self::with_timeout(query_url, update_url, user, password, defaults::SPARQL_TIMEOUT)
    }

    /// Create a client with an explicit request deadline.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` when the HTTP client cannot be constructed.
    pub fn with_timeout(
        query_url: String,
        update_url: String,
        user: Option<String>,
        password: Option<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Config(format!("cannot build HTTP client: {e}")))?;

        Ok(Self {
            client,
            query_url,
            update_url,
            user,
            password,
            retry: RetryPolicy::with_config(RetryConfig::default()),
        })
    }

    fn authorize(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.user {
            Some(user) => builder.basic_auth(user, self.password.as_deref()),
            None => builder,
        }
    }

    async fn post_once(&self, url: &str, content_type: &str, body: String) -> Result<reqwest::Response> {
        let response = self
            .authorize(self.client.post(url))
            .header("Content-Type", content_type)
            .header("Accept", "application/sparql-results+json")
            .body(body)
            .send()
            .await?;

        let status = response.status();
        if status.is_server_error() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Http(format!("sparql endpoint {status}: {body}")));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Protocol(format!("sparql endpoint {status}: {body}")));
        }
        Ok(response)
    }
}

#[async_trait]
impl SparqlEndpoint for HttpSparqlClient {
    async fn select(&self, query: &str) -> Result<SparqlResults> {
        let response = self
            .retry
            .execute(|| {
                self.post_once(
                    &self.query_url,
                    "application/sparql-query",
                    query.to_string(),
                )
            })
            .await?;

        response
            .json::<SparqlResults>()
            .await
            .map_err(|e| Error::Protocol(format!("malformed SPARQL JSON results: {e}")))
    }

    async fn update(&self, update: &str) -> Result<()> {
        self.retry
            .execute(|| {
                self.post_once(
                    &self.update_url,
                    "application/sparql-update",
                    update.to_string(),
                )
            })
            .await?;
        Ok(())
    }

    fn endpoint_url(&self) -> &str {
        &self.query_url
    }

    async fn health_check(&self) -> bool {
        // probes run under a much shorter deadline than real queries
        let probe = self
            .authorize(self.client.post(&self.query_url))
            .header("Content-Type", "application/sparql-query")
            .header("Accept", "application/sparql-results+json")
            .body("SELECT ?s WHERE { ?s ?p ?o } LIMIT 1".to_string())
            .timeout(defaults::SPARQL_HEALTH_TIMEOUT)
            .send()
            .await;

        matches!(probe, Ok(response) if response.status().is_success())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_construction() {
        let client = HttpSparqlClient::new(
            "http://localhost:3030/semem/query".to_string(),
            "http://localhost:3030/semem/update".to_string(),
            Some("admin".to_string()),
            Some("pw".to_string()),
        )
        .unwrap();

        assert_eq!(client.endpoint_url(), "http://localhost:3030/semem/query");
    }
}
