//! REST client for the Algorand indexer.
//!
//! Provides the two reads the subscriber needs: the indexer's latest imported round and a paged
//! search for application-call transactions in a round range.

use super::types::*;
use reqwest::Client;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;

/// Header carrying the indexer API token.
const TOKEN_HEADER: &str = "X-Indexer-API-Token";

/// Algorand indexer client
#[derive(Clone)]
pub struct IndexerClient {
	/// The underlying HTTP client.
	http_client: Client,
	/// Base URL of the indexer, e.g. `http://localhost:8980`.
	indexer_url: String,
	/// API token sent with every request.
	token: String,
}

impl IndexerClient {
	/// Create a new indexer client.
	///
	/// # Arguments
	/// * `indexer_url` - Base URL of the indexer REST API.
	/// * `token` - API token for the indexer.
	pub fn new(indexer_url: String, token: String) -> Result<Self, IndexerError> {
		let http_client = Client::builder()
			.timeout(Duration::from_secs(30))
			.build()?;

		Ok(Self {
			http_client,
			indexer_url: indexer_url.trim_end_matches('/').to_string(),
			token,
		})
	}

	/// Latest round imported by the indexer.
	pub async fn health(&self) -> Result<HealthResponse, IndexerError> {
		self.get_json("/health", &[]).await
	}

	/// Fetch one page of application-call transactions.
	pub async fn search_transactions(
		&self,
		query: &TransactionQuery,
	) -> Result<TransactionsResponse, IndexerError> {
		let mut params = vec![
			("application-id", query.application_id.to_string()),
			("tx-type", "appl".to_string()),
			("min-round", query.min_round.to_string()),
			("max-round", query.max_round.to_string()),
			("limit", query.limit.to_string()),
		];
		if let Some(next) = &query.next {
			params.push(("next", next.clone()));
		}

		self.get_json("/v2/transactions", &params).await
	}

	async fn get_json<T: DeserializeOwned>(
		&self,
		path: &str,
		params: &[(&str, String)],
	) -> Result<T, IndexerError> {
		let url = format!("{}{}", self.indexer_url, path);
		debug!("GET {} {:?}", url, params);

		let response = self
			.http_client
			.get(&url)
			.header(TOKEN_HEADER, &self.token)
			.query(params)
			.send()
			.await?;

		let status = response.status();
		let body = response.text().await?;
		if !status.is_success() {
			return Err(IndexerError::StatusError {
				status: status.as_u16(),
				body,
			});
		}

		Ok(serde_json::from_str(&body)?)
	}
}
