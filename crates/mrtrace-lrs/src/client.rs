//! xAPI statements client over `reqwest`.

use std::time::Duration;

use mrtrace_types::Statement;
use thiserror::Error;

use crate::{LrsConfig, RemoteSink, SaveReceipt, SinkError};

/// Errors raised while setting up the client.
#[derive(Debug, Error)]
pub enum LrsError {
    /// The underlying HTTP client could not be built.
    #[error("failed to build LRS http client: {0}")]
    Client(#[from] reqwest::Error),
}

/// HTTP sink posting statements to `{endpoint}/statements`.
#[derive(Debug, Clone)]
pub struct LrsClient {
    http: reqwest::Client,
    config: LrsConfig,
    statements_url: String,
}

impl LrsClient {
    /// Builds a client for the given LRS.
    ///
    /// # Errors
    ///
    /// Returns `LrsError::Client` if the HTTP client cannot be created.
    pub fn new(config: LrsConfig) -> Result<Self, LrsError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        let statements_url = config.statements_url();
        Ok(Self {
            http,
            config,
            statements_url,
        })
    }

    pub fn config(&self) -> &LrsConfig {
        &self.config
    }
}

impl RemoteSink for LrsClient {
    async fn save(&self, statement: &Statement) -> Result<SaveReceipt, SinkError> {
        let response = self
            .http
            .post(&self.statements_url)
            .basic_auth(&self.config.username, Some(&self.config.password))
            .header("X-Experience-API-Version", &self.config.version)
            .json(statement)
            .send()
            .await
            .map_err(|e| SinkError::Transport(e.to_string()))?;

        let status = response.status();
        let detail = response
            .text()
            .await
            .map_err(|e| SinkError::Transport(e.to_string()))?;

        if !status.is_success() {
            return Err(SinkError::Rejected {
                status: status.as_u16(),
                detail,
            });
        }

        tracing::trace!(statement_id = %statement.id(), %status, "LRS accepted statement");
        Ok(SaveReceipt { detail })
    }
}
