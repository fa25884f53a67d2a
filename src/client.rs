use std::fmt;

use log::{debug, error};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, USER_AGENT};
use reqwest::Method;
use serde::Serialize;
use serde_json::Value;

use crate::config::GitHubConfig;
use crate::error::{MilestonerError, Result};
use crate::types::Repository;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verb {
    Get,
    Post,
    Patch,
    Delete,
}

impl Verb {
    fn method(self) -> Method {
        match self {
            Verb::Get => Method::GET,
            Verb::Post => Method::POST,
            Verb::Patch => Method::PATCH,
            Verb::Delete => Method::DELETE,
        }
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.method().as_str())
    }
}

/// Outcome of a single API call.
///
/// Requests never fail loudly: an error status, an unreadable body or a
/// transport problem all come back as `Failure` with whatever the server (or
/// the transport) had to say, so callers can log it and move on.
#[derive(Debug, Clone, PartialEq)]
pub enum ApiResponse {
    Success(Value),
    Failure {
        /// `None` when no response was received at all.
        status: Option<u16>,
        payload: Value,
    },
}

impl ApiResponse {
    pub fn is_success(&self) -> bool {
        matches!(self, ApiResponse::Success(_))
    }

    pub fn payload(&self) -> &Value {
        match self {
            ApiResponse::Success(payload) => payload,
            ApiResponse::Failure { payload, .. } => payload,
        }
    }
}

pub struct GitHubClient {
    client: reqwest::Client,
    config: GitHubConfig,
}

impl GitHubClient {
    pub fn new() -> Result<Self> {
        Self::with_config(GitHubConfig::default())
    }

    /// Reads the API token from the environment variable named in `config`.
    pub fn with_config(config: GitHubConfig) -> Result<Self> {
        let token = std::env::var(&config.token_env_var).map_err(|_| {
            MilestonerError::AuthError(format!(
                "{} environment variable not set",
                config.token_env_var
            ))
        })?;

        Self::with_token(config, &token)
    }

    pub fn with_token(config: GitHubConfig, token: &str) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("token {}", token))
                .map_err(|e| MilestonerError::ConfigError(format!("Invalid token: {}", e)))?,
        );
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&config.user_agent)
                .map_err(|e| MilestonerError::ConfigError(format!("Invalid user agent: {}", e)))?,
        );
        headers.insert(ACCEPT, HeaderValue::from_static("application/vnd.github+json"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.timeout())
            .build()?;

        Ok(Self { client, config })
    }

    /// `<api base>/repos/<owner>/<repo>/<path>`
    pub fn repo_url(&self, repo: &Repository, path: &str) -> String {
        format!(
            "{}/repos/{}/{}/{}",
            self.config.api_base_url.trim_end_matches('/'),
            repo.owner,
            repo.name,
            path.trim_start_matches('/')
        )
    }

    pub async fn request<B>(
        &self,
        repo: &Repository,
        verb: Verb,
        path: &str,
        body: Option<&B>,
        query: Option<&[(&str, &str)]>,
    ) -> ApiResponse
    where
        B: Serialize + ?Sized,
    {
        let url = self.repo_url(repo, path);
        debug!("{} {}", verb, url);

        let mut builder = self.client.request(verb.method(), &url);
        if let Some(query) = query {
            builder = builder.query(query);
        }
        if let Some(body) = body {
            builder = builder.json(body);
        }

        let response = match builder.send().await {
            Ok(response) => response,
            Err(e) => {
                error!("Request failed for {} {}: {}", verb, url, e);
                return ApiResponse::Failure {
                    status: None,
                    payload: Value::String(e.to_string()),
                };
            }
        };

        let status = response.status();
        let text = match response.text().await {
            Ok(text) => text,
            Err(e) => {
                error!("Failed to read response for {} {}: {}", verb, url, e);
                return ApiResponse::Failure {
                    status: Some(status.as_u16()),
                    payload: Value::String(e.to_string()),
                };
            }
        };

        let decoded = if text.trim().is_empty() {
            Ok(Value::Null)
        } else {
            serde_json::from_str::<Value>(&text)
        };

        match decoded {
            Ok(payload) if !status.is_client_error() && !status.is_server_error() => {
                ApiResponse::Success(payload)
            }
            Ok(payload) => {
                error!("Request failed for {} {} ({})", verb, url, status);
                error!("{}", payload);
                ApiResponse::Failure {
                    status: Some(status.as_u16()),
                    payload,
                }
            }
            Err(e) => {
                error!(
                    "Undecodable response for {} {} ({}): {}",
                    verb, url, status, e
                );
                ApiResponse::Failure {
                    status: Some(status.as_u16()),
                    payload: Value::String(text),
                }
            }
        }
    }
}
