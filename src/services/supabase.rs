// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Supabase (PostgREST) client for report submission.
//!
//! Handles:
//! - Inserting a single report into the reports table
//! - Classifying failures as retryable (transport, 5xx, 408/429/401)
//!   or terminal (every other 4xx)

use crate::config::Config;
use crate::models::ActivityReport;
use crate::services::sync::ReportSubmitter;
use reqwest::StatusCode;

/// Longest backend error body kept in `last_error`.
const MAX_ERROR_BODY_LEN: usize = 300;

/// Supabase REST client.
#[derive(Clone)]
pub struct SupabaseClient {
    http: reqwest::Client,
    insert_url: String,
    anon_key: String,
    bearer_token: String,
}

impl SupabaseClient {
    /// Create a client for the configured project and table.
    pub fn new(config: &Config) -> Result<Self, SubmitError> {
        let http = reqwest::Client::builder()
            .timeout(config.submit_timeout)
            .build()
            .map_err(|e| SubmitError::Network(format!("HTTP client error: {}", e)))?;

        Ok(Self {
            http,
            insert_url: format!(
                "{}/rest/v1/{}",
                config.supabase_url.trim_end_matches('/'),
                config.reports_table
            ),
            anon_key: config.supabase_anon_key.clone(),
            bearer_token: config.bearer_token().to_string(),
        })
    }

    /// Insert one report row.
    pub async fn insert_report(&self, report: &ActivityReport) -> Result<(), SubmitError> {
        let response = self
            .http
            .post(&self.insert_url)
            .header("apikey", &self.anon_key)
            .bearer_auth(&self.bearer_token)
            .header("Prefer", "return=minimal")
            .json(&[report])
            .send()
            .await
            .map_err(|e| SubmitError::Network(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        let err = SubmitError::from_response(status, &body);
        tracing::warn!(
            status = status.as_u16(),
            retryable = err.is_retryable(),
            error = %err,
            "Report insert failed"
        );
        Err(err)
    }
}

impl ReportSubmitter for SupabaseClient {
    async fn submit(&self, report: &ActivityReport) -> Result<(), SubmitError> {
        self.insert_report(report).await
    }
}

/// Submission failure, classified by whether retrying can help.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SubmitError {
    /// Connection, DNS, TLS, or timeout failure
    #[error("Network error: {0}")]
    Network(String),

    /// Backend reachable but temporarily unable to accept the report
    #[error("Backend unavailable (HTTP {status}): {message}")]
    Unavailable { status: u16, message: String },

    /// Backend refused the report; resending the same payload will fail again
    #[error("Report rejected (HTTP {status}): {message}")]
    Rejected { status: u16, message: String },
}

impl SubmitError {
    /// Classify a non-success HTTP response.
    pub fn from_response(status: StatusCode, body: &str) -> Self {
        let message = error_message(body);
        let code = status.as_u16();

        let retryable = status.is_server_error()
            || status == StatusCode::REQUEST_TIMEOUT
            || status == StatusCode::TOO_MANY_REQUESTS
            // Expired session; the shell refreshes it and we try again
            || status == StatusCode::UNAUTHORIZED;

        if retryable {
            SubmitError::Unavailable {
                status: code,
                message,
            }
        } else {
            SubmitError::Rejected {
                status: code,
                message,
            }
        }
    }

    pub fn is_retryable(&self) -> bool {
        !matches!(self, SubmitError::Rejected { .. })
    }
}

/// Pull `message` out of a PostgREST error body, falling back to the raw text.
fn error_message(body: &str) -> String {
    let message = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(String::from))
        .unwrap_or_else(|| body.trim().to_string());

    if message.len() > MAX_ERROR_BODY_LEN {
        let mut end = MAX_ERROR_BODY_LEN;
        while !message.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}...", &message[..end])
    } else {
        message
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_errors_are_retryable() {
        for code in [500, 502, 503, 504] {
            let err = SubmitError::from_response(StatusCode::from_u16(code).unwrap(), "");
            assert!(err.is_retryable(), "{} should be retryable", code);
        }
    }

    #[test]
    fn test_throttle_timeout_and_auth_are_retryable() {
        for status in [
            StatusCode::TOO_MANY_REQUESTS,
            StatusCode::REQUEST_TIMEOUT,
            StatusCode::UNAUTHORIZED,
        ] {
            assert!(SubmitError::from_response(status, "").is_retryable());
        }
    }

    #[test]
    fn test_validation_errors_are_terminal() {
        let body = r#"{"code":"23502","message":"null value in column \"latitude\" violates not-null constraint"}"#;
        let err = SubmitError::from_response(StatusCode::BAD_REQUEST, body);
        assert!(!err.is_retryable());
        assert_eq!(
            err,
            SubmitError::Rejected {
                status: 400,
                message: "null value in column \"latitude\" violates not-null constraint"
                    .to_string(),
            }
        );

        let err = SubmitError::from_response(StatusCode::FORBIDDEN, "denied by policy");
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_network_errors_are_retryable() {
        assert!(SubmitError::Network("connection refused".to_string()).is_retryable());
    }

    #[test]
    fn test_long_bodies_are_truncated() {
        let body = "x".repeat(1000);
        let message = error_message(&body);
        assert_eq!(message.len(), MAX_ERROR_BODY_LEN + 3);
        assert!(message.ends_with("..."));
    }

    #[test]
    fn test_insert_url() {
        let config = Config {
            supabase_url: "https://abc.supabase.co/".to_string(),
            ..Config::default()
        };
        let client = SupabaseClient::new(&config).unwrap();
        assert_eq!(
            client.insert_url,
            "https://abc.supabase.co/rest/v1/activity_reports"
        );
    }
}
