use anyhow::{Context, Result};
use reqwest::Client;
use serde_json::Value;
use std::collections::HashSet;
use std::time::Duration;

use super::cftc::value_as_f64;
use super::ApiError;
use crate::models::{normalize_symbol, RetailOutlook};
use crate::settings::MYFXBOOK_API_BASE;

const LOGIN_TIMEOUT_SECS: u64 = 15;
const OUTLOOK_TIMEOUT_SECS: u64 = 20;
const LOGOUT_TIMEOUT_SECS: u64 = 10;

/// Client for the Myfxbook community outlook (retail positioning)
#[derive(Clone)]
pub struct MyfxbookClient {
    client: Client,
    base_url: String,
}

impl MyfxbookClient {
    pub fn new() -> Self {
        Self::with_base_url(MYFXBOOK_API_BASE)
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Log in, read the community outlook, log out
    pub async fn community_outlook(&self, email: &str, password: &str) -> Result<Vec<RetailOutlook>> {
        let session = self.login(email, password).await?;

        let payload: Value = self
            .client
            .get(format!("{}/get-community-outlook.json", self.base_url))
            .query(&[("session", session.as_str())])
            .timeout(Duration::from_secs(OUTLOOK_TIMEOUT_SECS))
            .send()
            .await
            .context("Myfxbook outlook request failed")?
            .error_for_status()
            .context("Myfxbook outlook returned error status")?
            .json()
            .await
            .context("Failed to parse Myfxbook outlook")?;

        self.logout(&session).await;

        let outlook = parse_outlook(&payload);
        tracing::debug!("Myfxbook outlook: {} symbols", outlook.len());
        Ok(outlook)
    }

    async fn login(&self, email: &str, password: &str) -> Result<String> {
        let body: Value = self
            .client
            .get(format!("{}/login.json", self.base_url))
            .query(&[("email", email), ("password", password)])
            .timeout(Duration::from_secs(LOGIN_TIMEOUT_SECS))
            .send()
            .await
            .context("Myfxbook login request failed")?
            .error_for_status()
            .context("Myfxbook login returned error status")?
            .json()
            .await
            .context("Failed to parse Myfxbook login response")?;

        if body.get("error").and_then(Value::as_bool).unwrap_or(false) {
            let message = body
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("unknown error")
                .to_string();
            return Err(ApiError::LoginRejected(message).into());
        }

        body.get("session")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .ok_or_else(|| ApiError::MissingSession.into())
    }

    /// Best effort; a failed logout only costs a dangling session
    async fn logout(&self, session: &str) {
        let result = self
            .client
            .get(format!("{}/logout.json", self.base_url))
            .query(&[("session", session)])
            .timeout(Duration::from_secs(LOGOUT_TIMEOUT_SECS))
            .send()
            .await;

        if let Err(e) = result {
            tracing::warn!("Myfxbook logout failed: {}", e);
        }
    }
}

impl Default for MyfxbookClient {
    fn default() -> Self {
        Self::new()
    }
}

/// Turn an outlook payload into one entry per symbol (first occurrence wins)
pub fn parse_outlook(payload: &Value) -> Vec<RetailOutlook> {
    let items = non_empty_array(payload, "symbols")
        .or_else(|| non_empty_array(payload, "data"))
        .unwrap_or(&[]);

    let mut seen = HashSet::new();
    let mut outlook = Vec::new();

    for item in items {
        let name = first_str(item, &["name", "symbol"]).unwrap_or_default();
        let symbol = normalize_symbol(name);
        if symbol.is_empty() || !seen.insert(symbol.clone()) {
            continue;
        }

        outlook.push(RetailOutlook {
            symbol,
            long_pct: first_number(item, &["longPercentage", "long"]),
            short_pct: first_number(item, &["shortPercentage", "short"]),
        });
    }

    outlook
}

fn non_empty_array<'a>(payload: &'a Value, key: &str) -> Option<&'a [Value]> {
    payload
        .get(key)
        .and_then(Value::as_array)
        .filter(|a| !a.is_empty())
        .map(Vec::as_slice)
}

fn first_str<'a>(item: &'a Value, keys: &[&str]) -> Option<&'a str> {
    keys.iter()
        .filter_map(|k| item.get(*k).and_then(Value::as_str))
        .find(|s| !s.is_empty())
}

/// First key holding a non-zero number; 0 when none do
fn first_number(item: &Value, keys: &[&str]) -> f64 {
    keys.iter()
        .filter_map(|k| item.get(*k).and_then(value_as_f64))
        .find(|v| *v != 0.0)
        .unwrap_or(0.0)
}
