use crate::core::rate_limit::WriteLimiter;
use crate::domain::model::{Entry, Record};
use crate::domain::ports::RecordStore;
use crate::utils::error::{RelayError, Result};
use crate::utils::validation::validate_url;
use reqwest::{Client, Method};
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;

/// Outbound request described by the `/http` endpoint's query parameters.
#[derive(Debug, Clone)]
pub struct ProxyRequest {
    pub id: String,
    pub url: String,
    pub method: Option<String>,
    pub headers: Option<String>,
    pub token: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ProxyOutcome {
    pub file_url: String,
    pub upstream_status: u16,
}

/// Request-per-call relay over a [`RecordStore`]. Every operation runs the
/// same sequence: parse input, optional outbound call, read the current
/// record, mutate it in memory, write it back.
pub struct RelayService<S: RecordStore> {
    store: S,
    client: Client,
    limiter: WriteLimiter,
    retry_limit: u32,
    outbound_timeout: Option<Duration>,
}

impl<S: RecordStore> RelayService<S> {
    pub fn new(
        store: S,
        write_interval: Duration,
        retry_limit: u32,
        outbound_timeout: Option<Duration>,
    ) -> Self {
        Self {
            store,
            client: Client::new(),
            limiter: WriteLimiter::new(write_interval),
            retry_limit,
            outbound_timeout,
        }
    }

    /// Appends `{timestamp, message}` to the record's message list and
    /// returns the location URL of the committed file.
    pub async fn append_message(&self, id: &str, message: &str) -> Result<String> {
        require_non_empty("id", id)?;
        require_non_empty("message", message)?;
        self.limiter.check(id)?;

        tracing::info!("📥 Appending message to '{}'", id);
        let entry = Entry::message(message.to_string());
        self.mutate(id, "Updated message inbox", move |record| {
            record.messages.push(entry.clone());
        })
        .await
    }

    /// Performs the outbound call described by `request`, then appends
    /// `{timestamp, token, response}` to the record's response list.
    /// Outbound failures and store failures stay distinct error variants.
    pub async fn proxy_and_record(&self, request: ProxyRequest) -> Result<ProxyOutcome> {
        require_non_empty("id", &request.id)?;
        require_non_empty("url", &request.url)?;
        validate_url("url", &request.url).map_err(|e| match e {
            RelayError::Config { message, .. } => RelayError::InvalidInput {
                field: "url".to_string(),
                reason: message,
            },
            other => other,
        })?;
        let method = parse_method(request.method.as_deref())?;
        let headers = parse_headers(request.headers.as_deref())?;

        tracing::info!("📡 Proxying {} {} for '{}'", method, request.url, request.id);
        let (status, body) = self.call_outbound(method, &request.url, headers).await?;

        let entry = Entry::response(body, request.token.clone());
        let file_url = self
            .mutate(&request.id, "Recorded proxied response", move |record| {
                record.responses.push(entry.clone());
            })
            .await?;

        Ok(ProxyOutcome {
            file_url,
            upstream_status: status,
        })
    }

    /// Reads the current record for `id`. Missing records come back empty.
    pub async fn read_record(&self, id: &str) -> Result<Record> {
        require_non_empty("id", id)?;
        let (record, _) = self.store.fetch(id).await?;
        Ok(record)
    }

    async fn call_outbound(
        &self,
        method: Method,
        url: &str,
        headers: HashMap<String, String>,
    ) -> Result<(u16, Value)> {
        let mut outbound = self.client.request(method, url);
        for (key, value) in headers {
            outbound = outbound.header(key, value);
        }
        if let Some(timeout) = self.outbound_timeout {
            outbound = outbound.timeout(timeout);
        }

        let response = outbound.send().await.map_err(|e| RelayError::Outbound {
            reason: e.to_string(),
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(RelayError::Outbound {
                reason: format!("target returned status {}", status.as_u16()),
            });
        }

        let text = response.text().await.map_err(|e| RelayError::Outbound {
            reason: format!("target body unreadable: {}", e),
        })?;
        // Non-JSON bodies are kept verbatim as a JSON string.
        let body = serde_json::from_str(&text).unwrap_or(Value::String(text));
        Ok((status.as_u16(), body))
    }

    /// Read-modify-write with bounded optimistic retry: on a write conflict
    /// the record is re-read and the mutation reapplied. When the backend
    /// accepts a stale write instead of rejecting it, last writer wins; that
    /// residual race is inherent to the revision-token protocol.
    async fn mutate<F>(&self, id: &str, commit_message: &str, apply: F) -> Result<String>
    where
        F: Fn(&mut Record),
    {
        let mut attempt = 0;
        loop {
            let (mut record, revision) = self.store.fetch(id).await?;
            apply(&mut record);

            match self
                .store
                .commit(id, &record, revision.as_ref(), commit_message)
                .await
            {
                Ok(location) => {
                    tracing::info!("💾 Committed '{}' to {}", id, location);
                    return Ok(location);
                }
                Err(RelayError::WriteConflict { .. }) if attempt < self.retry_limit => {
                    attempt += 1;
                    tracing::warn!(
                        "🔄 Write conflict on '{}', retrying ({}/{})",
                        id,
                        attempt,
                        self.retry_limit
                    );
                }
                Err(e) => return Err(e),
            }
        }
    }
}

fn require_non_empty(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(RelayError::InvalidInput {
            field: field.to_string(),
            reason: "must be a non-empty string".to_string(),
        });
    }
    Ok(())
}

fn parse_method(method: Option<&str>) -> Result<Method> {
    match method {
        None => Ok(Method::GET),
        Some(name) => name
            .to_ascii_uppercase()
            .parse()
            .map_err(|_| RelayError::InvalidInput {
                field: "method".to_string(),
                reason: format!("'{}' is not an HTTP method", name),
            }),
    }
}

/// Headers arrive as a URL-encoded JSON object string, e.g.
/// `{"X-Api-Key": "secret"}`.
fn parse_headers(headers: Option<&str>) -> Result<HashMap<String, String>> {
    match headers {
        None => Ok(HashMap::new()),
        Some(raw) => serde_json::from_str(raw).map_err(|e| RelayError::InvalidInput {
            field: "headers".to_string(),
            reason: format!("not a JSON object of strings: {}", e),
        }),
    }
}
