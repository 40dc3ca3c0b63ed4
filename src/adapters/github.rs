use crate::domain::model::{Record, Revision};
use crate::domain::ports::RecordStore;
use crate::utils::error::{RelayError, Result};
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

const USER_AGENT: &str = concat!("datanet-relay/", env!("CARGO_PKG_VERSION"));
const ACCEPT: &str = "application/vnd.github+json";

/// Record store backed by the GitHub Contents API. Each record lives at
/// `<base_path><id>.json`; the blob `sha` returned on read is the revision
/// a conditional write must carry.
#[derive(Debug, Clone)]
pub struct GithubContentStore {
    client: Client,
    api_base: String,
    owner: String,
    repo: String,
    base_path: String,
    token: String,
}

#[derive(Debug, Deserialize)]
struct ContentsResponse {
    content: Option<String>,
    sha: String,
}

#[derive(Debug, Serialize)]
struct CommitRequest<'a> {
    message: &'a str,
    content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    sha: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct CommitResponse {
    content: CommittedFile,
}

#[derive(Debug, Deserialize)]
struct CommittedFile {
    html_url: String,
}

impl GithubContentStore {
    pub fn new(
        api_base: String,
        owner: String,
        repo: String,
        base_path: String,
        token: String,
    ) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| RelayError::Config {
                field: "http_client".to_string(),
                message: e.to_string(),
            })?;

        let base_path = if base_path.is_empty() || base_path.ends_with('/') {
            base_path
        } else {
            format!("{}/", base_path)
        };

        Ok(Self {
            client,
            api_base,
            owner,
            repo,
            base_path,
            token,
        })
    }

    fn contents_url(&self, id: &str) -> String {
        format!(
            "{}/repos/{}/{}/contents/{}{}.json",
            self.api_base, self.owner, self.repo, self.base_path, id
        )
    }

    fn auth_header(&self) -> String {
        format!("token {}", self.token)
    }
}

#[async_trait]
impl RecordStore for GithubContentStore {
    async fn fetch(&self, id: &str) -> Result<(Record, Option<Revision>)> {
        let url = self.contents_url(id);
        tracing::debug!("📡 Reading record from: {}", url);

        let response = self
            .client
            .get(&url)
            .header("Authorization", self.auth_header())
            .header("Accept", ACCEPT)
            .send()
            .await
            .map_err(|e| RelayError::StoreRead {
                status: None,
                details: e.to_string(),
            })?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            // Record does not exist yet; caller creates it on first write.
            tracing::debug!("Record '{}' not found, starting empty", id);
            return Ok((Record::default(), None));
        }
        if !status.is_success() {
            let details = response.text().await.unwrap_or_default();
            return Err(RelayError::StoreRead {
                status: Some(status.as_u16()),
                details,
            });
        }

        let body: ContentsResponse =
            response.json().await.map_err(|e| RelayError::StoreRead {
                status: None,
                details: format!("contents response does not parse: {}", e),
            })?;

        // The API wraps base64 content in newlines.
        let encoded: String = body
            .content
            .unwrap_or_default()
            .split_whitespace()
            .collect();
        let raw = BASE64
            .decode(encoded)
            .map_err(|e| RelayError::MalformedRecord {
                reason: format!("content is not base64: {}", e),
            })?;
        let value = serde_json::from_slice(&raw).map_err(|e| RelayError::MalformedRecord {
            reason: format!("content is not JSON: {}", e),
        })?;

        let record = Record::from_json(value)?;
        Ok((record, Some(Revision::new(body.sha))))
    }

    async fn commit(
        &self,
        id: &str,
        record: &Record,
        base: Option<&Revision>,
        commit_message: &str,
    ) -> Result<String> {
        let url = self.contents_url(id);
        let serialized = serde_json::to_string_pretty(record)?;
        let request = CommitRequest {
            message: commit_message,
            content: BASE64.encode(serialized),
            sha: base.map(Revision::as_str),
        };

        tracing::debug!("📡 Writing record to: {}", url);
        let response = self
            .client
            .put(&url)
            .header("Authorization", self.auth_header())
            .header("Accept", ACCEPT)
            .json(&request)
            .send()
            .await
            .map_err(|e| RelayError::StoreWrite {
                status: None,
                details: e.to_string(),
            })?;

        let status = response.status();
        if status == StatusCode::CONFLICT {
            return Err(RelayError::WriteConflict { id: id.to_string() });
        }
        if !status.is_success() {
            let details = response.text().await.unwrap_or_default();
            return Err(RelayError::StoreWrite {
                status: Some(status.as_u16()),
                details,
            });
        }

        let body: CommitResponse =
            response.json().await.map_err(|e| RelayError::StoreWrite {
                status: None,
                details: format!("commit response does not parse: {}", e),
            })?;

        Ok(body.content.html_url)
    }
}
