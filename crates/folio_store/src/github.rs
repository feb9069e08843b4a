//! GitHub contents API backend
//!
//! Every path maps to `/repos/{owner}/{repo}/contents/{path}` on one branch.
//! Version tags are blob shas.

use crate::{
    validate_path, ContentStore, Credential, DeleteOutcome, RemoteFile, Result, StoreError,
    VersionTag, WriteOutcome,
};
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use reqwest::{header, Client, StatusCode, Url};
use serde::{Deserialize, Serialize};
use std::time::Duration;

const API_VERSION: &str = "2022-11-28";

/// Which repository and branch the store addresses
#[derive(Debug, Clone)]
pub struct GithubTarget {
    pub api_base: String,
    pub owner: String,
    pub repo: String,
    pub branch: String,
}

/// Content store backed by a GitHub repository
pub struct GithubStore {
    client: Client,
    target: GithubTarget,
    credential: Credential,
}

#[derive(Debug, Deserialize)]
struct ContentResponse {
    sha: String,
    #[serde(default)]
    content: String,
    #[serde(default)]
    encoding: String,
}

#[derive(Debug, Deserialize)]
struct VersionResponse {
    sha: String,
}

#[derive(Debug, Deserialize)]
struct WriteResponse {
    content: WrittenContent,
}

#[derive(Debug, Deserialize)]
struct WrittenContent {
    sha: String,
}

#[derive(Debug, Serialize)]
struct WriteRequest<'a> {
    message: &'a str,
    content: String,
    branch: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    sha: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct DeleteRequest<'a> {
    message: &'a str,
    sha: &'a str,
    branch: &'a str,
}

impl GithubStore {
    pub fn new(target: GithubTarget, credential: Credential) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(concat!("folio/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            target,
            credential,
        })
    }

    fn contents_url(&self, path: &str) -> Result<Url> {
        validate_path(path)?;

        let mut url = Url::parse(&self.target.api_base)
            .map_err(|e| StoreError::InvalidPath(format!("{}: {}", self.target.api_base, e)))?;
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| StoreError::InvalidPath(self.target.api_base.clone()))?;
            segments.pop_if_empty();
            segments.extend(["repos", self.target.owner.as_str(), self.target.repo.as_str(), "contents"]);
            segments.extend(path.split('/'));
        }
        Ok(url)
    }

    fn request(&self, method: reqwest::Method, url: Url) -> reqwest::RequestBuilder {
        self.client
            .request(method, url)
            .bearer_auth(self.credential.token())
            .header(header::ACCEPT, "application/vnd.github+json")
            .header("X-GitHub-Api-Version", API_VERSION)
    }

    /// GET on the contents endpoint; `Ok(None)` on 404
    async fn get_contents(&self, path: &str) -> Result<Option<reqwest::Response>> {
        let mut url = self.contents_url(path)?;
        url.query_pairs_mut().append_pair("ref", &self.target.branch);

        let response = self.request(reqwest::Method::GET, url).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            tracing::debug!("get {}: absent", path);
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(Self::api_error(path, response).await);
        }
        Ok(Some(response))
    }

    async fn api_error(path: &str, response: reqwest::Response) -> StoreError {
        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            return StoreError::Unauthorized;
        }
        let message = response.text().await.unwrap_or_default();
        StoreError::Api {
            status: status.as_u16(),
            path: path.to_string(),
            message,
        }
    }
}

/// Decode a contents response carrying inline base64 content.
///
/// Files over 1 MB come back with encoding `"none"` and no content; those
/// are reported as a payload error rather than silently empty.
fn decode_content(path: &str, body: &[u8]) -> Result<RemoteFile> {
    let body: ContentResponse = serde_json::from_slice(body)?;
    if body.encoding != "base64" {
        return Err(StoreError::Payload {
            path: path.to_string(),
            message: format!("unsupported encoding {:?}", body.encoding),
        });
    }

    // The API wraps base64 at 60 columns
    let packed: String = body.content.split_whitespace().collect();
    let content = STANDARD.decode(packed).map_err(|e| StoreError::Payload {
        path: path.to_string(),
        message: e.to_string(),
    })?;

    Ok(RemoteFile {
        content,
        version: VersionTag(body.sha),
    })
}

#[async_trait]
impl ContentStore for GithubStore {
    async fn fetch(&self, path: &str) -> Result<Option<RemoteFile>> {
        let Some(response) = self.get_contents(path).await? else {
            return Ok(None);
        };
        let file = decode_content(path, &response.bytes().await?)?;
        tracing::debug!("fetch {}: {} bytes @ {}", path, file.content.len(), file.version);
        Ok(Some(file))
    }

    /// Reads only the sha, so files too large for inline content still resolve
    async fn version_of(&self, path: &str) -> Result<Option<VersionTag>> {
        let Some(response) = self.get_contents(path).await? else {
            return Ok(None);
        };
        let body: VersionResponse = serde_json::from_slice(&response.bytes().await?)?;
        Ok(Some(VersionTag(body.sha)))
    }

    async fn write(
        &self,
        path: &str,
        content: &[u8],
        expected: Option<&VersionTag>,
        message: &str,
    ) -> Result<WriteOutcome> {
        let url = self.contents_url(path)?;
        let body = WriteRequest {
            message,
            content: STANDARD.encode(content),
            branch: &self.target.branch,
            sha: expected.map(|v| v.as_str()),
        };

        let response = self
            .request(reqwest::Method::PUT, url)
            .json(&body)
            .send()
            .await?;

        match response.status() {
            s if s.is_success() => {
                let written: WriteResponse = response.json().await?;
                tracing::debug!("write {}: {} bytes -> {}", path, content.len(), written.content.sha);
                Ok(WriteOutcome::Written(VersionTag(written.content.sha)))
            }
            // 409: sha mismatch; 422: sha missing for an existing file
            StatusCode::CONFLICT | StatusCode::UNPROCESSABLE_ENTITY => {
                tracing::warn!("write {}: version conflict (expected {:?})", path, expected);
                let current = self.version_of(path).await.ok().flatten();
                Ok(WriteOutcome::Conflict { current })
            }
            _ => Err(Self::api_error(path, response).await),
        }
    }

    async fn delete(&self, path: &str, message: &str) -> Result<DeleteOutcome> {
        let version = match self.version_of(path).await? {
            Some(version) => version,
            None => return Ok(DeleteOutcome::AlreadyAbsent),
        };

        let url = self.contents_url(path)?;
        let body = DeleteRequest {
            message,
            sha: version.as_str(),
            branch: &self.target.branch,
        };

        let response = self
            .request(reqwest::Method::DELETE, url)
            .json(&body)
            .send()
            .await?;

        match response.status() {
            s if s.is_success() => {
                tracing::debug!("delete {}", path);
                Ok(DeleteOutcome::Deleted)
            }
            StatusCode::NOT_FOUND => Ok(DeleteOutcome::AlreadyAbsent),
            _ => Err(Self::api_error(path, response).await),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(api_base: &str) -> GithubStore {
        GithubStore::new(
            GithubTarget {
                api_base: api_base.to_string(),
                owner: "me".into(),
                repo: "site".into(),
                branch: "main".into(),
            },
            Credential::new("token").unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn test_contents_url() {
        let url = store("https://api.github.com").contents_url("photos/trips/001.jpg").unwrap();
        assert_eq!(
            url.as_str(),
            "https://api.github.com/repos/me/site/contents/photos/trips/001.jpg"
        );

        let url = store("https://ghe.local/api/v3/").contents_url("photos.json").unwrap();
        assert_eq!(url.as_str(), "https://ghe.local/api/v3/repos/me/site/contents/photos.json");
    }

    #[test]
    fn test_contents_url_rejects_traversal() {
        assert!(store("https://api.github.com").contents_url("../x").is_err());
    }

    #[test]
    fn test_decode_wrapped_content() {
        let body = br#"{"sha":"abc","encoding":"base64","content":"e30\n=\n"}"#;
        let file = decode_content("photos.json", body).unwrap();
        assert_eq!(file.content, b"{}");
        assert_eq!(file.version.as_str(), "abc");
    }

    #[test]
    fn test_large_file_still_has_version() {
        // Shape of a response for a blob over 1 MB
        let body = br#"{"sha":"f00d","size":2400000,"encoding":"none","content":""}"#;
        assert!(matches!(
            decode_content("photos/001.jpg", body),
            Err(StoreError::Payload { .. })
        ));

        let version: VersionResponse = serde_json::from_slice(body).unwrap();
        assert_eq!(version.sha, "f00d");
    }

    #[test]
    fn test_write_request_omits_missing_sha() {
        let body = WriteRequest {
            message: "m",
            content: STANDARD.encode(b"{}"),
            branch: "main",
            sha: None,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert!(json.get("sha").is_none());
        assert_eq!(json["content"], "e30=");
    }
}
