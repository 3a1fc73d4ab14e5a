use std::time::Duration;

use async_trait::async_trait;
use lookout_core::{
    ChangedFile, CommentKind, ExistingComment, GitHubConfig, LookoutError, PullRequest,
};
use reqwest::header::HeaderMap;
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, warn};

/// Every hosting API call the review pipeline makes, one method per REST call.
///
/// Implementations report transport failures and non-2xx statuses as
/// [`LookoutError::Hosting`]; deciding whether to continue is the caller's job.
#[async_trait]
pub trait HostingApi: Send + Sync {
    /// `GET /pulls/{n}`.
    async fn pull_request(&self, pr: u64) -> Result<PullRequest, LookoutError>;

    /// `GET /pulls/{n}/files`, all pages.
    async fn list_files(&self, pr: u64) -> Result<Vec<ChangedFile>, LookoutError>;

    /// `GET /pulls/{n}/commits`, all pages, returning SHAs oldest first.
    async fn list_commits(&self, pr: u64) -> Result<Vec<String>, LookoutError>;

    /// `GET /issues/{n}/comments`, all pages.
    async fn list_issue_comments(&self, pr: u64) -> Result<Vec<ExistingComment>, LookoutError>;

    /// `GET /pulls/{n}/comments`, all pages.
    async fn list_review_comments(&self, pr: u64) -> Result<Vec<ExistingComment>, LookoutError>;

    /// `POST /issues/{n}/comments`, returning the new comment id.
    async fn create_issue_comment(&self, pr: u64, body: &str) -> Result<u64, LookoutError>;

    /// `POST /pulls/{n}/comments` anchored at a diff position, returning the new comment id.
    async fn create_review_comment(
        &self,
        pr: u64,
        commit_sha: &str,
        path: &str,
        position: u32,
        body: &str,
    ) -> Result<u64, LookoutError>;

    /// `POST /pulls/{n}/reviews` with `event: APPROVE`.
    async fn approve(&self, pr: u64, body: &str) -> Result<(), LookoutError>;

    /// `DELETE /issues/comments/{id}` or `DELETE /pulls/comments/{id}`, by kind.
    async fn delete_comment(&self, kind: CommentKind, id: u64) -> Result<(), LookoutError>;
}

/// GitHub REST client.
///
/// All requests go through one `reqwest::Client` rooted at
/// [`GitHubConfig::api_url`], which makes GitHub Enterprise and local test
/// servers work the same way as github.com.
///
/// # Examples
///
/// ```
/// use lookout_core::GitHubConfig;
/// use lookout_review::github::GitHubClient;
///
/// let config = GitHubConfig {
///     repository: Some("octocat/hello-world".into()),
///     token: Some("ghp_xxxx".into()),
///     ..GitHubConfig::default()
/// };
/// let client = GitHubClient::new(&config).unwrap();
/// assert_eq!(client.repository(), Some("octocat/hello-world".to_string()));
/// ```
pub struct GitHubClient {
    http: reqwest::Client,
    api_url: String,
    /// `(owner, name)`; unset when the configured repository was missing or
    /// malformed.
    repository: Option<(String, String)>,
    token: Option<String>,
}

impl GitHubClient {
    /// Create a client for the configured repository.
    ///
    /// A missing token is allowed; requests then go out unauthenticated and
    /// fail the way the API decides. A missing or malformed repository is
    /// logged, and every call then fails with [`LookoutError::Hosting`].
    ///
    /// # Errors
    ///
    /// Returns [`LookoutError::Hosting`] if the HTTP client cannot be built.
    pub fn new(config: &GitHubConfig) -> Result<Self, LookoutError> {
        let repository = match config.repository.as_deref().map(parse_repository) {
            Some(Ok(parts)) => Some(parts),
            Some(Err(e)) => {
                warn!(error = %e, "hosting API calls will fail");
                None
            }
            None => {
                warn!(
                    "no repository configured (set GITHUB_REPOSITORY or pass --repo), \
                     hosting API calls will fail"
                );
                None
            }
        };

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(concat!("lookout/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| LookoutError::Hosting(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            http,
            api_url: config.api_url.trim_end_matches('/').to_string(),
            repository,
            token: config.token.clone(),
        })
    }

    /// Repository in `owner/name` form.
    pub fn repository(&self) -> Option<String> {
        self.repository
            .as_ref()
            .map(|(owner, repo)| format!("{owner}/{repo}"))
    }

    fn repo_url(&self, path: &str) -> Result<String, LookoutError> {
        let (owner, repo) = self
            .repository
            .as_ref()
            .ok_or_else(|| LookoutError::Hosting("no repository configured".into()))?;
        Ok(format!("{}/repos/{owner}/{repo}/{path}", self.api_url))
    }

    async fn send(
        &self,
        method: Method,
        url: &str,
        body: Option<&serde_json::Value>,
    ) -> Result<reqwest::Response, LookoutError> {
        debug!(%method, url, "github request");
        let mut request = self
            .http
            .request(method.clone(), url)
            .header("Accept", "application/vnd.github+json")
            .header("X-GitHub-Api-Version", "2022-11-28");
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request
            .send()
            .await
            .map_err(|e| LookoutError::Hosting(format!("{method} {url} failed: {e}")))?;
        check_response(response, &method).await
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, LookoutError> {
        let url = self.repo_url(path)?;
        let response = self.send(Method::GET, &url, None).await?;
        response
            .json()
            .await
            .map_err(|e| LookoutError::Hosting(format!("failed to decode {path}: {e}")))
    }

    async fn get_all_pages<T: DeserializeOwned>(&self, path: &str) -> Result<Vec<T>, LookoutError> {
        let mut items = Vec::new();
        let mut next_url = Some(self.repo_url(&format!("{path}?per_page=100"))?);

        while let Some(url) = next_url.take() {
            let response = self.send(Method::GET, &url, None).await?;
            next_url = parse_next_link(response.headers());
            let page: Vec<T> = response
                .json()
                .await
                .map_err(|e| LookoutError::Hosting(format!("failed to decode {path}: {e}")))?;
            items.extend(page);
        }

        Ok(items)
    }

    async fn post_json<T: DeserializeOwned>(
        &self,
        path: &str,
        body: &serde_json::Value,
    ) -> Result<T, LookoutError> {
        let url = self.repo_url(path)?;
        let response = self.send(Method::POST, &url, Some(body)).await?;
        response
            .json()
            .await
            .map_err(|e| LookoutError::Hosting(format!("failed to decode {path} reply: {e}")))
    }
}

#[async_trait]
impl HostingApi for GitHubClient {
    async fn pull_request(&self, pr: u64) -> Result<PullRequest, LookoutError> {
        let wire: WirePull = self.get_json(&format!("pulls/{pr}")).await?;
        Ok(wire.into_pull_request(pr))
    }

    async fn list_files(&self, pr: u64) -> Result<Vec<ChangedFile>, LookoutError> {
        self.get_all_pages(&format!("pulls/{pr}/files")).await
    }

    async fn list_commits(&self, pr: u64) -> Result<Vec<String>, LookoutError> {
        let commits: Vec<WireCommit> = self.get_all_pages(&format!("pulls/{pr}/commits")).await?;
        Ok(commits.into_iter().map(|c| c.sha).collect())
    }

    async fn list_issue_comments(&self, pr: u64) -> Result<Vec<ExistingComment>, LookoutError> {
        let comments: Vec<WireComment> =
            self.get_all_pages(&format!("issues/{pr}/comments")).await?;
        Ok(comments
            .into_iter()
            .map(|c| c.into_existing(CommentKind::Issue))
            .collect())
    }

    async fn list_review_comments(&self, pr: u64) -> Result<Vec<ExistingComment>, LookoutError> {
        let comments: Vec<WireComment> =
            self.get_all_pages(&format!("pulls/{pr}/comments")).await?;
        Ok(comments
            .into_iter()
            .map(|c| c.into_existing(CommentKind::Review))
            .collect())
    }

    async fn create_issue_comment(&self, pr: u64, body: &str) -> Result<u64, LookoutError> {
        let created: WireCreated = self
            .post_json(
                &format!("issues/{pr}/comments"),
                &serde_json::json!({ "body": body }),
            )
            .await?;
        Ok(created.id)
    }

    async fn create_review_comment(
        &self,
        pr: u64,
        commit_sha: &str,
        path: &str,
        position: u32,
        body: &str,
    ) -> Result<u64, LookoutError> {
        let payload = serde_json::json!({
            "body": body,
            "commit_id": commit_sha,
            "path": path,
            "position": position,
        });
        let created: WireCreated = self
            .post_json(&format!("pulls/{pr}/comments"), &payload)
            .await?;
        Ok(created.id)
    }

    async fn approve(&self, pr: u64, body: &str) -> Result<(), LookoutError> {
        let payload = serde_json::json!({ "event": "APPROVE", "body": body });
        let _review: serde_json::Value = self
            .post_json(&format!("pulls/{pr}/reviews"), &payload)
            .await?;
        Ok(())
    }

    async fn delete_comment(&self, kind: CommentKind, id: u64) -> Result<(), LookoutError> {
        let path = match kind {
            CommentKind::Issue => format!("issues/comments/{id}"),
            CommentKind::Review => format!("pulls/comments/{id}"),
        };
        let url = self.repo_url(&path)?;
        self.send(Method::DELETE, &url, None).await?;
        Ok(())
    }
}

async fn check_response(
    response: reqwest::Response,
    method: &Method,
) -> Result<reqwest::Response, LookoutError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let url = response.url().to_string();
    let body = response.text().await.unwrap_or_default();
    Err(LookoutError::Hosting(format!(
        "{method} {url} returned {status}: {body}"
    )))
}

/// Extract the `rel="next"` URL from a `Link` header.
fn parse_next_link(headers: &HeaderMap) -> Option<String> {
    let link = headers.get("link")?.to_str().ok()?;
    link.split(',')
        .map(str::trim)
        .find(|part| part.contains(r#"rel="next""#))
        .and_then(|part| {
            let start = part.find('<')? + 1;
            let end = part.find('>')?;
            (start < end).then(|| part[start..end].to_string())
        })
}

#[derive(Deserialize)]
struct WireUser {
    login: String,
}

#[derive(Deserialize)]
struct WireRef {
    sha: Option<String>,
    #[serde(rename = "ref")]
    name: Option<String>,
}

#[derive(Deserialize)]
struct WirePull {
    number: Option<u64>,
    #[serde(default)]
    title: String,
    body: Option<String>,
    user: Option<WireUser>,
    head: Option<WireRef>,
    base: Option<WireRef>,
}

impl WirePull {
    fn into_pull_request(self, requested: u64) -> PullRequest {
        let (head_sha, head_ref) = match self.head {
            Some(head) => (head.sha, head.name),
            None => (None, None),
        };
        PullRequest {
            number: self.number.unwrap_or(requested),
            title: self.title,
            body: self.body.unwrap_or_default(),
            author: self.user.map(|u| u.login).unwrap_or_default(),
            head_sha,
            head_ref,
            base_ref: self.base.and_then(|b| b.name),
        }
    }
}

#[derive(Deserialize)]
struct WireCommit {
    sha: String,
}

#[derive(Deserialize)]
struct WireComment {
    id: u64,
    body: Option<String>,
    user: Option<WireUser>,
}

impl WireComment {
    fn into_existing(self, kind: CommentKind) -> ExistingComment {
        ExistingComment {
            id: self.id,
            kind,
            body: self.body.unwrap_or_default(),
            author: self.user.map(|u| u.login).unwrap_or_default(),
        }
    }
}

#[derive(Deserialize)]
struct WireCreated {
    id: u64,
}

/// Split an `owner/name` repository identifier.
///
/// # Errors
///
/// Returns [`LookoutError::Config`] if either half is missing.
///
/// # Examples
///
/// ```
/// use lookout_review::github::parse_repository;
///
/// let (owner, repo) = parse_repository("octocat/hello-world").unwrap();
/// assert_eq!(owner, "octocat");
/// assert_eq!(repo, "hello-world");
/// assert!(parse_repository("hello-world").is_err());
/// ```
pub fn parse_repository(repository: &str) -> Result<(String, String), LookoutError> {
    match repository.trim().split_once('/') {
        Some((owner, repo))
            if !owner.is_empty() && !repo.is_empty() && !repo.contains('/') =>
        {
            Ok((owner.to_string(), repo.to_string()))
        }
        _ => Err(LookoutError::Config(format!(
            "invalid repository '{repository}', expected owner/name"
        ))),
    }
}

/// A pull request named on the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrReference {
    /// Repository in `owner/name` form, when the reference named one.
    pub repository: Option<String>,
    /// Pull request number.
    pub number: u64,
}

/// Parse a PR reference: either a bare number (`42`) or `owner/repo#42`.
///
/// # Errors
///
/// Returns [`LookoutError::Config`] if the reference is malformed or the
/// number is not a positive integer.
///
/// # Examples
///
/// ```
/// use lookout_review::github::parse_pr_reference;
///
/// let r = parse_pr_reference("octocat/hello-world#42").unwrap();
/// assert_eq!(r.repository.as_deref(), Some("octocat/hello-world"));
/// assert_eq!(r.number, 42);
///
/// assert_eq!(parse_pr_reference("7").unwrap().number, 7);
/// assert!(parse_pr_reference("0").is_err());
/// ```
pub fn parse_pr_reference(pr_ref: &str) -> Result<PrReference, LookoutError> {
    let pr_ref = pr_ref.trim();
    let (repository, number_str) = match pr_ref.split_once('#') {
        Some((repo, number)) => {
            let (owner, name) = parse_repository(repo)?;
            (Some(format!("{owner}/{name}")), number)
        }
        None => (None, pr_ref),
    };
    let number: u64 = number_str
        .parse()
        .map_err(|_| LookoutError::Config(format!("invalid PR number: '{number_str}'")))?;
    if number == 0 {
        return Err(LookoutError::Config("PR number must be positive".into()));
    }
    Ok(PrReference { repository, number })
}
