use hyper::client::HttpConnector;
use hyper::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use hyper::http::request::Builder;
use hyper::{body::Bytes, Body, Method, Request, StatusCode, Uri};
use hyper_tls::HttpsConnector;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;
use url::Url;

static CLIENT_NAME: &str = "purse";
static MEDIA_TYPE: &str = "application/vnd.github+json";
static API_VERSION: &str = "2022-11-28";

#[derive(Debug, Error)]
pub enum Error {
    #[error("revision marker is stale, the resource changed upstream")]
    Conflict,
    #[error("credential rejected by the contents api ({0})")]
    Unauthorized(StatusCode),
    #[error("writing to the contents api requires a bearer credential")]
    MissingCredential,
    #[error("unexpected response {status}: {message}")]
    Status { status: StatusCode, message: String },
    #[error("invalid endpoint: {0}")]
    Endpoint(String),
    #[error("contents api request failed")]
    Http(#[from] hyper::Error),
    #[error("unable to build request")]
    Request(#[from] hyper::http::Error),
    #[error("unable to parse response")]
    Parse(#[from] serde_json::Error),
    #[error("failed to decode base64 content")]
    Decode(#[from] base64::DecodeError),
}

type Result<T> = ::std::result::Result<T, Error>;

/// A single file tracked in a hosted repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resource {
    pub owner: String,
    pub repo: String,
    /// Slash separated path of the file inside the repository.
    pub path: String,
    /// Branch to read from and commit to, the repository default when unset.
    pub branch: Option<String>,
}

/// File content along with the revision marker it was read at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Blob {
    pub content: Vec<u8>,
    pub sha: String,
}

/// A full replacement of a file's content.
#[derive(Debug, Clone)]
pub struct Commit<'a> {
    pub message: &'a str,
    pub content: &'a [u8],
    /// Marker of the revision being replaced. Must be `None` only when the file
    /// does not exist yet.
    pub sha: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct ContentsResponse {
    sha: String,
    #[serde(default)]
    content: String,
}

#[derive(Debug, Serialize)]
struct PutRequest<'a> {
    message: &'a str,
    content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    sha: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    branch: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct PutResponse {
    content: ContentRef,
}

#[derive(Debug, Deserialize)]
struct ContentRef {
    sha: String,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    message: String,
}

pub struct Client {
    http: hyper::Client<HttpsConnector<HttpConnector>>,
    api: Url,
    token: Option<String>,
}

impl Client {
    pub fn new(api: Url, token: Option<String>) -> Self {
        Self {
            http: hyper::Client::builder().build(HttpsConnector::new()),
            api,
            token,
        }
    }

    pub fn has_credential(&self) -> bool {
        self.token.is_some()
    }

    /// Fetches the current content and revision marker of `resource`, `None` if
    /// the file does not exist.
    pub async fn get(&self, resource: &Resource) -> Result<Option<Blob>> {
        let mut url = contents_url(&self.api, resource)?;
        if let Some(branch) = &resource.branch {
            url.query_pairs_mut().append_pair("ref", branch);
        }

        let req = self.authorized(Method::GET, &url)?.body(Body::empty())?;
        let (status, body) = self.send(req).await?;

        match status {
            StatusCode::OK => {
                let res: ContentsResponse = serde_json::from_slice(&body)?;
                Ok(Some(Blob {
                    content: decode_content(&res.content)?,
                    sha: res.sha,
                }))
            }
            StatusCode::NOT_FOUND => Ok(None),
            s => Err(classify(s, &body)),
        }
    }

    /// Replaces the content of `resource` and returns the new revision marker.
    pub async fn put(&self, resource: &Resource, commit: &Commit<'_>) -> Result<String> {
        if self.token.is_none() {
            return Err(Error::MissingCredential);
        }

        let url = contents_url(&self.api, resource)?;
        let payload = serde_json::to_vec(&PutRequest {
            message: commit.message,
            content: base64::encode(commit.content),
            sha: commit.sha,
            branch: resource.branch.as_deref(),
        })?;

        let req = self
            .authorized(Method::PUT, &url)?
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(payload))?;
        let (status, body) = self.send(req).await?;

        match status {
            StatusCode::OK | StatusCode::CREATED => {
                let res: PutResponse = serde_json::from_slice(&body)?;
                Ok(res.content.sha)
            }
            s => Err(classify(s, &body)),
        }
    }

    /// Reads a file from an unauthenticated mirror. The mirror may lag behind
    /// the contents api.
    pub async fn get_raw(&self, url: &Url) -> Result<Option<Vec<u8>>> {
        let req = bare(Method::GET, url)?.body(Body::empty())?;
        let (status, body) = self.send(req).await?;

        match status {
            StatusCode::OK => Ok(Some(body.to_vec())),
            StatusCode::NOT_FOUND => Ok(None),
            s => Err(classify(s, &body)),
        }
    }

    fn authorized(&self, method: Method, url: &Url) -> Result<Builder> {
        let mut builder = bare(method, url)?
            .header(ACCEPT, MEDIA_TYPE)
            .header("X-GitHub-Api-Version", API_VERSION);
        if let Some(token) = &self.token {
            builder = builder.header(AUTHORIZATION, format!("Bearer {}", token));
        }

        Ok(builder)
    }

    async fn send(&self, req: Request<Body>) -> Result<(StatusCode, Bytes)> {
        let method = req.method().clone();
        let uri = req.uri().clone();
        let resp = self.http.request(req).await?;
        let status = resp.status();
        let body = hyper::body::to_bytes(resp.into_body()).await?;
        debug!(%method, %uri, %status, "contents api responded");

        Ok((status, body))
    }
}

fn bare(method: Method, url: &Url) -> Result<Builder> {
    let uri: Uri = url
        .as_str()
        .parse()
        .map_err(|e: hyper::http::uri::InvalidUri| Error::Endpoint(e.to_string()))?;

    Ok(Request::builder()
        .method(method)
        .uri(uri)
        .header(USER_AGENT, CLIENT_NAME))
}

fn contents_url(api: &Url, resource: &Resource) -> Result<Url> {
    let mut url = api.clone();
    url.path_segments_mut()
        .map_err(|_| Error::Endpoint(format!("{} cannot be a base url", api)))?
        .pop_if_empty()
        .extend([
            "repos",
            resource.owner.as_str(),
            resource.repo.as_str(),
            "contents",
        ])
        .extend(resource.path.split('/').filter(|s| !s.is_empty()));

    Ok(url)
}

// The api wraps base64 payloads at 60 columns.
fn decode_content(content: &str) -> Result<Vec<u8>> {
    let compact: String = content.split_whitespace().collect();
    Ok(base64::decode(compact)?)
}

fn classify(status: StatusCode, body: &[u8]) -> Error {
    let message = serde_json::from_slice::<ApiError>(body)
        .map(|e| e.message)
        .unwrap_or_else(|_| String::from_utf8_lossy(body).into_owned());

    match status {
        StatusCode::CONFLICT => Error::Conflict,
        StatusCode::UNPROCESSABLE_ENTITY if message.to_lowercase().contains("sha") => {
            Error::Conflict
        }
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Error::Unauthorized(status),
        status => Error::Status { status, message },
    }
}
