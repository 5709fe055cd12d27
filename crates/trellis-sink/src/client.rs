//! HTTP client for a Trellis (OADA) document store.

use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, CONTENT_TYPE};
use reqwest::{Client, Method, Response, StatusCode};
use serde_json::{json, Value};
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::error::{Result, SinkError};
use crate::traits::{DocumentSink, PutResponse};
use crate::tree::{ResourceStep, Tree};

const REV_HEADER: &str = "x-oada-rev";
const CONTENT_LOCATION_HEADER: &str = "content-location";

/// Connection settings for [`TrellisClient`].
#[derive(Debug, Clone)]
pub struct TrellisConfig {
    /// Host or base URL. `https://` is assumed when no scheme is given.
    pub domain: String,
    pub token: String,
    pub timeout: Duration,
}

impl TrellisConfig {
    pub fn new(domain: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            token: token.into(),
            timeout: Duration::from_secs(30),
        }
    }
}

/// Turn a bare domain into a base URL without a trailing slash.
pub fn base_url(domain: &str) -> String {
    let domain = domain.trim().trim_end_matches('/');
    if domain.starts_with("http://") || domain.starts_with("https://") {
        domain.to_string()
    } else {
        format!("https://{domain}")
    }
}

/// A [`DocumentSink`] backed by the Trellis HTTP API.
///
/// Puts are tree-guided: before writing a document, every typed level above
/// it is checked and created (as a fresh resource linked into its parent)
/// when missing. Levels known to exist are cached for the client's lifetime.
pub struct TrellisClient {
    http: Client,
    base: String,
    token: String,
    known: Mutex<HashSet<String>>,
}

impl TrellisClient {
    pub fn new(config: &TrellisConfig) -> Result<Self> {
        if config.domain.trim().is_empty() {
            return Err(SinkError::Config("domain must not be empty".to_string()));
        }
        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| SinkError::Config(format!("failed to build HTTP client: {e}")))?;
        let base = base_url(&config.domain);
        info!("Trellis client for {base}");
        Ok(Self {
            http,
            base,
            token: config.token.clone(),
            known: Mutex::new(HashSet::new()),
        })
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        content_type: Option<&str>,
        body: Option<&Value>,
    ) -> Result<Response> {
        let url = format!("{}{path}", self.base);
        let mut request = self
            .http
            .request(method.clone(), &url)
            .bearer_auth(&self.token);
        if let Some(content_type) = content_type {
            request = request.header(CONTENT_TYPE, content_type);
        }
        if let Some(body) = body {
            let bytes = serde_json::to_vec(body).map_err(|e| SinkError::Transport {
                method: method.to_string(),
                path: path.to_string(),
                message: format!("failed to encode body: {e}"),
            })?;
            request = request.body(bytes);
        }
        request.send().await.map_err(|e| SinkError::Transport {
            method: method.to_string(),
            path: path.to_string(),
            message: e.to_string(),
        })
    }

    async fn send_ok(
        &self,
        method: Method,
        path: &str,
        content_type: Option<&str>,
        body: Option<&Value>,
    ) -> Result<Response> {
        let response = self.send(method.clone(), path, content_type, body).await?;
        check_status(&method, path, response)
    }

    async fn exists(&self, path: &str) -> Result<bool> {
        let response = self.send(Method::HEAD, path, None, None).await?;
        match response.status() {
            StatusCode::NOT_FOUND => Ok(false),
            _ => check_status(&Method::HEAD, path, response).map(|_| true),
        }
    }

    /// Make sure every resource in `plan` exists, creating missing ones.
    async fn ensure(&self, plan: &[ResourceStep]) -> Result<()> {
        // Held across the whole walk so concurrent puts never create the same
        // level twice.
        let mut known = self.known.lock().await;
        for step in plan {
            if known.contains(&step.path) {
                continue;
            }
            if !self.exists(&step.path).await? {
                let resource_id = format!("resources/{}", uuid::Uuid::new_v4());
                debug!("Creating {} as {resource_id} ({})", step.path, step.content_type);
                self.send_ok(
                    Method::PUT,
                    &format!("/{resource_id}"),
                    Some(&step.content_type),
                    Some(&json!({ "_type": step.content_type })),
                )
                .await?;
                self.send_ok(
                    Method::PUT,
                    &step.parent,
                    Some(&step.parent_content_type),
                    Some(&step.link_body(&resource_id)),
                )
                .await?;
            }
            known.insert(step.path.clone());
        }
        Ok(())
    }
}

fn check_status(method: &Method, path: &str, response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        Err(SinkError::Status {
            method: method.to_string(),
            path: path.to_string(),
            status: status.as_u16(),
        })
    }
}

fn header_string(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

#[async_trait]
impl DocumentSink for TrellisClient {
    async fn put(&self, path: &str, tree: &Tree, body: &Value) -> Result<PutResponse> {
        let plan = tree.resource_plan(path)?;
        self.ensure(&plan).await?;

        let content_type = tree
            .nearest_content_type(path)
            .unwrap_or("application/json");
        let response = self
            .send_ok(Method::PUT, path, Some(content_type), Some(body))
            .await?;
        let headers = response.headers();
        Ok(PutResponse {
            rev: header_string(headers, REV_HEADER),
            content_location: header_string(headers, CONTENT_LOCATION_HEADER),
        })
    }

    async fn get(&self, path: &str) -> Result<Option<Value>> {
        let response = self.send(Method::GET, path, None, None).await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let response = check_status(&Method::GET, path, response)?;
        let value = response
            .json::<Value>()
            .await
            .map_err(|e| SinkError::Decode {
                path: path.to_string(),
                message: e.to_string(),
            })?;
        Ok(Some(value))
    }
}
