//! WebDAV implementation of [`SnapshotStore`]
//!
//! Wire mapping:
//! - ensure container: `MKCOL` on every collection of the backup path
//! - put: `PUT <container>/<name>` with a streamed body
//! - get: `GET <container>/<name>` streamed to disk
//! - list: `PROPFIND <container>/` with `Depth: 1`
//! - delete: `DELETE <container>/<name>`
//!
//! Every request carries basic auth credentials.

use crate::error::StoreError;
use crate::naming;
use crate::store::SnapshotStore;
use anyhow::Context;
use async_trait::async_trait;
use davsnap_core::StoreConfig;
use futures::StreamExt;
use regex::Regex;
use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE};
use reqwest::{Method, RequestBuilder, StatusCode};
use std::path::Path;
use std::sync::LazyLock;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

const USER_AGENT: &str = concat!("davsnap/", env!("CARGO_PKG_VERSION"));

const PROPFIND_BODY: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<d:propfind xmlns:d="DAV:"><d:prop><d:resourcetype/></d:prop></d:propfind>"#;

/// `<href>` elements under any namespace prefix
static HREF_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<(?:[a-z0-9_.-]+:)?href(?:\s[^>]*)?>\s*([^<]*?)\s*</(?:[a-z0-9_.-]+:)?href\s*>")
        .expect("href regex is valid")
});

/// Snapshot container on a WebDAV server
pub struct WebDavStore {
    client: reqwest::Client,
    config: StoreConfig,
    container_url: String,
    mkcol: Method,
    propfind: Method,
}

impl WebDavStore {
    /// Create a store client for the container described by `config`
    pub fn new(config: StoreConfig) -> anyhow::Result<Self> {
        // Transfers are bounded by idle time between reads rather than a total
        // deadline so large snapshots are not cut off.
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .connect_timeout(config.request_timeout())
            .read_timeout(config.transfer_timeout())
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            container_url: config.container_url(),
            config,
            mkcol: Method::from_bytes(b"MKCOL").context("Invalid MKCOL method")?,
            propfind: Method::from_bytes(b"PROPFIND").context("Invalid PROPFIND method")?,
        })
    }

    /// Container URL without a trailing slash
    pub fn container_url(&self) -> &str {
        &self.container_url
    }

    fn object_url(&self, name: &str) -> String {
        format!("{}/{}", self.container_url, name)
    }

    /// Collections to create, outermost first.
    ///
    /// With an empty backup path the endpoint itself is the container.
    fn collection_urls(&self) -> Vec<String> {
        let segments = self.config.backup_path_segments();
        if segments.is_empty() {
            return vec![format!("{}/", self.container_url)];
        }

        let mut url = self.config.url.trim_end_matches('/').to_string();
        segments
            .into_iter()
            .map(|segment| {
                url.push('/');
                url.push_str(segment);
                format!("{}/", url)
            })
            .collect()
    }

    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        self.client
            .request(method, url)
            .basic_auth(&self.config.username, Some(&self.config.password))
    }
}

#[async_trait]
impl SnapshotStore for WebDavStore {
    fn location(&self) -> String {
        self.container_url.clone()
    }

    async fn ensure_container(&self) {
        for url in self.collection_urls() {
            let result = self
                .request(self.mkcol.clone(), &url)
                .timeout(self.config.request_timeout())
                .send()
                .await;

            match result {
                Ok(response) => {
                    let status = response.status();
                    if status == StatusCode::CREATED {
                        info!("Created collection {}", url);
                    } else if status.is_success()
                        || status == StatusCode::METHOD_NOT_ALLOWED
                        || status == StatusCode::CONFLICT
                    {
                        debug!("Collection {} already exists ({})", url, status);
                    } else {
                        warn!("MKCOL {} returned {}", url, status);
                    }
                }
                Err(e) => {
                    warn!("Could not create collection {}: {}", url, error_chain(&e));
                    return;
                }
            }
        }
    }

    async fn put(&self, name: &str, source: &Path) -> Result<u64, StoreError> {
        let file = tokio::fs::File::open(source)
            .await
            .map_err(|e| StoreError::write(name, e))?;
        let size = file
            .metadata()
            .await
            .map_err(|e| StoreError::write(name, e))?
            .len();

        let url = self.object_url(name);
        debug!("PUT {} ({} bytes)", url, size);

        let response = self
            .request(Method::PUT, &url)
            .header(CONTENT_LENGTH, size)
            .body(reqwest::Body::from(file))
            .send()
            .await
            .map_err(|e| StoreError::write(name, error_chain(&e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(StoreError::write(name, format!("HTTP {}", status)));
        }

        Ok(size)
    }

    async fn get(&self, name: &str, dest: &Path) -> Result<u64, StoreError> {
        let url = self.object_url(name);
        debug!("GET {}", url);

        let response = self
            .request(Method::GET, &url)
            .send()
            .await
            .map_err(|e| StoreError::read(name, error_chain(&e)))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(StoreError::not_found(name));
        }
        if !status.is_success() {
            return Err(StoreError::read(name, format!("HTTP {}", status)));
        }

        let mut file = tokio::fs::File::create(dest)
            .await
            .map_err(|e| StoreError::read(name, e))?;

        let mut stream = response.bytes_stream();
        let mut received = 0u64;
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| StoreError::read(name, error_chain(&e)))?;
            file.write_all(&chunk)
                .await
                .map_err(|e| StoreError::read(name, e))?;
            received += chunk.len() as u64;
        }
        file.flush().await.map_err(|e| StoreError::read(name, e))?;

        debug!("Downloaded {} bytes from {}", received, url);
        Ok(received)
    }

    async fn list(&self) -> Result<Vec<String>, StoreError> {
        let url = format!("{}/", self.container_url);
        debug!("PROPFIND {}", url);

        let response = self
            .request(self.propfind.clone(), &url)
            .header("Depth", "1")
            .header(CONTENT_TYPE, "application/xml; charset=utf-8")
            .body(PROPFIND_BODY)
            .timeout(self.config.request_timeout())
            .send()
            .await
            .map_err(|e| StoreError::list(error_chain(&e)))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            debug!("Container {} does not exist yet", url);
            return Ok(Vec::new());
        }
        if !status.is_success() {
            return Err(StoreError::list(format!("HTTP {}", status)));
        }

        let body = response
            .text()
            .await
            .map_err(|e| StoreError::list(error_chain(&e)))?;
        Ok(snapshot_names(&body))
    }

    async fn delete(&self, name: &str) -> Result<(), StoreError> {
        let url = self.object_url(name);
        debug!("DELETE {}", url);

        let response = self
            .request(Method::DELETE, &url)
            .timeout(self.config.request_timeout())
            .send()
            .await
            .map_err(|e| StoreError::delete(name, error_chain(&e)))?;

        let status = response.status();
        if status.is_success() || status == StatusCode::NOT_FOUND {
            Ok(())
        } else {
            Err(StoreError::delete(name, format!("HTTP {}", status)))
        }
    }
}

/// Snapshot names referenced by a PROPFIND multistatus body, sorted.
pub fn snapshot_names(multistatus: &str) -> Vec<String> {
    naming::sort_snapshots(
        HREF_RE
            .captures_iter(multistatus)
            .filter_map(|caps| caps.get(1))
            .filter_map(|href| href_basename(href.as_str()))
            .map(str::to_string),
    )
}

/// Last path segment of an href, ignoring query, fragment and trailing slash.
fn href_basename(href: &str) -> Option<&str> {
    let path = href.split(['?', '#']).next()?;
    path.trim_end_matches('/')
        .rsplit('/')
        .next()
        .filter(|segment| !segment.is_empty())
}

/// reqwest's Display omits the underlying cause (DNS, TLS, refused...).
fn error_chain(err: &reqwest::Error) -> String {
    use std::error::Error as _;

    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}
