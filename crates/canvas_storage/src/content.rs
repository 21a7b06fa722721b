//! Content-addressed blob stores.
//!
//! A `ContentStore` takes named bytes and hands back an opaque content id.
//! Three implementations live here: a directory on disk keyed by SHA-256,
//! an in-memory map for tests and ephemeral sessions, and an HTTP client for
//! an IPFS pinning gateway.

use std::fmt;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use dashmap::DashMap;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tokio::fs;

use canvas_core::CanvasConfig;

use crate::error::{Result, StorageError};

const SHORT_CID_LEN: usize = 8;

/// Identifier returned by a content store for an uploaded blob.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct ContentId(String);

impl ContentId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ContentId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Store a blob under a display name and return its id.
    async fn put(&self, name: &str, bytes: Vec<u8>) -> Result<ContentId>;

    /// Fetch a blob by id.
    async fn get(&self, cid: &ContentId) -> Result<Vec<u8>>;

    /// Where a reader can fetch the blob from.
    fn url_for(&self, cid: &ContentId) -> String;
}

/// Serialize `value` as JSON and store it.
pub async fn put_json<S, T>(store: &S, name: &str, value: &T) -> Result<ContentId>
where
    S: ContentStore + ?Sized,
    T: Serialize + Sync,
{
    let bytes = serde_json::to_vec_pretty(value)?;
    store.put(name, bytes).await
}

/// Fetch a blob and parse it as JSON.
pub async fn get_json<S, T>(store: &S, cid: &ContentId) -> Result<T>
where
    S: ContentStore + ?Sized,
    T: DeserializeOwned,
{
    let bytes = store.get(cid).await?;
    Ok(serde_json::from_slice(&bytes)?)
}

/// Short display form of a content id: `first8...last8`.
pub fn shorten_cid(cid: &str) -> String {
    let chars: Vec<char> = cid.chars().collect();
    if chars.len() <= SHORT_CID_LEN * 2 {
        return cid.to_string();
    }
    let head: String = chars[..SHORT_CID_LEN].iter().collect();
    let tail: String = chars[chars.len() - SHORT_CID_LEN..].iter().collect();
    format!("{head}...{tail}")
}

fn digest_id(bytes: &[u8]) -> ContentId {
    ContentId(hex::encode(Sha256::digest(bytes)))
}

/// Blobs stored as files named by the hex SHA-256 of their contents.
#[derive(Clone)]
pub struct FileContentStore {
    base_path: PathBuf,
}

impl FileContentStore {
    pub fn new<P: AsRef<Path>>(base_path: P) -> Self {
        Self {
            base_path: base_path.as_ref().to_path_buf(),
        }
    }

    fn blob_path(&self, cid: &ContentId) -> Option<PathBuf> {
        let valid = !cid.0.is_empty() && cid.0.chars().all(|c| c.is_ascii_hexdigit());
        valid.then(|| self.base_path.join(&cid.0))
    }
}

#[async_trait]
impl ContentStore for FileContentStore {
    async fn put(&self, name: &str, bytes: Vec<u8>) -> Result<ContentId> {
        let cid = digest_id(&bytes);
        fs::create_dir_all(&self.base_path).await?;

        let path = self.base_path.join(&cid.0);
        if !path.exists() {
            fs::write(&path, &bytes).await?;
        }
        tracing::debug!(name, cid = %cid, size = bytes.len(), "FileContentStore: stored blob");
        Ok(cid)
    }

    async fn get(&self, cid: &ContentId) -> Result<Vec<u8>> {
        let path = self
            .blob_path(cid)
            .filter(|path| path.exists())
            .ok_or_else(|| StorageError::ContentNotFound(cid.to_string()))?;
        Ok(fs::read(&path).await?)
    }

    fn url_for(&self, cid: &ContentId) -> String {
        format!("file://{}", self.base_path.join(&cid.0).display())
    }
}

/// Process-local store, keyed the same way as `FileContentStore`.
#[derive(Default)]
pub struct InMemoryContentStore {
    blobs: DashMap<ContentId, Vec<u8>>,
}

impl InMemoryContentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.blobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blobs.is_empty()
    }
}

#[async_trait]
impl ContentStore for InMemoryContentStore {
    async fn put(&self, _name: &str, bytes: Vec<u8>) -> Result<ContentId> {
        let cid = digest_id(&bytes);
        self.blobs.entry(cid.clone()).or_insert(bytes);
        Ok(cid)
    }

    async fn get(&self, cid: &ContentId) -> Result<Vec<u8>> {
        self.blobs
            .get(cid)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| StorageError::ContentNotFound(cid.to_string()))
    }

    fn url_for(&self, cid: &ContentId) -> String {
        format!("memory://{cid}")
    }
}

/// Reply of the gateway's `add` endpoint.
#[derive(Deserialize, Debug)]
struct AddResponse {
    #[serde(rename = "Name")]
    name: String,
    #[serde(rename = "Hash")]
    hash: String,
    #[serde(rename = "Size", default)]
    size: String,
}

/// Uploads to an IPFS pinning service and reads back through its gateway.
#[derive(Clone)]
pub struct GatewayContentStore {
    client: reqwest::Client,
    upload_url: String,
    gateway_url: String,
    api_key: Option<String>,
}

impl GatewayContentStore {
    pub fn new(upload_url: impl Into<String>, gateway_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            upload_url: upload_url.into(),
            gateway_url: gateway_url.into().trim_end_matches('/').to_string(),
            api_key: None,
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn from_config(config: &CanvasConfig) -> Self {
        let store = Self::new(&config.upload_url, &config.gateway_url);
        match &config.storage_api_key {
            Some(key) => store.with_api_key(key),
            None => store,
        }
    }
}

#[async_trait]
impl ContentStore for GatewayContentStore {
    async fn put(&self, name: &str, bytes: Vec<u8>) -> Result<ContentId> {
        let part = reqwest::multipart::Part::bytes(bytes)
            .file_name(name.to_string())
            .mime_str("application/json")?;
        let form = reqwest::multipart::Form::new().part("file", part);

        let mut request = self.client.post(&self.upload_url).multipart(form);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(name, status = status.as_u16(), "GatewayContentStore: upload failed");
            return Err(StorageError::Upload {
                status: status.as_u16(),
                body,
            });
        }

        let added: AddResponse = response.json().await?;
        tracing::info!(
            name = %added.name,
            cid = %added.hash,
            size = %added.size,
            "GatewayContentStore: upload complete"
        );
        Ok(ContentId(added.hash))
    }

    async fn get(&self, cid: &ContentId) -> Result<Vec<u8>> {
        let response = self.client.get(self.url_for(cid)).send().await?;
        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(StorageError::ContentNotFound(cid.to_string()));
        }
        if !status.is_success() {
            return Err(StorageError::Gateway {
                status: status.as_u16(),
                cid: cid.to_string(),
            });
        }
        Ok(response.bytes().await?.to_vec())
    }

    fn url_for(&self, cid: &ContentId) -> String {
        format!("{}/{}", self.gateway_url, cid)
    }
}
